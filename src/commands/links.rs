use anyhow::Result;
use owo_colors::OwoColorize;

use crate::app::App;
use crate::render::Render;

pub fn run(app: App) -> Result<()> {
    let links = app.store.list_detailed()?;

    if links.is_empty() {
        println!("{}", "No links stored".dimmed());
        return Ok(());
    }

    for stored in &links {
        println!("{}  {}", stored.link.render(), stored.created_at.dimmed());
    }
    println!("\n{} links", links.len());

    Ok(())
}
