mod app;
mod commands;
mod config;
mod render;
mod store;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::config::Settings;

#[derive(Parser)]
#[command(name = "calbridge")]
#[command(about = "Mirror upcoming Google Calendar events into Discord scheduled events")]
struct Cli {
    /// Config file (defaults to ~/.config/calbridge/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output and list every planned change
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single sync pass
    Sync,
    /// Run sync passes on SYNC_INTERVAL until interrupted
    Watch,
    /// Show what the next pass would change
    Status,
    /// List stored calendar event to scheduled event links
    Links,
    /// Delete the calendar event linked to a removed scheduled event
    MirrorDelete {
        /// Id of the deleted Discord scheduled event
        sink_id: String,
    },
    /// Authorize access to Google Calendar in the browser
    Authorize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let settings = Settings::load(cli.config.as_deref())?;
    let app = App::build(settings)?;

    match cli.command {
        Commands::Sync => commands::sync::run(app).await,
        Commands::Watch => commands::watch::run(app).await,
        Commands::Status => commands::status::run(app, cli.verbose).await,
        Commands::Links => commands::links::run(app),
        Commands::MirrorDelete { sink_id } => commands::mirror_delete::run(app, &sink_id).await,
        Commands::Authorize => commands::authorize::run(app).await,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,calbridge=debug,calbridge_core=debug,calbridge_provider_google=debug,calbridge_sink_discord=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
