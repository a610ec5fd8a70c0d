//! One-time browser consent flow that produces the stored credential record.

use anyhow::{Context, Result};
use calbridge_core::credential::{CredentialStore, TokenRecord};
use google_calendar::Client;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::info;

use crate::credentials::{GoogleCredentials, SCOPES};
use crate::session::token_record;

/// Run the consent flow and persist the resulting tokens in `store`.
pub async fn authorize(creds: &GoogleCredentials, store: &dyn CredentialStore) -> Result<TokenRecord> {
    let scopes: Vec<String> = SCOPES.iter().map(|s| s.to_string()).collect();
    let address = creds.redirect_address()?;

    let mut client = Client::new(
        creds.client_id.clone(),
        creds.client_secret.clone(),
        creds.redirect_uri.clone(),
        String::new(),
        String::new(),
    );

    let auth_url = client.user_consent_url(&scopes);

    eprintln!("\nOpen this URL in your browser to authorize calbridge:\n");
    eprintln!("{}\n", auth_url);

    if open::that(&auth_url).is_err() {
        eprintln!("(No browser could be launched; open the URL above manually)");
    }

    let (code, state) = wait_for_callback(&address, &creds.redirect_path()).await?;

    eprintln!("\nGot a consent code from Google, requesting tokens...");

    let tokens = client
        .get_access_token(&code, &state)
        .await
        .context("Failed to exchange authorization code")?;

    if tokens.refresh_token.is_empty() {
        anyhow::bail!(
            "Google did not return a refresh token. Revoke calbridge's access in your \
            Google account settings and authorize again."
        );
    }

    let record = token_record(&tokens, "");
    store.save(&record).await?;

    info!(project_id = %creds.project_id, "Stored Google credentials");

    Ok(record)
}

async fn wait_for_callback(address: &str, expected_path: &str) -> Result<(String, String)> {
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind OAuth callback listener on {address}"))?;

    loop {
        let (stream, _) = listener
            .accept()
            .await
            .context("OAuth callback listener stopped accepting")?;

        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        reader
            .read_line(&mut request_line)
            .await
            .context("Could not read the OAuth callback request")?;

        let url_part = request_line
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| anyhow::anyhow!("Malformed OAuth callback request"))?;

        let url = url::Url::parse(&format!("http://localhost{}", url_part))?;

        let mut stream = reader.into_inner();

        // Browsers also ask for /favicon.ico and the like
        if url.path() != expected_path {
            respond(&mut stream, "404 Not Found", "Invalid callback URL").await?;
            continue;
        }

        let param = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.to_string())
        };

        if let Some(error) = param("error") {
            respond(&mut stream, "200 OK", "Authorization rejected.").await?;
            anyhow::bail!("Authorization rejected: {}", error);
        }

        let code = param("code").ok_or_else(|| anyhow::anyhow!("No code in callback"))?;
        let state = param("state").unwrap_or_default();

        respond(
            &mut stream,
            "200 OK",
            "Authorization successful! You can close this window and return to the terminal.",
        )
        .await?;

        return Ok((code, state));
    }
}

async fn respond(stream: &mut tokio::net::TcpStream, status: &str, body: &str) -> Result<()> {
    let response = format!(
        "HTTP/1.1 {status}\r\n\
        Content-Type: text/html\r\n\
        Connection: close\r\n\
        \r\n\
        <html><body><p>{body}</p></body></html>"
    );

    stream
        .write_all(response.as_bytes())
        .await
        .context("Could not answer the OAuth callback")?;
    stream.flush().await?;

    Ok(())
}
