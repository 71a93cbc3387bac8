use anyhow::{Context, Result};
use chrono::Local;
use exchcal_core::{Authenticator, Settings, TokenStore};
use owo_colors::OwoColorize;

use crate::prompt::TerminalPrompt;

pub async fn run(settings: &Settings, force: bool) -> Result<()> {
    let auth = Authenticator::new(&settings.oauth, TokenStore::new(&settings.token_file))
        .context("Invalid OAuth configuration")?;

    println!("Signing in as {}...", settings.login.as_deref().unwrap_or(&settings.account));

    let token = if force {
        auth.interactive_login(&TerminalPrompt).await?
    } else {
        auth.login(&TerminalPrompt).await?
    };

    println!("{}", "Signed in.".green());
    println!("  Token:    {}", auth.store().path().display());
    if let Some(expires_at) = token.expires_at_utc() {
        println!(
            "  Expires:  {}",
            expires_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}
