pub mod all_day;
pub mod config;
pub mod events;
pub mod login;
pub mod new;
pub mod report;

use anyhow::{Context, Result};
use exchcal_core::{Exchange, Settings};
use tracing::debug;

use crate::prompt::TerminalPrompt;

/// Number of days `events` looks back when no start is given
pub const DEFAULT_LOOKBACK_DAYS: i64 = 7;

/// Options shared by `new` and `all-day`.
pub struct EventDetails {
    pub subject: String,
    pub attendees: Vec<String>,
    pub location: Option<String>,
    pub categories: Vec<String>,
    pub free: bool,
}

async fn connect(settings: &Settings) -> Result<Exchange> {
    debug!(token_file = %settings.token_file.display(), "connecting");
    Exchange::connect(settings, &TerminalPrompt)
        .await
        .with_context(|| format!("Failed to connect to the calendar of {}", settings.account))
}
