mod commands;
mod prompt;
mod render;
mod utils;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use exchcal_core::{Overrides, Settings};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "exchcal")]
#[command(about = "List, classify and create events on an Exchange Online calendar")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Mailbox whose calendar is used (overrides netrc and PYEXCH_* variables)
    #[arg(long, global = true)]
    account: Option<String>,

    /// Login name (user@domain or DOMAIN\user)
    #[arg(long, global = true)]
    login: Option<String>,

    /// Log debug output to stderr (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the OAuth token
    Login {
        /// Run the browser sign-in even if the stored token is still valid
        #[arg(long)]
        force: bool,
    },
    /// List events whose subject matches a regex class
    Events {
        /// Show events from this date (YYYY-MM-DD or YYYY-MM-DDTHH:MM, default: 7 days ago)
        #[arg(long)]
        from: Option<String>,

        /// Show events until this date (default: now)
        #[arg(long)]
        to: Option<String>,

        /// Include events that match no class
        #[arg(long)]
        all: bool,
    },
    /// Time spent per day in each regex class
    Report {
        /// Report from this date (default: first day of the current month)
        #[arg(long)]
        from: Option<String>,

        /// Report until this date (default: now)
        #[arg(long)]
        to: Option<String>,
    },
    /// Create an event and invite its attendees
    New {
        /// Start date/time (e.g., "2025-03-20T15:00")
        #[arg(short, long)]
        start: String,

        /// End date/time
        #[arg(short, long)]
        end: String,

        #[command(flatten)]
        details: EventDetails,
    },
    /// Create an all-day event
    AllDay {
        /// Day of the event (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        #[command(flatten)]
        details: EventDetails,
    },
    /// Show the resolved configuration
    Config,
}

#[derive(Args)]
struct EventDetails {
    /// Event title
    #[arg(long)]
    subject: String,

    /// Attendee email address (repeatable)
    #[arg(short, long = "attendee")]
    attendees: Vec<String>,

    /// Event location, usually an online meeting URL
    #[arg(short, long)]
    location: Option<String>,

    /// Category name (repeatable)
    #[arg(short, long = "category")]
    categories: Vec<String>,

    /// Show as free instead of blocking the calendar
    #[arg(long)]
    free: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    let settings = load_settings(&cli.global)?;

    match cli.command {
        Commands::Login { force } => commands::login::run(&settings, force).await,
        Commands::Events { from, to, all } => {
            commands::events::run(&settings, from.as_deref(), to.as_deref(), all).await
        }
        Commands::Report { from, to } => {
            commands::report::run(&settings, from.as_deref(), to.as_deref()).await
        }
        Commands::New {
            start,
            end,
            details,
        } => commands::new::run(&settings, &start, &end, details.into()).await,
        Commands::AllDay { date, details } => {
            commands::all_day::run(&settings, &date, details.into()).await
        }
        Commands::Config => commands::config::run(&settings),
    }
}

impl From<EventDetails> for commands::EventDetails {
    fn from(details: EventDetails) -> Self {
        commands::EventDetails {
            subject: details.subject,
            attendees: details.attendees,
            location: details.location,
            categories: details.categories,
            free: details.free,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "exchcal=debug" } else { "exchcal=info" };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(global: &GlobalArgs) -> Result<Settings> {
    let settings = Settings::load(Overrides {
        login: global.login.clone(),
        account: global.account.clone(),
        ..Overrides::default()
    })
    .context("Failed to resolve exchcal settings")?;

    debug!(
        account = %settings.account,
        oauth_config = %settings.oauth_config_file.display(),
        "loaded settings"
    );
    Ok(settings)
}
