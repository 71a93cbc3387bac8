//! Library side of exchcal: an Exchange / Microsoft 365 calendar reached
//! over OAuth2.
//!
//! - `config` resolves settings from netrc, environment and the OAuth YAML file
//! - `auth` obtains, refreshes and stores the OAuth token
//! - `graph` talks to the calendar REST API
//! - `exchange` ties them together: filtered event listing, per-day reports
//!   and event creation

pub mod auth;
pub mod classes;
pub mod config;
pub mod env;
pub mod error;
pub mod event;
pub mod exchange;
pub mod graph;
pub mod netrc;
pub mod report;
pub mod token;

pub use auth::{AuthPrompt, Authenticator};
pub use classes::RegexMap;
pub use config::{OAuthConfig, Overrides, Settings};
pub use error::{ExchError, ExchResult};
pub use event::{Moment, NewEvent, RawEvent, SimpleEvent};
pub use exchange::{Exchange, FilteredEvents};
pub use report::DailyReport;
pub use token::{Token, TokenStore};
