//! Persisted OAuth token.
//!
//! The token file is plain JSON:
//! `{access_token, refresh_token, token_type, expires_in, expires_at, scope}`
//! with `expires_at` in seconds since the Unix epoch.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ExchError, ExchResult};

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    pub expires_at: f64,
    #[serde(default)]
    pub scope: Vec<String>,
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

impl Token {
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis((self.expires_at * 1000.0) as i64)
    }

    /// Expired once `now` reaches `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at_utc() {
            Some(expires_at) => now >= expires_at,
            None => true,
        }
    }
}

/// On-disk location of the token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored token, or `None` when no token file exists yet.
    pub fn load(&self) -> ExchResult<Option<Token>> {
        if !self.path.is_file() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            ExchError::Token(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        let token: Token = serde_json::from_str(&contents).map_err(|e| {
            ExchError::Token(format!("Failed to parse {}: {}", self.path.display(), e))
        })?;

        Ok(Some(token))
    }

    pub fn save(&self, token: &Token) -> ExchResult<()> {
        let contents = serde_json::to_string_pretty(token)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&self.path, contents).map_err(|e| {
            ExchError::Token(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        // Owner-only (0600): the file holds bearer credentials.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}
