//! Snapshot of the process environment.
//!
//! Settings are resolved from an `EnvVars` value rather than from
//! `std::env` directly, so that resolution is a pure function of its inputs.

use std::collections::HashMap;
use std::path::PathBuf;

pub const OAUTH_CONFIG_FILE: &str = "OAUTH_CONFIG_FILE";
pub const PYEXCH_OAUTH_CONFIG: &str = "PYEXCH_OAUTH_CONFIG";
pub const OAUTH_TOKEN_FILE: &str = "OAUTH_TOKEN_FILE";
pub const PYEXCH_TOKEN_FILE: &str = "PYEXCH_TOKEN_FILE";
pub const NETRC: &str = "NETRC";
pub const PYEXCH_REGEX_JSON: &str = "PYEXCH_REGEX_JSON";
pub const PYEXCH_USER: &str = "PYEXCH_USER";
pub const PYEXCH_AD_DOMAIN: &str = "PYEXCH_AD_DOMAIN";
pub const PYEXCH_EMAIL_DOMAIN: &str = "PYEXCH_EMAIL_DOMAIN";
pub const PYEXCH_PWD_FILE: &str = "PYEXCH_PWD_FILE";
pub const PYEXCH_SCOPE: &str = "PYEXCH_SCOPE";

/// Prefix for OAuth fields supplied through the environment
/// (`PYEXCH_TENANT_ID`, `PYEXCH_CLIENT_ID`, ...).
pub const OAUTH_ENV_PREFIX: &str = "PYEXCH";

#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    vars: HashMap<String, String>,
}

impl EnvVars {
    /// Capture the current process environment.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of `key`, treating empty strings as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// First variable in `keys` that is set.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }

    /// Path from the first variable in `keys` that is set, with `~` expanded.
    pub fn path_of(&self, keys: &[&str]) -> Option<PathBuf> {
        self.first_of(keys).map(expand_path)
    }

    pub(crate) fn as_map(&self) -> HashMap<String, String> {
        self.vars.clone()
    }
}

pub(crate) fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}
