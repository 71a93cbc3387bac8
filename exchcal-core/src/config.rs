//! Settings resolution.
//!
//! OAuth client fields come from a YAML file layered under `PYEXCH_*`
//! environment variables. The login name and mailbox address come from
//! explicit overrides, then the `EXCH` netrc entry, then `PYEXCH_USER` and
//! friends. The regex map comes from an override, then `PYEXCH_REGEX_JSON`,
//! then the built-in classes.

use std::fmt;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classes::RegexMap;
use crate::env::{self, EnvVars};
use crate::error::{ExchError, ExchResult};
use crate::netrc::{EXCHANGE_MACHINE, Netrc};

pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
pub const DEFAULT_API_BASE: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_REDIRECT_URI: &str =
    "https://login.microsoftonline.com/common/oauth2/nativeclient";

const DEFAULT_NETRC: &str = ".ssh/netrc";
const DEFAULT_OAUTH_CONFIG: &str = ".ssh/exchange_oauth.yaml";
const DEFAULT_TOKEN_FILE: &str = ".ssh/exchange_token";

fn default_authority() -> String {
    DEFAULT_AUTHORITY.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

/// Azure AD application registration used for the OAuth2 flow.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: Vec<String>,

    /// Identity provider root, e.g. `https://login.microsoftonline.com`
    #[serde(default = "default_authority")]
    pub authority: String,

    /// Calendar REST API root
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .field("authority", &self.authority)
            .field("api_base", &self.api_base)
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

impl OAuthConfig {
    fn validate(&self, source: &Path) -> ExchResult<()> {
        let missing: Vec<&str> = [
            ("tenant_id", self.tenant_id.trim().is_empty()),
            ("client_id", self.client_id.trim().is_empty()),
            ("client_secret", self.client_secret.trim().is_empty()),
            ("scope", self.scope.iter().all(|s| s.trim().is_empty())),
        ]
        .into_iter()
        .filter_map(|(name, empty)| empty.then_some(name))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ExchError::Config(format!(
                "OAuth config is missing {} (checked {} and PYEXCH_* variables)",
                missing.join(", "),
                source.display()
            )))
        }
    }
}

/// Values given explicitly by the caller; they win over every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub login: Option<String>,
    pub account: Option<String>,
    pub regex_map: Option<RegexMap>,
    pub token_file: Option<PathBuf>,
}

/// Fully resolved settings. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct Settings {
    pub oauth: OAuthConfig,
    /// Credential login name (`user@domain` or `DOMAIN\user`)
    pub login: Option<String>,
    /// Primary SMTP address of the mailbox whose calendar is accessed
    pub account: String,
    pub regex_map: RegexMap,
    pub token_file: PathBuf,
    pub oauth_config_file: PathBuf,
    pub netrc_file: PathBuf,
}

impl Settings {
    /// Resolve settings from the process environment.
    pub fn load(overrides: Overrides) -> ExchResult<Self> {
        Self::resolve(overrides, &EnvVars::from_process())
    }

    pub fn resolve(overrides: Overrides, env: &EnvVars) -> ExchResult<Self> {
        let Overrides {
            mut login,
            mut account,
            regex_map,
            token_file,
        } = overrides;

        // Netrc
        let explicit_netrc = env.path_of(&[env::NETRC]);
        let netrc_file = match explicit_netrc.clone() {
            Some(path) => path,
            None => home_path(DEFAULT_NETRC)?,
        };
        if explicit_netrc.is_some() || netrc_file.exists() {
            let netrc = Netrc::load(&netrc_file)?;
            if let Some(entry) = netrc.authenticators(EXCHANGE_MACHINE) {
                login = login.or_else(|| entry.login.clone());
                account = account.or_else(|| entry.account.clone());
            }
        } else {
            debug!(path = %netrc_file.display(), "no netrc file");
        }

        // Legacy user/domain variables
        if let Some(user) = env.get(env::PYEXCH_USER) {
            login = login.or_else(|| {
                Some(match env.get(env::PYEXCH_AD_DOMAIN) {
                    Some(domain) => format!("{domain}\\{user}"),
                    None => user.to_string(),
                })
            });
            account = account.or_else(|| {
                env.get(env::PYEXCH_EMAIL_DOMAIN)
                    .map(|domain| format!("{user}@{domain}"))
            });
        }
        if env.get(env::PYEXCH_PWD_FILE).is_some() {
            warn!("PYEXCH_PWD_FILE is set but password authentication is not supported; using OAuth2");
        }

        let account = account.ok_or_else(|| {
            ExchError::Config(format!(
                "No account configured. Add `account <address>` to the {} entry in {}, \
                or set PYEXCH_USER and PYEXCH_EMAIL_DOMAIN",
                EXCHANGE_MACHINE,
                netrc_file.display()
            ))
        })?;

        // Regex classes
        let regex_map = match regex_map {
            Some(map) => map,
            None => match env.get(env::PYEXCH_REGEX_JSON) {
                Some(json) => RegexMap::from_json(json)?,
                None => RegexMap::default(),
            },
        };

        // OAuth client
        let explicit_oauth = env.path_of(&[env::OAUTH_CONFIG_FILE, env::PYEXCH_OAUTH_CONFIG]);
        if let Some(path) = &explicit_oauth
            && !path.exists()
        {
            return Err(ExchError::Config(format!(
                "OAuth config file {} does not exist",
                path.display()
            )));
        }
        let oauth_config_file = match explicit_oauth {
            Some(path) => path,
            None => home_path(DEFAULT_OAUTH_CONFIG)?,
        };
        let oauth = load_oauth_config(&oauth_config_file, env)?;

        // Token file
        let token_file = match token_file
            .or_else(|| env.path_of(&[env::OAUTH_TOKEN_FILE, env::PYEXCH_TOKEN_FILE]))
        {
            Some(path) => path,
            None => home_path(DEFAULT_TOKEN_FILE)?,
        };

        debug!(
            account = %account,
            oauth_config = %oauth_config_file.display(),
            token_file = %token_file.display(),
            "resolved settings"
        );

        Ok(Settings {
            oauth,
            login,
            account,
            regex_map,
            token_file,
            oauth_config_file,
            netrc_file,
        })
    }
}

/// Load the OAuth client fields: YAML file first, then `PYEXCH_*` variables
/// (`PYEXCH_SCOPE` is space separated).
pub fn load_oauth_config(path: &Path, env: &EnvVars) -> ExchResult<OAuthConfig> {
    // Values stay strings; only the scope list is split.
    let mut vars = env.as_map();
    vars.remove(env::PYEXCH_SCOPE);

    let mut builder = Config::builder()
        .add_source(
            File::from(path.to_path_buf())
                .format(FileFormat::Yaml)
                .required(false),
        )
        .add_source(
            Environment::with_prefix(env::OAUTH_ENV_PREFIX)
                .ignore_empty(true)
                .source(Some(vars)),
        );

    if let Some(scope) = env.get(env::PYEXCH_SCOPE) {
        let scope: Vec<String> = scope.split_whitespace().map(str::to_string).collect();
        builder = builder.set_override("scope", scope)?;
    }

    let oauth: OAuthConfig = builder
        .build()?
        .try_deserialize()
        .map_err(|e| {
            ExchError::Config(format!(
                "Failed to load OAuth config from {} and PYEXCH_* variables: {}",
                path.display(),
                e
            ))
        })?;

    oauth.validate(path)?;

    Ok(oauth)
}

fn home_path(relative: &str) -> ExchResult<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(relative))
        .ok_or_else(|| ExchError::Config("Could not determine home directory".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const YAML: &str = "\
tenant_id: contoso-tenant
client_id: 11111111-2222-3333-4444-555555555555
client_secret: s3cret
scope:
  - https://graph.microsoft.com/Calendars.ReadWrite
  - offline_access
";

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::write(
                dir.path().join("netrc"),
                "machine EXCH login jdoe@contoso.com account team@contoso.com\n",
            )
            .unwrap();
            Fixture { dir }
        }

        fn path(&self, name: &str) -> String {
            self.dir.path().join(name).to_string_lossy().into_owned()
        }

        fn with_yaml(&self) -> String {
            let path = self.path("oauth.yaml");
            fs::write(&path, YAML).unwrap();
            path
        }
    }

    #[test]
    fn env_and_file_produce_identical_settings() {
        let fx = Fixture::new();

        let from_file = EnvVars::from_pairs([
            (env::NETRC, fx.path("netrc")),
            (env::OAUTH_CONFIG_FILE, fx.with_yaml()),
            (env::OAUTH_TOKEN_FILE, fx.path("token")),
        ]);
        let empty = fx.path("empty.yaml");
        fs::write(&empty, "{}\n").unwrap();
        let from_env = EnvVars::from_pairs([
            (env::NETRC, fx.path("netrc")),
            (env::OAUTH_CONFIG_FILE, empty),
            (env::OAUTH_TOKEN_FILE, fx.path("token")),
            ("PYEXCH_TENANT_ID", "contoso-tenant".to_string()),
            (
                "PYEXCH_CLIENT_ID",
                "11111111-2222-3333-4444-555555555555".to_string(),
            ),
            ("PYEXCH_CLIENT_SECRET", "s3cret".to_string()),
            (
                "PYEXCH_SCOPE",
                "https://graph.microsoft.com/Calendars.ReadWrite offline_access".to_string(),
            ),
        ]);

        let a = Settings::resolve(Overrides::default(), &from_file).unwrap();
        let b = Settings::resolve(Overrides::default(), &from_env).unwrap();

        assert_eq!(a.oauth, b.oauth);
        assert_eq!(a.login, b.login);
        assert_eq!(a.account, b.account);
        assert_eq!(a.token_file, b.token_file);
        assert_eq!(a.oauth.authority, DEFAULT_AUTHORITY);
        assert_eq!(a.oauth.scope.len(), 2);
    }

    #[test]
    fn env_overrides_file_fields() {
        let fx = Fixture::new();
        let env = EnvVars::from_pairs([
            (env::NETRC, fx.path("netrc")),
            (env::PYEXCH_OAUTH_CONFIG, fx.with_yaml()),
            ("PYEXCH_CLIENT_SECRET", "rotated".to_string()),
        ]);

        let settings = Settings::resolve(Overrides::default(), &env).unwrap();

        assert_eq!(settings.oauth.client_secret, "rotated");
        assert_eq!(settings.oauth.tenant_id, "contoso-tenant");
    }

    #[test]
    fn numeric_looking_env_values_stay_verbatim() {
        let fx = Fixture::new();
        let env = EnvVars::from_pairs([
            (env::NETRC, fx.path("netrc")),
            (env::OAUTH_CONFIG_FILE, fx.with_yaml()),
            ("PYEXCH_CLIENT_SECRET", "007e1".to_string()),
            ("PYEXCH_CLIENT_ID", "0123".to_string()),
            ("PYEXCH_TENANT_ID", "true".to_string()),
            (env::PYEXCH_SCOPE, "  Calendars.ReadWrite   offline_access ".to_string()),
        ]);

        let oauth = Settings::resolve(Overrides::default(), &env).unwrap().oauth;

        assert_eq!(oauth.client_secret, "007e1");
        assert_eq!(oauth.client_id, "0123");
        assert_eq!(oauth.tenant_id, "true");
        assert_eq!(oauth.scope, vec!["Calendars.ReadWrite", "offline_access"]);
    }

    #[test]
    fn netrc_supplies_login_and_account() {
        let fx = Fixture::new();
        let env = EnvVars::from_pairs([
            (env::NETRC, fx.path("netrc")),
            (env::OAUTH_CONFIG_FILE, fx.with_yaml()),
        ]);

        let settings = Settings::resolve(Overrides::default(), &env).unwrap();

        assert_eq!(settings.login.as_deref(), Some("jdoe@contoso.com"));
        assert_eq!(settings.account, "team@contoso.com");
    }

    #[test]
    fn overrides_beat_netrc() {
        let fx = Fixture::new();
        let env = EnvVars::from_pairs([
            (env::NETRC, fx.path("netrc")),
            (env::OAUTH_CONFIG_FILE, fx.with_yaml()),
        ]);
        let overrides = Overrides {
            account: Some("other@contoso.com".into()),
            regex_map: Some(RegexMap::from_pairs([("PTO", "pto")]).unwrap()),
            ..Default::default()
        };

        let settings = Settings::resolve(overrides, &env).unwrap();

        assert_eq!(settings.account, "other@contoso.com");
        assert_eq!(settings.login.as_deref(), Some("jdoe@contoso.com"));
        assert_eq!(settings.regex_map.labels().collect::<Vec<_>>(), vec!["PTO"]);
    }

    #[test]
    fn legacy_user_variables_build_identity() {
        let fx = Fixture::new();
        fs::write(fx.path("netrc"), "machine other login x\n").unwrap();
        let env = EnvVars::from_pairs([
            (env::NETRC, fx.path("netrc")),
            (env::OAUTH_CONFIG_FILE, fx.with_yaml()),
            (env::PYEXCH_USER, "jdoe".to_string()),
            (env::PYEXCH_AD_DOMAIN, "CONTOSO".to_string()),
            (env::PYEXCH_EMAIL_DOMAIN, "contoso.com".to_string()),
        ]);

        let settings = Settings::resolve(Overrides::default(), &env).unwrap();

        assert_eq!(settings.login.as_deref(), Some("CONTOSO\\jdoe"));
        assert_eq!(settings.account, "jdoe@contoso.com");
    }

    #[test]
    fn regex_map_from_environment() {
        let fx = Fixture::new();
        let env = EnvVars::from_pairs([
            (env::NETRC, fx.path("netrc")),
            (env::OAUTH_CONFIG_FILE, fx.with_yaml()),
            (env::PYEXCH_REGEX_JSON, r#"{"NOTWORK": "(sick|vacation)"}"#.to_string()),
        ]);

        let settings = Settings::resolve(Overrides::default(), &env).unwrap();

        assert_eq!(settings.regex_map.classify("vacation"), Some("NOTWORK"));
    }

    #[test]
    fn missing_account_is_a_config_error() {
        let fx = Fixture::new();
        fs::write(fx.path("netrc"), "machine EXCH login jdoe\n").unwrap();
        let env = EnvVars::from_pairs([
            (env::NETRC, fx.path("netrc")),
            (env::OAUTH_CONFIG_FILE, fx.with_yaml()),
        ]);

        let err = Settings::resolve(Overrides::default(), &env).unwrap_err();
        assert!(err.to_string().contains("No account configured"));
    }

    #[test]
    fn missing_oauth_fields_are_reported() {
        let fx = Fixture::new();
        let path = fx.path("partial.yaml");
        fs::write(&path, "tenant_id: t\nclient_id: c\nclient_secret: ''\nscope: []\n").unwrap();
        let env = EnvVars::from_pairs([
            (env::NETRC, fx.path("netrc")),
            (env::OAUTH_CONFIG_FILE, path),
        ]);

        let err = Settings::resolve(Overrides::default(), &env).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("client_secret"));
        assert!(message.contains("scope"));
    }

    #[test]
    fn explicit_missing_config_file_fails() {
        let fx = Fixture::new();
        let env = EnvVars::from_pairs([
            (env::NETRC, fx.path("netrc")),
            (env::OAUTH_CONFIG_FILE, fx.path("nope.yaml")),
        ]);

        assert!(matches!(
            Settings::resolve(Overrides::default(), &env),
            Err(ExchError::Config(_))
        ));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let fx = Fixture::new();
        let oauth = load_oauth_config(Path::new(&fx.with_yaml()), &EnvVars::default()).unwrap();

        let printed = format!("{oauth:?}");
        assert!(!printed.contains("s3cret"));
        assert!(printed.contains("<redacted>"));
    }
}
