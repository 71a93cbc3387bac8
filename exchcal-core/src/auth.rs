//! OAuth2 login against the Microsoft identity platform.
//!
//! The authorization-code flow and the refresh grant are driven by the
//! `oauth2` crate. This module only decides which one to run and keeps the
//! resulting token on disk.

use chrono::{DateTime, Utc};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet,
    EndpointSet, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::OAuthConfig;
use crate::error::{ExchError, ExchResult};
use crate::token::{Token, TokenStore};

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

type IdentityClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Interaction with the person logging in.
pub trait AuthPrompt {
    /// Present `authorize_url` and return the full URL the browser was
    /// redirected to after consent.
    fn redirect_response(&self, authorize_url: &Url) -> ExchResult<String>;
}

pub struct Authenticator {
    client: IdentityClient,
    scopes: Vec<Scope>,
    http: reqwest::Client,
    store: TokenStore,
}

impl Authenticator {
    pub fn new(oauth: &OAuthConfig, store: TokenStore) -> ExchResult<Self> {
        let base = format!(
            "{}/{}/oauth2/v2.0",
            oauth.authority.trim_end_matches('/'),
            oauth.tenant_id
        );

        let auth_url = AuthUrl::new(format!("{base}/authorize"))
            .map_err(|e| ExchError::Config(format!("Invalid authorize URL: {e}")))?;
        let token_url = TokenUrl::new(format!("{base}/token"))
            .map_err(|e| ExchError::Config(format!("Invalid token URL: {e}")))?;
        let redirect_url = RedirectUrl::new(oauth.redirect_uri.clone())
            .map_err(|e| ExchError::Config(format!("Invalid redirect URI: {e}")))?;

        let client = BasicClient::new(ClientId::new(oauth.client_id.clone()))
            .set_client_secret(ClientSecret::new(oauth.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url)
            .set_auth_type(AuthType::RequestBody);

        // Token endpoints must not be followed through redirects.
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            scopes: oauth.scope.iter().cloned().map(Scope::new).collect(),
            http,
            store,
        })
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// A valid access token: the stored one if still fresh, otherwise a
    /// refreshed one, otherwise one from a new interactive login.
    pub async fn login(&self, prompt: &dyn AuthPrompt) -> ExchResult<Token> {
        let stored = self.store.load()?;

        match stored {
            Some(token) if !token.is_expired(Utc::now()) => {
                debug!(path = %self.store.path().display(), "using stored token");
                Ok(token)
            }
            Some(token) => {
                if token.refresh_token.is_some() {
                    match self.refresh(&token).await {
                        Ok(fresh) => return Ok(fresh),
                        Err(e) => warn!(error = %e, "token refresh failed, starting a new login"),
                    }
                } else {
                    debug!("stored token expired and has no refresh token");
                }
                self.interactive_login(prompt).await
            }
            None => {
                debug!(path = %self.store.path().display(), "no stored token");
                self.interactive_login(prompt).await
            }
        }
    }

    /// Run the authorization-code flow unconditionally.
    pub async fn interactive_login(&self, prompt: &dyn AuthPrompt) -> ExchResult<Token> {
        let (authorize_url, state) = self.authorize_url();
        let response = prompt.redirect_response(&authorize_url)?;
        self.exchange_redirect(&response, &state).await
    }

    pub fn authorize_url(&self) -> (Url, CsrfToken) {
        self.client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned())
            .url()
    }

    /// Trade the redirect the user pasted back for a token and persist it.
    pub async fn exchange_redirect(&self, response: &str, state: &CsrfToken) -> ExchResult<Token> {
        let code = authorization_code(response, state)?;

        let response = self
            .client
            .exchange_code(code)
            .request_async(&self.http)
            .await
            .map_err(|e| ExchError::OAuth(format!("Authorization code exchange failed: {e}")))?;

        let token = token_from_response(&response, None, Utc::now());
        self.store.save(&token)?;
        info!(path = %self.store.path().display(), "obtained new token");

        Ok(token)
    }

    /// Use the refresh token of `token` to obtain a new access token and persist it.
    pub async fn refresh(&self, token: &Token) -> ExchResult<Token> {
        let refresh_token = token
            .refresh_token
            .clone()
            .ok_or_else(|| ExchError::Token("Token has no refresh token".into()))?;

        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.clone()))
            .add_scopes(self.scopes.iter().cloned())
            .request_async(&self.http)
            .await
            .map_err(|e| ExchError::OAuth(format!("Token refresh failed: {e}")))?;

        let fresh = token_from_response(&response, Some(refresh_token), Utc::now());
        self.store.save(&fresh)?;
        info!(path = %self.store.path().display(), "refreshed token");

        Ok(fresh)
    }
}

/// Pull the authorization code out of a redirect URL, checking its state.
fn authorization_code(response: &str, expected: &CsrfToken) -> ExchResult<AuthorizationCode> {
    let url = Url::parse(response.trim())
        .map_err(|e| ExchError::OAuth(format!("Not a redirect URL ({e}): {response}")))?;

    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };

    if let Some(error) = param("error") {
        let description = param("error_description").unwrap_or_default();
        return Err(ExchError::OAuth(format!("{error}: {description}")));
    }

    match param("state") {
        Some(state) if state == *expected.secret() => {}
        _ => return Err(ExchError::StateMismatch),
    }

    param("code")
        .map(AuthorizationCode::new)
        .ok_or_else(|| ExchError::OAuth("Redirect URL has no authorization code".into()))
}

fn token_from_response(
    response: &BasicTokenResponse,
    previous_refresh: Option<String>,
    now: DateTime<Utc>,
) -> Token {
    let expires_in = response.expires_in().map(|d| d.as_secs());
    let lifetime = expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

    Token {
        access_token: response.access_token().secret().clone(),
        // Refresh grants may omit a new refresh token; keep the old one.
        refresh_token: response
            .refresh_token()
            .map(|t| t.secret().clone())
            .or(previous_refresh),
        token_type: "Bearer".to_string(),
        expires_in,
        expires_at: now.timestamp() as f64 + lifetime as f64,
        scope: response
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default(),
    }
}
