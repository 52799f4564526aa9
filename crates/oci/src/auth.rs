//! Bearer token resolution.
//!
//! Tokens come from the registry's `/token` endpoint. When the environment
//! holds a user token for the registry it is sent as basic auth so the
//! issued bearer token carries that user's rights; otherwise the request is
//! anonymous. Failure never aborts here: callers decide whether to proceed
//! unauthenticated.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, trace, warn};

use crate::client::RegistryClient;
use crate::{Error, Result};

/// Scope for read-only operations.
pub(crate) const PULL_SCOPE: &str = "pull";

/// Scope for publishing.
pub(crate) const PUSH_SCOPE: &str = "pull,push";

/// Fixed basic-auth user name; registries only inspect the token.
const BASIC_AUTH_USER: &str = "USERNAME";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

impl RegistryClient {
    /// Fetch a bearer token for `repo_path` on `registry` with `scope`
    /// (`pull` or `pull,push`).
    ///
    /// Returns `None` on any failure; the reason is logged.
    pub async fn fetch_token(
        &self,
        registry: &str,
        repo_path: &str,
        scope: &str,
    ) -> Option<SecretString> {
        match self.request_token(registry, repo_path, scope).await {
            Ok(Some(token)) => {
                trace!(registry, path = repo_path, scope, "Obtained registry token");
                Some(SecretString::from(token))
            }
            Ok(None) => {
                warn!(registry, path = repo_path, scope, "Token response had no token");
                None
            }
            Err(e) => {
                warn!(registry, path = repo_path, scope, error = %e, "Failed to get registry auth token");
                None
            }
        }
    }

    async fn request_token(
        &self,
        registry: &str,
        repo_path: &str,
        scope: &str,
    ) -> Result<Option<String>> {
        let url = format!("{}/token", self.base_url(registry));
        let mut request = self.http.get(&url).query(&[
            ("scope", format!("repo:{repo_path}:{scope}")),
            ("service", registry.to_string()),
        ]);

        if let Some(user_token) = self.config.credentials.token_for(registry) {
            debug!(registry, "Using configured credentials for token exchange");
            request = request.basic_auth(BASIC_AUTH_USER, Some(user_token.expose_secret()));
        } else {
            trace!(registry, "No credentials configured, requesting anonymous token");
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::unexpected_status("Fetch token", url, status));
        }

        let body: TokenResponse = serde_json::from_slice(&response.bytes().await?)?;
        Ok(body.token.filter(|token| !token.is_empty()))
    }
}
