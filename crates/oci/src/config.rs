//! Client configuration and environment credentials.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable holding a GitHub token, used for `ghcr.io` only.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Environment variable mapping registries to tokens: `host:token,host2:token2`.
pub const OCI_AUTH_ENV: &str = "DEVCONTAINERS_OCI_AUTH";

/// The registry that honors [`GITHUB_TOKEN_ENV`].
pub(crate) const GITHUB_REGISTRY: &str = "ghcr.io";

/// URL scheme used to reach registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientProtocol {
    /// TLS (default).
    #[default]
    Https,
    /// Plain text, for local test registries.
    Http,
}

impl ClientProtocol {
    /// The URL scheme.
    #[must_use]
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::Http => "http",
        }
    }
}

/// Configuration for [`crate::RegistryClient`].
#[derive(Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Scheme for registry and token endpoint URLs.
    #[serde(default)]
    pub protocol: ClientProtocol,

    /// `User-Agent` header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Credentials exchanged for bearer tokens.
    #[serde(skip)]
    pub credentials: Credentials,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol: ClientProtocol::default(),
            user_agent: default_user_agent(),
            credentials: Credentials::default(),
        }
    }
}

impl ClientConfig {
    /// Default configuration with credentials read from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            credentials: Credentials::from_env(),
            ..Default::default()
        }
    }
}

/// User credentials, keyed by registry.
#[derive(Debug, Default)]
pub struct Credentials {
    /// Token for `ghcr.io`.
    pub github_token: Option<SecretString>,
    /// `(registry, token)` pairs for arbitrary registries.
    pub registry_tokens: Vec<(String, SecretString)>,
}

impl Credentials {
    /// Read [`GITHUB_TOKEN_ENV`] and [`OCI_AUTH_ENV`].
    #[must_use]
    pub fn from_env() -> Self {
        let github_token = std::env::var(GITHUB_TOKEN_ENV)
            .ok()
            .filter(|token| !token.is_empty())
            .map(SecretString::from);
        let registry_tokens = std::env::var(OCI_AUTH_ENV)
            .map(|value| parse_registry_tokens(&value))
            .unwrap_or_default();

        Self {
            github_token,
            registry_tokens,
        }
    }

    /// The user token to exchange for a bearer token on `registry`.
    ///
    /// `GITHUB_TOKEN` wins for `ghcr.io`; otherwise the first matching
    /// registry entry is used.
    #[must_use]
    pub fn token_for(&self, registry: &str) -> Option<&SecretString> {
        if registry == GITHUB_REGISTRY
            && let Some(token) = &self.github_token
        {
            return Some(token);
        }

        self.registry_tokens
            .iter()
            .find(|(host, _)| host == registry)
            .map(|(_, token)| token)
    }
}

/// Parse `host:token,host2:token2`. The token is split off at the last colon
/// so hosts with ports work.
fn parse_registry_tokens(value: &str) -> Vec<(String, SecretString)> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.rsplit_once(':') {
            Some((host, token)) if !host.is_empty() && !token.is_empty() => {
                Some((host.to_string(), SecretString::from(token.to_string())))
            }
            _ => {
                debug!("Ignoring malformed {OCI_AUTH_ENV} entry");
                None
            }
        })
        .collect()
}

fn default_user_agent() -> String {
    "devcontainer".to_string()
}
