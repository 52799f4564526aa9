//! Registry HTTP client.
//!
//! Pull, push and token operations live in their own modules as `impl`
//! blocks on [`RegistryClient`]; this module holds the transport and URL
//! layout shared by all of them.

use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};

use crate::reference::{ArtifactRef, RegistryTarget};
use crate::{ClientConfig, Result};

/// Client for the OCI distribution API of one or more registries.
#[derive(Debug)]
pub struct RegistryClient {
    pub(crate) http: reqwest::Client,
    pub(crate) config: ClientConfig,
}

impl RegistryClient {
    /// Create a client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend
    /// initialization failure).
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { http, config })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `<scheme>://<registry>`
    pub(crate) fn base_url(&self, registry: &str) -> String {
        format!("{}://{registry}", self.config.protocol.scheme())
    }

    /// `GET`/`PUT` URL of a manifest by tag or digest.
    pub(crate) fn manifest_url(&self, target: &impl RegistryTarget, reference: &str) -> String {
        format!(
            "{}/v2/{}/manifests/{reference}",
            self.base_url(target.registry()),
            target.path()
        )
    }

    /// URL of a blob by digest.
    #[must_use]
    pub fn blob_url(&self, target: &impl RegistryTarget, digest: &str) -> String {
        format!(
            "{}/v2/{}/blobs/{digest}",
            self.base_url(target.registry()),
            target.path()
        )
    }

    /// URL that opens a blob upload session.
    pub(crate) fn upload_url(&self, target: &impl RegistryTarget) -> String {
        format!(
            "{}/v2/{}/blobs/uploads/",
            self.base_url(target.registry()),
            target.path()
        )
    }

    /// URL of a feature's tag list.
    pub(crate) fn tags_url(&self, reference: &ArtifactRef) -> String {
        format!(
            "{}/v2/{}/{}/tags/list",
            self.base_url(&reference.registry),
            reference.namespace,
            reference.id
        )
    }
}

/// Attach a bearer token when one is available.
pub(crate) fn with_bearer(request: RequestBuilder, token: Option<&SecretString>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token.expose_secret()),
        None => request,
    }
}
