//! Error types for registry operations.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to an OCI registry.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The identifier does not name a registry artifact.
    #[error("Invalid artifact reference '{reference}': {reason}")]
    #[diagnostic(
        code(devfeat_oci::reference::invalid),
        help("Expected <registry>/<namespace>/<id>[:<version>]")
    )]
    InvalidReference {
        /// The identifier as supplied.
        reference: String,
        /// What is wrong with it.
        reason: String,
    },

    /// No token could be obtained for an operation that requires one.
    #[error("Authentication failed for '{registry}/{path}' (scope: {scope})")]
    #[diagnostic(
        code(devfeat_oci::auth::failed),
        help("Set GITHUB_TOKEN for ghcr.io or DEVCONTAINERS_OCI_AUTH=<registry>:<token>")
    )]
    AuthenticationFailed {
        /// The registry host.
        registry: String,
        /// The repository path.
        path: String,
        /// The requested scope verbs.
        scope: String,
    },

    /// The registry answered with a status the protocol step does not allow.
    #[error("{operation} failed: {url} returned HTTP {status}")]
    #[diagnostic(code(devfeat_oci::http::status))]
    UnexpectedStatus {
        /// The protocol step that failed.
        operation: String,
        /// The request URL.
        url: String,
        /// The status code received.
        status: u16,
    },

    /// An upload session was opened without a `Location` header.
    #[error("Upload session for {url} did not return a Location header")]
    #[diagnostic(code(devfeat_oci::push::location))]
    MissingLocation {
        /// The session URL that was posted to.
        url: String,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    #[diagnostic(code(devfeat_oci::http::transport))]
    Http(#[from] reqwest::Error),

    /// A URL could not be assembled.
    #[error("Invalid URL '{url}': {reason}")]
    #[diagnostic(code(devfeat_oci::http::url))]
    InvalidUrl {
        /// The URL text.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    #[diagnostic(code(devfeat_oci::io))]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    #[diagnostic(code(devfeat_oci::json))]
    Json(#[from] serde_json::Error),

    /// Content does not hash to the digest it was addressed by.
    #[error("Digest mismatch: expected {expected}, got {actual}")]
    #[diagnostic(code(devfeat_oci::digest::mismatch))]
    DigestMismatch {
        /// The expected digest.
        expected: String,
        /// The computed digest.
        actual: String,
    },

    /// The manifest describes a different kind of artifact.
    #[error("Unexpected media type: expected {expected}, got {actual}")]
    #[diagnostic(code(devfeat_oci::manifest::media_type))]
    MediaTypeMismatch {
        /// The expected media type.
        expected: String,
        /// The media type found.
        actual: String,
    },

    /// Only single-layer artifacts can be installed.
    #[error("Expected exactly one layer, manifest has {count}")]
    #[diagnostic(code(devfeat_oci::manifest::layers))]
    UnsupportedLayerCount {
        /// Number of layers in the manifest.
        count: usize,
    },

    /// A release version is not valid semver.
    #[error("Invalid version '{version}': {reason}")]
    #[diagnostic(code(devfeat_oci::tags::version))]
    InvalidVersion {
        /// The version as supplied.
        version: String,
        /// Parser message.
        reason: String,
    },
}

impl Error {
    /// Create an invalid reference error.
    #[must_use]
    pub fn invalid_reference(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Create an authentication failed error.
    #[must_use]
    pub fn authentication_failed(
        registry: impl Into<String>,
        path: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self::AuthenticationFailed {
            registry: registry.into(),
            path: path.into(),
            scope: scope.into(),
        }
    }

    /// Create an unexpected status error.
    #[must_use]
    pub fn unexpected_status(
        operation: impl Into<String>,
        url: impl Into<String>,
        status: reqwest::StatusCode,
    ) -> Self {
        Self::UnexpectedStatus {
            operation: operation.into(),
            url: url.into(),
            status: status.as_u16(),
        }
    }

    /// Create an invalid URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a digest mismatch error.
    #[must_use]
    pub fn digest_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::DigestMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a media type mismatch error.
    #[must_use]
    pub fn media_type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::MediaTypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Whether this is a 404 from the registry.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnexpectedStatus { status: 404, .. })
    }
}
