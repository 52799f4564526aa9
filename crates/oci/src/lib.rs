//! OCI distribution client for devcontainer feature artifacts.
//!
//! This crate speaks the subset of the OCI Distribution Specification needed
//! to publish and consume features and feature collections:
//! - Parse feature identifiers into registry/namespace/id/version parts
//! - Resolve bearer tokens from environment credentials or anonymously
//! - Pull manifests, blobs and tag lists
//! - Push blobs and manifests, reusing content that is already stored
//! - Compute canonical manifests and their content digests
//!
//! # Example
//!
//! ```ignore
//! use devfeat_oci::{ArtifactRef, ClientConfig, RegistryClient};
//!
//! let client = RegistryClient::new(ClientConfig::from_env())?;
//! let reference = ArtifactRef::parse("ghcr.io/devcontainers/features/go:1");
//!
//! if let Some(manifest) = client.fetch_feature(&reference, &cache, &dest).await {
//!     println!("installed {}", manifest.layers[0].title().unwrap_or_default());
//! }
//! ```

mod auth;
mod client;
mod collection;
mod config;
mod digest;
mod error;
mod extract;
mod manifest;
mod pull;
mod push;
mod reference;
mod tags;

#[cfg(test)]
mod test_utils;

pub use client::RegistryClient;
pub use config::{ClientConfig, ClientProtocol, Credentials, GITHUB_TOKEN_ENV, OCI_AUTH_ENV};
pub use digest::{
    ManifestBuild, build_manifest, build_manifest_with_config, canonical_json, digest_layer,
    sha256_digest,
};
pub use error::{Error, Result};
pub use extract::extract_archive;
pub use manifest::{Descriptor, Layer, Manifest};
pub use push::{ArtifactKind, PushOutcome};
pub use reference::{ArtifactRef, CollectionRef, RegistryTarget, is_local_alias};
pub use tags::{semantic_tags, sort_tags};

/// Media type of an OCI image manifest.
pub const OCI_MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";

/// Config media type shared by every devcontainer artifact.
pub const DEVCONTAINER_CONFIG_MEDIA_TYPE: &str = "application/vnd.devcontainers";

/// Layer media type of an individual feature package.
pub const DEVCONTAINER_TAR_LAYER_MEDIA_TYPE: &str = "application/vnd.devcontainers.layer.v1+tar";

/// Layer media type of a feature collection's metadata file.
pub const DEVCONTAINER_COLLECTION_LAYER_MEDIA_TYPE: &str =
    "application/vnd.devcontainers.collection.layer.v1+json";

/// Digest of the zero-byte config payload.
pub const EMPTY_CONFIG_DIGEST: &str =
    "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Annotation key holding a layer's file name.
pub const TITLE_ANNOTATION: &str = "org.opencontainers.image.title";

/// File name of a collection's metadata layer.
pub const COLLECTION_METADATA_FILE: &str = "devcontainer-collection.json";
