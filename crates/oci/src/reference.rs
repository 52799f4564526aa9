//! Feature and collection identifiers.
//!
//! A feature identifier looks like `ghcr.io/devcontainers/features/go:1`.
//! Parsing is permissive: any string yields an [`ArtifactRef`], and callers
//! that need guarantees call [`ArtifactRef::validate`] or
//! [`ArtifactRef::try_parse`].

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Tag used when an identifier carries no version.
const DEFAULT_VERSION: &str = "latest";

/// Anything that addresses a repository on a registry.
pub trait RegistryTarget {
    /// Registry host, possibly with a port.
    fn registry(&self) -> &str;

    /// Repository path below the registry.
    fn path(&self) -> &str;

    /// Tag pulled when no digest is given.
    fn version(&self) -> &str;

    /// `registry/path`.
    fn resource(&self) -> String {
        format!("{}/{}", self.registry(), self.path())
    }
}

/// Whether a registry value is a local alias rather than a network host.
///
/// Hosts without a `.` never reach the network; pull and push skip them.
#[must_use]
pub fn is_local_alias(registry: &str) -> bool {
    !registry.contains('.')
}

/// A parsed feature identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Registry host, e.g. `ghcr.io`.
    pub registry: String,
    /// First path segment, e.g. `devcontainers`.
    pub owner: String,
    /// Every segment between registry and id, e.g. `devcontainers/features`.
    pub namespace: String,
    /// `namespace/id`.
    pub path: String,
    /// `registry/path`.
    pub resource: String,
    /// Last path segment, e.g. `go`.
    pub id: String,
    /// Tag, `latest` when the identifier has none.
    pub version: String,
}

impl ArtifactRef {
    /// Decompose an identifier. Never fails; see [`Self::validate`].
    #[must_use]
    pub fn parse(identifier: &str) -> Self {
        let (resource, version) = split_version(identifier);
        let segments: Vec<&str> = resource.split('/').collect();

        let registry = segments.first().copied().unwrap_or_default();
        let owner = segments.get(1).copied().unwrap_or_default();
        let id = segments.last().copied().unwrap_or_default();
        let namespace = if segments.len() > 2 {
            segments[1..segments.len() - 1].join("/")
        } else {
            String::new()
        };
        let path = format!("{namespace}/{id}");

        Self {
            registry: registry.to_string(),
            owner: owner.to_string(),
            resource: format!("{registry}/{path}"),
            namespace,
            path,
            id: id.to_string(),
            version: version.unwrap_or(DEFAULT_VERSION).to_string(),
        }
    }

    /// Parse and validate in one step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidReference`] when the identifier is malformed.
    pub fn try_parse(identifier: &str) -> Result<Self> {
        let reference = Self::parse(identifier);
        reference
            .validate()
            .map_err(|reason| Error::invalid_reference(identifier, reason))?;
        Ok(reference)
    }

    /// Check that this reference can be used against a registry.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.registry.is_empty() {
            return Err("missing registry".to_string());
        }
        if self.namespace.is_empty() {
            return Err("missing namespace".to_string());
        }
        if self.id.is_empty() {
            return Err("missing id".to_string());
        }
        if self.version.is_empty() {
            return Err("empty version".to_string());
        }
        if self.path.split('/').any(str::is_empty) {
            return Err(format!("empty segment in '{}'", self.path));
        }
        if let Some(c) = self.path.chars().find(|c| !is_path_char(*c)) {
            return Err(format!("invalid character '{c}' in '{}'", self.path));
        }
        Ok(())
    }

    /// The collection this feature is published in.
    #[must_use]
    pub fn collection(&self) -> CollectionRef {
        CollectionRef {
            registry: self.registry.clone(),
            path: self.namespace.clone(),
            version: DEFAULT_VERSION.to_string(),
        }
    }

    /// The identifier without its version, e.g. `ghcr.io/devcontainers/features/go`.
    #[must_use]
    pub fn without_version(&self) -> &str {
        &self.resource
    }
}

impl RegistryTarget for ArtifactRef {
    fn registry(&self) -> &str {
        &self.registry
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn resource(&self) -> String {
        self.resource.clone()
    }
}

impl std::fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.resource, self.version)
    }
}

/// Identifies a feature collection's metadata artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionRef {
    /// Registry host.
    pub registry: String,
    /// Repository path of the collection, e.g. `devcontainers/features`.
    pub path: String,
    /// Always `latest` for collections.
    pub version: String,
}

impl CollectionRef {
    /// Parse `<registry>/<path>`. Any `:version` suffix is ignored.
    #[must_use]
    pub fn parse(identifier: &str) -> Self {
        let (resource, _) = split_version(identifier);
        let (registry, path) = resource.split_once('/').unwrap_or((resource, ""));
        Self {
            registry: registry.to_string(),
            path: path.to_string(),
            version: DEFAULT_VERSION.to_string(),
        }
    }
}

impl RegistryTarget for CollectionRef {
    fn registry(&self) -> &str {
        &self.registry
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn version(&self) -> &str {
        &self.version
    }
}

/// Split `resource:version` at the last colon, unless that colon belongs to
/// a registry port (`localhost:5000/a/b`).
fn split_version(identifier: &str) -> (&str, Option<&str>) {
    match identifier.rsplit_once(':') {
        Some((resource, version)) if !version.contains('/') => (resource, Some(version)),
        _ => (identifier, None),
    }
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-' | '/')
}
