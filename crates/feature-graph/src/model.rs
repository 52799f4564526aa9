//! Feature sets as handed to the resolver.
//!
//! A [`FeatureSet`] ties the identifier a user wrote in their configuration
//! to where the feature came from and the feature metadata found there.

use devfeat_oci::{ArtifactRef, Manifest};
use serde::{Deserialize, Serialize};

/// Where a feature set was obtained from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SourceInformation {
    /// Pulled from an OCI registry.
    #[serde(rename_all = "camelCase")]
    Oci {
        /// The pulled manifest.
        manifest: Manifest,
        /// The parsed identifier.
        feature_ref: ArtifactRef,
        /// Identifier as written by the user, e.g. `ghcr.io/devcontainers/features/go:1`.
        user_feature_id: String,
        /// `user_feature_id` without its tag.
        user_feature_id_without_version: String,
    },
    /// A directory relative to the configuration.
    #[serde(rename_all = "camelCase")]
    FilePath {
        /// Absolute path of the feature directory.
        resolved_file_path: String,
        /// Identifier as written by the user.
        user_feature_id: String,
    },
    /// A tarball downloaded over HTTPS.
    #[serde(rename_all = "camelCase")]
    DirectTarball {
        /// URI of the tarball.
        tarball_uri: String,
        /// Identifier as written by the user.
        user_feature_id: String,
    },
    /// A feature bundled with the tool.
    #[serde(rename_all = "camelCase")]
    LocalCache {
        /// Identifier as written by the user.
        user_feature_id: String,
    },
}

impl SourceInformation {
    /// Identifier as written by the user.
    #[must_use]
    pub fn user_feature_id(&self) -> &str {
        match self {
            Self::Oci {
                user_feature_id, ..
            }
            | Self::FilePath {
                user_feature_id, ..
            }
            | Self::DirectTarball {
                user_feature_id, ..
            }
            | Self::LocalCache { user_feature_id } => user_feature_id,
        }
    }

    /// Identifier without its version. Only registry identifiers carry one.
    #[must_use]
    pub fn user_feature_id_without_version(&self) -> &str {
        match self {
            Self::Oci {
                user_feature_id_without_version,
                ..
            } => user_feature_id_without_version,
            other => other.user_feature_id(),
        }
    }

    /// `registry/namespace/` for registry features; legacy and current ids
    /// are published relative to it.
    #[must_use]
    pub fn alias_prefix(&self) -> Option<String> {
        match self {
            Self::Oci { feature_ref, .. } => Some(format!(
                "{}/{}/",
                feature_ref.registry, feature_ref.namespace
            )),
            _ => None,
        }
    }
}

/// One feature inside a set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    /// Short id from the feature's metadata, e.g. `go`.
    pub id: String,
    /// User-supplied options.
    #[serde(default)]
    pub value: serde_json::Value,
    /// Whether the feature is part of the install.
    #[serde(default)]
    pub included: bool,
    /// Features this one should install after, when present.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub installs_after: Vec<String>,
    /// Ids this feature was previously published under.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legacy_ids: Vec<String>,
    /// Id a legacy-named feature now goes by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_id: Option<String>,
}

impl Feature {
    /// An included feature with no options or relations.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            value: serde_json::Value::Bool(true),
            included: true,
            installs_after: Vec::new(),
            legacy_ids: Vec::new(),
            current_id: None,
        }
    }

    /// Set the soft dependencies.
    #[must_use]
    pub fn installs_after<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.installs_after = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Set the legacy ids.
    #[must_use]
    pub fn legacy_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.legacy_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Set the current id.
    #[must_use]
    pub fn current_id(mut self, id: impl Into<String>) -> Self {
        self.current_id = Some(id.into());
        self
    }
}

/// A user-requested feature reference together with its resolved features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSet {
    /// Origin of the set.
    pub source_information: SourceInformation,
    /// Features in the set.
    pub features: Vec<Feature>,
}

impl FeatureSet {
    /// A set pulled from a registry as `user_feature_id`.
    #[must_use]
    pub fn oci(user_feature_id: &str, manifest: Manifest, features: Vec<Feature>) -> Self {
        let feature_ref = ArtifactRef::parse(user_feature_id);
        Self {
            source_information: SourceInformation::Oci {
                manifest,
                user_feature_id_without_version: feature_ref.without_version().to_string(),
                user_feature_id: user_feature_id.to_string(),
                feature_ref,
            },
            features,
        }
    }

    /// A set bundled with the tool.
    #[must_use]
    pub fn local(user_feature_id: impl Into<String>, features: Vec<Feature>) -> Self {
        Self {
            source_information: SourceInformation::LocalCache {
                user_feature_id: user_feature_id.into(),
            },
            features,
        }
    }

    /// Identifier as written by the user.
    #[must_use]
    pub fn user_feature_id(&self) -> &str {
        self.source_information.user_feature_id()
    }

    /// Identifier without its version.
    #[must_use]
    pub fn user_feature_id_without_version(&self) -> &str {
        self.source_information.user_feature_id_without_version()
    }

    /// Whether `id` names this set, with or without its version.
    #[must_use]
    pub fn matches(&self, id: &str) -> bool {
        self.user_feature_id_without_version() == id || self.user_feature_id() == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devfeat_oci::{DEVCONTAINER_TAR_LAYER_MEDIA_TYPE, build_manifest, digest_layer};

    fn manifest() -> Manifest {
        let layer = digest_layer(b"go", "devcontainer-feature-go.tgz", DEVCONTAINER_TAR_LAYER_MEDIA_TYPE);
        build_manifest(layer, None).unwrap().manifest
    }

    #[test]
    fn test_oci_set_ids() {
        let set = FeatureSet::oci("ghcr.io/devcontainers/features/go:1", manifest(), vec![]);
        assert_eq!(set.user_feature_id(), "ghcr.io/devcontainers/features/go:1");
        assert_eq!(
            set.user_feature_id_without_version(),
            "ghcr.io/devcontainers/features/go"
        );
        assert_eq!(
            set.source_information.alias_prefix().as_deref(),
            Some("ghcr.io/devcontainers/features/")
        );
        assert!(set.matches("ghcr.io/devcontainers/features/go"));
        assert!(set.matches("ghcr.io/devcontainers/features/go:1"));
        assert!(!set.matches("ghcr.io/devcontainers/features/go:2"));
    }

    #[test]
    fn test_local_set_has_no_prefix() {
        let set = FeatureSet::local("docker-in-docker", vec![]);
        assert_eq!(set.user_feature_id_without_version(), "docker-in-docker");
        assert!(set.source_information.alias_prefix().is_none());
    }

    #[test]
    fn test_source_information_tagged_by_type() {
        let json = serde_json::json!({
            "sourceInformation": {
                "type": "file-path",
                "resolvedFilePath": "/work/.devcontainer/local",
                "userFeatureId": "./local"
            },
            "features": [{
                "id": "local",
                "value": { "version": "2" },
                "included": true,
                "installsAfter": ["ghcr.io/devcontainers/features/common-utils"]
            }]
        });

        let set: FeatureSet = serde_json::from_value(json).unwrap();
        assert_eq!(set.user_feature_id(), "./local");
        assert_eq!(set.features[0].installs_after.len(), 1);
        assert!(set.features[0].legacy_ids.is_empty());
        assert!(matches!(
            set.source_information,
            SourceInformation::FilePath { .. }
        ));
    }

    #[test]
    fn test_oci_set_serializes_camel_case() {
        let set = FeatureSet::oci("ghcr.io/devcontainers/features/go:1", manifest(), vec![
            Feature::new("go").legacy_ids(["golang"]),
        ]);
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(value["sourceInformation"]["type"], "oci");
        assert_eq!(
            value["sourceInformation"]["userFeatureIdWithoutVersion"],
            "ghcr.io/devcontainers/features/go"
        );
        assert_eq!(value["features"][0]["legacyIds"][0], "golang");
        assert!(value["features"][0].get("currentId").is_none());
    }
}
