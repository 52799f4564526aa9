//! OCI manifest and descriptor types.
//!
//! Field declaration order is the serialization order and therefore part of
//! the digest contract: `schemaVersion, mediaType, config, layers,
//! annotations` for manifests and `mediaType, digest, size, annotations` for
//! descriptors. Do not reorder.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{OCI_MANIFEST_MEDIA_TYPE, TITLE_ANNOTATION};

/// A content descriptor without annotations (used for `config`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content.
    pub media_type: String,
    /// `sha256:<hex>` digest of the content.
    pub digest: String,
    /// Exact byte length of the content.
    pub size: u64,
}

/// A layer descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    /// Media type of the layer.
    pub media_type: String,
    /// `sha256:<hex>` digest of the layer bytes.
    pub digest: String,
    /// Exact byte length of the layer.
    pub size: u64,
    /// Layer annotations; carries the file title.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Layer {
    /// The packaged file's base name, if annotated.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.annotations.get(TITLE_ANNOTATION).map(String::as_str)
    }
}

/// An OCI image manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Always 2.
    pub schema_version: u32,
    /// Manifest media type.
    #[serde(default = "default_media_type")]
    pub media_type: String,
    /// Config descriptor.
    pub config: Descriptor,
    /// Content layers.
    pub layers: Vec<Layer>,
    /// Manifest annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
    /// Content digest of this manifest. Never serialized.
    #[serde(skip)]
    pub digest: Option<String>,
}

impl Manifest {
    /// The single layer of a feature or collection artifact.
    ///
    /// Returns `None` unless there is exactly one layer.
    #[must_use]
    pub fn single_layer(&self) -> Option<&Layer> {
        match self.layers.as_slice() {
            [layer] => Some(layer),
            _ => None,
        }
    }
}

fn default_media_type() -> String {
    OCI_MANIFEST_MEDIA_TYPE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_registry_manifest() {
        let json = r#"{
            "schemaVersion": 2,
            "mediaType": "application/vnd.oci.image.manifest.v1+json",
            "config": {
                "mediaType": "application/vnd.devcontainers",
                "digest": "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
                "size": 0
            },
            "layers": [{
                "mediaType": "application/vnd.devcontainers.layer.v1+tar",
                "digest": "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824",
                "size": 5,
                "annotations": {"org.opencontainers.image.title": "devcontainer-feature-go.tgz"}
            }],
            "annotations": {"com.github.package.type": "devcontainer_feature"}
        }"#;

        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.schema_version, 2);
        assert_eq!(manifest.config.size, 0);
        assert!(manifest.digest.is_none());
        let layer = manifest.single_layer().unwrap();
        assert_eq!(layer.title(), Some("devcontainer-feature-go.tgz"));
    }

    #[test]
    fn test_media_type_defaults_when_absent() {
        let json = r#"{
            "schemaVersion": 2,
            "config": {"mediaType": "application/vnd.devcontainers", "digest": "sha256:00", "size": 0},
            "layers": []
        }"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.media_type, OCI_MANIFEST_MEDIA_TYPE);
        assert!(manifest.single_layer().is_none());
    }

    #[test]
    fn test_digest_field_is_not_serialized() {
        let manifest = Manifest {
            schema_version: 2,
            media_type: OCI_MANIFEST_MEDIA_TYPE.to_string(),
            config: Descriptor {
                media_type: "c".to_string(),
                digest: "sha256:00".to_string(),
                size: 0,
            },
            layers: vec![],
            annotations: None,
            digest: Some("sha256:ff".to_string()),
        };
        let json = serde_json::to_string(&manifest).unwrap();
        assert!(!json.contains("sha256:ff"));
        assert!(!json.contains("annotations"));
    }
}
