//! Content digests and canonical manifests.
//!
//! A manifest's digest is the sha256 of its compact JSON serialization.
//! Identical `(layer, annotations, config)` inputs always produce identical
//! bytes, which is what lets a push skip content the registry already has.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::manifest::{Descriptor, Layer, Manifest};
use crate::{DEVCONTAINER_CONFIG_MEDIA_TYPE, OCI_MANIFEST_MEDIA_TYPE, Result, TITLE_ANNOTATION};

/// A manifest ready to push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestBuild {
    /// The manifest, with `digest` populated.
    pub manifest: Manifest,
    /// Canonical JSON body, byte-for-byte what gets uploaded.
    pub canonical_json: String,
    /// `sha256:<hex>` of `canonical_json`.
    pub digest: String,
    /// Config blob bytes; empty unless metadata is embedded.
    pub config_payload: Vec<u8>,
}

/// Compute the OCI digest of a byte slice: `sha256:<hex>`.
#[must_use]
pub fn sha256_digest(bytes: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
}

/// Describe `bytes` as a layer titled with the base name of `title`.
#[must_use]
pub fn digest_layer(bytes: &[u8], title: &str, media_type: &str) -> Layer {
    let file_name = Path::new(title)
        .file_name()
        .map_or_else(|| title.to_string(), |name| name.to_string_lossy().into_owned());

    Layer {
        media_type: media_type.to_string(),
        digest: sha256_digest(bytes),
        size: bytes.len() as u64,
        annotations: BTreeMap::from([(TITLE_ANNOTATION.to_string(), file_name)]),
    }
}

/// Build the manifest for a single-layer artifact with the empty config.
///
/// # Errors
///
/// Returns an error if the manifest cannot be serialized.
pub fn build_manifest(
    layer: Layer,
    annotations: Option<BTreeMap<String, String>>,
) -> Result<ManifestBuild> {
    build_manifest_with_config(layer, Vec::new(), annotations)
}

/// Build the manifest for a single-layer artifact with a custom config payload.
///
/// # Errors
///
/// Returns an error if the manifest cannot be serialized.
pub fn build_manifest_with_config(
    layer: Layer,
    config_payload: Vec<u8>,
    annotations: Option<BTreeMap<String, String>>,
) -> Result<ManifestBuild> {
    let config = Descriptor {
        media_type: DEVCONTAINER_CONFIG_MEDIA_TYPE.to_string(),
        digest: sha256_digest(&config_payload),
        size: config_payload.len() as u64,
    };

    let mut manifest = Manifest {
        schema_version: 2,
        media_type: OCI_MANIFEST_MEDIA_TYPE.to_string(),
        config,
        layers: vec![layer],
        annotations: annotations.filter(|a| !a.is_empty()),
        digest: None,
    };

    let canonical_json = canonical_json(&manifest)?;
    let digest = sha256_digest(canonical_json.as_bytes());
    manifest.digest = Some(digest.clone());

    Ok(ManifestBuild {
        manifest,
        canonical_json,
        digest,
        config_payload,
    })
}

/// Serialize a manifest in canonical form: declared key order, no whitespace.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn canonical_json(manifest: &Manifest) -> Result<String> {
    Ok(serde_json::to_string(manifest)?)
}

/// Compute the digest of a file on disk.
pub(crate) async fn compute_file_digest(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DEVCONTAINER_TAR_LAYER_MEDIA_TYPE, EMPTY_CONFIG_DIGEST};
    use tempfile::TempDir;

    const HELLO_DIGEST: &str =
        "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_sha256_digest_known_values() {
        assert_eq!(sha256_digest(b""), EMPTY_CONFIG_DIGEST);
        assert_eq!(sha256_digest(b"hello"), HELLO_DIGEST);
    }

    #[test]
    fn test_digest_layer_uses_base_name() {
        let layer = digest_layer(
            b"hello",
            "/tmp/out/devcontainer-feature-go.tgz",
            DEVCONTAINER_TAR_LAYER_MEDIA_TYPE,
        );
        assert_eq!(layer.digest, HELLO_DIGEST);
        assert_eq!(layer.size, 5);
        assert_eq!(layer.title(), Some("devcontainer-feature-go.tgz"));
        assert_eq!(layer.media_type, DEVCONTAINER_TAR_LAYER_MEDIA_TYPE);
    }

    #[test]
    fn test_canonical_json_key_order() {
        let layer = digest_layer(
            b"hello",
            "devcontainer-feature-go.tgz",
            DEVCONTAINER_TAR_LAYER_MEDIA_TYPE,
        );
        let build = build_manifest(layer, None).unwrap();

        let expected = concat!(
            r#"{"schemaVersion":2,"mediaType":"application/vnd.oci.image.manifest.v1+json","#,
            r#""config":{"mediaType":"application/vnd.devcontainers","#,
            r#""digest":"sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855","size":0},"#,
            r#""layers":[{"mediaType":"application/vnd.devcontainers.layer.v1+tar","#,
            r#""digest":"sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824","size":5,"#,
            r#""annotations":{"org.opencontainers.image.title":"devcontainer-feature-go.tgz"}}]}"#,
        );
        assert_eq!(build.canonical_json, expected);
        assert_eq!(build.digest, sha256_digest(expected.as_bytes()));
        assert_eq!(build.manifest.digest.as_deref(), Some(build.digest.as_str()));
        assert!(build.config_payload.is_empty());
    }

    #[test]
    fn test_annotations_follow_layers() {
        let layer = digest_layer(b"x", "f.tgz", DEVCONTAINER_TAR_LAYER_MEDIA_TYPE);
        let annotations = BTreeMap::from([(
            "com.github.package.type".to_string(),
            "devcontainer_feature".to_string(),
        )]);
        let build = build_manifest(layer, Some(annotations)).unwrap();
        assert!(
            build
                .canonical_json
                .ends_with(r#"}}],"annotations":{"com.github.package.type":"devcontainer_feature"}}"#)
        );
    }

    #[test]
    fn test_empty_annotations_are_omitted() {
        let layer = digest_layer(b"x", "f.tgz", DEVCONTAINER_TAR_LAYER_MEDIA_TYPE);
        let with_empty = build_manifest(layer.clone(), Some(BTreeMap::new())).unwrap();
        let without = build_manifest(layer, None).unwrap();
        assert_eq!(with_empty.canonical_json, without.canonical_json);
        assert_eq!(with_empty.digest, without.digest);
    }

    #[test]
    fn test_build_manifest_is_deterministic() {
        let first = build_manifest(
            digest_layer(b"same bytes", "a.tgz", DEVCONTAINER_TAR_LAYER_MEDIA_TYPE),
            None,
        )
        .unwrap();
        let second = build_manifest(
            digest_layer(b"same bytes", "a.tgz", DEVCONTAINER_TAR_LAYER_MEDIA_TYPE),
            None,
        )
        .unwrap();
        assert_eq!(first, second);

        let changed = build_manifest(
            digest_layer(b"other bytes", "a.tgz", DEVCONTAINER_TAR_LAYER_MEDIA_TYPE),
            None,
        )
        .unwrap();
        assert_ne!(first.digest, changed.digest);
    }

    #[test]
    fn test_custom_config_payload() {
        let layer = digest_layer(b"x", "f.tgz", DEVCONTAINER_TAR_LAYER_MEDIA_TYPE);
        let build = build_manifest_with_config(layer, b"{}".to_vec(), None).unwrap();
        assert_eq!(build.manifest.config.size, 2);
        assert_eq!(build.manifest.config.digest, sha256_digest(b"{}"));
        assert_eq!(build.config_payload, b"{}");
    }

    #[tokio::test]
    async fn test_compute_file_digest() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("blob.tar");

        std::fs::write(&file_path, b"hello").unwrap();
        assert_eq!(compute_file_digest(&file_path).await.unwrap(), HELLO_DIGEST);

        let content: Vec<u8> = (0..20000).map(|i| (i % 256) as u8).collect();
        std::fs::write(&file_path, &content).unwrap();
        assert_eq!(
            compute_file_digest(&file_path).await.unwrap(),
            sha256_digest(&content)
        );
    }

    #[tokio::test]
    async fn test_compute_file_digest_nonexistent() {
        let result = compute_file_digest(Path::new("/nonexistent/path")).await;
        assert!(result.is_err());
    }
}
