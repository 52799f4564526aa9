//! Artifact publishing.
//!
//! A push resolves a push-scoped token, computes the manifest locally and
//! asks the registry whether it already stores that exact digest. Stored
//! content only gets re-tagged. Otherwise each absent blob (config, then
//! layer) is uploaded through its own `POST` session and `PUT`, and the
//! manifest is bound to every tag in order. Any protocol failure aborts the
//! push with an error.

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use secrecy::SecretString;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, trace, warn};

use crate::auth::PUSH_SCOPE;
use crate::client::{RegistryClient, with_bearer};
use crate::config::GITHUB_REGISTRY;
use crate::digest::{ManifestBuild, build_manifest, digest_layer};
use crate::reference::{ArtifactRef, RegistryTarget, is_local_alias};
use crate::{
    DEVCONTAINER_COLLECTION_LAYER_MEDIA_TYPE, DEVCONTAINER_TAR_LAYER_MEDIA_TYPE, Error,
    OCI_MANIFEST_MEDIA_TYPE, Result,
};

/// Manifest annotation `ghcr.io` uses to classify packages.
const GITHUB_PACKAGE_TYPE_ANNOTATION: &str = "com.github.package.type";

/// What is being published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// A single feature tarball.
    Feature,
    /// A collection's `devcontainer-collection.json`.
    Collection,
}

impl ArtifactKind {
    /// Media type of the artifact's layer.
    #[must_use]
    pub fn layer_media_type(self) -> &'static str {
        match self {
            Self::Feature => DEVCONTAINER_TAR_LAYER_MEDIA_TYPE,
            Self::Collection => DEVCONTAINER_COLLECTION_LAYER_MEDIA_TYPE,
        }
    }

    fn github_package_type(self) -> &'static str {
        match self {
            Self::Feature => "devcontainer_feature",
            Self::Collection => "devcontainer_collection",
        }
    }

    /// Manifest annotations for `registry`.
    ///
    /// These are part of the manifest digest, so they must be settled
    /// before the manifest is built.
    #[must_use]
    pub fn annotations(self, registry: &str) -> Option<BTreeMap<String, String>> {
        (registry == GITHUB_REGISTRY).then(|| {
            BTreeMap::from([(
                GITHUB_PACKAGE_TYPE_ANNOTATION.to_string(),
                self.github_package_type().to_string(),
            )])
        })
    }
}

/// Result of a completed push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    /// Digest of the pushed manifest.
    pub digest: String,
    /// Whether the registry already held the manifest and no blobs were sent.
    pub reused: bool,
    /// Number of blobs actually uploaded (0, 1 or 2).
    pub blobs_uploaded: usize,
    /// Tags bound to the manifest, in the order they were applied.
    pub tags: Vec<String>,
}

impl RegistryClient {
    /// Publish a feature tarball under each of `tags`.
    ///
    /// Returns `Ok(None)` for local aliases, which are never pushed.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference is invalid, the tarball cannot be
    /// read, no push token can be obtained, or the registry rejects any
    /// upload or tag.
    pub async fn push_feature(
        &self,
        reference: &ArtifactRef,
        tags: &[String],
        tgz_path: &Path,
    ) -> Result<Option<PushOutcome>> {
        if is_local_alias(&reference.registry) {
            debug!(%reference, "Local alias, skipping push");
            return Ok(None);
        }
        reference
            .validate()
            .map_err(|reason| Error::invalid_reference(reference.to_string(), reason))?;

        let bytes = tokio::fs::read(tgz_path).await?;
        let title = tgz_path.to_string_lossy();
        self.push_artifact(reference, tags, &bytes, &title, ArtifactKind::Feature)
            .await
    }

    /// Publish `bytes` as a single-layer artifact titled `title`.
    ///
    /// # Errors
    ///
    /// Returns an error if no push token can be obtained or the registry
    /// rejects any upload or tag.
    pub async fn push_artifact(
        &self,
        target: &impl RegistryTarget,
        tags: &[String],
        bytes: &[u8],
        title: &str,
        kind: ArtifactKind,
    ) -> Result<Option<PushOutcome>> {
        if is_local_alias(target.registry()) {
            debug!(resource = %target.resource(), "Local alias, skipping push");
            return Ok(None);
        }

        let token = self
            .fetch_token(target.registry(), target.path(), PUSH_SCOPE)
            .await
            .ok_or_else(|| {
                Error::authentication_failed(target.registry(), target.path(), PUSH_SCOPE)
            })?;

        let layer = digest_layer(bytes, title, kind.layer_media_type());
        let build = build_manifest(layer, kind.annotations(target.registry()))?;
        trace!(resource = %target.resource(), digest = %build.digest, "Computed manifest");

        let reused = self
            .fetch_manifest(target, Some(&build.digest), Some(&token))
            .await
            .is_some();

        let blobs_uploaded = if reused {
            info!(resource = %target.resource(), digest = %build.digest, "Manifest already stored, re-tagging only");
            0
        } else {
            self.upload_blobs(target, &build, bytes, &token).await?
        };

        self.put_manifest_with_tags(target, &build, tags, &token)
            .await?;

        info!(
            resource = %target.resource(),
            digest = %build.digest,
            reused,
            blobs_uploaded,
            tags = ?tags,
            "Pushed artifact"
        );
        Ok(Some(PushOutcome {
            digest: build.digest,
            reused,
            blobs_uploaded,
            tags: tags.to_vec(),
        }))
    }

    /// Upload the config blob, then the layer, skipping any the registry has.
    async fn upload_blobs(
        &self,
        target: &impl RegistryTarget,
        build: &ManifestBuild,
        layer_bytes: &[u8],
        token: &SecretString,
    ) -> Result<usize> {
        let blobs = [
            (&build.manifest.config.digest, build.config_payload.as_slice()),
            (&build.manifest.layers[0].digest, layer_bytes),
        ];

        let mut uploaded = 0;
        for (digest, bytes) in blobs {
            if self.blob_exists(target, digest, token).await {
                debug!(%digest, "Blob already present");
                continue;
            }
            let location = self.open_upload_session(target, token).await?;
            self.put_blob(&location, digest, bytes, token).await?;
            uploaded += 1;
        }
        Ok(uploaded)
    }

    /// Whether the registry stores a blob. Anything but `200` counts as absent.
    pub async fn blob_exists(
        &self,
        target: &impl RegistryTarget,
        digest: &str,
        token: &SecretString,
    ) -> bool {
        let url = self.blob_url(target, digest);
        match with_bearer(self.http.head(&url), Some(token)).send().await {
            Ok(response) => match response.status() {
                StatusCode::OK => true,
                StatusCode::NOT_FOUND => false,
                status => {
                    warn!(%url, status = status.as_u16(), "Unexpected blob existence status");
                    false
                }
            },
            Err(e) => {
                warn!(%url, error = %e, "Blob existence check failed");
                false
            }
        }
    }

    /// Open an upload session and return its absolute URL.
    async fn open_upload_session(
        &self,
        target: &impl RegistryTarget,
        token: &SecretString,
    ) -> Result<reqwest::Url> {
        let url = self.upload_url(target);
        let response = with_bearer(self.http.post(&url), Some(token))
            .send()
            .await?;
        let status = response.status();
        if status != StatusCode::ACCEPTED {
            return Err(Error::unexpected_status("Open upload session", url, status));
        }

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| Error::MissingLocation { url: url.clone() })?;

        let base = reqwest::Url::parse(&url).map_err(|e| Error::invalid_url(&url, e))?;
        base.join(location)
            .map_err(|e| Error::invalid_url(location, e))
    }

    async fn put_blob(
        &self,
        location: &reqwest::Url,
        digest: &str,
        bytes: &[u8],
        token: &SecretString,
    ) -> Result<()> {
        let mut url = location.clone();
        url.query_pairs_mut().append_pair("digest", digest);
        trace!(%url, size = bytes.len(), "Uploading blob");

        let request = self.http.put(url.clone()).body(bytes.to_vec());
        let response = with_bearer(request, Some(token)).send().await?;
        let status = response.status();
        if status != StatusCode::CREATED {
            return Err(Error::unexpected_status("Upload blob", url.as_str(), status));
        }
        debug!(%digest, "Uploaded blob");
        Ok(())
    }

    /// Bind the manifest to each tag in order; the first failure aborts.
    async fn put_manifest_with_tags(
        &self,
        target: &impl RegistryTarget,
        build: &ManifestBuild,
        tags: &[String],
        token: &SecretString,
    ) -> Result<()> {
        for tag in tags {
            let url = self.manifest_url(target, tag);
            let request = self
                .http
                .put(&url)
                .header(CONTENT_TYPE, OCI_MANIFEST_MEDIA_TYPE)
                .body(build.canonical_json.clone());
            let response = with_bearer(request, Some(token)).send().await?;
            let status = response.status();
            if status != StatusCode::CREATED {
                return Err(Error::unexpected_status("Tag manifest", url, status));
            }
            debug!(%tag, digest = %build.digest, "Tagged manifest");
        }
        Ok(())
    }
}
