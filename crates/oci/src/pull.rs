//! Manifest, blob and tag retrieval.
//!
//! Failures at this layer are recovered: a missing or unreadable artifact
//! comes back as `None`/`false` with the cause logged, and callers decide
//! whether absence is fatal. The one exception is [`RegistryClient::list_tags`],
//! which needs a token and reports its absence as `None` rather than trying
//! anonymously.

use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, trace, warn};

use crate::auth::PULL_SCOPE;
use crate::client::{RegistryClient, with_bearer};
use crate::digest::{compute_file_digest, sha256_digest};
use crate::extract::extract_archive_blocking;
use crate::manifest::Manifest;
use crate::reference::{ArtifactRef, RegistryTarget, is_local_alias};
use crate::tags::sort_tags;
use crate::{DEVCONTAINER_CONFIG_MEDIA_TYPE, Error, OCI_MANIFEST_MEDIA_TYPE, Result};

/// Fixed name of the staged blob inside the cache directory.
const STAGED_BLOB_NAME: &str = "blob.tar";

/// Response header carrying the registry-computed manifest digest.
const CONTENT_DIGEST_HEADER: &str = "docker-content-digest";

#[derive(Debug, Deserialize)]
struct TagList {
    tags: Option<Vec<String>>,
}

impl RegistryClient {
    /// Fetch a devcontainer artifact's manifest.
    ///
    /// A `digest` pins the exact content and takes precedence over the
    /// target's version tag. Returns `None` when the manifest is absent,
    /// unreachable, unparsable, not a devcontainer artifact, or does not
    /// hash to the requested digest.
    pub async fn fetch_manifest(
        &self,
        target: &impl RegistryTarget,
        digest: Option<&str>,
        token: Option<&SecretString>,
    ) -> Option<Manifest> {
        if is_local_alias(target.registry()) {
            debug!(registry = target.registry(), "Local alias, skipping manifest fetch");
            return None;
        }

        let reference = digest.unwrap_or_else(|| target.version());
        match self.request_manifest(target, reference, token).await {
            Ok(manifest) => Some(manifest),
            Err(e) if e.is_not_found() => {
                debug!(resource = %target.resource(), reference, "Manifest not found");
                None
            }
            Err(e @ Error::MediaTypeMismatch { .. }) => {
                warn!(resource = %target.resource(), reference, error = %e, "Not a devcontainer artifact");
                None
            }
            Err(e) => {
                warn!(resource = %target.resource(), reference, error = %e, "Failed to fetch manifest");
                None
            }
        }
    }

    async fn request_manifest(
        &self,
        target: &impl RegistryTarget,
        reference: &str,
        token: Option<&SecretString>,
    ) -> Result<Manifest> {
        let url = self.manifest_url(target, reference);
        trace!(%url, "Fetching manifest");

        let request = self.http.get(&url).header(ACCEPT, OCI_MANIFEST_MEDIA_TYPE);
        let response = with_bearer(request, token).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::unexpected_status("Fetch manifest", url, status));
        }

        let header_digest = response
            .headers()
            .get(CONTENT_DIGEST_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;
        let body_digest = sha256_digest(&body);

        if reference.starts_with("sha256:") && body_digest != reference {
            return Err(Error::digest_mismatch(reference, body_digest));
        }

        let mut manifest: Manifest = serde_json::from_slice(&body)?;
        if manifest.config.media_type != DEVCONTAINER_CONFIG_MEDIA_TYPE {
            return Err(Error::media_type_mismatch(
                DEVCONTAINER_CONFIG_MEDIA_TYPE,
                &manifest.config.media_type,
            ));
        }

        manifest.digest = Some(header_digest.unwrap_or(body_digest));
        Ok(manifest)
    }

    /// Download the blob at `url` into `cache_dir` and extract it into
    /// `extract_dir`.
    ///
    /// The blob is staged as `<cache_dir>/blob.tar`; concurrent pulls must
    /// use distinct cache directories. No retry is attempted.
    pub async fn fetch_blob(
        &self,
        url: &str,
        cache_dir: &Path,
        extract_dir: &Path,
        reference: &ArtifactRef,
        token: Option<&SecretString>,
    ) -> bool {
        let result = async {
            let staged = self.download_blob(url, cache_dir, token).await?;
            extract_archive_blocking(&staged, extract_dir).await
        }
        .await;

        match result {
            Ok(()) => {
                debug!(%reference, ?extract_dir, "Extracted blob");
                true
            }
            Err(e) => {
                warn!(%reference, %url, error = %e, "Failed to fetch blob");
                false
            }
        }
    }

    /// Stream a blob to `<cache_dir>/blob.tar`.
    async fn download_blob(
        &self,
        url: &str,
        cache_dir: &Path,
        token: Option<&SecretString>,
    ) -> Result<PathBuf> {
        trace!(%url, "Downloading blob");
        let mut response = with_bearer(self.http.get(url), token).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::unexpected_status("Fetch blob", url, status));
        }

        tokio::fs::create_dir_all(cache_dir).await?;
        let staged = cache_dir.join(STAGED_BLOB_NAME);
        let mut file = tokio::fs::File::create(&staged).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(staged)
    }

    /// Fetch a blob into memory and check it against its digest.
    pub(crate) async fn fetch_blob_bytes(
        &self,
        target: &impl RegistryTarget,
        digest: &str,
        token: Option<&SecretString>,
    ) -> Result<Vec<u8>> {
        let url = self.blob_url(target, digest);
        let response = with_bearer(self.http.get(&url), token).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::unexpected_status("Fetch blob", url, status));
        }

        let body = response.bytes().await?.to_vec();
        let actual = sha256_digest(&body);
        if actual != digest {
            return Err(Error::digest_mismatch(digest, actual));
        }
        Ok(body)
    }

    /// Pull a feature: resolve a token, fetch its manifest, download and
    /// verify its single layer, and extract it into `extract_dir`.
    ///
    /// Multi-layer artifacts are not supported and are rejected with a
    /// warning. Returns the manifest on success.
    pub async fn fetch_feature(
        &self,
        reference: &ArtifactRef,
        cache_dir: &Path,
        extract_dir: &Path,
    ) -> Option<Manifest> {
        if is_local_alias(&reference.registry) {
            debug!(%reference, "Local alias, skipping feature fetch");
            return None;
        }

        let token = self
            .fetch_token(&reference.registry, &reference.path, PULL_SCOPE)
            .await;
        let manifest = self.fetch_manifest(reference, None, token.as_ref()).await?;

        match self
            .install_layer(reference, &manifest, cache_dir, extract_dir, token.as_ref())
            .await
        {
            Ok(()) => {
                info!(%reference, digest = manifest.digest.as_deref().unwrap_or_default(), "Fetched feature");
                Some(manifest)
            }
            Err(e) => {
                warn!(%reference, error = %e, "Failed to fetch feature");
                None
            }
        }
    }

    async fn install_layer(
        &self,
        reference: &ArtifactRef,
        manifest: &Manifest,
        cache_dir: &Path,
        extract_dir: &Path,
        token: Option<&SecretString>,
    ) -> Result<()> {
        let layer = manifest.single_layer().ok_or(Error::UnsupportedLayerCount {
            count: manifest.layers.len(),
        })?;

        let url = self.blob_url(reference, &layer.digest);
        let staged = self.download_blob(&url, cache_dir, token).await?;

        let actual = compute_file_digest(&staged).await?;
        if actual != layer.digest {
            tokio::fs::remove_file(&staged).await.ok();
            return Err(Error::digest_mismatch(&layer.digest, actual));
        }

        extract_archive_blocking(&staged, extract_dir).await
    }

    /// List a feature's published tags, optionally sorted with `latest`
    /// first followed by ascending version precedence.
    ///
    /// A 404 means nothing has been published yet and yields an empty
    /// list. Returns `None` when no pull token can be obtained or the
    /// request fails otherwise.
    pub async fn list_tags(&self, reference: &ArtifactRef, sorted: bool) -> Option<Vec<String>> {
        if is_local_alias(&reference.registry) {
            debug!(%reference, "Local alias, skipping tag listing");
            return None;
        }

        let Some(token) = self
            .fetch_token(&reference.registry, &reference.path, PULL_SCOPE)
            .await
        else {
            let e = Error::authentication_failed(&reference.registry, &reference.path, PULL_SCOPE);
            error!(error = %e, "Cannot list tags");
            return None;
        };

        match self.request_tags(reference, &token).await {
            Ok(tags) if sorted => Some(sort_tags(tags)),
            Ok(tags) => Some(tags),
            Err(e) => {
                warn!(%reference, error = %e, "Failed to list tags");
                None
            }
        }
    }

    async fn request_tags(
        &self,
        reference: &ArtifactRef,
        token: &SecretString,
    ) -> Result<Vec<String>> {
        let url = self.tags_url(reference);
        let response = with_bearer(self.http.get(&url), Some(token)).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!(%reference, "No tags published yet");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(Error::unexpected_status("List tags", url, status));
        }

        let list: TagList = serde_json::from_slice(&response.bytes().await?)?;
        Ok(list.tags.unwrap_or_default())
    }
}
