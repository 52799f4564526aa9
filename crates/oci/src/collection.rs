//! Feature collection metadata.
//!
//! A collection publishes a single `devcontainer-collection.json` layer at
//! `<registry>/<namespace>:latest`, listing every feature in the namespace.

use tracing::{debug, warn};

use crate::auth::PULL_SCOPE;
use crate::client::RegistryClient;
use crate::push::{ArtifactKind, PushOutcome};
use crate::reference::{CollectionRef, RegistryTarget, is_local_alias};
use crate::tags::LATEST_TAG;
use crate::{COLLECTION_METADATA_FILE, DEVCONTAINER_COLLECTION_LAYER_MEDIA_TYPE, Result};

impl RegistryClient {
    /// Publish collection metadata under `latest`.
    ///
    /// # Errors
    ///
    /// Returns an error if no push token can be obtained or the registry
    /// rejects any upload or tag.
    pub async fn push_collection(
        &self,
        collection: &CollectionRef,
        metadata: &[u8],
    ) -> Result<Option<PushOutcome>> {
        self.push_artifact(
            collection,
            &[LATEST_TAG.to_string()],
            metadata,
            COLLECTION_METADATA_FILE,
            ArtifactKind::Collection,
        )
        .await
    }

    /// Fetch and parse a collection's metadata.
    ///
    /// Returns `None` when the collection is not published or its layer is
    /// not collection metadata.
    pub async fn fetch_collection_metadata(
        &self,
        collection: &CollectionRef,
    ) -> Option<serde_json::Value> {
        if is_local_alias(collection.registry()) {
            debug!(resource = %collection.resource(), "Local alias, skipping collection fetch");
            return None;
        }

        let token = self
            .fetch_token(collection.registry(), collection.path(), PULL_SCOPE)
            .await;
        let manifest = self.fetch_manifest(collection, None, token.as_ref()).await?;

        let Some(layer) = manifest.single_layer() else {
            warn!(resource = %collection.resource(), layers = manifest.layers.len(), "Collection must have exactly one layer");
            return None;
        };
        if layer.media_type != DEVCONTAINER_COLLECTION_LAYER_MEDIA_TYPE {
            warn!(resource = %collection.resource(), media_type = %layer.media_type, "Not a collection layer");
            return None;
        }

        let bytes = match self
            .fetch_blob_bytes(collection, &layer.digest, token.as_ref())
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(resource = %collection.resource(), error = %e, "Failed to fetch collection metadata");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(metadata) => {
                debug!(resource = %collection.resource(), "Fetched collection metadata");
                Some(metadata)
            }
            Err(e) => {
                warn!(resource = %collection.resource(), error = %e, "Collection metadata is not JSON");
                None
            }
        }
    }
}
