//! Repository storage over a remote blob store.
//!
//! Each entity is persisted as one JSON document at the location computed
//! by [`crate::paths`]. The backend reproduces the in-memory contract
//! semantics on top of four blob-store primitives: put, get (with a
//! distinguishable not-found), head (attribute probe without a read), and
//! prefix+delimiter listing.
//!
//! Creation uses the store's conditional-write mode (`PutMode::Create`),
//! so exactly one creator wins on a contested identity without a
//! check-then-act race. Merge-updates are read-merge-overwrite; two
//! concurrent updaters of the same entity can still lose one merge, as
//! the store offers no cross-document transaction.

use std::sync::Arc;

use async_trait::async_trait;
use mlmeta_types::{hyperparameters_key, Checkpoint, HyperparameterSet, Model};
use object_store::path::Path;
use object_store::{DynObjectStore, ObjectStore, PutMode, PutOptions, PutPayload};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{EntityKind, StorageError, StorageResult};
use crate::paths;
use crate::traits::{
    effective_page_size, require_scope, validate_checkpoint, validate_hyperparameters,
    validate_model, RepositoryStorage,
};

/// A [`RepositoryStorage`] backed by any [`object_store::ObjectStore`]
/// implementation (S3, GCS, Azure, local filesystem, in-memory).
pub struct ObjectStoreStorage {
    store: Arc<DynObjectStore>,
}

impl ObjectStoreStorage {
    /// Wrap a blob store. The store's root is the registry root; all
    /// documents live under `models/`.
    pub fn new(store: Arc<DynObjectStore>) -> Self {
        Self { store }
    }

    /// Fetch and decode one entity document. A store-level not-found
    /// becomes the `NotExist` taxonomy error; other failures propagate.
    async fn read_document<T: DeserializeOwned>(
        &self,
        location: &Path,
        kind: EntityKind,
        id: &str,
    ) -> StorageResult<T> {
        let result = match self.store.get(location).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(StorageError::not_exist(kind, id))
            }
            Err(err) => return Err(err.into()),
        };
        let bytes = result.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| StorageError::Serialization(err.to_string()))
    }

    /// Encode and write one entity document. With [`PutMode::Create`] a
    /// conflicting document turns into the `Exists` taxonomy error.
    async fn write_document<T: Serialize>(
        &self,
        location: &Path,
        value: &T,
        mode: PutMode,
        kind: EntityKind,
        id: &str,
    ) -> StorageResult<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let options = PutOptions::from(mode);
        match self
            .store
            .put_opts(location, PutPayload::from(bytes), options)
            .await
        {
            Ok(_) => Ok(()),
            Err(object_store::Error::AlreadyExists { .. }) => {
                Err(StorageError::already_exists(kind, id))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Attribute probe: does a document exist at `location`?
    async fn probe(&self, location: &Path) -> StorageResult<bool> {
        match self.store.head(location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn require_model(&self, model_id: &str) -> StorageResult<()> {
        if self.probe(&paths::model_document(model_id)).await? {
            Ok(())
        } else {
            Err(StorageError::not_exist(EntityKind::Model, model_id))
        }
    }

    async fn require_hyperparameters(
        &self,
        model_id: &str,
        hyperparameters_id: &str,
    ) -> StorageResult<()> {
        let location = paths::hyperparameters_document(model_id, hyperparameters_id);
        if self.probe(&location).await? {
            Ok(())
        } else {
            Err(StorageError::not_exist(
                EntityKind::Hyperparameters,
                hyperparameters_key(model_id, hyperparameters_id),
            ))
        }
    }

    /// Enumerate the immediate child ids under `prefix`, apply the
    /// exclusive marker, and bound the page.
    ///
    /// The child id is the terminal segment of each common prefix the
    /// store returns. Stores list lexicographically already; the sort is
    /// kept so an unordered backend cannot change observable paging.
    async fn list_child_ids(
        &self,
        prefix: &Path,
        marker: &str,
        max_items: i64,
    ) -> StorageResult<Vec<String>> {
        let listing = self.store.list_with_delimiter(Some(prefix)).await?;
        let mut names: Vec<String> = listing
            .common_prefixes
            .iter()
            .filter_map(|p| p.filename().map(str::to_string))
            .collect();
        names.sort_unstable();
        Ok(names
            .into_iter()
            .filter(|name| name.as_str() > marker)
            .take(effective_page_size(max_items))
            .collect())
    }
}

impl std::fmt::Debug for ObjectStoreStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreStorage")
            .field("store", &self.store.to_string())
            .finish()
    }
}

#[async_trait]
impl RepositoryStorage for ObjectStoreStorage {
    fn storage_type(&self) -> &'static str {
        "object-store"
    }

    async fn list_models(&self, marker: &str, max_items: i64) -> StorageResult<Vec<String>> {
        self.list_child_ids(&paths::models_prefix(), marker, max_items)
            .await
    }

    async fn get_model(&self, model_id: &str) -> StorageResult<Model> {
        self.read_document(&paths::model_document(model_id), EntityKind::Model, model_id)
            .await
    }

    async fn add_model(&self, model: Model) -> StorageResult<()> {
        validate_model(&model)?;
        self.write_document(
            &paths::model_document(&model.model_id),
            &model,
            PutMode::Create,
            EntityKind::Model,
            &model.model_id,
        )
        .await?;
        debug!(model_id = %model.model_id, "model added");
        Ok(())
    }

    async fn update_model(&self, model: Model) -> StorageResult<Model> {
        let location = paths::model_document(&model.model_id);
        let mut stored: Model = self
            .read_document(&location, EntityKind::Model, &model.model_id)
            .await?;
        stored.merge_from(&model);
        self.write_document(
            &location,
            &stored,
            PutMode::Overwrite,
            EntityKind::Model,
            &model.model_id,
        )
        .await?;
        debug!(model_id = %model.model_id, "model updated");
        Ok(stored)
    }

    async fn list_hyperparameters(
        &self,
        model_id: &str,
        marker: &str,
        max_items: i64,
    ) -> StorageResult<Vec<String>> {
        require_scope("model", model_id)?;
        self.require_model(model_id).await?;
        let ids = self
            .list_child_ids(&paths::hyperparameters_prefix(model_id), marker, max_items)
            .await?;
        Ok(ids
            .into_iter()
            .map(|id| hyperparameters_key(model_id, &id))
            .collect())
    }

    async fn get_hyperparameters(
        &self,
        model_id: &str,
        hyperparameters_id: &str,
    ) -> StorageResult<HyperparameterSet> {
        self.read_document(
            &paths::hyperparameters_document(model_id, hyperparameters_id),
            EntityKind::Hyperparameters,
            &hyperparameters_key(model_id, hyperparameters_id),
        )
        .await
    }

    async fn add_hyperparameters(&self, params: HyperparameterSet) -> StorageResult<()> {
        validate_hyperparameters(&params)?;
        self.require_model(&params.model_id).await?;
        let key = params.key();
        self.write_document(
            &paths::hyperparameters_document(&params.model_id, &params.hyperparameters_id),
            &params,
            PutMode::Create,
            EntityKind::Hyperparameters,
            &key,
        )
        .await?;
        debug!(key = %key, "hyperparameters added");
        Ok(())
    }

    async fn update_hyperparameters(
        &self,
        params: HyperparameterSet,
    ) -> StorageResult<HyperparameterSet> {
        self.require_model(&params.model_id).await?;
        let location =
            paths::hyperparameters_document(&params.model_id, &params.hyperparameters_id);
        let key = params.key();
        let mut stored: HyperparameterSet = self
            .read_document(&location, EntityKind::Hyperparameters, &key)
            .await?;
        stored.merge_from(&params);
        self.write_document(
            &location,
            &stored,
            PutMode::Overwrite,
            EntityKind::Hyperparameters,
            &key,
        )
        .await?;
        debug!(key = %key, "hyperparameters updated");
        Ok(stored)
    }

    async fn list_checkpoints(
        &self,
        model_id: &str,
        hyperparameters_id: &str,
        marker: &str,
        max_items: i64,
    ) -> StorageResult<Vec<String>> {
        require_scope("model", model_id)?;
        require_scope("hyperparameters", hyperparameters_id)?;
        self.require_model(model_id).await?;
        self.require_hyperparameters(model_id, hyperparameters_id)
            .await?;
        let ids = self
            .list_child_ids(
                &paths::checkpoints_prefix(model_id, hyperparameters_id),
                marker,
                max_items,
            )
            .await?;
        Ok(ids
            .into_iter()
            .map(|id| mlmeta_types::checkpoint_key(model_id, hyperparameters_id, &id))
            .collect())
    }

    async fn get_checkpoint(
        &self,
        model_id: &str,
        hyperparameters_id: &str,
        checkpoint_id: &str,
    ) -> StorageResult<Checkpoint> {
        self.require_model(model_id).await?;
        self.require_hyperparameters(model_id, hyperparameters_id)
            .await?;
        self.read_document(
            &paths::checkpoint_document(model_id, hyperparameters_id, checkpoint_id),
            EntityKind::Checkpoint,
            &mlmeta_types::checkpoint_key(model_id, hyperparameters_id, checkpoint_id),
        )
        .await
    }

    async fn add_checkpoint(&self, checkpoint: Checkpoint) -> StorageResult<()> {
        validate_checkpoint(&checkpoint)?;
        self.require_model(&checkpoint.model_id).await?;
        self.require_hyperparameters(&checkpoint.model_id, &checkpoint.hyperparameters_id)
            .await?;
        let key = checkpoint.key();
        self.write_document(
            &paths::checkpoint_document(
                &checkpoint.model_id,
                &checkpoint.hyperparameters_id,
                &checkpoint.checkpoint_id,
            ),
            &checkpoint,
            PutMode::Create,
            EntityKind::Checkpoint,
            &key,
        )
        .await?;
        debug!(key = %key, "checkpoint added");
        Ok(())
    }
}
