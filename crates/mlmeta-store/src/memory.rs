//! In-memory repository storage, the reference implementation of the
//! contract.
//!
//! All three entity tables live behind a single `RwLock`: a sorted vector
//! of compound keys (the pagination index) plus a key-to-value map per
//! entity type. Reads share the lock; a mutation holds it exclusively for
//! its whole read-modify-write cycle, so the process observes its own
//! writes immediately.
//!
//! Inserts append and re-sort the key vector. Correctness, not throughput,
//! is what the contract tests; a high-volume deployment would swap the
//! vector for a balanced ordered index with the same observable order.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use mlmeta_types::{
    checkpoint_key, hyperparameters_key, Checkpoint, HyperparameterSet, Model, KEY_DELIMITER,
};
use tracing::debug;

use crate::error::{EntityKind, StorageError, StorageResult};
use crate::traits::{
    effective_page_size, require_scope, validate_checkpoint, validate_hyperparameters,
    validate_model, RepositoryStorage,
};

#[derive(Debug, Default)]
struct Tables {
    model_keys: Vec<String>,
    models: HashMap<String, Model>,

    hyperparameter_keys: Vec<String>,
    hyperparameters: HashMap<String, HyperparameterSet>,

    checkpoint_keys: Vec<String>,
    checkpoints: HashMap<String, Checkpoint>,
}

/// An in-memory implementation of [`RepositoryStorage`].
///
/// Data is lost when the store is dropped. Every `get` returns an owned
/// copy; callers can never alias the tables behind the lock.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    tables: RwLock<Tables>,
}

impl InMemoryStorage {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn insert_sorted(keys: &mut Vec<String>, key: String) {
    keys.push(key);
    keys.sort_unstable();
}

/// One page of `keys`, scoped to `scope` and starting strictly after the
/// marker.
///
/// `keys` is sorted, so all entries sharing the scope prefix are
/// contiguous: binary-search to the first key greater than
/// `scope + marker`, then take in-scope keys up to the page bound.
fn page(keys: &[String], scope: &str, marker: &str, max_items: i64) -> Vec<String> {
    let qualified_marker = format!("{scope}{marker}");
    let start = keys.partition_point(|k| k.as_str() <= qualified_marker.as_str());
    keys[start..]
        .iter()
        .take_while(|k| k.starts_with(scope))
        .take(effective_page_size(max_items))
        .cloned()
        .collect()
}

impl Tables {
    fn require_model(&self, model_id: &str) -> StorageResult<()> {
        if self.models.contains_key(model_id) {
            Ok(())
        } else {
            Err(StorageError::not_exist(EntityKind::Model, model_id))
        }
    }

    fn require_hyperparameters(&self, key: &str) -> StorageResult<()> {
        if self.hyperparameters.contains_key(key) {
            Ok(())
        } else {
            Err(StorageError::not_exist(EntityKind::Hyperparameters, key))
        }
    }
}

#[async_trait]
impl RepositoryStorage for InMemoryStorage {
    fn storage_type(&self) -> &'static str {
        "memory"
    }

    async fn list_models(&self, marker: &str, max_items: i64) -> StorageResult<Vec<String>> {
        let tables = self.tables.read().expect("lock poisoned");
        Ok(page(&tables.model_keys, "", marker, max_items))
    }

    async fn get_model(&self, model_id: &str) -> StorageResult<Model> {
        let tables = self.tables.read().expect("lock poisoned");
        tables
            .models
            .get(model_id)
            .cloned()
            .ok_or_else(|| StorageError::not_exist(EntityKind::Model, model_id))
    }

    async fn add_model(&self, model: Model) -> StorageResult<()> {
        validate_model(&model)?;
        {
            let tables = self.tables.read().expect("lock poisoned");
            if tables.models.contains_key(&model.model_id) {
                return Err(StorageError::already_exists(
                    EntityKind::Model,
                    model.model_id.as_str(),
                ));
            }
        }

        let mut tables = self.tables.write().expect("lock poisoned");
        // A concurrent creator may have won between the read check above
        // and this lock acquisition; the check under the write lock decides.
        if tables.models.contains_key(&model.model_id) {
            return Err(StorageError::already_exists(
                EntityKind::Model,
                model.model_id.as_str(),
            ));
        }
        insert_sorted(&mut tables.model_keys, model.model_id.clone());
        debug!(model_id = %model.model_id, "model added");
        tables.models.insert(model.model_id.clone(), model);
        Ok(())
    }

    async fn update_model(&self, model: Model) -> StorageResult<Model> {
        let mut tables = self.tables.write().expect("lock poisoned");
        let stored = tables
            .models
            .get_mut(&model.model_id)
            .ok_or_else(|| StorageError::not_exist(EntityKind::Model, model.model_id.as_str()))?;
        stored.merge_from(&model);
        debug!(model_id = %model.model_id, "model updated");
        Ok(stored.clone())
    }

    async fn list_hyperparameters(
        &self,
        model_id: &str,
        marker: &str,
        max_items: i64,
    ) -> StorageResult<Vec<String>> {
        require_scope("model", model_id)?;
        let tables = self.tables.read().expect("lock poisoned");
        tables.require_model(model_id)?;
        let scope = format!("{model_id}{KEY_DELIMITER}");
        Ok(page(&tables.hyperparameter_keys, &scope, marker, max_items))
    }

    async fn get_hyperparameters(
        &self,
        model_id: &str,
        hyperparameters_id: &str,
    ) -> StorageResult<HyperparameterSet> {
        let key = hyperparameters_key(model_id, hyperparameters_id);
        let tables = self.tables.read().expect("lock poisoned");
        tables
            .hyperparameters
            .get(&key)
            .cloned()
            .ok_or_else(|| StorageError::not_exist(EntityKind::Hyperparameters, key))
    }

    async fn add_hyperparameters(&self, params: HyperparameterSet) -> StorageResult<()> {
        validate_hyperparameters(&params)?;
        let key = params.key();
        {
            let tables = self.tables.read().expect("lock poisoned");
            tables.require_model(&params.model_id)?;
            if tables.hyperparameters.contains_key(&key) {
                return Err(StorageError::already_exists(
                    EntityKind::Hyperparameters,
                    key,
                ));
            }
        }

        let mut tables = self.tables.write().expect("lock poisoned");
        if tables.hyperparameters.contains_key(&key) {
            return Err(StorageError::already_exists(
                EntityKind::Hyperparameters,
                key,
            ));
        }
        insert_sorted(&mut tables.hyperparameter_keys, key.clone());
        debug!(key = %key, "hyperparameters added");
        tables.hyperparameters.insert(key, params);
        Ok(())
    }

    async fn update_hyperparameters(
        &self,
        params: HyperparameterSet,
    ) -> StorageResult<HyperparameterSet> {
        let key = params.key();
        let mut tables = self.tables.write().expect("lock poisoned");
        tables.require_model(&params.model_id)?;
        let stored = tables
            .hyperparameters
            .get_mut(&key)
            .ok_or_else(|| StorageError::not_exist(EntityKind::Hyperparameters, key.as_str()))?;
        stored.merge_from(&params);
        debug!(key = %key, "hyperparameters updated");
        Ok(stored.clone())
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
        let tables = self.tables.read().expect("lock poisoned");
        tables.require_model(model_id)?;
        tables.require_hyperparameters(&hyperparameters_key(model_id, hyperparameters_id))?;
        let scope = format!("{model_id}{KEY_DELIMITER}{hyperparameters_id}{KEY_DELIMITER}");
        Ok(page(&tables.checkpoint_keys, &scope, marker, max_items))
    }

    async fn get_checkpoint(
        &self,
        model_id: &str,
        hyperparameters_id: &str,
        checkpoint_id: &str,
    ) -> StorageResult<Checkpoint> {
        let tables = self.tables.read().expect("lock poisoned");
        tables.require_model(model_id)?;
        tables.require_hyperparameters(&hyperparameters_key(model_id, hyperparameters_id))?;
        let key = checkpoint_key(model_id, hyperparameters_id, checkpoint_id);
        tables
            .checkpoints
            .get(&key)
            .cloned()
            .ok_or_else(|| StorageError::not_exist(EntityKind::Checkpoint, key))
    }

    async fn add_checkpoint(&self, checkpoint: Checkpoint) -> StorageResult<()> {
        validate_checkpoint(&checkpoint)?;
        let key = checkpoint.key();
        {
            let tables = self.tables.read().expect("lock poisoned");
            tables.require_model(&checkpoint.model_id)?;
            tables.require_hyperparameters(&hyperparameters_key(
                &checkpoint.model_id,
                &checkpoint.hyperparameters_id,
            ))?;
            if tables.checkpoints.contains_key(&key) {
                return Err(StorageError::already_exists(EntityKind::Checkpoint, key));
            }
        }

        let mut tables = self.tables.write().expect("lock poisoned");
        if tables.checkpoints.contains_key(&key) {
            return Err(StorageError::already_exists(EntityKind::Checkpoint, key));
        }
        insert_sorted(&mut tables.checkpoint_keys, key.clone());
        debug!(key = %key, "checkpoint added");
        tables.checkpoints.insert(key, checkpoint);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite;

    #[tokio::test]
    async fn conformance_model_lifecycle() {
        suite::model_lifecycle(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn conformance_model_create_conflict() {
        suite::model_create_conflict(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn conformance_model_merge_update() {
        suite::model_merge_update(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn conformance_hierarchy_enforcement() {
        suite::hierarchy_enforcement(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn conformance_invalid_ids_rejected() {
        suite::invalid_ids_rejected(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn conformance_list_models_pagination() {
        suite::list_models_pagination(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn conformance_default_page_size() {
        suite::default_page_size(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn conformance_hyperparameters_merge_update() {
        suite::hyperparameters_merge_update(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn conformance_checkpoint_lifecycle() {
        suite::checkpoint_lifecycle(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn conformance_checkpoint_immutability() {
        suite::checkpoint_immutability(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn conformance_child_scope_isolation() {
        suite::child_scope_isolation(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn conformance_empty_scope_rejected() {
        suite::empty_scope_rejected(&InMemoryStorage::new()).await;
    }

    #[tokio::test]
    async fn concurrent_creators_one_winner() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryStorage::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .add_model(Model {
                        model_id: "contested".into(),
                        details: "first".into(),
                        canonical_hyperparameters: String::new(),
                    })
                    .await
            }));
        }

        let mut wins = 0;
        for handle in handles {
            match handle.await.expect("task panicked") {
                Ok(()) => wins += 1,
                Err(StorageError::Exists { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(
            store.list_models("", 10).await.unwrap(),
            vec!["contested".to_string()]
        );
    }

    #[tokio::test]
    async fn storage_type_discriminator() {
        assert_eq!(InMemoryStorage::new().storage_type(), "memory");
    }
}
