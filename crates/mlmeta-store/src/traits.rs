//! The [`RepositoryStorage`] trait defining the storage contract.
//!
//! Any backend (in-memory index, remote object store, database) implements
//! this trait. Behavioral equivalence across backends is enforced by the
//! conformance scenarios in [`crate::suite`].

use async_trait::async_trait;
use mlmeta_types::{is_valid_id, Checkpoint, HyperparameterSet, Model};

use crate::error::{StorageError, StorageResult};

/// Page size applied when a list operation is called with `max_items <= 0`.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Normalize a caller-supplied page bound.
///
/// Zero and negative values mean "use the default"; positive values bound
/// the page directly. Normalization happens here, inside the contract,
/// so every backend and every transport sees identical paging.
pub fn effective_page_size(max_items: i64) -> usize {
    if max_items <= 0 {
        DEFAULT_PAGE_SIZE
    } else {
        max_items as usize
    }
}

/// Storage backend for the model/hyperparameters/checkpoint hierarchy.
///
/// Contract invariants, binding on every implementation:
///
/// - `Add*` is append-only and conflict-checked: a duplicate identity fails
///   with `Exists` and leaves stored state untouched.
/// - The hierarchy is enforced bottom-up: adding a child fails `NotExist`
///   when any required ancestor is absent.
/// - `Update*` merges: non-empty scalar fields overwrite, map entries merge
///   key-wise, empty values are no-ops (see the entity `merge_from` docs).
/// - `List*` returns compound keys in ascending lexicographic order.
///   `marker` is an **exclusive** lower bound expressed as the child-local
///   id previously seen (empty means "from the beginning"), and results
///   never leak entries from a sibling parent scope.
/// - Entities are never deleted.
///
/// Every operation is cancel-safe in the usual async sense: dropping the
/// returned future abandons the request.
#[async_trait]
pub trait RepositoryStorage: Send + Sync {
    /// Static discriminator for logs and diagnostics, e.g. `"memory"`.
    fn storage_type(&self) -> &'static str;

    // Models

    async fn list_models(&self, marker: &str, max_items: i64) -> StorageResult<Vec<String>>;
    async fn get_model(&self, model_id: &str) -> StorageResult<Model>;
    async fn add_model(&self, model: Model) -> StorageResult<()>;
    /// Merge the non-empty fields of `model` into the stored entity and
    /// return the result.
    async fn update_model(&self, model: Model) -> StorageResult<Model>;

    // Hyperparameters

    async fn list_hyperparameters(
        &self,
        model_id: &str,
        marker: &str,
        max_items: i64,
    ) -> StorageResult<Vec<String>>;
    async fn get_hyperparameters(
        &self,
        model_id: &str,
        hyperparameters_id: &str,
    ) -> StorageResult<HyperparameterSet>;
    async fn add_hyperparameters(&self, params: HyperparameterSet) -> StorageResult<()>;
    async fn update_hyperparameters(
        &self,
        params: HyperparameterSet,
    ) -> StorageResult<HyperparameterSet>;

    // Checkpoints

    async fn list_checkpoints(
        &self,
        model_id: &str,
        hyperparameters_id: &str,
        marker: &str,
        max_items: i64,
    ) -> StorageResult<Vec<String>>;
    async fn get_checkpoint(
        &self,
        model_id: &str,
        hyperparameters_id: &str,
        checkpoint_id: &str,
    ) -> StorageResult<Checkpoint>;
    async fn add_checkpoint(&self, checkpoint: Checkpoint) -> StorageResult<()>;
}

fn check_id(id: &str) -> StorageResult<()> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(StorageError::invalid_id(id))
    }
}

/// Defense-in-depth id validation for `add_model`.
pub(crate) fn validate_model(model: &Model) -> StorageResult<()> {
    check_id(&model.model_id)
}

/// Defense-in-depth id validation for `add_hyperparameters`.
pub(crate) fn validate_hyperparameters(params: &HyperparameterSet) -> StorageResult<()> {
    check_id(&params.model_id)?;
    check_id(&params.hyperparameters_id)
}

/// Defense-in-depth id validation for `add_checkpoint`.
pub(crate) fn validate_checkpoint(checkpoint: &Checkpoint) -> StorageResult<()> {
    check_id(&checkpoint.model_id)?;
    check_id(&checkpoint.hyperparameters_id)?;
    check_id(&checkpoint.checkpoint_id)
}

/// Reject a child-scope listing whose required parent id is missing.
pub(crate) fn require_scope(parent: &str, value: &str) -> StorageResult<()> {
    if value.is_empty() {
        Err(StorageError::HierarchyViolation(format!(
            "listing requires a {parent} id"
        )))
    } else {
        Ok(())
    }
}
