//! Object path encoding for the blob-store backend.
//!
//! Each entity is one JSON document at a fixed location:
//!
//! ```text
//! models/<modelId>/model.json
//! models/<modelId>/hyperparameters/<hpId>/params.json
//! models/<modelId>/hyperparameters/<hpId>/checkpoints/<ckptId>/checkpoint.json
//! ```
//!
//! The directory-per-entity layout makes each hierarchy level enumerable
//! with one prefix+delimiter listing: the immediate child "directory"
//! names under a prefix are exactly the child ids.

use object_store::path::Path;

/// Listing prefix whose immediate children are model ids.
pub fn models_prefix() -> Path {
    Path::from("models")
}

/// Listing prefix whose immediate children are hyperparameter set ids.
pub fn hyperparameters_prefix(model_id: &str) -> Path {
    Path::from(format!("models/{model_id}/hyperparameters"))
}

/// Listing prefix whose immediate children are checkpoint ids.
pub fn checkpoints_prefix(model_id: &str, hyperparameters_id: &str) -> Path {
    Path::from(format!(
        "models/{model_id}/hyperparameters/{hyperparameters_id}/checkpoints"
    ))
}

/// Document location for a model.
pub fn model_document(model_id: &str) -> Path {
    Path::from(format!("models/{model_id}/model.json"))
}

/// Document location for a hyperparameter set.
pub fn hyperparameters_document(model_id: &str, hyperparameters_id: &str) -> Path {
    Path::from(format!(
        "models/{model_id}/hyperparameters/{hyperparameters_id}/params.json"
    ))
}

/// Document location for a checkpoint.
pub fn checkpoint_document(
    model_id: &str,
    hyperparameters_id: &str,
    checkpoint_id: &str,
) -> Path {
    Path::from(format!(
        "models/{model_id}/hyperparameters/{hyperparameters_id}/checkpoints/{checkpoint_id}/checkpoint.json"
    ))
}
