//! Foundation types for the mlmeta registry.
//!
//! The registry tracks machine-learning artifacts in a three-level
//! hierarchy: a [`Model`] owns [`HyperparameterSet`]s, and each
//! hyperparameter set owns the [`Checkpoint`]s trained under it. Every
//! storage backend and transport layer depends on this crate.
//!
//! # Key Types
//!
//! - [`Model`] — top-level entity, mutable via merge-update
//! - [`HyperparameterSet`] — one training configuration under a model
//! - [`Checkpoint`] — immutable artifact record under a hyperparameter set
//!
//! Identifier rules and the `:`-joined compound-key format shared by all
//! backends live in [`id`].

pub mod entity;
pub mod id;

pub use entity::{Checkpoint, HyperparameterSet, Model};
pub use id::{
    checkpoint_key, hyperparameters_key, is_valid_id, terminal_segment, KEY_DELIMITER,
};
