//! Registry entities and their merge-update semantics.
//!
//! Updates in the registry never replace an entity wholesale. Instead the
//! caller submits a sparse value of the same shape and the stored entity
//! absorbs it field by field: scalar fields overwrite only when the
//! submitted value is non-empty (after trimming whitespace), and string
//! maps merge key-wise with empty-string values acting as no-ops. Both
//! storage backends call the same `merge_from` methods, so the semantics
//! cannot drift between them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{checkpoint_key, hyperparameters_key};

fn non_empty(s: &str) -> bool {
    !s.trim().is_empty()
}

/// Top-level registry entity.
///
/// Created once per `model_id`; `details` and `canonical_hyperparameters`
/// remain mutable via merge-update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub model_id: String,
    pub details: String,
    /// Designated "current best" hyperparameter set. Advisory only; not
    /// enforced as a foreign key.
    pub canonical_hyperparameters: String,
}

impl Model {
    /// Absorb the non-empty scalar fields of `update`.
    pub fn merge_from(&mut self, update: &Model) {
        if non_empty(&update.details) {
            self.details = update.details.clone();
        }
        if non_empty(&update.canonical_hyperparameters) {
            self.canonical_hyperparameters = update.canonical_hyperparameters.clone();
        }
    }
}

/// One training configuration under a model.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HyperparameterSet {
    pub model_id: String,
    pub hyperparameters_id: String,
    /// Designated "current best" checkpoint. Advisory only.
    pub canonical_checkpoint: String,
    /// Hyperparameter set clients should migrate to, if any.
    pub upgrade_to: String,
    pub parameters: BTreeMap<String, String>,
}

impl HyperparameterSet {
    /// Compound key: `<modelId>:<hyperparametersId>`.
    pub fn key(&self) -> String {
        hyperparameters_key(&self.model_id, &self.hyperparameters_id)
    }

    /// Absorb the non-empty scalar fields of `update` and merge its
    /// `parameters` key-wise. Supplied keys overwrite, keys not mentioned
    /// are untouched, and entries with empty values are ignored.
    pub fn merge_from(&mut self, update: &HyperparameterSet) {
        if non_empty(&update.canonical_checkpoint) {
            self.canonical_checkpoint = update.canonical_checkpoint.clone();
        }
        if non_empty(&update.upgrade_to) {
            self.upgrade_to = update.upgrade_to.clone();
        }
        for (k, v) in &update.parameters {
            if non_empty(v) {
                self.parameters.insert(k.clone(), v.clone());
            }
        }
    }
}

/// An artifact produced under a hyperparameter set.
///
/// Checkpoints are immutable: the contract offers no update operation for
/// them, so there is no `merge_from` here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub model_id: String,
    pub hyperparameters_id: String,
    pub checkpoint_id: String,
    /// Location of the artifact payload (the registry stores metadata only).
    pub link: String,
    pub created_at: DateTime<Utc>,
    pub info: BTreeMap<String, String>,
}

impl Checkpoint {
    /// Compound key: `<modelId>:<hyperparametersId>:<checkpointId>`.
    pub fn key(&self) -> String {
        checkpoint_key(&self.model_id, &self.hyperparameters_id, &self.checkpoint_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn model_merge_skips_empty_fields() {
        let mut stored = Model {
            model_id: "m1".into(),
            details: "original details".into(),
            canonical_hyperparameters: "p1".into(),
        };
        let before = stored.clone();

        stored.merge_from(&Model {
            model_id: "m1".into(),
            details: String::new(),
            canonical_hyperparameters: "   ".into(),
        });

        assert_eq!(stored, before);
    }

    #[test]
    fn model_merge_overwrites_non_empty_fields() {
        let mut stored = Model {
            model_id: "m1".into(),
            details: "old".into(),
            canonical_hyperparameters: "p1".into(),
        };

        stored.merge_from(&Model {
            model_id: "m1".into(),
            details: "new".into(),
            canonical_hyperparameters: String::new(),
        });

        assert_eq!(stored.details, "new");
        assert_eq!(stored.canonical_hyperparameters, "p1");
    }

    #[test]
    fn hyperparameters_merge_is_noop_on_empty_update() {
        let mut stored = HyperparameterSet {
            model_id: "m1".into(),
            hyperparameters_id: "p1".into(),
            canonical_checkpoint: "c1".into(),
            upgrade_to: String::new(),
            parameters: params(&[("a", "1")]),
        };
        let before = stored.clone();

        stored.merge_from(&HyperparameterSet {
            model_id: "m1".into(),
            hyperparameters_id: "p1".into(),
            ..Default::default()
        });

        assert_eq!(stored, before);
    }

    #[test]
    fn hyperparameters_merge_overwrites_and_extends_parameters() {
        let mut stored = HyperparameterSet {
            model_id: "m1".into(),
            hyperparameters_id: "p1".into(),
            canonical_checkpoint: "c1".into(),
            upgrade_to: String::new(),
            parameters: params(&[("a", "1")]),
        };

        stored.merge_from(&HyperparameterSet {
            model_id: "m1".into(),
            hyperparameters_id: "p1".into(),
            canonical_checkpoint: "c2".into(),
            upgrade_to: "p2".into(),
            parameters: params(&[("a", "2"), ("b", "3")]),
        });

        assert_eq!(stored.canonical_checkpoint, "c2");
        assert_eq!(stored.upgrade_to, "p2");
        assert_eq!(stored.parameters, params(&[("a", "2"), ("b", "3")]));
    }

    #[test]
    fn hyperparameters_merge_ignores_empty_map_values() {
        let mut stored = HyperparameterSet {
            model_id: "m1".into(),
            hyperparameters_id: "p1".into(),
            canonical_checkpoint: String::new(),
            upgrade_to: String::new(),
            parameters: params(&[("a", "1")]),
        };

        stored.merge_from(&HyperparameterSet {
            model_id: "m1".into(),
            hyperparameters_id: "p1".into(),
            parameters: params(&[("a", ""), ("b", "  ")]),
            ..Default::default()
        });

        assert_eq!(stored.parameters, params(&[("a", "1")]));
    }

    #[test]
    fn document_field_names_are_stable() {
        // Persisted JSON documents are a compatibility surface; renaming a
        // struct field must not silently rename the stored key.
        let cp = Checkpoint {
            model_id: "m1".into(),
            hyperparameters_id: "p1".into(),
            checkpoint_id: "c1".into(),
            link: "gs://bucket/c1".into(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            info: params(&[("epoch", "3")]),
        };
        let doc = serde_json::to_value(&cp).unwrap();
        for field in [
            "model_id",
            "hyperparameters_id",
            "checkpoint_id",
            "link",
            "created_at",
            "info",
        ] {
            assert!(doc.get(field).is_some(), "missing field {field}");
        }
    }

    #[test]
    fn compound_keys() {
        let hp = HyperparameterSet {
            model_id: "m1".into(),
            hyperparameters_id: "p1".into(),
            ..Default::default()
        };
        assert_eq!(hp.key(), "m1:p1");

        let cp = Checkpoint {
            model_id: "m1".into(),
            hyperparameters_id: "p1".into(),
            checkpoint_id: "c1".into(),
            link: "gs://bucket/c1".into(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            info: BTreeMap::new(),
        };
        assert_eq!(cp.key(), "m1:p1:c1");
    }
}
