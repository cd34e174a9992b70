//! Backend-agnostic conformance scenarios for [`RepositoryStorage`].
//!
//! Every backend must pass every scenario with identical observable
//! behavior; both bundled backends run the full battery from their own
//! test modules. A new backend gets validated the same way: construct a
//! fresh instance per scenario and call each function here.
//!
//! Scenarios panic on contract violation, so they are only meant to be
//! called from tests.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use mlmeta_types::{Checkpoint, HyperparameterSet, Model};

use crate::error::{ErrorKind, StorageResult};
use crate::traits::RepositoryStorage;

fn expect_kind<T: std::fmt::Debug>(result: StorageResult<T>, kind: ErrorKind) {
    match result {
        Ok(value) => panic!("expected {kind:?} error, got Ok({value:?})"),
        Err(err) => assert_eq!(err.kind(), kind, "unexpected error: {err}"),
    }
}

fn model(id: &str) -> Model {
    Model {
        model_id: id.into(),
        details: format!("details of {id}"),
        canonical_hyperparameters: "baseline".into(),
    }
}

fn hyperparameters(model_id: &str, id: &str) -> HyperparameterSet {
    HyperparameterSet {
        model_id: model_id.into(),
        hyperparameters_id: id.into(),
        canonical_checkpoint: String::new(),
        upgrade_to: String::new(),
        parameters: BTreeMap::from([("a".to_string(), "1".to_string())]),
    }
}

fn checkpoint(model_id: &str, hyperparameters_id: &str, id: &str) -> Checkpoint {
    Checkpoint {
        model_id: model_id.into(),
        hyperparameters_id: hyperparameters_id.into(),
        checkpoint_id: id.into(),
        link: format!("gs://artifacts/{model_id}/{hyperparameters_id}/{id}"),
        created_at: Utc.with_ymd_and_hms(2024, 5, 20, 10, 30, 0).unwrap(),
        info: BTreeMap::from([("epoch".to_string(), "7".to_string())]),
    }
}

/// A model is absent until added and readable immediately afterwards.
pub async fn model_lifecycle(store: &dyn RepositoryStorage) {
    expect_kind(store.get_model("resnet").await, ErrorKind::NotExist);

    let resnet = model("resnet");
    store.add_model(resnet.clone()).await.unwrap();

    assert_eq!(store.get_model("resnet").await.unwrap(), resnet);
    assert_eq!(
        store.list_models("", 10).await.unwrap(),
        vec!["resnet".to_string()]
    );
}

/// A second creation of the same identity fails and changes nothing.
pub async fn model_create_conflict(store: &dyn RepositoryStorage) {
    let original = model("resnet");
    store.add_model(original.clone()).await.unwrap();

    let mut contender = model("resnet");
    contender.details = "usurper".into();
    expect_kind(store.add_model(contender).await, ErrorKind::Exists);

    assert_eq!(store.get_model("resnet").await.unwrap(), original);
}

/// Merge-update: empty fields are no-ops, non-empty fields overwrite.
pub async fn model_merge_update(store: &dyn RepositoryStorage) {
    expect_kind(store.update_model(model("ghost")).await, ErrorKind::NotExist);

    let original = model("resnet");
    store.add_model(original.clone()).await.unwrap();

    let noop = Model {
        model_id: "resnet".into(),
        details: String::new(),
        canonical_hyperparameters: String::new(),
    };
    assert_eq!(store.update_model(noop).await.unwrap(), original);
    assert_eq!(store.get_model("resnet").await.unwrap(), original);

    let update = Model {
        model_id: "resnet".into(),
        details: "retrained on v2 data".into(),
        canonical_hyperparameters: String::new(),
    };
    let merged = store.update_model(update).await.unwrap();
    assert_eq!(merged.details, "retrained on v2 data");
    assert_eq!(merged.canonical_hyperparameters, "baseline");
    assert_eq!(store.get_model("resnet").await.unwrap(), merged);
}

/// Children cannot be created, read, updated, or listed without their
/// ancestors.
pub async fn hierarchy_enforcement(store: &dyn RepositoryStorage) {
    expect_kind(
        store.add_hyperparameters(hyperparameters("ghost", "p1")).await,
        ErrorKind::NotExist,
    );
    expect_kind(
        store
            .update_hyperparameters(hyperparameters("ghost", "p1"))
            .await,
        ErrorKind::NotExist,
    );
    expect_kind(
        store.list_hyperparameters("ghost", "", 10).await,
        ErrorKind::NotExist,
    );

    store.add_model(model("resnet")).await.unwrap();

    expect_kind(
        store.add_checkpoint(checkpoint("resnet", "ghost", "c1")).await,
        ErrorKind::NotExist,
    );
    expect_kind(
        store.list_checkpoints("resnet", "ghost", "", 10).await,
        ErrorKind::NotExist,
    );
    expect_kind(
        store.get_checkpoint("resnet", "ghost", "c1").await,
        ErrorKind::NotExist,
    );
}

/// Malformed ids are rejected before anything is stored.
pub async fn invalid_ids_rejected(store: &dyn RepositoryStorage) {
    expect_kind(store.add_model(model("")).await, ErrorKind::InvalidId);
    expect_kind(store.add_model(model("bad id")).await, ErrorKind::InvalidId);
    expect_kind(store.add_model(model("a:b")).await, ErrorKind::InvalidId);

    store.add_model(model("resnet")).await.unwrap();
    expect_kind(
        store
            .add_hyperparameters(hyperparameters("resnet", "p 1"))
            .await,
        ErrorKind::InvalidId,
    );
    store
        .add_hyperparameters(hyperparameters("resnet", "p1"))
        .await
        .unwrap();
    expect_kind(
        store.add_checkpoint(checkpoint("resnet", "p1", "c/1")).await,
        ErrorKind::InvalidId,
    );

    assert_eq!(
        store.list_models("", 10).await.unwrap(),
        vec!["resnet".to_string()]
    );
}

/// Listing is sorted, the marker is an exclusive lower bound, and the
/// page bound caps the result.
pub async fn list_models_pagination(store: &dyn RepositoryStorage) {
    for id in ["delta", "alpha", "gamma", "beta"] {
        store.add_model(model(id)).await.unwrap();
    }

    assert_eq!(
        store.list_models("", 10).await.unwrap(),
        vec!["alpha", "beta", "delta", "gamma"]
    );
    // The marker itself is excluded.
    assert_eq!(
        store.list_models("alpha", 2).await.unwrap(),
        vec!["beta", "delta"]
    );
    // A marker between stored ids starts at the next greater one.
    assert_eq!(
        store.list_models("carrot", 10).await.unwrap(),
        vec!["delta", "gamma"]
    );
    assert_eq!(store.list_models("gamma", 10).await.unwrap(), Vec::<String>::new());
    assert_eq!(store.list_models("zzz", 10).await.unwrap(), Vec::<String>::new());
}

/// `max_items <= 0` falls back to the default page size of 10.
pub async fn default_page_size(store: &dyn RepositoryStorage) {
    for i in 0..12 {
        store.add_model(model(&format!("run-{i:02}"))).await.unwrap();
    }

    let explicit = store.list_models("", 10).await.unwrap();
    assert_eq!(explicit.len(), 10);
    assert_eq!(store.list_models("", 0).await.unwrap(), explicit);
    assert_eq!(store.list_models("", -5).await.unwrap(), explicit);

    let after_marker = store.list_models("run-03", 10).await.unwrap();
    assert_eq!(after_marker.len(), 8);
    assert_eq!(store.list_models("run-03", 0).await.unwrap(), after_marker);
}

/// Hyperparameter merge-update: no-op on empty update, key-wise overwrite
/// otherwise.
pub async fn hyperparameters_merge_update(store: &dyn RepositoryStorage) {
    store.add_model(model("resnet")).await.unwrap();
    let original = hyperparameters("resnet", "p1");
    store.add_hyperparameters(original.clone()).await.unwrap();

    let noop = HyperparameterSet {
        model_id: "resnet".into(),
        hyperparameters_id: "p1".into(),
        canonical_checkpoint: String::new(),
        upgrade_to: String::new(),
        parameters: BTreeMap::new(),
    };
    assert_eq!(store.update_hyperparameters(noop).await.unwrap(), original);
    assert_eq!(
        store.get_hyperparameters("resnet", "p1").await.unwrap(),
        original
    );

    let update = HyperparameterSet {
        model_id: "resnet".into(),
        hyperparameters_id: "p1".into(),
        canonical_checkpoint: "c2".into(),
        upgrade_to: String::new(),
        parameters: BTreeMap::from([
            ("a".to_string(), "2".to_string()),
            ("b".to_string(), "3".to_string()),
        ]),
    };
    let merged = store.update_hyperparameters(update).await.unwrap();
    assert_eq!(merged.canonical_checkpoint, "c2");
    assert_eq!(
        merged.parameters,
        BTreeMap::from([
            ("a".to_string(), "2".to_string()),
            ("b".to_string(), "3".to_string()),
        ])
    );
    assert_eq!(
        store.get_hyperparameters("resnet", "p1").await.unwrap(),
        merged
    );
}

/// Checkpoints round-trip through storage and list in order with the same
/// paging rules as every other level.
pub async fn checkpoint_lifecycle(store: &dyn RepositoryStorage) {
    store.add_model(model("resnet")).await.unwrap();
    store
        .add_hyperparameters(hyperparameters("resnet", "p1"))
        .await
        .unwrap();

    // Listing an empty scope succeeds with an empty page.
    assert_eq!(
        store.list_checkpoints("resnet", "p1", "", 10).await.unwrap(),
        Vec::<String>::new()
    );

    let cp1 = checkpoint("resnet", "p1", "cp1");
    store.add_checkpoint(cp1.clone()).await.unwrap();
    assert_eq!(
        store.get_checkpoint("resnet", "p1", "cp1").await.unwrap(),
        cp1
    );

    expect_kind(
        store.add_checkpoint(checkpoint("resnet", "p1", "cp1")).await,
        ErrorKind::Exists,
    );

    for id in ["cp3", "cp2", "cp4"] {
        store
            .add_checkpoint(checkpoint("resnet", "p1", id))
            .await
            .unwrap();
    }

    assert_eq!(
        store.list_checkpoints("resnet", "p1", "", 10).await.unwrap(),
        vec![
            "resnet:p1:cp1",
            "resnet:p1:cp2",
            "resnet:p1:cp3",
            "resnet:p1:cp4",
        ]
    );
    assert_eq!(
        store.list_checkpoints("resnet", "p1", "", 2).await.unwrap(),
        vec!["resnet:p1:cp1", "resnet:p1:cp2"]
    );
    assert_eq!(
        store
            .list_checkpoints("resnet", "p1", "cp22", 10)
            .await
            .unwrap(),
        vec!["resnet:p1:cp3", "resnet:p1:cp4"]
    );
}

/// No operation on the surrounding hierarchy alters a stored checkpoint.
pub async fn checkpoint_immutability(store: &dyn RepositoryStorage) {
    store.add_model(model("resnet")).await.unwrap();
    store
        .add_hyperparameters(hyperparameters("resnet", "p1"))
        .await
        .unwrap();
    let cp = checkpoint("resnet", "p1", "cp1");
    store.add_checkpoint(cp.clone()).await.unwrap();

    store
        .update_model(Model {
            model_id: "resnet".into(),
            details: "rewritten".into(),
            canonical_hyperparameters: "p1".into(),
        })
        .await
        .unwrap();
    store
        .update_hyperparameters(HyperparameterSet {
            model_id: "resnet".into(),
            hyperparameters_id: "p1".into(),
            canonical_checkpoint: "cp1".into(),
            upgrade_to: String::new(),
            parameters: BTreeMap::from([("a".to_string(), "9".to_string())]),
        })
        .await
        .unwrap();

    assert_eq!(
        store.get_checkpoint("resnet", "p1", "cp1").await.unwrap(),
        cp
    );
}

/// Child listings never leak entries from a sibling parent, even when the
/// sibling's compound keys interleave lexicographically.
pub async fn child_scope_isolation(store: &dyn RepositoryStorage) {
    // "alpha-2:…" sorts *before* "alpha:…" ('-' < ':'), so a naive range
    // scan would interleave the two models' children.
    store.add_model(model("alpha")).await.unwrap();
    store.add_model(model("alpha-2")).await.unwrap();

    for (m, p) in [("alpha", "p1"), ("alpha", "p3"), ("alpha-2", "p2")] {
        store.add_hyperparameters(hyperparameters(m, p)).await.unwrap();
    }

    assert_eq!(
        store.list_hyperparameters("alpha", "", 10).await.unwrap(),
        vec!["alpha:p1", "alpha:p3"]
    );
    assert_eq!(
        store.list_hyperparameters("alpha-2", "", 10).await.unwrap(),
        vec!["alpha-2:p2"]
    );

    store
        .add_checkpoint(checkpoint("alpha", "p1", "c1"))
        .await
        .unwrap();
    store
        .add_checkpoint(checkpoint("alpha-2", "p2", "c2"))
        .await
        .unwrap();

    assert_eq!(
        store.list_checkpoints("alpha", "p1", "", 10).await.unwrap(),
        vec!["alpha:p1:c1"]
    );
    assert_eq!(
        store.list_checkpoints("alpha", "p3", "", 10).await.unwrap(),
        Vec::<String>::new()
    );
}

/// A child-scope listing without its parent scope is a hierarchy
/// violation, not a lookup miss.
pub async fn empty_scope_rejected(store: &dyn RepositoryStorage) {
    expect_kind(
        store.list_hyperparameters("", "", 10).await,
        ErrorKind::HierarchyViolation,
    );
    expect_kind(
        store.list_checkpoints("", "p1", "", 10).await,
        ErrorKind::HierarchyViolation,
    );
    expect_kind(
        store.list_checkpoints("m1", "", "", 10).await,
        ErrorKind::HierarchyViolation,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStorage;
    use crate::object::ObjectStoreStorage;
    use object_store::memory::InMemory;
    use std::sync::Arc;

    /// Drive one backend through a fixed script and record what it
    /// observes: Ok payloads verbatim, errors by taxonomy kind.
    async fn observe(store: &dyn RepositoryStorage) -> Vec<String> {
        fn note<T: std::fmt::Debug>(log: &mut Vec<String>, result: StorageResult<T>) {
            match result {
                Ok(value) => log.push(format!("ok {value:?}")),
                Err(err) => log.push(format!("err {:?}", err.kind())),
            }
        }

        let mut log = Vec::new();
        note(&mut log, store.get_model("m1").await);
        note(&mut log, store.add_model(model("m1")).await);
        note(&mut log, store.add_model(model("m1")).await);
        note(&mut log, store.add_model(model("m2")).await);
        note(&mut log, store.get_model("m1").await);
        note(&mut log, store.list_models("", 10).await);
        note(&mut log, store.list_models("m1", 1).await);
        note(&mut log, store.list_models("", -3).await);
        note(
            &mut log,
            store
                .update_model(Model {
                    model_id: "m1".into(),
                    details: "v2".into(),
                    canonical_hyperparameters: String::new(),
                })
                .await,
        );
        note(
            &mut log,
            store.add_hyperparameters(hyperparameters("nope", "p1")).await,
        );
        note(
            &mut log,
            store.add_hyperparameters(hyperparameters("m1", "p1")).await,
        );
        note(
            &mut log,
            store.add_hyperparameters(hyperparameters("m1", "p1")).await,
        );
        note(&mut log, store.get_hyperparameters("m1", "p1").await);
        note(&mut log, store.list_hyperparameters("m1", "", 10).await);
        note(&mut log, store.list_hyperparameters("m2", "", 10).await);
        note(
            &mut log,
            store
                .update_hyperparameters(HyperparameterSet {
                    model_id: "m1".into(),
                    hyperparameters_id: "p1".into(),
                    canonical_checkpoint: "c1".into(),
                    upgrade_to: String::new(),
                    parameters: BTreeMap::from([("b".to_string(), "2".to_string())]),
                })
                .await,
        );
        note(&mut log, store.add_checkpoint(checkpoint("m1", "p1", "c1")).await);
        note(&mut log, store.add_checkpoint(checkpoint("m1", "p1", "c1")).await);
        note(&mut log, store.add_checkpoint(checkpoint("m1", "ghost", "c1")).await);
        note(&mut log, store.get_checkpoint("m1", "p1", "c1").await);
        note(&mut log, store.list_checkpoints("m1", "p1", "", 10).await);
        note(&mut log, store.list_checkpoints("m1", "p1", "c1", 10).await);
        note(&mut log, store.list_checkpoints("", "p1", "", 10).await);
        log
    }

    #[tokio::test]
    async fn backends_observe_identical_results() {
        let memory = InMemoryStorage::new();
        let blob = ObjectStoreStorage::new(Arc::new(InMemory::new()));

        let memory_log = observe(&memory).await;
        let blob_log = observe(&blob).await;
        assert_eq!(memory_log, blob_log);
    }
}
