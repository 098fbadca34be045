//! Mode 3: unified store authoritative, legacy store kept warm.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Fixture, InstrumentedStorage, playlist};
use dualstore_core::{ResourceObject, WatchEventType};
use dualstore_rest::{
    Backend, DualWriter, DualWriterMode, MirrorOutcome, MirrorPolicy, SkipReason,
};
use dualstore_storage::{
    CreateOptions, Creater, DeleteOptions, Deleter, GetOptions, ListOptions, Lister,
    ObjectStorage, Operation, RequestContext, StorageError, StorageHandle, UpdateOptions, Updater,
    Watcher,
};
use serde_json::json;

fn mode3() -> Fixture {
    Fixture::new(DualWriterMode::Mode3)
}

#[tokio::test]
async fn create_returns_unified_result_and_mirrors_to_legacy() {
    let fx = mode3();
    let ctx = fx.ctx();

    let created = fx
        .writer
        .create(&ctx, &playlist("morning"), None, &CreateOptions::default())
        .await
        .expect("create");

    assert_eq!(Some(created.clone()), fx.unified.peek("morning").await);
    let mirrored = fx.legacy.peek("morning").await.expect("legacy copy");
    assert_eq!(mirrored.spec, created.spec);
    // Each store assigns its own identity.
    assert_ne!(mirrored.metadata.uid, created.metadata.uid);

    let reports = fx.sink.reports();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.operation, Operation::Create);
    assert_eq!(report.backend, Backend::Legacy);
    assert_eq!(report.policy, MirrorPolicy::BestEffort);
    assert_eq!(report.mode, DualWriterMode::Mode3);
    assert_eq!(report.resource, "playlists");
    assert_eq!(report.name, "morning");
    assert_eq!(report.request_id, "test-request");
    assert!(matches!(report.outcome, MirrorOutcome::Mirrored));
}

#[tokio::test]
async fn read_your_write_comes_from_unified() {
    let fx = mode3();
    let ctx = fx.ctx();

    let created = fx
        .writer
        .create(&ctx, &playlist("morning"), None, &CreateOptions::default())
        .await
        .unwrap();
    let fetched = fx
        .writer
        .get(&ctx, "morning", &GetOptions::default())
        .await
        .unwrap();

    assert_eq!(fetched, created);
    assert_eq!(fx.unified.calls(Operation::Get), 1);
    assert_eq!(fx.legacy.calls(Operation::Get), 0);
}

#[tokio::test]
async fn unified_failure_leaves_no_orphan_in_legacy() {
    let fx = mode3();
    let ctx = fx.ctx();
    fx.unified.fail(Operation::Create);

    let err = fx
        .writer
        .create(&ctx, &playlist("morning"), None, &CreateOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Connection error: unified unavailable for create");
    assert_eq!(fx.legacy.calls(Operation::Create), 0);
    assert!(!fx.legacy.contains("morning"));
    assert!(fx.sink.reports().is_empty());
}

#[tokio::test]
async fn unified_error_is_returned_verbatim() {
    let fx = mode3();
    let ctx = fx.ctx();
    fx.writer
        .create(&ctx, &playlist("morning"), None, &CreateOptions::default())
        .await
        .unwrap();

    let err = fx
        .writer
        .create(&ctx, &playlist("morning"), None, &CreateOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_already_exists());
    assert_eq!(err.to_string(), "playlists \"morning\" already exists");
    assert_eq!(fx.legacy.calls(Operation::Create), 1);
}

#[tokio::test]
async fn legacy_failure_does_not_fail_the_write() {
    let fx = mode3();
    let ctx = fx.ctx();
    fx.legacy.fail(Operation::Create);

    let created = fx
        .writer
        .create(&ctx, &playlist("morning"), None, &CreateOptions::default())
        .await
        .expect("unified success wins");

    assert_eq!(created.name(), "morning");
    assert!(fx.unified.contains("morning"));
    assert!(!fx.legacy.contains("morning"));
    // Attempted exactly once, never retried.
    assert_eq!(fx.legacy.calls(Operation::Create), 1);

    let failures = fx.sink.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].backend, Backend::Legacy);
    match &failures[0].outcome {
        MirrorOutcome::Failed(err) => {
            assert!(matches!(err, StorageError::ConnectionError { .. }))
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn missing_legacy_create_is_a_configuration_error() {
    let fx = Fixture::with_handles(
        DualWriterMode::Mode3,
        |legacy| legacy.without(Operation::Create),
        |unified| unified,
    );
    let ctx = fx.ctx();

    let err = fx
        .writer
        .create(&ctx, &playlist("morning"), None, &CreateOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(fx.unified.calls(Operation::Create), 0);
    assert_eq!(fx.unified.total_calls(), 0);
    assert_eq!(fx.legacy.total_calls(), 0);

    // Operations without a gap still work.
    assert!(
        fx.writer
            .get(&ctx, "morning", &GetOptions::default())
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn strict_construction_rejects_missing_legacy_create() {
    let legacy = InstrumentedStorage::new("legacy");
    let unified = InstrumentedStorage::new("unified");

    let err = DualWriter::try_new(
        DualWriterMode::Mode3,
        legacy.handle().without(Operation::Create),
        unified.handle(),
    )
    .unwrap_err();

    assert!(err.is_configuration());
    assert!(err.to_string().contains("does not support create"));
}

#[tokio::test]
async fn get_never_touches_legacy_and_is_idempotent() {
    let fx = mode3();
    let ctx = fx.ctx();
    fx.writer
        .create(&ctx, &playlist("morning"), None, &CreateOptions::default())
        .await
        .unwrap();
    // Legacy being down must not matter for reads.
    fx.legacy.fail(Operation::Get);

    let first = fx
        .writer
        .get(&ctx, "morning", &GetOptions::default())
        .await
        .unwrap();
    let second = fx
        .writer
        .get(&ctx, "morning", &GetOptions::default())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(fx.legacy.calls(Operation::Get), 0);
    assert_eq!(fx.unified.calls(Operation::Get), 2);
    assert_eq!(fx.sink.reports().len(), 1);
}

#[tokio::test]
async fn get_missing_object_is_not_found_from_unified() {
    let fx = mode3();
    let ctx = fx.ctx();

    // Only legacy knows the object; mode 3 does not fall back.
    fx.legacy
        .inner()
        .create(&ctx, &playlist("old"), None, &CreateOptions::default())
        .await
        .unwrap();

    let err = fx
        .writer
        .get(&ctx, "old", &GetOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "playlists \"old\" not found");
}

#[tokio::test]
async fn get_forwards_caller_options() {
    let fx = mode3();
    let ctx = fx.ctx();
    fx.writer
        .create(&ctx, &playlist("morning"), None, &CreateOptions::default())
        .await
        .unwrap();

    let err = fx
        .writer
        .get(&ctx, "morning", &GetOptions::at_version("999"))
        .await
        .unwrap_err();
    assert!(err.is_version_conflict());
}

#[tokio::test]
async fn update_mirrors_and_creates_missing_legacy_copy() {
    let fx = mode3();
    let ctx = fx.ctx();

    // Seed unified only, as if the object predates mirroring.
    let seeded = fx
        .unified
        .inner()
        .create(&ctx, &playlist("morning"), None, &CreateOptions::default())
        .await
        .unwrap();

    let mut changed = seeded.clone();
    changed.spec = json!({"title": "Morning", "interval": "10m", "items": []});
    let updated = fx
        .writer
        .update(&ctx, "morning", &changed, None, &UpdateOptions::default())
        .await
        .unwrap();

    assert_eq!(updated.spec, changed.spec);
    assert_eq!(updated.metadata.generation, 2);
    let mirrored = fx.legacy.peek("morning").await.expect("legacy copy");
    assert_eq!(mirrored.spec, changed.spec);
    assert_eq!(fx.sink.mirrored(), 1);
}

#[tokio::test]
async fn update_conflict_is_not_mirrored() {
    let fx = mode3();
    let ctx = fx.ctx();
    fx.writer
        .create(&ctx, &playlist("morning"), None, &CreateOptions::default())
        .await
        .unwrap();

    let stale = playlist("morning").with_resource_version("999");
    let err = fx
        .writer
        .update(&ctx, "morning", &stale, None, &UpdateOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_version_conflict());
    assert_eq!(fx.legacy.calls(Operation::Update), 0);
}

#[tokio::test]
async fn legacy_update_failure_is_swallowed() {
    let fx = mode3();
    let ctx = fx.ctx();
    let created = fx
        .writer
        .create(&ctx, &playlist("morning"), None, &CreateOptions::default())
        .await
        .unwrap();
    fx.legacy.fail(Operation::Update);

    let mut changed = created.clone();
    changed.spec = json!({"title": "changed"});
    let updated = fx
        .writer
        .update(&ctx, "morning", &changed, None, &UpdateOptions::default())
        .await
        .unwrap();

    assert_eq!(updated.spec, json!({"title": "changed"}));
    assert_eq!(fx.sink.failures().len(), 1);
    assert_eq!(fx.sink.failures()[0].operation, Operation::Update);
}

#[tokio::test]
async fn delete_removes_from_both_stores() {
    let fx = mode3();
    let ctx = fx.ctx();
    fx.writer
        .create(&ctx, &playlist("morning"), None, &CreateOptions::default())
        .await
        .unwrap();

    let deleted = fx
        .writer
        .delete(&ctx, "morning", None, &DeleteOptions::default())
        .await
        .unwrap();

    assert_eq!(deleted.name(), "morning");
    assert!(!fx.unified.contains("morning"));
    assert!(!fx.legacy.contains("morning"));
}

#[tokio::test]
async fn delete_missing_in_legacy_counts_as_mirrored() {
    let fx = mode3();
    let ctx = fx.ctx();
    fx.unified
        .inner()
        .create(&ctx, &playlist("morning"), None, &CreateOptions::default())
        .await
        .unwrap();

    fx.writer
        .delete(&ctx, "morning", None, &DeleteOptions::default())
        .await
        .unwrap();

    assert_eq!(fx.legacy.calls(Operation::Delete), 1);
    assert!(fx.sink.failures().is_empty());
    assert_eq!(fx.sink.mirrored(), 1);
}

#[tokio::test]
async fn delete_preconditions_apply_to_unified_only() {
    let fx = mode3();
    let ctx = fx.ctx();
    let created = fx
        .writer
        .create(&ctx, &playlist("morning"), None, &CreateOptions::default())
        .await
        .unwrap();
    let version = created.resource_version().unwrap().to_string();

    // Wrong version: rejected, legacy untouched.
    let err = fx
        .writer
        .delete(
            &ctx,
            "morning",
            None,
            &DeleteOptions::with_resource_version("999"),
        )
        .await
        .unwrap_err();
    assert!(err.is_version_conflict());
    assert_eq!(fx.legacy.calls(Operation::Delete), 0);

    // The unified version is meaningless to legacy but the mirror still lands.
    fx.writer
        .delete(
            &ctx,
            "morning",
            None,
            &DeleteOptions::with_resource_version(version),
        )
        .await
        .unwrap();
    assert!(!fx.legacy.contains("morning"));
}

#[tokio::test]
async fn list_and_watch_come_from_unified() {
    let fx = mode3();
    let ctx = fx.ctx();
    let mut stream = fx.writer.watch(&ctx, &ListOptions::new()).await.unwrap();

    for name in ["b", "a"] {
        fx.writer
            .create(&ctx, &playlist(name), None, &CreateOptions::default())
            .await
            .unwrap();
    }
    fx.legacy
        .inner()
        .create(&ctx, &playlist("legacy-only"), None, &CreateOptions::default())
        .await
        .unwrap();

    let list = fx.writer.list(&ctx, &ListOptions::new()).await.unwrap();
    assert_eq!(list.names().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(fx.legacy.calls(Operation::List), 0);
    assert_eq!(fx.legacy.calls(Operation::Watch), 0);

    let event = stream.next().await.unwrap();
    assert_eq!(event.event_type, WatchEventType::Added);
    assert_eq!(event.name(), "b");
}

#[tokio::test]
async fn dry_run_skips_the_mirror() {
    let fx = mode3();
    let ctx = fx.ctx();

    let created = fx
        .writer
        .create(&ctx, &playlist("morning"), None, &CreateOptions::dry_run())
        .await
        .unwrap();

    assert_eq!(created.name(), "morning");
    assert!(!fx.unified.contains("morning"));
    assert_eq!(fx.legacy.calls(Operation::Create), 0);
    let reports = fx.sink.reports();
    assert_eq!(reports.len(), 1);
    assert!(matches!(
        reports[0].outcome,
        MirrorOutcome::Skipped(SkipReason::DryRun)
    ));
}

#[tokio::test]
async fn expired_deadline_skips_the_mirror() {
    let fx = mode3();
    let ctx = RequestContext::background()
        .with_request_id("late")
        .with_timeout(Duration::ZERO);

    let created = fx
        .writer
        .create(&ctx, &playlist("morning"), None, &CreateOptions::default())
        .await
        .unwrap();

    assert_eq!(created.name(), "morning");
    assert_eq!(fx.legacy.calls(Operation::Create), 0);
    let reports = fx.sink.reports();
    assert!(matches!(
        reports[0].outcome,
        MirrorOutcome::Skipped(SkipReason::DeadlineExceeded)
    ));
    assert_eq!(reports[0].request_id, "late");
}

#[tokio::test]
async fn generated_name_is_mirrored() {
    let fx = mode3();
    let ctx = fx.ctx();
    let object = ResourceObject::new("", json!({"title": "generated"})).with_generate_name("pl-");

    let created = fx
        .writer
        .create(&ctx, &object, None, &CreateOptions::default())
        .await
        .unwrap();

    assert!(created.name().starts_with("pl-"));
    assert!(fx.legacy.contains(created.name()));
    assert_eq!(fx.sink.reports()[0].name, created.name());
}

#[tokio::test]
async fn validation_runs_against_both_stores() {
    let fx = mode3();
    let ctx = fx.ctx();
    let reject_empty_title = |obj: &ResourceObject| {
        if obj.spec.get("title").is_some() {
            Ok(())
        } else {
            Err(StorageError::invalid_resource("title is required"))
        }
    };

    let err = fx
        .writer
        .create(
            &ctx,
            &ResourceObject::new("untitled", json!({})),
            Some(&reject_empty_title),
            &CreateOptions::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid resource: title is required");
    assert_eq!(fx.legacy.calls(Operation::Create), 0);

    fx.writer
        .create(
            &ctx,
            &playlist("titled"),
            Some(&reject_empty_title),
            &CreateOptions::default(),
        )
        .await
        .unwrap();
    assert!(fx.legacy.contains("titled"));
}

#[tokio::test]
async fn dual_writer_is_a_drop_in_store() {
    let fx = mode3();
    let ctx = fx.ctx();
    let handle = StorageHandle::full(Arc::new(fx.writer.clone()));

    handle
        .creater()
        .unwrap()
        .create(&ctx, &playlist("morning"), None, &CreateOptions::default())
        .await
        .unwrap();
    let fetched = handle
        .storage()
        .get(&ctx, "morning", &GetOptions::default())
        .await
        .unwrap();

    assert_eq!(handle.backend_name(), "dualwriter");
    assert_eq!(fetched.name(), "morning");
    assert!(fx.legacy.contains("morning"));
}

#[tokio::test]
async fn concurrent_writes_are_all_mirrored() {
    let fx = mode3();
    let writer = Arc::new(fx.writer.clone());

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let writer = writer.clone();
            tokio::spawn(async move {
                let ctx = RequestContext::background();
                writer
                    .create(&ctx, &playlist(&format!("p{i}")), None, &CreateOptions::default())
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(fx.unified.len(), 16);
    assert_eq!(fx.legacy.len(), 16);
    assert_eq!(fx.sink.mirrored(), 16);
}
