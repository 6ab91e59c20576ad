//! End-to-end index and resync runs over in-memory repository, model and
//! embedding fakes backed by a real SQLite database.

mod common;

use common::{
    as_refs, harness, service_files, settings, test_store, FakeGenerator, FakeRepo, OVERVIEW,
};
use repo_indexer::embedding::DisabledProvider;
use repo_indexer::error::RunError;
use repo_indexer::generation::{DisabledGenerator, ModelTier};
use repo_indexer::indexer::Pipeline;
use repo_indexer::models::{ConnectionStatus, ModuleType, MODULE_SOURCE_TYPE};
use repo_indexer::progress::IndexProgressEvent;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn seven_files_index_in_two_batches() {
    let files = service_files(7);
    let h = harness(&as_refs(&files)).await;
    assert_eq!(h.connection.status, ConnectionStatus::Pending);

    let report = h
        .pipeline
        .run_full_index(&h.connection.id, false)
        .await
        .unwrap();

    assert_eq!(h.progress.batch_module_counts(), vec![5, 7]);
    assert_eq!(
        h.progress.statuses(),
        vec![ConnectionStatus::Syncing, ConnectionStatus::Ready]
    );

    let connection = h.reload().await;
    assert_eq!(connection.status, ConnectionStatus::Ready);
    assert_eq!(connection.file_count, 7);
    assert_eq!(connection.module_count, 7);
    assert!(connection.last_synced_at.is_some());
    assert!(connection.error_message.is_none());

    assert_eq!(report.eligible, 7);
    assert_eq!(report.indexed, 7);
    assert_eq!(report.summary.summarized, 7);
    assert_eq!(report.summary.embedded, 7);
    assert!(report.architecture_updated);
    assert_eq!(report.module_count, 7);
}

#[tokio::test]
async fn indexed_module_carries_structure_summary_and_embedding() {
    let h = harness(&[(
        "src/services/billing.ts",
        "import { db } from './db';\nexport function charge() {}\nexport class Invoice {}\n",
    )])
    .await;

    h.pipeline
        .run_full_index(&h.connection.id, false)
        .await
        .unwrap();

    let module = h
        .store
        .get_module_by_path(&h.connection.id, "src/services/billing.ts")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(module.module_name, "billing");
    assert_eq!(module.module_type, ModuleType::Service);
    assert_eq!(module.language.as_deref(), Some("typescript"));
    assert_eq!(module.dependencies, vec!["./db".to_string()]);
    assert!(module.exports.contains(&"charge".to_string()));
    assert!(module.classes.contains(&"Invoice".to_string()));
    assert_eq!(
        module.summary.as_deref(),
        Some("Summary of src/services/billing.ts.")
    );
    assert_eq!(module.embedding.as_ref().map(|v| v.len()), Some(3));
    assert_eq!(h.store.count_embeddings(MODULE_SOURCE_TYPE).await.unwrap(), 1);
}

#[tokio::test]
async fn architecture_summary_is_stored_trimmed() {
    let files = service_files(3);
    let h = harness(&as_refs(&files)).await;

    h.pipeline
        .run_full_index(&h.connection.id, false)
        .await
        .unwrap();

    let summary = h.store.get_architecture_summary("ws1").await.unwrap().unwrap();
    assert_eq!(summary.content, OVERVIEW);

    let synthesis = h.generator.requests(ModelTier::Strong);
    assert_eq!(synthesis.len(), 1);
    assert!(synthesis[0].system.as_deref().unwrap_or("").contains("Markdown"));
    assert!(synthesis[0].prompt.contains("these 3 modules"));
    assert!(synthesis[0]
        .prompt
        .contains("Summary: Summary of src/services/f1.ts."));
}

#[tokio::test]
async fn oversized_file_is_skipped_without_error() {
    let big = "a".repeat(150 * 1024);
    let h = harness(&[
        ("src/big.ts", big.as_str()),
        ("src/small.ts", "export const x = 1;\n"),
    ])
    .await;

    let report = h
        .pipeline
        .run_full_index(&h.connection.id, false)
        .await
        .unwrap();

    assert!(h.repo.fetched().contains(&"src/big.ts".to_string()));
    assert!(h
        .store
        .get_module_by_path(&h.connection.id, "src/big.ts")
        .await
        .unwrap()
        .is_none());
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);

    let connection = h.reload().await;
    assert_eq!(connection.status, ConnectionStatus::Ready);
    assert!(connection.error_message.is_none());
    assert_eq!(connection.file_count, 2);
    assert_eq!(connection.module_count, 1);
}

#[tokio::test]
async fn file_too_large_for_the_contents_api_is_a_skip() {
    let files = service_files(3);
    let h = harness(&as_refs(&files)).await;
    h.repo.make_too_large("src/services/f1.ts");

    let report = h
        .pipeline
        .run_full_index(&h.connection.id, false)
        .await
        .unwrap();

    assert_eq!(report.indexed, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    let connection = h.reload().await;
    assert_eq!(connection.status, ConnectionStatus::Ready);
    assert_eq!(connection.module_count, 2);
}

#[tokio::test]
async fn revoked_token_mid_run_fails_the_whole_run() {
    let files = service_files(7);
    let h = harness(&as_refs(&files)).await;
    h.repo.revoke_token_at("src/services/f1.ts");

    let result = h.pipeline.run_full_index(&h.connection.id, false).await;
    assert!(result.is_err());

    let connection = h.reload().await;
    assert_eq!(connection.status, ConnectionStatus::Error);
    let message = connection.error_message.unwrap();
    assert!(message.contains("Authentication failed"), "message: {}", message);

    // The second batch is never fetched and nothing is summarized.
    let fetched = h.repo.fetched();
    assert_eq!(fetched.len(), 5);
    assert!(!fetched.contains(&"src/services/f5.ts".to_string()));
    assert!(h.generator.requests(ModelTier::Fast).is_empty());
    assert!(h.generator.requests(ModelTier::Strong).is_empty());
    assert!(h
        .store
        .get_module_by_path(&h.connection.id, "src/services/f1.ts")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn missing_tree_marks_connection_error() {
    let files = service_files(2);
    let h = harness(&as_refs(&files)).await;
    h.repo.lose_tree();

    let result = h.pipeline.run_full_index(&h.connection.id, false).await;
    assert!(result.is_err());

    let connection = h.reload().await;
    assert_eq!(connection.status, ConnectionStatus::Error);
    let message = connection.error_message.unwrap();
    assert!(message.contains("not found"), "message: {}", message);
    assert_eq!(h.store.count_modules(&h.connection.id).await.unwrap(), 0);

    assert!(matches!(
        h.progress.events().last(),
        Some(IndexProgressEvent::Failed { .. })
    ));
}

#[tokio::test]
async fn failing_file_is_skipped_and_run_completes() {
    let files = service_files(3);
    let h = harness(&as_refs(&files)).await;
    h.repo.break_file("src/services/f1.ts");

    let report = h
        .pipeline
        .run_full_index(&h.connection.id, false)
        .await
        .unwrap();

    assert_eq!(report.indexed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(
        h.store.module_paths(&h.connection.id).await.unwrap(),
        vec!["src/services/f0.ts", "src/services/f2.ts"]
    );
    assert_eq!(h.reload().await.status, ConnectionStatus::Ready);
}

#[tokio::test]
async fn summarization_failure_leaves_fields_empty() {
    let files = service_files(3);
    let h = harness(&as_refs(&files)).await;
    h.generator.fail_summary_for("src/services/f2.ts");

    let report = h
        .pipeline
        .run_full_index(&h.connection.id, false)
        .await
        .unwrap();

    assert_eq!(report.summary.summarized, 2);
    assert_eq!(report.summary.failed, 1);

    let failed = h
        .store
        .get_module_by_path(&h.connection.id, "src/services/f2.ts")
        .await
        .unwrap()
        .unwrap();
    assert!(failed.summary.is_none());
    assert!(failed.embedding.is_none());
    assert_eq!(h.store.count_embeddings(MODULE_SOURCE_TYPE).await.unwrap(), 2);
    assert_eq!(h.reload().await.status, ConnectionStatus::Ready);
}

#[tokio::test]
async fn synthesis_failure_fails_the_run_but_keeps_modules() {
    let files = service_files(3);
    let h = harness(&as_refs(&files)).await;
    h.generator.fail_synthesis();

    let result = h.pipeline.run_full_index(&h.connection.id, false).await;
    assert!(result.is_err());

    let connection = h.reload().await;
    assert_eq!(connection.status, ConnectionStatus::Error);
    assert!(connection
        .error_message
        .unwrap()
        .contains("synthesis model unavailable"));
    assert_eq!(h.store.count_modules(&h.connection.id).await.unwrap(), 3);
}

#[tokio::test]
async fn reindexing_is_idempotent() {
    let files = service_files(4);
    let h = harness(&as_refs(&files)).await;

    h.pipeline
        .run_full_index(&h.connection.id, false)
        .await
        .unwrap();
    let first_paths = h.store.module_paths(&h.connection.id).await.unwrap();
    let first = h
        .store
        .get_module_by_path(&h.connection.id, "src/services/f0.ts")
        .await
        .unwrap()
        .unwrap();

    h.pipeline
        .run_full_index(&h.connection.id, false)
        .await
        .unwrap();
    let second = h
        .store
        .get_module_by_path(&h.connection.id, "src/services/f0.ts")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(h.store.module_paths(&h.connection.id).await.unwrap(), first_paths);
    assert_eq!(second.id, first.id);
    assert_eq!(second.summary, first.summary);
    assert_eq!(second.exports, first.exports);
    assert_eq!(h.store.count_embeddings(MODULE_SOURCE_TYPE).await.unwrap(), 4);
    // Already summarized modules are not sent to the model again.
    assert_eq!(h.generator.requests(ModelTier::Fast).len(), 4);
    assert_eq!(h.reload().await.module_count, 4);
}

#[tokio::test]
async fn already_syncing_connection_is_rejected_unless_forced() {
    let files = service_files(2);
    let h = harness(&as_refs(&files)).await;
    assert!(h.store.try_begin_sync(&h.connection.id, false).await.unwrap());

    let err = h
        .pipeline
        .run_full_index(&h.connection.id, false)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RunError>(),
        Some(RunError::AlreadySyncing(_))
    ));
    assert_eq!(h.reload().await.status, ConnectionStatus::Syncing);
    assert!(h.repo.fetched().is_empty());

    h.pipeline
        .run_full_index(&h.connection.id, true)
        .await
        .unwrap();
    assert_eq!(h.reload().await.status, ConnectionStatus::Ready);
}

#[tokio::test]
async fn unknown_connection_is_reported() {
    let h = harness(&[]).await;
    let err = h.pipeline.run_resync("nope", false).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RunError>(),
        Some(RunError::ConnectionNotFound(_))
    ));
}

#[tokio::test]
async fn resync_applies_additions_and_removals_only() {
    let h = harness(&[
        ("src/a.ts", "export const a = 1;\n"),
        ("src/b.ts", "export const b = 1;\n"),
        ("src/c.ts", "export const c = 1;\n"),
    ])
    .await;
    h.pipeline
        .run_full_index(&h.connection.id, false)
        .await
        .unwrap();
    let b_before = h
        .store
        .get_module_by_path(&h.connection.id, "src/b.ts")
        .await
        .unwrap()
        .unwrap();

    h.repo.set_files(&[
        ("src/b.ts", "export const b = 2;\nexport const extra = 3;\n"),
        ("src/c.ts", "export const c = 1;\n"),
        ("src/d.ts", "export const d = 1;\n"),
    ]);
    h.repo.clear_fetched();

    let report = h.pipeline.run_resync(&h.connection.id, false).await.unwrap();

    assert_eq!(report.removed, 1);
    assert_eq!(report.indexed, 1);
    assert_eq!(
        h.store.module_paths(&h.connection.id).await.unwrap(),
        vec!["src/b.ts", "src/c.ts", "src/d.ts"]
    );
    assert_eq!(h.repo.fetched(), vec!["src/d.ts".to_string()]);
    assert_eq!(h.store.count_embeddings(MODULE_SOURCE_TYPE).await.unwrap(), 3);

    let d = h
        .store
        .get_module_by_path(&h.connection.id, "src/d.ts")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(d.summary.as_deref(), Some("Summary of src/d.ts."));
    assert!(d.embedding.is_some());

    // Unchanged paths keep their stored content and summary.
    let b_after = h
        .store
        .get_module_by_path(&h.connection.id, "src/b.ts")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(b_after.raw_content, b_before.raw_content);
    assert_eq!(b_after.summary, b_before.summary);

    assert_eq!(h.generator.requests(ModelTier::Fast).len(), 4);
    assert_eq!(h.generator.requests(ModelTier::Strong).len(), 2);

    let connection = h.reload().await;
    assert_eq!(connection.status, ConnectionStatus::Ready);
    assert_eq!(connection.module_count, 3);
    assert_eq!(connection.file_count, 3);
}

#[tokio::test]
async fn resync_with_no_changes_still_synthesizes() {
    let files = service_files(2);
    let h = harness(&as_refs(&files)).await;
    h.pipeline
        .run_full_index(&h.connection.id, false)
        .await
        .unwrap();
    h.repo.clear_fetched();

    let report = h.pipeline.run_resync(&h.connection.id, false).await.unwrap();

    assert_eq!(report.indexed, 0);
    assert_eq!(report.removed, 0);
    assert!(report.architecture_updated);
    assert!(h.repo.fetched().is_empty());
    assert_eq!(h.reload().await.module_count, 2);
}

#[tokio::test]
async fn synthesis_covers_every_connection_of_the_workspace() {
    let files = service_files(2);
    let h = harness(&as_refs(&files)).await;
    let second = h
        .store
        .create_connection("ws1", "acme/api", "main")
        .await
        .unwrap();

    h.pipeline
        .run_full_index(&h.connection.id, false)
        .await
        .unwrap();
    h.pipeline.run_full_index(&second.id, false).await.unwrap();

    let synthesis = h.generator.requests(ModelTier::Strong);
    assert!(synthesis.last().unwrap().prompt.contains("these 4 modules"));
}

#[tokio::test]
async fn disabled_providers_index_structure_only() {
    let tmp = TempDir::new().unwrap();
    let store = test_store(&tmp).await;
    let files = service_files(3);
    let pipeline = Pipeline::new(
        store.clone(),
        FakeRepo::new(&as_refs(&files)),
        Arc::new(DisabledGenerator),
        Arc::new(DisabledProvider),
        settings(),
    );
    let connection = store
        .create_connection("ws1", "acme/web", "main")
        .await
        .unwrap();

    let report = pipeline.run_full_index(&connection.id, false).await.unwrap();

    assert_eq!(report.indexed, 3);
    assert_eq!(report.summary.summarized, 0);
    assert!(!report.architecture_updated);
    assert!(store.get_architecture_summary("ws1").await.unwrap().is_none());
    assert_eq!(store.modules_missing_summary(&connection.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn summaries_without_embeddings_when_embedder_disabled() {
    let tmp = TempDir::new().unwrap();
    let store = test_store(&tmp).await;
    let files = service_files(2);
    let pipeline = Pipeline::new(
        store.clone(),
        FakeRepo::new(&as_refs(&files)),
        Arc::new(FakeGenerator::default()),
        Arc::new(DisabledProvider),
        settings(),
    );
    let connection = store
        .create_connection("ws1", "acme/web", "main")
        .await
        .unwrap();

    let report = pipeline.run_full_index(&connection.id, false).await.unwrap();

    assert_eq!(report.summary.summarized, 2);
    assert_eq!(report.summary.embedded, 0);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(store.count_embeddings(MODULE_SOURCE_TYPE).await.unwrap(), 0);
}
