//! Integration tests for the parallel fan-out/fan-in topology

mod common;

use common::{finished_record, seed_records, test_pipeline};
use serde_json::json;
use sweeper_core::constants::handler_types;
use sweeper_core::error::SweeperError;
use sweeper_core::filter::HistoricProcessFilter;
use sweeper_core::models::{
    BatchStatus, ComputeIdsResult, DeleteInstancesResult, NewBatch, NewBatchPart, PartStatus,
    PartType,
};
use sweeper_core::pipeline::DeleteBatchRequest;
use sweeper_core::scheduler::{JobScheduler, NewJob};
use sweeper_core::store::BatchStore;
use std::time::Duration;

#[tokio::test]
async fn partitioning_creates_one_compute_part_per_window() {
    let fixture = test_pipeline();
    seed_records(&fixture.records, 250);

    let batch_id = fixture
        .pipeline
        .submit_delete_batch(
            DeleteBatchRequest::new(HistoricProcessFilter::new()).with_batch_size(100),
        )
        .await
        .unwrap();

    // 250 records at page size 100 partition into exactly three windows
    let parts = fixture
        .pipeline
        .parts_for_batch(batch_id, PartType::ComputeIds)
        .await
        .unwrap();
    assert_eq!(parts.len(), 3);
    let indices: Vec<u64> = parts.iter().map(|p| p.partition_index().unwrap()).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(parts.iter().all(|p| p.status == PartStatus::Waiting));

    fixture.drain().await.unwrap();

    // Each compute part read the window (index * 100, 100)
    let windows = fixture.queries.requested_windows();
    assert!(windows.contains(&(0, 100)));
    assert!(windows.contains(&(100, 100)));
    assert!(windows.contains(&(200, 100)));
}

#[tokio::test]
async fn parallel_happy_path_deletes_everything_and_completes() {
    let fixture = test_pipeline();
    seed_records(&fixture.records, 250);

    let batch_id = fixture
        .pipeline
        .submit_delete_batch(
            DeleteBatchRequest::new(HistoricProcessFilter::new())
                .with_batch_size(100)
                .with_label("nightly cleanup"),
        )
        .await
        .unwrap();

    fixture.drain().await.unwrap();

    let batch = fixture.pipeline.find_batch(batch_id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.search_key.as_deref(), Some("nightly cleanup"));
    assert_eq!(batch.document_json["numberOfInstances"], 250);

    assert!(fixture.records.is_empty());

    let compute_parts = fixture
        .pipeline
        .parts_for_batch(batch_id, PartType::ComputeIds)
        .await
        .unwrap();
    assert!(compute_parts.iter().all(|p| p.status == PartStatus::Completed));

    // Every compute part is paired with a completed delete part carrying
    // the correlation pointer back to it
    let delete_parts = fixture
        .pipeline
        .parts_for_batch(batch_id, PartType::DeleteInstances)
        .await
        .unwrap();
    assert_eq!(delete_parts.len(), 3);
    for delete_part in &delete_parts {
        assert_eq!(delete_part.status, PartStatus::Completed);
        let compute_id = delete_part.compute_part_id().unwrap();
        let compute_part = compute_parts.iter().find(|p| p.id == compute_id).unwrap();
        assert_eq!(
            compute_part.search_key, delete_part.search_key2,
            "delete part echoes its producer's partition index"
        );

        let compute_result =
            ComputeIdsResult::from_document(compute_part.result_document_json.as_ref().unwrap())
                .unwrap();
        let delete_result =
            DeleteInstancesResult::from_document(delete_part.result_document_json.as_ref().unwrap())
                .unwrap();
        assert_eq!(
            delete_result.deleted_process_ids,
            compute_result.historic_process_ids
        );
        assert!(delete_result.succeeded());
    }

    // All timers cancelled, nothing left queued
    assert_eq!(fixture.scheduler.pending_jobs(), 0);
}

#[tokio::test]
async fn zero_matching_records_completes_immediately_without_parts() {
    let fixture = test_pipeline();

    let batch_id = fixture
        .pipeline
        .submit_delete_batch(
            DeleteBatchRequest::new(HistoricProcessFilter::new()).with_batch_size(100),
        )
        .await
        .unwrap();

    let batch = fixture.pipeline.find_batch(batch_id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(fixture.batches.part_count(), 0);
    assert_eq!(fixture.scheduler.pending_jobs(), 0);
}

#[tokio::test]
async fn zero_batch_size_is_rejected_at_submission() {
    let fixture = test_pipeline();
    let err = fixture
        .pipeline
        .submit_delete_batch(
            DeleteBatchRequest::new(HistoricProcessFilter::new()).with_batch_size(0),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SweeperError::Configuration { .. }));
}

#[tokio::test]
async fn compute_barrier_failure_fails_batch_without_releasing_deletes() {
    let fixture = test_pipeline();

    // Build the barrier state by hand: three compute parts, one failed
    let batch = fixture
        .batches
        .create_batch(NewBatch {
            batch_type: "historic-process-delete".to_string(),
            search_key: None,
            search_key2: None,
            tenant_id: None,
            document_json: json!({"numberOfInstances": 250, "batchSize": 100, "query": {}}),
        })
        .await
        .unwrap();
    for index in 0..3u64 {
        let part = fixture
            .batches
            .create_part(NewBatchPart::compute(batch.id, index))
            .await
            .unwrap();
        let status = if index == 2 {
            PartStatus::Failed
        } else {
            PartStatus::Completed
        };
        fixture
            .batches
            .complete_part(part.id, status, json!({"historicProcessIds": []}))
            .await
            .unwrap();
    }

    fixture
        .scheduler
        .submit_repeating(
            NewJob::new(handler_types::COMPUTE_STATUS, batch.id.to_string()),
            Duration::from_millis(10),
        )
        .await
        .unwrap();
    fixture.drain().await.unwrap();

    let batch = fixture.pipeline.find_batch(batch.id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Failed);
    assert!(!fixture
        .scheduler
        .has_pending_of_type(handler_types::DELETE_PROCESS_IDS));
    assert!(!fixture
        .scheduler
        .has_pending_of_type(handler_types::DELETE_STATUS));
}

#[tokio::test]
async fn monitor_completes_batch_with_no_parts_and_cancels_itself() {
    let fixture = test_pipeline();

    let batch = fixture
        .batches
        .create_batch(NewBatch {
            batch_type: "historic-process-delete".to_string(),
            search_key: None,
            search_key2: None,
            tenant_id: None,
            document_json: json!({"numberOfInstances": 0, "batchSize": 100, "query": {}}),
        })
        .await
        .unwrap();

    fixture
        .scheduler
        .submit_repeating(
            NewJob::new(handler_types::COMPUTE_STATUS, batch.id.to_string()),
            Duration::from_millis(10),
        )
        .await
        .unwrap();

    // One tick finalizes the degenerate batch; the second is skipped as
    // cancelled, leaving the queue empty
    fixture.drain().await.unwrap();

    let batch = fixture.pipeline.find_batch(batch.id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(fixture.scheduler.pending_jobs(), 0);
}

#[tokio::test]
async fn per_item_deletion_failure_fails_part_and_batch_but_keeps_siblings() {
    let fixture = test_pipeline();
    seed_records(&fixture.records, 250);
    fixture.records.fail_deletion_of("proc-0042");

    let batch_id = fixture
        .pipeline
        .submit_delete_batch(
            DeleteBatchRequest::new(HistoricProcessFilter::new()).with_batch_size(100),
        )
        .await
        .unwrap();
    fixture.drain().await.unwrap();

    let batch = fixture.pipeline.find_batch(batch_id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Failed);

    let delete_parts = fixture
        .pipeline
        .parts_for_batch(batch_id, PartType::DeleteInstances)
        .await
        .unwrap();
    let failed: Vec<_> = delete_parts
        .iter()
        .filter(|p| p.status == PartStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);

    let result =
        DeleteInstancesResult::from_document(failed[0].result_document_json.as_ref().unwrap())
            .unwrap();
    assert_eq!(result.failed_deletions.len(), 1);
    assert_eq!(result.failed_deletions[0].id, "proc-0042");
    // The other 99 records of the failing chunk stayed deleted
    assert_eq!(result.deleted_process_ids.len(), 99);

    // Best-effort semantics: only the rejected record survives
    assert_eq!(fixture.records.remaining_ids(), vec!["proc-0042"]);
}

#[tokio::test]
async fn configuration_error_fails_part_and_batch_immediately() {
    let fixture = test_pipeline();

    // Snapshot without a query: fatal for the whole batch
    let batch = fixture
        .batches
        .create_batch(NewBatch {
            batch_type: "historic-process-delete".to_string(),
            search_key: None,
            search_key2: None,
            tenant_id: None,
            document_json: json!({"numberOfInstances": 100, "batchSize": 100}),
        })
        .await
        .unwrap();
    let part = fixture
        .batches
        .create_part(NewBatchPart::compute(batch.id, 0))
        .await
        .unwrap();
    fixture
        .scheduler
        .submit(NewJob::new(
            handler_types::COMPUTE_PROCESS_IDS,
            part.id.to_string(),
        ))
        .await
        .unwrap();

    fixture.drain().await.unwrap();

    let part = fixture.batches.find_part(part.id).await.unwrap().unwrap();
    assert_eq!(part.status, PartStatus::Failed);
    let result_document = part.result_document_json.unwrap();
    assert!(result_document["error"]
        .as_str()
        .unwrap()
        .contains("missing the query"));

    let batch = fixture.pipeline.find_batch(batch.id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Failed);
}

#[tokio::test]
async fn query_error_leaves_part_unmarked_for_scheduler_retry() {
    let fixture = test_pipeline();
    seed_records(&fixture.records, 100);

    let batch_id = fixture
        .pipeline
        .submit_delete_batch(
            DeleteBatchRequest::new(HistoricProcessFilter::new()).with_batch_size(100),
        )
        .await
        .unwrap();

    // Every page query now fails; the compute job is dropped unmarked and
    // the monitor keeps ticking until the drain cap cuts it off
    fixture.records.set_query_failure(Some("storage offline".to_string()));
    let err = fixture.drain_capped(20).await.unwrap_err();
    assert!(matches!(err, SweeperError::Scheduler { .. }));

    let batch = fixture.pipeline.find_batch(batch_id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::InProgress);
    let parts = fixture
        .pipeline
        .parts_for_batch(batch_id, PartType::ComputeIds)
        .await
        .unwrap();
    assert!(parts.iter().all(|p| p.status == PartStatus::Waiting));
}

#[tokio::test]
async fn compute_stage_is_deterministic_for_unchanged_dataset() {
    // Two identical datasets; the same partition resolves byte-identical
    // id lists in both
    let mut id_lists = Vec::new();
    for _ in 0..2 {
        let fixture = test_pipeline();
        seed_records(&fixture.records, 250);

        let batch = fixture
            .batches
            .create_batch(NewBatch {
                batch_type: "historic-process-delete".to_string(),
                search_key: None,
                search_key2: None,
                tenant_id: None,
                document_json: json!({
                    "numberOfInstances": 250,
                    "batchSize": 100,
                    "query": {}
                }),
            })
            .await
            .unwrap();
        let part = fixture
            .batches
            .create_part(NewBatchPart::compute(batch.id, 1))
            .await
            .unwrap();
        fixture
            .scheduler
            .submit(NewJob::new(
                handler_types::COMPUTE_PROCESS_IDS,
                part.id.to_string(),
            ))
            .await
            .unwrap();
        fixture.drain().await.unwrap();

        let part = fixture.batches.find_part(part.id).await.unwrap().unwrap();
        assert_eq!(part.status, PartStatus::Completed);
        let result =
            ComputeIdsResult::from_document(part.result_document_json.as_ref().unwrap()).unwrap();
        id_lists.push(result.historic_process_ids);
    }

    assert_eq!(id_lists[0], id_lists[1]);
    assert_eq!(id_lists[0].len(), 100);
    assert_eq!(id_lists[0][0], finished_record(100).id);
}
