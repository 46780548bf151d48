//! Integration tests for the strict sequential chaining topology

mod common;

use common::{seed_records, test_pipeline};
use serde_json::json;
use sweeper_core::constants::handler_types;
use sweeper_core::filter::HistoricProcessFilter;
use sweeper_core::models::{
    BatchStatus, DeleteInstancesResult, NewBatch, NewBatchPart, PartStatus, PartType,
};
use sweeper_core::pipeline::DeleteBatchRequest;
use sweeper_core::scheduler::{JobScheduler, NewJob};
use sweeper_core::store::BatchStore;

#[tokio::test]
async fn sequential_chain_always_queries_the_fixed_window() {
    let fixture = test_pipeline();
    seed_records(&fixture.records, 250);

    let batch_id = fixture
        .pipeline
        .submit_delete_batch(
            DeleteBatchRequest::new(HistoricProcessFilter::new())
                .with_batch_size(100)
                .sequential(),
        )
        .await
        .unwrap();

    // Exactly one seed part, no monitor: the chain self-observes
    assert_eq!(fixture.scheduler.pending_jobs(), 1);
    assert!(!fixture
        .scheduler
        .has_pending_of_type(handler_types::COMPUTE_STATUS));

    fixture.drain().await.unwrap();

    // Deletions shrink the live set, so every invocation reads (0, 100)
    let windows = fixture.queries.requested_windows();
    assert_eq!(windows, vec![(0, 100); 4]);

    let batch = fixture.pipeline.find_batch(batch_id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert!(fixture.records.is_empty());

    // Three deleting links plus the empty-page terminator, indices 0..=3
    let parts = fixture
        .pipeline
        .parts_for_batch(batch_id, PartType::DeleteInstances)
        .await
        .unwrap();
    assert_eq!(parts.len(), 4);
    let indices: Vec<u64> = parts.iter().map(|p| p.partition_index().unwrap()).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert!(parts.iter().all(|p| p.status == PartStatus::Completed));

    let deleted_counts: Vec<usize> = parts
        .iter()
        .map(|p| {
            DeleteInstancesResult::from_document(p.result_document_json.as_ref().unwrap())
                .unwrap()
                .deleted_process_ids
                .len()
        })
        .collect();
    assert_eq!(deleted_counts, vec![100, 100, 50, 0]);
}

#[tokio::test]
async fn sequential_bulk_failure_is_terminal_for_part_and_batch() {
    let fixture = test_pipeline();
    seed_records(&fixture.records, 250);
    // Poison a record of the second chunk
    fixture.records.fail_deletion_of("proc-0150");

    let batch_id = fixture
        .pipeline
        .submit_delete_batch(
            DeleteBatchRequest::new(HistoricProcessFilter::new())
                .with_batch_size(100)
                .sequential(),
        )
        .await
        .unwrap();
    fixture.drain().await.unwrap();

    let batch = fixture.pipeline.find_batch(batch_id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Failed);

    // The chain stopped: chunk 0 deleted, chunk 1 failed whole, no chunk 2
    let parts = fixture
        .pipeline
        .parts_for_batch(batch_id, PartType::DeleteInstances)
        .await
        .unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].status, PartStatus::Completed);
    assert_eq!(parts[1].status, PartStatus::Failed);

    let failed_result =
        DeleteInstancesResult::from_document(parts[1].result_document_json.as_ref().unwrap())
            .unwrap();
    // Bulk semantics: the whole page is recorded as failed
    assert_eq!(failed_result.deleted_process_ids.len(), 0);
    assert_eq!(failed_result.failed_deletions.len(), 100);
    assert!(failed_result.error.is_some());

    // Chunk 0 is gone, chunks 1 and 2 survive
    assert_eq!(fixture.records.len(), 150);
    assert_eq!(fixture.scheduler.pending_jobs(), 0);
}

#[tokio::test]
async fn sequential_configuration_error_fails_fast() {
    let fixture = test_pipeline();

    let batch = fixture
        .batches
        .create_batch(NewBatch {
            batch_type: "historic-process-delete".to_string(),
            search_key: None,
            search_key2: None,
            tenant_id: None,
            // batchSize of zero is unusable
            document_json: json!({"numberOfInstances": 10, "batchSize": 0, "query": {}}),
        })
        .await
        .unwrap();
    let part = fixture
        .batches
        .create_part(NewBatchPart::sequential_chunk(batch.id, 0))
        .await
        .unwrap();
    fixture
        .scheduler
        .submit(NewJob::new(
            handler_types::DELETE_SEQUENTIAL,
            part.id.to_string(),
        ))
        .await
        .unwrap();

    fixture.drain().await.unwrap();

    let part = fixture.batches.find_part(part.id).await.unwrap().unwrap();
    assert_eq!(part.status, PartStatus::Failed);
    assert!(part.result_document_json.unwrap()["error"]
        .as_str()
        .unwrap()
        .contains("batch size"));

    let batch = fixture.pipeline.find_batch(batch.id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Failed);
}

#[tokio::test]
async fn sequential_chain_stops_when_batch_is_already_terminal() {
    let fixture = test_pipeline();
    seed_records(&fixture.records, 50);

    let batch = fixture
        .batches
        .create_batch(NewBatch {
            batch_type: "historic-process-delete".to_string(),
            search_key: None,
            search_key2: None,
            tenant_id: None,
            document_json: json!({"numberOfInstances": 50, "batchSize": 100, "query": {}}),
        })
        .await
        .unwrap();
    let part = fixture
        .batches
        .create_part(NewBatchPart::sequential_chunk(batch.id, 0))
        .await
        .unwrap();
    // The batch reached a terminal state before the chain link ran
    fixture
        .batches
        .complete_batch(batch.id, BatchStatus::Failed)
        .await
        .unwrap();

    fixture
        .scheduler
        .submit(NewJob::new(
            handler_types::DELETE_SEQUENTIAL,
            part.id.to_string(),
        ))
        .await
        .unwrap();
    fixture.drain().await.unwrap();

    // Nothing ran: no deletion, no new link, part untouched
    assert_eq!(fixture.records.len(), 50);
    let part = fixture.batches.find_part(part.id).await.unwrap().unwrap();
    assert_eq!(part.status, PartStatus::Waiting);
    assert_eq!(fixture.batches.part_count(), 1);
}
