//! # Sequential Fused Stage
//!
//! Strictly-ordered topology: compute and delete fused into one step per
//! chunk, at most one chunk in flight. Every invocation queries the window
//! (0, batchSize); a moving offset would skip or duplicate records while
//! deletions shrink the live result set underneath the query.
//!
//! The continuation link is created and scheduled only after the current
//! part's completion is committed: a crash before that point re-executes
//! the same chunk, and the bounded query against the unchanged dataset
//! reproduces the same page.

use crate::constants::handler_types;
use crate::error::{Result, SweeperError};
use crate::models::{
    error_document, BatchConfiguration, BatchStatus, DeleteInstancesResult, FailedDeletion,
    NewBatchPart, PartStatus,
};
use crate::pipeline::handler::JobHandler;
use crate::pipeline::{finalize_batch_if_active, require_batch, require_part};
use crate::process::{HistoricProcessDeleter, HistoricProcessQueries};
use crate::scheduler::{JobContext, JobScheduler, NewJob};
use crate::store::BatchStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Handler for [`handler_types::DELETE_SEQUENTIAL`]
pub struct SequentialDeleteHandler {
    store: Arc<dyn BatchStore>,
    queries: Arc<dyn HistoricProcessQueries>,
    deleter: Arc<dyn HistoricProcessDeleter>,
    scheduler: Arc<dyn JobScheduler>,
}

impl SequentialDeleteHandler {
    pub fn new(
        store: Arc<dyn BatchStore>,
        queries: Arc<dyn HistoricProcessQueries>,
        deleter: Arc<dyn HistoricProcessDeleter>,
        scheduler: Arc<dyn JobScheduler>,
    ) -> Self {
        Self {
            store,
            queries,
            deleter,
            scheduler,
        }
    }

    /// Sequential mode is always fail-fast: a configuration error is
    /// terminal for the part and the batch alike
    async fn fail_for_configuration(
        &self,
        part_id: uuid::Uuid,
        batch_id: uuid::Uuid,
        error: &SweeperError,
    ) -> Result<()> {
        error!(%part_id, %batch_id, %error, "sequential stage configuration error");
        self.store
            .complete_part(part_id, PartStatus::Failed, error_document(&error.to_string()))
            .await?;
        finalize_batch_if_active(self.store.as_ref(), batch_id, BatchStatus::Failed).await
    }
}

#[async_trait]
impl JobHandler for SequentialDeleteHandler {
    fn handler_type(&self) -> &'static str {
        handler_types::DELETE_SEQUENTIAL
    }

    async fn execute(&self, configuration: &str, _context: &JobContext) -> Result<()> {
        let part = require_part(self.store.as_ref(), configuration).await?;
        if part.status.is_terminal() {
            debug!(part_id = %part.id, "sequential part already terminal; skipping");
            return Ok(());
        }

        let batch = require_batch(self.store.as_ref(), part.batch_id).await?;
        if batch.status.is_terminal() {
            debug!(batch_id = %batch.id, "batch already terminal; chain stops");
            return Ok(());
        }

        let batch_configuration = match BatchConfiguration::from_document(&batch.document_json) {
            Ok(configuration) => configuration,
            Err(config_error) => {
                return self
                    .fail_for_configuration(part.id, batch.id, &config_error)
                    .await
            }
        };
        let filter = match batch_configuration.decode_filter() {
            Ok(filter) => filter,
            Err(config_error) => {
                return self
                    .fail_for_configuration(part.id, batch.id, &config_error)
                    .await
            }
        };

        // Fixed window: deletions shrink the live set, so the next chunk is
        // always at offset zero
        let page = self
            .queries
            .page_of_ids(&filter, 0, batch_configuration.batch_size)
            .await?;

        if page.is_empty() {
            // Normal termination of the chain
            let result = DeleteInstancesResult::default();
            self.store
                .complete_part(part.id, PartStatus::Completed, result.to_document()?)
                .await?;
            finalize_batch_if_active(self.store.as_ref(), batch.id, BatchStatus::Completed).await?;
            info!(batch_id = %batch.id, part_id = %part.id, "sequential chain finished");
            return Ok(());
        }

        let index = part.partition_index()?;

        match self.deleter.delete_all(&page).await {
            Ok(()) => {
                let result = DeleteInstancesResult {
                    deleted_process_ids: page,
                    ..DeleteInstancesResult::default()
                };
                self.store
                    .complete_part(part.id, PartStatus::Completed, result.to_document()?)
                    .await?;

                // Chain link: emitted last, after the completion commit
                let next = self
                    .store
                    .create_part(NewBatchPart::sequential_chunk(batch.id, index + 1))
                    .await?;
                self.scheduler
                    .submit(NewJob::new(
                        handler_types::DELETE_SEQUENTIAL,
                        next.id.to_string(),
                    ))
                    .await?;

                info!(
                    batch_id = %batch.id,
                    part_id = %part.id,
                    chunk = index,
                    deleted = result.deleted_process_ids.len(),
                    "sequential chunk deleted; next link scheduled"
                );
                Ok(())
            }
            Err(delete_error) => {
                // Bulk failure is terminal: the whole page is recorded as
                // failed and the chain ends here
                error!(
                    batch_id = %batch.id,
                    part_id = %part.id,
                    chunk = index,
                    %delete_error,
                    "sequential bulk deletion failed"
                );
                let failed = page
                    .iter()
                    .map(|id| FailedDeletion {
                        id: id.clone(),
                        error: delete_error.to_string(),
                        stacktrace: None,
                    })
                    .collect();
                let result = DeleteInstancesResult {
                    deleted_process_ids: Vec::new(),
                    failed_deletions: failed,
                    error: Some(delete_error.to_string()),
                    stacktrace: Some(format!("{delete_error:?}")),
                };
                self.store
                    .complete_part(part.id, PartStatus::Failed, result.to_document()?)
                    .await?;
                finalize_batch_if_active(self.store.as_ref(), batch.id, BatchStatus::Failed).await
            }
        }
    }
}
