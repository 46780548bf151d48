//! # Compute Stage
//!
//! Parallel-mode stage resolving one partition's page of matching record
//! ids. Completing the part also creates the paired delete part, which
//! stays `WAITING` until the COMPUTE-phase monitor releases the delete
//! stage behind the barrier.

use crate::constants::handler_types;
use crate::error::{Result, SweeperError};
use crate::models::{
    error_document, BatchConfiguration, BatchStatus, ComputeIdsResult, NewBatchPart, PartStatus,
};
use crate::pipeline::handler::JobHandler;
use crate::pipeline::{finalize_batch_if_active, require_batch, require_part};
use crate::process::HistoricProcessQueries;
use crate::scheduler::JobContext;
use crate::store::BatchStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Handler for [`handler_types::COMPUTE_PROCESS_IDS`]
pub struct ComputeIdsHandler {
    store: Arc<dyn BatchStore>,
    queries: Arc<dyn HistoricProcessQueries>,
}

impl ComputeIdsHandler {
    pub fn new(store: Arc<dyn BatchStore>, queries: Arc<dyn HistoricProcessQueries>) -> Self {
        Self { store, queries }
    }

    /// Terminal configuration failure: the part is failed with the error
    /// recorded, and the whole batch is failed as well, since no useful
    /// partial work exists without a valid configuration.
    async fn fail_for_configuration(
        &self,
        part_id: uuid::Uuid,
        batch_id: uuid::Uuid,
        error: &SweeperError,
    ) -> Result<()> {
        error!(%part_id, %batch_id, %error, "compute stage configuration error");
        self.store
            .complete_part(part_id, PartStatus::Failed, error_document(&error.to_string()))
            .await?;
        finalize_batch_if_active(self.store.as_ref(), batch_id, BatchStatus::Failed).await
    }
}

#[async_trait]
impl JobHandler for ComputeIdsHandler {
    fn handler_type(&self) -> &'static str {
        handler_types::COMPUTE_PROCESS_IDS
    }

    async fn execute(&self, configuration: &str, _context: &JobContext) -> Result<()> {
        let part = require_part(self.store.as_ref(), configuration).await?;
        if part.status.is_terminal() {
            // Re-delivery after a completed commit; nothing left to do
            debug!(part_id = %part.id, "compute part already terminal; skipping");
            return Ok(());
        }

        let batch = require_batch(self.store.as_ref(), part.batch_id).await?;

        let batch_configuration = match BatchConfiguration::from_document(&batch.document_json) {
            Ok(configuration) => configuration,
            Err(error) => return self.fail_for_configuration(part.id, batch.id, &error).await,
        };
        let filter = match batch_configuration.decode_filter() {
            Ok(filter) => filter,
            Err(error) => return self.fail_for_configuration(part.id, batch.id, &error).await,
        };

        let index = part.partition_index()?;
        let first_result = index * batch_configuration.batch_size;

        // Query failures propagate without marking the part: the job stays
        // eligible for the scheduler's retry policy
        let process_ids = self
            .queries
            .page_of_ids(&filter, first_result, batch_configuration.batch_size)
            .await?;

        let delete_part = self
            .store
            .create_part(NewBatchPart::delete_for_compute_part(batch.id, part.id, index))
            .await?;

        let result = ComputeIdsResult {
            historic_process_ids: process_ids,
            delete_batch_part: Some(delete_part.id),
            sequential: false,
        };
        self.store
            .complete_part(part.id, PartStatus::Completed, result.to_document()?)
            .await?;

        info!(
            part_id = %part.id,
            batch_id = %batch.id,
            partition = index,
            first_result,
            resolved = result.historic_process_ids.len(),
            "compute part completed"
        );
        Ok(())
    }
}
