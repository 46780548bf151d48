//! # Delete Stage
//!
//! Parallel-mode stage consuming one compute part's id set. Deletion is
//! itemized and best-effort: a failing record is recorded and iteration
//! continues; already-deleted siblings are never rolled back.

use crate::constants::handler_types;
use crate::error::{Result, SweeperError};
use crate::models::{ComputeIdsResult, DeleteInstancesResult, FailedDeletion, PartStatus};
use crate::pipeline::handler::JobHandler;
use crate::pipeline::{require_batch, require_part};
use crate::process::HistoricProcessDeleter;
use crate::scheduler::JobContext;
use crate::store::BatchStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Handler for [`handler_types::DELETE_PROCESS_IDS`]
pub struct DeleteInstancesHandler {
    store: Arc<dyn BatchStore>,
    deleter: Arc<dyn HistoricProcessDeleter>,
}

impl DeleteInstancesHandler {
    pub fn new(store: Arc<dyn BatchStore>, deleter: Arc<dyn HistoricProcessDeleter>) -> Self {
        Self { store, deleter }
    }
}

#[async_trait]
impl JobHandler for DeleteInstancesHandler {
    fn handler_type(&self) -> &'static str {
        handler_types::DELETE_PROCESS_IDS
    }

    async fn execute(&self, configuration: &str, _context: &JobContext) -> Result<()> {
        let part = require_part(self.store.as_ref(), configuration).await?;
        if part.status.is_terminal() {
            debug!(part_id = %part.id, "delete part already terminal; skipping");
            return Ok(());
        }
        // The batch must still exist; its status is not consulted here:
        // siblings of a failed batch run to completion
        require_batch(self.store.as_ref(), part.batch_id).await?;

        let compute_part_id = part.compute_part_id()?;
        let compute_part = self
            .store
            .find_part(compute_part_id)
            .await?
            .ok_or_else(|| {
                SweeperError::invariant(format!(
                    "compute part {compute_part_id} of delete part {} not found",
                    part.id
                ))
            })?;

        let compute_result = compute_part
            .result_document_json
            .as_ref()
            .map(ComputeIdsResult::from_document)
            .transpose()?
            .ok_or_else(|| {
                SweeperError::invariant(format!(
                    "compute part {compute_part_id} has no result document"
                ))
            })?;

        if compute_result.historic_process_ids.is_empty() {
            // The compute stage never pairs a delete part with an empty page
            return Err(SweeperError::invariant(format!(
                "compute part {compute_part_id} produced an empty id set"
            )));
        }

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for process_id in &compute_result.historic_process_ids {
            match self.deleter.delete_by_id(process_id).await {
                Ok(()) => deleted.push(process_id.clone()),
                Err(error) => {
                    warn!(part_id = %part.id, process_id, %error, "record deletion failed");
                    failed.push(FailedDeletion {
                        id: process_id.clone(),
                        error: error.to_string(),
                        stacktrace: Some(format!("{error:?}")),
                    });
                }
            }
        }

        let status = if failed.is_empty() {
            PartStatus::Completed
        } else {
            PartStatus::Failed
        };
        let result = DeleteInstancesResult {
            deleted_process_ids: deleted,
            failed_deletions: failed,
            error: None,
            stacktrace: None,
        };
        self.store
            .complete_part(part.id, status, result.to_document()?)
            .await?;

        info!(
            part_id = %part.id,
            batch_id = %part.batch_id,
            deleted = result.deleted_process_ids.len(),
            failed = result.failed_deletions.len(),
            "delete part finished"
        );
        Ok(())
    }
}
