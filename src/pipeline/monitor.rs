//! # Batch Status Monitor
//!
//! The parallel topology's polling barrier, running as a repeating timer
//! job in two phases. The COMPUTE phase watches compute parts and, once
//! all are terminal, either fails the batch or releases the delete stage
//! and hands over to the DELETE phase. The DELETE phase watches delete
//! parts and writes the batch's terminal status.
//!
//! Polling is deliberate: it bounds staleness to the tick interval and
//! needs no synchronization primitive shared across independently-leased
//! worker-pool jobs. A monitor cancels its own timer once its phase has
//! nothing left to observe.

use crate::config::SweeperConfig;
use crate::constants::handler_types;
use crate::error::Result;
use crate::models::{Batch, BatchStatus, PartStatus, PartType};
use crate::pipeline::handler::JobHandler;
use crate::pipeline::{finalize_batch_if_active, parse_batch_id, require_batch};
use crate::scheduler::{JobContext, JobScheduler, NewJob};
use crate::store::BatchStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Which stage's parts this monitor instance observes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorPhase {
    Compute,
    Delete,
}

/// Handler for [`handler_types::COMPUTE_STATUS`] and
/// [`handler_types::DELETE_STATUS`]; one registered instance per phase
pub struct BatchStatusMonitorHandler {
    phase: MonitorPhase,
    store: Arc<dyn BatchStore>,
    scheduler: Arc<dyn JobScheduler>,
    config: SweeperConfig,
}

impl BatchStatusMonitorHandler {
    /// Monitor instance watching the compute stage
    pub fn compute_phase(
        store: Arc<dyn BatchStore>,
        scheduler: Arc<dyn JobScheduler>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            phase: MonitorPhase::Compute,
            store,
            scheduler,
            config,
        }
    }

    /// Monitor instance watching the delete stage
    pub fn delete_phase(
        store: Arc<dyn BatchStore>,
        scheduler: Arc<dyn JobScheduler>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            phase: MonitorPhase::Delete,
            store,
            scheduler,
            config,
        }
    }

    fn watched_type(&self) -> PartType {
        match self.phase {
            MonitorPhase::Compute => PartType::ComputeIds,
            MonitorPhase::Delete => PartType::DeleteInstances,
        }
    }

    /// Compute barrier crossed cleanly: schedule every already-created
    /// delete part and hand over to the DELETE-phase monitor
    async fn release_delete_stage(&self, batch: &Batch) -> Result<()> {
        let waiting = self
            .store
            .parts_by_batch_type_and_status(batch.id, PartType::DeleteInstances, PartStatus::Waiting)
            .await?;
        for part in &waiting {
            self.scheduler
                .submit(NewJob::new(
                    handler_types::DELETE_PROCESS_IDS,
                    part.id.to_string(),
                ))
                .await?;
        }
        self.scheduler
            .submit_repeating(
                NewJob::new(handler_types::DELETE_STATUS, batch.id.to_string()),
                self.config.monitor_interval(),
            )
            .await?;
        info!(
            batch_id = %batch.id,
            released = waiting.len(),
            "compute barrier crossed; delete stage released"
        );
        Ok(())
    }
}

#[async_trait]
impl JobHandler for BatchStatusMonitorHandler {
    fn handler_type(&self) -> &'static str {
        match self.phase {
            MonitorPhase::Compute => handler_types::COMPUTE_STATUS,
            MonitorPhase::Delete => handler_types::DELETE_STATUS,
        }
    }

    async fn execute(&self, configuration: &str, context: &JobContext) -> Result<()> {
        let batch_id = parse_batch_id(configuration)?;
        let batch = require_batch(self.store.as_ref(), batch_id).await?;

        if batch.status.is_terminal() {
            // Nothing left to promote; stop ticking
            self.scheduler.cancel_repeating(context.job_id).await?;
            return Ok(());
        }

        let parts = self
            .store
            .parts_by_batch_and_type(batch_id, self.watched_type())
            .await?;
        let total = parts.len();
        let done = parts.iter().filter(|p| p.status.is_terminal()).count();

        if total == 0 {
            // Degenerate case: the stage has no work at all
            finalize_batch_if_active(self.store.as_ref(), batch_id, BatchStatus::Completed).await?;
            self.scheduler.cancel_repeating(context.job_id).await?;
            return Ok(());
        }

        if done < total {
            debug!(
                %batch_id,
                phase = ?self.phase,
                done,
                total,
                "stage still in progress; waiting for next tick"
            );
            return Ok(());
        }

        let any_failed = parts.iter().any(|p| p.status == PartStatus::Failed);
        match self.phase {
            MonitorPhase::Compute => {
                if any_failed {
                    finalize_batch_if_active(self.store.as_ref(), batch_id, BatchStatus::Failed)
                        .await?;
                } else {
                    self.release_delete_stage(&batch).await?;
                }
            }
            MonitorPhase::Delete => {
                let status = if any_failed {
                    BatchStatus::Failed
                } else {
                    BatchStatus::Completed
                };
                finalize_batch_if_active(self.store.as_ref(), batch_id, status).await?;
                info!(%batch_id, status = status.as_str(), "batch finalized");
            }
        }

        self.scheduler.cancel_repeating(context.job_id).await?;
        Ok(())
    }
}
