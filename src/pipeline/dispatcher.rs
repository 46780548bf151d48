//! # Batch Dispatcher
//!
//! Entry point of the pipeline: counts the matching records, snapshots the
//! batch configuration, partitions the work, and seeds whichever topology
//! the caller asked for. The submitting call returns the batch id; all
//! further progress is asynchronous.

use crate::config::SweeperConfig;
use crate::constants::{batch_types, handler_types};
use crate::error::{Result, SweeperError};
use crate::filter::HistoricProcessFilter;
use crate::models::{BatchConfiguration, BatchStatus, NewBatch, NewBatchPart};
use crate::process::HistoricProcessQueries;
use crate::scheduler::{JobScheduler, NewJob};
use crate::store::BatchStore;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// A bulk-deletion request over historic process records
#[derive(Debug, Clone)]
pub struct DeleteBatchRequest {
    pub filter: HistoricProcessFilter,
    /// Page size; `None` takes the configured default
    pub batch_size: Option<u64>,
    /// Strictly-ordered chunk-by-chunk execution instead of fan-out
    pub sequential: bool,
    /// Caller-supplied label, stored as the batch's search key
    pub label: Option<String>,
    /// Acting-user id of the submitter
    pub acting_user_id: Option<String>,
    pub tenant_id: Option<String>,
}

impl DeleteBatchRequest {
    pub fn new(filter: HistoricProcessFilter) -> Self {
        Self {
            filter,
            batch_size: None,
            sequential: false,
            label: None,
            acting_user_id: None,
            tenant_id: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn sequential(mut self) -> Self {
        self.sequential = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Partitions a request and seeds the chosen topology
pub struct BatchDispatcher {
    store: Arc<dyn BatchStore>,
    queries: Arc<dyn HistoricProcessQueries>,
    scheduler: Arc<dyn JobScheduler>,
    config: SweeperConfig,
}

impl BatchDispatcher {
    pub fn new(
        store: Arc<dyn BatchStore>,
        queries: Arc<dyn HistoricProcessQueries>,
        scheduler: Arc<dyn JobScheduler>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            store,
            queries,
            scheduler,
            config,
        }
    }

    /// Submit a deletion batch. Returns once the batch and its first parts
    /// are persisted and the initial jobs are queued.
    pub async fn submit_delete_batch(&self, request: DeleteBatchRequest) -> Result<Uuid> {
        let batch_size = request.batch_size.unwrap_or(self.config.default_batch_size);
        if batch_size == 0 {
            return Err(SweeperError::configuration(
                "batch size must be greater than zero",
            ));
        }

        let total_records = self.queries.count_matching(&request.filter).await?;

        let configuration =
            BatchConfiguration::new(total_records, batch_size, request.sequential, &request.filter);
        let batch = self
            .store
            .create_batch(NewBatch {
                batch_type: batch_types::HISTORIC_PROCESS_DELETE.to_string(),
                search_key: request.label,
                search_key2: request.acting_user_id,
                tenant_id: request.tenant_id,
                document_json: configuration.to_document()?,
            })
            .await?;

        if total_records == 0 {
            self.store
                .complete_batch(batch.id, BatchStatus::Completed)
                .await?;
            info!(batch_id = %batch.id, "no matching records; batch completed immediately");
            return Ok(batch.id);
        }

        if request.sequential {
            self.seed_sequential(batch.id).await?;
        } else {
            self.seed_parallel(batch.id, total_records, batch_size).await?;
        }

        info!(
            batch_id = %batch.id,
            total_records,
            batch_size,
            sequential = request.sequential,
            "delete batch submitted"
        );
        Ok(batch.id)
    }

    /// Fan-out topology: one compute part and job per partition window,
    /// plus the repeating COMPUTE-phase monitor
    async fn seed_parallel(&self, batch_id: Uuid, total_records: u64, batch_size: u64) -> Result<()> {
        let partition_count = total_records.div_ceil(batch_size);
        debug!(%batch_id, partition_count, "seeding parallel topology");

        for index in 0..partition_count {
            let part = self
                .store
                .create_part(NewBatchPart::compute(batch_id, index))
                .await?;
            self.scheduler
                .submit(NewJob::new(
                    handler_types::COMPUTE_PROCESS_IDS,
                    part.id.to_string(),
                ))
                .await?;
        }

        self.scheduler
            .submit_repeating(
                NewJob::new(handler_types::COMPUTE_STATUS, batch_id.to_string()),
                self.config.monitor_interval(),
            )
            .await?;
        Ok(())
    }

    /// Sequential topology: a single chain link; the chain self-observes,
    /// so no monitor is scheduled
    async fn seed_sequential(&self, batch_id: Uuid) -> Result<()> {
        debug!(%batch_id, "seeding sequential topology");
        let part = self
            .store
            .create_part(NewBatchPart::sequential_chunk(batch_id, 0))
            .await?;
        self.scheduler
            .submit(NewJob::new(
                handler_types::DELETE_SEQUENTIAL,
                part.id.to_string(),
            ))
            .await?;
        Ok(())
    }
}
