//! # Batch Pipeline
//!
//! The five stage handlers, the dispatcher that seeds them, and the
//! [`BatchPipeline`] facade that wires handlers, registry, and
//! collaborators together for an embedding application.

pub mod compute;
pub mod delete;
pub mod dispatcher;
pub mod handler;
pub mod monitor;
pub mod sequential;

use crate::config::SweeperConfig;
use crate::error::{Result, SweeperError};
use crate::models::{Batch, BatchPart, BatchStatus, PartType};
use crate::process::{HistoricProcessDeleter, HistoricProcessQueries};
use crate::scheduler::JobScheduler;
use crate::store::BatchStore;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub use compute::ComputeIdsHandler;
pub use delete::DeleteInstancesHandler;
pub use dispatcher::{BatchDispatcher, DeleteBatchRequest};
pub use handler::{HandlerRegistry, JobHandler};
pub use monitor::BatchStatusMonitorHandler;
pub use sequential::SequentialDeleteHandler;

/// Interpret a job configuration string as a batch id
pub(crate) fn parse_batch_id(configuration: &str) -> Result<Uuid> {
    Uuid::parse_str(configuration).map_err(|_| {
        SweeperError::invariant(format!("job configuration '{configuration}' is not a batch id"))
    })
}

/// Load the part a job configuration points at, or abort the job
pub(crate) async fn require_part(store: &dyn BatchStore, configuration: &str) -> Result<BatchPart> {
    let part_id = Uuid::parse_str(configuration).map_err(|_| {
        SweeperError::invariant(format!(
            "job configuration '{configuration}' is not a batch part id"
        ))
    })?;
    store
        .find_part(part_id)
        .await?
        .ok_or_else(|| SweeperError::invariant(format!("batch part {part_id} not found")))
}

/// Load a batch, or abort the job
pub(crate) async fn require_batch(store: &dyn BatchStore, batch_id: Uuid) -> Result<Batch> {
    store
        .find_batch(batch_id)
        .await?
        .ok_or_else(|| SweeperError::invariant(format!("batch {batch_id} not found")))
}

/// Write a batch's terminal status unless another actor already did.
///
/// A batch can legitimately already be terminal here: a compute sibling's
/// configuration error fails the batch while other siblings keep running.
pub(crate) async fn finalize_batch_if_active(
    store: &dyn BatchStore,
    batch_id: Uuid,
    status: BatchStatus,
) -> Result<()> {
    let batch = require_batch(store, batch_id).await?;
    if batch.status.is_terminal() {
        debug!(%batch_id, current = batch.status.as_str(), "batch already terminal");
        return Ok(());
    }
    store.complete_batch(batch_id, status).await
}

/// Fully-wired pipeline: registry, dispatcher, and lookups in one place
pub struct BatchPipeline {
    store: Arc<dyn BatchStore>,
    dispatcher: BatchDispatcher,
    registry: Arc<HandlerRegistry>,
}

impl BatchPipeline {
    /// Wire all five handlers against the given collaborators
    pub fn new(
        store: Arc<dyn BatchStore>,
        queries: Arc<dyn HistoricProcessQueries>,
        deleter: Arc<dyn HistoricProcessDeleter>,
        scheduler: Arc<dyn JobScheduler>,
        config: SweeperConfig,
    ) -> Result<Self> {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(ComputeIdsHandler::new(
            store.clone(),
            queries.clone(),
        )))?;
        registry.register(Arc::new(DeleteInstancesHandler::new(
            store.clone(),
            deleter.clone(),
        )))?;
        registry.register(Arc::new(SequentialDeleteHandler::new(
            store.clone(),
            queries.clone(),
            deleter,
            scheduler.clone(),
        )))?;
        registry.register(Arc::new(BatchStatusMonitorHandler::compute_phase(
            store.clone(),
            scheduler.clone(),
            config.clone(),
        )))?;
        registry.register(Arc::new(BatchStatusMonitorHandler::delete_phase(
            store.clone(),
            scheduler.clone(),
            config.clone(),
        )))?;

        let dispatcher = BatchDispatcher::new(store.clone(), queries, scheduler, config);

        Ok(Self {
            store,
            dispatcher,
            registry: Arc::new(registry),
        })
    }

    /// Submit a deletion batch; see [`BatchDispatcher::submit_delete_batch`]
    pub async fn submit_delete_batch(&self, request: DeleteBatchRequest) -> Result<Uuid> {
        self.dispatcher.submit_delete_batch(request).await
    }

    /// The registry the owning scheduler routes jobs through
    pub fn registry(&self) -> Arc<HandlerRegistry> {
        self.registry.clone()
    }

    /// Poll a batch's current state, the pipeline's only control surface
    pub async fn find_batch(&self, batch_id: Uuid) -> Result<Option<Batch>> {
        self.store.find_batch(batch_id).await
    }

    /// Parts of one stage for a batch, in creation order
    pub async fn parts_for_batch(
        &self,
        batch_id: Uuid,
        part_type: PartType,
    ) -> Result<Vec<BatchPart>> {
        self.store.parts_by_batch_and_type(batch_id, part_type).await
    }
}
