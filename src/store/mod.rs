//! # Batch Store
//!
//! Durable repository seam for batches and batch parts. Every pipeline
//! stage receives the store as an injected trait object; there is no
//! process-wide singleton bookkeeping.
//!
//! Status writes are write-once: completing an already-terminal batch or
//! part is an orchestration invariant violation, enforced by every
//! implementation.

pub mod memory;
pub mod postgres;

use crate::error::Result;
use crate::models::{Batch, BatchPart, BatchStatus, NewBatch, NewBatchPart, PartStatus, PartType};
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

pub use memory::InMemoryBatchStore;
pub use postgres::PostgresBatchStore;

/// Persistence operations the pipeline needs from its batch repository
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Persist a new batch with status `IN_PROGRESS`
    async fn create_batch(&self, new_batch: NewBatch) -> Result<Batch>;

    async fn find_batch(&self, batch_id: Uuid) -> Result<Option<Batch>>;

    /// Write a batch's terminal status. Fails if the batch is already
    /// terminal or unknown.
    async fn complete_batch(&self, batch_id: Uuid, status: BatchStatus) -> Result<()>;

    /// Persist a new part with status `WAITING` and no result document
    async fn create_part(&self, new_part: NewBatchPart) -> Result<BatchPart>;

    async fn find_part(&self, part_id: Uuid) -> Result<Option<BatchPart>>;

    /// Write a part's terminal status together with its result document.
    /// Fails if the part is already terminal or unknown.
    async fn complete_part(
        &self,
        part_id: Uuid,
        status: PartStatus,
        result_document: Value,
    ) -> Result<()>;

    /// All parts of one stage type for a batch, in creation order
    async fn parts_by_batch_and_type(
        &self,
        batch_id: Uuid,
        part_type: PartType,
    ) -> Result<Vec<BatchPart>>;

    /// Parts of one stage type in one status for a batch, in creation order
    async fn parts_by_batch_type_and_status(
        &self,
        batch_id: Uuid,
        part_type: PartType,
        status: PartStatus,
    ) -> Result<Vec<BatchPart>>;
}
