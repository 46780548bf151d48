//! # In-Memory Batch Store
//!
//! Embedded [`BatchStore`] used by the integration tests and by
//! single-process deployments that do not need durability. Enforces the
//! same write-once status semantics as the Postgres store.

use crate::error::{Result, SweeperError};
use crate::models::{Batch, BatchPart, BatchStatus, NewBatch, NewBatchPart, PartStatus, PartType};
use crate::store::BatchStore;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Default)]
struct StoreState {
    batches: HashMap<Uuid, Batch>,
    parts: HashMap<Uuid, BatchPart>,
    /// Creation order of parts; HashMap iteration order is not stable and
    /// partition order matters to the monitor's observers
    part_order: Vec<Uuid>,
}

/// Thread-safe in-memory batch repository
#[derive(Clone, Default)]
pub struct InMemoryBatchStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of parts across all batches
    pub fn part_count(&self) -> usize {
        self.state.lock().parts.len()
    }
}

#[async_trait]
impl BatchStore for InMemoryBatchStore {
    async fn create_batch(&self, new_batch: NewBatch) -> Result<Batch> {
        let batch = Batch {
            id: Uuid::new_v4(),
            batch_type: new_batch.batch_type,
            status: BatchStatus::InProgress,
            search_key: new_batch.search_key,
            search_key2: new_batch.search_key2,
            tenant_id: new_batch.tenant_id,
            document_json: new_batch.document_json,
            create_time: Utc::now().naive_utc(),
            complete_time: None,
        };
        self.state.lock().batches.insert(batch.id, batch.clone());
        Ok(batch)
    }

    async fn find_batch(&self, batch_id: Uuid) -> Result<Option<Batch>> {
        Ok(self.state.lock().batches.get(&batch_id).cloned())
    }

    async fn complete_batch(&self, batch_id: Uuid, status: BatchStatus) -> Result<()> {
        let mut state = self.state.lock();
        let batch = state.batches.get_mut(&batch_id).ok_or_else(|| {
            SweeperError::invariant(format!("batch {batch_id} not found"))
        })?;
        if batch.status.is_terminal() {
            return Err(SweeperError::invariant(format!(
                "batch {batch_id} is already {}",
                batch.status.as_str()
            )));
        }
        batch.status = status;
        batch.complete_time = Some(Utc::now().naive_utc());
        Ok(())
    }

    async fn create_part(&self, new_part: NewBatchPart) -> Result<BatchPart> {
        let mut state = self.state.lock();
        if !state.batches.contains_key(&new_part.batch_id) {
            return Err(SweeperError::invariant(format!(
                "batch {} not found for new part",
                new_part.batch_id
            )));
        }
        let part = BatchPart {
            id: Uuid::new_v4(),
            batch_id: new_part.batch_id,
            part_type: new_part.part_type,
            search_key: new_part.search_key,
            search_key2: new_part.search_key2,
            status: PartStatus::Waiting,
            result_document_json: None,
            create_time: Utc::now().naive_utc(),
            complete_time: None,
        };
        state.part_order.push(part.id);
        state.parts.insert(part.id, part.clone());
        Ok(part)
    }

    async fn find_part(&self, part_id: Uuid) -> Result<Option<BatchPart>> {
        Ok(self.state.lock().parts.get(&part_id).cloned())
    }

    async fn complete_part(
        &self,
        part_id: Uuid,
        status: PartStatus,
        result_document: Value,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let part = state
            .parts
            .get_mut(&part_id)
            .ok_or_else(|| SweeperError::invariant(format!("part {part_id} not found")))?;
        if part.status.is_terminal() {
            return Err(SweeperError::invariant(format!(
                "part {part_id} is already {}",
                part.status.as_str()
            )));
        }
        part.status = status;
        part.result_document_json = Some(result_document);
        part.complete_time = Some(Utc::now().naive_utc());
        Ok(())
    }

    async fn parts_by_batch_and_type(
        &self,
        batch_id: Uuid,
        part_type: PartType,
    ) -> Result<Vec<BatchPart>> {
        let state = self.state.lock();
        Ok(state
            .part_order
            .iter()
            .filter_map(|id| state.parts.get(id))
            .filter(|part| part.batch_id == batch_id && part.part_type == part_type)
            .cloned()
            .collect())
    }

    async fn parts_by_batch_type_and_status(
        &self,
        batch_id: Uuid,
        part_type: PartType,
        status: PartStatus,
    ) -> Result<Vec<BatchPart>> {
        let parts = self.parts_by_batch_and_type(batch_id, part_type).await?;
        Ok(parts
            .into_iter()
            .filter(|part| part.status == status)
            .collect())
    }
}
