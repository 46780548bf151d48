//! # Batch Part Model
//!
//! One partition of a batch's work. Compute parts carry their partition
//! index in `search_key`; delete parts carry the producing compute part's
//! id in `search_key` and echo the partition index in `search_key2`.
//! Status and result document are written together, exactly once.

use crate::error::{Result, SweeperError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The stage a part belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartType {
    ComputeIds,
    DeleteInstances,
}

impl PartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartType::ComputeIds => "COMPUTE_IDS",
            PartType::DeleteInstances => "DELETE_INSTANCES",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "COMPUTE_IDS" => Some(PartType::ComputeIds),
            "DELETE_INSTANCES" => Some(PartType::DeleteInstances),
            _ => None,
        }
    }
}

/// Part lifecycle status. `Waiting` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartStatus {
    Waiting,
    Completed,
    Failed,
}

impl PartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartStatus::Waiting => "WAITING",
            PartStatus::Completed => "COMPLETED",
            PartStatus::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "WAITING" => Some(PartStatus::Waiting),
            "COMPLETED" => Some(PartStatus::Completed),
            "FAILED" => Some(PartStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PartStatus::Waiting)
    }
}

/// A persisted batch part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPart {
    pub id: Uuid,
    /// Owning batch; never changes after creation
    pub batch_id: Uuid,
    pub part_type: PartType,
    pub search_key: Option<String>,
    pub search_key2: Option<String>,
    pub status: PartStatus,
    pub result_document_json: Option<Value>,
    pub create_time: NaiveDateTime,
    pub complete_time: Option<NaiveDateTime>,
}

impl BatchPart {
    /// Partition index of a compute part (stored in `search_key`)
    pub fn partition_index(&self) -> Result<u64> {
        let raw = self.search_key.as_deref().ok_or_else(|| {
            SweeperError::invariant(format!("part {} has no partition index", self.id))
        })?;
        raw.parse().map_err(|_| {
            SweeperError::invariant(format!(
                "part {} has non-numeric partition index '{raw}'",
                self.id
            ))
        })
    }

    /// Producing compute part of a delete part (stored in `search_key`)
    pub fn compute_part_id(&self) -> Result<Uuid> {
        let raw = self.search_key.as_deref().ok_or_else(|| {
            SweeperError::invariant(format!("part {} has no compute-part pointer", self.id))
        })?;
        Uuid::parse_str(raw).map_err(|_| {
            SweeperError::invariant(format!(
                "part {} has malformed compute-part pointer '{raw}'",
                self.id
            ))
        })
    }
}

/// Creation payload for a new part (generated fields omitted; parts are
/// always created `Waiting` with no result document)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBatchPart {
    pub batch_id: Uuid,
    pub part_type: PartType,
    pub search_key: Option<String>,
    pub search_key2: Option<String>,
}

impl NewBatchPart {
    /// Compute part for one partition window
    pub fn compute(batch_id: Uuid, partition_index: u64) -> Self {
        Self {
            batch_id,
            part_type: PartType::ComputeIds,
            search_key: Some(partition_index.to_string()),
            search_key2: None,
        }
    }

    /// Delete part paired to the compute part that produced its id set
    pub fn delete_for_compute_part(
        batch_id: Uuid,
        compute_part_id: Uuid,
        partition_index: u64,
    ) -> Self {
        Self {
            batch_id,
            part_type: PartType::DeleteInstances,
            search_key: Some(compute_part_id.to_string()),
            search_key2: Some(partition_index.to_string()),
        }
    }

    /// Sequential chain link for chunk `index`
    pub fn sequential_chunk(batch_id: Uuid, index: u64) -> Self {
        Self {
            batch_id,
            part_type: PartType::DeleteInstances,
            search_key: Some(index.to_string()),
            search_key2: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn part_with_search_key(search_key: Option<&str>) -> BatchPart {
        BatchPart {
            id: Uuid::new_v4(),
            batch_id: Uuid::new_v4(),
            part_type: PartType::ComputeIds,
            search_key: search_key.map(str::to_string),
            search_key2: None,
            status: PartStatus::Waiting,
            result_document_json: None,
            create_time: Utc::now().naive_utc(),
            complete_time: None,
        }
    }

    #[test]
    fn test_partition_index_parses_search_key() {
        assert_eq!(part_with_search_key(Some("2")).partition_index().unwrap(), 2);
    }

    #[test]
    fn test_missing_partition_index_is_invariant_violation() {
        let err = part_with_search_key(None).partition_index().unwrap_err();
        assert!(matches!(
            err,
            crate::error::SweeperError::OrchestrationInvariant { .. }
        ));
    }

    #[test]
    fn test_compute_part_pointer_round_trip() {
        let compute_id = Uuid::new_v4();
        let new_part = NewBatchPart::delete_for_compute_part(Uuid::new_v4(), compute_id, 1);
        assert_eq!(new_part.search_key, Some(compute_id.to_string()));
        assert_eq!(new_part.search_key2, Some("1".to_string()));
    }
}
