//! # Batch Model
//!
//! One top-level unit of bulk work submitted by a caller. A batch's
//! `document_json` is a write-once configuration snapshot taken at
//! submission time; its status is mutated only by the status monitor, or
//! immediately by the dispatcher for the zero-match and config-error cases.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Batch lifecycle status. `InProgress` is the only non-terminal state and
/// the terminal state is written exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    InProgress,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::InProgress => "IN_PROGRESS",
            BatchStatus::Completed => "COMPLETED",
            BatchStatus::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "IN_PROGRESS" => Some(BatchStatus::InProgress),
            "COMPLETED" => Some(BatchStatus::Completed),
            "FAILED" => Some(BatchStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BatchStatus::InProgress)
    }
}

/// A persisted batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    /// Tag identifying which pipeline kind created this batch
    pub batch_type: String,
    pub status: BatchStatus,
    /// Caller-supplied label
    pub search_key: Option<String>,
    /// Acting-user id of the submitter
    pub search_key2: Option<String>,
    pub tenant_id: Option<String>,
    /// Write-once configuration snapshot
    pub document_json: Value,
    pub create_time: NaiveDateTime,
    pub complete_time: Option<NaiveDateTime>,
}

/// Creation payload for a new batch (generated fields omitted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBatch {
    pub batch_type: String,
    pub search_key: Option<String>,
    pub search_key2: Option<String>,
    pub tenant_id: Option<String>,
    pub document_json: Value,
}
