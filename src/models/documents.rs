//! # Wire Documents
//!
//! The JSON documents persisted in `Batch::document_json` and
//! `BatchPart::result_document_json`. Field names are camelCase on the
//! wire; the batch configuration snapshot is validated explicitly because
//! a missing query or page size must surface as a configuration error,
//! not a serde error.

use crate::error::{Result, SweeperError};
use crate::filter::{codec, HistoricProcessFilter};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Batch configuration snapshot, written once at submission time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchConfiguration {
    /// Total matching records at submission time
    pub number_of_instances: u64,
    pub batch_size: u64,
    #[serde(default)]
    pub sequential: bool,
    /// Encoded filter document
    pub query: Value,
}

impl BatchConfiguration {
    pub fn new(
        number_of_instances: u64,
        batch_size: u64,
        sequential: bool,
        filter: &HistoricProcessFilter,
    ) -> Self {
        Self {
            number_of_instances,
            batch_size,
            sequential,
            query: codec::encode(filter),
        }
    }

    /// Parse and validate a configuration snapshot.
    ///
    /// A document without a query or without a usable page size is a
    /// configuration error, terminal for whatever work references it.
    pub fn from_document(doc: &Value) -> Result<Self> {
        let object = doc.as_object().ok_or_else(|| {
            SweeperError::configuration("batch configuration must be a JSON object")
        })?;

        if !object.contains_key("query") {
            return Err(SweeperError::configuration(
                "batch configuration is missing the query",
            ));
        }

        let configuration: BatchConfiguration = serde_json::from_value(doc.clone())
            .map_err(|e| SweeperError::configuration(format!("malformed batch configuration: {e}")))?;

        if configuration.batch_size == 0 {
            return Err(SweeperError::configuration(
                "batch size must be greater than zero",
            ));
        }

        Ok(configuration)
    }

    pub fn to_document(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Reconstruct the filter tree from the snapshot
    pub fn decode_filter(&self) -> Result<HistoricProcessFilter> {
        codec::decode(&self.query)
    }
}

/// Result document of a compute part: the resolved id page plus the
/// pointer to the paired delete part created alongside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeIdsResult {
    pub historic_process_ids: Vec<String>,
    pub delete_batch_part: Option<Uuid>,
    #[serde(default)]
    pub sequential: bool,
}

impl ComputeIdsResult {
    pub fn from_document(doc: &Value) -> Result<Self> {
        serde_json::from_value(doc.clone()).map_err(|e| {
            SweeperError::invariant(format!("malformed compute result document: {e}"))
        })
    }

    pub fn to_document(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// One record that could not be deleted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedDeletion {
    pub id: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
}

/// Result document of a delete part (parallel itemized deletion or one
/// sequential chunk)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteInstancesResult {
    pub deleted_process_ids: Vec<String>,
    #[serde(default)]
    pub failed_deletions: Vec<FailedDeletion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
}

impl DeleteInstancesResult {
    pub fn from_document(doc: &Value) -> Result<Self> {
        serde_json::from_value(doc.clone())
            .map_err(|e| SweeperError::invariant(format!("malformed delete result document: {e}")))
    }

    pub fn to_document(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn succeeded(&self) -> bool {
        self.failed_deletions.is_empty() && self.error.is_none()
    }
}

/// Minimal error result document for a part failed by a terminal error
pub fn error_document(error: &str) -> Value {
    json!({ "error": error })
}
