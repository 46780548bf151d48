//! # Historic Process Collaborators
//!
//! Trait seams for the two external collaborators the pipeline consumes:
//! the record-matching query engine (count + paginated id resolution) and
//! the deletion engine (itemized and bulk). The engines themselves live
//! outside this subsystem; [`memory`] ships an embedded implementation for
//! tests and single-process use.

pub mod memory;

use crate::error::Result;
use crate::filter::{HistoricProcessFilter, VariableValue};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub use memory::InMemoryProcessStore;

/// A finished or running historic process record, as far as the pipeline
/// needs to see it
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricProcessRecord {
    pub id: String,
    pub process_definition_id: String,
    pub process_definition_key: String,
    pub business_key: Option<String>,
    pub deployment_id: Option<String>,
    pub tenant_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub variables: HashMap<String, VariableValue>,
}

impl HistoricProcessRecord {
    pub fn finished(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Record-count and paginated id resolution over a filter
#[async_trait]
pub trait HistoricProcessQueries: Send + Sync {
    /// Number of records matching `filter`
    async fn count_matching(&self, filter: &HistoricProcessFilter) -> Result<u64>;

    /// Ids of matching records in the window (`first_result`, `max_results`),
    /// in a stable order for an unchanged dataset
    async fn page_of_ids(
        &self,
        filter: &HistoricProcessFilter,
        first_result: u64,
        max_results: u64,
    ) -> Result<Vec<String>>;
}

/// Record deletion, itemized or bulk
#[async_trait]
pub trait HistoricProcessDeleter: Send + Sync {
    /// Delete a single record
    async fn delete_by_id(&self, process_id: &str) -> Result<()>;

    /// Delete a set of records as one operation; fails as a whole
    async fn delete_all(&self, process_ids: &[String]) -> Result<()>;
}
