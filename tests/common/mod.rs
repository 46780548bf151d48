//! Shared fixtures for the pipeline integration tests
#![allow(dead_code)] // each test binary uses a different slice of the fixtures

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use sweeper_core::config::SweeperConfig;
use sweeper_core::error::Result;
use sweeper_core::filter::HistoricProcessFilter;
use sweeper_core::pipeline::BatchPipeline;
use sweeper_core::process::{
    HistoricProcessQueries, HistoricProcessRecord, InMemoryProcessStore,
};
use sweeper_core::scheduler::InProcessScheduler;
use sweeper_core::store::InMemoryBatchStore;

/// A fully-wired pipeline over in-memory collaborators
pub struct TestPipeline {
    pub batches: Arc<InMemoryBatchStore>,
    pub records: Arc<InMemoryProcessStore>,
    pub queries: Arc<RecordingQueries>,
    pub scheduler: Arc<InProcessScheduler>,
    pub pipeline: BatchPipeline,
    pub config: SweeperConfig,
}

impl TestPipeline {
    /// Run every queued job to quiescence
    pub async fn drain(&self) -> Result<u64> {
        self.scheduler
            .drain(&self.pipeline.registry(), self.config.max_drain_ticks)
            .await
    }

    /// Run at most `max_ticks` queued jobs
    pub async fn drain_capped(&self, max_ticks: u64) -> Result<u64> {
        self.scheduler
            .drain(&self.pipeline.registry(), max_ticks)
            .await
    }
}

pub fn test_pipeline() -> TestPipeline {
    let batches = Arc::new(InMemoryBatchStore::new());
    let records = Arc::new(InMemoryProcessStore::new());
    let queries = Arc::new(RecordingQueries::new(records.clone()));
    let scheduler = Arc::new(InProcessScheduler::new());
    let config = SweeperConfig {
        max_drain_ticks: 1_000,
        ..SweeperConfig::default()
    };

    let pipeline = BatchPipeline::new(
        batches.clone(),
        queries.clone(),
        records.clone(),
        scheduler.clone(),
        config.clone(),
    )
    .expect("pipeline wiring");

    TestPipeline {
        batches,
        records,
        queries,
        scheduler,
        pipeline,
        config,
    }
}

/// Query collaborator decorating the in-memory store with a log of the
/// page windows it was asked for
pub struct RecordingQueries {
    inner: Arc<InMemoryProcessStore>,
    pages: Mutex<Vec<(u64, u64)>>,
}

impl RecordingQueries {
    pub fn new(inner: Arc<InMemoryProcessStore>) -> Self {
        Self {
            inner,
            pages: Mutex::new(Vec::new()),
        }
    }

    /// Every (first_result, max_results) window requested so far
    pub fn requested_windows(&self) -> Vec<(u64, u64)> {
        self.pages.lock().clone()
    }
}

#[async_trait]
impl HistoricProcessQueries for RecordingQueries {
    async fn count_matching(&self, filter: &HistoricProcessFilter) -> Result<u64> {
        self.inner.count_matching(filter).await
    }

    async fn page_of_ids(
        &self,
        filter: &HistoricProcessFilter,
        first_result: u64,
        max_results: u64,
    ) -> Result<Vec<String>> {
        self.pages.lock().push((first_result, max_results));
        self.inner.page_of_ids(filter, first_result, max_results).await
    }
}

/// A finished record with a zero-padded id so insertion order, id order,
/// and page order coincide
pub fn finished_record(index: usize) -> HistoricProcessRecord {
    HistoricProcessRecord {
        id: format!("proc-{index:04}"),
        process_definition_id: "invoice:1".to_string(),
        process_definition_key: "invoice".to_string(),
        business_key: Some(format!("ORD-{index}")),
        deployment_id: None,
        tenant_id: None,
        start_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        end_time: Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
        variables: HashMap::new(),
    }
}

/// Seed `count` finished records
pub fn seed_records(records: &InMemoryProcessStore, count: usize) {
    for index in 0..count {
        records.insert(finished_record(index));
    }
}
