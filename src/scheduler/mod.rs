//! # Job Scheduling Seam
//!
//! The pipeline's view of the generic job scheduler/worker pool: submit a
//! job once, submit a repeating timer job, cancel a repeating job. Leasing,
//! locking, and retry-on-crash semantics belong to the scheduler itself.
//!
//! A job is routed purely by its handler-type tag and carries an opaque
//! configuration string that this subsystem interprets as a batch or
//! batch-part id.

pub mod inprocess;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

pub use inprocess::InProcessScheduler;

/// A job submission: handler tag plus opaque configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewJob {
    pub handler_type: String,
    pub configuration: String,
}

impl NewJob {
    pub fn new(handler_type: impl Into<String>, configuration: impl Into<String>) -> Self {
        Self {
            handler_type: handler_type.into(),
            configuration: configuration.into(),
        }
    }
}

/// Execution-time identity of a job, handed to its handler. A repeating
/// handler cancels its own timer through this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobContext {
    pub job_id: Uuid,
}

/// Scheduling operations the pipeline consumes
#[async_trait]
pub trait JobScheduler: Send + Sync {
    /// Submit a job for one execution
    async fn submit(&self, job: NewJob) -> Result<Uuid>;

    /// Submit a repeating timer job firing every `interval` until cancelled
    async fn submit_repeating(&self, job: NewJob, interval: Duration) -> Result<Uuid>;

    /// Clear a repeating job's repeat specification; it will not fire again
    async fn cancel_repeating(&self, job_id: Uuid) -> Result<()>;
}
