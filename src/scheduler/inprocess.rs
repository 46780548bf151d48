//! # In-Process Scheduler
//!
//! A deterministic, queue-backed [`JobScheduler`] for tests and embedded
//! single-process deployments. Jobs execute in FIFO submission order when
//! the owner drains the queue; repeating timer jobs are re-enqueued after
//! each execution until cancelled.
//!
//! The drain loop is capped: a pipeline that stops making progress (for
//! example a chain whose continuation was lost) surfaces as a cap hit with
//! work still pending, rather than an endless spin.

use crate::error::{Result, SweeperError};
use crate::pipeline::handler::HandlerRegistry;
use crate::scheduler::{JobContext, JobScheduler, NewJob};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct QueuedJob {
    id: Uuid,
    handler_type: String,
    configuration: String,
    repeating: bool,
}

#[derive(Default)]
struct SchedulerState {
    queue: VecDeque<QueuedJob>,
    cancelled: HashSet<Uuid>,
}

/// Queue-backed scheduler; see module docs
#[derive(Clone, Default)]
pub struct InProcessScheduler {
    state: Arc<Mutex<SchedulerState>>,
}

impl InProcessScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs currently queued (repeating jobs count once)
    pub fn pending_jobs(&self) -> usize {
        let state = self.state.lock();
        state
            .queue
            .iter()
            .filter(|job| !state.cancelled.contains(&job.id))
            .count()
    }

    /// Whether any queued job carries the given handler tag
    pub fn has_pending_of_type(&self, handler_type: &str) -> bool {
        let state = self.state.lock();
        state
            .queue
            .iter()
            .any(|job| job.handler_type == handler_type && !state.cancelled.contains(&job.id))
    }

    /// Execute queued jobs through `registry` until the queue is empty or
    /// `max_ticks` executions have run. Returns the number of executions.
    ///
    /// Handler errors do not stop the drain: the failed job is dropped
    /// (this scheduler's stand-in for an external retry/dead-letter
    /// policy) and draining continues.
    pub async fn drain(&self, registry: &HandlerRegistry, max_ticks: u64) -> Result<u64> {
        let mut ticks = 0;

        loop {
            let job = {
                let mut state = self.state.lock();
                loop {
                    match state.queue.pop_front() {
                        Some(job) if state.cancelled.contains(&job.id) => {
                            debug!(job_id = %job.id, "skipping cancelled job");
                        }
                        other => break other,
                    }
                }
            };

            let Some(job) = job else {
                return Ok(ticks);
            };

            if ticks >= max_ticks {
                // Put it back so callers can inspect the stalled queue
                self.state.lock().queue.push_front(job);
                return Err(SweeperError::scheduler(format!(
                    "drain tick cap of {max_ticks} reached with work still pending"
                )));
            }
            ticks += 1;

            let handler = registry.resolve(&job.handler_type)?;
            let context = JobContext { job_id: job.id };
            if let Err(error) = handler.execute(&job.configuration, &context).await {
                warn!(
                    job_id = %job.id,
                    handler_type = %job.handler_type,
                    retryable = error.is_retryable(),
                    %error,
                    "job execution failed; dropping job"
                );
                continue;
            }

            if job.repeating && !self.state.lock().cancelled.contains(&job.id) {
                self.state.lock().queue.push_back(job);
            }
        }
    }
}

#[async_trait]
impl JobScheduler for InProcessScheduler {
    async fn submit(&self, job: NewJob) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.state.lock().queue.push_back(QueuedJob {
            id,
            handler_type: job.handler_type,
            configuration: job.configuration,
            repeating: false,
        });
        Ok(id)
    }

    async fn submit_repeating(&self, job: NewJob, _interval: Duration) -> Result<Uuid> {
        // Interval is a real-time concern; the drained queue replays a
        // repeating job once per pass, which bounds staleness the same way
        let id = Uuid::new_v4();
        self.state.lock().queue.push_back(QueuedJob {
            id,
            handler_type: job.handler_type,
            configuration: job.configuration,
            repeating: true,
        });
        Ok(id)
    }

    async fn cancel_repeating(&self, job_id: Uuid) -> Result<()> {
        self.state.lock().cancelled.insert(job_id);
        Ok(())
    }
}
