#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Sweeper Core Rust
//!
//! High-performance Rust core for asynchronous batch operations over
//! historic process records.
//!
//! ## Overview
//!
//! Sweeper implements the batch-processing pipeline a process execution
//! engine uses to compute, delete, and track completion of large sets of
//! historic records without blocking a request thread or exceeding a
//! single unit-of-work's size: partitioning, a parallel fan-out/fan-in
//! topology and a strict sequential chaining topology, crash-recoverable
//! continuation scheduling, and terminal-status aggregation via polling.
//!
//! ## Architecture
//!
//! A submitted [`pipeline::DeleteBatchRequest`] becomes a persisted
//! [`models::Batch`] partitioned into [`models::BatchPart`]s. Stage
//! handlers execute behind a closed string-tag registry
//! ([`pipeline::HandlerRegistry`]) driven by the generic job scheduler
//! seam ([`scheduler::JobScheduler`]):
//!
//! ```text
//! Dispatcher ──parallel──▶ N × Compute Stage ──▶ (barrier: Status Monitor)
//!     │                                               │
//!     │                                               ▼
//!     │                                    N × Delete Stage ──▶ Monitor ──▶ terminal
//!     │
//!     └──sequential──▶ Fused Stage ──▶ Fused Stage ──▶ … ──▶ terminal
//! ```
//!
//! ## Module Organization
//!
//! - [`models`] - Batch/BatchPart entities and wire documents
//! - [`filter`] - The query-predicate tree and its closed-schema JSON codec
//! - [`store`] - Batch repository seam with in-memory and Postgres backends
//! - [`process`] - Historic-record query and deletion collaborator seams
//! - [`scheduler`] - Job scheduling seam and the in-process scheduler
//! - [`pipeline`] - Dispatcher, the five stage handlers, and the facade
//! - [`config`] - Pipeline configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sweeper_core::config::SweeperConfig;
//! use sweeper_core::filter::HistoricProcessFilter;
//! use sweeper_core::pipeline::{BatchPipeline, DeleteBatchRequest};
//! use sweeper_core::process::InMemoryProcessStore;
//! use sweeper_core::scheduler::InProcessScheduler;
//! use sweeper_core::store::InMemoryBatchStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let records = Arc::new(InMemoryProcessStore::new());
//! let scheduler = Arc::new(InProcessScheduler::new());
//! let config = SweeperConfig::default();
//!
//! let pipeline = BatchPipeline::new(
//!     Arc::new(InMemoryBatchStore::new()),
//!     records.clone(),
//!     records,
//!     scheduler.clone(),
//!     config.clone(),
//! )?;
//!
//! let filter = HistoricProcessFilter::new().with_finished(true);
//! let batch_id = pipeline
//!     .submit_delete_batch(DeleteBatchRequest::new(filter).with_batch_size(100))
//!     .await?;
//!
//! // Drive the queued jobs to quiescence, then poll the batch
//! scheduler.drain(&pipeline.registry(), config.max_drain_ticks).await?;
//! let batch = pipeline.find_batch(batch_id).await?.expect("batch exists");
//! println!("batch finished as {:?}", batch.status);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod filter;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod process;
pub mod scheduler;
pub mod store;

pub use config::SweeperConfig;
pub use error::{Result, SweeperError};
pub use filter::{HistoricProcessFilter, VariableOperator, VariablePredicate, VariableValue};
pub use models::{Batch, BatchPart, BatchStatus, PartStatus, PartType};
pub use pipeline::{BatchPipeline, DeleteBatchRequest};
