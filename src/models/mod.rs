//! # Batch Data Model
//!
//! Entities owned by the batch pipeline: the [`Batch`] submitted by a
//! caller, its [`BatchPart`] partitions, and the wire documents exchanged
//! through their `document_json` / `result_document_json` fields.

pub mod batch;
pub mod batch_part;
pub mod documents;

pub use batch::{Batch, BatchStatus, NewBatch};
pub use batch_part::{BatchPart, NewBatchPart, PartStatus, PartType};
pub use documents::{
    error_document, BatchConfiguration, ComputeIdsResult, DeleteInstancesResult, FailedDeletion,
};
