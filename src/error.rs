//! # Pipeline Error Types
//!
//! Structured error handling for the batch pipeline using thiserror
//! for typed error variants instead of `Box<dyn Error>` patterns.
//!
//! The variants mirror the failure classes the pipeline distinguishes at
//! runtime: configuration problems are terminal for the affected work,
//! query execution problems are left to the scheduler's retry policy, and
//! orchestration invariant violations abort the current job outright.

use thiserror::Error;

/// Errors surfaced by the batch pipeline and its collaborators
#[derive(Error, Debug)]
pub enum SweeperError {
    /// Invalid or missing batch configuration (bad page size, missing query,
    /// filter decode failure). Terminal for the affected batch part.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A filter document contained a property outside the closed schema.
    #[error("Unsupported filter property: {property}")]
    UnsupportedPredicate { property: String },

    /// The record-matching collaborator failed while counting or paging.
    /// Not terminal: the owning job is left unmarked for scheduler retry.
    #[error("Query execution error: {message}")]
    QueryExecution { message: String },

    /// A referenced batch or batch part is missing, or a paired result is
    /// empty where the pipeline guarantees content. Aborts the current job.
    #[error("Orchestration invariant violated: {message}")]
    OrchestrationInvariant { message: String },

    /// Durable store failure (create, status write, lookup).
    #[error("Store error: {operation}: {message}")]
    Store { operation: String, message: String },

    /// Job or timer submission failure.
    #[error("Scheduler error: {message}")]
    Scheduler { message: String },

    /// Result/configuration document (de)serialization failure.
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl SweeperError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unsupported-predicate error for an unknown filter property
    pub fn unsupported_predicate(property: impl Into<String>) -> Self {
        Self::UnsupportedPredicate {
            property: property.into(),
        }
    }

    /// Create a query execution error
    pub fn query_execution(message: impl Into<String>) -> Self {
        Self::QueryExecution {
            message: message.into(),
        }
    }

    /// Create an orchestration invariant violation
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::OrchestrationInvariant {
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a scheduler error
    pub fn scheduler(message: impl Into<String>) -> Self {
        Self::Scheduler {
            message: message.into(),
        }
    }

    /// Whether the scheduler should treat the owning job as retryable.
    ///
    /// Configuration errors and invariant violations are deterministic:
    /// re-delivering the job cannot change the outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SweeperError::QueryExecution { .. }
                | SweeperError::Store { .. }
                | SweeperError::Scheduler { .. }
        )
    }
}

impl From<serde_json::Error> for SweeperError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<sqlx::Error> for SweeperError {
    fn from(err: sqlx::Error) -> Self {
        Self::Store {
            operation: "query".to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SweeperError>;
