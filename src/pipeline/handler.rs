//! # Job Handler Registry
//!
//! The dispatch protocol between the generic scheduler and the pipeline:
//! a closed registration map from handler-type tag to handler. Routing is
//! a plain map lookup; the tag set is fixed at compile time in
//! [`crate::constants::handler_types`].

use crate::constants::handler_types;
use crate::error::{Result, SweeperError};
use crate::scheduler::JobContext;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// One pipeline stage behind a handler-type tag.
///
/// `configuration` is the opaque string carried by the job: a batch id
/// for monitor handlers, a batch-part id for stage handlers.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The tag this handler is registered under
    fn handler_type(&self) -> &'static str;

    async fn execute(&self, configuration: &str, context: &JobContext) -> Result<()>;
}

/// Closed map from handler-type tag to handler implementation
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own tag. Tags outside the closed set
    /// and duplicate registrations are rejected.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) -> Result<()> {
        let tag = handler.handler_type();
        if !handler_types::ALL.contains(&tag) {
            return Err(SweeperError::configuration(format!(
                "handler type '{tag}' is not part of the registry"
            )));
        }
        if self.handlers.contains_key(tag) {
            return Err(SweeperError::configuration(format!(
                "handler type '{tag}' is already registered"
            )));
        }
        self.handlers.insert(tag, handler);
        Ok(())
    }

    /// Resolve the handler for a job's tag
    pub fn resolve(&self, handler_type: &str) -> Result<Arc<dyn JobHandler>> {
        self.handlers.get(handler_type).cloned().ok_or_else(|| {
            SweeperError::invariant(format!("no handler registered for type '{handler_type}'"))
        })
    }

    pub fn registered_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.handlers.keys().copied().collect();
        types.sort_unstable();
        types
    }
}
