//! # System Constants
//!
//! Core constants and tags that define the operational boundaries of the
//! batch pipeline: the closed handler-type registry and batch type tags.

/// Handler type tags: the closed dispatch protocol between the generic
/// job scheduler and this subsystem. The scheduler routes a job purely by
/// one of these strings, carrying an opaque configuration string that the
/// handler interprets as a batch or batch-part id.
pub mod handler_types {
    /// Compute Stage: resolve one partition's page of matching record ids
    pub const COMPUTE_PROCESS_IDS: &str = "compute-delete-historic-process-ids";

    /// Delete Stage: itemized deletion of a computed id set
    pub const DELETE_PROCESS_IDS: &str = "delete-historic-process-ids";

    /// COMPUTE-phase monitor: polls compute parts, releases the delete stage
    pub const COMPUTE_STATUS: &str = "compute-delete-historic-process-status";

    /// DELETE-phase monitor: polls delete parts, finalizes the batch
    pub const DELETE_STATUS: &str = "delete-historic-process-status";

    /// Sequential fused stage: compute+delete one chunk, then self-chain
    pub const DELETE_SEQUENTIAL: &str = "delete-historic-processes-sequential";

    /// Every tag the registry accepts, in registration order
    pub const ALL: &[&str] = &[
        COMPUTE_PROCESS_IDS,
        DELETE_PROCESS_IDS,
        COMPUTE_STATUS,
        DELETE_STATUS,
        DELETE_SEQUENTIAL,
    ];
}

/// Batch type tags identifying which pipeline kind created a batch
pub mod batch_types {
    /// Bulk deletion of historic process records
    pub const HISTORIC_PROCESS_DELETE: &str = "historic-process-delete";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_type_registry_is_closed() {
        assert_eq!(handler_types::ALL.len(), 5);
        assert!(handler_types::ALL.contains(&handler_types::DELETE_SEQUENTIAL));
    }
}
