pub mod abort_coordinator;
pub mod config;
pub mod execution_registry;
pub mod queue_events;
pub mod workspace_copy;
