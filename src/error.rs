//! Error types for the orchestrator.

use crate::llm::GatewayError;

/// Errors that abort an orchestration call.
///
/// Per-role call failures inside a batch are not errors; they are recorded
/// in the report.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("unknown role: {role_id}")]
    RoleNotFound { role_id: String },

    #[error("no roles configured for task type {task_type}")]
    NoRolesForTask { task_type: String },

    #[error("role {role_id} failed: {source}")]
    Gateway {
        role_id: String,
        #[source]
        source: GatewayError,
    },
}

/// Result type for orchestrator operations.
pub type OrchestratorResult<T> = std::result::Result<T, OrchestratorError>;
