//! Orchestrator and persistence errors.

use transcode_core::ConfigError;

/// Errors returned by orchestrator construction and startup.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn {actor}: {reason}")]
    Spawn { actor: String, reason: String },
}

/// Errors reported by a persistence collaborator.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Db(#[from] db::DbError),

    #[error("{0}")]
    Other(String),
}
