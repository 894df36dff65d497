//! Orchestrator sizing configuration.

use serde::{Deserialize, Serialize};

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed reading {var}: {reason}")]
    Env { var: String, reason: String },
}

/// Pool and queue sizes, fixed for the lifetime of an orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Number of concurrent workers.
    pub worker_count: usize,
    /// Capacity of the work queue; `add_job` waits when it is full.
    pub queue_capacity: usize,
    /// Capacity of each outcome queue. Falls back to `queue_capacity`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome_capacity: Option<usize>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            queue_capacity: 100,
            outcome_capacity: None,
        }
    }
}

impl OrchestratorConfig {
    /// Create a config with the given worker count and queue capacity.
    pub fn new(worker_count: usize, queue_capacity: usize) -> Self {
        Self {
            worker_count,
            queue_capacity,
            outcome_capacity: None,
        }
    }

    /// Set the outcome queue capacity.
    pub fn with_outcome_capacity(mut self, capacity: usize) -> Self {
        self.outcome_capacity = Some(capacity);
        self
    }

    /// Effective capacity of each outcome queue.
    pub fn outcome_capacity(&self) -> usize {
        self.outcome_capacity.unwrap_or(self.queue_capacity)
    }

    /// Reject sizes the pool cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid("worker_count must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_capacity must be at least 1".into(),
            ));
        }
        if self.outcome_capacity == Some(0) {
            return Err(ConfigError::Invalid(
                "outcome_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Build a config from environment variables.
    ///
    /// - `TRANSCODE_WORKERS` (default: 4)
    /// - `TRANSCODE_QUEUE_DEPTH` (default: 100)
    /// - `TRANSCODE_OUTCOME_DEPTH` (default: same as queue depth)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let cfg = Self {
            worker_count: parse_usize_env("TRANSCODE_WORKERS")?.unwrap_or(defaults.worker_count),
            queue_capacity: parse_usize_env("TRANSCODE_QUEUE_DEPTH")?
                .unwrap_or(defaults.queue_capacity),
            outcome_capacity: parse_usize_env("TRANSCODE_OUTCOME_DEPTH")?,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_usize_env(var_name: &str) -> Result<Option<usize>, ConfigError> {
    let v = match std::env::var(var_name) {
        Ok(v) => v,
        Err(std::env::VarError::NotPresent) => return Ok(None),
        Err(e) => {
            return Err(ConfigError::Env {
                var: var_name.to_string(),
                reason: e.to_string(),
            });
        }
    };

    let trimmed = v.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    trimmed
        .parse::<usize>()
        .map(Some)
        .map_err(|e| ConfigError::Env {
            var: var_name.to_string(),
            reason: format!("expected a non-negative integer, got {v:?} ({e})"),
        })
}
