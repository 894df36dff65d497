//! Core domain types for the transcode orchestrator.
//!
//! This crate contains shared types used across all packages:
//! - JobRecord and JobStatus for tracked work
//! - TranscodeRequest / TranscodeOutput / Variant for collaborator I/O
//! - OrchestratorConfig for pool sizing

mod config;
mod error;
mod job;
mod media;

pub use config::{ConfigError, OrchestratorConfig};
pub use error::TranscodeError;
pub use job::{JobId, JobRecord, JobStatus};
pub use media::{TranscodeOutput, TranscodeRequest, Variant};
