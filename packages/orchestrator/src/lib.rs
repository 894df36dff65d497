//! Job orchestration for media transcodes.
//!
//! This crate schedules transcode requests onto a fixed pool of Ractor
//! workers, tracks every job in an in-memory table and hands finished jobs
//! to two outcome routers that forward them to persistence.
//!
//! # Architecture
//!
//! - `Orchestrator` - Owns the table, the work queue and the actors
//! - `WorkerActor` - Pulls work items and runs the transcoder
//! - `OutcomeRouter` - One for successes, one for failures
//!
//! # Usage
//!
//! ```ignore
//! use orchestrator::{Orchestrator, NoopPersistence};
//!
//! let orchestrator = Orchestrator::new(config, transcoder, NoopPersistence)?;
//! orchestrator.start().await?;
//! orchestrator.add_job("media-1", TranscodeRequest::new("in.mp4")).await;
//! let record = orchestrator.get_job_status("media-1");
//! orchestrator.stop().await;
//! ```

mod error;
mod job_table;
mod messages;
mod orchestrator;
mod persistence;
mod router_actor;
mod transcoder;
mod worker_actor;

pub use error::{OrchestratorError, PersistenceError};
pub use job_table::{JobStats, JobTable};
pub use messages::{RouterMessage, WorkItem, WorkerMessage};
pub use orchestrator::Orchestrator;
pub use persistence::{DbPersistence, JobPersistence, NoopPersistence, PersistFuture};
pub use router_actor::{OutcomeKind, OutcomeRouter};
pub use transcoder::{FnTranscoder, TranscodeFuture, Transcoder};
pub use worker_actor::WorkerActor;

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef};
