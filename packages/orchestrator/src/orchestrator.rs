//! Orchestrator façade owning the job table, the queues and the actors.

use std::sync::Arc;

use futures_util::future::join_all;
use ractor::Actor;
use ractor::concurrency::JoinHandle;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use transcode_core::{JobId, JobRecord, JobStatus, OrchestratorConfig, TranscodeRequest};

use crate::error::OrchestratorError;
use crate::job_table::{JobStats, JobTable};
use crate::messages::WorkItem;
use crate::persistence::JobPersistence;
use crate::router_actor::{OutcomeKind, OutcomeRouter, RouterArgs};
use crate::transcoder::Transcoder;
use crate::worker_actor::{WorkerActor, WorkerArgs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Constructed,
    Running,
    Stopped,
}

struct Lifecycle {
    phase: Phase,
    workers: Vec<JoinHandle<()>>,
    routers: Vec<JoinHandle<()>>,
}

/// Schedules transcode jobs onto a fixed pool of workers.
///
/// Lifecycle is constructed → running → stopped. Jobs may be added in any
/// phase; they are only processed while running.
pub struct Orchestrator {
    config: OrchestratorConfig,
    jobs: Arc<JobTable>,
    work_tx: mpsc::Sender<WorkItem>,
    work_rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    transcoder: Arc<dyn Transcoder>,
    persistence: Arc<dyn JobPersistence>,
    /// Stops the workers.
    shutdown: CancellationToken,
    /// Stops the routers once the workers are gone.
    drain: CancellationToken,
    lifecycle: Mutex<Lifecycle>,
}

impl Orchestrator {
    /// Create an orchestrator. No actors run until [`Orchestrator::start`].
    pub fn new(
        config: OrchestratorConfig,
        transcoder: impl Transcoder,
        persistence: impl JobPersistence,
    ) -> Result<Self, OrchestratorError> {
        Self::with_shared(config, Arc::new(transcoder), Arc::new(persistence))
    }

    /// Create an orchestrator from already shared collaborators.
    pub fn with_shared(
        config: OrchestratorConfig,
        transcoder: Arc<dyn Transcoder>,
        persistence: Arc<dyn JobPersistence>,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;
        let (work_tx, work_rx) = mpsc::channel(config.queue_capacity);

        Ok(Self {
            config,
            jobs: Arc::new(JobTable::new()),
            work_tx,
            work_rx: Arc::new(Mutex::new(work_rx)),
            transcoder,
            persistence,
            shutdown: CancellationToken::new(),
            drain: CancellationToken::new(),
            lifecycle: Mutex::new(Lifecycle {
                phase: Phase::Constructed,
                workers: Vec::new(),
                routers: Vec::new(),
            }),
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Spawn the workers and the two outcome routers.
    ///
    /// Only the first call does anything, including after [`Orchestrator::stop`].
    pub async fn start(&self) -> Result<(), OrchestratorError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.phase != Phase::Constructed {
            return Ok(());
        }

        if let Err(e) = self.spawn_actors(&mut lifecycle).await {
            // Tear down whatever did start
            self.shutdown.cancel();
            self.drain.cancel();
            join_all(lifecycle.workers.drain(..)).await;
            join_all(lifecycle.routers.drain(..)).await;
            lifecycle.phase = Phase::Stopped;
            return Err(e);
        }

        lifecycle.phase = Phase::Running;
        info!(
            "Orchestrator started with {} workers (queue capacity {})",
            self.config.worker_count, self.config.queue_capacity
        );
        Ok(())
    }

    async fn spawn_actors(&self, lifecycle: &mut Lifecycle) -> Result<(), OrchestratorError> {
        let capacity = self.config.outcome_capacity();
        let (success_tx, success_rx) = mpsc::channel(capacity);
        let (failure_tx, failure_rx) = mpsc::channel(capacity);

        for (kind, outcome_rx) in [
            (OutcomeKind::Success, success_rx),
            (OutcomeKind::Failure, failure_rx),
        ] {
            let args = RouterArgs {
                kind,
                outcome_rx,
                persistence: self.persistence.clone(),
                drain: self.drain.clone(),
            };
            let (_router, handle) = Actor::spawn(None, OutcomeRouter, args)
                .await
                .map_err(|e| OrchestratorError::Spawn {
                    actor: format!("{kind} router"),
                    reason: e.to_string(),
                })?;
            lifecycle.routers.push(handle);
        }

        for i in 0..self.config.worker_count {
            let worker_id = format!("worker-{}", i + 1);
            let args = WorkerArgs {
                worker_id: worker_id.clone(),
                jobs: self.jobs.clone(),
                work_rx: self.work_rx.clone(),
                transcoder: self.transcoder.clone(),
                success_tx: success_tx.clone(),
                failure_tx: failure_tx.clone(),
                shutdown: self.shutdown.clone(),
            };
            let (_worker, handle) = Actor::spawn(None, WorkerActor, args)
                .await
                .map_err(|e| OrchestratorError::Spawn {
                    actor: worker_id,
                    reason: e.to_string(),
                })?;
            lifecycle.workers.push(handle);
        }

        Ok(())
    }

    /// Stop the workers, then let the routers flush and stop.
    ///
    /// Waits for in-flight transcodes to finish. Items still in the work queue
    /// are not processed and their records stay pending. A no-op unless the
    /// orchestrator is running.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.phase != Phase::Running {
            return;
        }
        lifecycle.phase = Phase::Stopped;
        info!("Stopping orchestrator");

        self.shutdown.cancel();
        log_join_errors("worker", join_all(lifecycle.workers.drain(..)).await);

        // Wake blocked submitters and reject later ones
        self.work_rx.lock().await.close();

        self.drain.cancel();
        log_join_errors("router", join_all(lifecycle.routers.drain(..)).await);

        info!("Orchestrator stopped");
    }

    /// Whether [`Orchestrator::start`] has run and [`Orchestrator::stop`] has not.
    pub async fn is_running(&self) -> bool {
        self.lifecycle.lock().await.phase == Phase::Running
    }

    /// Record a pending job if `id` is new, then enqueue it.
    ///
    /// Waits while the work queue is full. Re-submitting a known id leaves its
    /// record untouched but still enqueues another item. After
    /// [`Orchestrator::stop`] the item is dropped with a warning.
    pub async fn add_job(&self, id: impl Into<JobId>, request: TranscodeRequest) {
        let id = id.into();
        self.jobs.upsert_if_absent(&id);

        if self.work_tx.send(WorkItem::new(id.clone(), request)).await.is_err() {
            warn!("Work queue closed, dropping job {}", id);
        }
    }

    /// Snapshot of the job record for `id`, or `None` if it was never submitted.
    pub fn get_job_status(&self, id: &str) -> Option<JobRecord> {
        self.jobs.get(id)
    }

    /// Snapshots of all jobs, optionally filtered by status.
    pub fn list_jobs(&self, status: Option<JobStatus>) -> Vec<JobRecord> {
        self.jobs.list(status)
    }

    pub fn stats(&self) -> JobStats {
        self.jobs.stats()
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.drain.cancel();
    }
}

fn log_join_errors(kind: &str, results: Vec<Result<(), tokio::task::JoinError>>) {
    for e in results.into_iter().filter_map(Result::err) {
        warn!("A {} task ended abnormally: {}", kind, e);
    }
}
