//! Worker actor for executing transcodes.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use transcode_core::{JobRecord, TranscodeError};

use crate::job_table::JobTable;
use crate::messages::{WorkItem, WorkerMessage};
use crate::transcoder::Transcoder;

/// State for the worker actor.
pub struct WorkerActorState {
    /// Worker name used in logs.
    pub worker_id: String,
    /// Job records shared with the orchestrator.
    pub jobs: Arc<JobTable>,
    /// Receiving half of the work queue, shared by all workers.
    pub work_rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    pub transcoder: Arc<dyn Transcoder>,
    /// Completed records for the success router.
    pub success_tx: mpsc::Sender<JobRecord>,
    /// Failed records for the failure router.
    pub failure_tx: mpsc::Sender<JobRecord>,
    /// Checked before waiting for each work item.
    pub shutdown: CancellationToken,
}

/// Worker actor arguments.
pub struct WorkerArgs {
    pub worker_id: String,
    pub jobs: Arc<JobTable>,
    pub work_rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
    pub transcoder: Arc<dyn Transcoder>,
    pub success_tx: mpsc::Sender<JobRecord>,
    pub failure_tx: mpsc::Sender<JobRecord>,
    pub shutdown: CancellationToken,
}

/// Worker actor that drains the work queue one item at a time.
pub struct WorkerActor;

impl WorkerActor {
    async fn next_item(state: &WorkerActorState) -> Option<WorkItem> {
        tokio::select! {
            biased;
            _ = state.shutdown.cancelled() => None,
            item = async { state.work_rx.lock().await.recv().await } => item,
        }
    }

    async fn process(state: &WorkerActorState, item: WorkItem) {
        state.jobs.begin(&item.id);
        debug!("{} processing job {}", state.worker_id, item.id);

        // The table lock is not held while the transcode runs
        let outcome = AssertUnwindSafe(async { state.transcoder.transcode(&item).await })
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(TranscodeError::failed(format!(
                    "transcode panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });

        let (record, tx) = match outcome {
            Ok(output) => {
                let record = state.jobs.update(item.id.as_str(), |r| {
                    r.complete(output);
                    r.clone()
                });
                debug!("{} finished job {}", state.worker_id, item.id);
                (record, &state.success_tx)
            }
            Err(e) => {
                let message = e.to_string();
                error!("{} job {} failed: {}", state.worker_id, item.id, message);
                let record = state.jobs.update(item.id.as_str(), |r| {
                    r.fail(message);
                    r.clone()
                });
                (record, &state.failure_tx)
            }
        };

        let Some(record) = record else {
            warn!("Job {} disappeared from the table", item.id);
            return;
        };
        if tx.send(record).await.is_err() {
            warn!("Outcome router gone, dropping outcome for job {}", item.id);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

impl Actor for WorkerActor {
    type Msg = WorkerMessage;
    type State = WorkerActorState;
    type Arguments = WorkerArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        debug!("Starting worker: {}", args.worker_id);

        Ok(WorkerActorState {
            worker_id: args.worker_id,
            jobs: args.jobs,
            work_rx: args.work_rx,
            transcoder: args.transcoder,
            success_tx: args.success_tx,
            failure_tx: args.failure_tx,
            shutdown: args.shutdown,
        })
    }

    async fn post_start(
        &self,
        myself: ActorRef<Self::Msg>,
        _state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        myself.send_message(WorkerMessage::Poll)?;
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::Poll => match Self::next_item(state).await {
                Some(item) => {
                    Self::process(state, item).await;
                    myself.send_message(WorkerMessage::Poll)?;
                }
                None => {
                    debug!("Stopping worker: {}", state.worker_id);
                    myself.stop(None);
                }
            },
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        debug!("Worker {} exited", state.worker_id);
        Ok(())
    }
}
