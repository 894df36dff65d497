//! Outcome router actors forwarding finished jobs to persistence.

use std::sync::Arc;

use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use transcode_core::JobRecord;

use crate::messages::RouterMessage;
use crate::persistence::JobPersistence;

/// Which outcome queue a router drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Success,
    Failure,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Success => "success",
            OutcomeKind::Failure => "failure",
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State for the outcome router.
pub struct RouterState {
    pub kind: OutcomeKind,
    /// Receiving half of this router's outcome queue.
    pub outcome_rx: mpsc::Receiver<JobRecord>,
    pub persistence: Arc<dyn JobPersistence>,
    /// Once cancelled, buffered outcomes are flushed and the router stops.
    pub drain: CancellationToken,
    /// Outcomes handed to persistence so far.
    pub routed: u64,
}

/// Outcome router arguments.
pub struct RouterArgs {
    pub kind: OutcomeKind,
    pub outcome_rx: mpsc::Receiver<JobRecord>,
    pub persistence: Arc<dyn JobPersistence>,
    pub drain: CancellationToken,
}

/// Single consumer of one outcome queue.
pub struct OutcomeRouter;

impl OutcomeRouter {
    async fn route(state: &mut RouterState, record: JobRecord) {
        let id = record.id.clone();
        let result = match state.kind {
            OutcomeKind::Success => {
                let Some(output) = record.result else {
                    warn!("Job {} routed as success without a result", id);
                    return;
                };
                state
                    .persistence
                    .record_success(record.id, output.output_path, output.variants)
                    .await
            }
            OutcomeKind::Failure => {
                let message = record.error.unwrap_or_default();
                state.persistence.record_failure(record.id, message).await
            }
        };

        state.routed += 1;
        if let Err(e) = result {
            warn!("Failed to persist {} outcome for job {}: {}", state.kind, id, e);
        }
    }
}

impl Actor for OutcomeRouter {
    type Msg = RouterMessage;
    type State = RouterState;
    type Arguments = RouterArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        debug!("Starting {} router", args.kind);

        Ok(RouterState {
            kind: args.kind,
            outcome_rx: args.outcome_rx,
            persistence: args.persistence,
            drain: args.drain,
            routed: 0,
        })
    }

    async fn post_start(
        &self,
        myself: ActorRef<Self::Msg>,
        _state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        myself.send_message(RouterMessage::Poll)?;
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            RouterMessage::Poll => {
                // Buffered outcomes win over the drain signal
                let next = tokio::select! {
                    biased;
                    record = state.outcome_rx.recv() => record,
                    _ = state.drain.cancelled() => None,
                };

                match next {
                    Some(record) => {
                        Self::route(state, record).await;
                        myself.send_message(RouterMessage::Poll)?;
                    }
                    None => {
                        state.outcome_rx.close();
                        while let Ok(record) = state.outcome_rx.try_recv() {
                            Self::route(state, record).await;
                        }
                        myself.stop(None);
                    }
                }
            }
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        debug!("{} router exited after {} outcomes", state.kind, state.routed);
        Ok(())
    }
}
