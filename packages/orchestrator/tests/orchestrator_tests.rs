//! End-to-end tests for the orchestrator with scripted collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use orchestrator::{
    FnTranscoder, JobPersistence, NoopPersistence, Orchestrator, OrchestratorError, PersistFuture,
    PersistenceError, TranscodeFuture, Transcoder, WorkItem,
};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use transcode_core::{
    JobId, JobStatus, OrchestratorConfig, TranscodeError, TranscodeOutput, TranscodeRequest,
    Variant,
};

fn output_for(id: &str) -> TranscodeOutput {
    TranscodeOutput::new(
        format!("/out/{id}"),
        vec![Variant::new("720p", 1280, 720, "3000k", "128k")],
    )
}

fn request(id: &str) -> TranscodeRequest {
    TranscodeRequest::new(format!("{id}.mp4"))
}

/// Succeeds for every id except `failing`, which fails with "bad codec".
fn succeed_except(failing: &'static str) -> impl Transcoder {
    FnTranscoder::new(move |item: &WorkItem| -> TranscodeFuture {
        let id = item.id.clone();
        Box::pin(async move {
            if id.as_str() == failing {
                Err(TranscodeError::failed("bad codec"))
            } else {
                Ok(output_for(id.as_str()))
            }
        })
    })
}

/// Blocks every transcode until a permit is released on the gate.
struct GatedTranscoder {
    gate: Arc<Semaphore>,
    running: Arc<AtomicUsize>,
    max_running: Arc<AtomicUsize>,
}

impl GatedTranscoder {
    fn new() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
            running: Arc::new(AtomicUsize::new(0)),
            max_running: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn handles(&self) -> (Arc<Semaphore>, Arc<AtomicUsize>) {
        (self.gate.clone(), self.max_running.clone())
    }
}

impl Transcoder for GatedTranscoder {
    fn transcode(&self, item: &WorkItem) -> TranscodeFuture {
        let gate = self.gate.clone();
        let running = self.running.clone();
        let max_running = self.max_running.clone();
        let id = item.id.clone();
        Box::pin(async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            max_running.fetch_max(now, Ordering::SeqCst);
            let permit = gate.acquire().await.map_err(|e| TranscodeError::failed(e.to_string()))?;
            permit.forget();
            running.fetch_sub(1, Ordering::SeqCst);
            Ok(output_for(id.as_str()))
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Success {
        id: JobId,
        output_path: String,
        variants: Vec<Variant>,
    },
    Failure {
        id: JobId,
        message: String,
    },
}

/// Persistence double that records every call.
#[derive(Clone, Default)]
struct RecordingPersistence {
    outcomes: Arc<Mutex<Vec<Outcome>>>,
    delay: Duration,
    fail: bool,
}

impl RecordingPersistence {
    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn outcomes(&self) -> Vec<Outcome> {
        self.outcomes.lock().clone()
    }

    fn push(&self, outcome: Outcome) -> PersistFuture {
        let outcomes = self.outcomes.clone();
        let delay = self.delay;
        let fail = self.fail;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            outcomes.lock().push(outcome);
            if fail {
                return Err(PersistenceError::Other("store unavailable".into()));
            }
            Ok(())
        })
    }
}

impl JobPersistence for RecordingPersistence {
    fn record_success(
        &self,
        id: JobId,
        output_path: String,
        variants: Vec<Variant>,
    ) -> PersistFuture {
        self.push(Outcome::Success {
            id,
            output_path,
            variants,
        })
    }

    fn record_failure(&self, id: JobId, message: String) -> PersistFuture {
        self.push(Outcome::Failure { id, message })
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn is_terminal(orchestrator: &Orchestrator, id: &str) -> bool {
    orchestrator
        .get_job_status(id)
        .is_some_and(|r| r.status.is_terminal())
}

#[tokio::test]
async fn test_unknown_id_is_absent() {
    let orchestrator =
        Orchestrator::new(OrchestratorConfig::new(1, 1), succeed_except(""), NoopPersistence)
            .unwrap();
    assert!(orchestrator.get_job_status("never-submitted").is_none());

    orchestrator.start().await.unwrap();
    orchestrator.add_job("a", request("a")).await;
    wait_until(|| is_terminal(&orchestrator, "a")).await;

    assert!(orchestrator.get_job_status("never-submitted").is_none());
    orchestrator.stop().await;
}

#[tokio::test]
async fn test_pending_until_started_and_dedup_keeps_created_at() {
    let orchestrator =
        Orchestrator::new(OrchestratorConfig::new(1, 4), succeed_except(""), NoopPersistence)
            .unwrap();

    orchestrator.add_job("a", request("a")).await;
    let first = orchestrator.get_job_status("a").unwrap();
    assert_eq!(first.status, JobStatus::Pending);
    assert!(first.started_at.is_none());

    orchestrator.add_job("a", request("a")).await;
    let second = orchestrator.get_job_status("a").unwrap();
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(orchestrator.list_jobs(None).len(), 1);
}

#[tokio::test]
async fn test_done_and_error_scenario() {
    let persistence = RecordingPersistence::default();
    let orchestrator = Orchestrator::new(
        OrchestratorConfig::new(2, 4),
        succeed_except("b"),
        persistence.clone(),
    )
    .unwrap();
    orchestrator.start().await.unwrap();

    for id in ["a", "b", "c"] {
        orchestrator.add_job(id, request(id)).await;
    }
    wait_until(|| ["a", "b", "c"].iter().all(|id| is_terminal(&orchestrator, id))).await;

    let b = orchestrator.get_job_status("b").unwrap();
    assert_eq!(b.status, JobStatus::Error);
    assert_eq!(b.error.as_deref(), Some("bad codec"));
    assert!(b.result.is_none());

    for id in ["a", "c"] {
        let record = orchestrator.get_job_status(id).unwrap();
        assert_eq!(record.status, JobStatus::Done);
        assert!(record.error.is_none());
        assert_eq!(record.result, Some(output_for(id)));

        let started = record.started_at.unwrap();
        let done = record.done_at.unwrap();
        assert!(started >= record.created_at);
        assert!(done >= started);
    }

    let stats = orchestrator.stats();
    assert_eq!((stats.done, stats.error, stats.total()), (2, 1, 3));

    orchestrator.stop().await;

    let mut outcomes = persistence.outcomes();
    outcomes.sort_by_key(|o| match o {
        Outcome::Success { id, .. } | Outcome::Failure { id, .. } => id.clone(),
    });
    assert_eq!(
        outcomes,
        vec![
            Outcome::Success {
                id: JobId::from("a"),
                output_path: "/out/a".into(),
                variants: output_for("a").variants,
            },
            Outcome::Failure {
                id: JobId::from("b"),
                message: "bad codec".into(),
            },
            Outcome::Success {
                id: JobId::from("c"),
                output_path: "/out/c".into(),
                variants: output_for("c").variants,
            },
        ]
    );
}

#[tokio::test]
async fn test_at_most_worker_count_jobs_processing() {
    let transcoder = GatedTranscoder::new();
    let (gate, max_running) = transcoder.handles();
    let orchestrator =
        Orchestrator::new(OrchestratorConfig::new(2, 4), transcoder, NoopPersistence).unwrap();
    orchestrator.start().await.unwrap();

    for id in ["a", "b", "c"] {
        orchestrator.add_job(id, request(id)).await;
    }
    wait_until(|| orchestrator.stats().processing == 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stats = orchestrator.stats();
    assert_eq!((stats.processing, stats.pending), (2, 1));
    assert_eq!(orchestrator.get_job_status("c").unwrap().status, JobStatus::Pending);

    // Freeing one worker lets the third job start
    gate.add_permits(1);
    wait_until(|| orchestrator.stats().done == 1).await;
    wait_until(|| orchestrator.get_job_status("c").unwrap().status == JobStatus::Processing).await;

    gate.add_permits(2);
    wait_until(|| orchestrator.stats().done == 3).await;
    assert_eq!(max_running.load(Ordering::SeqCst), 2);

    orchestrator.stop().await;
}

#[tokio::test]
async fn test_add_job_blocks_when_queue_full() {
    let orchestrator =
        Orchestrator::new(OrchestratorConfig::new(1, 1), succeed_except(""), NoopPersistence)
            .unwrap();

    orchestrator.add_job("a", request("a")).await;
    let blocked =
        tokio::time::timeout(Duration::from_millis(100), orchestrator.add_job("b", request("b")))
            .await;
    assert!(blocked.is_err());

    // Starting the pool frees space
    orchestrator.start().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), orchestrator.add_job("c", request("c")))
        .await
        .unwrap();
    wait_until(|| is_terminal(&orchestrator, "c")).await;
    orchestrator.stop().await;
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let transcoder = GatedTranscoder::new();
    let (gate, max_running) = transcoder.handles();
    let orchestrator =
        Orchestrator::new(OrchestratorConfig::new(1, 4), transcoder, NoopPersistence).unwrap();

    orchestrator.start().await.unwrap();
    orchestrator.start().await.unwrap();
    assert!(orchestrator.is_running().await);

    orchestrator.add_job("a", request("a")).await;
    orchestrator.add_job("b", request("b")).await;
    wait_until(|| orchestrator.stats().processing == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(orchestrator.stats().processing, 1);

    gate.add_permits(2);
    wait_until(|| orchestrator.stats().done == 2).await;
    assert_eq!(max_running.load(Ordering::SeqCst), 1);

    orchestrator.stop().await;
}

#[tokio::test]
async fn test_stop_without_start_is_noop() {
    let orchestrator =
        Orchestrator::new(OrchestratorConfig::new(2, 2), succeed_except(""), NoopPersistence)
            .unwrap();

    tokio::time::timeout(Duration::from_secs(1), orchestrator.stop())
        .await
        .unwrap();
    assert!(!orchestrator.is_running().await);

    // Still startable afterwards
    orchestrator.start().await.unwrap();
    orchestrator.add_job("a", request("a")).await;
    wait_until(|| is_terminal(&orchestrator, "a")).await;
    orchestrator.stop().await;
    orchestrator.stop().await;
    assert!(!orchestrator.is_running().await);
}

#[tokio::test]
async fn test_stop_waits_for_in_flight_job() {
    let persistence = RecordingPersistence::default();
    let transcoder = GatedTranscoder::new();
    let (gate, _) = transcoder.handles();
    let orchestrator = Arc::new(
        Orchestrator::new(OrchestratorConfig::new(1, 4), transcoder, persistence.clone()).unwrap(),
    );
    orchestrator.start().await.unwrap();

    orchestrator.add_job("a", request("a")).await;
    orchestrator.add_job("queued", request("queued")).await;
    wait_until(|| orchestrator.stats().processing == 1).await;

    let stopping = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.stop().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!stopping.is_finished());

    gate.add_permits(1);
    tokio::time::timeout(Duration::from_secs(5), stopping)
        .await
        .unwrap()
        .unwrap();

    // The in-flight job finished and was routed; the queued one never started
    assert_eq!(orchestrator.get_job_status("a").unwrap().status, JobStatus::Done);
    assert_eq!(
        orchestrator.get_job_status("queued").unwrap().status,
        JobStatus::Pending
    );
    assert_eq!(persistence.outcomes().len(), 1);
}

#[tokio::test]
async fn test_add_job_after_stop_returns() {
    let orchestrator =
        Orchestrator::new(OrchestratorConfig::new(1, 1), succeed_except(""), NoopPersistence)
            .unwrap();
    orchestrator.start().await.unwrap();
    orchestrator.stop().await;

    tokio::time::timeout(Duration::from_secs(1), async {
        orchestrator.add_job("late-1", request("late-1")).await;
        orchestrator.add_job("late-2", request("late-2")).await;
    })
    .await
    .unwrap();

    assert_eq!(
        orchestrator.get_job_status("late-1").unwrap().status,
        JobStatus::Pending
    );

    // Restarting a stopped orchestrator does nothing
    orchestrator.start().await.unwrap();
    assert!(!orchestrator.is_running().await);
}

#[tokio::test]
async fn test_routers_flush_buffered_outcomes_on_stop() {
    let delay = Duration::from_millis(200);
    let persistence = RecordingPersistence::slow(delay);
    let orchestrator = Orchestrator::new(
        OrchestratorConfig::new(4, 8).with_outcome_capacity(8),
        succeed_except("e"),
        persistence.clone(),
    )
    .unwrap();
    orchestrator.start().await.unwrap();

    let ids = ["a", "b", "c", "d", "e", "f"];
    let submitted = Instant::now();
    for id in ids {
        orchestrator.add_job(id, request(id)).await;
    }
    wait_until(|| ids.iter().all(|id| is_terminal(&orchestrator, id))).await;

    // Workers never wait on persistence: five successes alone take 5 x delay to persist
    assert!(submitted.elapsed() < delay * 3);
    assert!(persistence.outcomes().len() < ids.len());

    orchestrator.stop().await;

    let outcomes = persistence.outcomes();
    assert_eq!(outcomes.len(), ids.len());
    let failures = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::Failure { .. }))
        .count();
    assert_eq!(failures, 1);
}

#[tokio::test]
async fn test_persistence_errors_do_not_affect_jobs() {
    let persistence = RecordingPersistence::failing();
    let orchestrator = Orchestrator::new(
        OrchestratorConfig::new(2, 4),
        succeed_except("b"),
        persistence.clone(),
    )
    .unwrap();
    orchestrator.start().await.unwrap();

    for id in ["a", "b", "c", "d"] {
        orchestrator.add_job(id, request(id)).await;
    }
    wait_until(|| orchestrator.stats().done == 3 && orchestrator.stats().error == 1).await;
    orchestrator.stop().await;

    assert_eq!(persistence.outcomes().len(), 4);
    assert_eq!(orchestrator.get_job_status("a").unwrap().status, JobStatus::Done);
    assert_eq!(
        orchestrator.get_job_status("b").unwrap().error.as_deref(),
        Some("bad codec")
    );
}

#[tokio::test]
async fn test_resubmitting_finished_job_runs_it_again() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let transcoder = FnTranscoder::new(move |item: &WorkItem| -> TranscodeFuture {
        counter.fetch_add(1, Ordering::SeqCst);
        let id = item.id.clone();
        Box::pin(async move { Ok(output_for(id.as_str())) })
    });
    let orchestrator =
        Orchestrator::new(OrchestratorConfig::new(1, 2), transcoder, NoopPersistence).unwrap();
    orchestrator.start().await.unwrap();

    orchestrator.add_job("a", request("a")).await;
    wait_until(|| calls.load(Ordering::SeqCst) == 1 && is_terminal(&orchestrator, "a")).await;
    let created_at = orchestrator.get_job_status("a").unwrap().created_at;

    orchestrator.add_job("a", request("a")).await;
    wait_until(|| calls.load(Ordering::SeqCst) == 2 && is_terminal(&orchestrator, "a")).await;

    let record = orchestrator.get_job_status("a").unwrap();
    assert_eq!(record.created_at, created_at);
    assert_eq!(record.status, JobStatus::Done);
    assert_eq!(orchestrator.list_jobs(None).len(), 1);

    orchestrator.stop().await;
}

#[test]
fn test_invalid_config_is_rejected() {
    let result = Orchestrator::new(
        OrchestratorConfig::new(0, 4),
        succeed_except(""),
        NoopPersistence,
    );
    assert!(matches!(result, Err(OrchestratorError::Config(_))));

    let result = Orchestrator::new(
        OrchestratorConfig::new(2, 0),
        succeed_except(""),
        NoopPersistence,
    );
    assert!(matches!(result, Err(OrchestratorError::Config(_))));
}

#[tokio::test]
async fn test_panicking_transcode_fails_job_and_keeps_worker() {
    let persistence = RecordingPersistence::default();
    let transcoder = FnTranscoder::new(|item: &WorkItem| -> TranscodeFuture {
        let id = item.id.clone();
        if id.as_str() == "early" {
            panic!("panicked before returning a future");
        }
        Box::pin(async move {
            if id.as_str() == "late" {
                panic!("decoder crashed");
            }
            Ok(output_for(id.as_str()))
        })
    });
    let orchestrator =
        Orchestrator::new(OrchestratorConfig::new(1, 4), transcoder, persistence.clone()).unwrap();
    orchestrator.start().await.unwrap();

    for id in ["late", "early", "after"] {
        orchestrator.add_job(id, request(id)).await;
    }
    wait_until(|| ["late", "early", "after"].iter().all(|id| is_terminal(&orchestrator, id))).await;

    let late = orchestrator.get_job_status("late").unwrap();
    assert_eq!(late.status, JobStatus::Error);
    assert_eq!(late.error.as_deref(), Some("transcode panicked: decoder crashed"));
    assert!(late.result.is_none());

    let early = orchestrator.get_job_status("early").unwrap();
    assert_eq!(early.status, JobStatus::Error);
    assert_eq!(
        early.error.as_deref(),
        Some("transcode panicked: panicked before returning a future")
    );

    // The single worker survived both panics
    assert_eq!(orchestrator.get_job_status("after").unwrap().status, JobStatus::Done);

    orchestrator.stop().await;
    let failures = persistence
        .outcomes()
        .into_iter()
        .filter(|o| matches!(o, Outcome::Failure { .. }))
        .count();
    assert_eq!(failures, 2);
}
