//! Single-flight query execution.
//!
//! Every submission is tagged with a sequence number taken under the control lock. A
//! completion may only write [`ExecutorState`] while its number is still the latest, so a
//! superseded request settling late is dropped instead of overwriting newer state. Live
//! requests are never cancelled; their results are just ignored.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::ResearchBackend;
use crate::events::{CacheKey, InvalidationBus};
use crate::fixtures;
use crate::intent::{classify, CanonicalKey};
use crate::models::{QueryRequest, QueryResult};
use crate::Result;

/// Where submissions are answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Canned fixture responses after a fixed delay.
    Simulated,
    /// The research backend.
    Live,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Simulated => "simulated",
            Mode::Live => "live",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Mode::Simulated => Mode::Live,
            Mode::Live => Mode::Simulated,
        }
    }
}

/// A settled answer together with what produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SettledQuery {
    pub question: String,
    /// Fixture key for simulated answers; `None` for live ones.
    pub key: Option<CanonicalKey>,
    pub result: QueryResult,
}

/// Lifecycle of the authoritative submission.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutorState {
    Idle,
    Pending,
    Settled(Arc<SettledQuery>),
    Failed(String),
}

impl ExecutorState {
    pub fn is_pending(&self) -> bool {
        matches!(self, ExecutorState::Pending)
    }

    pub fn settled(&self) -> Option<&Arc<SettledQuery>> {
        match self {
            ExecutorState::Settled(settled) => Some(settled),
            _ => None,
        }
    }
}

/// How a submission's completion was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The outcome became the executor state.
    Applied,
    /// A newer submission, mode switch or reset superseded it; the outcome was dropped.
    Superseded,
}

/// Handle to an in-flight submission.
#[derive(Debug)]
pub struct Submission {
    seq: u64,
    handle: JoinHandle<Completion>,
}

impl Submission {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Wait for the submission to finish.
    pub async fn wait(self) -> Completion {
        match self.handle.await {
            Ok(completion) => completion,
            Err(e) => {
                error!(seq = self.seq, error = %e, "Query task aborted");
                Completion::Superseded
            }
        }
    }
}

#[derive(Debug)]
struct Control {
    seq: u64,
    mode: Mode,
}

struct Inner {
    backend: Arc<dyn ResearchBackend>,
    bus: InvalidationBus,
    simulated_latency: Duration,
    control: Mutex<Control>,
    state: watch::Sender<ExecutorState>,
}

/// Owns the query lifecycle. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct QueryExecutor {
    inner: Arc<Inner>,
}

impl QueryExecutor {
    pub fn new(
        backend: Arc<dyn ResearchBackend>,
        bus: InvalidationBus,
        simulated_latency: Duration,
        mode: Mode,
    ) -> Self {
        let (state, _) = watch::channel(ExecutorState::Idle);
        Self {
            inner: Arc::new(Inner {
                backend,
                bus,
                simulated_latency,
                control: Mutex::new(Control { seq: 0, mode }),
                state,
            }),
        }
    }

    pub fn state(&self) -> ExecutorState {
        self.inner.state.borrow().clone()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ExecutorState> {
        self.inner.state.subscribe()
    }

    pub fn mode(&self) -> Mode {
        self.inner.lock().mode
    }

    /// Submit a request, superseding whatever was in flight.
    ///
    /// In simulated mode `key` picks the fixture directly; without it the question is
    /// classified. Live mode ignores `key`. Must be called within a Tokio runtime.
    pub fn submit(&self, request: QueryRequest, key: Option<CanonicalKey>) -> Submission {
        let (seq, mode) = {
            let mut control = self.inner.lock();
            control.seq += 1;
            self.inner.state.send_replace(ExecutorState::Pending);
            (control.seq, control.mode)
        };
        info!(seq, ?mode, question = request.question(), "Submitting query");

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let outcome = inner.execute(mode, &request, key).await;
            inner.complete(seq, outcome)
        });

        Submission { seq, handle }
    }

    /// Switch mode. Any pending submission is discarded and the executor returns to idle.
    pub fn set_mode(&self, mode: Mode) -> bool {
        let mut control = self.inner.lock();
        if control.mode == mode {
            return false;
        }
        control.mode = mode;
        control.seq += 1;
        self.inner.state.send_replace(ExecutorState::Idle);
        info!(?mode, "Switched query mode");
        true
    }

    pub fn toggle_mode(&self) -> Mode {
        let next = self.mode().toggled();
        self.set_mode(next);
        next
    }

    /// Drop any result or pending submission and return to idle.
    pub fn reset(&self) {
        let mut control = self.inner.lock();
        control.seq += 1;
        self.inner.state.send_replace(ExecutorState::Idle);
    }

    /// Dismiss a failure banner. Other states are left alone.
    pub fn dismiss_error(&self) {
        let _control = self.inner.lock();
        self.inner.state.send_if_modified(|state| {
            if matches!(state, ExecutorState::Failed(_)) {
                *state = ExecutorState::Idle;
                true
            } else {
                false
            }
        });
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn execute(
        &self,
        mode: Mode,
        request: &QueryRequest,
        key: Option<CanonicalKey>,
    ) -> Result<SettledQuery> {
        let question = request.question().to_string();
        match mode {
            Mode::Simulated => {
                tokio::time::sleep(self.simulated_latency).await;
                let key = key.unwrap_or_else(|| classify(&question));
                Ok(SettledQuery {
                    question,
                    key: Some(key),
                    result: fixtures::response(key),
                })
            }
            Mode::Live => {
                let result = self.backend.query(request).await?;
                Ok(SettledQuery {
                    question,
                    key: None,
                    result,
                })
            }
        }
    }

    fn complete(&self, seq: u64, outcome: Result<SettledQuery>) -> Completion {
        let control = self.lock();
        if control.seq != seq {
            debug!(seq, latest = control.seq, "Ignoring stale completion");
            return Completion::Superseded;
        }

        match outcome {
            Ok(settled) => {
                info!(
                    seq,
                    key = settled.key.map(|k| k.as_str()),
                    sources = settled.result.sources.len(),
                    "Query settled"
                );
                self.state.send_replace(ExecutorState::Settled(Arc::new(settled)));
                drop(control);
                self.bus.invalidate_all(&[CacheKey::QueryHistory, CacheKey::Metrics]);
            }
            Err(e) => {
                warn!(seq, error = %e, "Query failed");
                self.state.send_replace(ExecutorState::Failed(e.to_string()));
            }
        }
        Completion::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::oneshot;

    /// Backend whose answers are released by the test, per question.
    #[derive(Default)]
    struct ScriptedBackend {
        gates: Mutex<HashMap<String, oneshot::Receiver<Result<QueryResult>>>>,
    }

    impl ScriptedBackend {
        fn gate(&self, question: &str) -> oneshot::Sender<Result<QueryResult>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(question.to_string(), rx);
            tx
        }
    }

    #[async_trait]
    impl ResearchBackend for ScriptedBackend {
        async fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
            let gate = self.gates.lock().unwrap().remove(request.question());
            match gate {
                Some(rx) => rx.await.unwrap_or_else(|_| Err(Error::Transport("gate dropped".into()))),
                None => Err(Error::Transport("no scripted answer".into())),
            }
        }
    }

    fn answer(text: &str) -> QueryResult {
        let mut result = fixtures::response(CanonicalKey::Default);
        result.answer = text.to_string();
        result
    }

    fn executor(backend: Arc<ScriptedBackend>, mode: Mode) -> (QueryExecutor, InvalidationBus) {
        let bus = InvalidationBus::default();
        let executor = QueryExecutor::new(backend, bus.clone(), Duration::from_millis(5), mode);
        (executor, bus)
    }

    fn request(question: &str) -> QueryRequest {
        QueryRequest::question_only(question).unwrap()
    }

    fn settled_answer(executor: &QueryExecutor) -> String {
        executor.state().settled().expect("settled").result.answer.clone()
    }

    #[tokio::test]
    async fn test_starts_idle() {
        let (executor, _) = executor(Arc::default(), Mode::Simulated);
        assert_eq!(executor.state(), ExecutorState::Idle);
        assert_eq!(executor.mode(), Mode::Simulated);
    }

    #[tokio::test]
    async fn test_simulated_classifies_question() {
        let (executor, _) = executor(Arc::default(), Mode::Simulated);
        let submission = executor.submit(request("How do GLP-1 agonists change cardiovascular risk?"), None);
        assert!(executor.state().is_pending());
        assert_eq!(submission.wait().await, Completion::Applied);

        let state = executor.state();
        let settled = state.settled().unwrap();
        assert_eq!(settled.key, Some(CanonicalKey::Glp1Cv));
        assert_eq!(settled.result, fixtures::response(CanonicalKey::Glp1Cv));
    }

    #[tokio::test]
    async fn test_simulated_override_key_skips_classification() {
        let (executor, _) = executor(Arc::default(), Mode::Simulated);
        let question = "Compare GLP-1 receptor agonists and SGLT2 inhibitors for type 2 diabetes.";
        executor
            .submit(request(question), Some(CanonicalKey::CompareTreatments))
            .wait()
            .await;
        assert_eq!(executor.state().settled().unwrap().key, Some(CanonicalKey::CompareTreatments));
    }

    #[tokio::test]
    async fn test_later_submission_wins_when_earlier_settles_last() {
        let backend = Arc::new(ScriptedBackend::default());
        let release_a = backend.gate("A");
        let release_b = backend.gate("B");
        let (executor, _) = executor(backend, Mode::Live);

        let a = executor.submit(request("A"), None);
        let b = executor.submit(request("B"), None);
        assert!(b.seq() > a.seq());

        release_b.send(Ok(answer("answer B"))).unwrap();
        assert_eq!(b.wait().await, Completion::Applied);
        assert_eq!(settled_answer(&executor), "answer B");

        release_a.send(Ok(answer("answer A"))).unwrap();
        assert_eq!(a.wait().await, Completion::Superseded);
        assert_eq!(settled_answer(&executor), "answer B");
    }

    #[tokio::test]
    async fn test_stale_failure_is_ignored() {
        let backend = Arc::new(ScriptedBackend::default());
        let release_a = backend.gate("A");
        let release_b = backend.gate("B");
        let (executor, _) = executor(backend, Mode::Live);

        let a = executor.submit(request("A"), None);
        let b = executor.submit(request("B"), None);
        release_a.send(Err(Error::Transport("timeout".into()))).unwrap();
        assert_eq!(a.wait().await, Completion::Superseded);
        assert!(executor.state().is_pending());

        release_b.send(Ok(answer("answer B"))).unwrap();
        b.wait().await;
        assert_eq!(settled_answer(&executor), "answer B");
    }

    #[tokio::test]
    async fn test_live_failure_reported_without_invalidation() {
        let backend = Arc::new(ScriptedBackend::default());
        let release = backend.gate("Q");
        let (executor, bus) = executor(backend, Mode::Live);
        let mut invalidations = bus.subscribe();

        let submission = executor.submit(request("Q"), None);
        release.send(Err(Error::Backend { status: 502, message: "bad gateway".into() })).unwrap();
        assert_eq!(submission.wait().await, Completion::Applied);

        match executor.state() {
            ExecutorState::Failed(reason) => assert!(reason.contains("bad gateway")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(invalidations.try_recv().is_err());

        executor.dismiss_error();
        assert_eq!(executor.state(), ExecutorState::Idle);
    }

    #[tokio::test]
    async fn test_settle_invalidates_history_and_metrics() {
        let (executor, bus) = executor(Arc::default(), Mode::Simulated);
        let mut invalidations = bus.subscribe();
        executor.submit(request("Hello"), None).wait().await;

        assert_eq!(invalidations.recv().await.unwrap(), CacheKey::QueryHistory);
        assert_eq!(invalidations.recv().await.unwrap(), CacheKey::Metrics);
    }

    #[tokio::test]
    async fn test_mode_switch_discards_pending() {
        let backend = Arc::new(ScriptedBackend::default());
        let release = backend.gate("Q");
        let (executor, _) = executor(backend, Mode::Live);

        let submission = executor.submit(request("Q"), None);
        assert!(executor.set_mode(Mode::Simulated));
        assert_eq!(executor.state(), ExecutorState::Idle);

        release.send(Ok(answer("late"))).unwrap();
        assert_eq!(submission.wait().await, Completion::Superseded);
        assert_eq!(executor.state(), ExecutorState::Idle);
        assert!(!executor.set_mode(Mode::Simulated));
    }

    #[tokio::test]
    async fn test_resubmit_from_settled_goes_pending() {
        let (executor, _) = executor(Arc::default(), Mode::Simulated);
        executor.submit(request("Hello"), None).wait().await;
        assert!(executor.state().settled().is_some());

        let next = executor.submit(request("Any limitation?"), None);
        assert!(executor.state().is_pending());
        next.wait().await;
        assert_eq!(executor.state().settled().unwrap().key, Some(CanonicalKey::LimitationsOnly));
    }

    #[tokio::test]
    async fn test_reset_discards_pending() {
        let (executor, _) = executor(Arc::default(), Mode::Simulated);
        let submission = executor.submit(request("Hello"), None);
        executor.reset();
        assert_eq!(submission.wait().await, Completion::Superseded);
        assert_eq!(executor.state(), ExecutorState::Idle);
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let (executor, _) = executor(Arc::default(), Mode::Simulated);
        let rx = executor.subscribe();
        let submission = executor.submit(request("Hello"), None);
        assert!(rx.has_changed().unwrap());
        submission.wait().await;
        assert!(rx.borrow().settled().is_some());
    }
}
