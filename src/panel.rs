use crate::error::RecordingError;
use crate::messages::{PanelState, RecordingKind, RecordingRequest};
use crate::transport::RecordingTransport;
use crate::view::PanelView;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Properties supplied by whoever embeds the panel
#[derive(Debug, Clone, Default)]
pub struct PanelProps {
    pub url: String,
    pub kind: RecordingKind,
    /// Text shown in the preview pane, owned by the caller
    pub code: String,
}

impl PanelProps {
    pub fn new(url: impl Into<String>, recording_type: &str, code: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: RecordingKind::from_type(recording_type),
            code: code.into(),
        }
    }
}

/// How a recording session ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The completion handler received the journey code
    Completed,
    /// The session was stopped or replaced before the worker answered
    Superseded,
}

type DoneHandler = dyn Fn(String) + Send + Sync;

struct Inner<T> {
    transport: T,
    state: watch::Sender<PanelState>,
    session: AtomicU64,
    timeout: Option<Duration>,
    on_recording_done: Box<DoneHandler>,
}

/// The record button and its state
///
/// Cloning yields another handle to the same panel.
pub struct Panel<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Panel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// A start request that is waiting on the worker
pub struct PendingRecording {
    session_id: u64,
    handle: JoinHandle<Result<SessionOutcome, RecordingError>>,
}

impl PendingRecording {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub async fn wait(self) -> Result<SessionOutcome, RecordingError> {
        self.handle.await.map_err(|e| {
            RecordingError::WorkerUnavailable(format!("Recording task failed: {}", e))
        })?
    }
}

impl<T: RecordingTransport + 'static> Panel<T> {
    pub fn new(
        transport: T,
        timeout: Option<Duration>,
        on_recording_done: impl Fn(String) + Send + Sync + 'static,
    ) -> Self {
        let (state, _) = watch::channel(PanelState::Idle);
        Self {
            inner: Arc::new(Inner {
                transport,
                state,
                session: AtomicU64::new(0),
                timeout,
                on_recording_done: Box::new(on_recording_done),
            }),
        }
    }

    pub fn state(&self) -> PanelState {
        *self.inner.state.borrow()
    }

    pub fn button_label(&self) -> &'static str {
        self.state().button_label()
    }

    pub fn subscribe(&self) -> watch::Receiver<PanelState> {
        self.inner.state.subscribe()
    }

    pub fn view<'a>(&self, props: &'a PanelProps) -> PanelView<'a> {
        PanelView::new(self.state(), &props.code)
    }

    /// Handle a click on the record button.
    ///
    /// The state flips before this returns. When a recording starts, the
    /// returned [`PendingRecording`] resolves once the worker answers; the
    /// state is back to idle before the completion handler runs.
    pub fn on_record(&self, props: &PanelProps) -> Option<PendingRecording> {
        let (previous, session_id) = self.toggle();
        tracing::debug!("on_record: previous state = {:?}", previous);

        match previous {
            PanelState::Recording => {
                tracing::info!("Stopping recording");
                self.inner.transport.stop_recording();
                None
            }
            PanelState::Idle => Some(self.start(props, session_id)),
        }
    }

    /// Flip the state and open a new session id under one watch lock, so
    /// concurrent clicks from cloned handles always alternate.
    ///
    /// Bumping the id on stop makes any response still in flight stale.
    fn toggle(&self) -> (PanelState, u64) {
        let mut previous = PanelState::Idle;
        let mut session_id = 0;

        self.inner.state.send_modify(|state| {
            previous = *state;
            session_id = self.inner.session.fetch_add(1, Ordering::SeqCst) + 1;
            *state = match previous {
                PanelState::Idle => PanelState::Recording,
                PanelState::Recording => PanelState::Idle,
            };
        });

        (previous, session_id)
    }

    fn start(&self, props: &PanelProps, session_id: u64) -> PendingRecording {
        let request = RecordingRequest::new(props.url.clone(), props.kind);
        tracing::info!("Starting recording session {}", session_id);

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { inner.run_session(session_id, request).await });

        PendingRecording { session_id, handle }
    }
}

impl<T: RecordingTransport> Inner<T> {
    async fn run_session(
        &self,
        session_id: u64,
        request: RecordingRequest,
    ) -> Result<SessionOutcome, RecordingError> {
        tracing::debug!(
            "Session {}: record-journey {} (suite: {})",
            session_id,
            request.url,
            request.is_suite
        );

        let result = match self.timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.transport.start_recording(request)).await {
                    Ok(result) => result,
                    Err(_) => {
                        if self.is_current(session_id) {
                            tracing::warn!("Session {} timed out, stopping worker", session_id);
                            self.transport.stop_recording();
                        }
                        Err(RecordingError::Timeout(limit.as_secs()))
                    }
                }
            }
            None => self.transport.start_recording(request).await,
        };

        if !self.finish(session_id) {
            tracing::debug!("Ignoring response for superseded session {}", session_id);
            return Ok(SessionOutcome::Superseded);
        }

        match result {
            Ok(code) => {
                tracing::info!(
                    "Session {} complete: {} chars of journey code",
                    session_id,
                    code.len()
                );
                (self.on_recording_done)(code);
                Ok(SessionOutcome::Completed)
            }
            Err(e) => {
                tracing::error!("Session {} failed: {}", session_id, e);
                Err(e)
            }
        }
    }

    fn is_current(&self, session_id: u64) -> bool {
        self.session.load(Ordering::SeqCst) == session_id
    }

    /// Return to idle if `session_id` is still the in-flight session.
    fn finish(&self, session_id: u64) -> bool {
        self.state.send_if_modified(|state| {
            if *state == PanelState::Recording && self.is_current(session_id) {
                *state = PanelState::Idle;
                true
            } else {
                false
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::{mpsc, oneshot};

    type Call = (RecordingRequest, oneshot::Sender<Result<String, RecordingError>>);

    /// Transport whose responses are driven by the test
    struct FakeTransport {
        calls: mpsc::UnboundedSender<Call>,
        stops: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RecordingTransport for FakeTransport {
        async fn start_recording(
            &self,
            request: RecordingRequest,
        ) -> Result<String, RecordingError> {
            let (reply, rx) = oneshot::channel();
            self.calls.send((request, reply)).unwrap();
            rx.await
                .unwrap_or_else(|_| Err(RecordingError::WorkerUnavailable("dropped".into())))
        }

        fn stop_recording(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        panel: Panel<FakeTransport>,
        calls: mpsc::UnboundedReceiver<Call>,
        stops: Arc<AtomicUsize>,
        /// Journey code plus the panel state seen by the handler
        done: Arc<Mutex<Vec<(String, PanelState)>>>,
    }

    fn harness(timeout: Option<Duration>) -> Harness {
        let (tx, calls) = mpsc::unbounded_channel();
        let stops = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(Mutex::new(Vec::new()));
        let state_rx: Arc<Mutex<Option<watch::Receiver<PanelState>>>> =
            Arc::new(Mutex::new(None));

        let handler_done = Arc::clone(&done);
        let handler_state = Arc::clone(&state_rx);
        let panel = Panel::new(
            FakeTransport {
                calls: tx,
                stops: Arc::clone(&stops),
            },
            timeout,
            move |code| {
                let state = handler_state
                    .lock()
                    .unwrap()
                    .as_ref()
                    .map(|rx| *rx.borrow())
                    .unwrap();
                handler_done.lock().unwrap().push((code, state));
            },
        );
        *state_rx.lock().unwrap() = Some(panel.subscribe());

        Harness {
            panel,
            calls,
            stops,
            done,
        }
    }

    #[tokio::test]
    async fn test_start_flips_state_before_worker_responds() {
        let mut h = harness(None);
        let props = PanelProps::new("https://example.com", "inline", "");

        let pending = h.panel.on_record(&props);

        assert!(pending.is_some());
        assert_eq!(h.panel.state(), PanelState::Recording);
        assert_eq!(h.panel.button_label(), "Stop Recording");

        // Worker has not answered yet
        let (_request, _reply) = h.calls.recv().await.unwrap();
        assert_eq!(h.panel.state(), PanelState::Recording);
    }

    #[tokio::test]
    async fn test_suite_recording_scenario() {
        let mut h = harness(None);
        let props = PanelProps::new("https://example.com", "suite", "");

        let pending = h.panel.on_record(&props).unwrap();
        let (request, reply) = h.calls.recv().await.unwrap();
        assert_eq!(
            request,
            RecordingRequest {
                url: "https://example.com".to_string(),
                is_suite: true,
            }
        );

        reply.send(Ok("// generated code".to_string())).unwrap();
        assert_eq!(pending.wait().await.unwrap(), SessionOutcome::Completed);

        assert_eq!(
            *h.done.lock().unwrap(),
            vec![("// generated code".to_string(), PanelState::Idle)]
        );
        assert_eq!(h.panel.button_label(), "Start Recording");
    }

    #[tokio::test]
    async fn test_journey_type_is_not_suite() {
        let mut h = harness(None);
        let props = PanelProps::new("https://elastic.co/?q=a b", "inline", "");

        let _pending = h.panel.on_record(&props).unwrap();
        let (request, _reply) = h.calls.recv().await.unwrap();

        assert_eq!(request.url, "https://elastic.co/?q=a b");
        assert!(!request.is_suite);
    }

    #[tokio::test]
    async fn test_stop_sends_one_cancellation_immediately() {
        let mut h = harness(None);
        let props = PanelProps::new("https://example.com", "inline", "");

        let pending = h.panel.on_record(&props).unwrap();
        let (_request, reply) = h.calls.recv().await.unwrap();

        assert!(h.panel.on_record(&props).is_none());
        assert_eq!(h.stops.load(Ordering::SeqCst), 1);
        assert_eq!(h.panel.state(), PanelState::Idle);

        reply.send(Err(RecordingError::Cancelled)).unwrap();
        assert_eq!(pending.wait().await.unwrap(), SessionOutcome::Superseded);
        assert!(h.done.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_late_response_after_stop_is_ignored() {
        let mut h = harness(None);
        let props = PanelProps::new("https://example.com", "inline", "");

        let pending = h.panel.on_record(&props).unwrap();
        let (_request, reply) = h.calls.recv().await.unwrap();
        h.panel.on_record(&props);

        reply.send(Ok("late".to_string())).unwrap();

        assert_eq!(pending.wait().await.unwrap(), SessionOutcome::Superseded);
        assert!(h.done.lock().unwrap().is_empty());
        assert_eq!(h.panel.state(), PanelState::Idle);
    }

    #[tokio::test]
    async fn test_stale_response_does_not_end_new_session() {
        let mut h = harness(None);
        let props = PanelProps::new("https://example.com", "inline", "");

        let first = h.panel.on_record(&props).unwrap();
        let (_request, first_reply) = h.calls.recv().await.unwrap();
        h.panel.on_record(&props);

        let second = h.panel.on_record(&props).unwrap();
        assert_ne!(first.session_id(), second.session_id());
        let (_request, second_reply) = h.calls.recv().await.unwrap();

        first_reply.send(Ok("old".to_string())).unwrap();
        assert_eq!(first.wait().await.unwrap(), SessionOutcome::Superseded);
        assert_eq!(h.panel.state(), PanelState::Recording);

        second_reply.send(Ok("new".to_string())).unwrap();
        assert_eq!(second.wait().await.unwrap(), SessionOutcome::Completed);
        assert_eq!(
            *h.done.lock().unwrap(),
            vec![("new".to_string(), PanelState::Idle)]
        );
    }

    #[tokio::test]
    async fn test_worker_error_resets_and_surfaces() {
        let mut h = harness(None);
        let props = PanelProps::new("https://example.com", "inline", "");

        let pending = h.panel.on_record(&props).unwrap();
        let (_request, reply) = h.calls.recv().await.unwrap();
        reply.send(Err(RecordingError::EmptyArtifact)).unwrap();

        let err = pending.wait().await.unwrap_err();
        assert!(matches!(err, RecordingError::EmptyArtifact));
        assert_eq!(h.panel.state(), PanelState::Idle);
        assert!(h.done.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_stops_worker() {
        let mut h = harness(Some(Duration::from_millis(50)));
        let props = PanelProps::new("https://example.com", "inline", "");

        let pending = h.panel.on_record(&props).unwrap();
        // Hold the reply so the worker never answers
        let (_request, _reply) = h.calls.recv().await.unwrap();

        let err = pending.wait().await.unwrap_err();
        assert!(matches!(err, RecordingError::Timeout(_)));
        assert_eq!(h.stops.load(Ordering::SeqCst), 1);
        assert_eq!(h.panel.state(), PanelState::Idle);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_clicks_alternate() {
        let runtime = tokio::runtime::Handle::current();

        for _ in 0..200 {
            let h = harness(None);
            let props = PanelProps::new("https://example.com", "inline", "");
            let barrier = std::sync::Barrier::new(2);

            let started = std::thread::scope(|scope| {
                let clicks: Vec<_> = (0..2)
                    .map(|_| {
                        let panel = h.panel.clone();
                        let (props, barrier, runtime) = (&props, &barrier, &runtime);
                        scope.spawn(move || {
                            let _guard = runtime.enter();
                            barrier.wait();
                            panel.on_record(props).is_some()
                        })
                    })
                    .collect();

                clicks
                    .into_iter()
                    .map(|click| click.join().unwrap())
                    .filter(|started| *started)
                    .count()
            });

            assert_eq!(started, 1);
            assert_eq!(h.stops.load(Ordering::SeqCst), 1);
            assert_eq!(h.panel.state(), PanelState::Idle);
        }
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let mut h = harness(None);
        let mut state_rx = h.panel.subscribe();
        let props = PanelProps::new("https://example.com", "inline", "");

        let pending = h.panel.on_record(&props).unwrap();
        state_rx.changed().await.unwrap();
        assert_eq!(*state_rx.borrow_and_update(), PanelState::Recording);

        let (_request, reply) = h.calls.recv().await.unwrap();
        reply.send(Ok("code".to_string())).unwrap();
        pending.wait().await.unwrap();

        state_rx.changed().await.unwrap();
        assert_eq!(*state_rx.borrow_and_update(), PanelState::Idle);
    }
}
