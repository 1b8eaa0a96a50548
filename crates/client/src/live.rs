//! Live capture pipeline.
//!
//! [`LiveCapture`] records from a [`MediaSource`] in fixed-interval
//! chunks, hands each chunk to the [`LiveBackend`] without waiting for
//! it, stops on request or after a maximum duration and then fetches
//! one consolidated result. State is published through a
//! [`watch`] of [`RecorderView`]; lifecycle events go out on a
//! [`broadcast`] channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use speedtrap_core::error::PipelineError;
use speedtrap_core::progress::ProgressProfile;
use speedtrap_core::recorder::{RecorderInput, RecorderState, RecorderView};

use crate::backend::{LiveBackend, MediaChunk};
use crate::events::{CaptureEvent, EVENT_CHANNEL_CAPACITY};
use crate::progress::ProgressTicker;
use crate::source::{ChunkPoll, MediaSource, MediaStream};

/// Shown when the media source cannot be acquired or dies mid-recording.
pub const STREAM_FAILED_MESSAGE: &str = "Could not access video feed. Please try again.";

/// Shown when the consolidated result cannot be fetched.
pub const ANALYSIS_FAILED_MESSAGE: &str = "An error occurred during analysis. Please try again.";

/// How long [`LiveCapture::shutdown`] waits for the session task.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Timing of a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveSettings {
    /// Interval between chunks handed to the backend.
    pub chunk_interval: Duration,
    /// Recording stops on its own after this long.
    pub max_duration: Duration,
    /// Simulated progress while the result is fetched.
    pub progress: ProgressProfile,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            chunk_interval: Duration::from_secs(1),
            max_duration: Duration::from_secs(10),
            progress: ProgressProfile::LIVE_RESULT,
        }
    }
}

/// Why recording ended.
#[derive(Debug)]
enum StopReason {
    Manual,
    MaxDuration,
    StreamEnded,
    StreamFailed(PipelineError),
    Teardown,
}

struct Shared {
    backend: Arc<dyn LiveBackend>,
    settings: LiveSettings,
    view_tx: watch::Sender<RecorderView>,
    event_tx: broadcast::Sender<CaptureEvent>,
}

impl Shared {
    /// Apply a recorder transition and announce it. Rejected transitions
    /// leave the view untouched.
    fn transition(
        &self,
        session_id: Uuid,
        f: impl FnOnce(&mut RecorderView) -> Result<RecorderState, PipelineError>,
    ) -> Result<RecorderState, PipelineError> {
        let mut outcome = None;
        self.view_tx.send_if_modified(|view| {
            let result = f(view);
            let applied = result.is_ok();
            outcome = Some(result);
            applied
        });
        let state = outcome.unwrap_or(Err(PipelineError::Unknown(
            "recorder transition did not run".to_string(),
        )))?;

        tracing::info!(%session_id, state = %state, "Recorder state changed");
        let _ = self
            .event_tx
            .send(CaptureEvent::StateChanged { session_id, state });
        Ok(state)
    }

    fn state(&self) -> RecorderState {
        self.view_tx.borrow().state
    }
}

struct ActiveSession {
    id: Uuid,
    stop: CancellationToken,
    teardown: CancellationToken,
    handle: JoinHandle<()>,
}

/// Records a live feed and collects one consolidated analysis result.
pub struct LiveCapture {
    source: Arc<dyn MediaSource>,
    shared: Arc<Shared>,
    session: Mutex<Option<ActiveSession>>,
    /// Master token; every session token is a child of it.
    cancel: CancellationToken,
}

impl LiveCapture {
    pub fn new(
        source: Arc<dyn MediaSource>,
        backend: Arc<dyn LiveBackend>,
        settings: LiveSettings,
    ) -> Self {
        let (view_tx, _) = watch::channel(RecorderView::default());
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            source,
            shared: Arc::new(Shared {
                backend,
                settings,
                view_tx,
                event_tx,
            }),
            session: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.shared.event_tx.subscribe()
    }

    pub fn watch_view(&self) -> watch::Receiver<RecorderView> {
        self.shared.view_tx.subscribe()
    }

    pub fn view(&self) -> RecorderView {
        self.shared.view_tx.borrow().clone()
    }

    /// Acquire the media source and start recording.
    ///
    /// Only valid from idle; a finished session must be [`reset`](Self::reset)
    /// first. If the source cannot be acquired the recorder moves to
    /// error and the [`PipelineError::Connection`] is returned.
    pub async fn start(&self) -> Result<Uuid, PipelineError> {
        let mut session = self.session.lock().await;
        if self.shared.state() != RecorderState::Idle {
            return Err(PipelineError::Busy("live capture"));
        }
        if let Some(previous) = session.take() {
            // Finished sessions only linger until the next start.
            previous.teardown.cancel();
        }

        let session_id = Uuid::new_v4();
        let stream = match self.source.acquire().await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(%session_id, error = %e, "Failed to acquire media source");
                self.shared.transition(session_id, |view| {
                    view.fail(RecorderInput::StreamFailed, STREAM_FAILED_MESSAGE)
                })?;
                return Err(match e {
                    PipelineError::Connection(_) => e,
                    other => PipelineError::Connection(other.to_string()),
                });
            }
        };

        self.shared
            .transition(session_id, |view| view.apply(RecorderInput::Start))?;

        let teardown = self.cancel.child_token();
        let stop = teardown.child_token();
        let shared = Arc::clone(&self.shared);
        let (stop_clone, teardown_clone) = (stop.clone(), teardown.clone());

        let handle = tokio::spawn(async move {
            run_session(shared, session_id, stream, stop_clone, teardown_clone).await;
        });

        *session = Some(ActiveSession {
            id: session_id,
            stop,
            teardown,
            handle,
        });
        Ok(session_id)
    }

    /// Stop recording early. Ignored unless recording.
    pub async fn stop(&self) {
        let session = self.session.lock().await;
        if let Some(active) = session.as_ref() {
            if self.shared.state() == RecorderState::Recording {
                tracing::info!(session_id = %active.id, "Stop requested");
                active.stop.cancel();
            }
        }
    }

    /// Wait until the current session reaches completed or error.
    pub async fn finished(&self) -> RecorderView {
        let mut rx = self.shared.view_tx.subscribe();
        let view = match rx.wait_for(|view| view.state.is_terminal()).await {
            Ok(view) => view.clone(),
            Err(_) => self.view(),
        };
        view
    }

    /// Return to idle from completed or error, clearing every session
    /// field.
    pub async fn reset(&self) -> Result<(), PipelineError> {
        let mut session = self.session.lock().await;
        let id = session.as_ref().map(|s| s.id).unwrap_or_else(Uuid::nil);
        self.shared
            .transition(id, |view| view.apply(RecorderInput::Reset))?;
        if let Some(previous) = session.take() {
            previous.teardown.cancel();
        }
        Ok(())
    }

    /// Tear everything down: release the media source and abandon any
    /// pending result fetch.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down live capture");
        self.cancel.cancel();
        if let Some(active) = self.session.lock().await.take() {
            let _ = tokio::time::timeout(SHUTDOWN_GRACE, active.handle).await;
        }
    }
}

impl Drop for LiveCapture {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Recording loop followed by result processing.
async fn run_session(
    shared: Arc<Shared>,
    session_id: Uuid,
    mut stream: Box<dyn MediaStream>,
    stop: CancellationToken,
    teardown: CancellationToken,
) {
    let settings = shared.settings;
    let now = tokio::time::Instant::now();
    let mut chunks =
        tokio::time::interval_at(now + settings.chunk_interval, settings.chunk_interval);
    let second = Duration::from_secs(1);
    let mut clock = tokio::time::interval_at(now + second, second);
    let cap = tokio::time::sleep_until(now + settings.max_duration);
    tokio::pin!(cap);
    let mut sequence = 0u64;

    tracing::info!(
        %session_id,
        chunk_interval_ms = settings.chunk_interval.as_millis() as u64,
        max_duration_secs = settings.max_duration.as_secs(),
        "Recording started",
    );

    let reason = loop {
        tokio::select! {
            biased;
            _ = teardown.cancelled() => break StopReason::Teardown,
            _ = stop.cancelled() => break StopReason::Manual,
            _ = clock.tick() => {
                let mut secs = 0;
                shared.view_tx.send_modify(|view| {
                    view.recording_secs += 1;
                    secs = view.recording_secs;
                });
                let _ = shared.event_tx.send(CaptureEvent::Tick {
                    session_id,
                    recording_secs: secs,
                });
            }
            _ = chunks.tick() => match stream.poll_chunk().await {
                Ok(ChunkPoll::Data(data)) => {
                    dispatch_chunk(&shared, session_id, sequence, data);
                    sequence += 1;
                }
                Ok(ChunkPoll::Empty) => {}
                // A feed that closes before producing anything never opened.
                Ok(ChunkPoll::Ended) if sequence == 0 => break StopReason::StreamFailed(
                    PipelineError::Connection("media stream ended before any data".to_string()),
                ),
                Ok(ChunkPoll::Ended) => break StopReason::StreamEnded,
                Err(e) => break StopReason::StreamFailed(e),
            },
            // Last, so ticks due at the deadline are still counted.
            _ = &mut cap => break StopReason::MaxDuration,
        }
    };

    // The trailing partial chunk still belongs to the recording.
    if matches!(reason, StopReason::Manual | StopReason::MaxDuration) {
        if let Ok(ChunkPoll::Data(data)) = stream.poll_chunk().await {
            dispatch_chunk(&shared, session_id, sequence, data);
            sequence += 1;
        }
    }

    // Single release point for every way out of the loop.
    stream.release().await;
    tracing::info!(%session_id, reason = ?reason, chunks = sequence, "Recording ended");

    match reason {
        StopReason::Teardown => {}
        StopReason::StreamFailed(e) => {
            tracing::error!(%session_id, error = %e, "Media stream failed");
            let _ = shared.transition(session_id, |view| {
                view.fail(RecorderInput::StreamFailed, STREAM_FAILED_MESSAGE)
            });
        }
        StopReason::Manual | StopReason::MaxDuration | StopReason::StreamEnded => {
            if shared
                .transition(session_id, |view| view.apply(RecorderInput::Stop))
                .is_ok()
            {
                process_result(&shared, session_id, &teardown).await;
            }
        }
    }
}

/// Hand a chunk to the backend on its own task. Failures are logged and
/// announced, never propagated.
fn dispatch_chunk(shared: &Arc<Shared>, session_id: Uuid, sequence: u64, data: Vec<u8>) {
    let bytes = data.len();
    let chunk = MediaChunk {
        sequence,
        data,
        recorded_at: chrono::Utc::now(),
    };
    let backend = Arc::clone(&shared.backend);
    let event_tx = shared.event_tx.clone();

    let _ = shared.event_tx.send(CaptureEvent::ChunkDispatched {
        session_id,
        sequence,
        bytes,
    });

    tokio::spawn(async move {
        if let Err(e) = backend.ingest_chunk(chunk).await {
            tracing::warn!(%session_id, sequence, error = %e, "Failed to send chunk to backend");
            let _ = event_tx.send(CaptureEvent::ChunkFailed {
                session_id,
                sequence,
                error: e.to_string(),
            });
        }
    });
}

async fn process_result(shared: &Arc<Shared>, session_id: Uuid, teardown: &CancellationToken) {
    let view_tx = shared.view_tx.clone();
    let ticker = ProgressTicker::spawn(shared.settings.progress, move |percent| {
        view_tx.send_if_modified(|view| {
            if view.state == RecorderState::Processing && view.progress < percent {
                view.progress = percent;
                true
            } else {
                false
            }
        });
    });

    let outcome = tokio::select! {
        _ = teardown.cancelled() => None,
        result = shared.backend.fetch_result() => Some(result),
    };
    ticker.stop().await;

    match outcome {
        None => tracing::info!(%session_id, "Result fetch abandoned"),
        Some(Ok(result)) => {
            tracing::info!(
                %session_id,
                success = result.success,
                violations = result.violations.as_ref().map_or(0, Vec::len),
                "Live analysis finished",
            );
            let _ = shared.transition(session_id, |view| view.complete(result));
        }
        Some(Err(e)) => {
            tracing::error!(%session_id, error = %e, "Live analysis failed");
            let _ = shared.transition(session_id, |view| {
                view.fail(RecorderInput::ResultFailed, ANALYSIS_FAILED_MESSAGE)
            });
        }
    }
}
