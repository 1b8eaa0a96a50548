//! Submission orchestrator.
//!
//! Sends one annotated video to the analysis service at a time, drives
//! the simulated upload progress while the request is in flight and
//! classifies every way it can end. The annotation workspace is only
//! ever read, so a failed submission can be retried as-is.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};

use speedtrap_core::error::PipelineError;
use speedtrap_core::progress::ProgressProfile;
use speedtrap_core::result::ProcessingResult;
use speedtrap_core::workspace::AnnotationWorkspace;

use crate::api::AnalysisApi;
use crate::events::{SubmissionEvent, EVENT_CHANNEL_CAPACITY};
use crate::progress::ProgressTicker;
use crate::request::SubmissionRequest;

/// Timing knobs of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionSettings {
    /// Hard deadline for the whole request.
    pub timeout: Duration,
    /// Cadence of the simulated progress.
    pub progress_tick: Duration,
}

impl Default for SubmissionSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            progress_tick: ProgressProfile::SUBMISSION.interval,
        }
    }
}

/// What the result view shows.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionStatus {
    Idle,
    Submitting { progress: u8 },
    ResultsAvailable(Arc<ProcessingResult>),
}

impl SubmissionStatus {
    pub fn progress(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Submitting { progress } => *progress,
            Self::ResultsAvailable(_) => 100,
        }
    }

    pub fn result(&self) -> Option<&Arc<ProcessingResult>> {
        match self {
            Self::ResultsAvailable(result) => Some(result),
            _ => None,
        }
    }
}

/// Sends annotated videos to the analysis service, one at a time.
pub struct SubmissionOrchestrator {
    api: AnalysisApi,
    settings: SubmissionSettings,
    in_flight: AtomicBool,
    status_tx: watch::Sender<SubmissionStatus>,
    event_tx: broadcast::Sender<SubmissionEvent>,
}

/// Clears the in-flight flag on every exit path. A submission abandoned
/// before it wrote a terminal status is returned to idle.
struct InFlight<'a> {
    flag: &'a AtomicBool,
    status_tx: &'a watch::Sender<SubmissionStatus>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let abandoned = self.status_tx.send_if_modified(|status| {
            if matches!(status, SubmissionStatus::Submitting { .. }) {
                *status = SubmissionStatus::Idle;
                true
            } else {
                false
            }
        });
        if abandoned {
            tracing::warn!("Submission abandoned before completion");
        }
        self.flag.store(false, Ordering::Release);
    }
}

impl SubmissionOrchestrator {
    pub fn new(api: AnalysisApi, settings: SubmissionSettings) -> Self {
        let (status_tx, _) = watch::channel(SubmissionStatus::Idle);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            api,
            settings,
            in_flight: AtomicBool::new(false),
            status_tx,
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SubmissionEvent> {
        self.event_tx.subscribe()
    }

    pub fn watch_status(&self) -> watch::Receiver<SubmissionStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> SubmissionStatus {
        self.status_tx.borrow().clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Validate the workspace and submit it.
    ///
    /// Validation failures are returned before any network I/O and leave
    /// the status untouched.
    pub async fn submit_workspace(
        &self,
        workspace: &AnnotationWorkspace,
    ) -> Result<Arc<ProcessingResult>, PipelineError> {
        let request = SubmissionRequest::from_workspace(workspace)?;
        self.submit(request).await
    }

    /// Submit a prepared request.
    ///
    /// Rejected with [`PipelineError::Busy`] while another submission is
    /// in flight. On failure the status returns to idle and progress to 0.
    pub async fn submit(
        &self,
        request: SubmissionRequest,
    ) -> Result<Arc<ProcessingResult>, PipelineError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PipelineError::Busy("submission"));
        }
        let _guard = InFlight {
            flag: &self.in_flight,
            status_tx: &self.status_tx,
        };

        let file_name = request.video().file_name().to_string();
        tracing::info!(
            file = %file_name,
            size = request.video().size(),
            api_url = %self.api.api_url(),
            "Submitting video for analysis",
        );
        self.status_tx
            .send_replace(SubmissionStatus::Submitting { progress: 0 });
        let _ = self.event_tx.send(SubmissionEvent::Started {
            file_name: file_name.clone(),
        });

        let ticker = self.spawn_progress();
        let started = tokio::time::Instant::now();

        let outcome = tokio::select! {
            result = self.api.process_video(request) => result,
            _ = tokio::time::sleep(self.settings.timeout) => Err(PipelineError::Timeout {
                after: self.settings.timeout,
            }),
        };

        // Both timers end here, whatever the outcome.
        ticker.stop().await;

        match outcome {
            Ok(result) => {
                let result = Arc::new(result);
                tracing::info!(
                    file = %file_name,
                    total_vehicles = result.total_vehicles_detected,
                    speeding = result.speeding_count,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Analysis complete",
                );
                let _ = self.event_tx.send(SubmissionEvent::Progress { percent: 100 });
                self.status_tx
                    .send_replace(SubmissionStatus::ResultsAvailable(Arc::clone(&result)));
                let _ = self.event_tx.send(SubmissionEvent::Completed {
                    total_vehicles: result.total_vehicles_detected,
                    speeding_count: result.speeding_count,
                });
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(
                    file = %file_name,
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Submission failed",
                );
                self.status_tx.send_replace(SubmissionStatus::Idle);
                let _ = self.event_tx.send(SubmissionEvent::Failed {
                    message: e.user_message(),
                });
                Err(e)
            }
        }
    }

    /// Drop the current result and return to idle.
    pub fn clear(&self) {
        if !self.is_submitting() {
            self.status_tx.send_replace(SubmissionStatus::Idle);
        }
    }

    fn spawn_progress(&self) -> ProgressTicker {
        let status_tx = self.status_tx.clone();
        let event_tx = self.event_tx.clone();
        let profile = ProgressProfile::SUBMISSION.with_interval(self.settings.progress_tick);

        ProgressTicker::spawn(profile, move |percent| {
            let changed = status_tx.send_if_modified(|status| match status {
                SubmissionStatus::Submitting { progress } if *progress != percent => {
                    *progress = percent;
                    true
                }
                _ => false,
            });
            if changed {
                let _ = event_tx.send(SubmissionEvent::Progress { percent });
            }
        })
    }
}
