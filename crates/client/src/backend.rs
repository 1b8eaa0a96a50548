//! Live-capture backends.
//!
//! Chunks are pushed to the backend while recording; one consolidated
//! [`LiveResult`] is pulled after recording stops.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use rand::Rng;

use speedtrap_core::error::PipelineError;
use speedtrap_core::result::{LiveResult, Violation};

use crate::api::server_error;

/// Message of a failed mock analysis.
pub const MOCK_FAILURE_MESSAGE: &str =
    "Could not process video feed. Please check connection and try again.";

/// Message of a successful mock analysis.
pub const MOCK_SUCCESS_MESSAGE: &str = "Analysis complete. Speed violations detected.";

/// One recorded slice of the live feed.
#[derive(Debug, Clone)]
pub struct MediaChunk {
    pub sequence: u64,
    pub data: Vec<u8>,
    pub recorded_at: DateTime<Utc>,
}

/// Receives chunks and produces the consolidated result.
#[async_trait]
pub trait LiveBackend: Send + Sync {
    /// Accept one chunk. Failures are reported but never end a session.
    async fn ingest_chunk(&self, chunk: MediaChunk) -> Result<(), PipelineError>;

    /// Fetch the consolidated result for everything ingested so far.
    async fn fetch_result(&self) -> Result<LiveResult, PipelineError>;
}

// ---------------------------------------------------------------------------
// HTTP backend
// ---------------------------------------------------------------------------

/// Backend reached over HTTP at `{api_url}/stream/*`.
#[derive(Debug, Clone)]
pub struct HttpLiveBackend {
    client: reqwest::Client,
    api_url: String,
}

impl HttpLiveBackend {
    pub fn new(api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
        }
    }
}

#[async_trait]
impl LiveBackend for HttpLiveBackend {
    async fn ingest_chunk(&self, chunk: MediaChunk) -> Result<(), PipelineError> {
        let response = self
            .client
            .post(format!("{}/stream/chunk", self.api_url))
            .header("x-chunk-sequence", chunk.sequence.to_string())
            .header(reqwest::header::CONTENT_TYPE, "video/webm")
            .body(chunk.data)
            .send()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(server_error(status.as_u16(), &body));
        }
        Ok(())
    }

    async fn fetch_result(&self) -> Result<LiveResult, PipelineError> {
        let response = self
            .client
            .get(format!("{}/stream/result", self.api_url))
            .send()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(server_error(status.as_u16(), &body));
        }
        serde_json::from_str(&body).map_err(|e| PipelineError::Unknown(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Mock backend
// ---------------------------------------------------------------------------

/// Stand-in backend for demos and tests: fixed latencies, a configurable
/// failure ratio and a canned set of violations.
#[derive(Debug, Clone)]
pub struct MockLiveBackend {
    pub ingest_delay: Duration,
    pub result_delay: Duration,
    /// Probability in `[0, 1]` that a result fetch reports failure.
    /// Out-of-range values are clamped; NaN counts as 0.
    pub failure_ratio: f64,
}

impl Default for MockLiveBackend {
    fn default() -> Self {
        Self {
            ingest_delay: Duration::from_millis(500),
            result_delay: Duration::from_millis(1500),
            failure_ratio: 0.1,
        }
    }
}

impl MockLiveBackend {
    fn effective_failure_ratio(&self) -> f64 {
        if self.failure_ratio.is_nan() {
            0.0
        } else {
            self.failure_ratio.clamp(0.0, 1.0)
        }
    }

    /// Never fails.
    pub fn reliable() -> Self {
        Self {
            failure_ratio: 0.0,
            ..Self::default()
        }
    }

    fn sample_violations(now: DateTime<Local>) -> Vec<Violation> {
        let at = |secs_ago: i64| {
            (now - chrono::Duration::seconds(secs_ago))
                .format("%H:%M:%S")
                .to_string()
        };
        vec![
            Violation {
                plate: "XYZ-1234".into(),
                speed: 75.0,
                timestamp: at(0),
                location: "Main St & 5th Ave".into(),
            },
            Violation {
                plate: "ABC-9876".into(),
                speed: 82.0,
                timestamp: at(60),
                location: "Highway 101, Mile 42".into(),
            },
            Violation {
                plate: "LMN-5678".into(),
                speed: 68.0,
                timestamp: at(120),
                location: "Central Blvd".into(),
            },
        ]
    }
}

#[async_trait]
impl LiveBackend for MockLiveBackend {
    async fn ingest_chunk(&self, chunk: MediaChunk) -> Result<(), PipelineError> {
        tokio::time::sleep(self.ingest_delay).await;
        tracing::debug!(sequence = chunk.sequence, bytes = chunk.data.len(), "Mock chunk ingested");
        Ok(())
    }

    async fn fetch_result(&self) -> Result<LiveResult, PipelineError> {
        tokio::time::sleep(self.result_delay).await;

        let failed = rand::rng().random_bool(self.effective_failure_ratio());
        if failed {
            return Ok(LiveResult {
                success: false,
                message: MOCK_FAILURE_MESSAGE.to_string(),
                violations: None,
            });
        }

        Ok(LiveResult {
            success: true,
            message: MOCK_SUCCESS_MESSAGE.to_string(),
            violations: Some(Self::sample_violations(Local::now())),
        })
    }
}
