//! Events emitted by the submission orchestrator and the live capture
//! pipeline.
//!
//! Delivered over [`tokio::sync::broadcast`]; a lagging subscriber only
//! loses events, it never blocks the pipeline.

use serde::Serialize;
use uuid::Uuid;

use speedtrap_core::recorder::RecorderState;

/// Broadcast channel capacity for pipeline events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Lifecycle of one video submission.
#[derive(Debug, Clone, Serialize)]
pub enum SubmissionEvent {
    /// Validation passed and the upload is starting.
    Started { file_name: String },

    /// Progress changed (0-100). 100 is only sent after the response.
    Progress { percent: u8 },

    /// The service returned a result.
    Completed {
        total_vehicles: u64,
        speeding_count: u64,
    },

    /// The submission failed; the workspace is left intact.
    Failed {
        /// Operator-facing error text.
        message: String,
    },
}

/// Lifecycle of one live-capture session.
#[derive(Debug, Clone, Serialize)]
pub enum CaptureEvent {
    /// The recorder moved to a new state.
    StateChanged { session_id: Uuid, state: RecorderState },

    /// A recorded chunk was handed to the backend.
    ChunkDispatched {
        session_id: Uuid,
        sequence: u64,
        bytes: usize,
    },

    /// The backend rejected a chunk. Recording continues.
    ChunkFailed {
        session_id: Uuid,
        sequence: u64,
        error: String,
    },

    /// One more second recorded.
    Tick { session_id: Uuid, recording_secs: u64 },
}
