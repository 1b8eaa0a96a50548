use std::time::Duration;

/// Generic message shown when a failed response carries no usable `error` field.
pub const GENERIC_SERVER_ERROR: &str = "Server error occurred";

/// Message shown when a submission exceeds its hard timeout.
pub const TIMEOUT_MESSAGE: &str =
    "Request timed out. The video may be too large or the server is busy.";

/// Local pre-flight failures. These never reach the network.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please select a video file")]
    NoVideoFile,

    #[error(
        "Please draw both detection areas with at least 3 points each \
         (entry has {entry}, exit has {exit})"
    )]
    IncompleteZones { entry: usize, exit: usize },

    #[error("File type not allowed: '{0}'. Allowed types: mp4, avi, mov, mkv")]
    UnsupportedFormat(String),

    #[error("Video is {size} bytes, maximum upload size is {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid detection setting: {0}")]
    InvalidSetting(String),
}

/// Every failure the capture/annotate/submit pipeline can surface.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Video is not ready: {0}")]
    MediaNotReady(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out after {}s", .after.as_secs())]
    Timeout { after: Duration },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Already active: {0}")]
    Busy(&'static str),

    #[error("Invalid transition: cannot {input} while {state}")]
    InvalidTransition {
        state: &'static str,
        input: &'static str,
    },
}

impl PipelineError {
    /// Operator-facing text for this condition.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::MediaNotReady(_) => {
                "Video is still loading. Wait for it to be ready and capture again.".to_string()
            }
            Self::Connection(_) => "Could not access video feed. Please try again.".to_string(),
            Self::Timeout { .. } => TIMEOUT_MESSAGE.to_string(),
            Self::Server { message, .. } => format!("Error: {message}"),
            Self::Transport(msg) => format!("Error: {msg}"),
            Self::Unknown(_) => "An unknown error occurred".to_string(),
            Self::Busy(what) => format!("A {what} is already in progress"),
            Self::InvalidTransition { .. } => self.to_string(),
        }
    }

    /// `true` for failures resolved locally before any network I/O.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::MediaNotReady(_)
                | Self::Busy(_)
                | Self::InvalidTransition { .. }
        )
    }
}
