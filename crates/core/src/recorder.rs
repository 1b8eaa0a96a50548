//! Live-capture recorder state machine.
//!
//! ```text
//! idle ──start──▶ recording ──stop──▶ processing ──result──▶ completed
//!   │                 │                    │
//!   └─stream failed───┴──────▶ error ◀─────┘ result failed
//! completed / error ──reset──▶ idle
//! ```

use serde::Serialize;

use crate::error::PipelineError;
use crate::result::{LiveResult, Violation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    Idle,
    Recording,
    Processing,
    Completed,
    Error,
}

impl RecorderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl std::fmt::Display for RecorderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs that drive [`RecorderState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderInput {
    /// Media stream acquired, recording begins.
    Start,
    /// Media acquisition failed, or the stream died while recording.
    StreamFailed,
    /// Recording stopped, manually or by the duration cap.
    Stop,
    ResultReady,
    ResultFailed,
    Reset,
}

impl RecorderInput {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::StreamFailed => "fail stream",
            Self::Stop => "stop",
            Self::ResultReady => "complete",
            Self::ResultFailed => "fail result",
            Self::Reset => "reset",
        }
    }
}

/// Pure transition function.
pub fn transition(
    state: RecorderState,
    input: RecorderInput,
) -> Result<RecorderState, PipelineError> {
    use RecorderInput as I;
    use RecorderState as S;

    match (state, input) {
        (S::Idle, I::Start) => Ok(S::Recording),
        (S::Idle | S::Recording, I::StreamFailed) => Ok(S::Error),
        (S::Recording, I::Stop) => Ok(S::Processing),
        (S::Processing, I::ResultReady) => Ok(S::Completed),
        (S::Processing, I::ResultFailed) => Ok(S::Error),
        (S::Completed | S::Error | S::Idle, I::Reset) => Ok(S::Idle),
        (state, input) => Err(PipelineError::InvalidTransition {
            state: state.as_str(),
            input: input.as_str(),
        }),
    }
}

/// Everything the result view needs about a live-capture session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecorderView {
    pub state: RecorderState,
    /// Whole seconds spent recording.
    pub recording_secs: u64,
    /// Simulated processing progress, 0-100.
    pub progress: u8,
    pub message: String,
    pub success: bool,
    pub violations: Vec<Violation>,
}

impl Default for RecorderView {
    fn default() -> Self {
        Self {
            state: RecorderState::Idle,
            recording_secs: 0,
            progress: 0,
            message: String::new(),
            success: false,
            violations: Vec::new(),
        }
    }
}

impl RecorderView {
    /// Apply an input, leaving the view untouched when it is rejected.
    pub fn apply(&mut self, input: RecorderInput) -> Result<RecorderState, PipelineError> {
        let next = transition(self.state, input)?;
        if input == RecorderInput::Reset || input == RecorderInput::Start {
            self.clear();
        }
        self.state = next;
        Ok(next)
    }

    /// Record a consolidated result and move to `completed`.
    pub fn complete(&mut self, result: LiveResult) -> Result<RecorderState, PipelineError> {
        let next = self.apply(RecorderInput::ResultReady)?;
        self.progress = 100;
        self.success = result.success;
        self.message = result.message;
        self.violations = result.violations.unwrap_or_default();
        Ok(next)
    }

    /// Move to `error` with an operator-facing message.
    pub fn fail(
        &mut self,
        input: RecorderInput,
        message: impl Into<String>,
    ) -> Result<RecorderState, PipelineError> {
        let next = self.apply(input)?;
        self.success = false;
        self.message = message.into();
        Ok(next)
    }

    fn clear(&mut self) {
        self.recording_secs = 0;
        self.progress = 0;
        self.message.clear();
        self.success = false;
        self.violations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn happy_path() {
        let s = transition(RecorderState::Idle, RecorderInput::Start).unwrap();
        let s = transition(s, RecorderInput::Stop).unwrap();
        assert_eq!(s, RecorderState::Processing);
        let s = transition(s, RecorderInput::ResultReady).unwrap();
        assert_eq!(s, RecorderState::Completed);
        assert_eq!(transition(s, RecorderInput::Reset).unwrap(), RecorderState::Idle);
    }

    #[test]
    fn error_reachable_from_recording_and_processing() {
        assert_eq!(
            transition(RecorderState::Recording, RecorderInput::StreamFailed).unwrap(),
            RecorderState::Error
        );
        assert_eq!(
            transition(RecorderState::Processing, RecorderInput::ResultFailed).unwrap(),
            RecorderState::Error
        );
        assert_eq!(
            transition(RecorderState::Idle, RecorderInput::StreamFailed).unwrap(),
            RecorderState::Error
        );
    }

    #[test]
    fn stop_only_once() {
        let s = transition(RecorderState::Recording, RecorderInput::Stop).unwrap();
        assert_matches!(
            transition(s, RecorderInput::Stop),
            Err(PipelineError::InvalidTransition { state: "processing", input: "stop" })
        );
    }

    #[test]
    fn cannot_start_while_active() {
        for state in [
            RecorderState::Recording,
            RecorderState::Processing,
            RecorderState::Completed,
        ] {
            assert!(transition(state, RecorderInput::Start).is_err());
        }
    }

    #[test]
    fn cannot_reset_mid_session() {
        assert!(transition(RecorderState::Recording, RecorderInput::Reset).is_err());
        assert!(transition(RecorderState::Processing, RecorderInput::Reset).is_err());
    }

    #[test]
    fn view_reset_clears_everything() {
        let mut view = RecorderView::default();
        view.apply(RecorderInput::Start).unwrap();
        view.recording_secs = 7;
        view.apply(RecorderInput::Stop).unwrap();
        view.progress = 40;
        view.complete(LiveResult {
            success: true,
            message: "done".into(),
            violations: Some(vec![Violation {
                plate: "XYZ-1234".into(),
                speed: 75.0,
                timestamp: "10:00:00".into(),
                location: "Main St".into(),
            }]),
        })
        .unwrap();
        assert_eq!(view.progress, 100);
        assert_eq!(view.violations.len(), 1);

        view.apply(RecorderInput::Reset).unwrap();
        assert_eq!(view, RecorderView::default());
    }

    #[test]
    fn rejected_input_leaves_view_untouched() {
        let mut view = RecorderView::default();
        view.apply(RecorderInput::Start).unwrap();
        view.recording_secs = 3;
        assert!(view.apply(RecorderInput::Reset).is_err());
        assert_eq!(view.state, RecorderState::Recording);
        assert_eq!(view.recording_secs, 3);
    }
}
