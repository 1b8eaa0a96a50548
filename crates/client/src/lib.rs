//! Network-facing half of the speed-trap pipeline: the analysis service
//! client, the submission orchestrator and the live capture pipeline.

pub mod api;
pub mod backend;
pub mod config;
pub mod events;
pub mod live;
pub mod progress;
pub mod request;
pub mod source;
pub mod submission;

pub use api::AnalysisApi;
pub use config::{ClientConfig, ConfigError};
pub use live::{LiveCapture, LiveSettings};
pub use submission::{SubmissionOrchestrator, SubmissionSettings, SubmissionStatus};
