//! Client-side core of the speed-trap annotation pipeline.
//!
//! Pure domain logic shared by the submission and live-capture paths:
//! display/source geometry, the zone annotation state machine and its
//! overlay rendering, frame capture, detection settings, the recorder
//! state machine, progress simulation and result formatting.

pub mod annotation;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod geometry;
pub mod progress;
pub mod recorder;
pub mod render;
pub mod report;
pub mod result;
pub mod settings;
pub mod video;
pub mod workspace;
pub mod zone;
