//! Result payloads returned by the analysis service and the live backend.

use serde::{Deserialize, Serialize};

/// Consolidated result of one video submission.
///
/// Immutable once received; a new submission replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub total_vehicles_detected: u64,
    pub speeding_count: u64,
    /// Server-side processing time in seconds.
    pub processing_time: f64,
    #[serde(default)]
    pub speeding_vehicles: Vec<SpeedingVehicle>,
    /// Echoed by the service; not used for anything client-side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedingVehicle {
    pub vehicle_id: u64,
    /// km/h
    pub speed: f64,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

/// Consolidated result of a live-capture session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<Violation>>,
}

/// One speed violation observed during a live capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub plate: String,
    pub speed: f64,
    pub timestamp: String,
    pub location: String,
}

/// Body of a failed submission response. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /status` payload of the analysis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: String,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub gpu_available: bool,
    #[serde(default)]
    pub model_loaded: bool,
}
