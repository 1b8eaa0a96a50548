//! Plain-text rendering of results for the operator.

use std::fmt::Write;

use crate::recorder::{RecorderState, RecorderView};
use crate::result::ProcessingResult;

/// Shown in the error state when no specific message is available.
pub const FALLBACK_ERROR_MESSAGE: &str = "Connection error. Network node may be offline.";

/// `MM:SS` clock for the recording timer.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Text progress bar, e.g. `[#####.....]  50%`.
pub fn progress_bar(percent: u8, width: usize) -> String {
    let percent = percent.min(100);
    let filled = width * usize::from(percent) / 100;
    format!(
        "[{}{}] {percent:>3}%",
        "#".repeat(filled),
        ".".repeat(width - filled)
    )
}

/// Summary and per-vehicle details of a video analysis.
pub fn render_processing_result(result: &ProcessingResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total Vehicles:    {}", result.total_vehicles_detected);
    let _ = writeln!(out, "Speeding Vehicles: {}", result.speeding_count);
    let _ = writeln!(out, "Processing Time:   {}s", result.processing_time);

    if result.speeding_vehicles.is_empty() {
        return out;
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Speeding Vehicles Details");
    for vehicle in &result.speeding_vehicles {
        let _ = writeln!(
            out,
            "  Vehicle #{:<4} {} km/h  detected at {}",
            vehicle.vehicle_id, vehicle.speed, vehicle.timestamp
        );
        if let Some(plate) = &vehicle.plate {
            let _ = writeln!(out, "    Plate: {plate}");
        }
        if let Some(path) = &vehicle.image_path {
            let _ = writeln!(out, "    Image: {path}");
        }
    }
    out
}

/// One-screen view of a live-capture session.
pub fn render_recorder_view(view: &RecorderView) -> String {
    let mut out = String::new();
    match view.state {
        RecorderState::Idle => {
            let _ = writeln!(out, "Ready to start monitoring");
        }
        RecorderState::Recording => {
            let _ = writeln!(
                out,
                "{}  Analyzing traffic feed",
                format_clock(view.recording_secs)
            );
        }
        RecorderState::Processing => {
            let _ = writeln!(
                out,
                "Processing video data... {}",
                progress_bar(view.progress, 20)
            );
        }
        RecorderState::Completed => {
            let marker = if view.success { "OK" } else { "FAILED" };
            let _ = writeln!(out, "[{marker}] {}", view.message);
            if !view.violations.is_empty() {
                let _ = writeln!(out, "Speed Violations:");
                for v in &view.violations {
                    let _ = writeln!(
                        out,
                        "  {:<10} {} mph  {}  {}",
                        v.plate, v.speed, v.location, v.timestamp
                    );
                }
            }
        }
        RecorderState::Error => {
            let message = if view.message.is_empty() {
                FALLBACK_ERROR_MESSAGE
            } else {
                view.message.as_str()
            };
            let _ = writeln!(out, "[ERROR] {message}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{SpeedingVehicle, Violation};

    #[test]
    fn clock_formats_minutes_and_seconds() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(9), "00:09");
        assert_eq!(format_clock(75), "01:15");
        assert_eq!(format_clock(3600), "60:00");
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(progress_bar(50, 10), "[#####.....]  50%");
        assert_eq!(progress_bar(100, 4), "[####] 100%");
        assert_eq!(progress_bar(0, 4), "[....]   0%");
    }

    #[test]
    fn processing_result_lists_optional_fields_only_when_present() {
        let result = ProcessingResult {
            total_vehicles_detected: 5,
            speeding_count: 2,
            processing_time: 3.5,
            speeding_vehicles: vec![
                SpeedingVehicle {
                    vehicle_id: 1,
                    speed: 82.0,
                    timestamp: "00:00:03".into(),
                    plate: Some("ABC-9876".into()),
                    image_path: None,
                },
                SpeedingVehicle {
                    vehicle_id: 2,
                    speed: 75.5,
                    timestamp: "00:00:07".into(),
                    plate: None,
                    image_path: Some("violaters/2.jpg".into()),
                },
            ],
            session_id: None,
        };
        let text = render_processing_result(&result);
        assert!(text.contains("Total Vehicles:    5"));
        assert!(text.contains("Processing Time:   3.5s"));
        assert_eq!(text.matches("Plate:").count(), 1);
        assert_eq!(text.matches("Image:").count(), 1);
    }

    #[test]
    fn error_view_falls_back_to_generic_message() {
        let view = RecorderView {
            state: RecorderState::Error,
            ..Default::default()
        };
        assert!(render_recorder_view(&view).contains(FALLBACK_ERROR_MESSAGE));
    }

    #[test]
    fn completed_view_lists_violations() {
        let view = RecorderView {
            state: RecorderState::Completed,
            success: true,
            message: "Analysis complete.".into(),
            violations: vec![Violation {
                plate: "LMN-5678".into(),
                speed: 68.0,
                timestamp: "12:00:00".into(),
                location: "Central Blvd".into(),
            }],
            ..Default::default()
        };
        let text = render_recorder_view(&view);
        assert!(text.starts_with("[OK] Analysis complete."));
        assert!(text.contains("LMN-5678"));
    }
}
