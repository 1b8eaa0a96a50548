//! Detection parameters sent alongside each video.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ValidationError;

pub const DEFAULT_TRACKING_SENSITIVITY: u32 = 30;
pub const DEFAULT_SPEED_LIMIT: f64 = 60.0;
pub const DEFAULT_CALC_DISTANCE: f64 = 18.0;

/// Operator-tuned detection parameters.
///
/// Independent of the annotation; lives for the whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DetectionConfig {
    /// Tracker sensitivity, 10 (low) to 100 (high).
    #[validate(range(min = 10, max = 100))]
    pub tracking_sensitivity: u32,

    /// Speed limit in km/h.
    #[validate(range(exclusive_min = 0.0))]
    pub speed_limit: f64,

    /// Distance between the entry and exit zones in metres.
    #[validate(range(exclusive_min = 0.0))]
    pub calc_distance: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            tracking_sensitivity: DEFAULT_TRACKING_SENSITIVITY,
            speed_limit: DEFAULT_SPEED_LIMIT,
            calc_distance: DEFAULT_CALC_DISTANCE,
        }
    }
}

impl DetectionConfig {
    /// Check every field is within range.
    pub fn check(&self) -> Result<(), ValidationError> {
        if !self.speed_limit.is_finite() || !self.calc_distance.is_finite() {
            return Err(ValidationError::InvalidSetting(
                "speed limit and distance must be finite numbers".to_string(),
            ));
        }
        self.validate().map_err(|errors| {
            let mut fields: Vec<String> = errors
                .field_errors()
                .keys()
                .map(|k| k.to_string())
                .collect();
            fields.sort_unstable();
            ValidationError::InvalidSetting(format!("out of range: {}", fields.join(", ")))
        })
    }

    /// The textual multipart fields, in wire order.
    pub fn form_fields(&self) -> [(&'static str, String); 3] {
        [
            ("tracking_sens", self.tracking_sensitivity.to_string()),
            ("speed_limit", self.speed_limit.to_string()),
            ("calc_distance", self.calc_distance.to_string()),
        ]
    }
}
