use std::str::FromStr;
use std::time::Duration;

use speedtrap_core::frame::{DEFAULT_DISPLAY_HEIGHT, DEFAULT_DISPLAY_WIDTH};

use crate::live::LiveSettings;
use crate::submission::SubmissionSettings;

/// A malformed configuration value.
#[derive(Debug, thiserror::Error)]
#[error("{key} must be a valid {expected}, got '{value}'")]
pub struct ConfigError {
    pub key: &'static str,
    pub expected: &'static str,
    pub value: String,
}

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for a local analysis service.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the video analysis service.
    pub api_url: String,
    /// Hard deadline for one video submission.
    pub submit_timeout: Duration,
    /// Cadence of the simulated upload progress.
    pub progress_tick: Duration,
    /// Live backend base URL. `None` selects the built-in mock backend.
    pub live_api_url: Option<String>,
    /// Interval between live chunks.
    pub chunk_interval: Duration,
    /// Live recordings stop on their own after this long.
    pub recording_max: Duration,
    pub display_width: u32,
    pub display_height: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".into(),
            submit_timeout: Duration::from_secs(120),
            progress_tick: Duration::from_millis(500),
            live_api_url: None,
            chunk_interval: Duration::from_millis(1000),
            recording_max: Duration::from_secs(10),
            display_width: DEFAULT_DISPLAY_WIDTH,
            display_height: DEFAULT_DISPLAY_HEIGHT,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default                 |
    /// |-----------------------|-------------------------|
    /// | `ANALYSIS_API_URL`    | `http://localhost:5000` |
    /// | `SUBMIT_TIMEOUT_SECS` | `120`                   |
    /// | `PROGRESS_TICK_MS`    | `500`                   |
    /// | `LIVE_API_URL`        | unset (mock backend)    |
    /// | `CHUNK_INTERVAL_MS`   | `1000`                  |
    /// | `RECORDING_MAX_SECS`  | `10`                    |
    /// | `DISPLAY_WIDTH`       | `800`                   |
    /// | `DISPLAY_HEIGHT`      | `450`                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_url = lookup("ANALYSIS_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);

        let live_api_url = lookup("LIVE_API_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty());

        let submit_timeout = parse::<u64>(&lookup, "SUBMIT_TIMEOUT_SECS", "u64")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.submit_timeout);
        let progress_tick = parse::<u64>(&lookup, "PROGRESS_TICK_MS", "u64")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.progress_tick);
        let chunk_interval = parse::<u64>(&lookup, "CHUNK_INTERVAL_MS", "u64")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.chunk_interval);
        let recording_max = parse::<u64>(&lookup, "RECORDING_MAX_SECS", "u64")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.recording_max);

        let display_width =
            parse::<u32>(&lookup, "DISPLAY_WIDTH", "u32")?.unwrap_or(defaults.display_width);
        let display_height =
            parse::<u32>(&lookup, "DISPLAY_HEIGHT", "u32")?.unwrap_or(defaults.display_height);

        for (key, value) in [
            ("SUBMIT_TIMEOUT_SECS", submit_timeout),
            ("PROGRESS_TICK_MS", progress_tick),
            ("CHUNK_INTERVAL_MS", chunk_interval),
            ("RECORDING_MAX_SECS", recording_max),
        ] {
            if value.is_zero() {
                return Err(ConfigError {
                    key,
                    expected: "non-zero duration",
                    value: "0".into(),
                });
            }
        }
        for (key, value) in [("DISPLAY_WIDTH", display_width), ("DISPLAY_HEIGHT", display_height)] {
            if value == 0 {
                return Err(ConfigError {
                    key,
                    expected: "non-zero size",
                    value: "0".into(),
                });
            }
        }

        Ok(Self {
            api_url,
            submit_timeout,
            progress_tick,
            live_api_url,
            chunk_interval,
            recording_max,
            display_width,
            display_height,
        })
    }

    pub fn submission_settings(&self) -> SubmissionSettings {
        SubmissionSettings {
            timeout: self.submit_timeout,
            progress_tick: self.progress_tick,
        }
    }

    pub fn live_settings(&self) -> LiveSettings {
        LiveSettings {
            chunk_interval: self.chunk_interval,
            max_duration: self.recording_max,
            ..LiveSettings::default()
        }
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| ConfigError {
            key,
            expected,
            value: raw,
        }),
    }
}
