//! Simulated progress for requests that report no real progress.
//!
//! Two sources feed one percentage: a simulated tick that climbs by a
//! fixed step but never past [`ProgressModel::cap`], and the single real
//! completion event that jumps straight to 100.

use std::time::Duration;

/// Highest value the simulation alone can reach.
pub const SIMULATION_CAP: u8 = 95;

/// Step size and cadence of a progress simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressProfile {
    pub step: u8,
    pub interval: Duration,
    pub cap: u8,
}

impl ProgressProfile {
    /// Upload simulation for video submissions: +5 every 500 ms.
    pub const SUBMISSION: Self = Self {
        step: 5,
        interval: Duration::from_millis(500),
        cap: SIMULATION_CAP,
    };

    /// Consolidated-result wait after a live capture: +10 every 300 ms.
    pub const LIVE_RESULT: Self = Self {
        step: 10,
        interval: Duration::from_millis(300),
        cap: SIMULATION_CAP,
    };

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Current percentage of one in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressModel {
    value: u8,
    step: u8,
    cap: u8,
    completed: bool,
}

impl ProgressModel {
    pub fn new(profile: ProgressProfile) -> Self {
        Self {
            value: 0,
            step: profile.step,
            cap: profile.cap.min(99),
            completed: false,
        }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn cap(&self) -> u8 {
        self.cap
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Advance the simulated source. Returns `false` once it is saturated
    /// (at the cap or already completed) so the driver can stop ticking.
    pub fn tick(&mut self) -> bool {
        if self.completed || self.value >= self.cap {
            return false;
        }
        self.value = self.value.saturating_add(self.step).min(self.cap);
        self.value < self.cap
    }

    /// The real completion event. Always lands on exactly 100.
    pub fn complete(&mut self) {
        self.completed = true;
        self.value = 100;
    }
}
