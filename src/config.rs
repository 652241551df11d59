//! Runtime configuration of the decision loop.

use std::ops::RangeInclusive;

use crate::image::ChannelMode;
use crate::util::{GrabError, GrabResult};

/// Confidence, in standard deviations, a match must exceed to count as a hit.
pub const DEFAULT_THRESHOLD: f64 = 2.7;

/// Randomized sleep ranges in milliseconds, both ends inclusive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacingConfig {
    /// Delay after a cycle with no hit.
    pub idle_ms: (u64, u64),
    /// Delay after a city click while the UI redraws.
    pub cooldown_ms: (u64, u64),
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            idle_ms: (40, 60),
            cooldown_ms: (2000, 4000),
        }
    }
}

impl PacingConfig {
    pub fn validate(&self) -> GrabResult<()> {
        if self.idle_ms.0 > self.idle_ms.1 {
            return Err(GrabError::InvalidConfig("idle_ms min exceeds max"));
        }
        if self.cooldown_ms.0 > self.cooldown_ms.1 {
            return Err(GrabError::InvalidConfig("cooldown_ms min exceeds max"));
        }
        Ok(())
    }

    pub fn idle_range(&self) -> RangeInclusive<u64> {
        self.idle_ms.0..=self.idle_ms.1
    }

    pub fn cooldown_range(&self) -> RangeInclusive<u64> {
        self.cooldown_ms.0..=self.cooldown_ms.1
    }
}

/// Mode switches and tuning read once at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    pub channel_mode: ChannelMode,
    /// Score and visualize every pattern without touching the pointer.
    pub debug_visualization: bool,
    pub threshold: f64,
    pub pacing: PacingConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            channel_mode: ChannelMode::Grayscale,
            debug_visualization: false,
            threshold: DEFAULT_THRESHOLD,
            pacing: PacingConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> GrabResult<()> {
        if !self.threshold.is_finite() {
            return Err(GrabError::InvalidConfig("threshold must be finite"));
        }
        self.pacing.validate()
    }
}
