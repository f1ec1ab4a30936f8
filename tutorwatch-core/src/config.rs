//! Tunables for the reconciliation engine

use serde::{Deserialize, Serialize};

use crate::clamp::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_DAMPENED_LEVEL, DEFAULT_LEVEL_THRESHOLD, LevelClamp,
};
use crate::error::{CoreError, Result};
use crate::log_buffer::DEFAULT_LOG_CAPACITY;

/// Engine configuration, usually read from the `[engine]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of entries kept in the log feed
    pub log_capacity: usize,

    /// Level above which low-confidence estimates are dampened for display
    pub clamp_level_threshold: f64,

    /// Confidence below which a high estimate is dampened
    pub clamp_confidence_threshold: f64,

    /// Level displayed in place of a dampened estimate
    pub clamp_dampened_level: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            clamp_level_threshold: DEFAULT_LEVEL_THRESHOLD,
            clamp_confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            clamp_dampened_level: DEFAULT_DAMPENED_LEVEL,
        }
    }
}

impl EngineConfig {
    /// Checks the values the engine relies on.
    ///
    /// The dampened level must not exceed the level threshold, otherwise
    /// clamping a clamped value would change it again.
    pub fn validate(&self) -> Result<()> {
        if self.log_capacity == 0 {
            return Err(CoreError::InvalidConfig(
                "log_capacity must be at least 1".to_string(),
            ));
        }
        if self.clamp_dampened_level > self.clamp_level_threshold {
            return Err(CoreError::InvalidConfig(format!(
                "clamp_dampened_level ({}) must not exceed clamp_level_threshold ({})",
                self.clamp_dampened_level, self.clamp_level_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.clamp_confidence_threshold) {
            return Err(CoreError::InvalidConfig(format!(
                "clamp_confidence_threshold ({}) must be within [0, 1]",
                self.clamp_confidence_threshold
            )));
        }
        Ok(())
    }

    pub fn level_clamp(&self) -> LevelClamp {
        LevelClamp {
            level_threshold: self.clamp_level_threshold,
            confidence_threshold: self.clamp_confidence_threshold,
            dampened_level: self.clamp_dampened_level,
        }
    }
}
