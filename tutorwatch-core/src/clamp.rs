//! Display-only dampening of implausible level estimates.

/// Level above which a low-confidence estimate is dampened.
pub const DEFAULT_LEVEL_THRESHOLD: f64 = 4.0;

/// Confidence below which a high estimate is not trusted for display.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Value shown in place of a dampened estimate.
pub const DEFAULT_DAMPENED_LEVEL: f64 = 3.5;

/// Replaces an extreme level with a fixed value when confidence is low.
///
/// This only affects what is displayed; estimate history keeps raw values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelClamp {
    pub level_threshold: f64,
    pub confidence_threshold: f64,
    pub dampened_level: f64,
}

impl Default for LevelClamp {
    fn default() -> Self {
        Self {
            level_threshold: DEFAULT_LEVEL_THRESHOLD,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            dampened_level: DEFAULT_DAMPENED_LEVEL,
        }
    }
}

impl LevelClamp {
    pub fn clamp(&self, level: f64, confidence: f64) -> f64 {
        if level > self.level_threshold && confidence < self.confidence_threshold {
            self.dampened_level
        } else {
            level
        }
    }
}
