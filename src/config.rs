use crate::anomaly::ScoreError;

pub const DEFAULT_WINDOW: usize = 7;
pub const DEFAULT_MIN_PERIODS: usize = 5;
pub const DEFAULT_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringConfig {
    pub window: usize,
    pub min_periods: usize,
    /// Z-score at or above which a day is flagged.
    pub threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            min_periods: DEFAULT_MIN_PERIODS,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ScoringConfig {
    pub fn new(window: usize, min_periods: usize) -> Self {
        Self {
            window,
            min_periods,
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<(), ScoreError> {
        if self.window < 1 {
            return Err(ScoreError::InvalidInput(
                "window must be at least 1 day".to_string(),
            ));
        }
        if self.min_periods < 1 {
            return Err(ScoreError::InvalidInput(
                "min_periods must be at least 1".to_string(),
            ));
        }
        if self.window < self.min_periods {
            return Err(ScoreError::InvalidInput(format!(
                "window ({}) must not be smaller than min_periods ({})",
                self.window, self.min_periods
            )));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ScoreError::InvalidInput(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}
