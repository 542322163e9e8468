use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymptomRecord {
    pub location: String,
    pub date: NaiveDate,
    pub channel_counts: BTreeMap<String, i64>,
}

impl SymptomRecord {
    pub fn new(location: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            location: location.into(),
            date,
            channel_counts: BTreeMap::new(),
        }
    }

    pub fn with_count(mut self, channel: impl Into<String>, count: i64) -> Self {
        self.channel_counts.insert(channel.into(), count);
        self
    }
}

/// One scored day of a location's gap-filled series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDay {
    pub location: String,
    pub date: NaiveDate,
    pub channels: BTreeMap<String, u64>,
    pub total_symptoms: u64,
    /// `None` until the series has `min_periods` days of history.
    pub rolling_mean: Option<f64>,
    pub rolling_std: f64,
    pub zscore: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationSummary {
    pub location: String,
    pub days: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub total_symptoms: u64,
    pub peak_zscore: f64,
    pub peak_date: NaiveDate,
}
