use std::collections::{BTreeMap, BTreeSet};

use anyhow::Context;
use chrono::NaiveDate;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::config::ScoringConfig;
use crate::models::{ScoredDay, SymptomRecord};

#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

type ChannelCounts = BTreeMap<String, u64>;
type DailyCounts = BTreeMap<NaiveDate, ChannelCounts>;

/// Scores every location's gap-filled daily series.
///
/// Locations are emitted in ascending order, each one's days in calendar
/// order. Parameters and records are checked up front, so an error means no
/// location was scored.
pub fn score(
    records: &[SymptomRecord],
    config: &ScoringConfig,
) -> Result<Vec<ScoredDay>, ScoreError> {
    config.validate()?;
    let partitions = partition(records)?;
    let location_count = partitions.len();

    let mut scored = Vec::new();
    for (location, daily) in partitions {
        scored.extend(score_location(&location, &daily, config));
    }

    info!(
        records = records.len(),
        locations = location_count,
        days = scored.len(),
        window = config.window,
        min_periods = config.min_periods,
        "scored symptom series"
    );
    Ok(scored)
}

/// Same result as [`score`], with each location scored on the blocking pool.
pub async fn score_concurrent(
    records: &[SymptomRecord],
    config: &ScoringConfig,
) -> anyhow::Result<Vec<ScoredDay>> {
    config.validate()?;
    let partitions = partition(records)?;
    let config = *config;

    let mut tasks = JoinSet::new();
    for (location, daily) in partitions {
        tasks.spawn_blocking(move || {
            let days = score_location(&location, &daily, &config);
            (location, days)
        });
    }

    let mut per_location = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        per_location.push(joined.context("location scoring task failed")?);
    }
    per_location.sort_by(|a, b| a.0.cmp(&b.0));

    let scored: Vec<ScoredDay> = per_location
        .into_iter()
        .flat_map(|(_, days)| days)
        .collect();
    info!(
        records = records.len(),
        days = scored.len(),
        "scored symptom series concurrently"
    );
    Ok(scored)
}

/// Groups records by location and date, summing counts of colliding
/// (location, date) records channel by channel. Sums that do not fit in a
/// `u64` are rejected.
fn partition(records: &[SymptomRecord]) -> Result<BTreeMap<String, DailyCounts>, ScoreError> {
    let mut partitions: BTreeMap<String, DailyCounts> = BTreeMap::new();

    for record in records {
        if record.location.trim().is_empty() {
            return Err(ScoreError::InvalidInput(format!(
                "record on {} has an empty location",
                record.date
            )));
        }

        let day = partitions
            .entry(record.location.clone())
            .or_default()
            .entry(record.date)
            .or_default();

        for (channel, &count) in &record.channel_counts {
            let count = u64::try_from(count).map_err(|_| {
                ScoreError::InvalidInput(format!(
                    "negative {} count {} for {} on {}",
                    channel, count, record.location, record.date
                ))
            })?;
            let slot = day.entry(channel.clone()).or_insert(0);
            *slot = slot.checked_add(count).ok_or_else(|| {
                ScoreError::InvalidInput(format!(
                    "{} count for {} on {} overflows",
                    channel, record.location, record.date
                ))
            })?;
        }

        if day.values().try_fold(0u64, |acc, v| acc.checked_add(*v)).is_none() {
            return Err(ScoreError::InvalidInput(format!(
                "total symptoms for {} on {} overflow",
                record.location, record.date
            )));
        }
    }

    Ok(partitions)
}

/// Expands a location's observed days into a contiguous calendar from its
/// first to its last date. Missing days carry a zero for every channel the
/// location reported.
fn gap_fill(daily: &DailyCounts) -> Vec<(NaiveDate, ChannelCounts)> {
    let (Some((&first, _)), Some((&last, _))) = (daily.first_key_value(), daily.last_key_value())
    else {
        return Vec::new();
    };

    let zeroed: ChannelCounts = daily
        .values()
        .flat_map(|counts| counts.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|channel| (channel.clone(), 0))
        .collect();

    first
        .iter_days()
        .take_while(|date| *date <= last)
        .map(|date| {
            let mut counts = zeroed.clone();
            if let Some(observed) = daily.get(&date) {
                counts.extend(observed.iter().map(|(c, v)| (c.clone(), *v)));
            }
            (date, counts)
        })
        .collect()
}

fn score_location(location: &str, daily: &DailyCounts, config: &ScoringConfig) -> Vec<ScoredDay> {
    let series = gap_fill(daily);
    let totals: Vec<u64> = series
        .iter()
        .map(|(_, counts)| counts.values().sum())
        .collect();
    let stats = rolling_stats(&totals, config.window, config.min_periods);

    debug!(
        location,
        observed_days = daily.len(),
        filled_days = series.len() - daily.len(),
        "gap-filled location series"
    );

    series
        .into_iter()
        .zip(totals)
        .zip(stats)
        .map(|(((date, channels), total), (mean, std))| ScoredDay {
            location: location.to_string(),
            date,
            channels,
            total_symptoms: total,
            rolling_mean: mean,
            rolling_std: std,
            zscore: zscore(total, mean, std),
        })
        .collect()
}

/// Trailing mean and population standard deviation for each position.
///
/// The mean is `None` and the std `0.0` until `min_periods` values exist.
pub fn rolling_stats(
    totals: &[u64],
    window: usize,
    min_periods: usize,
) -> Vec<(Option<f64>, f64)> {
    (0..totals.len())
        .map(|i| {
            if i + 1 < min_periods {
                return (None, 0.0);
            }
            let start = (i + 1).saturating_sub(window);
            let values = &totals[start..=i];
            let n = values.len() as f64;
            let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
            let variance = values
                .iter()
                .map(|&v| {
                    let diff = v as f64 - mean;
                    diff * diff
                })
                .sum::<f64>()
                / n;
            let std = variance.sqrt();
            let std = if std.is_finite() && std > 0.0 { std } else { 0.0 };
            (Some(mean), std)
        })
        .collect()
}

/// `(total - mean) / std`, or `0.0` when the statistics are missing, the
/// std is zero, or the quotient is not finite.
pub fn zscore(total: u64, mean: Option<f64>, std: f64) -> f64 {
    let Some(mean) = mean else {
        return 0.0;
    };
    if !std.is_finite() || std <= 0.0 {
        return 0.0;
    }
    let z = (total as f64 - mean) / std;
    if z.is_finite() {
        z
    } else {
        0.0
    }
}
