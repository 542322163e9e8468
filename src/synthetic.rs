use std::io::Write;

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate, Weekday};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Poisson};
use serde::Serialize;
use tracing::info;

use crate::models::SymptomRecord;

pub const DEFAULT_SEED: u64 = 2025;
pub const DEFAULT_DAYS: u32 = 91;
pub const DEFAULT_LOCATIONS: [&str; 3] = ["Clinic A", "Clinic B", "Clinic C"];

const CHANNELS: [&str; 3] = ["fever", "cough", "diarrhea"];

/// Per-channel settings: baseline daily rate and the half-open range of
/// extra cases added on an outbreak day.
#[derive(Debug, Clone, Copy)]
pub struct ChannelProfile {
    pub baseline: f64,
    pub spike: (i64, i64),
}

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub locations: Vec<String>,
    pub start: NaiveDate,
    pub days: u32,
    pub seed: u64,
    /// fever, cough, diarrhea
    pub channels: [ChannelProfile; 3],
    /// Fraction of cases missing on Saturdays and Sundays.
    pub weekend_drop: f64,
    pub outbreak_probability: f64,
    /// Each location's rates are scaled by a factor drawn from this range.
    pub location_scale: (f64, f64),
}

impl SyntheticConfig {
    pub fn new(start: NaiveDate) -> Self {
        Self {
            locations: DEFAULT_LOCATIONS.iter().map(|l| l.to_string()).collect(),
            start,
            days: DEFAULT_DAYS,
            seed: DEFAULT_SEED,
            channels: [
                ChannelProfile {
                    baseline: 2.0,
                    spike: (5, 15),
                },
                ChannelProfile {
                    baseline: 1.5,
                    spike: (3, 10),
                },
                ChannelProfile {
                    baseline: 0.8,
                    spike: (2, 8),
                },
            ],
            weekend_drop: 0.15,
            outbreak_probability: 0.07,
            location_scale: (0.7, 1.3),
        }
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn draw_count(rng: &mut ChaCha8Rng, rate: f64) -> anyhow::Result<i64> {
    let poisson = Poisson::new(rate).map_err(|e| anyhow!("invalid daily rate {rate}: {e}"))?;
    Ok(poisson.sample(rng) as i64)
}

/// Generates daily fever/cough/diarrhea counts for every location. The same
/// config always yields the same records.
pub fn generate(config: &SyntheticConfig) -> anyhow::Result<Vec<SymptomRecord>> {
    let (scale_low, scale_high) = config.location_scale;
    if !(0.0 < scale_low && scale_low < scale_high) {
        return Err(anyhow!(
            "location scale range must be positive and non-empty, got {scale_low}..{scale_high}"
        ));
    }
    if !(0.0..1.0).contains(&config.weekend_drop) {
        return Err(anyhow!("weekend drop must be in [0, 1), got {}", config.weekend_drop));
    }
    if !(0.0..=1.0).contains(&config.outbreak_probability) {
        return Err(anyhow!(
            "outbreak probability must be in [0, 1], got {}",
            config.outbreak_probability
        ));
    }
    if let Some(profile) = config.channels.iter().find(|p| p.spike.0 >= p.spike.1) {
        return Err(anyhow!("empty outbreak spike range {:?}", profile.spike));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut records = Vec::with_capacity(config.locations.len() * config.days as usize);
    let mut outbreak_days = 0usize;

    for location in &config.locations {
        let scale = rng.gen_range(scale_low..scale_high);

        for date in config.start.iter_days().take(config.days as usize) {
            let factor = if is_weekend(date) {
                1.0 - config.weekend_drop
            } else {
                1.0
            };

            let mut counts = [0i64; 3];
            for (count, profile) in counts.iter_mut().zip(&config.channels) {
                *count = draw_count(&mut rng, profile.baseline * scale * factor)?;
            }

            if rng.gen_bool(config.outbreak_probability) {
                outbreak_days += 1;
                for (count, profile) in counts.iter_mut().zip(&config.channels) {
                    *count += rng.gen_range(profile.spike.0..profile.spike.1);
                }
            }

            let record = CHANNELS
                .iter()
                .zip(counts)
                .fold(SymptomRecord::new(location.as_str(), date), |record, (c, n)| {
                    record.with_count(*c, n)
                });
            records.push(record);
        }
    }

    info!(
        rows = records.len(),
        locations = config.locations.len(),
        outbreak_days,
        seed = config.seed,
        "generated synthetic symptom reports"
    );
    Ok(records)
}

#[derive(Serialize)]
struct SymptomRow<'a> {
    location: &'a str,
    date: NaiveDate,
    fever: i64,
    cough: i64,
    diarrhea: i64,
}

/// Writes records in the `location,date,fever,cough,diarrhea` upload format.
pub fn write_symptoms_csv<W: Write>(writer: W, records: &[SymptomRecord]) -> anyhow::Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    for record in records {
        let count = |channel: &str| record.channel_counts.get(channel).copied().unwrap_or(0);
        out.serialize(SymptomRow {
            location: &record.location,
            date: record.date,
            fever: count("fever"),
            cough: count("cough"),
            diarrhea: count("diarrhea"),
        })?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly;
    use crate::config::ScoringConfig;
    use crate::ingest;

    fn config() -> SyntheticConfig {
        let mut config = SyntheticConfig::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        config.days = 30;
        config
    }

    #[test]
    fn same_seed_gives_same_rows() {
        let first = generate(&config()).unwrap();
        let second = generate(&config()).unwrap();
        assert_eq!(first, second);

        let mut reseeded = config();
        reseeded.seed = 7;
        assert_ne!(first, generate(&reseeded).unwrap());
    }

    #[test]
    fn covers_every_location_and_day() {
        let records = generate(&config()).unwrap();
        assert_eq!(records.len(), 3 * 30);

        let clinic_b: Vec<&SymptomRecord> =
            records.iter().filter(|r| r.location == "Clinic B").collect();
        assert_eq!(clinic_b.len(), 30);
        assert_eq!(clinic_b[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(clinic_b[29].date, NaiveDate::from_ymd_opt(2024, 1, 30).unwrap());
        assert!(records
            .iter()
            .all(|r| r.channel_counts.len() == 3 && r.channel_counts.values().all(|&n| n >= 0)));
    }

    #[test]
    fn every_day_spikes_when_outbreaks_are_certain() {
        let mut certain = config();
        certain.outbreak_probability = 1.0;
        let records = generate(&certain).unwrap();
        assert!(records.iter().all(|r| r.channel_counts["fever"] >= 5
            && r.channel_counts["cough"] >= 3
            && r.channel_counts["diarrhea"] >= 2));
    }

    #[test]
    fn rejects_inverted_scale_range() {
        let mut bad = config();
        bad.location_scale = (1.3, 0.7);
        assert!(generate(&bad).is_err());
    }

    #[test]
    fn written_csv_reads_back_and_scores() {
        let records = generate(&config()).unwrap();
        let mut buf = Vec::new();
        write_symptoms_csv(&mut buf, &records).unwrap();

        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("location,date,fever,cough,diarrhea\n"));

        let parsed = ingest::parse_symptoms(buf.as_slice()).unwrap();
        assert_eq!(parsed, records);

        let scored = anomaly::score(&parsed, &ScoringConfig::default()).unwrap();
        assert_eq!(scored.len(), records.len());
        assert!(scored.iter().all(|d| d.zscore.is_finite()));
    }
}
