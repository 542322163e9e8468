use std::collections::BTreeSet;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::ScoringConfig;
use crate::models::ScoredDay;

#[derive(Debug, Serialize)]
pub struct ScoringRun<'a> {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub window: usize,
    pub min_periods: usize,
    pub days: &'a [ScoredDay],
}

impl<'a> ScoringRun<'a> {
    pub fn new(config: &ScoringConfig, days: &'a [ScoredDay]) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            window: config.window,
            min_periods: config.min_periods,
            days,
        }
    }
}

pub fn write_scored_json<W: Write>(
    writer: W,
    config: &ScoringConfig,
    days: &[ScoredDay],
) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(writer, &ScoringRun::new(config, days))?;
    Ok(())
}

/// Writes one row per scored day. Channels are the union across all
/// locations; an undefined rolling mean is an empty cell.
pub fn write_scored_csv<W: Write>(writer: W, days: &[ScoredDay]) -> anyhow::Result<()> {
    let channels: Vec<&String> = days
        .iter()
        .flat_map(|d| d.channels.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut out = csv::Writer::from_writer(writer);
    let mut header = vec!["location".to_string(), "date".to_string()];
    header.extend(channels.iter().map(|c| c.to_string()));
    header.extend(
        ["total_symptoms", "rolling_mean", "rolling_std", "zscore"]
            .iter()
            .map(|c| c.to_string()),
    );
    out.write_record(&header)?;

    for day in days {
        let mut row = vec![day.location.clone(), day.date.to_string()];
        row.extend(
            channels
                .iter()
                .map(|c| day.channels.get(*c).copied().unwrap_or(0).to_string()),
        );
        row.push(day.total_symptoms.to_string());
        row.push(day.rolling_mean.map(|m| format!("{m:.6}")).unwrap_or_default());
        row.push(format!("{:.6}", day.rolling_std));
        row.push(format!("{:.6}", day.zscore));
        out.write_record(&row)?;
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly;
    use crate::models::SymptomRecord;
    use chrono::NaiveDate;

    fn scored() -> Vec<ScoredDay> {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let records = vec![
            SymptomRecord::new("Clinic A", date).with_count("fever", 2),
            SymptomRecord::new("Clinic A", date + chrono::Duration::days(1))
                .with_count("fever", 4)
                .with_count("cough", 1),
        ];
        anomaly::score(&records, &ScoringConfig::new(2, 2)).unwrap()
    }

    #[test]
    fn csv_leaves_warm_up_mean_blank() {
        let mut buf = Vec::new();
        write_scored_csv(&mut buf, &scored()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "location,date,cough,fever,total_symptoms,rolling_mean,rolling_std,zscore"
        );
        assert_eq!(lines[1], "Clinic A,2024-01-01,0,2,2,,0.000000,0.000000");
        assert_eq!(lines[2], "Clinic A,2024-01-02,1,4,5,3.500000,1.500000,1.000000");
    }

    #[test]
    fn json_run_carries_parameters_and_null_mean() {
        let days = scored();
        let mut buf = Vec::new();
        write_scored_json(&mut buf, &ScoringConfig::new(2, 2), &days).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(value["window"], 2);
        assert_eq!(value["min_periods"], 2);
        assert!(value["days"][0]["rolling_mean"].is_null());
        assert_eq!(value["days"][1]["date"], "2024-01-02");
        assert_eq!(value["days"][1]["channels"]["fever"], 4);
    }
}
