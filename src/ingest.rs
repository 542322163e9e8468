use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use tracing::debug;

use crate::models::SymptomRecord;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("CSV is missing required column `{0}`")]
    MissingColumn(&'static str),
    #[error("CSV has no symptom channel columns besides location and date")]
    NoChannels,
    #[error("line {line}: invalid date `{value}` (expected YYYY-MM-DD)")]
    InvalidDate { line: u64, value: String },
    #[error("line {line}: invalid `{channel}` count `{value}`")]
    InvalidCount {
        line: u64,
        channel: String,
        value: String,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub fn read_symptoms_csv(csv_path: &Path) -> anyhow::Result<Vec<SymptomRecord>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let records = parse_symptoms(file)
        .with_context(|| format!("failed to read symptoms from {}", csv_path.display()))?;
    Ok(records)
}

/// Parses a `location,date,<channel>...` CSV. Every column other than
/// `location` and `date` is treated as a symptom channel; empty cells count
/// as zero.
pub fn parse_symptoms<R: Read>(input: R) -> Result<Vec<SymptomRecord>, IngestError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    let headers = reader.headers()?.clone();

    let location_idx = column(&headers, "location")?;
    let date_idx = column(&headers, "date")?;
    let channels: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != location_idx && *idx != date_idx)
        .map(|(idx, name)| (idx, name.to_string()))
        .collect();
    if channels.is_empty() {
        return Err(IngestError::NoChannels);
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();

        let raw_date = row.get(date_idx).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|_| {
            IngestError::InvalidDate {
                line,
                value: raw_date.to_string(),
            }
        })?;

        let mut record = SymptomRecord::new(row.get(location_idx).unwrap_or_default(), date);
        for (idx, channel) in &channels {
            let raw = row.get(*idx).unwrap_or_default();
            let count = if raw.is_empty() {
                0
            } else {
                raw.parse::<i64>().map_err(|_| IngestError::InvalidCount {
                    line,
                    channel: channel.clone(),
                    value: raw.to_string(),
                })?
            };
            record.channel_counts.insert(channel.clone(), count);
        }
        records.push(record);
    }

    debug!(rows = records.len(), channels = channels.len(), "parsed symptom CSV");
    Ok(records)
}

fn column(headers: &csv::StringRecord, name: &'static str) -> Result<usize, IngestError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or(IngestError::MissingColumn(name))
}
