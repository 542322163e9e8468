use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{LocationSummary, ScoredDay};

pub fn scores_on(days: &[ScoredDay], date: NaiveDate) -> Vec<&ScoredDay> {
    days.iter().filter(|d| d.date == date).collect()
}

pub fn latest_per_location(days: &[ScoredDay]) -> Vec<&ScoredDay> {
    let mut latest: BTreeMap<&str, &ScoredDay> = BTreeMap::new();
    for day in days {
        let entry = latest.entry(day.location.as_str()).or_insert(day);
        if day.date > entry.date {
            *entry = day;
        }
    }
    latest.into_values().collect()
}

/// Days whose z-score reaches `threshold`, highest first.
pub fn flag_anomalies(days: &[ScoredDay], threshold: f64) -> Vec<&ScoredDay> {
    let mut flagged: Vec<&ScoredDay> = days.iter().filter(|d| d.zscore >= threshold).collect();
    flagged.sort_by(|a, b| {
        b.zscore
            .partial_cmp(&a.zscore)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.location.cmp(&b.location))
            .then_with(|| a.date.cmp(&b.date))
    });
    flagged
}

pub fn summarize_locations(days: &[ScoredDay]) -> Vec<LocationSummary> {
    let mut summaries: BTreeMap<&str, LocationSummary> = BTreeMap::new();

    for day in days {
        let entry = summaries
            .entry(day.location.as_str())
            .or_insert_with(|| LocationSummary {
                location: day.location.clone(),
                days: 0,
                first_date: day.date,
                last_date: day.date,
                total_symptoms: 0,
                peak_zscore: day.zscore,
                peak_date: day.date,
            });

        entry.days += 1;
        entry.first_date = entry.first_date.min(day.date);
        entry.last_date = entry.last_date.max(day.date);
        entry.total_symptoms = entry.total_symptoms.saturating_add(day.total_symptoms);
        if day.zscore > entry.peak_zscore {
            entry.peak_zscore = day.zscore;
            entry.peak_date = day.date;
        }
    }

    summaries.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly;
    use crate::config::ScoringConfig;
    use crate::models::SymptomRecord;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn scored() -> Vec<ScoredDay> {
        let mut records = Vec::new();
        for (i, total) in [1, 1, 1, 1, 1, 1, 10].iter().enumerate() {
            let record = SymptomRecord::new("Clinic A", day(i as u32 + 1));
            records.push(record.with_count("fever", *total));
        }
        for (i, total) in [2, 2, 2].iter().enumerate() {
            let record = SymptomRecord::new("Clinic B", day(i as u32 + 3));
            records.push(record.with_count("cough", *total));
        }
        anomaly::score(&records, &ScoringConfig::new(7, 5)).unwrap()
    }

    #[test]
    fn picks_rows_for_one_date() {
        let days = scored();
        let on_fourth = scores_on(&days, day(4));
        assert_eq!(on_fourth.len(), 2);
        assert!(scores_on(&days, day(20)).is_empty());
    }

    #[test]
    fn latest_row_per_location() {
        let days = scored();
        let latest = latest_per_location(&days);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].date, day(7));
        assert_eq!(latest[1].location, "Clinic B");
        assert_eq!(latest[1].date, day(5));
    }

    #[test]
    fn flags_only_the_spike() {
        let days = scored();
        let flagged = flag_anomalies(&days, 2.0);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].location, "Clinic A");
        assert_eq!(flagged[0].date, day(7));
    }

    #[test]
    fn summary_tracks_peak() {
        let days = scored();
        let summaries = summarize_locations(&days);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].days, 7);
        assert_eq!(summaries[0].total_symptoms, 16);
        assert_eq!(summaries[0].peak_date, day(7));
        assert_eq!(summaries[1].first_date, day(3));
        assert_eq!(summaries[1].peak_zscore, 0.0);
    }
}
