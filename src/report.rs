use std::fmt::Write;

use chrono::NaiveDate;

use crate::config::ScoringConfig;
use crate::models::ScoredDay;
use crate::snapshot;

fn format_mean(mean: Option<f64>) -> String {
    mean.map(|m| format!("{m:.2}")).unwrap_or_else(|| "n/a".to_string())
}

pub fn build_report(
    as_of: Option<NaiveDate>,
    config: &ScoringConfig,
    days: &[ScoredDay],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Outbreak Early Warning Report");
    let _ = writeln!(
        output,
        "Rolling window {} days (min {} days of history), flag threshold z >= {:.1}",
        config.window, config.min_periods, config.threshold
    );
    let _ = writeln!(output);

    let current = match as_of {
        Some(date) => {
            let _ = writeln!(output, "## Scores on {}", date);
            snapshot::scores_on(days, date)
        }
        None => {
            let _ = writeln!(output, "## Latest Scores");
            snapshot::latest_per_location(days)
        }
    };

    if current.is_empty() {
        let _ = writeln!(output, "No scored days for this date.");
    } else {
        for day in current {
            let _ = writeln!(
                output,
                "- {} on {}: {} symptoms (mean {}, std {:.2}) z {:.2}",
                day.location,
                day.date,
                day.total_symptoms,
                format_mean(day.rolling_mean),
                day.rolling_std,
                day.zscore
            );
        }
    }

    let flagged = snapshot::flag_anomalies(days, config.threshold);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Flagged Anomalies");

    if flagged.is_empty() {
        let _ = writeln!(output, "No days at or above the threshold.");
    } else {
        for day in flagged.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} on {}: z {:.2} ({} symptoms vs mean {})",
                day.location,
                day.date,
                day.zscore,
                day.total_symptoms,
                format_mean(day.rolling_mean)
            );
        }
    }

    let summaries = snapshot::summarize_locations(days);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Location Summary");

    if summaries.is_empty() {
        let _ = writeln!(output, "No symptom reports.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} days ({} to {}), {} symptoms, peak z {:.2} on {}",
                summary.location,
                summary.days,
                summary.first_date,
                summary.last_date,
                summary.total_symptoms,
                summary.peak_zscore,
                summary.peak_date
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly;
    use crate::models::SymptomRecord;

    fn scored() -> Vec<ScoredDay> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let records: Vec<SymptomRecord> = [1, 1, 1, 1, 1, 1, 10]
            .iter()
            .enumerate()
            .map(|(i, total)| {
                SymptomRecord::new("Clinic A", start + chrono::Duration::days(i as i64))
                    .with_count("fever", *total)
            })
            .collect();
        anomaly::score(&records, &ScoringConfig::default()).unwrap()
    }

    #[test]
    fn report_lists_spike_under_flagged_anomalies() {
        let report = build_report(None, &ScoringConfig::default(), &scored());

        assert!(report.starts_with("# Outbreak Early Warning Report"));
        assert!(report.contains("## Latest Scores"));
        assert!(report.contains("- Clinic A on 2024-01-07: z 2.45 (10 symptoms vs mean 2.29)"));
        assert!(report.contains("- Clinic A: 7 days (2024-01-01 to 2024-01-07), 16 symptoms"));
    }

    #[test]
    fn warm_up_days_show_no_mean() {
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 2);
        let report = build_report(as_of, &ScoringConfig::default(), &scored());
        assert!(report.contains("## Scores on 2024-01-02"));
        assert!(report.contains("1 symptoms (mean n/a, std 0.00) z 0.00"));
    }

    #[test]
    fn empty_input_renders_placeholders() {
        let report = build_report(None, &ScoringConfig::default(), &[]);
        assert!(report.contains("No scored days for this date."));
        assert!(report.contains("No days at or above the threshold."));
        assert!(report.contains("No symptom reports."));
    }
}
