use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::warn;

mod anomaly;
mod config;
mod ingest;
mod logging;
mod models;
mod output;
mod report;
mod snapshot;
mod synthetic;

use config::ScoringConfig;

#[derive(Parser)]
#[command(name = "outbreak-early-warning")]
#[command(
    about = "Flags anomalous symptom counts per location with rolling z-scores",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ScoringArgs {
    /// Symptom CSV with location, date and one column per symptom channel
    #[arg(long)]
    csv: PathBuf,
    /// Rolling window length in days
    #[arg(long, env = "OUTBREAK_WINDOW", default_value_t = config::DEFAULT_WINDOW)]
    window: usize,
    /// Days of history required before a day is scored
    #[arg(long, env = "OUTBREAK_MIN_PERIODS", default_value_t = config::DEFAULT_MIN_PERIODS)]
    min_periods: usize,
    /// Z-score at or above which a day is flagged
    #[arg(long, env = "OUTBREAK_THRESHOLD", default_value_t = config::DEFAULT_THRESHOLD)]
    threshold: f64,
}

impl ScoringArgs {
    fn config(&self) -> ScoringConfig {
        ScoringConfig::new(self.window, self.min_periods).with_threshold(self.threshold)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the full scored series for every location
    Score {
        #[command(flatten)]
        scoring: ScoringArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,
        /// Destination file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show each location's scores for one day
    Latest {
        #[command(flatten)]
        scoring: ScoringArgs,
        /// Day to show (each location's most recent day when omitted)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// List days at or above the z-score threshold
    Flag {
        #[command(flatten)]
        scoring: ScoringArgs,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        scoring: ScoringArgs,
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write a seeded synthetic symptom CSV
    Synth {
        #[arg(long, default_value = "symptoms.csv")]
        out: PathBuf,
        #[arg(long, default_value_t = synthetic::DEFAULT_SEED)]
        seed: u64,
        #[arg(long, default_value_t = synthetic::DEFAULT_DAYS)]
        days: u32,
        /// First day (60 days ago when omitted)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Location label; repeat for several (Clinic A/B/C when omitted)
        #[arg(long = "location")]
        locations: Vec<String>,
    },
}

async fn load_and_score(
    scoring: &ScoringArgs,
) -> anyhow::Result<(ScoringConfig, Vec<models::ScoredDay>)> {
    let config = scoring.config();
    let records = ingest::read_symptoms_csv(&scoring.csv)?;
    let days = anomaly::score_concurrent(&records, &config)
        .await
        .context("failed to score symptom series")?;
    Ok((config, days))
}

fn print_day(day: &models::ScoredDay) {
    let mean = day
        .rolling_mean
        .map(|m| format!("{m:.2}"))
        .unwrap_or_else(|| "n/a".to_string());
    println!(
        "- {} on {}: {} symptoms, mean {}, std {:.2}, z {:.2}",
        day.location, day.date, day.total_symptoms, mean, day.rolling_std, day.zscore
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            scoring,
            format,
            out,
        } => {
            let (config, days) = load_and_score(&scoring).await?;
            let writer: Box<dyn Write> = match &out {
                Some(path) => Box::new(
                    std::fs::File::create(path)
                        .with_context(|| format!("failed to create {}", path.display()))?,
                ),
                None => Box::new(std::io::stdout().lock()),
            };
            match format {
                OutputFormat::Csv => output::write_scored_csv(writer, &days)?,
                OutputFormat::Json => output::write_scored_json(writer, &config, &days)?,
            }
            if let Some(path) = out {
                eprintln!("Scored {} days written to {}.", days.len(), path.display());
            }
        }
        Commands::Latest { scoring, as_of } => {
            let (_, days) = load_and_score(&scoring).await?;
            let current = match as_of {
                Some(date) => snapshot::scores_on(&days, date),
                None => snapshot::latest_per_location(&days),
            };

            if current.is_empty() {
                println!("No scored days for this date.");
                return Ok(());
            }

            println!("Anomaly scores by location:");
            for day in current {
                print_day(day);
            }
        }
        Commands::Flag { scoring, limit } => {
            let (config, days) = load_and_score(&scoring).await?;
            let flagged = snapshot::flag_anomalies(&days, config.threshold);

            if flagged.is_empty() {
                println!("No days at or above z {:.1}.", config.threshold);
                return Ok(());
            }

            warn!(
                count = flagged.len(),
                threshold = config.threshold,
                "anomalous days detected"
            );
            println!("Days at or above z {:.1}:", config.threshold);
            for day in flagged.iter().take(limit) {
                print_day(day);
            }
        }
        Commands::Report {
            scoring,
            as_of,
            out,
        } => {
            let (config, days) = load_and_score(&scoring).await?;
            let report = report::build_report(as_of, &config, &days);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Synth {
            out,
            seed,
            days,
            start,
            locations,
        } => {
            let start =
                start.unwrap_or_else(|| Utc::now().date_naive() - chrono::Duration::days(60));
            let mut config = synthetic::SyntheticConfig::new(start);
            config.seed = seed;
            config.days = days;
            if !locations.is_empty() {
                config.locations = locations;
            }

            let records = synthetic::generate(&config)?;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            synthetic::write_symptoms_csv(file, &records)?;
            println!("Wrote {} synthetic rows to {}.", records.len(), out.display());
        }
    }

    Ok(())
}
