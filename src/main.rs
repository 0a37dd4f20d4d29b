use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

use trainready::batch::{compute_and_store, NightlyBatch};
use trainready::calibration::{AdaptiveThresholds, CalibrationEntry, CalibrationOutcome};
use trainready::logging::{init_logging, LogLevel};
use trainready::{BalanceZone, Database, EngineConfig, ReadinessEngine, TrainingPhase, ZoneInfo};

/// TrainReady - training load and readiness scoring
///
/// Derives acute/chronic training load, balance zones and a composite daily
/// readiness score from stored workout history.
#[derive(Parser)]
#[command(name = "trainready")]
#[command(version)]
#[command(about = "Training load and readiness scoring", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides the configured database path
    #[arg(short, long, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Current acute/chronic load, trends and phase
    Load {
        #[arg(short, long)]
        athlete: String,

        /// Target date (YYYY-MM-DD), defaults to today
        #[arg(short = 't', long)]
        date: Option<NaiveDate>,
    },

    /// Daily load history
    History {
        #[arg(short, long)]
        athlete: String,

        #[arg(short = 't', long)]
        date: Option<NaiveDate>,

        /// Number of days to show
        #[arg(short = 'n', long, default_value = "28")]
        days: u16,
    },

    /// Population and personal balance zones
    Zone {
        #[arg(short, long)]
        athlete: String,

        #[arg(short = 't', long)]
        date: Option<NaiveDate>,
    },

    /// Compute (and store) the daily readiness score
    Readiness {
        #[arg(short, long)]
        athlete: String,

        #[arg(short = 't', long)]
        date: Option<NaiveDate>,

        /// Compute without writing the result
        #[arg(long)]
        dry_run: bool,
    },

    /// Recompute readiness for every athlete
    Batch {
        #[arg(short = 't', long)]
        date: Option<NaiveDate>,

        /// Worker threads (0 for one per core)
        #[arg(long)]
        threads: Option<usize>,
    },

    /// Log what the athlete did with a readiness-driven suggestion
    Calibrate {
        #[arg(short, long)]
        athlete: String,

        #[arg(short, long)]
        workout: String,

        /// Readiness score when the decision was made
        #[arg(short, long)]
        score: f64,

        /// completed, modified, swapped or skipped
        #[arg(short, long)]
        outcome: CalibrationOutcome,

        #[arg(long)]
        workout_type: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        efficiency_delta: Option<f64>,

        /// Subjective feel, 1-10
        #[arg(long)]
        feel: Option<u8>,
    },

    /// Show the athlete's readiness thresholds
    Thresholds {
        #[arg(short, long)]
        athlete: String,
    },
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Date")]
    date: NaiveDate,
    #[tabled(rename = "Stress")]
    stress: String,
    #[tabled(rename = "Workouts")]
    workouts: u16,
    #[tabled(rename = "Acute")]
    acute: String,
    #[tabled(rename = "Chronic")]
    chronic: String,
    #[tabled(rename = "Balance")]
    balance: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::load_or_default(),
    };
    if let Some(db) = &cli.database {
        config.database_path = db.clone();
    }

    config.logging.level = match cli.verbose {
        0 => config.logging.level,
        1 => LogLevel::Info,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };
    init_logging(&config.logging)?;

    let today = Utc::now().date_naive();

    match cli.command {
        Commands::Load { athlete, date } => {
            let db = open_database(&config)?;
            let summary = ReadinessEngine::new(&db, &config).summarize(&athlete, date.unwrap_or(today))?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", format!("Training load for {} on {}", athlete, summary.date).blue().bold());
                println!("  Acute:   {:>7.1}  ({})", summary.acute_load, summary.acute_trend.as_str());
                println!("  Chronic: {:>7.1}  ({})", summary.chronic_load, summary.chronic_trend.as_str());
                println!("  Balance: {:>7.1}  ({})", summary.balance, summary.balance_trend.as_str());
                println!("  Phase:   {}", phase_colored(summary.phase));
                println!();
                println!("{}", summary.recommendation.italic());
            }
        }

        Commands::History { athlete, date, days } => {
            let db = open_database(&config)?;
            let history = ReadinessEngine::new(&db, &config).load_history(&athlete, date.unwrap_or(today), days)?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                let rows: Vec<HistoryRow> = history
                    .iter()
                    .map(|d| HistoryRow {
                        date: d.date,
                        stress: format!("{:.1}", d.total_stress),
                        workouts: d.workout_count,
                        acute: format!("{:.1}", d.acute_load),
                        chronic: format!("{:.1}", d.chronic_load),
                        balance: format!("{:.1}", d.balance),
                    })
                    .collect();
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }

        Commands::Zone { athlete, date } => {
            let db = open_database(&config)?;
            let assessment = ReadinessEngine::new(&db, &config).zone_assessment(&athlete, date.unwrap_or(today))?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&assessment)?);
            } else {
                println!("{}", format!("Balance {:.1} on {}", assessment.balance, assessment.date).bold());
                print_zone("Population", &assessment.population);
                print_zone("Personal", &assessment.personal);
                if !assessment.profile.is_sufficient_data {
                    println!(
                        "{}",
                        format!(
                            "  Only {} days of history; personal bands use population defaults",
                            assessment.profile.sample_days
                        )
                        .dimmed()
                    );
                }
            }
        }

        Commands::Readiness { athlete, date, dry_run } => {
            let mut db = open_database(&config)?;
            let target = date.unwrap_or(today);
            let result = if dry_run {
                ReadinessEngine::new(&db, &config).compute_readiness(&athlete, target)?
            } else {
                compute_and_store(&mut db, &config, &athlete, target)?
            };
            let thresholds = if dry_run {
                db.load_thresholds(&athlete)?
                    .unwrap_or_else(|| AdaptiveThresholds::from_defaults(&athlete, &config.calibration))
            } else {
                db.get_or_create_thresholds(&athlete, &config.calibration)?
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                let score = format!("{:.1}", result.score);
                let score = if result.score >= thresholds.swap_quality {
                    score.green()
                } else if result.score >= thresholds.skip_day {
                    score.yellow()
                } else {
                    score.red()
                };
                println!("{} {}", format!("Readiness for {} on {}:", athlete, result.date).bold(), score.bold());
                println!(
                    "  Confidence {:.0}% ({}/{} signals)",
                    result.confidence * 100.0,
                    result.signals_available,
                    result.signals_total
                );
                for (name, value) in result.components.to_map() {
                    match value {
                        Some(v) => {
                            let weight = result.weights_used.get(&name).copied().unwrap_or(0.0);
                            println!("  {:<14} {:>6.1}  weight {:.2}", name, v, weight);
                        }
                        None => println!("  {:<14} {}", name, "unavailable".dimmed()),
                    }
                }
                println!("  Suggestion: {}", thresholds.suggest(result.score).as_str().cyan());
                if dry_run {
                    println!("{}", "  (not stored)".dimmed());
                }
            }
        }

        Commands::Batch { date, threads } => {
            if let Some(threads) = threads {
                config.batch.threads = threads;
            }
            let batch = NightlyBatch::new(config.database_path.clone(), config.clone());
            let summary = batch.run_all(date.unwrap_or(today))?;

            println!("{}", summary.to_string_pretty());
            for (athlete_id, error) in summary.errors() {
                println!("  {} {}: {}", "✗".red(), athlete_id, error);
            }
            if summary.is_fully_successful() {
                println!("{}", "✓ Batch completed".green());
            }
        }

        Commands::Calibrate {
            athlete,
            workout,
            score,
            outcome,
            workout_type,
            efficiency_delta,
            feel,
        } => {
            let db = open_database(&config)?;
            let mut entry = CalibrationEntry::new(&athlete, &workout, score, workout_type, outcome)?;
            if let Some(delta) = efficiency_delta {
                entry = entry.with_efficiency_delta(delta);
            }
            if let Some(feel) = feel {
                entry = entry.with_subjective_feel(feel)?;
            }
            db.log_calibration(&entry)?;
            println!("{}", format!("✓ Logged {} for workout {}", outcome.as_str(), workout).green());
        }

        Commands::Thresholds { athlete } => {
            let mut db = open_database(&config)?;
            let thresholds = db.get_or_create_thresholds(&athlete, &config.calibration)?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&thresholds)?);
            } else {
                let source = if thresholds.is_learned { "learned" } else { "defaults" };
                println!("{}", format!("Readiness thresholds for {} ({})", athlete, source).bold());
                println!("  Skip day below        {:>5.1}", thresholds.skip_day);
                println!("  Reduce volume below   {:>5.1}", thresholds.reduce_volume);
                println!("  Swap quality below    {:>5.1}", thresholds.swap_quality);
                println!("  Increase volume from  {:>5.1}", thresholds.increase_volume);
                println!("  Samples               {:>5}", thresholds.sample_count);
            }
        }
    }

    Ok(())
}

fn open_database(config: &EngineConfig) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory: {}", parent.display()))?;
    }
    Database::new(&config.database_path)
        .with_context(|| format!("Failed to open database: {}", config.database_path.display()))
}

fn phase_colored(phase: TrainingPhase) -> ColoredString {
    match phase {
        TrainingPhase::Building => phase.as_str().yellow(),
        TrainingPhase::Tapering => phase.as_str().green(),
        TrainingPhase::Recovering => phase.as_str().blue(),
        TrainingPhase::Maintaining => phase.as_str().normal(),
    }
}

fn print_zone(label: &str, info: &ZoneInfo) {
    let name = match info.zone {
        BalanceZone::RaceReady => info.label.green(),
        BalanceZone::Recovering => info.label.blue(),
        BalanceZone::OptimalTraining => info.label.yellow(),
        BalanceZone::Overreaching => info.label.truecolor(255, 165, 0),
        BalanceZone::OvertrainingRisk => info.label.red(),
    };
    println!("  {:<11} {}", format!("{}:", label), name.bold());
    println!("  {:<11} {}", "", info.description.dimmed());
}
