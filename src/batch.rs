//! Nightly readiness recompute across athletes using rayon
//!
//! One computation per athlete. Each worker thread opens its own SQLite
//! connection; per-athlete failures are collected into the summary and never
//! abort the run.

use anyhow::Result;
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::{BatchSettings, EngineConfig};
use crate::database::Database;
use crate::engine::ReadinessEngine;
use crate::readiness::DailyReadinessResult;

/// Outcome for one athlete
#[derive(Debug, Clone)]
pub struct AthleteOutcome {
    pub athlete_id: String,
    pub result: Option<DailyReadinessResult>,
    pub error: Option<String>,
}

/// Summary of a batch run
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub date: NaiveDate,
    pub total_athletes: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_duration_ms: u128,
    pub outcomes: Vec<AthleteOutcome>,
}

impl BatchSummary {
    pub fn is_fully_successful(&self) -> bool {
        self.failed == 0
    }

    /// Failed athletes with their error messages
    pub fn errors(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.error.as_deref().map(|e| (o.athlete_id.as_str(), e)))
            .collect()
    }

    pub fn to_string_pretty(&self) -> String {
        format!(
            "Readiness Batch {}\n  \
             Athletes: {}\n  \
             Succeeded: {}\n  \
             Failed: {}\n  \
             Total Time: {:.2}s",
            self.date,
            self.total_athletes,
            self.succeeded,
            self.failed,
            self.total_duration_ms as f64 / 1000.0
        )
    }
}

pub struct NightlyBatch {
    db_path: PathBuf,
    config: EngineConfig,
}

impl NightlyBatch {
    pub fn new(db_path: impl Into<PathBuf>, config: EngineConfig) -> Self {
        Self {
            db_path: db_path.into(),
            config,
        }
    }

    fn settings(&self) -> &BatchSettings {
        &self.config.batch
    }

    /// Compute and store readiness for every known athlete
    pub fn run_all(&self, target_date: NaiveDate) -> Result<BatchSummary> {
        let athlete_ids = Database::new(&self.db_path)?.athlete_ids()?;
        self.run(&athlete_ids, target_date)
    }

    /// Compute and store readiness for the given athletes
    pub fn run(&self, athlete_ids: &[String], target_date: NaiveDate) -> Result<BatchSummary> {
        let start_time = Instant::now();
        info!(athletes = athlete_ids.len(), date = %target_date, "Starting readiness batch");

        let progress = if self.settings().show_progress {
            let pb = ProgressBar::new(athlete_ids.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({msg})")?
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut builder = rayon::ThreadPoolBuilder::new();
        if self.settings().threads > 0 {
            builder = builder.num_threads(self.settings().threads);
        }
        let pool = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))?;

        let outcomes: Vec<AthleteOutcome> = pool.install(|| {
            athlete_ids
                .par_iter()
                .map_init(
                    || Database::new(&self.db_path).map_err(|e| e.to_string()),
                    |conn, athlete_id| {
                        let outcome = match conn {
                            Ok(db) => self.process_athlete(db, athlete_id, target_date),
                            Err(e) => AthleteOutcome {
                                athlete_id: athlete_id.clone(),
                                result: None,
                                error: Some(format!("connection failed: {}", e)),
                            },
                        };
                        if let Some(pb) = &progress {
                            pb.set_message(athlete_id.clone());
                            pb.inc(1);
                        }
                        outcome
                    },
                )
                .collect()
        });

        if let Some(pb) = progress {
            pb.finish_with_message("Complete");
        }

        let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
        let summary = BatchSummary {
            date: target_date,
            total_athletes: outcomes.len(),
            succeeded: outcomes.len() - failed,
            failed,
            total_duration_ms: start_time.elapsed().as_millis(),
            outcomes,
        };

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            duration_ms = summary.total_duration_ms as u64,
            "Readiness batch finished"
        );
        Ok(summary)
    }

    fn process_athlete(&self, db: &mut Database, athlete_id: &str, target_date: NaiveDate) -> AthleteOutcome {
        match compute_and_store(db, &self.config, athlete_id, target_date) {
            Ok(result) => AthleteOutcome {
                athlete_id: athlete_id.to_string(),
                result: Some(result),
                error: None,
            },
            Err(e) => {
                warn!(athlete_id, error = %e, "Readiness computation failed");
                AthleteOutcome {
                    athlete_id: athlete_id.to_string(),
                    result: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Compute one athlete's readiness and upsert it
pub fn compute_and_store(
    db: &mut Database,
    config: &EngineConfig,
    athlete_id: &str,
    target_date: NaiveDate,
) -> crate::Result<DailyReadinessResult> {
    let result = ReadinessEngine::new(&*db, config).compute_readiness(athlete_id, target_date)?;
    db.upsert_daily_readiness(&result)?;
    Ok(result)
}
