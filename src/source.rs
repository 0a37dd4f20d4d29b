//! Read interface to the primary training data.
//!
//! The engine only reads through this trait, so it runs the same against the
//! SQLite store or an in-memory fixture.

use crate::error::Result;
use crate::models::{AthleteProfile, DailyCheckin, EfficiencyPoint, PlannedWorkout, WorkoutRecord};
use chrono::NaiveDate;

pub trait TrainingDataSource {
    /// Athlete profile, `None` when the id is unknown
    fn athlete(&self, athlete_id: &str) -> Result<Option<AthleteProfile>>;

    /// Activities whose start date falls in `start..=end`, oldest first
    fn activities(&self, athlete_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<WorkoutRecord>>;

    /// Planned workouts dated in `start..=end`
    fn planned_workouts(&self, athlete_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PlannedWorkout>>;

    /// Per-activity efficiency values dated in `start..=end`
    fn efficiency_series(&self, athlete_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<EfficiencyPoint>>;

    /// Recovery half-life estimate from the recovery-metrics collaborator
    fn estimated_recovery_half_life(&self, athlete_id: &str) -> Result<Option<f64>>;

    /// Daily check-ins dated in `start..=end`, oldest first
    fn checkins(&self, athlete_id: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyCheckin>>;
}
