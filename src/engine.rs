//! Engine facade: fetches from a [`TrainingDataSource`] and runs the
//! calculators.
//!
//! Only an unknown athlete is an error here. Any other collaborator failure
//! turns the affected readiness signal into `SignalUnavailable::SourceError`
//! and the score is built from what remains.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::EngineConfig;
use crate::error::{Result, TrainReadyError};
use crate::models::{AthleteProfile, WorkoutRecord};
use crate::pmc::{window_start, DailyLoad, LoadSummary, PmcCalculator};
use crate::readiness::{
    DailyReadinessResult, ReadinessAggregator, ReadinessSignals, SignalKind, SignalResult,
    SignalUnavailable,
};
use crate::source::TrainingDataSource;
use crate::tss::TssCalculator;
use crate::zones::{PersonalZoneProfile, ZoneCalculator, ZoneInfo};

/// Current balance read against both threshold sets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneAssessment {
    pub athlete_id: String,
    pub date: NaiveDate,
    pub balance: f64,
    pub population: ZoneInfo,
    pub personal: ZoneInfo,
    pub profile: PersonalZoneProfile,
}

pub struct ReadinessEngine<'a, S: TrainingDataSource> {
    source: &'a S,
    pmc: PmcCalculator,
    zones: ZoneCalculator,
    readiness: ReadinessAggregator,
}

impl<'a, S: TrainingDataSource> ReadinessEngine<'a, S> {
    pub fn new(source: &'a S, config: &EngineConfig) -> Self {
        let stress = TssCalculator::with_config(config.stress.clone());
        ReadinessEngine {
            source,
            pmc: PmcCalculator::with_config(config.load.clone(), stress),
            zones: ZoneCalculator::with_config(config.zones.clone()),
            readiness: ReadinessAggregator::with_config(config.readiness.clone()),
        }
    }

    fn athlete(&self, athlete_id: &str) -> Result<AthleteProfile> {
        self.source
            .athlete(athlete_id)?
            .ok_or_else(|| TrainReadyError::athlete_not_found(athlete_id))
    }

    fn window_activities(
        &self,
        athlete_id: &str,
        end: NaiveDate,
        n_days: u16,
    ) -> Result<Vec<WorkoutRecord>> {
        self.source
            .activities(athlete_id, window_start(end, n_days), end)
    }

    /// Load state on `target_date` from the backfill window
    #[instrument(skip(self))]
    pub fn summarize(&self, athlete_id: &str, target_date: NaiveDate) -> Result<LoadSummary> {
        let athlete = self.athlete(athlete_id)?;
        let backfill = self.pmc.config().backfill_days;
        let activities = self.window_activities(athlete_id, target_date, backfill)?;
        Ok(self.pmc.summarize(&athlete, target_date, &activities))
    }

    /// Daily loads for the `n_days` ending at `end_date`
    pub fn load_history(
        &self,
        athlete_id: &str,
        end_date: NaiveDate,
        n_days: u16,
    ) -> Result<Vec<DailyLoad>> {
        let athlete = self.athlete(athlete_id)?;
        let activities = self.window_activities(athlete_id, end_date, n_days)?;
        Ok(self.pmc.history(&athlete, end_date, n_days, &activities))
    }

    /// Classify the current balance against population and personal bands.
    ///
    /// One replay covers the profile window plus a leading warm-up of
    /// `backfill_days`. Warm-up days are dropped from the profile, and the
    /// classified balance is the replay's own final day.
    #[instrument(skip(self))]
    pub fn zone_assessment(&self, athlete_id: &str, target_date: NaiveDate) -> Result<ZoneAssessment> {
        let athlete = self.athlete(athlete_id)?;
        let profile_days = self.zones.config().profile_lookback_days;
        let replay_days = profile_days.saturating_add(self.pmc.config().backfill_days);
        let activities = self.window_activities(athlete_id, target_date, replay_days)?;

        let history = self.pmc.history(&athlete, target_date, replay_days, &activities);
        let warmup = history.len().saturating_sub(profile_days as usize);
        let balances: Vec<f64> = history[warmup..].iter().map(|d| d.balance).collect();
        let profile = self.zones.build_profile(athlete_id, &balances);
        let balance = history.last().map(|d| d.balance).unwrap_or(0.0);

        Ok(ZoneAssessment {
            athlete_id: athlete_id.to_string(),
            date: target_date,
            balance,
            population: self.zones.population_zone(balance),
            personal: self.zones.personal_zone(&profile, balance),
            profile,
        })
    }

    /// Gather every signal and blend them into the day's readiness
    #[instrument(skip(self))]
    pub fn compute_readiness(
        &self,
        athlete_id: &str,
        target_date: NaiveDate,
    ) -> Result<DailyReadinessResult> {
        let athlete = self.athlete(athlete_id)?;
        let signals = self.collect_signals(&athlete, target_date);

        for kind in SignalKind::ALL {
            if let Err(reason) = signals.get(kind) {
                debug!(athlete_id, signal = kind.as_str(), %reason, "Signal unavailable");
            }
        }

        let result = self.readiness.compute(athlete_id, target_date, &signals);
        info!(
            athlete_id,
            date = %target_date,
            score = result.score,
            confidence = result.confidence,
            "Readiness computed"
        );
        Ok(result)
    }

    fn collect_signals(&self, athlete: &AthleteProfile, target_date: NaiveDate) -> ReadinessSignals {
        let config = self.readiness.config();
        let backfill = self.pmc.config().backfill_days;

        let (tsb, recovery_days) = match self.window_activities(&athlete.id, target_date, backfill) {
            Ok(activities) => {
                let summary = self.pmc.summarize(athlete, target_date, &activities);
                let days_since = self.days_since_quality(athlete, target_date, &activities);
                (
                    self.readiness.tsb_signal(summary.balance),
                    self.readiness.recovery_days_signal(days_since),
                )
            }
            Err(e) => (Err(source_error(&e)), Err(source_error(&e))),
        };

        let fitness_trend = self
            .source
            .efficiency_series(&athlete.id, window_start(target_date, config.trend_days), target_date)
            .map_err(|e| source_error(&e))
            .and_then(|points| self.readiness.fitness_trend_signal(&points));

        let completion = self
            .source
            .planned_workouts(
                &athlete.id,
                window_start(target_date, config.completion_days),
                target_date,
            )
            .map_err(|e| source_error(&e))
            .and_then(|planned| self.readiness.completion_signal(&planned));

        let half_life = match athlete.recovery_half_life_hours {
            Some(hours) => self.readiness.half_life_signal(Some(hours)),
            None => self
                .source
                .estimated_recovery_half_life(&athlete.id)
                .map_err(|e| source_error(&e))
                .and_then(|hours| self.readiness.half_life_signal(hours)),
        };

        let (hrv, sleep) = self.checkin_signals(&athlete.id, target_date);

        ReadinessSignals {
            tsb,
            fitness_trend,
            completion,
            recovery_days,
            half_life,
            hrv,
            sleep,
        }
    }

    fn checkin_signals(&self, athlete_id: &str, target_date: NaiveDate) -> (SignalResult, SignalResult) {
        let baseline_days = self.readiness.config().hrv_baseline_days as u64;
        let start = target_date
            .checked_sub_days(Days::new(baseline_days))
            .unwrap_or(target_date);

        match self.source.checkins(athlete_id, start, target_date) {
            Ok(checkins) => {
                let (today, baseline): (Vec<_>, Vec<_>) =
                    checkins.into_iter().partition(|c| c.date == target_date);
                let today = today.first();
                (
                    self.readiness.hrv_signal(today, &baseline),
                    self.readiness.sleep_signal(today),
                )
            }
            Err(e) => (Err(source_error(&e)), Err(source_error(&e))),
        }
    }

    /// Whole days between the most recent quality session and `target_date`
    fn days_since_quality(
        &self,
        athlete: &AthleteProfile,
        target_date: NaiveDate,
        activities: &[WorkoutRecord],
    ) -> Option<i64> {
        let stress = self.pmc.stress_calculator();
        activities
            .iter()
            .filter(|w| w.date() <= target_date)
            .map(|w| stress.compute(w, athlete))
            .filter(|s| stress.is_quality_session(s))
            .map(|s| s.date)
            .max()
            .map(|last| (target_date - last).num_days())
    }
}

fn source_error(e: &TrainReadyError) -> SignalUnavailable {
    SignalUnavailable::SourceError(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DailyCheckin, EfficiencyPoint, PlannedWorkout};
    use crate::zones::BalanceZone;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[derive(Default)]
    struct MemorySource {
        athlete: Option<AthleteProfile>,
        activities: Vec<WorkoutRecord>,
        planned: Vec<PlannedWorkout>,
        efficiency: Vec<EfficiencyPoint>,
        half_life: Option<f64>,
        checkins: Vec<DailyCheckin>,
        fail_activities: bool,
    }

    impl TrainingDataSource for MemorySource {
        fn athlete(&self, athlete_id: &str) -> Result<Option<AthleteProfile>> {
            Ok(self.athlete.clone().filter(|a| a.id == athlete_id))
        }

        fn activities(&self, _: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<WorkoutRecord>> {
            if self.fail_activities {
                return Err(TrainReadyError::Internal("activity store offline".to_string()));
            }
            Ok(self
                .activities
                .iter()
                .filter(|w| w.date() >= start && w.date() <= end)
                .cloned()
                .collect())
        }

        fn planned_workouts(&self, _: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PlannedWorkout>> {
            Ok(self
                .planned
                .iter()
                .filter(|p| p.date >= start && p.date <= end)
                .cloned()
                .collect())
        }

        fn efficiency_series(&self, _: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<EfficiencyPoint>> {
            Ok(self
                .efficiency
                .iter()
                .filter(|p| p.date >= start && p.date <= end)
                .cloned()
                .collect())
        }

        fn estimated_recovery_half_life(&self, _: &str) -> Result<Option<f64>> {
            Ok(self.half_life)
        }

        fn checkins(&self, _: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyCheckin>> {
            Ok(self
                .checkins
                .iter()
                .filter(|c| c.date >= start && c.date <= end)
                .cloned()
                .collect())
        }
    }

    fn target() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    }

    fn runner() -> AthleteProfile {
        AthleteProfile {
            threshold_pace_per_km: Some(dec!(300)),
            ..AthleteProfile::new("ath-1", "Runner")
        }
    }

    fn run_on(date: NaiveDate, name: &str) -> WorkoutRecord {
        WorkoutRecord {
            id: format!("run-{}", date),
            athlete_id: "ath-1".to_string(),
            start_time: Utc.from_utc_datetime(&date.and_hms_opt(7, 0, 0).unwrap()),
            duration_seconds: Some(1800),
            distance_meters: Some(5000.0),
            avg_heart_rate: None,
            avg_speed: None,
            workout_type: None,
            name: Some(name.to_string()),
        }
    }

    fn steady_source() -> MemorySource {
        steady_source_days(200)
    }

    fn steady_source_days(n_days: u16) -> MemorySource {
        let start = window_start(target(), n_days);
        MemorySource {
            athlete: Some(runner()),
            activities: start
                .iter_days()
                .take_while(|d| *d <= target())
                .map(|d| run_on(d, "Steady"))
                .collect(),
            ..MemorySource::default()
        }
    }

    #[test]
    fn test_unknown_athlete_propagates() {
        let source = MemorySource::default();
        let engine = ReadinessEngine::new(&source, &EngineConfig::default());

        let err = engine.compute_readiness("nobody", target()).unwrap_err();
        assert!(matches!(err, TrainReadyError::AthleteNotFound { .. }));
        assert!(engine.summarize("nobody", target()).is_err());
    }

    #[test]
    fn test_steady_training_summary() {
        let source = steady_source();
        let engine = ReadinessEngine::new(&source, &EngineConfig::default());

        // 6:00/km against a 5:00/km threshold: IF 0.833, below quality
        let summary = engine.summarize("ath-1", target()).unwrap();
        assert!((summary.acute_load - 34.72).abs() < 0.1);
        assert!(summary.balance.abs() < 5.0);

        let history = engine.load_history("ath-1", target(), 30).unwrap();
        assert_eq!(history.len(), 30);
        assert_eq!(history.last().map(|d| d.date), Some(target()));
    }

    #[test]
    fn test_zone_assessment_uses_personal_profile() {
        let source = steady_source();
        let engine = ReadinessEngine::new(&source, &EngineConfig::default());

        let assessment = engine.zone_assessment("ath-1", target()).unwrap();
        assert_eq!(assessment.population.zone, BalanceZone::OptimalTraining);
        assert!(assessment.profile.is_sufficient_data);
        assert_eq!(assessment.profile.sample_days, 180);
        assert!(assessment.personal.personalized);
    }

    #[test]
    fn test_steady_profile_excludes_warmup() {
        let source = steady_source_days(400);
        let config = EngineConfig::default();
        let engine = ReadinessEngine::new(&source, &config);

        let assessment = engine.zone_assessment("ath-1", target()).unwrap();
        let profile = &assessment.profile;
        assert_eq!(profile.sample_days, 180);
        assert!(assessment.balance.abs() < 0.1);
        assert!((profile.mean_balance - assessment.balance).abs() < 0.5);
        assert_eq!(profile.std_balance, config.zones.min_std_balance);
        assert_eq!(assessment.personal.zone, BalanceZone::OptimalTraining);

        let history = engine.load_history("ath-1", target(), 240).unwrap();
        assert_eq!(history.last().map(|d| d.balance), Some(assessment.balance));
    }

    #[test]
    fn test_readiness_only_tsb_available() {
        let source = steady_source();
        let engine = ReadinessEngine::new(&source, &EngineConfig::default());

        let result = engine.compute_readiness("ath-1", target()).unwrap();
        assert_eq!(result.signals_total, 5);
        assert_eq!(result.signals_available, 1);
        assert_eq!(result.confidence, 0.2);
        assert!(result.components.tsb.is_some());
        assert!(result.components.recovery_days.is_none());
        assert_eq!(result.weights_used.get("tsb"), Some(&1.0));
    }

    #[test]
    fn test_source_failure_degrades() {
        let source = MemorySource {
            athlete: Some(runner()),
            fail_activities: true,
            half_life: Some(42.0),
            ..MemorySource::default()
        };
        let engine = ReadinessEngine::new(&source, &EngineConfig::default());

        let result = engine.compute_readiness("ath-1", target()).unwrap();
        assert!(result.components.tsb.is_none());
        assert_eq!(result.signals_available, 1);
        assert_eq!(result.score, 50.0);
        assert_eq!(result.components.half_life, Some(50.0));
    }

    #[test]
    fn test_recovery_days_from_last_quality_session() {
        let mut source = steady_source();
        let quality_day = target().checked_sub_days(Days::new(3)).unwrap();
        if let Some(w) = source.activities.iter_mut().find(|w| w.date() == quality_day) {
            w.distance_meters = None;
            w.name = Some("Track intervals".to_string());
        }
        let engine = ReadinessEngine::new(&source, &EngineConfig::default());

        let result = engine.compute_readiness("ath-1", target()).unwrap();
        assert_eq!(result.components.recovery_days, Some(100.0));
    }

    #[test]
    fn test_checkins_feed_zero_weight_slots() {
        let mut source = steady_source();
        for (offset, hrv) in [(4u64, 60.0), (3, 62.0), (2, 58.0), (1, 60.0)] {
            let date = target().checked_sub_days(Days::new(offset)).unwrap();
            source
                .checkins
                .push(DailyCheckin::new("ath-1", date).with_field("hrv_ms", hrv));
        }
        source.checkins.push(
            DailyCheckin::new("ath-1", target())
                .with_field("hrv_rmssd", 66.0)
                .with_field("sleep_hours", 6.0),
        );
        let engine = ReadinessEngine::new(&source, &EngineConfig::default());

        let result = engine.compute_readiness("ath-1", target()).unwrap();
        assert_eq!(result.components.sleep, Some(75.0));
        assert!((result.components.hrv.unwrap() - 75.0).abs() < 1e-9);
        assert_eq!(result.signals_total, 5);
        assert_eq!(result.signals_available, 1);
    }
}
