use chrono::{Days, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

use trainready::calibration::{CalibrationEntry, CalibrationOutcome, SuggestedAction, ThresholdDefaults};
use trainready::pmc::window_start;
use trainready::{
    AthleteProfile, BalanceZone, Database, EngineConfig, PlannedWorkout, ReadinessEngine,
    TrainReadyError, TrainingPhase, TrendDirection, WorkoutRecord,
};

/// End-to-end workflows over an in-memory database

fn create_test_athlete() -> AthleteProfile {
    AthleteProfile {
        threshold_pace_per_km: Some(dec!(300)),
        ..AthleteProfile::new("test_athlete", "Test Athlete")
    }
}

/// A run at exactly threshold pace; stress = minutes × 100 / 60
fn threshold_run(date: NaiveDate, minutes: u32) -> WorkoutRecord {
    WorkoutRecord {
        id: format!("run-{}", date),
        athlete_id: "test_athlete".to_string(),
        start_time: Utc.from_utc_datetime(&date.and_hms_opt(6, 30, 0).unwrap()),
        duration_seconds: Some(minutes * 60),
        distance_meters: Some(minutes as f64 * 200.0),
        avg_heart_rate: None,
        avg_speed: None,
        workout_type: Some("run".to_string()),
        name: None,
    }
}

fn days_ending(end: NaiveDate, n: u16) -> Vec<NaiveDate> {
    window_start(end, n)
        .iter_days()
        .take_while(|d| *d <= end)
        .collect()
}

fn seeded_database(workouts: &[WorkoutRecord]) -> Database {
    let mut db = Database::in_memory().unwrap();
    db.insert_athlete(&create_test_athlete()).unwrap();
    db.insert_activities(workouts).unwrap();
    db
}

fn target() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

#[test]
fn test_steady_training_lands_in_optimal_zone() {
    let workouts: Vec<WorkoutRecord> = days_ending(target(), 90)
        .into_iter()
        .map(|d| threshold_run(d, 30))
        .collect();
    let db = seeded_database(&workouts);
    let config = EngineConfig::default();
    let engine = ReadinessEngine::new(&db, &config);

    let summary = engine.summarize("test_athlete", target()).unwrap();
    assert!((summary.acute_load - 50.0).abs() < 0.01);
    // Chronic is still 6% short of steady state after the 60-day backfill
    assert!((summary.chronic_load - 47.13).abs() < 0.05);
    assert!(summary.balance < 0.0 && summary.balance > -5.0);
    assert_eq!(summary.acute_trend, TrendDirection::Stable);
    assert_eq!(summary.chronic_trend, TrendDirection::Stable);
    assert_eq!(summary.phase, TrainingPhase::Maintaining);

    let assessment = engine.zone_assessment("test_athlete", target()).unwrap();
    assert_eq!(assessment.population.zone, BalanceZone::OptimalTraining);
    assert!(!assessment.population.personalized);
    assert!(assessment.profile.is_sufficient_data);
}

#[test]
fn test_heavy_block_then_rest_turns_fresh() {
    let block_end = target().checked_sub_days(Days::new(14)).unwrap();
    // 48 minutes at threshold = 80 stress per day
    let workouts: Vec<WorkoutRecord> = days_ending(block_end, 40)
        .into_iter()
        .map(|d| threshold_run(d, 48))
        .collect();
    let db = seeded_database(&workouts);
    let config = EngineConfig::default();
    let engine = ReadinessEngine::new(&db, &config);

    let history = engine.load_history("test_athlete", target(), 54).unwrap();
    assert_eq!(history.len(), 54);
    let rest = &history[40..];
    assert!(rest.iter().all(|d| d.total_stress == 0.0));

    let before_rest = history[39].balance;
    assert!(before_rest < 0.0);
    for pair in rest[..7].windows(2) {
        assert!(pair[1].balance > pair[0].balance);
    }
    assert!(rest[0].balance > before_rest);

    let summary = engine.summarize("test_athlete", target()).unwrap();
    assert!(summary.balance > 15.0);
    assert!(summary.balance > before_rest);
    assert_eq!(summary.acute_trend, TrendDirection::Falling);
    assert_eq!(summary.phase, TrainingPhase::Tapering);

    let assessment = engine.zone_assessment("test_athlete", target()).unwrap();
    assert_eq!(assessment.population.zone, BalanceZone::RaceReady);
    assert!(assessment.population.is_race_window);
}

#[test]
fn test_unknown_athlete_is_not_found() {
    let db = seeded_database(&[]);
    let config = EngineConfig::default();
    let engine = ReadinessEngine::new(&db, &config);

    match engine.compute_readiness("ghost", target()) {
        Err(TrainReadyError::AthleteNotFound { athlete_id }) => assert_eq!(athlete_id, "ghost"),
        other => panic!("expected AthleteNotFound, got {:?}", other),
    }
    assert!(engine.zone_assessment("ghost", target()).is_err());
    assert!(engine.load_history("ghost", target(), 7).is_err());
}

#[test]
fn test_readiness_blends_available_signals() {
    let workouts: Vec<WorkoutRecord> = days_ending(target(), 90)
        .into_iter()
        .map(|d| threshold_run(d, 30))
        .collect();
    let db = seeded_database(&workouts);
    for (i, date) in days_ending(target(), 7).into_iter().enumerate() {
        db.insert_planned_workout(&PlannedWorkout {
            id: format!("plan-{}", i),
            athlete_id: "test_athlete".to_string(),
            date,
            workout_type: Some("run".to_string()),
            completed: true,
        })
        .unwrap();
    }
    db.set_recovery_half_life("test_athlete", 24.0).unwrap();

    let config = EngineConfig::default();
    let result = ReadinessEngine::new(&db, &config)
        .compute_readiness("test_athlete", target())
        .unwrap();

    // No efficiency data: fitness trend is the one weighted signal missing
    assert_eq!(result.signals_total, 5);
    assert_eq!(result.signals_available, 4);
    assert!((result.confidence - 0.8).abs() < 1e-12);
    assert!(result.components.fitness_trend.is_none());
    assert_eq!(result.components.completion, Some(100.0));
    assert_eq!(result.components.recovery_days, Some(35.0));
    assert_eq!(result.components.half_life, Some(80.0));

    let weight_sum: f64 = result.weights_used.values().sum();
    assert!((weight_sum - 1.0).abs() < 1e-9);
    assert!(!result.weights_used.contains_key("fitness_trend"));

    let tsb = result.components.tsb.unwrap();
    let expected = (0.25 * tsb + 0.20 * 100.0 + 0.15 * 35.0 + 0.10 * 80.0) / 0.70;
    assert!((result.score - expected).abs() <= 0.05);
}

#[test]
fn test_readiness_upsert_keeps_latest() {
    let workouts: Vec<WorkoutRecord> = days_ending(target(), 30)
        .into_iter()
        .map(|d| threshold_run(d, 30))
        .collect();
    let mut db = seeded_database(&workouts);
    let config = EngineConfig::default();

    let first = trainready::batch::compute_and_store(&mut db, &config, "test_athlete", target()).unwrap();
    db.set_recovery_half_life("test_athlete", 12.0).unwrap();
    let second = trainready::batch::compute_and_store(&mut db, &config, "test_athlete", target()).unwrap();

    assert_ne!(first.score, second.score);
    assert_eq!(db.count_daily_readiness("test_athlete").unwrap(), 1);
    let stored = db.load_daily_readiness("test_athlete", target()).unwrap().unwrap();
    assert_eq!(stored.score, second.score);
    assert_eq!(stored.signals_available, second.signals_available);
    assert_eq!(stored.components.half_life, Some(100.0));
    let stored_tsb = stored.components.tsb.unwrap();
    assert!((stored_tsb - second.components.tsb.unwrap()).abs() < 1e-9);
}

#[test]
fn test_calibration_round_trip() {
    let mut db = Database::in_memory().unwrap();
    let thresholds = db
        .get_or_create_thresholds("test_athlete", &ThresholdDefaults::default())
        .unwrap();
    assert!(!thresholds.is_learned);
    assert_eq!(thresholds.suggest(28.0), SuggestedAction::SwapQuality);

    let entry = CalibrationEntry::new(
        "test_athlete",
        "plan-1",
        28.0,
        Some("intervals".to_string()),
        CalibrationOutcome::Swapped,
    )
    .unwrap()
    .with_subjective_feel(4)
    .unwrap();
    db.log_calibration(&entry).unwrap();
    db.log_calibration(&CalibrationEntry::new("test_athlete", "plan-2", 81.0, None, CalibrationOutcome::Completed).unwrap())
        .unwrap();

    assert_eq!(db.count_calibration_entries("test_athlete").unwrap(), 2);
    assert!(CalibrationEntry::new("test_athlete", "plan-3", 140.0, None, CalibrationOutcome::Completed).is_err());
}
