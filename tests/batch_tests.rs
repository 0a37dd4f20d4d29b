//! Integration tests for the nightly readiness batch
//!
//! Runs against a real SQLite file so every worker opens its own connection.

use chrono::{Days, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;
use tempfile::tempdir;

use trainready::batch::NightlyBatch;
use trainready::{AthleteProfile, Database, EngineConfig, WorkoutRecord};

fn target() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 14).unwrap()
}

fn seed(db: &mut Database, athlete_id: &str, daily_minutes: u32) {
    db.insert_athlete(&AthleteProfile {
        threshold_pace_per_km: Some(dec!(270)),
        ..AthleteProfile::new(athlete_id, athlete_id)
    })
    .unwrap();

    let workouts: Vec<WorkoutRecord> = (0..45u64)
        .map(|offset| {
            let date = target() - Days::new(offset);
            WorkoutRecord {
                id: format!("{}-{}", athlete_id, offset),
                athlete_id: athlete_id.to_string(),
                start_time: Utc.from_utc_datetime(&date.and_hms_opt(18, 0, 0).unwrap()),
                duration_seconds: Some(daily_minutes * 60),
                distance_meters: None,
                avg_heart_rate: None,
                avg_speed: None,
                workout_type: Some("easy".to_string()),
                name: None,
            }
        })
        .collect();
    db.insert_activities(&workouts).unwrap();
}

fn quiet_config(threads: usize) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.batch.threads = threads;
    config.batch.show_progress = false;
    config
}

#[test]
fn test_batch_processes_every_athlete() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("ready.db");
    {
        let mut db = Database::new(&db_path).unwrap();
        seed(&mut db, "alice", 40);
        seed(&mut db, "bruno", 60);
        seed(&mut db, "chen", 25);
    }

    let batch = NightlyBatch::new(&db_path, quiet_config(2));
    let summary = batch.run_all(target()).unwrap();

    assert_eq!(summary.total_athletes, 3);
    assert_eq!(summary.succeeded, 3);
    assert!(summary.is_fully_successful());
    assert!(summary.errors().is_empty());

    let db = Database::new(&db_path).unwrap();
    for athlete_id in ["alice", "bruno", "chen"] {
        let stored = db.load_daily_readiness(athlete_id, target()).unwrap();
        assert!(stored.is_some(), "missing readiness for {}", athlete_id);
    }
}

#[test]
fn test_batch_collects_failures() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("ready.db");
    {
        let mut db = Database::new(&db_path).unwrap();
        seed(&mut db, "alice", 40);
    }

    let ids = vec!["alice".to_string(), "unknown".to_string()];
    let batch = NightlyBatch::new(&db_path, quiet_config(1));
    let summary = batch.run(&ids, target()).unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    let errors = summary.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, "unknown");
    assert!(errors[0].1.contains("not found"));
}

#[test]
fn test_batch_rerun_overwrites() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("ready.db");
    {
        let mut db = Database::new(&db_path).unwrap();
        seed(&mut db, "alice", 40);
    }

    let batch = NightlyBatch::new(&db_path, quiet_config(0));
    batch.run_all(target()).unwrap();
    batch.run_all(target()).unwrap();

    let db = Database::new(&db_path).unwrap();
    assert_eq!(db.count_daily_readiness("alice").unwrap(), 1);
}
