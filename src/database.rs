use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::calibration::{AdaptiveThresholds, CalibrationEntry, ThresholdDefaults};
use crate::models::{AthleteProfile, DailyCheckin, EfficiencyPoint, PlannedWorkout, WorkoutRecord};
use crate::readiness::{DailyReadinessResult, ReadinessComponents};
use crate::source::TrainingDataSource;

/// Database error types
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[source] rusqlite::Error),
    #[error("Database busy: {0}")]
    Busy(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
                DatabaseError::Busy(e.to_string())
            }
            _ => DatabaseError::SqliteError(e),
        }
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(e: serde_json::Error) -> Self {
        DatabaseError::SerializationError(e.to_string())
    }
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS athletes (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        max_hr INTEGER,
        resting_hr INTEGER,
        threshold_pace_per_km TEXT,
        recovery_half_life_hours REAL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS activities (
        id TEXT PRIMARY KEY,
        athlete_id TEXT NOT NULL,
        activity_date DATE NOT NULL,
        start_time DATETIME NOT NULL,
        duration_seconds INTEGER,
        distance_meters REAL,
        avg_heart_rate INTEGER,
        avg_speed REAL,
        workout_type TEXT,
        name TEXT,
        FOREIGN KEY (athlete_id) REFERENCES athletes (id)
    );

    CREATE TABLE IF NOT EXISTS planned_workouts (
        id TEXT PRIMARY KEY,
        athlete_id TEXT NOT NULL,
        date DATE NOT NULL,
        workout_type TEXT,
        completed BOOLEAN NOT NULL DEFAULT FALSE,
        FOREIGN KEY (athlete_id) REFERENCES athletes (id)
    );

    CREATE TABLE IF NOT EXISTS daily_checkins (
        athlete_id TEXT NOT NULL,
        date DATE NOT NULL,
        payload TEXT NOT NULL,
        PRIMARY KEY (athlete_id, date)
    );

    CREATE TABLE IF NOT EXISTS recovery_metrics (
        athlete_id TEXT PRIMARY KEY,
        half_life_hours REAL NOT NULL,
        computed_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS daily_readiness (
        athlete_id TEXT NOT NULL,
        date DATE NOT NULL,
        score REAL NOT NULL,
        components TEXT NOT NULL,
        signals_available INTEGER NOT NULL,
        signals_total INTEGER NOT NULL,
        confidence REAL NOT NULL,
        weights_used TEXT NOT NULL,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (athlete_id, date)
    );

    CREATE TABLE IF NOT EXISTS threshold_calibration_log (
        id TEXT PRIMARY KEY,
        athlete_id TEXT NOT NULL,
        workout_id TEXT NOT NULL,
        readiness_score REAL NOT NULL,
        scheduled_workout_type TEXT,
        outcome TEXT NOT NULL,
        efficiency_delta REAL,
        subjective_feel INTEGER,
        logged_at DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS adaptive_thresholds (
        athlete_id TEXT PRIMARY KEY,
        swap_quality REAL NOT NULL,
        reduce_volume REAL NOT NULL,
        skip_day REAL NOT NULL,
        increase_volume REAL NOT NULL,
        is_learned BOOLEAN NOT NULL DEFAULT FALSE,
        sample_count INTEGER NOT NULL DEFAULT 0,
        updated_at DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_activities_athlete_date ON activities (athlete_id, activity_date);
    CREATE INDEX IF NOT EXISTS idx_planned_athlete_date ON planned_workouts (athlete_id, date);
    CREATE INDEX IF NOT EXISTS idx_calibration_athlete ON threshold_calibration_log (athlete_id);
"#;

/// Database connection and management
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create or open a database at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, DatabaseError> {
        let conn = Connection::open(db_path)?;
        let db = Self { conn };

        // Batch workers each hold a connection to the same file
        db.conn.busy_timeout(std::time::Duration::from_secs(5))?;
        db.conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        db.conn.pragma_update(None, "synchronous", "NORMAL")?;

        db.init_schema()?;
        Ok(db)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self, DatabaseError> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema with tables and indexes
    fn init_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Insert or replace an athlete profile
    pub fn insert_athlete(&self, athlete: &AthleteProfile) -> Result<(), DatabaseError> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO athletes (
                id, name, max_hr, resting_hr, threshold_pace_per_km, recovery_half_life_hours
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                athlete.id,
                athlete.name,
                athlete.max_hr,
                athlete.resting_hr,
                athlete.threshold_pace_per_km.map(|p| p.to_string()),
                athlete.recovery_half_life_hours,
            ],
        )?;
        Ok(())
    }

    /// Insert or replace an activity record
    pub fn insert_activity(&self, workout: &WorkoutRecord) -> Result<(), DatabaseError> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO activities (
                id, athlete_id, activity_date, start_time, duration_seconds, distance_meters,
                avg_heart_rate, avg_speed, workout_type, name
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                workout.id,
                workout.athlete_id,
                workout.date(),
                workout.start_time,
                workout.duration_seconds,
                workout.distance_meters,
                workout.avg_heart_rate,
                workout.avg_speed,
                workout.workout_type,
                workout.name,
            ],
        )?;
        Ok(())
    }

    /// Insert many activities in one transaction
    pub fn insert_activities(&mut self, workouts: &[WorkoutRecord]) -> Result<(), DatabaseError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO activities (
                    id, athlete_id, activity_date, start_time, duration_seconds, distance_meters,
                    avg_heart_rate, avg_speed, workout_type, name
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )?;
            for workout in workouts {
                stmt.execute(params![
                    workout.id,
                    workout.athlete_id,
                    workout.date(),
                    workout.start_time,
                    workout.duration_seconds,
                    workout.distance_meters,
                    workout.avg_heart_rate,
                    workout.avg_speed,
                    workout.workout_type,
                    workout.name,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_planned_workout(&self, planned: &PlannedWorkout) -> Result<(), DatabaseError> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO planned_workouts (id, athlete_id, date, workout_type, completed)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                planned.id,
                planned.athlete_id,
                planned.date,
                planned.workout_type,
                planned.completed,
            ],
        )?;
        Ok(())
    }

    pub fn insert_checkin(&self, checkin: &DailyCheckin) -> Result<(), DatabaseError> {
        let payload = serde_json::to_string(&checkin.fields)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO daily_checkins (athlete_id, date, payload) VALUES (?1, ?2, ?3)",
            params![checkin.athlete_id, checkin.date, payload],
        )?;
        Ok(())
    }

    /// Record the recovery-metrics collaborator's half-life estimate
    pub fn set_recovery_half_life(&self, athlete_id: &str, hours: f64) -> Result<(), DatabaseError> {
        self.conn.execute(
            r#"
            INSERT INTO recovery_metrics (athlete_id, half_life_hours, computed_at)
            VALUES (?1, ?2, CURRENT_TIMESTAMP)
            ON CONFLICT(athlete_id) DO UPDATE SET
                half_life_hours = excluded.half_life_hours,
                computed_at = excluded.computed_at
            "#,
            params![athlete_id, hours],
        )?;
        Ok(())
    }

    /// All athlete ids, sorted
    pub fn athlete_ids(&self) -> Result<Vec<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT id FROM athletes ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Upsert the readiness row for (athlete, date); last write wins
    pub fn upsert_daily_readiness(&mut self, result: &DailyReadinessResult) -> Result<(), DatabaseError> {
        let components = serde_json::to_string(&result.components.to_map())?;
        let weights = serde_json::to_string(&result.weights_used)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO daily_readiness (
                athlete_id, date, score, components, signals_available, signals_total,
                confidence, weights_used, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, CURRENT_TIMESTAMP)
            ON CONFLICT(athlete_id, date) DO UPDATE SET
                score = excluded.score,
                components = excluded.components,
                signals_available = excluded.signals_available,
                signals_total = excluded.signals_total,
                confidence = excluded.confidence,
                weights_used = excluded.weights_used,
                updated_at = excluded.updated_at
            "#,
            params![
                result.athlete_id,
                result.date,
                result.score,
                components,
                result.signals_available,
                result.signals_total,
                result.confidence,
                weights,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn load_daily_readiness(
        &self,
        athlete_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyReadinessResult>, DatabaseError> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT athlete_id, date, score, components, signals_available, signals_total,
                       confidence, weights_used
                FROM daily_readiness
                WHERE athlete_id = ?1 AND date = ?2
                "#,
                params![athlete_id, date],
                |row| {
                    Ok((
                        row.get::<_, String>("athlete_id")?,
                        row.get::<_, NaiveDate>("date")?,
                        row.get::<_, f64>("score")?,
                        row.get::<_, String>("components")?,
                        row.get::<_, u8>("signals_available")?,
                        row.get::<_, u8>("signals_total")?,
                        row.get::<_, f64>("confidence")?,
                        row.get::<_, String>("weights_used")?,
                    ))
                },
            )
            .optional()?;

        let Some((athlete_id, date, score, components, available, total, confidence, weights)) = row else {
            return Ok(None);
        };

        let components: BTreeMap<String, Option<f64>> = serde_json::from_str(&components)?;
        let weights_used: BTreeMap<String, f64> = serde_json::from_str(&weights)?;

        Ok(Some(DailyReadinessResult {
            athlete_id,
            date,
            score,
            components: ReadinessComponents::from_map(&components),
            signals_available: available,
            signals_total: total,
            confidence,
            weights_used,
        }))
    }

    /// Number of readiness rows stored for an athlete
    pub fn count_daily_readiness(&self, athlete_id: &str) -> Result<usize, DatabaseError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM daily_readiness WHERE athlete_id = ?1",
            params![athlete_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Append a calibration row; rows are never updated
    pub fn log_calibration(&self, entry: &CalibrationEntry) -> Result<(), DatabaseError> {
        self.conn.execute(
            r#"
            INSERT INTO threshold_calibration_log (
                id, athlete_id, workout_id, readiness_score, scheduled_workout_type,
                outcome, efficiency_delta, subjective_feel, logged_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                entry.id,
                entry.athlete_id,
                entry.workout_id,
                entry.readiness_score_at_decision,
                entry.scheduled_workout_type,
                entry.outcome.as_str(),
                entry.efficiency_delta,
                entry.subjective_feel,
                entry.logged_at,
            ],
        )?;
        Ok(())
    }

    pub fn count_calibration_entries(&self, athlete_id: &str) -> Result<usize, DatabaseError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM threshold_calibration_log WHERE athlete_id = ?1",
            params![athlete_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Stored adaptive thresholds, if the athlete has any
    pub fn load_thresholds(&self, athlete_id: &str) -> Result<Option<AdaptiveThresholds>, DatabaseError> {
        let thresholds = self
            .conn
            .query_row(
                r#"
                SELECT athlete_id, swap_quality, reduce_volume, skip_day, increase_volume,
                       is_learned, sample_count, updated_at
                FROM adaptive_thresholds WHERE athlete_id = ?1
                "#,
                params![athlete_id],
                Self::thresholds_from_row,
            )
            .optional()?;
        Ok(thresholds)
    }

    /// Adaptive thresholds for an athlete, inserting defaults on first use
    pub fn get_or_create_thresholds(
        &mut self,
        athlete_id: &str,
        defaults: &ThresholdDefaults,
    ) -> Result<AdaptiveThresholds, DatabaseError> {
        let tx = self.conn.transaction()?;

        let existing = tx
            .query_row(
                r#"
                SELECT athlete_id, swap_quality, reduce_volume, skip_day, increase_volume,
                       is_learned, sample_count, updated_at
                FROM adaptive_thresholds WHERE athlete_id = ?1
                "#,
                params![athlete_id],
                Self::thresholds_from_row,
            )
            .optional()?;

        let thresholds = match existing {
            Some(thresholds) => thresholds,
            None => {
                let thresholds = AdaptiveThresholds::from_defaults(athlete_id, defaults);
                tx.execute(
                    r#"
                    INSERT INTO adaptive_thresholds (
                        athlete_id, swap_quality, reduce_volume, skip_day, increase_volume,
                        is_learned, sample_count, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        thresholds.athlete_id,
                        thresholds.swap_quality,
                        thresholds.reduce_volume,
                        thresholds.skip_day,
                        thresholds.increase_volume,
                        thresholds.is_learned,
                        thresholds.sample_count,
                        thresholds.updated_at,
                    ],
                )?;
                thresholds
            }
        };

        tx.commit()?;
        Ok(thresholds)
    }

    fn thresholds_from_row(row: &Row) -> rusqlite::Result<AdaptiveThresholds> {
        Ok(AdaptiveThresholds {
            athlete_id: row.get("athlete_id")?,
            swap_quality: row.get("swap_quality")?,
            reduce_volume: row.get("reduce_volume")?,
            skip_day: row.get("skip_day")?,
            increase_volume: row.get("increase_volume")?,
            is_learned: row.get("is_learned")?,
            sample_count: row.get("sample_count")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn athlete_from_row(row: &Row) -> rusqlite::Result<AthleteProfile> {
        Ok(AthleteProfile {
            id: row.get("id")?,
            name: row.get("name")?,
            max_hr: row.get("max_hr")?,
            resting_hr: row.get("resting_hr")?,
            threshold_pace_per_km: row
                .get::<_, Option<String>>("threshold_pace_per_km")?
                .and_then(|s| s.parse::<Decimal>().ok()),
            recovery_half_life_hours: row.get("recovery_half_life_hours")?,
        })
    }

    fn workout_from_row(row: &Row) -> rusqlite::Result<WorkoutRecord> {
        Ok(WorkoutRecord {
            id: row.get("id")?,
            athlete_id: row.get("athlete_id")?,
            start_time: row.get::<_, DateTime<Utc>>("start_time")?,
            duration_seconds: row.get("duration_seconds")?,
            distance_meters: row.get("distance_meters")?,
            avg_heart_rate: row.get("avg_heart_rate")?,
            avg_speed: row.get("avg_speed")?,
            workout_type: row.get("workout_type")?,
            name: row.get("name")?,
        })
    }
}

impl TrainingDataSource for Database {
    fn athlete(&self, athlete_id: &str) -> crate::Result<Option<AthleteProfile>> {
        let athlete = self
            .conn
            .query_row(
                r#"
                SELECT id, name, max_hr, resting_hr, threshold_pace_per_km, recovery_half_life_hours
                FROM athletes WHERE id = ?1
                "#,
                params![athlete_id],
                Self::athlete_from_row,
            )
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(athlete)
    }

    fn activities(&self, athlete_id: &str, start: NaiveDate, end: NaiveDate) -> crate::Result<Vec<WorkoutRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT id, athlete_id, start_time, duration_seconds, distance_meters,
                       avg_heart_rate, avg_speed, workout_type, name
                FROM activities
                WHERE athlete_id = ?1 AND activity_date BETWEEN ?2 AND ?3
                ORDER BY start_time
                "#,
            )
            .map_err(DatabaseError::from)?;

        let workouts = stmt
            .query_map(params![athlete_id, start, end], Self::workout_from_row)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(DatabaseError::from)?;
        Ok(workouts)
    }

    fn planned_workouts(&self, athlete_id: &str, start: NaiveDate, end: NaiveDate) -> crate::Result<Vec<PlannedWorkout>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT id, athlete_id, date, workout_type, completed
                FROM planned_workouts
                WHERE athlete_id = ?1 AND date BETWEEN ?2 AND ?3
                ORDER BY date
                "#,
            )
            .map_err(DatabaseError::from)?;

        let planned = stmt
            .query_map(params![athlete_id, start, end], |row| {
                Ok(PlannedWorkout {
                    id: row.get("id")?,
                    athlete_id: row.get("athlete_id")?,
                    date: row.get("date")?,
                    workout_type: row.get("workout_type")?,
                    completed: row.get("completed")?,
                })
            })
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(DatabaseError::from)?;
        Ok(planned)
    }

    fn efficiency_series(&self, athlete_id: &str, start: NaiveDate, end: NaiveDate) -> crate::Result<Vec<EfficiencyPoint>> {
        let points = self
            .activities(athlete_id, start, end)?
            .iter()
            .filter_map(|w| {
                w.efficiency().map(|efficiency| EfficiencyPoint {
                    date: w.date(),
                    activity_id: w.id.clone(),
                    efficiency,
                })
            })
            .collect();
        Ok(points)
    }

    fn estimated_recovery_half_life(&self, athlete_id: &str) -> crate::Result<Option<f64>> {
        let hours = self
            .conn
            .query_row(
                "SELECT half_life_hours FROM recovery_metrics WHERE athlete_id = ?1",
                params![athlete_id],
                |row| row.get::<_, f64>(0),
            )
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(hours)
    }

    fn checkins(&self, athlete_id: &str, start: NaiveDate, end: NaiveDate) -> crate::Result<Vec<DailyCheckin>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT athlete_id, date, payload FROM daily_checkins
                WHERE athlete_id = ?1 AND date BETWEEN ?2 AND ?3
                ORDER BY date
                "#,
            )
            .map_err(DatabaseError::from)?;

        let rows = stmt
            .query_map(params![athlete_id, start, end], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, NaiveDate>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(DatabaseError::from)?;

        let mut checkins = Vec::with_capacity(rows.len());
        for (athlete_id, date, payload) in rows {
            let fields: HashMap<String, serde_json::Value> =
                serde_json::from_str(&payload).map_err(DatabaseError::from)?;
            checkins.push(DailyCheckin {
                athlete_id,
                date,
                fields,
            });
        }
        Ok(checkins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationOutcome;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn athlete() -> AthleteProfile {
        AthleteProfile {
            id: "ath-1".to_string(),
            name: "Runner".to_string(),
            max_hr: Some(188),
            resting_hr: Some(48),
            threshold_pace_per_km: Some(dec!(282.5)),
            recovery_half_life_hours: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn workout(id: &str, d: u32) -> WorkoutRecord {
        WorkoutRecord {
            id: id.to_string(),
            athlete_id: "ath-1".to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 6, d, 6, 30, 0).unwrap(),
            duration_seconds: Some(2700),
            distance_meters: Some(9000.0),
            avg_heart_rate: Some(148),
            avg_speed: Some(3.33),
            workout_type: Some("easy".to_string()),
            name: Some("Morning Run".to_string()),
        }
    }

    #[test]
    fn test_athlete_round_trip() {
        let db = Database::in_memory().unwrap();
        db.insert_athlete(&athlete()).unwrap();

        assert_eq!(db.athlete("ath-1").unwrap(), Some(athlete()));
        assert_eq!(db.athlete("missing").unwrap(), None);
        assert_eq!(db.athlete_ids().unwrap(), vec!["ath-1".to_string()]);
    }

    #[test]
    fn test_activity_range_query() {
        let mut db = Database::in_memory().unwrap();
        db.insert_athlete(&athlete()).unwrap();
        db.insert_activities(&[workout("w1", 1), workout("w2", 5), workout("w3", 10)])
            .unwrap();

        let found = db.activities("ath-1", day(2), day(10)).unwrap();
        let ids: Vec<&str> = found.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["w2", "w3"]);
        assert_eq!(found[0], workout("w2", 5));

        let efficiency = db.efficiency_series("ath-1", day(1), day(30)).unwrap();
        assert_eq!(efficiency.len(), 3);
        assert!((efficiency[0].efficiency - 3.33 / 148.0).abs() < 1e-12);
    }

    #[test]
    fn test_checkin_payload_round_trip() {
        let db = Database::in_memory().unwrap();
        let checkin = DailyCheckin::new("ath-1", day(3)).with_field("sleep_h", 7.5);
        db.insert_checkin(&checkin).unwrap();

        let loaded = db.checkins("ath-1", day(1), day(3)).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].sleep_hours(), Some(7.5));
    }

    #[test]
    fn test_recovery_half_life_upsert() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.estimated_recovery_half_life("ath-1").unwrap(), None);
        db.set_recovery_half_life("ath-1", 30.0).unwrap();
        db.set_recovery_half_life("ath-1", 26.0).unwrap();
        assert_eq!(db.estimated_recovery_half_life("ath-1").unwrap(), Some(26.0));
    }

    #[test]
    fn test_readiness_upsert_overwrites() {
        let mut db = Database::in_memory().unwrap();
        let mut result = DailyReadinessResult {
            athlete_id: "ath-1".to_string(),
            date: day(4),
            score: 62.5,
            components: ReadinessComponents {
                tsb: Some(62.5),
                ..ReadinessComponents::default()
            },
            signals_available: 1,
            signals_total: 5,
            confidence: 0.2,
            weights_used: BTreeMap::from([("tsb".to_string(), 1.0)]),
        };
        db.upsert_daily_readiness(&result).unwrap();

        result.score = 70.0;
        result.components.tsb = Some(70.0);
        db.upsert_daily_readiness(&result).unwrap();

        assert_eq!(db.count_daily_readiness("ath-1").unwrap(), 1);
        assert_eq!(db.load_daily_readiness("ath-1", day(4)).unwrap(), Some(result));
        assert_eq!(db.load_daily_readiness("ath-1", day(5)).unwrap(), None);
    }

    #[test]
    fn test_calibration_log_appends() {
        let db = Database::in_memory().unwrap();
        for score in [30.0, 31.0] {
            let entry = CalibrationEntry::new("ath-1", "w1", score, None, CalibrationOutcome::Skipped).unwrap();
            db.log_calibration(&entry).unwrap();
        }
        assert_eq!(db.count_calibration_entries("ath-1").unwrap(), 2);
    }

    #[test]
    fn test_thresholds_created_once() {
        let mut db = Database::in_memory().unwrap();
        let defaults = ThresholdDefaults::default();

        let first = db.get_or_create_thresholds("ath-1", &defaults).unwrap();
        assert_eq!(first.swap_quality, 35.0);
        assert!(!first.is_learned);

        let changed = ThresholdDefaults {
            swap_quality: 50.0,
            ..ThresholdDefaults::default()
        };
        let second = db.get_or_create_thresholds("ath-1", &changed).unwrap();
        assert_eq!(second.swap_quality, 35.0);
    }

    #[test]
    fn test_load_thresholds_does_not_insert() {
        let mut db = Database::in_memory().unwrap();

        assert!(db.load_thresholds("ath-1").unwrap().is_none());
        assert!(db.load_thresholds("ath-1").unwrap().is_none());

        db.get_or_create_thresholds("ath-1", &ThresholdDefaults::default()).unwrap();
        let stored = db.load_thresholds("ath-1").unwrap().unwrap();
        assert_eq!(stored.swap_quality, 35.0);
    }
}
