use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Athlete profile containing the physiological anchors used for stress scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    /// Unique athlete identifier
    pub id: String,

    /// Athlete's display name
    pub name: String,

    /// Maximum Heart Rate
    pub max_hr: Option<u16>,

    /// Resting Heart Rate
    pub resting_hr: Option<u16>,

    /// Threshold pace for running, in seconds per kilometre
    pub threshold_pace_per_km: Option<Decimal>,

    /// Personal recovery half-life in hours, when it has been measured
    pub recovery_half_life_hours: Option<f64>,
}

impl AthleteProfile {
    /// Create a profile with no physiological data
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        AthleteProfile {
            id: id.into(),
            name: name.into(),
            max_hr: None,
            resting_hr: None,
            threshold_pace_per_km: None,
            recovery_half_life_hours: None,
        }
    }

    /// Heart-rate reserve anchors, only when both are present and ordered
    pub fn heart_rate_range(&self) -> Option<(u16, u16)> {
        match (self.resting_hr, self.max_hr) {
            (Some(rest), Some(max)) if max > rest => Some((rest, max)),
            _ => None,
        }
    }

    /// Threshold pace as seconds per km, ignoring non-positive values
    pub fn threshold_pace_seconds(&self) -> Option<f64> {
        self.threshold_pace_per_km
            .and_then(|p| p.to_f64())
            .filter(|p| *p > 0.0)
    }
}

/// One completed activity as stored by the activity sync layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    /// Unique identifier for the activity
    pub id: String,

    /// Athlete identifier
    pub athlete_id: String,

    /// Activity start time
    pub start_time: DateTime<Utc>,

    /// Moving duration in seconds
    pub duration_seconds: Option<u32>,

    /// Distance covered in metres
    pub distance_meters: Option<f64>,

    /// Average heart rate in beats per minute
    pub avg_heart_rate: Option<u16>,

    /// Average speed in metres per second
    pub avg_speed: Option<f64>,

    /// Free-text workout type from the provider or plan
    pub workout_type: Option<String>,

    /// Activity title
    pub name: Option<String>,
}

impl WorkoutRecord {
    /// Calendar day the activity belongs to
    pub fn date(&self) -> NaiveDate {
        self.start_time.date_naive()
    }

    /// Duration in minutes, treating a missing duration as zero
    pub fn duration_minutes(&self) -> f64 {
        self.duration_seconds.unwrap_or(0) as f64 / 60.0
    }

    /// Lower-cased name and workout type, used for keyword matching
    pub fn description(&self) -> String {
        let mut text = String::new();
        for part in [&self.name, &self.workout_type].into_iter().flatten() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&part.to_lowercase());
        }
        text
    }

    /// Speed over heart rate, the efficiency value used by the fitness trend
    pub fn efficiency(&self) -> Option<f64> {
        match (self.avg_speed, self.avg_heart_rate) {
            (Some(speed), Some(hr)) if speed > 0.0 && hr > 0 => Some(speed / hr as f64),
            _ => None,
        }
    }
}

/// A planned workout and whether the athlete completed it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedWorkout {
    pub id: String,
    pub athlete_id: String,
    pub date: NaiveDate,
    pub workout_type: Option<String>,
    pub completed: bool,
}

/// Per-activity efficiency sample (speed / heart rate)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyPoint {
    pub date: NaiveDate,
    pub activity_id: String,
    pub efficiency: f64,
}

/// Field names for sleep duration, newest schema first
pub const SLEEP_HOURS_FIELDS: &[&str] = &["sleep_hours", "sleep_h"];

/// Field names for overnight HRV (RMSSD, ms), newest schema first
pub const HRV_FIELDS: &[&str] = &["hrv_rmssd", "hrv_ms", "hrv"];

/// Daily subjective check-in.
///
/// Check-in payloads have been written by several client versions, so fields
/// are kept as a raw map and read through [`DailyCheckin::resolve_f64`] with a
/// precedence list rather than as fixed struct fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCheckin {
    pub athlete_id: String,
    pub date: NaiveDate,
    pub fields: HashMap<String, serde_json::Value>,
}

impl DailyCheckin {
    pub fn new(athlete_id: impl Into<String>, date: NaiveDate) -> Self {
        DailyCheckin {
            athlete_id: athlete_id.into(),
            date,
            fields: HashMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with_field(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Resolve a numeric field by trying each name in order.
    ///
    /// The first name holding a number (or a numeric string) wins; nulls and
    /// non-numeric values fall through to the next name.
    pub fn resolve_f64(&self, names: &[&str]) -> Option<f64> {
        names.iter().find_map(|name| match self.fields.get(*name)? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
    }

    pub fn sleep_hours(&self) -> Option<f64> {
        self.resolve_f64(SLEEP_HOURS_FIELDS)
    }

    pub fn hrv_rmssd(&self) -> Option<f64> {
        self.resolve_f64(HRV_FIELDS)
    }
}
