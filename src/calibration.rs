//! Readiness threshold calibration.
//!
//! Each time an athlete acts on a readiness-driven suggestion the pair
//! (readiness score, outcome) is appended to a log. The fixed cold-start
//! thresholds below are provisional; a later learning step replaces them with
//! per-athlete values once enough log rows exist.

use crate::error::{Result, TrainReadyError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the athlete did with the scheduled workout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationOutcome {
    Completed,
    Modified,
    Swapped,
    Skipped,
}

impl CalibrationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalibrationOutcome::Completed => "completed",
            CalibrationOutcome::Modified => "modified",
            CalibrationOutcome::Swapped => "swapped",
            CalibrationOutcome::Skipped => "skipped",
        }
    }
}

impl std::str::FromStr for CalibrationOutcome {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "completed" => Ok(CalibrationOutcome::Completed),
            "modified" => Ok(CalibrationOutcome::Modified),
            "swapped" => Ok(CalibrationOutcome::Swapped),
            "skipped" => Ok(CalibrationOutcome::Skipped),
            _ => Err(format!("Invalid calibration outcome: {}", s)),
        }
    }
}

/// One append-only calibration row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    pub id: String,
    pub athlete_id: String,
    pub workout_id: String,
    pub readiness_score_at_decision: f64,
    pub scheduled_workout_type: Option<String>,
    pub outcome: CalibrationOutcome,
    pub efficiency_delta: Option<f64>,
    pub subjective_feel: Option<u8>,
    pub logged_at: DateTime<Utc>,
}

impl CalibrationEntry {
    /// Create an entry, rejecting scores outside 0-100
    pub fn new(
        athlete_id: impl Into<String>,
        workout_id: impl Into<String>,
        readiness_score: f64,
        scheduled_workout_type: Option<String>,
        outcome: CalibrationOutcome,
    ) -> Result<Self> {
        if !(0.0..=100.0).contains(&readiness_score) {
            return Err(TrainReadyError::Validation(format!(
                "readiness score {} outside 0-100",
                readiness_score
            )));
        }

        Ok(CalibrationEntry {
            id: Uuid::new_v4().to_string(),
            athlete_id: athlete_id.into(),
            workout_id: workout_id.into(),
            readiness_score_at_decision: readiness_score,
            scheduled_workout_type,
            outcome,
            efficiency_delta: None,
            subjective_feel: None,
            logged_at: Utc::now(),
        })
    }

    pub fn with_efficiency_delta(mut self, delta: f64) -> Self {
        self.efficiency_delta = Some(delta);
        self
    }

    /// Subjective feel on a 1-10 scale
    pub fn with_subjective_feel(mut self, feel: u8) -> Result<Self> {
        if !(1..=10).contains(&feel) {
            return Err(TrainReadyError::Validation(format!(
                "subjective feel {} outside 1-10",
                feel
            )));
        }
        self.subjective_feel = Some(feel);
        Ok(self)
    }
}

/// Cold-start readiness thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdDefaults {
    pub swap_quality: f64,
    pub reduce_volume: f64,
    pub skip_day: f64,
    pub increase_volume: f64,
}

impl Default for ThresholdDefaults {
    fn default() -> Self {
        ThresholdDefaults {
            swap_quality: 35.0,
            reduce_volume: 25.0,
            skip_day: 15.0,
            increase_volume: 80.0,
        }
    }
}

/// Per-athlete readiness thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveThresholds {
    pub athlete_id: String,
    pub swap_quality: f64,
    pub reduce_volume: f64,
    pub skip_day: f64,
    pub increase_volume: f64,
    /// False while the cold-start defaults are in use
    pub is_learned: bool,
    pub sample_count: u32,
    pub updated_at: DateTime<Utc>,
}

impl AdaptiveThresholds {
    pub fn from_defaults(athlete_id: impl Into<String>, defaults: &ThresholdDefaults) -> Self {
        AdaptiveThresholds {
            athlete_id: athlete_id.into(),
            swap_quality: defaults.swap_quality,
            reduce_volume: defaults.reduce_volume,
            skip_day: defaults.skip_day,
            increase_volume: defaults.increase_volume,
            is_learned: false,
            sample_count: 0,
            updated_at: Utc::now(),
        }
    }

    /// Suggested adjustment to today's plan for a readiness score
    pub fn suggest(&self, score: f64) -> SuggestedAction {
        if score < self.skip_day {
            SuggestedAction::SkipDay
        } else if score < self.reduce_volume {
            SuggestedAction::ReduceVolume
        } else if score < self.swap_quality {
            SuggestedAction::SwapQuality
        } else if score >= self.increase_volume {
            SuggestedAction::IncreaseVolume
        } else {
            SuggestedAction::Proceed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    SkipDay,
    ReduceVolume,
    SwapQuality,
    Proceed,
    IncreaseVolume,
}

impl SuggestedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestedAction::SkipDay => "skip_day",
            SuggestedAction::ReduceVolume => "reduce_volume",
            SuggestedAction::SwapQuality => "swap_quality",
            SuggestedAction::Proceed => "proceed",
            SuggestedAction::IncreaseVolume => "increase_volume",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_validation() {
        assert!(CalibrationEntry::new("a", "w", 101.0, None, CalibrationOutcome::Completed).is_err());
        assert!(CalibrationEntry::new("a", "w", -0.1, None, CalibrationOutcome::Completed).is_err());

        let entry = CalibrationEntry::new("a", "w", 42.5, Some("tempo".to_string()), CalibrationOutcome::Swapped)
            .unwrap()
            .with_efficiency_delta(-0.8);
        assert_eq!(entry.efficiency_delta, Some(-0.8));
        assert!(entry.clone().with_subjective_feel(11).is_err());
        assert_eq!(entry.with_subjective_feel(7).unwrap().subjective_feel, Some(7));
    }

    #[test]
    fn test_outcome_parsing() {
        assert_eq!("Skipped".parse::<CalibrationOutcome>().unwrap(), CalibrationOutcome::Skipped);
        assert!("ignored".parse::<CalibrationOutcome>().is_err());
    }

    #[test]
    fn test_default_suggestions() {
        let thresholds = AdaptiveThresholds::from_defaults("a", &ThresholdDefaults::default());
        assert!(!thresholds.is_learned);
        assert_eq!(thresholds.suggest(10.0), SuggestedAction::SkipDay);
        assert_eq!(thresholds.suggest(20.0), SuggestedAction::ReduceVolume);
        assert_eq!(thresholds.suggest(30.0), SuggestedAction::SwapQuality);
        assert_eq!(thresholds.suggest(35.0), SuggestedAction::Proceed);
        assert_eq!(thresholds.suggest(80.0), SuggestedAction::IncreaseVolume);
    }
}
