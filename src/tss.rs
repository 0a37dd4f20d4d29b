use crate::models::{AthleteProfile, WorkoutRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Methods used for stress score calculation, best data first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressMethod {
    HrBased,   // Heart-rate reserve with exponential weighting
    PaceBased, // Threshold pace over actual pace
    Estimated, // Keyword table on name/type
    TooShort,  // Below the minimum scorable duration
}

impl StressMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            StressMethod::HrBased => "hr_based",
            StressMethod::PaceBased => "pace_based",
            StressMethod::Estimated => "estimated",
            StressMethod::TooShort => "too_short",
        }
    }
}

/// Stress score for one workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutStress {
    pub activity_id: String,
    pub date: NaiveDate,
    pub stress_score: f64,
    pub duration_minutes: f64,
    pub intensity_factor: f64,
    pub calculation_method: StressMethod,
}

/// Tunable constants for the stress cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressConfig {
    /// Workouts shorter than this score zero
    pub min_duration_minutes: f64,

    /// Coefficient of the exponential HR effort curve
    pub hr_effort_base: f64,

    /// Exponent multiplier of the HR effort curve
    pub hr_effort_exponent: f64,

    /// Heart-rate reserve fraction treated as threshold effort
    pub hr_reference_reserve: f64,

    /// Upper clamp on heart-rate reserve fraction
    pub hr_reserve_cap: f64,

    /// Pace intensity factor clamp
    pub pace_if_min: f64,
    pub pace_if_max: f64,

    /// Intensity factor at or above which a session counts as quality work
    pub quality_if_threshold: f64,

    /// Intensity factor when no keyword matches
    pub default_intensity: f64,

    /// Ordered keyword table for the estimated method; first match wins
    pub keyword_intensities: Vec<KeywordIntensity>,
}

/// One row of the estimated-intensity keyword table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordIntensity {
    pub keywords: Vec<String>,
    pub intensity_factor: f64,
}

impl KeywordIntensity {
    fn new(keywords: &[&str], intensity_factor: f64) -> Self {
        KeywordIntensity {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            intensity_factor,
        }
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        StressConfig {
            min_duration_minutes: 5.0,
            hr_effort_base: 0.75,
            hr_effort_exponent: 1.8,
            hr_reference_reserve: 0.88,
            hr_reserve_cap: 1.1,
            pace_if_min: 0.5,
            pace_if_max: 1.5,
            quality_if_threshold: 0.9,
            default_intensity: 0.78,
            keyword_intensities: vec![
                KeywordIntensity::new(&["race"], 1.0),
                KeywordIntensity::new(&["interval", "speed"], 0.95),
                KeywordIntensity::new(&["tempo", "threshold"], 0.9),
                KeywordIntensity::new(&["long"], 0.75),
                KeywordIntensity::new(&["easy", "recovery"], 0.65),
            ],
        }
    }
}

/// Core stress score calculation engine
#[derive(Debug, Clone, Default)]
pub struct TssCalculator {
    config: StressConfig,
}

impl TssCalculator {
    pub fn new() -> Self {
        TssCalculator {
            config: StressConfig::default(),
        }
    }

    pub fn with_config(config: StressConfig) -> Self {
        TssCalculator { config }
    }

    pub fn config(&self) -> &StressConfig {
        &self.config
    }

    /// Calculate the stress score for a workout using the best available method.
    ///
    /// Never fails: missing fields only change which method is used.
    pub fn compute(&self, workout: &WorkoutRecord, athlete: &AthleteProfile) -> WorkoutStress {
        let duration_minutes = workout.duration_minutes();

        if duration_minutes < self.config.min_duration_minutes {
            return WorkoutStress {
                activity_id: workout.id.clone(),
                date: workout.date(),
                stress_score: 0.0,
                duration_minutes,
                intensity_factor: 0.0,
                calculation_method: StressMethod::TooShort,
            };
        }

        let (intensity_factor, method) = self
            .hr_intensity(workout, athlete)
            .map(|f| (f, StressMethod::HrBased))
            .or_else(|| {
                self.pace_intensity(workout, athlete)
                    .map(|f| (f, StressMethod::PaceBased))
            })
            .unwrap_or_else(|| (self.estimated_intensity(workout), StressMethod::Estimated));

        WorkoutStress {
            activity_id: workout.id.clone(),
            date: workout.date(),
            stress_score: Self::stress_score(duration_minutes, intensity_factor),
            duration_minutes,
            intensity_factor,
            calculation_method: method,
        }
    }

    /// stress = duration_minutes × IF² / 60 × 100
    pub fn stress_score(duration_minutes: f64, intensity_factor: f64) -> f64 {
        (duration_minutes * intensity_factor * intensity_factor / 60.0 * 100.0).max(0.0)
    }

    /// Exponentially weighted heart-rate reserve, normalised to threshold effort
    fn hr_intensity(&self, workout: &WorkoutRecord, athlete: &AthleteProfile) -> Option<f64> {
        let avg_hr = workout.avg_heart_rate? as f64;
        let (rest, max) = athlete.heart_rate_range()?;
        let (rest, max) = (rest as f64, max as f64);

        let hrr = ((avg_hr - rest) / (max - rest)).clamp(0.0, self.config.hr_reserve_cap);
        let effort = self.hr_effort(hrr);
        let reference = self.hr_effort(self.config.hr_reference_reserve);

        Some(effort / reference)
    }

    fn hr_effort(&self, hrr: f64) -> f64 {
        self.config.hr_effort_base * (self.config.hr_effort_exponent * hrr).exp()
    }

    /// Threshold pace over actual pace; a faster pace gives a ratio above 1
    fn pace_intensity(&self, workout: &WorkoutRecord, athlete: &AthleteProfile) -> Option<f64> {
        let threshold = athlete.threshold_pace_seconds()?;
        let distance_km = workout.distance_meters.filter(|d| *d > 0.0)? / 1000.0;
        let duration = workout.duration_seconds.filter(|d| *d > 0)? as f64;

        let actual_pace = duration / distance_km;
        Some((threshold / actual_pace).clamp(self.config.pace_if_min, self.config.pace_if_max))
    }

    fn estimated_intensity(&self, workout: &WorkoutRecord) -> f64 {
        let text = workout.description();

        self.config
            .keyword_intensities
            .iter()
            .find(|row| row.keywords.iter().any(|k| text.contains(k.as_str())))
            .map(|row| row.intensity_factor)
            .unwrap_or(self.config.default_intensity)
    }

    /// Whether a scored workout counts as a quality (hard) session
    pub fn is_quality_session(&self, stress: &WorkoutStress) -> bool {
        stress.calculation_method != StressMethod::TooShort
            && stress.intensity_factor >= self.config.quality_if_threshold
    }
}
