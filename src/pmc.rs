use crate::models::{AthleteProfile, WorkoutRecord};
use crate::tss::{TssCalculator, WorkoutStress};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Daily stress total with the running load values after that day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyLoad {
    /// Date of the training day
    pub date: NaiveDate,

    /// Total stress for the day (sum of all workouts, 0 on rest days)
    pub total_stress: f64,

    /// Number of workouts completed on this day
    pub workout_count: u16,

    /// Acute load (7-day family exponential average) - fatigue
    pub acute_load: f64,

    /// Chronic load (42-day family exponential average) - fitness
    pub chronic_load: f64,

    /// Chronic minus acute
    pub balance: f64,
}

/// Load configuration with customizable time constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Acute span in days (default: 7)
    pub acute_days: u16,

    /// Chronic span in days (default: 42)
    pub chronic_days: u16,

    /// Days of history replayed from a zero start before reporting a summary
    pub backfill_days: u16,

    /// Length of each trailing window compared for trend labels
    pub trend_window_days: u16,

    /// Relative change that turns a trend from stable into rising/falling
    pub trend_threshold: f64,

    /// Loads below both of these mean the athlete is barely training
    pub low_acute_load: f64,
    pub low_chronic_load: f64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            acute_days: 7,
            chronic_days: 42,
            backfill_days: 60,
            trend_window_days: 7,
            trend_threshold: 0.10,
            low_acute_load: 20.0,
            low_chronic_load: 30.0,
        }
    }
}

impl LoadConfig {
    /// EMA smoothing factor 2/(N+1)
    fn alpha(span_days: u16) -> f64 {
        2.0 / (span_days.max(1) as f64 + 1.0)
    }

    pub fn acute_alpha(&self) -> f64 {
        Self::alpha(self.acute_days)
    }

    pub fn chronic_alpha(&self) -> f64 {
        Self::alpha(self.chronic_days)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Rising,
    Stable,
    Falling,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Rising => "rising",
            TrendDirection::Stable => "stable",
            TrendDirection::Falling => "falling",
        }
    }
}

/// Macro training phase derived from load trends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingPhase {
    Building,
    Tapering,
    Recovering,
    Maintaining,
}

impl TrainingPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingPhase::Building => "building",
            TrainingPhase::Tapering => "tapering",
            TrainingPhase::Recovering => "recovering",
            TrainingPhase::Maintaining => "maintaining",
        }
    }
}

/// Current load state returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub athlete_id: String,
    pub date: NaiveDate,
    pub acute_load: f64,
    pub chronic_load: f64,
    pub balance: f64,
    pub acute_trend: TrendDirection,
    pub chronic_trend: TrendDirection,
    pub balance_trend: TrendDirection,
    pub phase: TrainingPhase,
    pub recommendation: String,
}

/// Core load aggregation engine
#[derive(Debug, Clone, Default)]
pub struct PmcCalculator {
    config: LoadConfig,
    stress: TssCalculator,
}

impl PmcCalculator {
    /// Create new load calculator with default configuration
    pub fn new() -> Self {
        PmcCalculator::default()
    }

    /// Create new load calculator with custom configuration
    pub fn with_config(config: LoadConfig, stress: TssCalculator) -> Self {
        PmcCalculator { config, stress }
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    pub fn stress_calculator(&self) -> &TssCalculator {
        &self.stress
    }

    /// Score every workout in the slice
    pub fn score_workouts(
        &self,
        workouts: &[WorkoutRecord],
        athlete: &AthleteProfile,
    ) -> Vec<WorkoutStress> {
        workouts
            .iter()
            .map(|w| self.stress.compute(w, athlete))
            .collect()
    }

    /// Sum stress per calendar day
    pub fn aggregate_daily_stress(&self, stresses: &[WorkoutStress]) -> BTreeMap<NaiveDate, (f64, u16)> {
        let mut daily: BTreeMap<NaiveDate, (f64, u16)> = BTreeMap::new();

        for stress in stresses {
            let entry = daily.entry(stress.date).or_insert((0.0, 0));
            entry.0 += stress.stress_score;
            entry.1 += 1;
        }

        daily
    }

    /// Replay the two exponential averages from zero over `start..=end`.
    ///
    /// Days missing from `daily` are rest days. Each day depends only on the
    /// previous day's running values and that day's total.
    pub fn compute_loads(
        &self,
        daily: &BTreeMap<NaiveDate, (f64, u16)>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<DailyLoad> {
        let acute_alpha = self.config.acute_alpha();
        let chronic_alpha = self.config.chronic_alpha();

        let mut acute = 0.0;
        let mut chronic = 0.0;
        let mut loads = Vec::new();

        for date in start.iter_days().take_while(|d| *d <= end) {
            let (total_stress, workout_count) = daily.get(&date).copied().unwrap_or((0.0, 0));

            acute = acute * (1.0 - acute_alpha) + total_stress * acute_alpha;
            chronic = chronic * (1.0 - chronic_alpha) + total_stress * chronic_alpha;

            loads.push(DailyLoad {
                date,
                total_stress,
                workout_count,
                acute_load: acute,
                chronic_load: chronic,
                balance: chronic - acute,
            });
        }

        loads
    }

    /// Daily load history for the `n_days` ending at `end_date`, starting cold
    pub fn history(
        &self,
        athlete: &AthleteProfile,
        end_date: NaiveDate,
        n_days: u16,
        workouts: &[WorkoutRecord],
    ) -> Vec<DailyLoad> {
        if n_days == 0 {
            return Vec::new();
        }
        let start = window_start(end_date, n_days);

        let in_window: Vec<WorkoutRecord> = workouts
            .iter()
            .filter(|w| w.date() >= start && w.date() <= end_date)
            .cloned()
            .collect();

        let stresses = self.score_workouts(&in_window, athlete);
        let daily = self.aggregate_daily_stress(&stresses);
        self.compute_loads(&daily, start, end_date)
    }

    /// Current load state from a backfill window ending at `target_date`
    pub fn summarize(
        &self,
        athlete: &AthleteProfile,
        target_date: NaiveDate,
        workouts: &[WorkoutRecord],
    ) -> LoadSummary {
        let history = self.history(athlete, target_date, self.config.backfill_days, workouts);
        self.summarize_history(&athlete.id, target_date, &history)
    }

    /// Build a summary from an already computed history
    pub fn summarize_history(
        &self,
        athlete_id: &str,
        target_date: NaiveDate,
        history: &[DailyLoad],
    ) -> LoadSummary {
        let (acute, chronic, balance) = history
            .last()
            .map(|d| (d.acute_load, d.chronic_load, d.balance))
            .unwrap_or((0.0, 0.0, 0.0));

        let acute_values: Vec<f64> = history.iter().map(|d| d.acute_load).collect();
        let chronic_values: Vec<f64> = history.iter().map(|d| d.chronic_load).collect();
        let balance_values: Vec<f64> = history.iter().map(|d| d.balance).collect();

        let acute_trend = self.determine_trend(&acute_values);
        let chronic_trend = self.determine_trend(&chronic_values);
        let balance_trend = self.determine_trend(&balance_values);

        let phase = self.detect_phase(acute_trend, chronic_trend, balance, acute, chronic);
        let recommendation = Self::generate_recommendation(balance, phase);

        LoadSummary {
            athlete_id: athlete_id.to_string(),
            date: target_date,
            acute_load: acute,
            chronic_load: chronic,
            balance,
            acute_trend,
            chronic_trend,
            balance_trend,
            phase,
            recommendation,
        }
    }

    /// Compare the mean of the trailing window against the window before it
    pub fn determine_trend(&self, values: &[f64]) -> TrendDirection {
        let window = self.config.trend_window_days as usize;
        if window == 0 || values.len() < window * 2 {
            return TrendDirection::Stable;
        }

        let recent = values[values.len() - window..].iter().mean();
        let prior = values[values.len() - window * 2..values.len() - window]
            .iter()
            .mean();

        if prior.abs() < f64::EPSILON {
            return if recent > f64::EPSILON {
                TrendDirection::Rising
            } else if recent < -f64::EPSILON {
                TrendDirection::Falling
            } else {
                TrendDirection::Stable
            };
        }

        let change = (recent - prior) / prior.abs();
        if change > self.config.trend_threshold {
            TrendDirection::Rising
        } else if change < -self.config.trend_threshold {
            TrendDirection::Falling
        } else {
            TrendDirection::Stable
        }
    }

    /// Phase decision table, evaluated top to bottom
    pub fn detect_phase(
        &self,
        acute_trend: TrendDirection,
        chronic_trend: TrendDirection,
        balance: f64,
        acute: f64,
        chronic: f64,
    ) -> TrainingPhase {
        use TrendDirection::*;

        if acute_trend == Rising && chronic_trend == Rising {
            TrainingPhase::Building
        } else if balance > 0.0 && acute_trend != Rising {
            TrainingPhase::Tapering
        } else if acute < self.config.low_acute_load && chronic < self.config.low_chronic_load {
            TrainingPhase::Recovering
        } else if acute_trend == Stable && chronic_trend == Stable {
            TrainingPhase::Maintaining
        } else {
            TrainingPhase::Building
        }
    }

    /// Advisory text from fixed balance/phase bands
    pub fn generate_recommendation(balance: f64, phase: TrainingPhase) -> String {
        let text = if balance < -30.0 {
            "Fatigue is very high relative to fitness. Take rest or very easy days until balance recovers."
        } else if balance < -20.0 {
            "Fatigue is building faster than fitness. Ease off intensity and prioritise recovery for a few days."
        } else if balance > 25.0 && phase == TrainingPhase::Tapering {
            "Fresh and tapering: this is a good window for a goal effort or race."
        } else if balance > 25.0 {
            "Very fresh. Fitness may start to slip without more training load."
        } else if phase == TrainingPhase::Recovering {
            "Training load is low. Rebuild volume gradually before adding intensity."
        } else if balance < -10.0 {
            "Productive training fatigue. Keep quality sessions but protect easy days."
        } else {
            match phase {
                TrainingPhase::Building => "Load is building steadily. Continue the progression and watch for accumulating fatigue.",
                TrainingPhase::Tapering => "Fatigue is clearing. Keep some intensity to stay sharp.",
                TrainingPhase::Maintaining => "Load is stable. Add volume or intensity if you want to keep building fitness.",
                TrainingPhase::Recovering => "Training load is low. Rebuild volume gradually before adding intensity.",
            }
        };
        text.to_string()
    }
}

/// First day of an `n_days` window ending at `end` (inclusive)
pub fn window_start(end: NaiveDate, n_days: u16) -> NaiveDate {
    end.checked_sub_days(Days::new(n_days.saturating_sub(1) as u64))
        .unwrap_or(end)
}
