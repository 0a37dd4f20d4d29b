//! Balance zone classification.
//!
//! A balance value can be read against fixed population bands or against the
//! athlete's own balance distribution. Both paths produce the same
//! [`ZoneInfo`], so callers do not branch on whether personal data exists.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Named balance zones, freshest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceZone {
    OvertrainingRisk,
    Overreaching,
    OptimalTraining,
    Recovering,
    RaceReady,
}

impl BalanceZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            BalanceZone::RaceReady => "race_ready",
            BalanceZone::Recovering => "recovering",
            BalanceZone::OptimalTraining => "optimal_training",
            BalanceZone::Overreaching => "overreaching",
            BalanceZone::OvertrainingRisk => "overtraining_risk",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BalanceZone::RaceReady => "Race Ready",
            BalanceZone::Recovering => "Recovering",
            BalanceZone::OptimalTraining => "Optimal Training",
            BalanceZone::Overreaching => "Overreaching",
            BalanceZone::OvertrainingRisk => "Overtraining Risk",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            BalanceZone::RaceReady => "green",
            BalanceZone::Recovering => "blue",
            BalanceZone::OptimalTraining => "yellow",
            BalanceZone::Overreaching => "orange",
            BalanceZone::OvertrainingRisk => "red",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BalanceZone::RaceReady => "Fresh with fitness intact. A good window for racing or a key session.",
            BalanceZone::Recovering => "Fatigue is clearing. Light to moderate training is absorbed well.",
            BalanceZone::OptimalTraining => "Normal training fatigue. Fitness is being built productively.",
            BalanceZone::Overreaching => "Fatigue is outpacing fitness. Short blocks here are fine, long ones are not.",
            BalanceZone::OvertrainingRisk => "Sustained deep fatigue. Recovery should take priority.",
        }
    }

    pub fn is_race_window(&self) -> bool {
        matches!(self, BalanceZone::RaceReady)
    }
}

/// Zone classification result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneInfo {
    pub zone: BalanceZone,
    pub label: String,
    pub color: String,
    pub description: String,
    pub is_race_window: bool,
    pub balance: f64,
    /// True when personal thresholds backed by sufficient data were used
    pub personalized: bool,
}

impl ZoneInfo {
    fn new(zone: BalanceZone, balance: f64, personalized: bool) -> Self {
        ZoneInfo {
            zone,
            label: zone.label().to_string(),
            color: zone.color().to_string(),
            description: zone.description().to_string(),
            is_race_window: zone.is_race_window(),
            balance,
            personalized,
        }
    }
}

/// Per-athlete thresholds derived from historical balance values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalZoneProfile {
    pub athlete_id: String,
    pub mean_balance: f64,
    pub std_balance: f64,
    pub sample_days: usize,
    pub is_sufficient_data: bool,
    pub threshold_fresh: f64,
    pub threshold_recovering: f64,
    pub threshold_normal_low: f64,
    pub threshold_danger: f64,
}

/// Zone thresholds and personalization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Population lower bounds, descending
    pub race_ready_min: f64,
    pub recovering_min: f64,
    pub optimal_training_min: f64,
    pub overreaching_min: f64,

    /// Minimum historical days before personal thresholds are trusted
    pub min_profile_days: usize,

    /// Floor on the personal standard deviation
    pub min_std_balance: f64,

    /// Mean/std used when personal data is insufficient
    pub fallback_mean: f64,
    pub fallback_std: f64,

    /// Threshold offsets in standard deviations from the mean
    pub fresh_sd: f64,
    pub recovering_sd: f64,
    pub normal_low_sd: f64,
    pub danger_sd: f64,

    /// Days of balance history used to build a personal profile
    pub profile_lookback_days: u16,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        ZoneConfig {
            race_ready_min: 15.0,
            recovering_min: 5.0,
            optimal_training_min: -10.0,
            overreaching_min: -30.0,
            min_profile_days: 56,
            min_std_balance: 8.0,
            fallback_mean: -5.0,
            fallback_std: 15.0,
            fresh_sd: 1.5,
            recovering_sd: 0.75,
            normal_low_sd: -1.0,
            danger_sd: -2.0,
            profile_lookback_days: 180,
        }
    }
}

/// Zone classification engine
#[derive(Debug, Clone, Default)]
pub struct ZoneCalculator {
    config: ZoneConfig,
}

impl ZoneCalculator {
    pub fn new() -> Self {
        ZoneCalculator::default()
    }

    pub fn with_config(config: ZoneConfig) -> Self {
        ZoneCalculator { config }
    }

    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }

    /// Classify against fixed population thresholds
    pub fn population_zone(&self, balance: f64) -> ZoneInfo {
        let zone = Self::classify(
            balance,
            self.config.race_ready_min,
            self.config.recovering_min,
            self.config.optimal_training_min,
            self.config.overreaching_min,
        );
        ZoneInfo::new(zone, balance, false)
    }

    /// Classify against the athlete's own thresholds
    pub fn personal_zone(&self, profile: &PersonalZoneProfile, balance: f64) -> ZoneInfo {
        let zone = Self::classify(
            balance,
            profile.threshold_fresh,
            profile.threshold_recovering,
            profile.threshold_normal_low,
            profile.threshold_danger,
        );
        ZoneInfo::new(zone, balance, profile.is_sufficient_data)
    }

    fn classify(balance: f64, fresh: f64, recovering: f64, normal_low: f64, danger: f64) -> BalanceZone {
        if balance >= fresh {
            BalanceZone::RaceReady
        } else if balance >= recovering {
            BalanceZone::Recovering
        } else if balance >= normal_low {
            BalanceZone::OptimalTraining
        } else if balance >= danger {
            BalanceZone::Overreaching
        } else {
            BalanceZone::OvertrainingRisk
        }
    }

    /// Build personal thresholds from historical daily balance values.
    ///
    /// Below `min_profile_days` values the profile carries the fallback
    /// mean/std and `is_sufficient_data = false`.
    pub fn build_profile(&self, athlete_id: &str, historical_balances: &[f64]) -> PersonalZoneProfile {
        let sample_days = historical_balances.len();
        let is_sufficient_data = sample_days >= self.config.min_profile_days && sample_days >= 2;

        let (mean, std) = if is_sufficient_data {
            let mean = historical_balances.iter().mean();
            let std = historical_balances.iter().std_dev();
            (mean, std.max(self.config.min_std_balance))
        } else {
            (self.config.fallback_mean, self.config.fallback_std)
        };

        PersonalZoneProfile {
            athlete_id: athlete_id.to_string(),
            mean_balance: mean,
            std_balance: std,
            sample_days,
            is_sufficient_data,
            threshold_fresh: mean + self.config.fresh_sd * std,
            threshold_recovering: mean + self.config.recovering_sd * std,
            threshold_normal_low: mean + self.config.normal_low_sd * std,
            threshold_danger: mean + self.config.danger_sd * std,
        }
    }
}
