//! Composite daily readiness.
//!
//! Five independent 0-100 signals are blended into one score. Every signal
//! producer returns `Result<f64, SignalUnavailable>`; unavailable signals are
//! dropped and the remaining weights are renormalised so a missing signal does
//! not drag the score toward zero. HRV and sleep have slots but carry zero
//! weight until their relationship to outcomes is validated per athlete.

use crate::models::{DailyCheckin, EfficiencyPoint, PlannedWorkout};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a signal could not be produced
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalUnavailable {
    #[error("no data")]
    NoData,
    #[error("insufficient data: need {needed}, have {available}")]
    InsufficientData { needed: usize, available: usize },
    #[error("source error: {0}")]
    SourceError(String),
}

pub type SignalResult = Result<f64, SignalUnavailable>;

/// Signal identifiers, in reporting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Tsb,
    FitnessTrend,
    Completion,
    RecoveryDays,
    HalfLife,
    Hrv,
    Sleep,
}

impl SignalKind {
    pub const ALL: [SignalKind; 7] = [
        SignalKind::Tsb,
        SignalKind::FitnessTrend,
        SignalKind::Completion,
        SignalKind::RecoveryDays,
        SignalKind::HalfLife,
        SignalKind::Hrv,
        SignalKind::Sleep,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Tsb => "tsb",
            SignalKind::FitnessTrend => "fitness_trend",
            SignalKind::Completion => "completion",
            SignalKind::RecoveryDays => "recovery_days",
            SignalKind::HalfLife => "half_life",
            SignalKind::Hrv => "hrv",
            SignalKind::Sleep => "sleep",
        }
    }
}

/// Weight per signal. Need not sum to 1; only available signals are used and
/// their weights are renormalised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessWeights {
    pub tsb: f64,
    pub fitness_trend: f64,
    pub completion: f64,
    pub recovery_days: f64,
    pub half_life: f64,
    pub hrv: f64,
    pub sleep: f64,
}

impl Default for ReadinessWeights {
    fn default() -> Self {
        ReadinessWeights {
            tsb: 0.25,
            fitness_trend: 0.30,
            completion: 0.20,
            recovery_days: 0.15,
            half_life: 0.10,
            hrv: 0.0,
            sleep: 0.0,
        }
    }
}

impl ReadinessWeights {
    pub fn weight(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::Tsb => self.tsb,
            SignalKind::FitnessTrend => self.fitness_trend,
            SignalKind::Completion => self.completion,
            SignalKind::RecoveryDays => self.recovery_days,
            SignalKind::HalfLife => self.half_life,
            SignalKind::Hrv => self.hrv,
            SignalKind::Sleep => self.sleep,
        }
    }
}

/// Signal mapping parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Balance mapped linearly from [-range, +range] onto [0, 100]
    pub tsb_range: f64,

    /// Days of efficiency history split into older/newer halves
    pub trend_days: u16,

    /// Minimum efficiency samples before a trend is reported
    pub trend_min_points: usize,

    /// Score points per percent efficiency change, centred at 50
    pub trend_points_per_percent: f64,

    /// Days of planned workouts considered for completion rate
    pub completion_days: u16,

    /// Half-life hours scoring 100 and 0 respectively
    pub fast_half_life_hours: f64,
    pub slow_half_life_hours: f64,

    /// Target sleep hours for a full sleep score
    pub sleep_target_hours: f64,

    /// Days of check-ins forming the HRV baseline
    pub hrv_baseline_days: u16,

    pub weights: ReadinessWeights,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        ReadinessConfig {
            tsb_range: 30.0,
            trend_days: 14,
            trend_min_points: 4,
            trend_points_per_percent: 5.0,
            completion_days: 7,
            fast_half_life_hours: 12.0,
            slow_half_life_hours: 72.0,
            sleep_target_hours: 8.0,
            hrv_baseline_days: 7,
            weights: ReadinessWeights::default(),
        }
    }
}

/// Raw signal outcomes handed to the aggregator
#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessSignals {
    pub tsb: SignalResult,
    pub fitness_trend: SignalResult,
    pub completion: SignalResult,
    pub recovery_days: SignalResult,
    pub half_life: SignalResult,
    pub hrv: SignalResult,
    pub sleep: SignalResult,
}

impl Default for ReadinessSignals {
    fn default() -> Self {
        ReadinessSignals {
            tsb: Err(SignalUnavailable::NoData),
            fitness_trend: Err(SignalUnavailable::NoData),
            completion: Err(SignalUnavailable::NoData),
            recovery_days: Err(SignalUnavailable::NoData),
            half_life: Err(SignalUnavailable::NoData),
            hrv: Err(SignalUnavailable::NoData),
            sleep: Err(SignalUnavailable::NoData),
        }
    }
}

impl ReadinessSignals {
    pub fn get(&self, kind: SignalKind) -> &SignalResult {
        match kind {
            SignalKind::Tsb => &self.tsb,
            SignalKind::FitnessTrend => &self.fitness_trend,
            SignalKind::Completion => &self.completion,
            SignalKind::RecoveryDays => &self.recovery_days,
            SignalKind::HalfLife => &self.half_life,
            SignalKind::Hrv => &self.hrv,
            SignalKind::Sleep => &self.sleep,
        }
    }
}

/// Per-signal sub-scores; `None` when the signal was unavailable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadinessComponents {
    pub tsb: Option<f64>,
    pub fitness_trend: Option<f64>,
    pub completion: Option<f64>,
    pub recovery_days: Option<f64>,
    pub half_life: Option<f64>,
    pub hrv: Option<f64>,
    pub sleep: Option<f64>,
}

impl ReadinessComponents {
    pub fn from_signals(signals: &ReadinessSignals) -> Self {
        ReadinessComponents {
            tsb: signals.tsb.clone().ok(),
            fitness_trend: signals.fitness_trend.clone().ok(),
            completion: signals.completion.clone().ok(),
            recovery_days: signals.recovery_days.clone().ok(),
            half_life: signals.half_life.clone().ok(),
            hrv: signals.hrv.clone().ok(),
            sleep: signals.sleep.clone().ok(),
        }
    }

    /// Flat name → value map, for storage and display
    pub fn to_map(&self) -> BTreeMap<String, Option<f64>> {
        [
            (SignalKind::Tsb, self.tsb),
            (SignalKind::FitnessTrend, self.fitness_trend),
            (SignalKind::Completion, self.completion),
            (SignalKind::RecoveryDays, self.recovery_days),
            (SignalKind::HalfLife, self.half_life),
            (SignalKind::Hrv, self.hrv),
            (SignalKind::Sleep, self.sleep),
        ]
        .into_iter()
        .map(|(kind, value)| (kind.as_str().to_string(), value))
        .collect()
    }

    pub fn from_map(map: &BTreeMap<String, Option<f64>>) -> Self {
        let get = |kind: SignalKind| map.get(kind.as_str()).copied().flatten();
        ReadinessComponents {
            tsb: get(SignalKind::Tsb),
            fitness_trend: get(SignalKind::FitnessTrend),
            completion: get(SignalKind::Completion),
            recovery_days: get(SignalKind::RecoveryDays),
            half_life: get(SignalKind::HalfLife),
            hrv: get(SignalKind::Hrv),
            sleep: get(SignalKind::Sleep),
        }
    }
}

/// Composite readiness for one athlete and day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReadinessResult {
    pub athlete_id: String,
    pub date: NaiveDate,
    pub score: f64,
    pub components: ReadinessComponents,
    pub signals_available: u8,
    pub signals_total: u8,
    pub confidence: f64,
    /// Effective (renormalised) weight of each signal that contributed
    pub weights_used: BTreeMap<String, f64>,
}

/// Neutral score returned when no weighted signal is available
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Recovery curve by days since the last quality session; peaks on day 3
const RECOVERY_CURVE: [f64; 8] = [35.0, 55.0, 80.0, 100.0, 90.0, 80.0, 70.0, 60.0];
const RECOVERY_DECAY_PER_DAY: f64 = 3.0;
const RECOVERY_FLOOR: f64 = 40.0;

/// Readiness aggregation engine
#[derive(Debug, Clone, Default)]
pub struct ReadinessAggregator {
    config: ReadinessConfig,
}

impl ReadinessAggregator {
    pub fn new() -> Self {
        ReadinessAggregator::default()
    }

    pub fn with_config(config: ReadinessConfig) -> Self {
        ReadinessAggregator { config }
    }

    pub fn config(&self) -> &ReadinessConfig {
        &self.config
    }

    /// Blend the available signals into one result.
    ///
    /// Signals with zero weight are reported in `components` but never count
    /// toward `signals_available` or `signals_total`.
    pub fn compute(
        &self,
        athlete_id: &str,
        target_date: NaiveDate,
        signals: &ReadinessSignals,
    ) -> DailyReadinessResult {
        let weights = &self.config.weights;

        let weighted: Vec<SignalKind> = SignalKind::ALL
            .into_iter()
            .filter(|kind| weights.weight(*kind) > 0.0)
            .collect();

        let available: Vec<(SignalKind, f64, f64)> = weighted
            .iter()
            .filter_map(|kind| {
                signals
                    .get(*kind)
                    .as_ref()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(|v| (*kind, *v, weights.weight(*kind)))
            })
            .collect();

        let signals_total = weighted.len() as u8;
        let signals_available = available.len() as u8;
        let weight_sum: f64 = available.iter().map(|(_, _, w)| w).sum();

        let (score, confidence, weights_used) = if available.is_empty() || weight_sum <= 0.0 {
            (NEUTRAL_SCORE, 0.0, BTreeMap::new())
        } else {
            let raw = available.iter().map(|(_, v, w)| v * w).sum::<f64>() / weight_sum;
            let weights_used = available
                .iter()
                .map(|(kind, _, w)| (kind.as_str().to_string(), w / weight_sum))
                .collect();
            (
                round_one_decimal(raw.clamp(0.0, 100.0)),
                signals_available as f64 / signals_total as f64,
                weights_used,
            )
        };

        DailyReadinessResult {
            athlete_id: athlete_id.to_string(),
            date: target_date,
            score,
            components: ReadinessComponents::from_signals(signals),
            signals_available,
            signals_total,
            confidence,
            weights_used,
        }
    }

    /// Balance remapped from [-range, range] to [0, 100]
    pub fn tsb_signal(&self, balance: f64) -> SignalResult {
        if !balance.is_finite() {
            return Err(SignalUnavailable::NoData);
        }
        let range = self.config.tsb_range;
        Ok(((balance + range) / (2.0 * range) * 100.0).clamp(0.0, 100.0))
    }

    /// Percent change in efficiency between the older and newer halves
    pub fn fitness_trend_signal(&self, points: &[EfficiencyPoint]) -> SignalResult {
        let mut sorted: Vec<&EfficiencyPoint> = points
            .iter()
            .filter(|p| p.efficiency.is_finite() && p.efficiency > 0.0)
            .collect();

        let needed = self.config.trend_min_points.max(2);
        if sorted.len() < needed {
            return Err(SignalUnavailable::InsufficientData {
                needed,
                available: sorted.len(),
            });
        }
        sorted.sort_by_key(|p| p.date);

        let mid = sorted.len() / 2;
        let older = sorted[..mid].iter().map(|p| p.efficiency).mean();
        let newer = sorted[mid..].iter().map(|p| p.efficiency).mean();

        let pct_change = (newer - older) / older * 100.0;
        Ok((50.0 + pct_change * self.config.trend_points_per_percent).clamp(0.0, 100.0))
    }

    /// Share of planned workouts completed
    pub fn completion_signal(&self, planned: &[PlannedWorkout]) -> SignalResult {
        if planned.is_empty() {
            return Err(SignalUnavailable::NoData);
        }
        let completed = planned.iter().filter(|p| p.completed).count();
        Ok(completed as f64 / planned.len() as f64 * 100.0)
    }

    /// Score days since the last quality session on the recovery curve
    pub fn recovery_days_signal(&self, days_since_quality: Option<i64>) -> SignalResult {
        let days = days_since_quality.ok_or(SignalUnavailable::NoData)?;
        if days < 0 {
            return Err(SignalUnavailable::NoData);
        }
        Ok(recovery_curve(days as usize))
    }

    /// Faster personal recovery scores higher
    pub fn half_life_signal(&self, half_life_hours: Option<f64>) -> SignalResult {
        let hours = half_life_hours
            .filter(|h| h.is_finite() && *h > 0.0)
            .ok_or(SignalUnavailable::NoData)?;
        let fast = self.config.fast_half_life_hours;
        let slow = self.config.slow_half_life_hours;
        Ok(((slow - hours) / (slow - fast) * 100.0).clamp(0.0, 100.0))
    }

    /// Sleep duration against the target
    pub fn sleep_signal(&self, today: Option<&DailyCheckin>) -> SignalResult {
        let hours = today
            .and_then(|c| c.sleep_hours())
            .filter(|h| *h >= 0.0)
            .ok_or(SignalUnavailable::NoData)?;
        Ok((hours / self.config.sleep_target_hours * 100.0).clamp(0.0, 100.0))
    }

    /// Today's HRV against the mean of the preceding check-ins
    pub fn hrv_signal(&self, today: Option<&DailyCheckin>, baseline: &[DailyCheckin]) -> SignalResult {
        let current = today
            .and_then(|c| c.hrv_rmssd())
            .filter(|v| *v > 0.0)
            .ok_or(SignalUnavailable::NoData)?;

        let history: Vec<f64> = baseline
            .iter()
            .filter_map(|c| c.hrv_rmssd())
            .filter(|v| *v > 0.0)
            .collect();
        if history.len() < 3 {
            return Err(SignalUnavailable::InsufficientData {
                needed: 3,
                available: history.len(),
            });
        }

        let mean = history.iter().mean();
        let deviation_pct = (current - mean) / mean * 100.0;
        Ok((50.0 + deviation_pct * 2.5).clamp(0.0, 100.0))
    }
}

fn recovery_curve(days: usize) -> f64 {
    match RECOVERY_CURVE.get(days) {
        Some(score) => *score,
        None => {
            let last = RECOVERY_CURVE.len() - 1;
            let extra = (days - last) as f64;
            (RECOVERY_CURVE[last] - extra * RECOVERY_DECAY_PER_DAY).max(RECOVERY_FLOOR)
        }
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
