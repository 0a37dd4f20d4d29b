// Library interface for trainready
// Exposes the scoring engine to the CLI, benches and integration tests

pub mod batch;
pub mod calibration;
pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod pmc;
pub mod readiness;
pub mod source;
pub mod tss;
pub mod zones;

// Re-export commonly used types for convenience
pub use models::*;
pub use tss::{StressMethod, TssCalculator, WorkoutStress};
pub use pmc::{DailyLoad, LoadSummary, PmcCalculator, TrainingPhase, TrendDirection};
pub use zones::{BalanceZone, PersonalZoneProfile, ZoneCalculator, ZoneInfo};
pub use readiness::{DailyReadinessResult, ReadinessAggregator, ReadinessSignals, SignalUnavailable};
pub use calibration::{AdaptiveThresholds, CalibrationEntry, CalibrationOutcome, SuggestedAction};
pub use engine::{ReadinessEngine, ZoneAssessment};
pub use source::TrainingDataSource;
pub use database::{Database, DatabaseError};
pub use config::EngineConfig;
pub use error::{TrainReadyError, Result};
pub use logging::{LogConfig, LogLevel, LogFormat};
