use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calibration::ThresholdDefaults;
use crate::logging::LogConfig;
use crate::pmc::LoadConfig;
use crate::readiness::ReadinessConfig;
use crate::tss::StressConfig;
use crate::zones::ZoneConfig;

/// Engine configuration; every section falls back to its defaults when absent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SQLite database location
    pub database_path: PathBuf,

    /// Configuration metadata
    pub metadata: ConfigMetadata,

    /// Per-workout stress constants
    pub stress: StressConfig,

    /// Acute/chronic load windows and phase thresholds
    pub load: LoadConfig,

    /// Population bands and personal profile parameters
    pub zones: ZoneConfig,

    /// Readiness weights and signal mappings
    pub readiness: ReadinessConfig,

    /// Cold-start threshold defaults
    pub calibration: ThresholdDefaults,

    /// Nightly batch settings
    pub batch: BatchSettings,

    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        ConfigMetadata {
            version: "1.0".to_string(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Worker threads, 0 for one per core
    pub threads: usize,

    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        BatchSettings {
            threads: 0,
            show_progress: true,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_path: Self::config_dir().join("trainready.db"),
            metadata: ConfigMetadata::default(),
            stress: StressConfig::default(),
            load: LoadConfig::default(),
            zones: ZoneConfig::default(),
            readiness: ReadinessConfig::default(),
            calibration: ThresholdDefaults::default(),
            batch: BatchSettings::default(),
            logging: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: EngineConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".trainready")
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(path = %config_path.display(), error = %e, "Using default configuration");
                Self::default()
            }
        }
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.load.acute_days == 0 || self.load.chronic_days == 0 {
            anyhow::bail!("load windows must be at least one day");
        }
        if self.load.acute_days >= self.load.chronic_days {
            anyhow::bail!(
                "acute window ({} days) must be shorter than chronic window ({} days)",
                self.load.acute_days,
                self.load.chronic_days
            );
        }
        if self.readiness.tsb_range <= 0.0 {
            anyhow::bail!("readiness tsb_range must be positive");
        }
        if self.readiness.trend_min_points < 2 {
            anyhow::bail!("readiness trend_min_points must be at least 2");
        }
        if self.readiness.slow_half_life_hours <= self.readiness.fast_half_life_hours {
            anyhow::bail!("slow half-life must exceed fast half-life");
        }
        let weights = &self.readiness.weights;
        let all = [
            weights.tsb,
            weights.fitness_trend,
            weights.completion,
            weights.recovery_days,
            weights.half_life,
            weights.hrv,
            weights.sleep,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            anyhow::bail!("readiness weights must be finite and non-negative");
        }
        Ok(())
    }
}
