//! Unified error hierarchy for TrainReady
//!
//! The scoring engine degrades instead of failing, so the variants here cover
//! the few conditions that do reach callers: unknown athletes, storage
//! failures and invalid configuration or input.

use crate::database::DatabaseError;
use thiserror::Error;

/// Top-level error type for all TrainReady operations
#[derive(Debug, Error)]
pub enum TrainReadyError {
    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// The athlete id is not known to the data source
    #[error("Athlete not found: {athlete_id}")]
    AthleteNotFound { athlete_id: String },

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for TrainReady operations
pub type Result<T> = std::result::Result<T, TrainReadyError>;

impl TrainReadyError {
    pub fn athlete_not_found(athlete_id: impl Into<String>) -> Self {
        TrainReadyError::AthleteNotFound {
            athlete_id: athlete_id.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TrainReadyError::Database(DatabaseError::Busy(_)) | TrainReadyError::Io(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TrainReadyError::AthleteNotFound { .. } => ErrorSeverity::Warning,
            TrainReadyError::Validation(_) => ErrorSeverity::Warning,
            TrainReadyError::Database(_) => ErrorSeverity::Error,
            TrainReadyError::Configuration(_) => ErrorSeverity::Error,
            TrainReadyError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            TrainReadyError::AthleteNotFound { athlete_id } => {
                format!("No athlete with id '{}' exists", athlete_id)
            }
            TrainReadyError::Database(DatabaseError::Busy(_)) => {
                "The database is busy. Please retry in a moment.".to_string()
            }
            TrainReadyError::Configuration(reason) => {
                format!("Configuration problem: {}", reason)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = TrainReadyError::athlete_not_found("ghost");
        assert_eq!(err.severity(), ErrorSeverity::Warning);

        let err = TrainReadyError::Internal("test".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_error_retryable() {
        let err = TrainReadyError::Database(DatabaseError::Busy("locked".to_string()));
        assert!(err.is_retryable());

        let err = TrainReadyError::Validation("test".to_string());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_user_messages() {
        let err = TrainReadyError::athlete_not_found("ghost");
        assert!(err.user_message().contains("ghost"));
        assert_eq!(err.to_string(), "Athlete not found: ghost");
    }
}
