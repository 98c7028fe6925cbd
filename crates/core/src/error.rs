// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Source document not found: {0}")]
    SourceNotFound(String),

    #[error("{0}")]
    Translation(#[from] crate::port::TranslateError),

    #[error("Translation already in progress for {0}")]
    LockRaceDetected(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scheduling error: {0}")]
    Scheduling(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Short machine-readable kind, used in terminal results and RPC payloads
    pub fn kind(&self) -> &'static str {
        use crate::port::TranslateError;

        match self {
            AppError::Domain(_) => "domain",
            AppError::SourceNotFound(_) => "source_not_found",
            AppError::Translation(TranslateError::MissingCredential) => "missing_credential",
            AppError::Translation(TranslateError::TransportFailure(_)) => "transport_failure",
            AppError::Translation(TranslateError::EngineError(_)) => "engine_error",
            AppError::Translation(TranslateError::TruncatedOutput) => "truncated_output",
            AppError::LockRaceDetected(_) => "lock_race_detected",
            AppError::Validation(_) => "validation",
            AppError::Database(_) => "database",
            AppError::Serialization(_) => "serialization",
            AppError::Config(_) => "config",
            AppError::Scheduling(_) => "scheduling",
            AppError::Internal(_) => "internal",
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to AppError::Database(String)
