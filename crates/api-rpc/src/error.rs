//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes. The error `data` carries
//! the machine-readable kind.

use jsonrpsee::types::ErrorObjectOwned;
use transcache_core::domain::DomainError;
use transcache_core::error::AppError;
use transcache_core::port::TranslateError;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const TRUNCATED_OUTPUT: i32 = 4004;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
    pub const ENGINE_ERROR: i32 = 5003;
    pub const TRANSPORT_ERROR: i32 = 5004;
    pub const MISSING_CREDENTIAL: i32 = 5005;
}

pub fn error_code(err: &AppError) -> i32 {
    match err {
        AppError::Validation(_)
        | AppError::Serialization(_)
        | AppError::Domain(DomainError::InvalidRequest(_)) => code::VALIDATION_ERROR,
        AppError::SourceNotFound(_) => code::NOT_FOUND,
        AppError::LockRaceDetected(_) => code::CONFLICT,
        AppError::Translation(TranslateError::TruncatedOutput) => code::TRUNCATED_OUTPUT,
        AppError::Translation(TranslateError::EngineError(_)) => code::ENGINE_ERROR,
        AppError::Translation(TranslateError::TransportFailure(_)) => code::TRANSPORT_ERROR,
        AppError::Translation(TranslateError::MissingCredential) => code::MISSING_CREDENTIAL,
        AppError::Database(_) => code::DB_ERROR,
        AppError::Domain(DomainError::InvalidPhaseTransition { .. })
        | AppError::Config(_)
        | AppError::Scheduling(_)
        | AppError::Internal(_) => code::INTERNAL_ERROR,
    }
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(
        error_code(&err),
        err.to_string(),
        Some(serde_json::json!({ "kind": err.kind() })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(error_code(&AppError::SourceNotFound("agb".into())), 4001);
        assert_eq!(error_code(&AppError::LockRaceDetected("agb:en".into())), 4002);
        assert_eq!(
            error_code(&AppError::Translation(TranslateError::TruncatedOutput)),
            4004
        );
        assert_eq!(
            error_code(&AppError::Translation(TranslateError::MissingCredential)),
            5005
        );
        assert_eq!(
            error_code(&AppError::Domain(DomainError::InvalidRequest("x".into()))),
            4000
        );
    }

    #[test]
    fn test_rpc_error_carries_kind() {
        let err = to_rpc_error(AppError::Translation(TranslateError::TransportFailure(
            "timed out".into(),
        )));
        assert_eq!(err.code(), 5004);
        assert_eq!(err.message(), "Transport failure: timed out");
        let data: serde_json::Value = serde_json::from_str(err.data().unwrap().get()).unwrap();
        assert_eq!(data["kind"], "transport_failure");
    }
}
