use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("FETCH_ERROR: {0}")]
    Fetch(String),
    #[error("UPDATE_ERROR: {0}")]
    Update(String),
    #[error("CREATE_ERROR: {0}")]
    Create(String),
    #[error("CONVERSION_ERROR: {0}")]
    Conversion(String),
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("VALIDATION_ERROR: {0}")]
    Validation(String),
    #[error("BUSINESS_RULE_ERROR: {0}")]
    BusinessRule(String),
    #[error("STORAGE_ERROR: {0}")]
    Storage(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    /// Transient errors simulate network flakiness and are safe to retry.
    /// NOT_FOUND, VALIDATION_ERROR and BUSINESS_RULE_ERROR must not be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Fetch(_) | Self::Update(_) | Self::Create(_) | Self::Conversion(_)
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn transient_kinds_are_retryable() {
        assert!(AppError::Fetch("x".to_string()).is_transient());
        assert!(AppError::Conversion("x".to_string()).is_transient());
        assert!(!AppError::NotFound("x".to_string()).is_transient());
        assert!(!AppError::Validation("x".to_string()).is_transient());
        assert!(!AppError::BusinessRule("x".to_string()).is_transient());
    }

    #[test]
    fn display_carries_error_code() {
        let err = AppError::BusinessRule("Cannot convert unqualified or lost lead".to_string());
        assert!(err.to_string().starts_with("BUSINESS_RULE_ERROR:"));
    }
}
