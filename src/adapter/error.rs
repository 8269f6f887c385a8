use crate::domain::error::DomainError;
use serde::Serialize;

/// Error text shown to the user
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    /// Frame a failed create; validation and sign-in problems are shown as-is
    pub fn create_failed(err: DomainError) -> Self {
        match err {
            DomainError::Validation(_) | DomainError::Unauthenticated => err.into(),
            other => ApiError {
                message: format!("Failed to create group: {}", other),
            },
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError {
            message: err.to_string(),
        }
    }
}

impl From<ApiError> for String {
    fn from(err: ApiError) -> Self {
        err.message
    }
}
