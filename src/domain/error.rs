use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("You must be signed in to manage groups.")]
    Unauthenticated,

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }

    /// True for errors the backend raised because the session is missing or expired.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            DomainError::Unauthenticated | DomainError::Backend { status: 401, .. }
        )
    }
}

impl From<rusqlite::Error> for DomainError {
    fn from(err: rusqlite::Error) -> Self {
        DomainError::Database(err.to_string())
    }
}

impl From<mongodb::error::Error> for DomainError {
    fn from(err: mongodb::error::Error) -> Self {
        DomainError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for DomainError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => DomainError::Backend {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => DomainError::Database(err.to_string()),
        }
    }
}
