use thiserror::Error;

/// Errors surfaced by the service layer. Every variant is recoverable from
/// the user's side: the action can be retried once the cause is fixed.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Insufficient points: {required} required, {available} available")]
    InsufficientPoints { required: i64, available: i64 },

    #[error("Point amounts must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("{collection} record '{id}' not found")]
    NotFound { collection: &'static str, id: String },

    #[error("CV '{0}' has already been processed")]
    AlreadyProcessed(String),

    #[error("Not signed in. Run 'flowjob login' first.")]
    NoSession,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Password hashing error: {0}")]
    Password(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn not_found(collection: crate::repo::Collection, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            collection: collection.as_str(),
            id: id.into(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
