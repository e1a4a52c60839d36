use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("too many failed attempts, please try again later")]
    RateLimited,
    /// An authenticated principal without a mirrored profile record is a
    /// data inconsistency, not a soft failure.
    #[error("no profile record for authenticated user {0}")]
    ProfileMissing(String),
}

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Platform(#[from] sqlx::Error),
}

impl PortalError {
    pub fn not_found(what: impl Into<String>) -> Self {
        PortalError::NotFound(what.into())
    }

    pub fn validation(why: impl Into<String>) -> Self {
        PortalError::Validation(why.into())
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;
