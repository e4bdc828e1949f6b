#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("An account with this email already exists")]
    DuplicateEmail,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already a member: {0}")]
    AlreadyMember(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid or expired verification token")]
    VerificationInvalid,

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Corrupt collection: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;
