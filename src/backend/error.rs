use rusqlite::ErrorCode;

pub type BackendResult<T> = Result<T, BackendError>;

/// Errors surfaced by the backend collaborator.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("not authenticated")]
    NotAuthenticated,

    /// Deliberately vague so it does not reveal which half was wrong.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("user already registered: {0}")]
    UserExists(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("permission denied: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0:#}")]
    Storage(anyhow::Error),
}

impl From<anyhow::Error> for BackendError {
    fn from(err: anyhow::Error) -> Self {
        let constraint = err
            .downcast_ref::<rusqlite::Error>()
            .and_then(rusqlite::Error::sqlite_error_code)
            == Some(ErrorCode::ConstraintViolation);
        if constraint {
            Self::Conflict(format!("{err:#}"))
        } else {
            Self::Storage(err)
        }
    }
}
