/// Coarse classification used by handlers to decide what the user is told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    Conflict,
    PermissionDenied,
    Invalid,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid email or secret")]
    InvalidCredentials,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Competition {competition} is full ({max} participants)")]
    CapacityReached { competition: String, max: usize },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{} {}", what, id))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Unauthorized | AppError::InvalidCredentials => ErrorKind::Unauthorized,
            AppError::Conflict(_) | AppError::CapacityReached { .. } => ErrorKind::Conflict,
            AppError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            AppError::Validation(_) => ErrorKind::Invalid,
            AppError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                ErrorKind::Internal
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                ErrorKind::Internal
            }
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                ErrorKind::Internal
            }
            AppError::Hash(e) => {
                tracing::error!("Hash error: {}", e);
                ErrorKind::Internal
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorKind::Internal
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
