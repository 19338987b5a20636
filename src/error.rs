use thiserror::Error;

/// Errors produced inside the wellness tips core.
///
/// Only `Validation` and `NoMatch` are meant to reach a user. Everything else
/// is absorbed at the generation boundary (fallback) or the persistence
/// boundary (`PersistOutcome::Failed`).
#[derive(Debug, Error)]
pub enum WellnessError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No tips found for goal '{0}'. Try another one!")]
    NoMatch(String),

    #[error("Generation endpoint returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Failed to create Redis pool: {0}")]
    PoolCreation(String),

    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WellnessError {
    /// True for the conditions a view should show to the user.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NoMatch(_))
    }
}

pub type Result<T> = std::result::Result<T, WellnessError>;
