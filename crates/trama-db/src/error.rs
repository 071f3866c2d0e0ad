use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid message row {id}: {reason}")]
    InvalidRow { id: String, reason: String },

    #[error("Could not find project dirs")]
    NoProjectDirs,
}

pub type Result<T> = std::result::Result<T, DbError>;
