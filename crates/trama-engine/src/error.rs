use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Page source error: {0}")]
    Page(#[from] trama_core::PageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Could not find project dirs")]
    NoProjectDirs,
}

pub type Result<T> = std::result::Result<T, SessionError>;
