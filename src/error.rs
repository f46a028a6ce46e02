use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Backend API error: {0}")]
    Api(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unknown book: {0}")]
    UnknownBook(String),

    #[error("{book} has {max} chapters, got {chapter}")]
    ChapterOutOfRange {
        book: String,
        chapter: u32,
        max: u32,
    },

    #[error("A save for this chapter is still in flight")]
    SaveInFlight,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
