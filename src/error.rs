use thiserror::Error;

/// Type-erased error, compatible with what tower services produce.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, CatcherError>;

#[derive(Debug, Error)]
pub enum CatcherError {
    #[error("scenario has no tags to match against")]
    EmptyTags,

    #[error("invalid HTTP status code: {0}")]
    InvalidStatusCode(u16),
}
