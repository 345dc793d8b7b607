/// Error types for grumble
///
/// Lock contention never shows up here: the lock loop retries it forever.
/// Everything else propagates to the caller of `record` untouched.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrumbleError {
    /// Lock file or log file could not be created, opened or written
    #[error("Storage error: {0}")] Storage(#[from] std::io::Error),

    /// A state value, local or error attribute could not be rendered to text
    #[error("Render error: {0}")] Render(#[from] serde_json::Error),

    /// Writing to the console failed for a reason other than a closed pipe
    #[error("Console error: {0}")] Console(std::io::Error),
}

impl GrumbleError {
    /// Underlying I/O error kind, if this is a storage or console failure
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            GrumbleError::Storage(e) | GrumbleError::Console(e) => Some(e.kind()),
            GrumbleError::Render(_) => None,
        }
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, GrumbleError::Storage(_))
    }
}

pub type GrumbleResult<T> = Result<T, GrumbleError>;
