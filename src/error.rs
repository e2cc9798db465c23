//! Error types for the directory tailer.

use thiserror::Error;

/// The main error type for tailer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors when listing, opening or reading files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File watching errors from the notify crate.
    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// File has been removed or is no longer accessible.
    #[error("File no longer exists: {path}")]
    FileNotFound { path: String },

    /// The watch folder exists but is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    /// A caller supplied an out-of-range argument.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A background tick panicked or was cancelled.
    #[error("Tailer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The tailer was used after `stop()`.
    #[error("Tailer stopped")]
    Stopped,
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    /// Whether this error means a path vanished, which is expected when
    /// racing with rotation and never fatal.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::FileNotFound { .. } => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// A convenient Result type for tailer operations.
pub type Result<T> = std::result::Result<T, Error>;
