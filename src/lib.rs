//! A directory tailer that follows every log file in a folder and delivers
//! newly appended lines in batches.
//!
//! Files are told apart by physical identity (device and inode on Unix), so
//! rotation by rename, truncation or delete-and-recreate is followed without
//! losing or repeating lines at the boundary. An optional startup tail
//! delivers the last N lines of each file before live following begins.
//!
//! # Example
//!
//! ```rust,no_run
//! use dir_tailer::{TailerConfig, watch_dir};
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TailerConfig::new("/var/log/app").tail_lines(10);
//!     let mut stream = watch_dir(config).await?;
//!
//!     while let Some(batch) = stream.next().await {
//!         let batch = batch?;
//!         for line in batch.lines {
//!             println!("{}: {}", batch.path.display(), line);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! The synchronous engine can also be driven directly:
//!
//! ```rust,no_run
//! use dir_tailer::{LogTailer, TailerConfig};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! let mut tailer = LogTailer::new(TailerConfig::new("/var/log/app"), |path: &Path, lines: Vec<String>| {
//!     for line in lines {
//!         println!("{} ---> {}", path.display(), line);
//!     }
//! })?;
//! tailer.run(Duration::from_millis(100), true)?;
//! # Ok::<(), dir_tailer::Error>(())
//! ```

// Internal modules - not part of public API
mod decode;
mod error;
mod identity;
mod reader;
mod scanner;
mod stream;
mod table;
mod tail;
mod tailer;
mod watcher;

#[cfg(test)]
mod test_helpers;

// Public API exports
pub use decode::Encoding;
pub use error::{Error, Result};
pub use identity::FileIdentity;
pub use stream::{BatchKind, LineBatch, TailStream};
pub use tail::{BLOCK_SIZE, tail};
pub use tailer::{
    DEFAULT_INTERVAL, DEFAULT_SIZE_HINT, LineHandler, LogTailer, ShutdownHandle, TailerConfig,
};

use tokio_stream::Stream;

/// Creates a stream of line batches for every file in the configured folder,
/// polling every [`DEFAULT_INTERVAL`].
///
/// # Example
///
/// ```rust,no_run
/// use dir_tailer::{TailerConfig, watch_dir};
/// use tokio_stream::StreamExt;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = TailerConfig::new("/var/log").file_names(["syslog"]);
///     let mut stream = watch_dir(config).await?;
///
///     while let Some(batch) = stream.next().await {
///         println!("{:?}", batch?.lines);
///     }
///
///     Ok(())
/// }
/// ```
pub async fn watch_dir(config: TailerConfig) -> Result<impl Stream<Item = Result<LineBatch>>> {
    TailStream::new(config, DEFAULT_INTERVAL).await
}
