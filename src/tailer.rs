//! The polling engine: reconciles the folder against the watch table and
//! reads every live file on each tick.

use crate::decode::Encoding;
use crate::error::{Error, Result};
use crate::identity::FileIdentity;
use crate::reader::{drain, read_available, reset_if_truncated};
use crate::scanner::DirectoryScanner;
use crate::table::{StartAt, WatchTable, WatchedFile};
use crate::tail::{tail_file, window};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Default upper bound on bytes read per chunk.
pub const DEFAULT_SIZE_HINT: usize = 1024 * 1024;

/// Default delay between ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Receives decoded lines. Never called with an empty batch.
///
/// Any `FnMut(&Path, Vec<String>)` closure is a handler.
pub trait LineHandler {
    /// Lines appended to `path` since the previous batch.
    fn handle_lines(&mut self, path: &Path, lines: Vec<String>);

    /// History delivered once per file when the tailer starts.
    fn handle_tail(&mut self, path: &Path, lines: Vec<String>) {
        self.handle_lines(path, lines);
    }
}

impl<F> LineHandler for F
where
    F: FnMut(&Path, Vec<String>),
{
    fn handle_lines(&mut self, path: &Path, lines: Vec<String>) {
        self(path, lines)
    }
}

/// Options for a [`LogTailer`].
#[derive(Debug, Clone)]
pub struct TailerConfig {
    pub(crate) folder: PathBuf,
    pub(crate) file_names: HashSet<OsString>,
    pub(crate) encoding: Encoding,
    pub(crate) tail_lines: i64,
    pub(crate) size_hint: usize,
    pub(crate) max_chunks_per_tick: Option<usize>,
    pub(crate) wake_on_change: bool,
}

impl TailerConfig {
    /// Watch every regular file directly inside `folder`.
    pub fn new<P: AsRef<Path>>(folder: P) -> Self {
        Self {
            folder: folder.as_ref().to_path_buf(),
            file_names: HashSet::new(),
            encoding: Encoding::default(),
            tail_lines: 0,
            size_hint: DEFAULT_SIZE_HINT,
            max_chunks_per_tick: None,
            wake_on_change: false,
        }
    }

    /// Only watch files with these base names. Empty means all files.
    pub fn file_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.file_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Lines of history to deliver per file at startup.
    pub fn tail_lines(mut self, lines: i64) -> Self {
        self.tail_lines = lines;
        self
    }

    /// Upper bound on the bytes read per chunk; each chunk is one batch.
    pub fn size_hint(mut self, bytes: usize) -> Self {
        self.size_hint = bytes;
        self
    }

    /// Cap the chunks read from one file per tick, leaving the rest of a
    /// large burst for later ticks. `None` reads to end of file.
    pub fn max_chunks_per_tick(mut self, chunks: Option<usize>) -> Self {
        self.max_chunks_per_tick = chunks;
        self
    }

    /// In the async stream, tick early when the folder reports a change.
    pub fn wake_on_change(mut self, enabled: bool) -> Self {
        self.wake_on_change = enabled;
        self
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

/// Cooperative stop signal for [`LogTailer::run`], honoured between ticks.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a tick found when re-checking one watched path.
enum EntryState {
    Unchanged,
    Vanished,
    Rotated(PathBuf),
}

/// Follows every file in one folder and feeds appended lines to a handler.
///
/// All open handles are owned by the tailer and released by [`stop`], or when
/// the tailer is dropped.
///
/// [`stop`]: LogTailer::stop
#[derive(Debug)]
pub struct LogTailer<H: LineHandler> {
    scanner: DirectoryScanner,
    table: WatchTable,
    handler: H,
    encoding: Encoding,
    size_hint: usize,
    max_chunks: Option<usize>,
    shutdown: ShutdownHandle,
    stopped: bool,
}

impl<H: LineHandler> LogTailer<H> {
    /// Validate `config`, start watching every eligible file after its last
    /// complete line, then deliver the configured history through
    /// [`LineHandler::handle_tail`].
    pub fn new(config: TailerConfig, handler: H) -> Result<Self> {
        let folder = match fs::canonicalize(&config.folder) {
            Ok(folder) => folder,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::FileNotFound {
                    path: config.folder.display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        if !folder.is_dir() {
            return Err(Error::NotADirectory {
                path: folder.display().to_string(),
            });
        }
        let tail_lines = window(config.tail_lines)?;
        if config.size_hint == 0 {
            return Err(Error::invalid_argument("size hint must be positive"));
        }

        let mut tailer = Self {
            scanner: DirectoryScanner::new(folder, config.file_names),
            table: WatchTable::new(),
            handler,
            encoding: config.encoding,
            size_hint: config.size_hint,
            max_chunks: config.max_chunks_per_tick,
            shutdown: ShutdownHandle::default(),
            stopped: false,
        };
        tailer.bootstrap(tail_lines)?;
        Ok(tailer)
    }

    fn bootstrap(&mut self, tail_lines: usize) -> Result<()> {
        for (identity, path) in self.scanner.list()? {
            if !self.table.contains(&identity) {
                self.watch(&path, StartAt::End)?;
            }
        }
        if tail_lines == 0 {
            return Ok(());
        }

        let mut order: Vec<(PathBuf, FileIdentity)> = self
            .table
            .iter()
            .map(|file| (file.path.clone(), file.identity))
            .collect();
        order.sort_by(|a, b| a.0.cmp(&b.0));

        for (_, identity) in order {
            let Some(file) = self.table.get_mut(&identity) else {
                continue;
            };
            // History stops at the cursor; later bytes arrive as live lines.
            let lines = tail_file(&mut file.handle, file.cursor, self.encoding, tail_lines)?;
            if !lines.is_empty() {
                debug!(path = %file.path.display(), lines = lines.len(), "delivering history");
                self.handler.handle_tail(&file.path, lines);
            }
        }
        Ok(())
    }

    /// Run one tick: reconcile the folder, then read every live file.
    ///
    /// An I/O failure aborts the rest of the tick; the table stays consistent
    /// and the next tick starts over.
    pub fn run_once(&mut self) -> Result<()> {
        if self.stopped {
            return Err(Error::Stopped);
        }

        self.reconcile()?;

        let mut consumed = 0u64;
        for identity in self.table.identities() {
            if let Some(file) = self.table.get_mut(&identity) {
                consumed += read_available(file, self.size_hint, self.max_chunks, &mut self.handler)?;
            }
        }
        debug!(files = self.table.len(), bytes = consumed, "tick complete");
        Ok(())
    }

    /// Tick every `interval` until a shutdown is requested, then stop.
    /// With `blocking` false, run exactly one tick and return.
    pub fn run(&mut self, interval: Duration, blocking: bool) -> Result<()> {
        loop {
            if self.shutdown.is_requested() {
                self.stop();
                return Ok(());
            }
            self.run_once()?;
            if !blocking {
                return Ok(());
            }
            std::thread::sleep(interval);
        }
    }

    /// Release every handle and empty the table. Idempotent.
    pub fn stop(&mut self) {
        if !self.table.is_empty() {
            info!(files = self.table.len(), "releasing watched files");
        }
        self.table.clear();
        self.stopped = true;
    }

    /// Diff the folder against the table: retire vanished and rotated
    /// entries, then admit files not seen before.
    fn reconcile(&mut self) -> Result<()> {
        let current = self.scanner.list()?;
        let mut retired = HashSet::new();
        let mut rotated = Vec::new();

        for identity in self.table.identities() {
            let Some(file) = self.table.get_mut(&identity) else {
                continue;
            };
            match check_entry(file)? {
                EntryState::Unchanged => {}
                EntryState::Vanished => {
                    self.unwatch(&identity)?;
                    retired.insert(identity);
                }
                EntryState::Rotated(path) => {
                    info!(path = %path.display(), "logfile rotated");
                    self.unwatch(&identity)?;
                    retired.insert(identity);
                    rotated.push(path);
                }
            }
        }

        for path in rotated {
            self.readmit(&path, &retired)?;
        }

        // A drained file reappearing under a new name resumes where the
        // drain stopped.
        for (identity, path) in current {
            if !self.table.contains(&identity) {
                let start = if retired.contains(&identity) {
                    StartAt::Eof
                } else {
                    StartAt::End
                };
                self.watch(&path, start)?;
            }
        }
        Ok(())
    }

    /// Watch whatever now sits at a rotated path. Its content is new in full,
    /// unless it is a file drained earlier in this tick under another name.
    fn readmit(&mut self, path: &Path, retired: &HashSet<FileIdentity>) -> Result<()> {
        let start = match FileIdentity::of_path(path) {
            Ok(identity) if retired.contains(&identity) => StartAt::Eof,
            Ok(_) => StartAt::Beginning,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        self.watch(path, start)
    }

    fn watch(&mut self, path: &Path, start: StartAt) -> Result<()> {
        let Some(file) = WatchedFile::open(path, self.encoding, start)? else {
            debug!(path = %path.display(), "logfile vanished before it could be watched");
            return Ok(());
        };
        if self.table.contains(&file.identity) {
            return Ok(());
        }
        info!(path = %file.path.display(), cursor = file.cursor, "watching logfile");
        self.table.insert(file);
        Ok(())
    }

    /// Remove an entry after draining whatever was written before it went
    /// away. The handle closes when the entry drops, even if the drain fails.
    fn unwatch(&mut self, identity: &FileIdentity) -> Result<()> {
        let Some(mut file) = self.table.remove(identity) else {
            return Ok(());
        };
        info!(path = %file.path.display(), "un-watching logfile");
        drain(&mut file, self.size_hint, &mut self.handler)?;
        Ok(())
    }

    /// A handle that requests shutdown of a blocking [`run`](Self::run).
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// The canonical folder being watched.
    pub fn folder(&self) -> &Path {
        self.scanner.folder()
    }

    /// `(path, cursor)` of every watched file, sorted by path.
    pub fn watched(&self) -> Vec<(PathBuf, u64)> {
        let mut watched: Vec<(PathBuf, u64)> = self
            .table
            .iter()
            .map(|file| (file.path.clone(), file.cursor))
            .collect();
        watched.sort();
        watched
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }
}

impl<H: LineHandler> Drop for LogTailer<H> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Re-stat an entry's path. Resets the cursor of a file truncated in place.
fn check_entry(file: &mut WatchedFile) -> Result<EntryState> {
    let metadata = match fs::metadata(&file.path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(EntryState::Vanished),
        Err(e) => return Err(e.into()),
    };
    if FileIdentity::from_metadata(&metadata)? != file.identity {
        return Ok(EntryState::Rotated(file.path.clone()));
    }
    if reset_if_truncated(file, metadata.len()) {
        info!(path = %file.path.display(), size = metadata.len(), "logfile truncated in place, rereading from start");
    }
    Ok(EntryState::Unchanged)
}
