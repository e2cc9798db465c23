//! Change notifications for the watch folder, used to tick early.

use crate::error::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Watches one folder, non-recursively, and queues its events.
pub(crate) struct DirWatcher {
    _watcher: RecommendedWatcher,
    receiver: mpsc::UnboundedReceiver<notify::Result<Event>>,
    folder: PathBuf,
}

impl DirWatcher {
    /// Creates a new watcher for the specified folder.
    pub(crate) fn new<P: AsRef<Path>>(folder: P) -> Result<Self> {
        let folder = folder.as_ref().to_path_buf();

        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            folder,
        })
    }

    /// Starts delivering events for the folder's direct entries.
    pub(crate) fn start_watching(&mut self) -> Result<()> {
        self._watcher.watch(&self.folder, RecursiveMode::NonRecursive)?;
        Ok(())
    }

    /// Returns the next file system event.
    pub(crate) async fn next_event(&mut self) -> Option<notify::Result<Event>> {
        self.receiver.recv().await
    }

    #[cfg(test)]
    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

/// Whether an event touches a file we would watch. An empty name set
/// accepts every file.
///
/// Access events are ignored: the tick itself opens the folder and would
/// otherwise wake itself forever.
pub(crate) fn is_event_relevant(event: &Event, names: &HashSet<OsString>) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event.paths.iter().any(|path| {
        path.file_name()
            .map(|name| names.is_empty() || names.contains(name))
            .unwrap_or(false)
    })
}
