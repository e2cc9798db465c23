//! Registry of watched files, keyed by physical identity.

use crate::decode::{Encoding, LineDecoder};
use crate::error::Result;
use crate::identity::FileIdentity;
use crate::tail::last_line_boundary;
use std::collections::HashMap;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Where a freshly opened file's cursor starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StartAt {
    Beginning,
    /// After the last complete line; an unfinished one is read when done.
    End,
    /// Exactly at end of file, for content already drained.
    Eof,
}

/// One tracked file: its exclusively owned handle and read cursor.
#[derive(Debug)]
pub(crate) struct WatchedFile {
    pub(crate) identity: FileIdentity,
    pub(crate) path: PathBuf,
    pub(crate) cursor: u64,
    pub(crate) handle: File,
    pub(crate) decoder: LineDecoder,
}

impl WatchedFile {
    /// Open `path` for watching. Returns `None` if it vanished first or is
    /// no longer a regular file.
    ///
    /// The identity comes from the opened handle, so it always describes the
    /// file actually being read even if the path was swapped meanwhile.
    pub(crate) fn open(path: &Path, encoding: Encoding, start: StartAt) -> Result<Option<Self>> {
        let mut handle = match File::open(path) {
            Ok(handle) => handle,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let metadata = handle.metadata()?;
        if !metadata.is_file() {
            return Ok(None);
        }
        let cursor = match start {
            StartAt::Beginning => 0,
            StartAt::End => last_line_boundary(&mut handle, metadata.len())?,
            StartAt::Eof => metadata.len(),
        };

        Ok(Some(Self {
            identity: FileIdentity::from_metadata(&metadata)?,
            path: path.to_path_buf(),
            cursor,
            handle,
            decoder: LineDecoder::new(encoding),
        }))
    }
}

/// At most one entry per identity; handles never leave the table.
#[derive(Debug, Default)]
pub(crate) struct WatchTable {
    entries: HashMap<FileIdentity, WatchedFile>,
}

impl WatchTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning any entry it displaced.
    pub(crate) fn insert(&mut self, file: WatchedFile) -> Option<WatchedFile> {
        self.entries.insert(file.identity, file)
    }

    pub(crate) fn remove(&mut self, identity: &FileIdentity) -> Option<WatchedFile> {
        self.entries.remove(identity)
    }

    pub(crate) fn contains(&self, identity: &FileIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    pub(crate) fn get_mut(&mut self, identity: &FileIdentity) -> Option<&mut WatchedFile> {
        self.entries.get_mut(identity)
    }

    /// Snapshot of the current keys, so the table can be mutated while
    /// walking them.
    pub(crate) fn identities(&self) -> Vec<FileIdentity> {
        self.entries.keys().copied().collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &WatchedFile> {
        self.entries.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry, closing its handle.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
