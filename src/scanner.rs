//! Directory listing with an optional fixed set of file names.

use crate::error::Result;
use crate::identity::FileIdentity;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Lists the regular files of one folder that are eligible for watching.
#[derive(Debug, Clone)]
pub(crate) struct DirectoryScanner {
    folder: PathBuf,
    names: HashSet<OsString>,
}

impl DirectoryScanner {
    /// `names` empty means every file in the folder is eligible.
    pub(crate) fn new(folder: PathBuf, names: HashSet<OsString>) -> Self {
        Self { folder, names }
    }

    pub(crate) fn folder(&self) -> &Path {
        &self.folder
    }

    /// List the folder's direct entries as `(identity, resolved path)` pairs.
    ///
    /// Non-regular files are skipped, and so is anything that disappears
    /// between the listing and the stat.
    pub(crate) fn list(&self) -> Result<Vec<(FileIdentity, PathBuf)>> {
        let mut found = Vec::new();

        for entry in fs::read_dir(&self.folder)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            let name = entry.file_name();
            if !self.names.is_empty() && !self.names.contains(&name) {
                continue;
            }

            if let Some(candidate) = resolve(&self.folder.join(&name))? {
                found.push(candidate);
            }
        }

        Ok(found)
    }
}

/// Canonicalize and stat one candidate; `None` when it vanished or is not a
/// regular file.
fn resolve(path: &Path) -> Result<Option<(FileIdentity, PathBuf)>> {
    let resolved = match fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let metadata = match fs::metadata(&resolved) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_file() {
        return Ok(None);
    }

    Ok(Some((FileIdentity::from_metadata(&metadata)?, resolved)))
}
