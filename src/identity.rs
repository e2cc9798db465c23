//! Physical file identity, independent of the path naming it.

use std::fs::Metadata;
use std::io;
use std::time::SystemTime;

/// Identifies which physical file a path currently refers to.
///
/// On Unix this is the `(device, inode)` pair: stable across rename, changed
/// when a path is unlinked or truncated and recreated. Elsewhere it falls back
/// to the file's creation timestamp, which cannot tell apart two rotations
/// that land within the timestamp's resolution. Platforms that report no
/// creation time are unsupported there: the modification time changes on
/// every append and would make each write look like a rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileIdentity {
    Inode { dev: u64, ino: u64 },
    Timestamp(SystemTime),
}

impl FileIdentity {
    /// Derive the identity from already-fetched metadata.
    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata) -> io::Result<Self> {
        use std::os::unix::fs::MetadataExt;
        Ok(FileIdentity::Inode {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    /// Derive the identity from already-fetched metadata.
    #[cfg(not(unix))]
    pub fn from_metadata(metadata: &Metadata) -> io::Result<Self> {
        Ok(FileIdentity::Timestamp(metadata.created()?))
    }

    /// Stat `path` (following symlinks) and derive its identity.
    pub fn of_path(path: &std::path::Path) -> io::Result<Self> {
        Self::from_metadata(&std::fs::metadata(path)?)
    }
}
