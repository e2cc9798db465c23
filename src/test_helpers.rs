//! Test utilities for creating temporary log folders and collecting batches.

use crate::tailer::LineHandler;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct TempLogDir {
    folder: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TempLogDir {
    /// Create an empty temporary folder
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        // Canonical so paths compare equal to what the tailer reports.
        let folder = fs::canonicalize(temp_dir.path())?;

        Ok(Self {
            folder,
            _temp_dir: temp_dir,
        })
    }

    pub fn path(&self) -> &Path {
        &self.folder
    }

    pub fn folder(&self) -> PathBuf {
        self.folder.clone()
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.folder.join(name)
    }

    /// Create (or replace the content of) a file
    pub fn create(&self, name: &str, content: &str) -> std::io::Result<PathBuf> {
        let path = self.path_of(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Append raw content, without adding a newline
    pub fn append(&self, name: &str, content: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(self.path_of(name))?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Truncate the file in place, keeping its identity
    pub fn truncate(&self, name: &str) -> std::io::Result<()> {
        File::create(self.path_of(name))?;
        Ok(())
    }

    pub fn rename(&self, from: &str, to: &str) -> std::io::Result<()> {
        fs::rename(self.path_of(from), self.path_of(to))
    }

    pub fn remove(&self, name: &str) -> std::io::Result<()> {
        fs::remove_file(self.path_of(name))
    }
}

/// Handler that records every batch it receives.
#[derive(Debug, Default)]
pub struct Collected {
    pub batches: Vec<(PathBuf, Vec<String>)>,
    pub history: Vec<(PathBuf, Vec<String>)>,
}

impl Collected {
    /// All live lines, in delivery order
    pub fn lines(&self) -> Vec<String> {
        self.batches
            .iter()
            .flat_map(|(_, lines)| lines.iter().cloned())
            .collect()
    }
}

impl LineHandler for Collected {
    fn handle_lines(&mut self, path: &Path, lines: Vec<String>) {
        assert!(!lines.is_empty(), "handler called with an empty batch");
        self.batches.push((path.to_path_buf(), lines));
    }

    fn handle_tail(&mut self, path: &Path, lines: Vec<String>) {
        assert!(!lines.is_empty(), "handler called with empty history");
        self.history.push((path.to_path_buf(), lines));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_log_dir_creation() {
        let dir = TempLogDir::new().unwrap();
        assert!(dir.path().is_dir());
        assert!(dir.path().is_absolute());
    }

    #[test]
    fn test_append_content() {
        let dir = TempLogDir::new().unwrap();
        let path = dir.create("app.log", "line 1\n").unwrap();
        dir.append("app.log", "line 2").unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "line 1\nline 2");
    }

    #[test]
    fn test_truncate() {
        let dir = TempLogDir::new().unwrap();
        let path = dir.create("app.log", "initial content").unwrap();
        dir.truncate("app.log").unwrap();

        assert!(fs::read_to_string(path).unwrap().is_empty());
    }

    #[test]
    fn test_collected_flattens_batches() {
        let mut collected = Collected::default();
        collected.handle_lines(Path::new("a"), vec!["1".into(), "2".into()]);
        collected.handle_lines(Path::new("b"), vec!["3".into()]);

        assert_eq!(collected.lines(), vec!["1", "2", "3"]);
        assert!(collected.history.is_empty());
    }
}
