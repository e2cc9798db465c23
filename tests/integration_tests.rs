use dir_tailer::{BatchKind, Encoding, Error, LogTailer, TailerConfig, tail, watch_dir};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_stream::StreamExt;

/// Records every batch handed to it.
#[derive(Default)]
struct Recorder {
    live: Vec<(PathBuf, Vec<String>)>,
    history: Vec<(PathBuf, Vec<String>)>,
}

impl Recorder {
    fn lines(&self) -> Vec<String> {
        self.live.iter().flat_map(|(_, lines)| lines.clone()).collect()
    }
}

impl dir_tailer::LineHandler for Recorder {
    fn handle_lines(&mut self, path: &Path, lines: Vec<String>) {
        assert!(!lines.is_empty());
        self.live.push((path.to_path_buf(), lines));
    }

    fn handle_tail(&mut self, path: &Path, lines: Vec<String>) {
        assert!(!lines.is_empty());
        self.history.push((path.to_path_buf(), lines));
    }
}

fn temp_folder() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let folder = fs::canonicalize(dir.path()).unwrap();
    (dir, folder)
}

fn append(path: &Path, content: &str) {
    let mut file = OpenOptions::new().append(true).create(true).open(path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
}

#[test]
fn test_first_batch_is_only_new_content() {
    let (_dir, folder) = temp_folder();
    let log = folder.join("app.log");
    append(&log, "history 1\nhistory 2\n");

    let mut tailer = LogTailer::new(TailerConfig::new(&folder), Recorder::default()).unwrap();
    append(&log, "live 1\n");
    tailer.run_once().unwrap();

    assert_eq!(tailer.handler().live, vec![(log, vec!["live 1".to_string()])]);
    assert!(tailer.handler().history.is_empty());
}

#[test]
fn test_tail_matches_last_lines() {
    let (_dir, folder) = temp_folder();
    let log = folder.join("app.log");
    let content: String = (0..250).map(|i| format!("entry {i}\n")).collect();
    append(&log, &content);

    for n in [0i64, 1, 7, 100, 249, 250, 1000] {
        let lines = tail(&log, Encoding::UTF_8, n).unwrap();
        let expected: Vec<String> = (0..250)
            .skip(250usize.saturating_sub(n as usize))
            .map(|i| format!("entry {i}"))
            .collect();
        assert_eq!(lines, expected, "tail -n {n}");
    }
}

#[test]
fn test_tail_negative_count() {
    let (_dir, folder) = temp_folder();
    let log = folder.join("app.log");
    append(&log, "x\n");

    assert!(matches!(
        tail(&log, Encoding::UTF_8, -1),
        Err(Error::InvalidArgument { .. })
    ));
}

#[cfg(unix)]
#[test]
fn test_rotation_neither_duplicates_nor_loses() {
    let (_dir, folder) = temp_folder();
    let log = folder.join("app.log");
    append(&log, "pre-existing\n");

    let mut tailer = LogTailer::new(TailerConfig::new(&folder), Recorder::default()).unwrap();
    append(&log, "before 1\n");
    tailer.run_once().unwrap();
    append(&log, "before 2\n");

    fs::rename(&log, folder.join("app.log.1")).unwrap();
    append(&log, "after 1\n");
    tailer.run_once().unwrap();
    append(&log, "after 2\n");
    tailer.run_once().unwrap();
    tailer.run_once().unwrap();

    assert_eq!(
        tailer.handler().lines(),
        vec!["before 1", "before 2", "after 1", "after 2"]
    );
}

#[test]
fn test_partial_line_is_delivered_once() {
    let (_dir, folder) = temp_folder();
    let log = folder.join("app.log");
    append(&log, "");

    let mut tailer = LogTailer::new(TailerConfig::new(&folder), Recorder::default()).unwrap();
    append(&log, "first half");
    tailer.run_once().unwrap();
    assert!(tailer.handler().live.is_empty());

    append(&log, " second half\n");
    tailer.run_once().unwrap();
    assert_eq!(tailer.handler().live.len(), 1);
    assert_eq!(tailer.handler().lines(), vec!["first half second half"]);
}

#[test]
fn test_line_in_progress_at_start_is_not_split() {
    let (_dir, folder) = temp_folder();
    let log = folder.join("app.log");
    append(&log, "h1\nhalf");

    let config = TailerConfig::new(&folder).tail_lines(5);
    let mut tailer = LogTailer::new(config, Recorder::default()).unwrap();
    append(&log, " done\n");
    tailer.run_once().unwrap();

    assert_eq!(tailer.handler().history, vec![(log, vec!["h1".to_string()])]);
    assert_eq!(tailer.handler().lines(), vec!["half done"]);
}

#[cfg(unix)]
#[test]
fn test_deleted_file_is_drained_then_dropped() {
    let (_dir, folder) = temp_folder();
    let log = folder.join("app.log");
    append(&log, "");

    let mut tailer = LogTailer::new(TailerConfig::new(&folder), Recorder::default()).unwrap();
    append(&log, "written before delete\n");
    fs::remove_file(&log).unwrap();

    tailer.run_once().unwrap();
    assert_eq!(tailer.handler().lines(), vec!["written before delete"]);
    assert!(tailer.is_empty());

    tailer.run_once().unwrap();
    assert_eq!(tailer.handler().lines().len(), 1);
}

#[test]
fn test_stop_twice() {
    let (_dir, folder) = temp_folder();
    append(&folder.join("a.log"), "");
    let mut tailer = LogTailer::new(TailerConfig::new(&folder), Recorder::default()).unwrap();

    tailer.stop();
    assert!(tailer.is_empty());
    tailer.stop();
    assert!(tailer.is_empty());
}

#[test]
fn test_history_precedes_live_lines() {
    let (_dir, folder) = temp_folder();
    let log = folder.join("app.log");
    append(&log, "h1\nh2\nh3\n");

    let config = TailerConfig::new(&folder).tail_lines(2);
    let mut tailer = LogTailer::new(config, Recorder::default()).unwrap();
    append(&log, "l1\n");
    tailer.run_once().unwrap();

    assert_eq!(
        tailer.handler().history,
        vec![(log.clone(), vec!["h2".to_string(), "h3".to_string()])]
    );
    assert_eq!(tailer.handler().lines(), vec!["l1"]);
}

#[tokio::test]
async fn test_watch_dir_stream() {
    let (_dir, folder) = temp_folder();
    let log = folder.join("app.log");
    append(&log, "old\n");

    let config = TailerConfig::new(&folder).tail_lines(1);
    let mut stream = watch_dir(config).await.unwrap();
    append(&log, "new\n");

    let mut batches = Vec::new();
    while batches.len() < 2 {
        match tokio::time::timeout(Duration::from_secs(2), stream.next()).await {
            Ok(Some(batch)) => batches.push(batch.unwrap()),
            _ => break,
        }
    }

    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].kind, BatchKind::History);
    assert_eq!(batches[0].lines, vec!["old"]);
    assert_eq!(batches[1].kind, BatchKind::Live);
    assert_eq!(batches[1].lines, vec!["new"]);
}

#[tokio::test]
async fn test_watch_dir_missing_folder() {
    let (_dir, folder) = temp_folder();
    let result = watch_dir(TailerConfig::new(folder.join("nope"))).await;
    assert!(matches!(result, Err(Error::FileNotFound { .. })));
}
