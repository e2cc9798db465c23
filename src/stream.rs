//! Async stream of line batches, driven by a background polling task.

use crate::error::{Error, Result};
use crate::tailer::{LineHandler, LogTailer, TailerConfig};
use crate::watcher::{DirWatcher, is_event_relevant};
use futures::Stream;
use notify::Event;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{self, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::warn;

/// Whether a batch is startup history or newly appended content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    History,
    Live,
}

/// Lines read from one file in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBatch {
    pub path: PathBuf,
    pub lines: Vec<String>,
    pub kind: BatchKind,
}

/// Forwards batches into the stream's channel.
struct ChannelHandler {
    tx: mpsc::UnboundedSender<Result<LineBatch>>,
}

impl ChannelHandler {
    fn send(&self, path: &Path, lines: Vec<String>, kind: BatchKind) {
        // A closed receiver means the stream was dropped; shutdown follows.
        let _ = self.tx.send(Ok(LineBatch {
            path: path.to_path_buf(),
            lines,
            kind,
        }));
    }

    fn fail(&self, error: Error) {
        let _ = self.tx.send(Err(error));
    }
}

impl LineHandler for ChannelHandler {
    fn handle_lines(&mut self, path: &Path, lines: Vec<String>) {
        self.send(path, lines, BatchKind::Live);
    }

    fn handle_tail(&mut self, path: &Path, lines: Vec<String>) {
        self.send(path, lines, BatchKind::History);
    }
}

/// A stream that follows a folder and yields new lines as they are written.
pub struct TailStream {
    receiver: mpsc::UnboundedReceiver<Result<LineBatch>>,
    _shutdown_tx: broadcast::Sender<()>,
    _task_handle: JoinHandle<()>,
}

impl TailStream {
    /// Creates a new TailStream polling every `interval`.
    ///
    /// Configuration errors and bootstrap failures are returned here; errors
    /// on later ticks arrive as the stream's last item.
    pub async fn new(config: TailerConfig, interval: Duration) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let names = config.file_names.clone();
        let wake_on_change = config.wake_on_change;
        let tailer =
            task::spawn_blocking(move || LogTailer::new(config, ChannelHandler { tx })).await??;

        let watcher = if wake_on_change {
            let mut watcher = DirWatcher::new(tailer.folder())?;
            watcher.start_watching()?;
            Some(watcher)
        } else {
            None
        };

        let task_handle = tokio::spawn(tail_task(tailer, interval, watcher, names, shutdown_rx));

        Ok(TailStream {
            receiver: rx,
            _shutdown_tx: shutdown_tx,
            _task_handle: task_handle,
        })
    }

    /// Check if the stream has been closed/dropped
    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}

impl Drop for TailStream {
    fn drop(&mut self) {
        // Send shutdown signal - ignore errors if already dropped or no receivers
        let _ = self._shutdown_tx.send(());
    }
}

/// Run one tick on the blocking pool, handing the tailer back afterwards.
async fn run_tick<H>(mut tailer: LogTailer<H>) -> Result<(LogTailer<H>, Result<()>)>
where
    H: LineHandler + Send + 'static,
{
    let outcome = task::spawn_blocking(move || {
        let result = tailer.run_once();
        (tailer, result)
    })
    .await?;
    Ok(outcome)
}

/// Background task that ticks the tailer until shutdown or failure
async fn tail_task(
    mut tailer: LogTailer<ChannelHandler>,
    interval: Duration,
    mut watcher: Option<DirWatcher>,
    names: HashSet<OsString>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                break;
            }

            _ = ticker.tick() => {}

            Some(event) = next_wake(&mut watcher) => {
                match event {
                    Ok(event) if is_event_relevant(&event, &names) => {}
                    Ok(_) => continue,
                    Err(e) => {
                        tailer.handler().fail(Error::Watcher(e));
                        break;
                    }
                }
            }
        }

        let (returned, result) = match run_tick(tailer).await {
            Ok(outcome) => outcome,
            // The tailer and its sender went down with the tick.
            Err(e) => {
                warn!(error = %e, "tick task failed");
                return;
            }
        };
        tailer = returned;
        if let Err(e) = result {
            warn!(folder = %tailer.folder().display(), error = %e, "tick failed");
            tailer.handler().fail(e);
            break;
        }
    }

    tailer.stop();
}

async fn next_wake(watcher: &mut Option<DirWatcher>) -> Option<notify::Result<Event>> {
    match watcher {
        Some(watcher) => watcher.next_event().await,
        None => std::future::pending().await,
    }
}

impl Stream for TailStream {
    type Item = Result<LineBatch>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}
