//! Incremental reading of watched files.

use crate::error::Result;
use crate::table::WatchedFile;
use crate::tailer::LineHandler;
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

/// Read everything appended since `file.cursor` and hand complete lines to
/// `handler`, one batch per chunk of at most `size_hint` bytes.
///
/// Stops at end of file, or after `max_chunks` chunks when given. An
/// unterminated trailing fragment stays buffered in the file's decoder.
/// Returns the number of bytes consumed.
pub(crate) fn read_available<H: LineHandler + ?Sized>(
    file: &mut WatchedFile,
    size_hint: usize,
    max_chunks: Option<usize>,
    handler: &mut H,
) -> Result<u64> {
    file.handle.seek(SeekFrom::Start(file.cursor))?;

    let mut consumed = 0u64;
    let mut chunks = 0usize;
    let mut chunk = Vec::new();

    while max_chunks.is_none_or(|max| chunks < max) {
        chunk.clear();
        let read = (&mut file.handle)
            .take(size_hint as u64)
            .read_to_end(&mut chunk)?;
        if read == 0 {
            break;
        }

        chunks += 1;
        file.cursor += read as u64;
        consumed += read as u64;

        let lines = file.decoder.feed(&chunk);
        if !lines.is_empty() {
            debug!(path = %file.path.display(), lines = lines.len(), cursor = file.cursor, "delivering batch");
            handler.handle_lines(&file.path, lines);
        }
    }

    Ok(consumed)
}

/// Final read before a file is released: consume every remaining byte and
/// flush an unterminated last line, since nothing can complete it anymore.
pub(crate) fn drain<H: LineHandler + ?Sized>(
    file: &mut WatchedFile,
    size_hint: usize,
    handler: &mut H,
) -> Result<u64> {
    let consumed = read_available(file, size_hint, None, handler)?;
    if let Some(last) = file.decoder.finish() {
        handler.handle_lines(&file.path, vec![last]);
    }
    Ok(consumed)
}

/// Reset the cursor when a file shrank below it while keeping its identity
/// (copy-and-truncate rotation). Returns whether a reset happened.
pub(crate) fn reset_if_truncated(file: &mut WatchedFile, current_size: u64) -> bool {
    if !detect_file_truncation(current_size, file.cursor) {
        return false;
    }
    file.cursor = 0;
    file.decoder.reset();
    true
}

/// Detect if the file was truncated by comparing current size with last position
fn detect_file_truncation(current_size: u64, last_position: u64) -> bool {
    current_size < last_position
}
