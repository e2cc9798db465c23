//! Reading the last N lines of a file without loading all of it.

use crate::decode::{Encoding, decode_lines};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

/// Bytes read per backward step.
pub const BLOCK_SIZE: u64 = 1024;

/// Read the last `lines` lines of the file at `path`, like `tail -n`.
///
/// Walks backward from the end in [`BLOCK_SIZE`] steps until enough line
/// boundaries have been seen, so memory stays proportional to the lines
/// returned rather than the file. Returns fewer lines when the file is
/// shorter, and nothing for an empty or missing file.
///
/// # Errors
///
/// `InvalidArgument` when `lines` is negative; `Io` for failures other than
/// the file not existing.
pub fn tail<P: AsRef<Path>>(path: P, encoding: Encoding, lines: i64) -> Result<Vec<String>> {
    let count = window(lines)?;
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut file = match File::open(path.as_ref()) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let end = file.metadata()?.len();

    tail_file(&mut file, end, encoding, count)
}

/// Validate a requested line count.
pub(crate) fn window(lines: i64) -> Result<usize> {
    usize::try_from(lines)
        .map_err(|_| Error::invalid_argument(format!("invalid window value {lines}")))
}

/// Offset just past the last `\n` in `[0, end)`, or 0 if there is none.
///
/// Bytes from there to `end` form a line still being written.
pub(crate) fn last_line_boundary(file: &mut File, end: u64) -> Result<u64> {
    let mut start = end;
    let mut chunk = Vec::with_capacity(BLOCK_SIZE as usize);

    while start > 0 {
        let block = BLOCK_SIZE.min(start);
        start -= block;

        chunk.clear();
        file.seek(SeekFrom::Start(start))?;
        file.by_ref().take(block).read_to_end(&mut chunk)?;
        if let Some(newline) = chunk.iter().rposition(|&b| b == b'\n') {
            return Ok(start + newline as u64 + 1);
        }
    }
    Ok(0)
}

/// Last `count` lines among the bytes `[0, end)` of an open file.
pub(crate) fn tail_file(
    file: &mut File,
    end: u64,
    encoding: Encoding,
    count: usize,
) -> Result<Vec<String>> {
    if count == 0 || end == 0 {
        return Ok(Vec::new());
    }

    let mut buffer: Vec<u8> = Vec::new();
    let mut start = end;
    let mut newlines = 0usize;
    let mut terminated = false;

    loop {
        let block = BLOCK_SIZE.min(start);
        start -= block;

        let mut chunk = Vec::with_capacity(block as usize);
        file.seek(SeekFrom::Start(start))?;
        file.by_ref().take(block).read_to_end(&mut chunk)?;

        if buffer.is_empty() {
            terminated = chunk.ends_with(b"\n");
        }
        newlines += chunk.iter().filter(|&&b| b == b'\n').count();
        chunk.extend_from_slice(&buffer);
        buffer = chunk;

        // The final newline closes the last line; every other one opens a line.
        let openers = newlines - usize::from(terminated);
        if start == 0 || openers >= count {
            break;
        }
    }

    // Unless we reached the start of the file, the leading bytes belong to a
    // line that began in an earlier block.
    let body = if start > 0 {
        match buffer.iter().position(|&b| b == b'\n') {
            Some(first) => &buffer[first + 1..],
            None => &buffer[..],
        }
    } else {
        &buffer[..]
    };

    let mut lines = decode_lines(body, encoding);
    let keep_from = lines.len().saturating_sub(count);
    Ok(lines.split_off(keep_from))
}
