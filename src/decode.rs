//! Text decoding and line splitting over raw file bytes.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Text encoding of watched files, backed by `encoding_rs`.
///
/// Only ASCII-compatible encodings are accepted, so a `\n` byte is always a
/// line boundary and lines can be split before decoding. That holds for the
/// multi-byte legacy encodings too: GBK, Big5 and Shift_JIS trail bytes never
/// fall in the ASCII control range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoding(&'static encoding_rs::Encoding);

impl Encoding {
    pub const UTF_8: Encoding = Encoding(&encoding_rs::UTF_8_INIT);
    pub const GBK: Encoding = Encoding(&encoding_rs::GBK_INIT);
    /// What the `latin1` and `iso-8859-1` labels resolve to.
    pub const WINDOWS_1252: Encoding = Encoding(&encoding_rs::WINDOWS_1252_INIT);

    /// Look up an encoding by any WHATWG label, e.g. `utf-8`, `gbk`, `latin1`.
    pub fn for_label(label: &str) -> Result<Self> {
        let encoding = encoding_rs::Encoding::for_label(label.trim().as_bytes()).ok_or_else(
            || Error::invalid_argument(format!("unsupported encoding {label:?}")),
        )?;
        if !encoding.is_ascii_compatible() {
            return Err(Error::invalid_argument(format!(
                "encoding {} cannot be split on newline bytes",
                encoding.name()
            )));
        }
        Ok(Encoding(encoding))
    }

    /// Decode `bytes`, skipping anything undecodable.
    pub fn decode(&self, bytes: &[u8]) -> String {
        let (text, had_errors) = self.0.decode_without_bom_handling(bytes);
        if had_errors {
            text.chars().filter(|&c| c != char::REPLACEMENT_CHARACTER).collect()
        } else {
            text.into_owned()
        }
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::UTF_8
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Encoding::for_label(s)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Split a byte buffer into decoded lines.
///
/// A trailing `\n` terminates the last line rather than starting an empty one,
/// and a `\r` before each boundary is dropped.
pub(crate) fn decode_lines(bytes: &[u8], encoding: Encoding) -> Vec<String> {
    let body = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    if bytes.is_empty() {
        return Vec::new();
    }
    body.split(|&b| b == b'\n')
        .map(|line| encoding.decode(line.strip_suffix(b"\r").unwrap_or(line)))
        .collect()
}

/// Incremental line decoder that holds back an unterminated fragment until
/// the bytes completing it arrive.
#[derive(Debug, Default)]
pub(crate) struct LineDecoder {
    encoding: Encoding,
    pending: Vec<u8>,
}

impl LineDecoder {
    pub(crate) fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            pending: Vec::new(),
        }
    }

    /// Feed raw bytes, returning every line they complete.
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        let held = self.pending.len();
        self.pending.extend_from_slice(bytes);
        // Held-back bytes are known to contain no newline.
        let Some(offset) = bytes.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };
        let last_newline = held + offset;
        let complete: Vec<u8> = self.pending.drain(..=last_newline).collect();
        decode_lines(&complete, self.encoding)
    }

    /// Flush the held-back fragment as a final line, if there is one.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let fragment = std::mem::take(&mut self.pending);
        decode_lines(&fragment, self.encoding).pop()
    }

    pub(crate) fn reset(&mut self) {
        self.pending.clear();
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
