//! Incremental byte-offset reader for append-only files.
//!
//! Reads only the bytes appended since the last read, without interpreting
//! them.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::error::WatcherError;

/// How much of a file has already been ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadCursor {
    path: PathBuf,
    offset: u64,
}

impl ReadCursor {
    /// Create a cursor at the beginning of the file.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path, offset: 0 }
    }

    /// Create a cursor at a specific offset.
    #[must_use]
    pub fn with_offset(path: PathBuf, offset: u64) -> Self {
        Self { path, offset }
    }

    /// Create a cursor at the current end of the file.
    ///
    /// A missing or unreadable file yields offset 0.
    pub async fn at_end(path: PathBuf) -> Self {
        let offset = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to stat file, starting at 0");
                }
                0
            }
        };
        Self { path, offset }
    }

    /// Get the current byte offset.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Get the path being read.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reset the offset to the beginning of the file.
    pub fn reset(&mut self) {
        self.offset = 0;
    }
}

/// Newly appended bytes and the cursor that follows them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
    /// Cursor positioned after `bytes`.
    pub cursor: ReadCursor,
    /// Raw bytes read.
    pub bytes: Vec<u8>,
}

impl Delta {
    fn unchanged(cursor: &ReadCursor) -> Self {
        Self {
            cursor: cursor.clone(),
            bytes: Vec::new(),
        }
    }

    /// Whether nothing new was read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Bytes after the last newline of a source, held until the line is
/// terminated.
///
/// Writers may flush half a line, or half a UTF-8 sequence; only complete
/// lines are ever decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialLine {
    bytes: Vec<u8>,
}

impl PartialLine {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of held bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Drop the held bytes.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Append `bytes` and take every complete non-blank line.
    ///
    /// Whatever follows the last newline stays held for the next call.
    pub fn complete_lines(&mut self, bytes: &[u8]) -> Vec<String> {
        self.bytes.extend_from_slice(bytes);
        let Some(last_newline) = self.bytes.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let rest = self.bytes.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.bytes, rest);
        non_blank_lines(&String::from_utf8_lossy(&complete))
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

/// Split text into lines, dropping blank ones and trailing `\r`.
#[must_use]
pub fn non_blank_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Read the bytes appended since `cursor`.
///
/// Never fails: a missing file, a file that has not grown, a file that
/// shrank below the cursor, and any I/O error all yield an empty delta
/// with the cursor unchanged. Errors are logged.
pub async fn read_delta(cursor: &ReadCursor) -> Delta {
    match try_read_delta(cursor).await {
        Ok(delta) => delta,
        Err(e) => {
            tracing::warn!(
                path = %cursor.path.display(),
                offset = cursor.offset,
                error = %e,
                "Read failed, no delta this cycle"
            );
            Delta::unchanged(cursor)
        }
    }
}

/// Read the bytes appended since `cursor`, surfacing I/O errors.
///
/// A missing file and a shrunken file are not errors; both return an
/// empty delta. Shrinking is treated as "nothing new" rather than a
/// re-read from 0 so lines already emitted are never emitted twice.
///
/// # Errors
///
/// Returns an error if the file cannot be opened for reasons other than
/// not existing, or if stat, seek or read fail.
pub async fn try_read_delta(cursor: &ReadCursor) -> Result<Delta, WatcherError> {
    let file = match File::open(&cursor.path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Delta::unchanged(cursor));
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(WatcherError::PermissionDenied(cursor.path.clone()));
        }
        Err(e) => return Err(WatcherError::Io(e)),
    };

    let file_len = file.metadata().await?.len();

    if file_len < cursor.offset {
        tracing::warn!(
            path = %cursor.path.display(),
            offset = cursor.offset,
            len = file_len,
            "File shrank below cursor, holding offset"
        );
        return Ok(Delta::unchanged(cursor));
    }

    if file_len == cursor.offset {
        return Ok(Delta::unchanged(cursor));
    }

    let mut file = file;
    file.seek(std::io::SeekFrom::Start(cursor.offset)).await?;

    let wanted = file_len - cursor.offset;
    let mut bytes = Vec::with_capacity(usize::try_from(wanted).unwrap_or(0));
    file.take(wanted).read_to_end(&mut bytes).await?;

    // The file may have shrunk between stat and read; only count what arrived.
    let offset = cursor.offset + bytes.len() as u64;
    tracing::trace!(path = %cursor.path.display(), offset, read = bytes.len(), "Read delta");

    Ok(Delta {
        cursor: ReadCursor::with_offset(cursor.path.clone(), offset),
        bytes,
    })
}
