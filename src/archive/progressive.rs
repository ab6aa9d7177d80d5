//! Progressive archive writer
//!
//! Accepts key/value pairs one at a time, in any key order. Values are
//! streamed straight to the sink in arrival order; only the in-memory index
//! is sorted, which is sufficient because index entries carry absolute
//! offsets. The index, position table, and trailer are written when the
//! writer is closed.

use std::io::{self, Read, Write as IoWrite};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Result, SlateError};
use crate::wire::IndexEntry;

use super::{write_index, WRITE_COPY_BUF};

/// Progressively writes values to an archive, flushing the index on close.
///
/// Keys must not contain duplicates or [`close`](Writer::close) will fail.
/// All state-mutating operations are serialized behind a mutex
/// (`parking_lot`, which never poisons), so a shared `Writer` may be used
/// from multiple threads.
pub struct Writer<W: IoWrite> {
    inner: Mutex<Inner<W>>,
}

struct Inner<W> {
    out: W,
    scratch: Vec<u8>,
    index: Vec<IndexEntry>,
    pos: u64,
    closed: bool,
}

impl<W: IoWrite> Writer<W> {
    /// Creates a writer over the given sink.
    pub fn new(out: W) -> Self {
        Self {
            inner: Mutex::new(Inner {
                out,
                scratch: Vec::new(),
                index: Vec::new(),
                pos: 0,
                closed: false,
            }),
        }
    }

    /// Writes one value, draining `value` to the sink, and records an index
    /// entry for `key` at the current position. Returns the value length.
    ///
    /// On any I/O error the writer transitions to closed and the error is
    /// returned; the partial output is a consistent prefix but not a valid
    /// archive.
    pub fn write_value<R: Read>(&self, key: &[u8], value: &mut R) -> Result<u64> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(SlateError::WriterClosed);
        }

        let offset = inner.pos;
        let written = match inner.copy_value(value) {
            Ok(written) => written,
            Err(err) => {
                inner.closed = true;
                return Err(err);
            }
        };

        inner.index.push(IndexEntry::new(key.to_vec(), offset, written));
        Ok(written)
    }

    /// Returns the number of bytes written to the sink so far.
    pub fn position(&self) -> u64 {
        self.inner.lock().pos
    }

    /// Sorts the buffered index and writes the archive tail.
    ///
    /// Fails with [`SlateError::DuplicateKey`] if two values were written
    /// under the same key. May be called exactly once; the writer is closed
    /// afterwards whether or not the flush succeeded.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(SlateError::WriterClosed);
        }
        inner.closed = true;

        let entries = std::mem::take(&mut inner.index);
        let entry_count = entries.len();
        let pos = inner.pos;
        let written = write_index(&mut inner.out, entries, pos)?;
        inner.pos = pos.checked_add(written).ok_or(SlateError::ArithmeticOverflow {
            context: "advancing the write position past the index",
        })?;

        debug!(entries = entry_count, bytes = inner.pos, "archive index flushed");
        Ok(())
    }
}

impl<W: IoWrite> Inner<W> {
    /// Drains `value` into the sink through the scratch buffer, advancing
    /// the position by the number of bytes copied.
    fn copy_value<R: Read>(&mut self, value: &mut R) -> Result<u64> {
        if self.scratch.is_empty() {
            self.scratch.resize(WRITE_COPY_BUF, 0);
        }
        let mut written = 0u64;
        loop {
            let n = match value.read(&mut self.scratch) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            self.out.write_all(&self.scratch[..n])?;
            self.pos = self
                .pos
                .checked_add(n as u64)
                .ok_or(SlateError::ArithmeticOverflow {
                    context: "advancing the write position past a value",
                })?;
            written += n as u64;
        }
        Ok(written)
    }
}
