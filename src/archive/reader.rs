//! Archive Reader
//!
//! Opens an archive from any positioned-read source and serves key lookups,
//! prefix searches, and scans without loading the file into memory. The
//! archive is treated as untrusted input: every decoded count, offset, and
//! length is bounds-checked before it is used, and all position arithmetic
//! is checked for 64-bit overflow.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::config::Limits;
use crate::error::{Result, SlateError};
use crate::io::{read_full_at, ReadAt};
use crate::wire::{varint, IndexEntry};

use super::{POSITION_SLOT_SIZE, READ_COPY_BUF, TRAILER_SIZE};

/// Outcome of a key or prefix search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResult {
    /// A matching entry and its position in the index.
    Found { entry: IndexEntry, index: u64 },
    /// No match; `insert_index` is where a matching key would be inserted
    /// to keep the index sorted.
    NotFound { insert_index: u64 },
}

impl SearchResult {
    /// Unwraps a match, discarding the insertion index otherwise.
    pub fn found(self) -> Option<(IndexEntry, u64)> {
        match self {
            SearchResult::Found { entry, index } => Some((entry, index)),
            SearchResult::NotFound { .. } => None,
        }
    }
}

/// Reader over an immutable key/value archive.
///
/// Construction performs the trailer-first bootstrap; afterwards the reader
/// is immutable and every operation takes `&self`. Sharing a reader across
/// threads is sound when the underlying source supports concurrent
/// positioned reads (true of the [`ReadAt`] implementations this crate
/// provides).
pub struct Reader<R> {
    source: R,
    limits: Limits,
    /// Number of index entries; 0 means the archive is empty.
    entry_count: u64,
    /// Absolute offset of the position table.
    positions_start: u64,
    /// Absolute offset of the first index entry byte; equivalently, the
    /// byte just past the last value.
    index_start: u64,
}

impl<R: ReadAt> Reader<R> {
    /// Opens an archive of known size with the default [`Limits`].
    pub fn new(source: R, file_size: u64) -> Result<Self> {
        Self::with_limits(source, file_size, Limits::default())
    }

    /// Opens an archive of known size, bootstrapping from the trailer.
    ///
    /// A zero-byte file is a valid empty archive. Any other file shorter
    /// than the 8-byte trailer, or whose entry count could not fit in the
    /// file, is rejected with [`SlateError::TrailerUnreadable`].
    pub fn with_limits(source: R, file_size: u64, limits: Limits) -> Result<Self> {
        if file_size == 0 {
            return Ok(Self {
                source,
                limits,
                entry_count: 0,
                positions_start: 0,
                index_start: 0,
            });
        }
        if file_size < TRAILER_SIZE {
            return Err(SlateError::TrailerUnreadable {
                file_size,
                reason: "file shorter than the 8-byte entry count".into(),
            });
        }

        let trailer_pos = file_size - TRAILER_SIZE;
        let mut slot = [0u8; 8];
        read_full_at(&source, &mut slot, trailer_pos)?;
        let entry_count = u64::from_le_bytes(slot);

        let table_size = entry_count
            .checked_mul(POSITION_SLOT_SIZE)
            .filter(|&size| size <= trailer_pos)
            .ok_or_else(|| SlateError::TrailerUnreadable {
                file_size,
                reason: format!("entry count {entry_count} too large for the file"),
            })?;
        let positions_start = trailer_pos - table_size;

        if entry_count == 0 {
            return Ok(Self {
                source,
                limits,
                entry_count,
                positions_start,
                index_start: positions_start,
            });
        }

        // the first slot locates entry 0's framing varint; the entry's
        // bytes immediately precede it
        read_full_at(&source, &mut slot, positions_start)?;
        let varint_pos = u64::from_le_bytes(slot);
        let (entry_len, _) = framed_entry_len(&source, varint_pos, &limits)?;
        let index_start = varint_pos.checked_sub(entry_len).ok_or_else(|| {
            SlateError::InvalidIndexEntry {
                offset: varint_pos,
                reason: format!("entry length {entry_len} larger than its own position"),
            }
        })?;

        debug!(entries = entry_count, index_start, "opened archive");
        Ok(Self {
            source,
            limits,
            entry_count,
            positions_start,
            index_start,
        })
    }

    /// Opens an archive from a source that can also report its own size.
    pub fn from_seekable(mut source: R) -> Result<Self>
    where
        R: Seek,
    {
        let file_size = source.seek(SeekFrom::End(0))?;
        Self::new(source, file_size)
    }

    /// Returns the number of key/value pairs in the archive.
    pub fn len(&self) -> u64 {
        self.entry_count
    }

    /// Returns `true` if the archive holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// The limits this reader enforces while decoding.
    pub fn limits(&self) -> Limits {
        self.limits
    }

    // -------------------------------------------------------------------------
    // Index Access
    // -------------------------------------------------------------------------

    /// Reads the index entry at position `index`.
    ///
    /// Two positioned reads: the position-table slot, then the framed entry
    /// it points at.
    pub fn read_index_entry(&self, index: u64) -> Result<IndexEntry> {
        if index >= self.entry_count {
            return Err(SlateError::OutOfBounds {
                index,
                count: self.entry_count,
            });
        }

        let slot_pos = index
            .checked_mul(POSITION_SLOT_SIZE)
            .and_then(|offset| self.positions_start.checked_add(offset))
            .ok_or(SlateError::ArithmeticOverflow {
                context: "locating a position-table slot",
            })?;
        let mut slot = [0u8; 8];
        read_full_at(&self.source, &mut slot, slot_pos)?;
        let varint_pos = u64::from_le_bytes(slot);

        let (entry_len, _) = framed_entry_len(&self.source, varint_pos, &self.limits)?;
        let entry_start = varint_pos.checked_sub(entry_len).ok_or_else(|| {
            SlateError::InvalidIndexEntry {
                offset: varint_pos,
                reason: format!("entry length {entry_len} larger than its own position"),
            }
        })?;

        let mut entry_buf = vec![0u8; entry_len as usize];
        read_full_at(&self.source, &mut entry_buf, entry_start)?;
        let entry = IndexEntry::unmarshal(&entry_buf).map_err(|err| match err {
            SlateError::InvalidIndexEntry { reason, .. } => SlateError::InvalidIndexEntry {
                offset: entry_start,
                reason,
            },
            other => other,
        })?;

        // a value cannot begin after its own index entry
        if entry.offset() > entry_start {
            return Err(SlateError::InvalidIndexEntry {
                offset: entry_start,
                reason: format!("value offset {} beyond the entry itself", entry.offset()),
            });
        }
        Ok(entry)
    }

    // -------------------------------------------------------------------------
    // Search
    // -------------------------------------------------------------------------

    /// Binary-searches the index for an exact key.
    ///
    /// Each probe costs two positioned reads; an I/O error aborts the
    /// search.
    pub fn search(&self, key: &[u8]) -> Result<SearchResult> {
        let mut lo = 0u64;
        let mut hi = self.entry_count;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let entry = self.read_index_entry(mid)?;
            match entry.key().cmp(key) {
                std::cmp::Ordering::Equal => {
                    return Ok(SearchResult::Found { entry, index: mid })
                }
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        Ok(SearchResult::NotFound { insert_index: lo })
    }

    /// Finds the first (or, with `last`, the final) entry whose key starts
    /// with `prefix`.
    ///
    /// An empty prefix selects the first or last entry of the archive. Keys
    /// equal to the prefix count as matches.
    pub fn search_prefix(&self, prefix: &[u8], last: bool) -> Result<SearchResult> {
        if self.entry_count == 0 {
            return Ok(SearchResult::NotFound { insert_index: 0 });
        }
        if prefix.is_empty() {
            let index = if last { self.entry_count - 1 } else { 0 };
            let entry = self.read_index_entry(index)?;
            return Ok(SearchResult::Found { entry, index });
        }

        let mut lo = 0u64;
        let mut hi = self.entry_count - 1;
        let mut matched: Option<(IndexEntry, u64)> = None;
        loop {
            let mid = lo + (hi - lo) / 2;
            let entry = self.read_index_entry(mid)?;

            let go_right = if entry.key().starts_with(prefix) {
                matched = Some((entry, mid));
                last
            } else {
                entry.key() < prefix
            };

            if go_right {
                lo = mid + 1;
                if lo > hi {
                    break;
                }
            } else {
                if mid == 0 {
                    break;
                }
                hi = mid - 1;
                if lo > hi {
                    break;
                }
            }
        }

        Ok(match matched {
            Some((entry, index)) => SearchResult::Found { entry, index },
            None => SearchResult::NotFound { insert_index: lo },
        })
    }

    /// Checks whether the archive contains `key`.
    pub fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(matches!(self.search(key)?, SearchResult::Found { .. }))
    }

    // -------------------------------------------------------------------------
    // Value Access
    // -------------------------------------------------------------------------

    /// Resolves an entry to its value's absolute offset and length.
    ///
    /// Entries from the earliest layout carry no size field; their length
    /// is derived from the next entry's offset, or from the index start for
    /// the final entry. Either way the result is validated against the
    /// value-size limit and against the index start, which no value may
    /// overrun.
    pub fn value_position(&self, entry: &IndexEntry, index: u64) -> Result<(u64, u64)> {
        let offset = entry.offset();
        let length = match entry.size() {
            Some(size) => size,
            None => {
                let value_end = if index + 1 < self.entry_count {
                    self.read_index_entry(index + 1)?.offset()
                } else {
                    self.index_start
                };
                value_end
                    .checked_sub(offset)
                    .ok_or_else(|| SlateError::InvalidIndexEntry {
                        offset: value_end,
                        reason: format!("value offsets not monotonic around entry {index}"),
                    })?
            }
        };

        if length > self.limits.max_value_size {
            return Err(SlateError::InvalidValueSize {
                size: length,
                reason: format!("exceeds the limit of {}", self.limits.max_value_size),
            });
        }
        let value_end = offset
            .checked_add(length)
            .ok_or(SlateError::ArithmeticOverflow {
                context: "computing a value's end position",
            })?;
        if value_end > self.index_start {
            return Err(SlateError::InvalidValueSize {
                size: length,
                reason: format!(
                    "value ends at {value_end}, beyond the index start {}",
                    self.index_start
                ),
            });
        }
        Ok((offset, length))
    }

    /// Looks up the value for `key`, or `None` when the key is absent.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.search(key)? {
            SearchResult::Found { entry, index } => Ok(Some(self.value_of(&entry, index)?)),
            SearchResult::NotFound { .. } => Ok(None),
        }
    }

    /// Materializes the value a previously fetched entry points at.
    pub fn value_of(&self, entry: &IndexEntry, index: u64) -> Result<Vec<u8>> {
        let (offset, length) = self.value_position(entry, index)?;
        let length = usize::try_from(length).map_err(|_| SlateError::ArithmeticOverflow {
            context: "sizing a value buffer",
        })?;
        let mut value = vec![0u8; length];
        read_full_at(&self.source, &mut value, offset)?;
        Ok(value)
    }

    /// Streams the value for `key` into `sink` through a bounded scratch
    /// buffer. Returns the number of bytes copied, or `None` when the key
    /// is absent.
    pub fn read_to<W: Write>(&self, key: &[u8], sink: &mut W) -> Result<Option<u64>> {
        let (entry, index) = match self.search(key)? {
            SearchResult::Found { entry, index } => (entry, index),
            SearchResult::NotFound { .. } => return Ok(None),
        };
        let (offset, length) = self.value_position(&entry, index)?;

        let mut scratch = [0u8; READ_COPY_BUF];
        let mut copied = 0u64;
        while copied < length {
            let want = (length - copied).min(scratch.len() as u64) as usize;
            let chunk = &mut scratch[..want];
            read_full_at(&self.source, chunk, offset + copied)?;
            sink.write_all(chunk)?;
            copied += want as u64;
        }
        Ok(Some(copied))
    }

    /// Returns the length of the value for `key` without reading it, or
    /// `None` when the key is absent.
    pub fn value_size(&self, key: &[u8]) -> Result<Option<u64>> {
        match self.search(key)? {
            SearchResult::Found { entry, index } => {
                Ok(Some(self.value_position(&entry, index)?.1))
            }
            SearchResult::NotFound { .. } => Ok(None),
        }
    }

    // -------------------------------------------------------------------------
    // Prefix Scans
    // -------------------------------------------------------------------------

    /// Invokes `cb` for every index entry whose key starts with `prefix`,
    /// in ascending key order. Callback errors abort the scan and
    /// propagate.
    pub fn scan_prefix_entries<F>(&self, prefix: &[u8], mut cb: F) -> Result<()>
    where
        F: FnMut(IndexEntry, u64) -> Result<()>,
    {
        let (first, first_index) = match self.search_prefix(prefix, false)? {
            SearchResult::Found { entry, index } => (entry, index),
            SearchResult::NotFound { .. } => return Ok(()),
        };
        cb(first, first_index)?;

        for index in first_index + 1..self.entry_count {
            let entry = self.read_index_entry(index)?;
            if !entry.key().starts_with(prefix) {
                break;
            }
            cb(entry, index)?;
        }
        Ok(())
    }

    /// Invokes `cb` with every key starting with `prefix`, in order.
    pub fn scan_prefix_keys<F>(&self, prefix: &[u8], mut cb: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<()>,
    {
        self.scan_prefix_entries(prefix, |entry, _| cb(entry.key()))
    }

    /// Invokes `cb` with every key/value pair whose key starts with
    /// `prefix`, materializing each value.
    pub fn scan_prefix<F>(&self, prefix: &[u8], mut cb: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> Result<()>,
    {
        self.scan_prefix_entries(prefix, |entry, index| {
            let value = self.value_of(&entry, index)?;
            cb(entry.key(), &value)
        })
    }
}

impl Reader<File> {
    /// Opens an archive file, deriving its size from the file metadata.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len();
        Self::new(file, file_size)
    }
}

/// Reads the framing varint at `varint_pos` and returns the entry length it
/// encodes along with the varint's own width.
fn framed_entry_len<R: ReadAt + ?Sized>(
    source: &R,
    varint_pos: u64,
    limits: &Limits,
) -> Result<(u64, usize)> {
    let mut buf = [0u8; varint::MAX_LEN];
    read_full_at(source, &mut buf, varint_pos)?;
    let (entry_len, varint_len) =
        varint::consume(&buf).ok_or_else(|| SlateError::InvalidIndexEntry {
            offset: varint_pos,
            reason: "malformed entry length varint".into(),
        })?;
    if entry_len > limits.max_index_entry_size as u64 {
        return Err(SlateError::InvalidIndexEntry {
            offset: varint_pos,
            reason: format!(
                "entry length {entry_len} exceeds the limit of {}",
                limits.max_index_entry_size
            ),
        });
    }
    Ok((entry_len, varint_len))
}
