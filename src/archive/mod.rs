//! Archive Module
//!
//! Immutable on-disk key/value archive, self-describing from its tail.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Values (variable)                                            │
//! │   value_0 | value_1 | ... | value_{N-1}                      │
//! │   (opaque bytes, stored in write order)                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Index (variable, sorted by key)                              │
//! │   entry_i_bytes | varint(len(entry_i_bytes))                 │
//! │   ... repeated for each entry ...                            │
//! │   (entry_i_bytes is the IndexEntry wire encoding)            │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Position Table (8 * N bytes)                                 │
//! │   u64 LE offset of entry_i's framing varint, for each i      │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Trailer (8 bytes)                                            │
//! │   EntryCount: u64 LE                                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A reader bootstraps backwards: the trailing 8 bytes give the entry
//! count, which locates the position table, whose first slot locates the
//! first entry's framing varint, which in turn locates the start of the
//! index. Lookups then need two positioned reads per index probe (one
//! table slot, one framed entry) and never load the file into memory.
//!
//! An empty archive is either zero bytes or the 8-byte zero count; the
//! writer emits the latter, the reader accepts both.

mod progressive;
mod reader;
mod writer;

pub use progressive::Writer;
pub use reader::{Reader, SearchResult};
pub use writer::{write, write_index, write_with_iterator};

// =============================================================================
// Shared Constants (used by reader and writers)
// =============================================================================

/// Trailer size: the u64 entry count terminating every non-empty archive.
pub(crate) const TRAILER_SIZE: u64 = 8;

/// Width of one position-table slot.
pub(crate) const POSITION_SLOT_SIZE: u64 = 8;

/// Scratch buffer size for streaming a value out of the archive.
pub(crate) const READ_COPY_BUF: usize = 2048;

/// Scratch buffer size for draining a value reader into the archive.
pub(crate) const WRITE_COPY_BUF: usize = 32 * 1024;
