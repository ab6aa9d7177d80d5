//! # SlateKV
//!
//! A compact, immutable, on-disk key/value archive optimized for random
//! lookup by key and prefix scans:
//! - Write-once batch or progressive serialization
//! - Trailer-first bootstrap: the layout is self-describing from its tail
//! - Lookups via positioned reads only — no in-memory index
//! - Hardened against malformed input (bounded, overflow-checked decoding)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Writer (batch / progressive)             │
//! │        values → sorted index → position table → count        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  one immutable byte stream
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Reader                                │
//! │      trailer bootstrap → binary search → value access        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  positioned reads (ReadAt)
//!               ┌───────▼────────┐
//!               │ File / slice / │
//!               │ cursor source  │
//!               └────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use slatekv::{write, Reader};
//!
//! # fn main() -> slatekv::Result<()> {
//! let keys = vec![b"a".to_vec(), b"b".to_vec()];
//! let mut archive = Vec::new();
//! write(&mut archive, &keys, |out, key| {
//!     use std::io::Write;
//!     out.write_all(key)?;
//!     out.write_all(b"-value")?;
//!     Ok(key.len() as u64 + 6)
//! })?;
//!
//! let reader = Reader::new(archive.as_slice(), archive.len() as u64)?;
//! assert_eq!(reader.get(b"a")?, Some(b"a-value".to_vec()));
//! assert_eq!(reader.get(b"missing")?, None);
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod io;
pub mod wire;
pub mod archive;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, SlateError};
pub use config::Limits;
pub use io::ReadAt;
pub use wire::IndexEntry;
pub use archive::{write, write_index, write_with_iterator, Reader, SearchResult, Writer};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of SlateKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
