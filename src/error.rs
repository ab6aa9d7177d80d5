//! Error types for SlateKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using SlateError
pub type Result<T> = std::result::Result<T, SlateError>;

/// Unified error type for SlateKV operations
#[derive(Debug, Error)]
pub enum SlateError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Archive Structure Errors
    // -------------------------------------------------------------------------
    /// The file is non-empty but its trailer cannot describe a valid index.
    #[error("unreadable trailer: {reason} (file size {file_size})")]
    TrailerUnreadable { file_size: u64, reason: String },

    /// An index entry is malformed or violates a cross-reference invariant.
    #[error("invalid index entry at offset {offset}: {reason}")]
    InvalidIndexEntry { offset: u64, reason: String },

    /// A declared value length exceeds the configured limit or overruns the index.
    #[error("invalid value size {size}: {reason}")]
    InvalidValueSize { size: u64, reason: String },

    /// An entry index at or past the entry count was requested.
    #[error("index entry {index} out of bounds (entry count {count})")]
    OutOfBounds { index: u64, count: u64 },

    // -------------------------------------------------------------------------
    // Writer Errors
    // -------------------------------------------------------------------------
    #[error("duplicate key while writing index: {}", String::from_utf8_lossy(.key))]
    DuplicateKey { key: Vec<u8> },

    #[error("key arrived out of sorted order: {}", String::from_utf8_lossy(.key))]
    KeysNotSorted { key: Vec<u8> },

    #[error("operation on a closed writer")]
    WriterClosed,

    // -------------------------------------------------------------------------
    // Arithmetic Errors
    // -------------------------------------------------------------------------
    /// Offset or size arithmetic left the 64-bit range.
    #[error("64-bit overflow while {context}")]
    ArithmeticOverflow { context: &'static str },
}
