//! Wire encoding layer
//!
//! Byte-level codecs shared by the reader and writer: unsigned varints and
//! the protobuf-compatible [`IndexEntry`] record. Everything here operates
//! on in-memory buffers; file positioning lives in the archive layer.

pub mod varint;

mod entry;

pub use entry::IndexEntry;
