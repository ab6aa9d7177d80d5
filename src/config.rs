//! Configuration for SlateKV
//!
//! Hardening limits applied when reading untrusted archives.

/// Maximum marshalled size of a single index entry in bytes.
///
/// This is also an upper bound on key length, since the key is stored
/// inside the entry.
pub const MAX_INDEX_ENTRY_SIZE: usize = 2048;

/// Maximum value size the reader will resolve, currently 1 GB.
pub const MAX_VALUE_SIZE: u64 = 1_000_000_000;

/// Limits applied by a [`Reader`](crate::Reader) when decoding an archive.
///
/// An archive is untrusted input: every length decoded from it is checked
/// against these bounds before any allocation or read happens.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Largest acceptable marshalled index entry, in bytes.
    pub max_index_entry_size: usize,

    /// Largest acceptable value length, in bytes.
    pub max_value_size: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_index_entry_size: MAX_INDEX_ENTRY_SIZE,
            max_value_size: MAX_VALUE_SIZE,
        }
    }
}
