//! Index entry record and codec
//!
//! An [`IndexEntry`] describes one stored value: its key, the absolute
//! offset of the value's first byte, and (in the current layout) the value
//! length. The wire form follows the protobuf binary convention so the
//! record stays readable by standard protobuf tooling:
//!
//! ```text
//! field 1  key     tag 0x0A, wire type 2: varint length + raw bytes
//! field 2  offset  tag 0x10, wire type 0: varint
//! field 3  size    tag 0x18, wire type 0: varint
//! ```
//!
//! Zero or empty fields are omitted. The earliest archive layout had no
//! `size` field; entries decoded from such archives report `size() == None`
//! and the reader derives the length from the neighbouring entry.
//!
//! Unknown field numbers are skipped per protobuf rules and their raw bytes
//! retained on the decoded entry, but they are never re-emitted when
//! marshalling.

use crate::error::{Result, SlateError};

use super::varint;

/// Tag byte for field 1 (`key`), wire type 2 (length-delimited).
const KEY_TAG: u8 = 0x0a;
/// Tag byte for field 2 (`offset`), wire type 0 (varint).
const OFFSET_TAG: u8 = 0x10;
/// Tag byte for field 3 (`size`), wire type 0 (varint).
const SIZE_TAG: u8 = 0x18;

/// One record of the archive index, sorted by key on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexEntry {
    key: Vec<u8>,
    offset: u64,
    size: Option<u64>,
    unknown_fields: Vec<u8>,
}

impl IndexEntry {
    /// Creates an entry with an explicit value size (the current layout).
    pub fn new(key: Vec<u8>, offset: u64, size: u64) -> Self {
        Self {
            key,
            offset,
            size: Some(size),
            unknown_fields: Vec::new(),
        }
    }

    /// Creates an entry without a size field (the earliest layout, where
    /// value lengths are derived from adjacent offsets).
    pub fn without_size(key: Vec<u8>, offset: u64) -> Self {
        Self {
            key,
            offset,
            size: None,
            unknown_fields: Vec::new(),
        }
    }

    /// The entry's key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Absolute offset of the value's first byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Declared value length, or `None` for size-less legacy entries.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Raw bytes of any unknown fields seen while unmarshalling.
    pub fn unknown_fields(&self) -> &[u8] {
        &self.unknown_fields
    }

    /// Exact length of the marshalled form in bytes.
    ///
    /// Unknown fields are excluded: they are preserved for inspection but
    /// never re-emitted.
    pub fn encoded_len(&self) -> usize {
        let mut n = 0;
        if !self.key.is_empty() {
            n += 1 + varint::encoded_len(self.key.len() as u64) + self.key.len();
        }
        if self.offset != 0 {
            n += 1 + varint::encoded_len(self.offset);
        }
        if let Some(size) = self.size {
            if size != 0 {
                n += 1 + varint::encoded_len(size);
            }
        }
        n
    }

    /// Marshals into `buf`, which must be exactly [`encoded_len`] bytes.
    ///
    /// [`encoded_len`]: IndexEntry::encoded_len
    pub fn marshal_into(&self, buf: &mut [u8]) {
        let mut pos = 0;
        if !self.key.is_empty() {
            buf[pos] = KEY_TAG;
            pos = varint::put(buf, pos + 1, self.key.len() as u64);
            buf[pos..pos + self.key.len()].copy_from_slice(&self.key);
            pos += self.key.len();
        }
        if self.offset != 0 {
            buf[pos] = OFFSET_TAG;
            pos = varint::put(buf, pos + 1, self.offset);
        }
        if let Some(size) = self.size {
            if size != 0 {
                buf[pos] = SIZE_TAG;
                pos = varint::put(buf, pos + 1, size);
            }
        }
        debug_assert_eq!(pos, buf.len());
    }

    /// Marshals into a freshly allocated buffer.
    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.encoded_len()];
        self.marshal_into(&mut buf);
        buf
    }

    /// Parses an entry from its marshalled form.
    pub fn unmarshal(buf: &[u8]) -> Result<Self> {
        let mut entry = IndexEntry::default();
        let mut pos = 0;
        while pos < buf.len() {
            let field_start = pos;
            let (tag, n) =
                varint::consume(&buf[pos..]).ok_or_else(|| malformed("truncated field tag"))?;
            pos += n;
            let field = tag >> 3;
            let wire_type = (tag & 0x7) as u8;
            if field == 0 {
                return Err(malformed("illegal field number 0"));
            }
            match (field, wire_type) {
                (1, 2) => {
                    let (len, n) = varint::consume(&buf[pos..])
                        .ok_or_else(|| malformed("truncated key length"))?;
                    pos += n;
                    let len = usize::try_from(len)
                        .map_err(|_| malformed("key length overflows usize"))?;
                    let end = pos
                        .checked_add(len)
                        .filter(|&end| end <= buf.len())
                        .ok_or_else(|| malformed("key runs past the end of the entry"))?;
                    entry.key = buf[pos..end].to_vec();
                    pos = end;
                }
                (2, 0) => {
                    let (value, n) = varint::consume(&buf[pos..])
                        .ok_or_else(|| malformed("truncated offset varint"))?;
                    entry.offset = value;
                    pos += n;
                }
                (3, 0) => {
                    let (value, n) = varint::consume(&buf[pos..])
                        .ok_or_else(|| malformed("truncated size varint"))?;
                    entry.size = Some(value);
                    pos += n;
                }
                (1..=3, _) => {
                    return Err(malformed(format!(
                        "wrong wire type {wire_type} for field {field}"
                    )));
                }
                _ => {
                    let skipped = skip_field(&buf[pos..], wire_type).ok_or_else(|| {
                        malformed(format!("cannot skip field {field} of wire type {wire_type}"))
                    })?;
                    pos += skipped;
                    entry.unknown_fields.extend_from_slice(&buf[field_start..pos]);
                }
            }
        }
        Ok(entry)
    }
}

/// Returns the payload length of an unknown field, or `None` when it cannot
/// be skipped (truncated payload or an unsupported wire type).
fn skip_field(buf: &[u8], wire_type: u8) -> Option<usize> {
    match wire_type {
        0 => varint::consume(buf).map(|(_, n)| n),
        1 => (buf.len() >= 8).then_some(8),
        2 => varint::consume(buf).and_then(|(len, n)| {
            let len = usize::try_from(len).ok()?;
            let end = n.checked_add(len)?;
            (end <= buf.len()).then_some(end)
        }),
        5 => (buf.len() >= 4).then_some(4),
        // group wire types (3, 4) are long deprecated and never valid here
        _ => None,
    }
}

/// An unmarshal failure; the archive layer rewrites the offset with the
/// entry's absolute file position.
fn malformed(reason: impl Into<String>) -> SlateError {
    SlateError::InvalidIndexEntry {
        offset: 0,
        reason: reason.into(),
    }
}
