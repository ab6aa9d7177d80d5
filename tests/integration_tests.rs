//! Integration tests for SlateKV
//!
//! End-to-end scenarios spanning writer, reader, search, and scans. The
//! focused tests live in dedicated files:
//! - Codec tests: tests/codec_tests.rs
//! - Reader tests: tests/reader_tests.rs
//! - Writer tests: tests/writer_tests.rs
//! - Property tests: tests/prop_tests.rs

use std::io::Write;

use slatekv::{write, Reader, SearchResult, SlateError, Writer};

// =============================================================================
// Helper Functions
// =============================================================================

fn found(result: SearchResult) -> (Vec<u8>, u64) {
    match result {
        SearchResult::Found { entry, index } => (entry.key().to_vec(), index),
        SearchResult::NotFound { insert_index } => {
            panic!("expected a match, got insertion index {insert_index}")
        }
    }
}

fn not_found(result: SearchResult) -> u64 {
    match result {
        SearchResult::NotFound { insert_index } => insert_index,
        SearchResult::Found { entry, index } => panic!(
            "expected no match, found {:?} at {index}",
            String::from_utf8_lossy(entry.key())
        ),
    }
}

fn test_store() -> Vec<u8> {
    let keys = vec![b"test-1".to_vec(), b"test-2".to_vec(), b"test-3".to_vec()];
    let values: [&[u8]; 3] = [b"val-1", b"val-2", b"val-3"];
    let mut archive = Vec::new();
    let mut index = 0;
    write(&mut archive, &keys, |out, _key| {
        out.write_all(values[index])?;
        index += 1;
        Ok(values[index - 1].len() as u64)
    })
    .unwrap();
    archive
}

// =============================================================================
// Basic Store Round-Trip
// =============================================================================

#[test]
fn test_kv_store() {
    let archive = test_store();
    let reader = Reader::new(archive.as_slice(), archive.len() as u64).unwrap();
    assert_eq!(reader.len(), 3);

    assert!(reader.contains(b"test-1").unwrap());
    assert!(!reader.contains(b"does-not-exist").unwrap());

    for i in 1..=3u8 {
        let key = format!("test-{i}");
        let value = reader.get(key.as_bytes()).unwrap();
        assert_eq!(
            value.as_deref(),
            Some(format!("val-{i}").as_bytes()),
            "value mismatch for {key}"
        );
    }
    assert_eq!(reader.get(b"does-not-exist").unwrap(), None);
}

#[test]
fn test_exact_search_insertion_points() {
    let archive = test_store();
    let reader = Reader::new(archive.as_slice(), archive.len() as u64).unwrap();

    let (key, index) = found(reader.search(b"test-2").unwrap());
    assert_eq!((key.as_slice(), index), (&b"test-2"[..], 1));

    assert_eq!(not_found(reader.search(b"aaa").unwrap()), 0);
    assert_eq!(not_found(reader.search(b"test-11").unwrap()), 1);
    assert_eq!(not_found(reader.search(b"zzz").unwrap()), 3);
}

// =============================================================================
// Prefix Search Boundaries
// =============================================================================

#[test]
fn test_prefix_search_bounds() {
    let archive = test_store();
    let reader = Reader::new(archive.as_slice(), archive.len() as u64).unwrap();

    let (key, index) = found(reader.search_prefix(b"test-", false).unwrap());
    assert_eq!((key.as_slice(), index), (&b"test-1"[..], 0));

    let (key, index) = found(reader.search_prefix(b"test-", true).unwrap());
    assert_eq!((key.as_slice(), index), (&b"test-3"[..], 2));

    // a key equal to the prefix counts as a match
    let (key, _) = found(reader.search_prefix(b"test-2", false).unwrap());
    assert_eq!(key, b"test-2");

    assert_eq!(not_found(reader.search_prefix(b"test-2b", false).unwrap()), 2);
    assert_eq!(not_found(reader.search_prefix(b"test-2b", true).unwrap()), 2);

    // '.' is the next byte after '-'
    assert_eq!(not_found(reader.search_prefix(b"test.", false).unwrap()), 3);
    assert_eq!(not_found(reader.search_prefix(b"test.", true).unwrap()), 3);

    assert_eq!(not_found(reader.search_prefix(b"test-1b", false).unwrap()), 1);

    // the empty prefix selects the ends of the archive
    let (key, index) = found(reader.search_prefix(b"", false).unwrap());
    assert_eq!((key.as_slice(), index), (&b"test-1"[..], 0));
    let (key, index) = found(reader.search_prefix(b"", true).unwrap());
    assert_eq!((key.as_slice(), index), (&b"test-3"[..], 2));
}

// =============================================================================
// Prefix Scans
// =============================================================================

#[test]
fn test_scan_prefix_visits_matches_in_order() {
    let archive = test_store();
    let reader = Reader::new(archive.as_slice(), archive.len() as u64).unwrap();

    let mut seen = Vec::new();
    reader
        .scan_prefix(b"test-", |key, value| {
            seen.push((key.to_vec(), value.to_vec()));
            Ok(())
        })
        .unwrap();
    assert_eq!(
        seen,
        vec![
            (b"test-1".to_vec(), b"val-1".to_vec()),
            (b"test-2".to_vec(), b"val-2".to_vec()),
            (b"test-3".to_vec(), b"val-3".to_vec()),
        ]
    );

    let mut keys = Vec::new();
    reader
        .scan_prefix_keys(b"test-2", |key| {
            keys.push(key.to_vec());
            Ok(())
        })
        .unwrap();
    assert_eq!(keys, vec![b"test-2".to_vec()]);

    // no matches, no callbacks
    reader
        .scan_prefix(b"nothing", |_, _| panic!("callback must not run"))
        .unwrap();
}

#[test]
fn test_scan_prefix_callback_error_propagates() {
    let archive = test_store();
    let reader = Reader::new(archive.as_slice(), archive.len() as u64).unwrap();

    let mut calls = 0;
    let result = reader.scan_prefix_keys(b"test-", |_| {
        calls += 1;
        Err(SlateError::WriterClosed) // any error will do
    });
    assert!(matches!(result, Err(SlateError::WriterClosed)));
    assert_eq!(calls, 1, "scan must abort on the first callback error");
}

// =============================================================================
// Streaming and Size Queries
// =============================================================================

#[test]
fn test_read_to_and_value_size() {
    let archive = test_store();
    let reader = Reader::new(archive.as_slice(), archive.len() as u64).unwrap();

    let mut sink = Vec::new();
    let copied = reader.read_to(b"test-2", &mut sink).unwrap();
    assert_eq!(copied, Some(5));
    assert_eq!(sink, b"val-2");

    let mut sink = Vec::new();
    assert_eq!(reader.read_to(b"missing", &mut sink).unwrap(), None);
    assert!(sink.is_empty());

    assert_eq!(reader.value_size(b"test-1").unwrap(), Some(5));
    assert_eq!(reader.value_size(b"missing").unwrap(), None);
}

#[test]
fn test_read_to_spans_scratch_buffer() {
    // a value much larger than the 2 KiB streaming buffer
    let value = (0..100_000u32).flat_map(|i| i.to_le_bytes()).collect::<Vec<u8>>();
    let keys = vec![b"blob".to_vec()];
    let mut archive = Vec::new();
    write(&mut archive, &keys, |out, _| {
        out.write_all(&value)?;
        Ok(value.len() as u64)
    })
    .unwrap();

    let reader = Reader::new(archive.as_slice(), archive.len() as u64).unwrap();
    let mut sink = Vec::new();
    let copied = reader.read_to(b"blob", &mut sink).unwrap();
    assert_eq!(copied, Some(value.len() as u64));
    assert_eq!(sink, value);
}

// =============================================================================
// Empty Archive
// =============================================================================

#[test]
fn test_empty_archive_end_to_end() {
    let mut archive = Vec::new();
    write(&mut archive, &[], |_, _: &[u8]| Ok(0)).unwrap();

    let reader = Reader::new(archive.as_slice(), archive.len() as u64).unwrap();
    assert_eq!(reader.len(), 0);
    assert!(matches!(
        reader.read_index_entry(0),
        Err(SlateError::OutOfBounds { .. })
    ));
    assert!(!reader.contains(b"x").unwrap());
    reader
        .scan_prefix(b"", |_, _| panic!("no entries to visit"))
        .unwrap();
}

// =============================================================================
// Progressive Writer End-to-End
// =============================================================================

#[test]
fn test_progressive_roundtrip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("progressive.slate");

    {
        let file = std::fs::File::create(&path).unwrap();
        let writer = Writer::new(file);
        // deliberately out of key order
        writer.write_value(b"orange", &mut &b"fruit"[..]).unwrap();
        writer.write_value(b"apple", &mut &b"also fruit"[..]).unwrap();
        writer.write_value(b"zebra", &mut &b"animal"[..]).unwrap();
        writer.close().unwrap();
    }

    let reader = Reader::open(&path).unwrap();
    assert_eq!(reader.len(), 3);
    assert_eq!(reader.get(b"apple").unwrap().unwrap(), b"also fruit");
    assert_eq!(reader.get(b"orange").unwrap().unwrap(), b"fruit");
    assert_eq!(reader.get(b"zebra").unwrap().unwrap(), b"animal");

    let keys: Vec<Vec<u8>> = (0..reader.len())
        .map(|i| reader.read_index_entry(i).unwrap().key().to_vec())
        .collect();
    assert_eq!(keys, vec![b"apple".to_vec(), b"orange".to_vec(), b"zebra".to_vec()]);
}

// =============================================================================
// Larger Archive Through a File
// =============================================================================

#[test]
fn test_many_entries_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("many.slate");

    let keys: Vec<Vec<u8>> = (0..1000)
        .map(|i| format!("key{i:05}").into_bytes())
        .collect();
    {
        let mut file = std::fs::File::create(&path).unwrap();
        write(&mut file, &keys, |out, key| {
            let value = format!("value{}", String::from_utf8_lossy(&key[3..]));
            out.write_all(value.as_bytes())?;
            Ok(value.len() as u64)
        })
        .unwrap();
    }

    let reader = Reader::open(&path).unwrap();
    assert_eq!(reader.len(), 1000);

    // spot checks at various positions
    for i in [0, 250, 500, 750, 999] {
        let key = format!("key{i:05}");
        let expected = format!("value{i:05}");
        assert_eq!(
            reader.get(key.as_bytes()).unwrap().unwrap(),
            expected.as_bytes()
        );
    }

    // a prefix scan covers exactly one decade
    let mut seen = 0;
    reader
        .scan_prefix_keys(b"key0042", |key| {
            assert!(key.starts_with(b"key0042"));
            seen += 1;
            Ok(())
        })
        .unwrap();
    assert_eq!(seen, 10);
}
