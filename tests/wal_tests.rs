//! Tests for the WAL: Record, WalReader, WalWriter, WalRecovery
//!
//! These tests verify:
//! - Record text format and field validation
//! - Reading records in file order with corruption detection
//! - Writer appends are complete records on disk
//! - Recovery of missing, empty, clean and corrupted files

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use emberkv::error::EmberError;
use emberkv::wal::{Record, RecoveryResult, WalReader, WalRecovery, WalWriter};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("logfile.log");
    (temp_dir, wal_path)
}

fn write_raw(path: &PathBuf, contents: &[u8]) {
    let mut file = File::create(path).unwrap();
    file.write_all(contents).unwrap();
    file.sync_all().unwrap();
}

fn set(key: &str, value: &str) -> Record {
    Record::set(key, value).unwrap()
}

// =============================================================================
// Record Tests
// =============================================================================

#[test]
fn test_record_encode() {
    assert_eq!(set("a", "1").encode(), b"SET a 1\r\n".to_vec());
    assert_eq!(set("user:42", "alice").to_string(), "SET user:42 alice\r\n");
}

#[test]
fn test_record_parse() {
    assert_eq!(Record::parse("SET a 1\r\n").unwrap(), set("a", "1"));
    assert_eq!(Record::parse("SET a 1\n").unwrap(), set("a", "1"));
    assert_eq!(Record::parse("SET  a\t1").unwrap(), set("a", "1"));
}

#[test]
fn test_record_parse_rejects_unknown_tag() {
    let err = Record::parse("DEL a\r\n").unwrap_err();
    assert!(matches!(err, EmberError::WalCorruption(ref msg) if msg.contains("DEL")));
}

#[test]
fn test_record_parse_rejects_wrong_field_count() {
    assert!(matches!(Record::parse("SET a\r\n"), Err(EmberError::WalCorruption(_))));
    assert!(matches!(Record::parse("SET a 1 2\r\n"), Err(EmberError::WalCorruption(_))));
    assert!(matches!(Record::parse("\r\n"), Err(EmberError::WalCorruption(_))));
}

#[test]
fn test_record_set_rejects_unencodable_fields() {
    assert!(matches!(Record::set("a b", "1"), Err(EmberError::InvalidRecord(_))));
    assert!(matches!(Record::set("a", "1\r\n"), Err(EmberError::InvalidRecord(_))));
    assert!(matches!(Record::set("", "1"), Err(EmberError::InvalidRecord(_))));
    assert!(matches!(Record::set("a", ""), Err(EmberError::InvalidRecord(_))));
}

// =============================================================================
// Writer Tests
// =============================================================================

#[test]
fn test_writer_appends_records() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path).unwrap();
    writer.append(&set("a", "1")).unwrap();
    writer.append(&set("b", "2")).unwrap();

    assert_eq!(writer.records_written(), 2);
    assert_eq!(fs::read(&wal_path).unwrap(), b"SET a 1\r\nSET b 2\r\n".to_vec());
}

#[test]
fn test_writer_never_rewrites_existing_records() {
    let (_temp, wal_path) = setup_temp_wal();
    write_raw(&wal_path, b"SET a 1\r\n");

    let mut writer = WalWriter::open(&wal_path).unwrap();
    writer.append(&set("a", "2")).unwrap();

    assert_eq!(fs::read(&wal_path).unwrap(), b"SET a 1\r\nSET a 2\r\n".to_vec());
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_reader_yields_records_in_order() {
    let (_temp, wal_path) = setup_temp_wal();
    write_raw(&wal_path, b"SET a 1\r\nSET b 2\r\nSET a 3\r\n");

    let records: Vec<Record> = WalReader::open(&wal_path)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(records, vec![set("a", "1"), set("b", "2"), set("a", "3")]);
}

#[test]
fn test_reader_detects_truncated_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    write_raw(&wal_path, b"SET a 1\r\nSET b");

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert_eq!(reader.next_record().unwrap(), Some(set("a", "1")));

    let err = reader.next_record().unwrap_err();
    assert!(matches!(err, EmberError::WalCorruption(ref msg) if msg.contains("truncated")));
    assert_eq!(reader.offset(), 9);
}

#[test]
fn test_reader_reports_line_of_bad_record() {
    let (_temp, wal_path) = setup_temp_wal();
    write_raw(&wal_path, b"SET a 1\r\nSET b 2\r\nPUT c 3\r\n");

    let results: Vec<_> = WalReader::open(&wal_path).unwrap().collect();

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(matches!(&results[2], Err(EmberError::WalCorruption(msg)) if msg.contains("line 3")));
}

#[test]
fn test_reader_rejects_invalid_utf8() {
    let (_temp, wal_path) = setup_temp_wal();
    write_raw(&wal_path, b"SET a \xff\xfe\r\n");

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(matches!(reader.next_record(), Err(EmberError::WalCorruption(_))));
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_recover_missing_file() {
    let (_temp, wal_path) = setup_temp_wal();

    let result = WalRecovery::replay(&wal_path, |_| panic!("nothing to replay")).unwrap();

    assert_eq!(result, RecoveryResult::default());
    assert!(!wal_path.exists());
}

#[test]
fn test_recover_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.records_recovered, 0);
    assert_eq!(result.bytes_read, 0);
}

#[test]
fn test_recover_counts_records_and_bytes() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer = WalWriter::open(&wal_path).unwrap();
        for i in 0..10 {
            writer.append(&set(&format!("key{}", i), &format!("value{}", i))).unwrap();
        }
    }

    let mut replayed = Vec::new();
    let result = WalRecovery::replay(&wal_path, |record| replayed.push(record)).unwrap();

    assert_eq!(result.records_recovered, 10);
    assert_eq!(result.bytes_read, fs::metadata(&wal_path).unwrap().len());
    assert_eq!(replayed[0], set("key0", "value0"));
    assert_eq!(replayed[9], set("key9", "value9"));
}

#[test]
fn test_recover_fails_on_corruption() {
    let (_temp, wal_path) = setup_temp_wal();
    write_raw(&wal_path, b"SET a 1\r\ngarbage\r\nSET b 2\r\n");

    let err = WalRecovery::verify(&wal_path).unwrap_err();

    assert!(matches!(err, EmberError::WalCorruption(_)));
}
