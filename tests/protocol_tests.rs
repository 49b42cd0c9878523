//! Tests for the wire protocol
//!
//! These tests verify:
//! - Request line parsing (argument counts, unknown commands)
//! - Exact response bytes
//! - The client-side response reader

use std::io::Cursor;

use emberkv::error::EmberError;
use emberkv::protocol::{
    decode_command, encode_command, encode_response, read_response, Command, Response,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn get(key: &str) -> Command {
    Command::Get { key: key.to_string() }
}

fn set(key: &str, value: &str) -> Command {
    Command::Set {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn is_protocol_error(line: &str) -> bool {
    matches!(Command::parse(line), Err(EmberError::Protocol(_)))
}

// =============================================================================
// Parsing Tests
// =============================================================================

#[test]
fn test_parse_set() {
    assert_eq!(Command::parse("SET a 1").unwrap(), set("a", "1"));
    assert_eq!(Command::parse("  SET   a   1  ").unwrap(), set("a", "1"));
}

#[test]
fn test_parse_set_requires_exactly_two_args() {
    assert!(is_protocol_error("SET"));
    assert!(is_protocol_error("SET a"));
    assert!(is_protocol_error("SET a 1 2"));
}

#[test]
fn test_parse_get_uses_first_arg() {
    assert_eq!(Command::parse("GET a").unwrap(), get("a"));
    assert_eq!(Command::parse("GET a ignored").unwrap(), get("a"));
    assert!(is_protocol_error("GET"));
}

#[test]
fn test_parse_compact() {
    assert_eq!(Command::parse("COMPACT").unwrap(), Command::Compact);
    assert_eq!(Command::parse("COMPACT now").unwrap(), Command::Compact);
}

#[test]
fn test_parse_unknown_and_empty() {
    assert!(is_protocol_error("FOO"));
    assert!(is_protocol_error("set a 1"));
    assert!(is_protocol_error(""));
    assert!(is_protocol_error("   "));
}

#[test]
fn test_decode_rejects_invalid_utf8() {
    assert!(matches!(
        decode_command(b"GET \xff"),
        Err(EmberError::Protocol(_))
    ));
    assert_eq!(decode_command(b"GET k").unwrap(), get("k"));
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_encode_responses() {
    assert_eq!(encode_response(&Response::Ok), b"OK\r\n".to_vec());
    assert_eq!(
        encode_response(&Response::Value("1".to_string())),
        b"OK\r\n1\r\n".to_vec()
    );
    assert_eq!(encode_response(&Response::Missing), b"MISSING\r\n".to_vec());
    assert_eq!(encode_response(&Response::Unsupported), b"NOPE\r\n".to_vec());
    assert_eq!(encode_response(&Response::Error), b"ERROR\r\n".to_vec());
}

#[test]
fn test_encode_commands() {
    assert_eq!(encode_command(&set("a", "1")), b"SET a 1\r\n".to_vec());
    assert_eq!(encode_command(&get("a")), b"GET a\r\n".to_vec());
    assert_eq!(encode_command(&Command::Compact), b"COMPACT\r\n".to_vec());
}

// =============================================================================
// Client Reader Tests
// =============================================================================

#[test]
fn test_read_response_get_hit_reads_value_line() {
    let mut stream = Cursor::new(b"OK\r\nhello\r\nMISSING\r\n".to_vec());

    assert_eq!(
        read_response(&mut stream, &get("a")).unwrap(),
        Response::Value("hello".to_string())
    );
    assert_eq!(read_response(&mut stream, &get("b")).unwrap(), Response::Missing);
}

#[test]
fn test_read_response_set_and_compact() {
    let mut stream = Cursor::new(b"OK\r\nNOPE\r\nERROR\r\n".to_vec());

    assert_eq!(read_response(&mut stream, &set("a", "1")).unwrap(), Response::Ok);
    assert_eq!(
        read_response(&mut stream, &Command::Compact).unwrap(),
        Response::Unsupported
    );
    assert_eq!(read_response(&mut stream, &get("x")).unwrap(), Response::Error);
}

#[test]
fn test_read_response_rejects_garbage_and_eof() {
    let mut garbage = Cursor::new(b"WAT\r\n".to_vec());
    assert!(read_response(&mut garbage, &get("a")).is_err());

    let mut empty = Cursor::new(Vec::new());
    assert!(read_response(&mut empty, &get("a")).is_err());

    let mut unterminated = Cursor::new(b"OK".to_vec());
    assert!(read_response(&mut unterminated, &set("a", "1")).is_err());
}
