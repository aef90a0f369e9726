//! # Program Loader Tests

use std::fs;

use minorfi_core::common::ConfigError;
use minorfi_core::sim::{DEFAULT_BASE, load_program};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &[u8]) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap_or_else(|e| panic!("write {name}: {e}"));
    path
}

#[test]
fn test_hex_program_with_base() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "prog.hex",
        b"# two instructions\n@0x2000\n00000013\n0x00000073  # ecall\n\n",
    );

    let image = load_program(&path).unwrap();
    assert_eq!(image.entry(), 0x2000);
    assert_eq!(image.len(), 2);
    assert_eq!(image.read(0x2000, 4), vec![0x13, 0, 0, 0]);
}

#[test]
fn test_hex_program_defaults_base() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "prog.hex", b"00000013\n");
    assert_eq!(load_program(&path).unwrap().entry(), DEFAULT_BASE);
}

#[test]
fn test_binary_program() {
    let dir = TempDir::new().unwrap();
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0x0000_0013_u32.to_le_bytes());
    bytes.extend_from_slice(&0x0000_0073_u32.to_le_bytes());
    let path = write(&dir, "prog.bin", &bytes);

    let image = load_program(&path).unwrap();
    assert_eq!(image.entry(), DEFAULT_BASE);
    assert_eq!(image.len(), 2);
    assert_eq!(image.read(DEFAULT_BASE + 4, 4), vec![0x73, 0, 0, 0]);
}

#[test]
fn test_truncated_binary_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "prog.bin", &[0x13, 0, 0]);
    let err = load_program(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Program { line: 0, .. }), "{err}");
}

#[test]
fn test_bad_line_reports_its_number() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "prog.hex", b"00000013\n\n# c\nzzzz\n");
    let err = load_program(&path).unwrap_err();
    match &err {
        ConfigError::Program { line, text, .. } => {
            assert_eq!(*line, 4);
            assert_eq!(text, "zzzz");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("prog.hex:4:"), "{err}");
}

#[test]
fn test_late_base_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "prog.hex", b"00000013\n@1000\n");
    let err = load_program(&path).unwrap_err();
    assert!(
        matches!(err, ConfigError::Program { line: 2, reason, .. } if reason.contains("base")),
        "{err}"
    );
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = load_program(dir.path().join("absent.hex")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "{err}");
}
