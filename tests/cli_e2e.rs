use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bitfile_bin() -> &'static str {
    env!("CARGO_BIN_EXE_bitfile")
}

fn test_temp_dir(tag: &str) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("bitfile-cli-e2e-{tag}-{}-{ts}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn run_bitfile(args: &[&str]) -> Output {
    Command::new(bitfile_bin())
        .args(args)
        .output()
        .expect("run bitfile")
}

fn stdout_lines(out: &Output) -> Vec<String> {
    String::from_utf8_lossy(&out.stdout).lines().map(str::to_string).collect()
}

#[test]
fn cli_encode_decode_roundtrip() {
    let dir = test_temp_dir("roundtrip");
    let file = dir.join("values.bin");
    let big = "340282366920938463463374607431768211456"; // 2^128
    let values = ["0", "7", "8", "264", "18446744073709551615", big];

    let mut args = vec!["encode", "-o", file.to_str().unwrap()];
    args.extend(values);
    let enc = run_bitfile(&args);
    assert!(enc.status.success(), "encode failed: {}", String::from_utf8_lossy(&enc.stderr));
    assert!(!dir.join("values.bin.tmp").exists(), "tmp file left behind");

    let dec = run_bitfile(&["decode", "-i", file.to_str().unwrap()]);
    assert!(dec.status.success(), "decode failed: {}", String::from_utf8_lossy(&dec.stderr));
    assert_eq!(stdout_lines(&dec), values);
}

#[test]
fn cli_custom_params_and_offset() {
    let dir = test_temp_dir("params");
    let file = dir.join("values.bin");

    let enc = run_bitfile(&[
        "encode", "-o", file.to_str().unwrap(), "--params", "2,2,2", "--offset", "5", "5", "6", "10",
    ]);
    assert!(enc.status.success(), "encode failed: {}", String::from_utf8_lossy(&enc.stderr));

    let dec = run_bitfile(&["decode", "-i", file.to_str().unwrap(), "-p", "2,2,2", "--offset", "5"]);
    assert!(dec.status.success(), "decode failed: {}", String::from_utf8_lossy(&dec.stderr));
    assert_eq!(stdout_lines(&dec), ["5", "6", "10"]);
}

#[test]
fn cli_dump_shows_lsb_first_bits() {
    let dir = test_temp_dir("dump");
    let file = dir.join("raw.bin");
    fs::write(&file, [0x01u8, 0x80, 0xF0]).unwrap();

    let out = run_bitfile(&["dump", "-i", file.to_str().unwrap(), "--width", "2"]);
    assert!(out.status.success(), "dump failed: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        stdout_lines(&out),
        ["00000000: 10000000 00000001", "00000002: 00001111"]
    );
}

#[test]
fn cli_rejects_invalid_params() {
    let dir = test_temp_dir("bad-params");
    let file = dir.join("values.bin");
    let out = run_bitfile(&["encode", "-o", file.to_str().unwrap(), "--params", "1,8,16", "3"]);
    assert!(!out.status.success());
    assert!(!file.exists());
}

#[test]
fn cli_rejects_non_numeric_value() {
    let dir = test_temp_dir("bad-value");
    let file = dir.join("values.bin");
    let out = run_bitfile(&["encode", "-o", file.to_str().unwrap(), "12", "zwölf"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("zwölf"));
    assert!(!file.exists());
}

#[test]
fn cli_decode_truncated_file_fails() {
    let dir = test_temp_dir("truncated");
    let file = dir.join("values.bin");
    let enc = run_bitfile(&["encode", "-o", file.to_str().unwrap(), "1000000", "2000000"]);
    assert!(enc.status.success());

    let bytes = fs::read(&file).unwrap();
    fs::write(&file, &bytes[..bytes.len() - 2]).unwrap();
    let dec = run_bitfile(&["decode", "-i", file.to_str().unwrap()]);
    assert_eq!(dec.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&dec.stderr).contains("Fehler"));
}
