//! Runs the `reflex` binary end to end.

mod common;

use std::path::Path;
use std::process::Command;

use common::{RODATA, scanner, table_address};

fn reflex() -> Command {
    Command::new(env!("CARGO_BIN_EXE_reflex"))
}

/// Stripped little-endian ELF64 with one read-only segment mapping the
/// whole file at `RODATA - 0x1000`.
fn stripped_elf() -> Vec<u8> {
    let size = 0x2000usize;
    let mut buf = vec![0u8; size];
    buf[..4].copy_from_slice(&[0x7f, b'E', b'L', b'F']);
    buf[4] = 2; // ELFCLASS64
    buf[5] = 1; // ELFDATA2LSB
    buf[6] = 1;
    buf[16..18].copy_from_slice(&2u16.to_le_bytes());
    buf[18..20].copy_from_slice(&62u16.to_le_bytes());
    buf[24..32].copy_from_slice(&(RODATA - 0x1000).to_le_bytes());
    buf[32..40].copy_from_slice(&64u64.to_le_bytes());
    buf[52..54].copy_from_slice(&64u16.to_le_bytes());
    buf[54..56].copy_from_slice(&56u16.to_le_bytes());
    buf[56..58].copy_from_slice(&1u16.to_le_bytes());
    buf[58..60].copy_from_slice(&64u16.to_le_bytes());

    let ph = 64;
    buf[ph..ph + 4].copy_from_slice(&1u32.to_le_bytes()); // PT_LOAD
    buf[ph + 4..ph + 8].copy_from_slice(&4u32.to_le_bytes()); // PF_R
    buf[ph + 16..ph + 24].copy_from_slice(&(RODATA - 0x1000).to_le_bytes());
    buf[ph + 32..ph + 40].copy_from_slice(&(size as u64).to_le_bytes());
    buf[ph + 40..ph + 48].copy_from_slice(&(size as u64).to_le_bytes());
    buf
}

/// Four-state scanner tables, one byte per element, laid out back to back.
/// Returns the file and the `OFFSET:SIZE` argument of each table.
fn scanner_tables() -> (Vec<u8>, Vec<(&'static str, String)>) {
    let mut ec = [3u8; 256];
    ec[0] = 0;
    ec[usize::from(b'a')] = 1;
    ec[usize::from(b'b')] = 2;
    let tables: [(&str, Vec<u8>); 7] = [
        ("--accept", vec![0, 0, 2, 3]),
        ("--base", vec![0, 0, 4, 8, 0, 12]),
        ("--chk", vec![1, 1, 1, 1, 2, 2, 2, 2, 0, 0, 0, 0, 0, 5, 5]),
        ("--def", vec![0, 0, 0, 5, 0, 0]),
        ("--ec", ec.to_vec()),
        ("--meta", vec![2, 1, 1, 2]),
        ("--nxt", vec![0, 2, 3, 0, 0, 2, 3, 0, 0, 0, 0, 0, 0, 2, 0]),
    ];

    let mut data = vec![0u8; 0x40];
    let mut args = Vec::new();
    for (flag, table) in tables {
        args.push((flag, format!("{:#x}:1", data.len())));
        data.extend_from_slice(&table);
    }
    (data, args)
}

fn assert_exists(dir: &Path, name: &str) {
    assert!(dir.join(name).is_file(), "missing {name}");
}

#[test]
fn test_analyze_command() {
    let dir = tempfile::tempdir().unwrap();
    let elf = dir.path().join("scanner");
    let ir = dir.path().join("yylex.json");
    let out = dir.path().join("out");
    std::fs::write(&elf, stripped_elf()).unwrap();
    std::fs::write(&ir, scanner(7).to_json().unwrap()).unwrap();

    let output = reflex()
        .arg("--silent")
        .arg("analyze")
        .arg("--elf")
        .arg(&elf)
        .arg("--ir")
        .arg(&ir)
        .arg("-o")
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    let expected: Vec<String> = (0..7).map(|i| format!("{:#x}", table_address(i))).collect();
    assert_eq!(stdout.lines().collect::<Vec<_>>(), expected);
    for name in ["out.dot", "simple.dot", "out.graphml"] {
        assert_exists(&out, name);
    }
}

#[test]
fn test_analyze_fails_on_too_few_tables() {
    let dir = tempfile::tempdir().unwrap();
    let elf = dir.path().join("scanner");
    let ir = dir.path().join("yylex.json");
    std::fs::write(&elf, stripped_elf()).unwrap();
    std::fs::write(&ir, scanner(6).to_json().unwrap()).unwrap();

    let status = reflex()
        .args(["--silent", "analyze"])
        .arg("--elf")
        .arg(&elf)
        .arg("--ir")
        .arg(&ir)
        .arg("-o")
        .arg(dir.path().join("out"))
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_dfa_command() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("scanner");
    let out = dir.path().join("dfa");
    let (data, tables) = scanner_tables();
    std::fs::write(&bin, data).unwrap();

    let mut cmd = reflex();
    cmd.args(["--silent", "dfa"]).arg(&bin).arg("-o").arg(&out);
    for (flag, location) in &tables {
        cmd.arg(flag).arg(location);
    }
    let status = cmd.args(["--max-state", "4", "--split"]).status().unwrap();
    assert!(status.success());

    for name in ["out.dot", "out.dfa", "exits.txt", "reachable_1.dot", "reachable_1.dfa"] {
        assert_exists(&out, name);
    }
    // State 1 is the only source of each rule's sub-automaton.
    for name in ["accept_2.dot", "accept_2_1.dot", "accept_2_1.dfa", "accept_3_1.dfa"] {
        assert_exists(&out, name);
    }
    assert!(!out.join("accept_2.dfa").exists());

    // State 3 (rule 3) is non-accepting here and state 0 cannot reach rule 2.
    let rule = std::fs::read_to_string(out.join("accept_2_1.dfa")).unwrap();
    assert_eq!(
        rule.lines().take(5).collect::<Vec<_>>(),
        vec!["1", "3", "1 0", "2 1", "3 0"]
    );
    let text = std::fs::read_to_string(out.join("out.dfa")).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("1"));
    assert_eq!(lines.next(), Some("4"));
    assert_eq!(
        lines.by_ref().take(4).collect::<Vec<_>>(),
        vec!["0 0", "1 0", "2 1", "3 1"]
    );
    assert!(text.contains("\n1 2 97\n"));

    let dot = std::fs::read_to_string(out.join("out.dot")).unwrap();
    assert!(dot.contains("shape=doublecircle"));
}

#[test]
fn test_dfa_rejects_bad_table_size() {
    let status = reflex()
        .args(["dfa", "scanner", "--accept", "0:3", "--base", "0:1", "--chk", "0:1"])
        .args(["--def", "0:1", "--ec", "0:1", "--meta", "0:1", "--nxt", "0:1"])
        .args(["--max-state", "4"])
        .status()
        .unwrap();
    assert!(!status.success());
}
