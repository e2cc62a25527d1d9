//! End-to-end command-line tests: exit codes, diagnostics format, stdout

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

fn write_source(name: &str, contents: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("kiln_cli_test_{}_{}.kiln", std::process::id(), name));
    let mut file = std::fs::File::create(&path).expect("create source file");
    file.write_all(contents.as_bytes()).expect("write source file");
    path
}

fn kiln() -> Command {
    Command::new(env!("CARGO_BIN_EXE_kiln"))
}

#[test]
fn runs_a_program_and_exits_zero() {
    let path = write_source(
        "ok",
        r#"proc main() { var x : int = 7; var y : float = x + 1; print("%\n", y); }"#,
    );
    let output = kiln().arg(&path).output().expect("spawn kiln");
    let _ = std::fs::remove_file(&path);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "8.000000\n");
}

#[test]
fn resolve_errors_exit_one_with_row_col_prefix() {
    let path = write_source("bad", "proc main() { y = 1; }");
    let output = kiln().arg(&path).output().expect("spawn kiln");
    let _ = std::fs::remove_file(&path);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.lines().any(|line| line.starts_with("1:15: ")),
        "unexpected stderr: {}",
        stderr
    );
}

#[test]
fn missing_main_exits_one() {
    let path = write_source("nomain", "proc helper() { }");
    let output = kiln().arg(&path).output().expect("spawn kiln");
    let _ = std::fs::remove_file(&path);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("main"));
}

#[test]
fn check_mode_skips_execution() {
    let path = write_source(
        "check",
        r#"proc main() { print("side effect\n"); }"#,
    );
    let output = kiln().arg(&path).arg("--check").output().expect("spawn kiln");
    let _ = std::fs::remove_file(&path);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "");
}

#[test]
fn dump_ast_writes_json() {
    let source = write_source("dump", "proc main() { }");
    let mut dump = std::env::temp_dir();
    dump.push(format!("kiln_cli_test_{}_ast.json", std::process::id()));

    let output = kiln()
        .arg(&source)
        .arg("--check")
        .arg("--dump-ast")
        .arg(&dump)
        .output()
        .expect("spawn kiln");
    let json = std::fs::read_to_string(&dump).expect("dump written");
    let _ = std::fs::remove_file(&source);
    let _ = std::fs::remove_file(&dump);

    assert!(output.status.success());
    assert!(json.contains("\"Procedure\""));
}
