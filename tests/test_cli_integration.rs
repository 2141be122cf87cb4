//! CLI Integration Tests for codebundle
//!
//! These tests execute the binary and verify correct behavior for:
//! - Output targets (stdout, overwrite, append)
//! - Ordered include/exclude selection
//! - Content rules and config files
//! - Restore
//! - Error handling and exit codes

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cp1251(text: &str) -> Vec<u8> {
    encoding_rs::WINDOWS_1251.encode(text).0.into_owned()
}

/// Helper to create a test directory with sample files
fn create_test_project() -> TempDir {
    let temp_dir = TempDir::new().unwrap();

    fs::write(temp_dir.path().join("a.cpp"), "int main(){}\n").unwrap();
    fs::write(
        temp_dir.path().join("b.cpp"),
        cp1251("// Комментарий\r\nint b;\r\n"),
    )
    .unwrap();
    fs::create_dir(temp_dir.path().join("build")).unwrap();
    fs::write(temp_dir.path().join("build/ignored.cpp"), "int ignored;\n").unwrap();
    fs::write(temp_dir.path().join("README.md"), "# Demo\n").unwrap();

    temp_dir
}

fn codebundle() -> Command {
    Command::cargo_bin("codebundle").unwrap()
}

// ============================================================================
// Output Targets
// ============================================================================

#[test]
fn test_stdout_has_no_header() {
    let temp_dir = create_test_project();

    codebundle()
        .arg(temp_dir.path())
        .args(["-i", "*.cpp", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("---\n## `a.cpp`"))
        .stdout(predicate::str::contains("# Bundle from").not())
        .stderr(predicate::str::contains("Written <stdout> with 3 records"));
}

#[test]
fn test_default_output_file() {
    let temp_dir = create_test_project();
    let work_dir = TempDir::new().unwrap();

    codebundle()
        .current_dir(work_dir.path())
        .arg(temp_dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Written bundle.md with"));

    let written = fs::read_to_string(work_dir.path().join("bundle.md")).unwrap();
    assert!(written.starts_with("# Bundle from `"));
    // Default selection: sources and Markdown, build/ dropped
    assert!(written.contains("## `a.cpp`"));
    assert!(written.contains("## `README.md`"));
    assert!(!written.contains("ignored.cpp"));
}

#[test]
fn test_output_overwrites() {
    let temp_dir = create_test_project();
    let out_dir = TempDir::new().unwrap();
    let out_path = out_dir.path().join("out.md");
    fs::write(&out_path, "stale content\n").unwrap();

    codebundle()
        .arg(temp_dir.path())
        .args(["-i", "*.md", "-o"])
        .arg(&out_path)
        .assert()
        .success();

    let written = fs::read_to_string(&out_path).unwrap();
    assert!(!written.contains("stale content"));
    assert!(written.contains("# Demo"));
}

#[test]
fn test_append_keeps_previous_runs() {
    let temp_dir = create_test_project();
    let out_dir = TempDir::new().unwrap();
    let out_path = out_dir.path().join("out.md");

    for _ in 0..2 {
        codebundle()
            .arg(temp_dir.path())
            .args(["-i", "a.cpp", "-a"])
            .arg(&out_path)
            .assert()
            .success();
    }

    let written = fs::read_to_string(&out_path).unwrap();
    assert_eq!(written.matches("# Bundle from").count(), 2);
    assert_eq!(written.matches("## `a.cpp`").count(), 2);
}

#[test]
fn test_output_flags_conflict() {
    codebundle()
        .args([".", "-o", "x.md", "--stdout"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_include_then_exclude_directory() {
    let temp_dir = create_test_project();

    codebundle()
        .arg(temp_dir.path())
        .args(["-i", "*.cpp,build/", "-x", "build/", "--encoding", "b.cpp:cp1251", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## `a.cpp`"))
        .stdout(predicate::str::contains("## `b.cpp`"))
        .stdout(predicate::str::contains("## `b.cpp` (original bytes)"))
        .stdout(predicate::str::contains("// Комментарий\nint b;\n"))
        .stdout(predicate::str::contains("build").not());
}

#[test]
fn test_selection_order_matters() {
    let temp_dir = create_test_project();

    // Exclude first, include after: the build file comes back
    codebundle()
        .arg(temp_dir.path())
        .args(["-x", "build/", "-i", "*.cpp", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("## `build/ignored.cpp`"));

    codebundle()
        .arg(temp_dir.path())
        .args(["-i", "*.cpp", "-x", "build/", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ignored.cpp").not());
}

#[test]
fn test_zero_match_fails_without_output() {
    let temp_dir = create_test_project();
    let out_dir = TempDir::new().unwrap();
    let out_path = out_dir.path().join("out.md");

    codebundle()
        .arg(temp_dir.path())
        .args(["-i", "*.java", "-o"])
        .arg(&out_path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No paths matched"));

    assert!(!out_path.exists());
}

#[test]
fn test_invalid_pattern_fails() {
    let temp_dir = create_test_project();

    codebundle()
        .arg(temp_dir.path())
        .args(["-i", "*.{cpp", "--stdout"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid pattern"));
}

// ============================================================================
// Content Rules & Config
// ============================================================================

#[test]
fn test_paths_only_and_no_backup() {
    let temp_dir = create_test_project();

    codebundle()
        .arg(temp_dir.path())
        .args(["-i", "*.cpp", "-x", "build/"])
        .args(["--paths-only", "a.cpp", "--encoding", "b.cpp:windows-1251", "--no-backup", "b.cpp"])
        .arg("--stdout")
        .assert()
        .success()
        .stdout(predicate::str::contains("<!-- bundle:paths-only=true -->"))
        .stdout(predicate::str::contains("int main").not())
        .stdout(predicate::str::contains("(original bytes)").not());
}

#[test]
fn test_config_file_in_root() {
    let temp_dir = create_test_project();
    fs::write(
        temp_dir.path().join(".codebundle.json"),
        r#"{"selection": [{"include": ["*.md"]}]}"#,
    )
    .unwrap();

    codebundle()
        .arg(temp_dir.path())
        .arg("--stdout")
        .assert()
        .success()
        .stdout(predicate::str::contains("## `README.md`"))
        .stdout(predicate::str::contains("a.cpp").not());
}

#[test]
fn test_broken_config_fails() {
    let temp_dir = create_test_project();
    let config = temp_dir.path().join("custom.json");
    fs::write(&config, "{ not json").unwrap();

    codebundle()
        .arg(temp_dir.path())
        .arg("-c")
        .arg(&config)
        .arg("--stdout")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("JSON error"));
}

// ============================================================================
// Error Handling
// ============================================================================

#[test]
fn test_missing_root_exits_2() {
    let temp_dir = TempDir::new().unwrap();

    codebundle()
        .arg(temp_dir.path().join("does-not-exist"))
        .arg("--stdout")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Path not found"));
}

#[test]
fn test_file_root_exits_2() {
    let temp_dir = create_test_project();

    codebundle()
        .arg(temp_dir.path().join("a.cpp"))
        .arg("--stdout")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Not a directory"));
}

#[test]
fn test_decode_error_is_a_warning() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("bad.txt"), [b'x', 0xff, 0xfe]).unwrap();

    codebundle()
        .arg(temp_dir.path())
        .args(["-i", "*.txt", "--encoding", "*.txt:utf-8", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<!-- bundle:error=cannot decode as utf-8 -->"))
        .stderr(predicate::str::contains("bad.txt"));
}

// ============================================================================
// Restore
// ============================================================================

#[test]
fn test_restore_round_trip() {
    let temp_dir = create_test_project();
    let out_dir = TempDir::new().unwrap();
    let bundle = out_dir.path().join("bundle.md");
    let restored = out_dir.path().join("restored");

    codebundle()
        .arg(temp_dir.path())
        .args(["-i", "*.cpp", "-x", "build/", "--encoding", "b.cpp:windows-1251", "-o"])
        .arg(&bundle)
        .assert()
        .success();

    codebundle()
        .arg(&restored)
        .arg("--restore")
        .arg(&bundle)
        .assert()
        .success()
        .stderr(predicate::str::contains("Restored 2 files"));

    assert_eq!(
        fs::read(restored.join("b.cpp")).unwrap(),
        fs::read(temp_dir.path().join("b.cpp")).unwrap()
    );
    assert_eq!(
        fs::read(restored.join("a.cpp")).unwrap(),
        fs::read(temp_dir.path().join("a.cpp")).unwrap()
    );
}

#[test]
fn test_restore_rejects_escaping_paths() {
    let out_dir = TempDir::new().unwrap();
    let bundle = out_dir.path().join("evil.md");
    fs::write(
        &bundle,
        "---\n## `../escape.txt`\n<!-- bundle:encoding=utf-8 -->\n```txt\nboom\n```\n",
    )
    .unwrap();

    codebundle()
        .arg(out_dir.path().join("dest"))
        .arg("--restore")
        .arg(&bundle)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unsafe path"));

    assert!(!out_dir.path().join("escape.txt").exists());
}
