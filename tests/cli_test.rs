// CLI entry point tests

use std::process::Command;

fn cargo_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_segment_refiner"))
}

const SEGMENTS: &str = r#"[
  {"page_number": 1, "left": 50, "top": 10, "width": 500, "height": 20,
   "page_width": 600, "page_height": 800, "text": "Hello world", "type": "Text"},
  {"page_number": 1, "left": 52, "top": 34, "width": 480, "height": 20,
   "page_width": 600, "page_height": 800, "text": "continues here.", "type": "Text"}
]"#;

// ============================================================
// 1. No arguments shows usage and exits with failure
// ============================================================

#[test]
fn test_main_no_args_shows_usage() {
    let output = cargo_bin().output().expect("failed to execute binary");

    assert!(
        !output.status.success(),
        "should exit with failure when no args given"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Usage"),
        "stderr should contain 'Usage', got: {stderr}"
    );
}

// ============================================================
// 2. --help flag shows usage and exits with success
// ============================================================

#[test]
fn test_main_help_flag() {
    let output = cargo_bin()
        .arg("--help")
        .output()
        .expect("failed to execute binary");

    assert!(
        output.status.success(),
        "should exit with success for --help"
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Usage"),
        "stdout should contain 'Usage', got: {stdout}"
    );
    assert!(stdout.contains("--quiet"));
}

// ============================================================
// 3. --version flag shows version and exits with success
// ============================================================

#[test]
fn test_main_version_flag() {
    let output = cargo_bin()
        .arg("--version")
        .output()
        .expect("failed to execute binary");

    assert!(
        output.status.success(),
        "should exit with success for --version"
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = env!("CARGO_PKG_VERSION");
    assert!(
        stdout.contains(version),
        "stdout should contain version '{version}', got: {stdout}"
    );
}

// ============================================================
// 4. Nonexistent job file produces error
// ============================================================

#[test]
fn test_main_nonexistent_job_file() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let missing = dir.path().join("nonexistent_jobs.yaml");

    let output = cargo_bin()
        .arg(missing.as_os_str())
        .output()
        .expect("failed to execute binary");

    assert!(
        !output.status.success(),
        "should exit with failure for nonexistent file"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("ERROR") || stderr.contains("error") || stderr.contains("Error"),
        "stderr should contain error message, got: {stderr}"
    );
}

// ============================================================
// 5. Full run with relative paths
// ============================================================

#[test]
fn test_main_runs_job_file_with_relative_paths() {
    let dir = tempfile::tempdir().expect("create temp dir");
    std::fs::write(dir.path().join("segments.json"), SEGMENTS).expect("write segments");
    std::fs::write(dir.path().join("settings.yaml"), "parallel_workers: 1\n")
        .expect("write settings");
    let job_path = dir.path().join("jobs.yaml");
    std::fs::write(
        &job_path,
        "jobs:\n  - input: segments.json\n    output: refined.json\n",
    )
    .expect("write jobs");

    let output = cargo_bin()
        .arg(&job_path)
        .output()
        .expect("failed to execute binary");
    assert!(
        output.status.success(),
        "should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let refined = std::fs::read_to_string(dir.path().join("refined.json")).expect("read output");
    assert!(refined.contains("Hello world\\ncontinues here."));
}

#[test]
fn test_main_failing_job_sets_exit_code() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let job_path = dir.path().join("jobs.yaml");
    std::fs::write(
        &job_path,
        "jobs:\n  - input: missing.json\n    output: refined.json\n",
    )
    .expect("write jobs");

    let output = cargo_bin()
        .arg("--quiet")
        .arg(&job_path)
        .output()
        .expect("failed to execute binary");
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("job failed"), "got: {stderr}");
}
