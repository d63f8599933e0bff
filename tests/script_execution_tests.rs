//! Tests for real interpreter execution
//!
//! These tests spawn real processes, using a small shell script as a
//! stand-in for PowerShell. It records its arguments, working directory and
//! the content of the `-File` target, then exits with a fixed code.
//!
//! Unix only. All tests take `SPAWN_LOCK` so no test forks while another is
//! still writing its fake interpreter (ETXTBSY).

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use kodlaewlong_stub::{
    run_host, ErrorReporter, Launcher, Outcome, PowerShell, RunScriptArgs, StubConfig,
    WindowMode, MARKER,
};

static SPAWN_LOCK: Mutex<()> = Mutex::new(());

/// Write a fake interpreter into `dir` that exits with `code`.
fn fake_interpreter(dir: &Path, code: i32) -> PathBuf {
    let path = dir.join("fake-pwsh");
    let body = format!(
        r#"#!/bin/sh
log="$(dirname "$0")/calls.log"
echo "args: $*" >> "$log"
echo "cwd: $(pwd -P)" >> "$log"
for last; do :; done
if [ -f "$last" ]; then
    printf 'content: ' >> "$log"
    cat "$last" >> "$log"
    echo >> "$log"
fi
exit {}
"#,
        code
    );
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn read_log(dir: &Path) -> String {
    fs::read_to_string(dir.join("calls.log")).unwrap_or_default()
}

fn image_with(script: &str) -> Vec<u8> {
    format!("\x7fELF stub bytes{}{}", MARKER, script).into_bytes()
}

struct PanicReporter;

impl ErrorReporter for PanicReporter {
    fn show_error(&self, message: &str) {
        panic!("unexpected error dialog: {}", message);
    }
}

// =============================================================================
// run_host
// =============================================================================

#[test]
fn test_run_host_reports_exit_code() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let bin = tempfile::tempdir().unwrap();
    let interpreter = fake_interpreter(bin.path(), 7);

    let args = RunScriptArgs::new("/nonexistent/script.ps1");
    let output = run_host(&interpreter, &args, WindowMode::Hidden).unwrap();

    assert!(!output.success);
    assert_eq!(output.exit_code, Some(7));
    assert!(read_log(bin.path())
        .contains("args: -ExecutionPolicy Bypass -NoProfile -File /nonexistent/script.ps1"));
}

#[test]
fn test_run_host_missing_program() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let args = RunScriptArgs::new("/tmp/x.ps1");
    let result = run_host(Path::new("/no/such/pwsh"), &args, WindowMode::Visible);
    assert!(result.is_err());
}

#[test]
fn test_run_host_uses_working_dir() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let bin = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let interpreter = fake_interpreter(bin.path(), 0);

    let args = RunScriptArgs::new("/tmp/x.ps1").in_dir(work.path());
    let output = run_host(&interpreter, &args, WindowMode::Hidden).unwrap();

    assert!(output.success);
    let cwd = fs::canonicalize(work.path()).unwrap();
    assert!(read_log(bin.path()).contains(&format!("cwd: {}", cwd.display())));
}

// =============================================================================
// Launcher end to end
// =============================================================================

#[test]
fn test_launcher_runs_script_through_interpreter() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let bin = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let host = PowerShell::new(fake_interpreter(bin.path(), 0));
    let config = StubConfig::default().with_temp_dir(scratch.path());
    let script_path = config.script_path();

    let outcome =
        Launcher::new(config, &host, &PanicReporter).run_image(&image_with("Write-Host \"hi\""));

    assert_eq!(outcome, Outcome::Completed);
    let log = read_log(bin.path());
    assert_eq!(log.matches("args: ").count(), 1);
    assert!(log.contains("content: Write-Host \"hi\""));
    assert!(log.contains(&format!("-File {}", script_path.display())));
    assert!(!script_path.exists());
}

#[test]
fn test_launcher_retries_failed_script_visibly() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let bin = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let host = PowerShell::new(fake_interpreter(bin.path(), 1));
    let config = StubConfig::default().with_temp_dir(scratch.path());
    let script_path = config.script_path();

    let outcome = Launcher::new(config, &host, &PanicReporter).run_image(&image_with("exit 1"));

    assert_eq!(outcome, Outcome::RetriedVisible);
    let log = read_log(bin.path());
    assert_eq!(log.matches("args: ").count(), 2);
    assert_eq!(log.matches("content: exit 1").count(), 2, "same script both times");
    assert!(!script_path.exists());
}

#[test]
fn test_launcher_cleans_up_when_interpreter_missing() {
    let _guard = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let scratch = tempfile::tempdir().unwrap();
    let host = PowerShell::new("/no/such/pwsh");
    let config = StubConfig::default().with_temp_dir(scratch.path());
    let script_path = config.script_path();

    let outcome =
        Launcher::new(config, &host, &PanicReporter).run_image(&image_with("Write-Host hi"));

    assert_eq!(outcome, Outcome::RetriedVisible);
    assert!(!script_path.exists());
}
