//! KodLaewLong installer stub library
//!
//! The stub binary carries a PowerShell installer script appended after a
//! marker. At startup it extracts the script to the temp directory, runs it
//! with PowerShell, and removes it again. Failures before the script runs are
//! shown in a message box.

pub mod config;
pub mod dialog;
pub mod error;
pub mod host_args;
pub mod launcher;
pub mod logging;
pub mod payload;
pub mod process_guard;
pub mod script_file;
pub mod script_runner;

// Re-export main types for convenience
pub use config::StubConfig;
pub use dialog::{dialog_script, ErrorReporter, PowerShellDialog, DIALOG_TITLE};
pub use error::StubError;
pub use host_args::{HostArgs, RunScriptArgs, ShowDialogArgs, WindowMode};
pub use launcher::{current_exe_path, Launcher, Outcome};
pub use payload::{extract_script, find_marker, marker_bytes, MARKER};
pub use process_guard::{init_signal_handlers, CleanupRegistry, CommandWindowExt};
pub use script_file::{TempScript, SCRIPT_FILE_NAME};
pub use script_runner::{run_host, HostOutput, PowerShell, ScriptHost};
