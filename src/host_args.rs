//! Type-safe interpreter argument contracts.
//!
//! Every PowerShell invocation the stub makes is described by a struct
//! implementing `HostArgs` instead of an ad hoc string vector. The switch
//! names live in exactly one place, and tests can assert on the argument
//! list without spawning anything.
//!
//! # Invocations
//!
//! | Struct           | Purpose                  | Switches                          |
//! |------------------|--------------------------|-----------------------------------|
//! | `RunScriptArgs`  | run the installer script | `-ExecutionPolicy Bypass`         |
//! |                  |                          | `-NoProfile -File <path>`         |
//! | `ShowDialogArgs` | show the error dialog    | `-NoProfile -Command <script>`    |

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use strum::Display;

/// How the interpreter window is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum WindowMode {
    /// No console window (detached process group on Unix).
    Hidden,
    /// Default console behavior; used for the diagnostic retry.
    Visible,
}

/// Trait for typed interpreter arguments.
///
/// # Contract
///
/// - `to_cli_args()`: arguments exactly as PowerShell expects them, in order
/// - `working_dir()`: directory the interpreter starts in, if it matters
/// - `description()`: short label for logs
pub trait HostArgs {
    /// Convert struct fields to interpreter arguments.
    fn to_cli_args(&self) -> Vec<OsString>;

    /// Working directory for the interpreter process.
    fn working_dir(&self) -> Option<&Path> {
        None
    }

    /// Short label used in log lines.
    fn description(&self) -> &'static str;
}

/// Run the extracted installer script.
///
/// # Field to Switch Mapping
///
/// | Rust Field | Switch | Notes |
/// |------------|--------|-------|
/// | (fixed)    | `-ExecutionPolicy Bypass` | applies to this process only |
/// | (fixed)    | `-NoProfile` | skip the user's profile scripts |
/// | `script`   | `-File` | must be last; later arguments go to the script |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunScriptArgs {
    /// Path of the temp script.
    pub script: PathBuf,
    /// Directory the script runs in.
    pub working_dir: Option<PathBuf>,
}

impl RunScriptArgs {
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            working_dir: None,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl HostArgs for RunScriptArgs {
    fn to_cli_args(&self) -> Vec<OsString> {
        vec![
            "-ExecutionPolicy".into(),
            "Bypass".into(),
            "-NoProfile".into(),
            "-File".into(),
            self.script.clone().into_os_string(),
        ]
    }

    fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    fn description(&self) -> &'static str {
        "installer script"
    }
}

/// Show a modal error dialog through an inline PowerShell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowDialogArgs {
    /// Complete inline script passed to `-Command`.
    pub command: String,
}

impl HostArgs for ShowDialogArgs {
    fn to_cli_args(&self) -> Vec<OsString> {
        vec!["-NoProfile".into(), "-Command".into(), self.command.clone().into()]
    }

    fn description(&self) -> &'static str {
        "error dialog"
    }
}
