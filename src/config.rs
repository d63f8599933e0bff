//! Launcher configuration.
//!
//! The stub takes no flags and reads no config file. `StubConfig` just
//! gathers the fixed values in one struct so the launcher never reaches for
//! globals, and tests can point it at a scratch directory and a fake
//! interpreter.

use std::path::PathBuf;

use crate::dialog::DIALOG_TITLE;
use crate::payload::marker_bytes;
use crate::script_file::SCRIPT_FILE_NAME;

/// PowerShell executable used when nothing else is configured.
#[cfg(windows)]
pub const DEFAULT_INTERPRETER: &str = "powershell.exe";
/// PowerShell executable used when nothing else is configured.
#[cfg(not(windows))]
pub const DEFAULT_INTERPRETER: &str = "pwsh";

/// Everything the launcher needs besides its own executable image.
#[derive(Debug, Clone)]
pub struct StubConfig {
    /// Byte sequence separating stub and script
    pub marker: Vec<u8>,
    /// Name of the extracted script inside `temp_dir`
    pub script_file_name: String,
    /// Directory the script is extracted into
    pub temp_dir: PathBuf,
    /// Interpreter for both the script and the error dialog
    pub interpreter: PathBuf,
    /// Error dialog title
    pub dialog_title: String,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            marker: marker_bytes(),
            script_file_name: SCRIPT_FILE_NAME.to_string(),
            temp_dir: std::env::temp_dir(),
            interpreter: PathBuf::from(DEFAULT_INTERPRETER),
            dialog_title: DIALOG_TITLE.to_string(),
        }
    }
}

impl StubConfig {
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn with_interpreter(mut self, program: impl Into<PathBuf>) -> Self {
        self.interpreter = program.into();
        self
    }

    /// Where the extracted script will be written.
    pub fn script_path(&self) -> PathBuf {
        self.temp_dir.join(&self.script_file_name)
    }
}
