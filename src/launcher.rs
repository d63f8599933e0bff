//! Self-extracting launcher
//!
//! Drives the whole run: find our own executable, read it, pull the script
//! out from behind the marker, write it to the temp directory, and hand it
//! to PowerShell. Any failure before PowerShell starts ends the run with a
//! single error dialog. A failed hidden run is retried once with a visible
//! window so the user can see what went wrong.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::{error, info, warn};

use crate::config::StubConfig;
use crate::dialog::ErrorReporter;
use crate::error::{Result, StubError};
use crate::host_args::{RunScriptArgs, WindowMode};
use crate::payload::{extract_script, read_image};
use crate::script_file::TempScript;
use crate::script_runner::ScriptHost;

/// How a launcher run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The hidden run exited with code 0
    Completed,
    /// The hidden run failed and the visible retry was made
    RetriedVisible,
    /// A step before execution failed; the user saw an error dialog
    Aborted,
}

impl Outcome {
    /// Process exit code for this outcome.
    ///
    /// Only `Aborted` is a failure. The visible retry's own result is not
    /// inspected, so `RetriedVisible` exits 0.
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Aborted => ExitCode::FAILURE,
            Outcome::Completed | Outcome::RetriedVisible => ExitCode::SUCCESS,
        }
    }
}

/// Launcher instance
pub struct Launcher<'a> {
    config: StubConfig,
    host: &'a dyn ScriptHost,
    reporter: &'a dyn ErrorReporter,
}

impl<'a> Launcher<'a> {
    pub fn new(
        config: StubConfig,
        host: &'a dyn ScriptHost,
        reporter: &'a dyn ErrorReporter,
    ) -> Self {
        Self {
            config,
            host,
            reporter,
        }
    }

    pub fn config(&self) -> &StubConfig {
        &self.config
    }

    /// Run against the currently executing binary.
    pub fn run(&self) -> Outcome {
        match current_exe_path() {
            Ok(exe) => self.run_from(&exe),
            Err(e) => self.abort(e),
        }
    }

    /// Run against the executable image at `exe`.
    pub fn run_from(&self, exe: &Path) -> Outcome {
        info!("Reading installer image {}", exe.display());
        match read_image(exe) {
            Ok(image) => self.run_image(&image),
            Err(e) => self.abort(e),
        }
    }

    /// Run against an image already in memory.
    ///
    /// The temp script is removed before this returns, on every path.
    pub fn run_image(&self, image: &[u8]) -> Outcome {
        let script = match self.extract_and_persist(image) {
            Ok(script) => script,
            Err(e) => return self.abort(e),
        };
        self.execute(&script)
    }

    /// Extract the script from `image` and write it to the temp directory.
    ///
    /// Nothing is written when extraction fails.
    pub fn extract_and_persist(&self, image: &[u8]) -> Result<TempScript> {
        let script = extract_script(image, &self.config.marker)?;
        TempScript::persist(&self.config.temp_dir, &self.config.script_file_name, script)
    }

    fn execute(&self, script: &TempScript) -> Outcome {
        let args = RunScriptArgs::new(script.path()).in_dir(script.dir());

        let primary = self
            .host
            .run(&args, WindowMode::Hidden)
            .and_then(|output| output.ensure_success("installer script"));

        match primary {
            Ok(()) => {
                info!("Installer script completed");
                Outcome::Completed
            }
            Err(e) => {
                let err = StubError::launch(format!("{:#}", e));
                warn!("Hidden run failed, retrying with a visible window: {}", err);
                match self.host.run(&args, WindowMode::Visible) {
                    Ok(output) => info!("Visible retry exited with {:?}", output.exit_code),
                    Err(e) => warn!("Visible retry could not start: {:#}", e),
                }
                Outcome::RetriedVisible
            }
        }
    }

    fn abort(&self, err: StubError) -> Outcome {
        error!("Launcher aborted: {}", err);
        self.reporter.show_error(&err.user_message());
        Outcome::Aborted
    }
}

/// Absolute path of the running executable.
///
/// Fails when the platform cannot tell, or when the file it names is gone
/// (deleted or moved after start).
pub fn current_exe_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| StubError::path_resolution(e.to_string()))?;
    if !exe.exists() {
        return Err(StubError::path_resolution(format!(
            "{} does not exist",
            exe.display()
        )));
    }
    Ok(exe)
}
