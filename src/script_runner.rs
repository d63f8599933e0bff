//! Interpreter execution.
//!
//! `run_host` is the one place a PowerShell process gets spawned. It applies
//! the requested `WindowMode`, registers the child with the cleanup registry
//! while it runs, and blocks until it exits. There is no timeout: a hung
//! script hangs the launcher.
//!
//! The `ScriptHost` trait is the seam the launcher and the dialog talk to,
//! so tests can record invocations instead of starting real processes.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::host_args::{HostArgs, WindowMode};
use crate::process_guard::{CleanupRegistry, CommandWindowExt};

/// Something that can run PowerShell-style invocations.
pub trait ScriptHost {
    /// Run `args` with the given window mode and wait for it to exit.
    ///
    /// `Err` means the process could not be started or waited on. A process
    /// that ran and exited non-zero is `Ok` with `success == false`.
    fn run(&self, args: &dyn HostArgs, mode: WindowMode) -> Result<HostOutput>;
}

impl<T: ScriptHost + ?Sized> ScriptHost for &T {
    fn run(&self, args: &dyn HostArgs, mode: WindowMode) -> Result<HostOutput> {
        (**self).run(args, mode)
    }
}

/// The system PowerShell executable.
#[derive(Debug, Clone)]
pub struct PowerShell {
    program: PathBuf,
}

impl PowerShell {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ScriptHost for PowerShell {
    fn run(&self, args: &dyn HostArgs, mode: WindowMode) -> Result<HostOutput> {
        run_host(&self.program, args, mode)
    }
}

/// Spawn `program` with typed arguments and block until it exits.
pub fn run_host(program: &Path, args: &dyn HostArgs, mode: WindowMode) -> Result<HostOutput> {
    let cli_args = args.to_cli_args();
    info!(
        "run_host: {} {} window={} args={:?}",
        program.display(),
        args.description(),
        mode,
        cli_args
    );

    let mut cmd = Command::new(program);
    cmd.args(&cli_args).window(mode);
    if let Some(dir) = args.working_dir() {
        cmd.current_dir(dir);
    }

    // Spawn and register under one lock so a concurrent cleanup either sees
    // the child or stops us from starting it.
    let mut child = {
        let mut registry = CleanupRegistry::lock_global();
        if registry.is_shutting_down() {
            anyhow::bail!("Shutting down, not starting {}", args.description());
        }
        let child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn {}", program.display()))?;
        registry.register_child(child.id());
        child
    };
    let pid = child.id();

    let waited = child
        .wait()
        .with_context(|| format!("Failed waiting for {}", args.description()));

    CleanupRegistry::lock_global().unregister_child(pid);

    let status = waited?;
    let output = HostOutput {
        exit_code: status.code(),
        success: status.success(),
    };

    if output.success {
        info!("{} finished successfully", args.description());
    } else {
        info!(
            "{} failed with exit code {}",
            args.description(),
            output.exit_code.unwrap_or(-1)
        );
    }
    debug!("run_host: {:?}", output);
    Ok(output)
}

/// Outcome of an interpreter run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostOutput {
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the process exited with code 0.
    pub success: bool,
}

impl HostOutput {
    /// Check if the run succeeded and return an error if not.
    pub fn ensure_success(&self, context: &str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            anyhow::bail!(
                "{} failed (exit code {})",
                context,
                self.exit_code.unwrap_or(-1)
            )
        }
    }
}
