//! Process lifecycle management for the interpreter child and the temp script
//!
//! The launcher blocks on PowerShell with no timeout. If the launcher itself
//! is told to stop while it waits (Ctrl+C, SIGTERM, logoff), normal scope exit
//! never happens and the `TempScript` guard never drops. This module closes
//! that gap.
//!
//! # Solution
//! - Track the running interpreter PID and the temp script path in a global
//!   registry
//! - On a termination signal, stop the child (SIGTERM, grace period, SIGKILL),
//!   delete the tracked files, then exit with 128 + signal. The registry lock
//!   is held until the process is gone, and no new child is started once
//!   cleanup has begun, so a killed hidden run never turns into a visible
//!   retry
//! - Hidden interpreter runs on Unix get their own process group and a parent
//!   death signal, so they never outlive the launcher
//!
//! On Windows the handler is a console control handler. Release builds use
//! the GUI subsystem and have no console, so it only fires in debug builds
//! started from a terminal.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::host_args::WindowMode;

/// Global registry, lazily created
static CLEANUP_REGISTRY: OnceLock<Mutex<CleanupRegistry>> = OnceLock::new();

/// Things that must not survive the launcher: child PIDs and scratch files
#[derive(Debug, Default)]
pub struct CleanupRegistry {
    /// Interpreter PIDs currently running
    pids: HashSet<u32>,
    /// Files to delete on forced exit
    files: HashSet<PathBuf>,
    /// Whether cleanup has already run (prevents double-cleanup)
    cleanup_initiated: bool,
}

impl CleanupRegistry {
    /// Lock the global registry, creating it on first use and recovering
    /// from poisoning
    pub fn lock_global() -> MutexGuard<'static, CleanupRegistry> {
        CLEANUP_REGISTRY
            .get_or_init(|| Mutex::new(CleanupRegistry::default()))
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether forced-exit cleanup has started; no new child may be spawned
    pub fn is_shutting_down(&self) -> bool {
        self.cleanup_initiated
    }

    /// Register a running child process
    pub fn register_child(&mut self, pid: u32) {
        self.pids.insert(pid);
        debug!("Registered child process PID {}", pid);
    }

    /// Unregister a child process (called when it exits normally)
    pub fn unregister_child(&mut self, pid: u32) {
        self.pids.remove(&pid);
        debug!("Unregistered child process PID {}", pid);
    }

    /// Register a file to delete on forced exit
    pub fn register_file(&mut self, path: PathBuf) {
        debug!("Registered scratch file {}", path.display());
        self.files.insert(path);
    }

    /// Unregister a file (its owner already removed it)
    pub fn unregister_file(&mut self, path: &Path) {
        self.files.remove(path);
    }

    /// Number of tracked children
    pub fn child_count(&self) -> usize {
        self.pids.len()
    }

    /// Number of tracked files
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Stop every tracked child, then delete every tracked file.
    ///
    /// Children get SIGTERM and up to `grace_period` to exit before SIGKILL.
    /// Runs at most once.
    pub fn cleanup(&mut self, grace_period: Duration) {
        if self.cleanup_initiated {
            debug!("Cleanup already initiated, skipping");
            return;
        }
        self.cleanup_initiated = true;

        self.terminate_children(grace_period);

        for path in self.files.drain() {
            match std::fs::remove_file(&path) {
                Ok(()) => info!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }

    #[cfg(unix)]
    fn terminate_children(&mut self, grace_period: Duration) {
        use nix::sys::signal::Signal;
        use std::time::Instant;

        if self.pids.is_empty() {
            return;
        }
        info!("Terminating {} child process(es)...", self.pids.len());

        let pids: Vec<u32> = self.pids.drain().collect();
        for &pid in &pids {
            // Hidden runs lead their own group; visible runs share ours,
            // so the group signal fails and the direct one is used instead.
            if let Err(e) = unix::send_signal_to_group(pid, Signal::SIGTERM) {
                debug!("Group SIGTERM to {} failed ({}), signalling PID", pid, e);
                if let Err(e) = unix::send_signal(pid, Signal::SIGTERM) {
                    warn!("Failed to send SIGTERM to PID {}: {}", pid, e);
                }
            }
        }

        let start = Instant::now();
        while start.elapsed() < grace_period {
            if pids.iter().all(|&pid| !unix::is_process_alive(pid)) {
                info!("All child processes terminated gracefully");
                return;
            }
            std::thread::sleep(Duration::from_millis(100));
        }

        for &pid in &pids {
            if unix::is_process_alive(pid) {
                warn!("Process {} did not terminate, sending SIGKILL", pid);
                if unix::send_signal_to_group(pid, Signal::SIGKILL).is_err() {
                    let _ = unix::send_signal(pid, Signal::SIGKILL);
                }
            }
        }
    }

    // Windows has no signal to forward; a hidden PowerShell keeps running
    // until the script ends.
    #[cfg(not(unix))]
    fn terminate_children(&mut self, _grace_period: Duration) {
        if !self.pids.is_empty() {
            warn!("Leaving {} child process(es) running", self.pids.len());
            self.pids.clear();
        }
    }
}

#[cfg(unix)]
mod unix {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    pub(super) fn send_signal(pid: u32, signal: Signal) -> Result<(), nix::Error> {
        signal::kill(Pid::from_raw(pid as i32), signal)
    }

    /// Negative PID signals the whole group
    pub(super) fn send_signal_to_group(pgid: u32, signal: Signal) -> Result<(), nix::Error> {
        signal::kill(Pid::from_raw(-(pgid as i32)), signal)
    }

    /// Alive means it exists and is not a zombie
    pub(super) fn is_process_alive(pid: u32) -> bool {
        if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
            return false;
        }
        // Field 3 of /proc/pid/stat is the state
        if let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            let fields: Vec<&str> = stat.split_whitespace().collect();
            if fields.len() > 2 {
                return !matches!(fields[2], "Z" | "X");
            }
        }
        true
    }
}

/// Install the termination handlers. Call once at program start.
///
/// Unix: SIGINT, SIGTERM and SIGHUP. Windows: console Ctrl+C / Ctrl+Break.
#[cfg(unix)]
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;

    std::thread::spawn(move || {
        for sig in signals.forever() {
            let signal_name = match sig {
                SIGINT => "SIGINT",
                SIGTERM => "SIGTERM",
                SIGHUP => "SIGHUP",
                _ => "UNKNOWN",
            };
            info!("Received {} signal, cleaning up...", signal_name);

            // Exit with the lock held: the main thread blocks in
            // `unregister_child` instead of reacting to the killed child.
            let mut registry = CleanupRegistry::lock_global();
            registry.cleanup(Duration::from_secs(3));
            std::process::exit(128 + sig);
        }
    });

    Ok(())
}

#[cfg(windows)]
pub fn init_signal_handlers() -> Result<(), std::io::Error> {
    ctrlc::set_handler(|| {
        info!("Received console interrupt, cleaning up...");
        let mut registry = CleanupRegistry::lock_global();
        registry.cleanup(Duration::from_secs(3));
        std::process::exit(130);
    })
    .map_err(std::io::Error::other)
}

/// Extension trait for `std::process::Command` applying a `WindowMode`
pub trait CommandWindowExt {
    /// Configure how the child presents itself to the user.
    ///
    /// `Hidden` suppresses the console window on Windows. On Unix it detaches
    /// the child into its own process group with stdin closed, and on Linux
    /// also asks the kernel to SIGTERM it if the launcher dies.
    /// `Visible` leaves the command untouched.
    fn window(&mut self, mode: WindowMode) -> &mut Self;
}

impl CommandWindowExt for std::process::Command {
    fn window(&mut self, mode: WindowMode) -> &mut Self {
        if mode == WindowMode::Visible {
            return self;
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            self.creation_flags(CREATE_NO_WINDOW);
        }

        #[cfg(unix)]
        {
            use nix::unistd::Pid;
            use std::os::unix::process::CommandExt;

            self.stdin(std::process::Stdio::null());
            // SAFETY: only async-signal-safe calls between fork and exec
            unsafe {
                self.pre_exec(|| {
                    nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                        .map_err(std::io::Error::other)?;

                    #[cfg(target_os = "linux")]
                    if nix::libc::prctl(nix::libc::PR_SET_PDEATHSIG, nix::libc::SIGTERM) == -1 {
                        return Err(std::io::Error::last_os_error());
                    }

                    Ok(())
                });
            }
        }

        self
    }
}
