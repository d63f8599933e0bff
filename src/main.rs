//! KodLaewLong installer stub - main entry point
//!
//! No arguments, no console. Everything the user sees comes from the
//! installer script or from an error dialog.

#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

use std::process::ExitCode;

use kodlaewlong_stub::{
    init_signal_handlers, logging, Launcher, PowerShell, PowerShellDialog, StubConfig,
};
use tracing::{debug, info, warn};

fn main() -> ExitCode {
    logging::init();
    info!("KodLaewLong stub starting");

    // Removes the temp script if we are killed while PowerShell runs
    if let Err(e) = init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    debug!("Signal handlers initialized");

    let config = StubConfig::default();
    let host = PowerShell::new(&config.interpreter);
    let dialog = PowerShellDialog::new(host.clone(), config.dialog_title.clone());

    let outcome = Launcher::new(config, &host, &dialog).run();
    info!("KodLaewLong stub finished: {:?}", outcome);
    outcome.exit_code()
}
