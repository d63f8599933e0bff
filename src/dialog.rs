//! Error dialog.
//!
//! The stub links no GUI library. A message box is shown by asking
//! PowerShell to load `System.Windows.Forms` and call `MessageBox.Show`.
//! The dialog is fire-and-forget: its result and any launch failure are
//! only logged.

use tracing::{debug, warn};

use crate::host_args::{ShowDialogArgs, WindowMode};
use crate::script_runner::ScriptHost;

/// Title of every error dialog.
pub const DIALOG_TITLE: &str = "KodLaewLong Error";

/// Something that can put an error in front of the user.
pub trait ErrorReporter {
    fn show_error(&self, message: &str);
}

/// Message box rendered through a `ScriptHost`.
#[derive(Debug, Clone)]
pub struct PowerShellDialog<H> {
    host: H,
    title: String,
}

impl<H: ScriptHost> PowerShellDialog<H> {
    pub fn new(host: H, title: impl Into<String>) -> Self {
        Self {
            host,
            title: title.into(),
        }
    }
}

impl<H: ScriptHost> ErrorReporter for PowerShellDialog<H> {
    fn show_error(&self, message: &str) {
        let args = ShowDialogArgs {
            command: dialog_script(&self.title, message),
        };
        // Hidden only suppresses the console; the message box is its own window.
        match self.host.run(&args, WindowMode::Hidden) {
            Ok(output) => debug!("Error dialog closed ({:?})", output.exit_code),
            Err(e) => warn!("Could not show error dialog for {:?}: {:#}", message, e),
        }
    }
}

/// Build the inline script that shows the message box.
pub fn dialog_script(title: &str, message: &str) -> String {
    format!(
        "Add-Type -AssemblyName System.Windows.Forms\n\
         [System.Windows.Forms.MessageBox]::Show('{}', '{}', 'OK', 'Error')\n",
        quote_literal(message),
        quote_literal(title)
    )
}

/// Make `text` safe inside a PowerShell single-quoted string.
///
/// Single-quoted strings do no expansion; the only special characters are
/// the quote itself and its typographic variants, all escaped by doubling.
fn quote_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\'' | '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}') {
            out.push(c);
        }
        out.push(c);
    }
    out
}
