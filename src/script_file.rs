//! RAII wrapper for the extracted installer script.
//!
//! The script is written to a fixed, well-known name in the temp directory
//! and removed when the wrapper is dropped. The path is also registered with
//! the global `CleanupRegistry` so a termination signal that bypasses normal
//! unwinding still deletes it.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, StubError};
use crate::process_guard::CleanupRegistry;

/// File name of the extracted script inside the temp directory.
pub const SCRIPT_FILE_NAME: &str = "KodLaewLong-Installer.ps1";

/// The extracted script on disk. Deleted on drop.
#[derive(Debug)]
pub struct TempScript {
    path: PathBuf,
}

impl TempScript {
    /// Write `script` to `dir/file_name`, replacing whatever was there.
    ///
    /// The content is written byte-for-byte. On Unix the file is created
    /// with mode 0644.
    pub fn persist(dir: &Path, file_name: &str, script: &[u8]) -> Result<Self> {
        let path = dir.join(file_name);

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }

        // Only a file this run opened is ours to delete. Opening and
        // registering happen under the registry lock so a forced exit
        // cannot slip between them.
        let (guard, mut file) = {
            let mut registry = CleanupRegistry::lock_global();
            let file = options.open(&path).map_err(StubError::Write)?;
            registry.register_file(path.clone());
            (Self { path }, file)
        };

        // On failure `guard` drops here and removes the partial file.
        file.write_all(script).map_err(StubError::Write)?;
        file.sync_all().map_err(StubError::Write)?;

        debug!(
            "Installer script written: {} ({} bytes)",
            guard.path.display(),
            script.len()
        );
        Ok(guard)
    }

    /// Path handed to the interpreter's `-File` switch.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the script lives in; used as the interpreter's working directory.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(&self.path)
    }
}

impl Drop for TempScript {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Installer script removed: {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
        CleanupRegistry::lock_global().unregister_file(&self.path);
    }
}
