//! Error handling module for the installer stub
//!
//! Every failure the launcher can hit before the payload runs has a variant
//! here. The `Display` text of each variant is the localized (Thai) message
//! shown to the user in the error dialog, so `err.to_string()` is all the
//! entry point needs.

use thiserror::Error;

/// Main error type for the installer stub
#[derive(Error, Debug)]
pub enum StubError {
    /// The platform could not report where the running executable lives
    #[error("ไม่สามารถหาตำแหน่งไฟล์ได้: {0}")]
    PathResolution(String),

    /// The executable image could not be read back from disk
    #[error("ไม่สามารถอ่านไฟล์ได้: {0}")]
    Read(#[source] std::io::Error),

    /// The marker does not occur anywhere in the image
    #[error("ไม่พบสคริปต์ติดตั้ง กรุณาดาวน์โหลดไฟล์ใหม่")]
    PayloadMissing,

    /// The marker is the last thing in the image
    #[error("สคริปต์ติดตั้งว่างเปล่า")]
    EmptyPayload,

    /// The temporary script file could not be written
    #[error("ไม่สามารถสร้างไฟล์ชั่วคราวได้: {0}")]
    Write(#[source] std::io::Error),

    /// The interpreter process could not be started or waited on
    #[error("ไม่สามารถเรียกใช้ PowerShell ได้: {0}")]
    Launch(String),
}

/// Result type alias for stub operations
pub type Result<T> = std::result::Result<T, StubError>;

impl StubError {
    /// Create a path resolution error
    pub fn path_resolution(msg: impl Into<String>) -> Self {
        Self::PathResolution(msg.into())
    }

    /// Create an interpreter launch error
    pub fn launch(msg: impl Into<String>) -> Self {
        Self::Launch(msg.into())
    }

    /// Text shown in the error dialog.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
