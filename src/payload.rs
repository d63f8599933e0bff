//! Embedded payload extraction.
//!
//! The packaging step appends `MARKER` followed by the PowerShell script to
//! the compiled stub. At runtime the stub reads its own image and takes
//! everything after the first marker as the script.
//!
//! # Image Layout
//!
//! ```text
//! +--------------------+---------------------------------+----------------+
//! | stub code and data | ###KODLAEWLONG_SCRIPT_START###  | script bytes   |
//! +--------------------+---------------------------------+----------------+
//! ```
//!
//! The first occurrence wins. Because of that the stub must never carry the
//! marker literal in its own image, or the search would stop at the stub's
//! copy. Only a masked form is compiled in; `marker_bytes` rebuilds the real
//! sequence at runtime.

use std::path::Path;

use tracing::debug;

use crate::error::{Result, StubError};

/// Boundary between stub bytes and the appended script.
///
/// Only usable in const context inside the stub. Runtime code goes through
/// `marker_bytes`.
pub const MARKER: &str = "###KODLAEWLONG_SCRIPT_START###";

const MARKER_KEY: u8 = 0x5A;

static MASKED_MARKER: [u8; MARKER.len()] = mask_marker(MARKER.as_bytes());

const fn mask_marker(bytes: &[u8]) -> [u8; MARKER.len()] {
    let mut out = [0u8; MARKER.len()];
    let mut i = 0;
    while i < out.len() {
        out[i] = bytes[i] ^ MARKER_KEY;
        i += 1;
    }
    out
}

/// The marker as it appears in a packaged image.
pub fn marker_bytes() -> Vec<u8> {
    // Keeps the optimizer from folding the unmasked bytes back into .rodata.
    let key = std::hint::black_box(MARKER_KEY);
    MASKED_MARKER.iter().map(|b| b ^ key).collect()
}

/// Offset of the first occurrence of `marker` in `image`, if any.
pub fn find_marker(image: &[u8], marker: &[u8]) -> Option<usize> {
    if marker.is_empty() || marker.len() > image.len() {
        return None;
    }
    image
        .windows(marker.len())
        .position(|window| window == marker)
}

/// Return the script bytes that follow the first `marker` in `image`.
///
/// # Errors
///
/// - `StubError::PayloadMissing` if the marker does not occur
/// - `StubError::EmptyPayload` if nothing follows the marker
pub fn extract_script<'a>(image: &'a [u8], marker: &[u8]) -> Result<&'a [u8]> {
    let start = find_marker(image, marker).ok_or(StubError::PayloadMissing)?;
    let script = &image[start + marker.len()..];
    if script.is_empty() {
        return Err(StubError::EmptyPayload);
    }
    debug!(
        "Marker found at offset {}, script is {} bytes",
        start,
        script.len()
    );
    Ok(script)
}

/// Read a whole executable image into memory.
pub fn read_image(path: &Path) -> Result<Vec<u8>> {
    let image = std::fs::read(path).map_err(StubError::Read)?;
    debug!("Read {} bytes from {}", image.len(), path.display());
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_after_marker() {
        let image = b"MZ\x90\x00stub###KODLAEWLONG_SCRIPT_START###Write-Host \"hi\"";
        let script = extract_script(image, MARKER.as_bytes()).unwrap();
        assert_eq!(script, b"Write-Host \"hi\"");
    }

    #[test]
    fn test_first_marker_wins() {
        let image = b"aa###KODLAEWLONG_SCRIPT_START###one###KODLAEWLONG_SCRIPT_START###two";
        let script = extract_script(image, MARKER.as_bytes()).unwrap();
        assert_eq!(script, b"one###KODLAEWLONG_SCRIPT_START###two");
    }

    #[test]
    fn test_missing_marker() {
        let err = extract_script(b"just a plain binary", MARKER.as_bytes()).unwrap_err();
        assert!(matches!(err, StubError::PayloadMissing));
    }

    #[test]
    fn test_marker_at_end_is_empty() {
        let image = b"stub###KODLAEWLONG_SCRIPT_START###";
        let err = extract_script(image, MARKER.as_bytes()).unwrap_err();
        assert!(matches!(err, StubError::EmptyPayload));
    }

    #[test]
    fn test_partial_marker_is_missing() {
        let image = b"stub###KODLAEWLONG_SCRIPT_STA";
        assert!(find_marker(image, MARKER.as_bytes()).is_none());
    }

    #[test]
    fn test_find_marker_edge_cases() {
        assert_eq!(find_marker(b"", b"x"), None);
        assert_eq!(find_marker(b"abc", b""), None);
        assert_eq!(find_marker(b"abc", b"abc"), Some(0));
        assert_eq!(find_marker(b"xxabc", b"abc"), Some(2));
    }

    #[test]
    fn test_payload_bytes_are_not_reencoded() {
        let mut image = b"stub###KODLAEWLONG_SCRIPT_START###".to_vec();
        image.extend_from_slice(&[0xEF, 0xBB, 0xBF]);
        image.extend_from_slice("Write-Host 'สวัสดี'".as_bytes());
        let script = extract_script(&image, MARKER.as_bytes()).unwrap();
        assert_eq!(&script[..3], &[0xEF, 0xBB, 0xBF]);
        assert!(std::str::from_utf8(&script[3..]).unwrap().contains("สวัสดี"));
    }

    #[test]
    fn test_marker_bytes_unmask() {
        assert_eq!(marker_bytes(), MARKER.as_bytes());
        assert!(find_marker(&MASKED_MARKER, MARKER.as_bytes()).is_none());
    }

    #[test]
    fn test_read_image_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = read_image(&tmp.path().join("gone.exe")).unwrap_err();
        assert!(matches!(err, StubError::Read(_)));
    }
}
