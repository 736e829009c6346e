//! Icon sources accepted by the tray.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Where the tray icon pixels come from.
#[derive(Clone, Debug)]
pub enum TrayIcon {
    /// Extract the first icon resource from a file on disk (`.ico`,
    /// `.exe`, `.dll` on Windows).
    Path(PathBuf),
    /// Raw BGRA32 pixels, row-major, top-down.
    Image {
        width: u32,
        height: u32,
        bytes: Vec<u8>,
    },
}

impl TrayIcon {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn image(width: u32, height: u32, bytes: Vec<u8>) -> Self {
        Self::Image {
            width,
            height,
            bytes,
        }
    }
}

/// Check that a BGRA32 buffer matches its declared dimensions.
pub(crate) fn check_bgra32_len(width: u32, height: u32, bytes: &[u8]) -> Result<()> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(4))
        .ok_or_else(|| Error::IconLoad("icon dimensions overflow".into()))?;
    if bytes.len() != expected {
        return Err(Error::IconLoad(format!(
            "icon bytes length mismatch: got {}, expected {} ({}x{}x4)",
            bytes.len(),
            expected,
            width,
            height
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_buffer() {
        assert!(check_bgra32_len(2, 2, &[0u8; 16]).is_ok());
    }

    #[test]
    fn rejects_short_buffer() {
        assert!(matches!(
            check_bgra32_len(16, 16, &[0u8; 8]),
            Err(Error::IconLoad(_))
        ));
    }

    #[test]
    fn rejects_overflowing_dimensions() {
        assert!(matches!(
            check_bgra32_len(u32::MAX, u32::MAX, &[]),
            Err(Error::IconLoad(_))
        ));
    }
}
