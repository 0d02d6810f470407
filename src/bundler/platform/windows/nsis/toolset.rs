//! Locating the NSIS compiler.

use crate::bundler::error::{Error, Result};
use std::path::PathBuf;

/// Path to `makensis`.
///
/// The Unicode build under `Program Files` (either flavour) is preferred;
/// otherwise `makensis` must be on `PATH`.
pub fn find_makensis() -> Result<PathBuf> {
    for var in ["ProgramFiles", "ProgramFiles(x86)"] {
        let Some(dir) = std::env::var_os(var) else {
            continue;
        };
        let candidate = PathBuf::from(dir)
            .join("NSIS")
            .join("Unicode")
            .join("makensis.exe");
        if candidate.is_file() {
            log::debug!("Found makensis at: {}", candidate.display());
            return Ok(candidate);
        }
    }
    which::which("makensis").map_err(|_| {
        Error::GenericError(
            "makensis not found. Please install NSIS (e.g., apt-get install nsis)".into(),
        )
    })
}
