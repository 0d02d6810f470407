//! Authenticode signing through the build machine's signing script.

use crate::bundler::{error::Result, utils::process::run_command};
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

/// Signing script used when `SIGN` is unset.
pub const DEFAULT_SIGN_SCRIPT: &str = r"C:\buildscripts\code-signing\sign.py";

/// The signing script and the interpreter that runs it.
#[derive(Clone, Debug)]
pub struct SignTool {
    python: OsString,
    script: PathBuf,
}

impl SignTool {
    pub fn new(python: impl Into<OsString>, script: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            script: script.into(),
        }
    }

    /// Reads `SIGN` and `PYTHON` from the environment.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os("PYTHON").unwrap_or_else(|| "python".into()),
            std::env::var_os("SIGN")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SIGN_SCRIPT)),
        )
    }

    /// Signs `file` in place. Returns `false` when the script is absent,
    /// which is normal outside the build farm.
    pub async fn sign(&self, file: &Path) -> Result<bool> {
        if !self.script.is_file() {
            log::info!(
                "Skipping code signing of {}: {} not found",
                file.display(),
                self.script.display()
            );
            return Ok(false);
        }
        log::info!("Signing {}", file.display());
        run_command(&self.python, [self.script.as_os_str(), file.as_os_str()]).await?;
        Ok(true)
    }
}
