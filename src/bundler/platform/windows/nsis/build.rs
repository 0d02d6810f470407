//! NSIS installer build execution.

use crate::bundler::{
    error::Result,
    utils::{
        process::run_command,
        retry::{RetryPolicy, retry},
    },
};
use std::{ffi::OsStr, path::Path};

/// Compiles `nsi_path` with `makensis`, retrying transient failures.
///
/// `OutFile` in the script is relative to the script's directory, so the
/// installer lands next to it.
pub async fn run_makensis(makensis: &Path, nsi_path: &Path) -> Result<()> {
    log::info!("Running makensis on {}", nsi_path.display());
    let verbosity = OsStr::new(if cfg!(windows) { "/V2" } else { "-V2" });
    retry("makensis", RetryPolicy::EXTERNAL_TOOL, || {
        run_command(makensis, [verbosity, nsi_path.as_os_str()])
    })
    .await?;
    Ok(())
}
