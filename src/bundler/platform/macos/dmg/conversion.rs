//! Sparse image to compressed distribution image.
//!
//! A sparse image can be mounted read-write and customized; the shipped
//! image is a read-only UDZO converted from it once it is detached.

use crate::bundler::{
    error::Result,
    utils::{fs::remove_path, process::run_command},
};
use std::{ffi::OsStr, path::Path};

/// Converts `sparse` to a zlib level 9 UDZO at `dmg`, marks it for
/// internet-enabled download and removes the sparse image.
pub async fn convert_to_compressed(sparse: &Path, dmg: &Path) -> Result<()> {
    log::info!("Converting temp disk image to final disk image");
    run_command(
        "hdiutil",
        [
            OsStr::new("convert"),
            sparse.as_os_str(),
            OsStr::new("-format"),
            OsStr::new("UDZO"),
            OsStr::new("-imagekey"),
            OsStr::new("zlib-level=9"),
            OsStr::new("-o"),
            dmg.as_os_str(),
        ],
    )
    .await?;
    run_command(
        "hdiutil",
        [OsStr::new("internet-enable"), OsStr::new("-yes"), dmg.as_os_str()],
    )
    .await?;
    remove_path(sparse)?;

    log::info!("✓ Created {}", dmg.display());
    Ok(())
}
