//! Windows NSIS installer creation.
//!
//! # Module Organization
//!
//! - `file_commands` - install/uninstall sections from the manifest
//! - `template` - Handlebars fragments for version defines and installer variables
//! - `script` - filling the installer template
//! - `toolset` - locating makensis
//! - `build` - makensis execution with retries
//! - `utils` - UTF-8 BOM handling

mod build;
pub mod file_commands;
pub mod script;
mod template;
pub mod toolset;
mod utils;

use super::{WindowsPackager, sign::SignTool};
use crate::bundler::{error::Result, manifest::ManifestBuilder, platform::PlatformPackager};
use std::path::PathBuf;

pub use file_commands::{FileCommandMode, nsi_file_commands};
pub use script::InstallerVars;

/// Builds the NSIS installer from the staged tree.
///
/// # Process
///
/// 1. Sign the viewer executable when a signature is configured
/// 2. Generate the installer script next to the staged files
/// 3. Compile it with makensis
/// 4. Sign the installer
///
/// # Returns
///
/// Path to the installer `.exe` in the staging directory
pub async fn build_installer(
    packager: &WindowsPackager<'_>,
    manifest: &mut ManifestBuilder,
) -> Result<PathBuf> {
    let settings = packager.settings();
    log::info!("Building NSIS installer for {}", settings.app_name());

    let signer = settings.signature().map(|_| SignTool::from_env());
    if let Some(signer) = &signer {
        signer
            .sign(&manifest.dst_path_of(packager.final_exe()))
            .await?;
    }

    let vars = InstallerVars::new(settings, &packager.final_exe());
    let nsi_path = script::write_installer_script(settings, &vars, manifest)?;

    let makensis = toolset::find_makensis()?;
    build::run_makensis(&makensis, &nsi_path).await?;

    let installer = manifest.dst_path_of(&vars.installer_file);
    if let Some(signer) = &signer {
        signer.sign(&installer).await?;
    }

    log::info!("✓ Created NSIS installer: {}", installer.display());
    Ok(installer)
}
