//! Sparse image creation and mounting with hdiutil.

use crate::bundler::{
    error::{Context, Error, Result},
    settings::Settings,
    utils::{fs::remove_path, process::run_command},
};
use regex::Regex;
use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

/// Room for the app bundle while it is being assembled.
const SPARSE_MEGABYTES: &str = "1300";

/// Whole-disk node, not a slice (`/dev/disk3`, not `/dev/disk3s1`).
const DEVICE_PATTERN: &str = r"/dev/disk([0-9]+)[^s]";
const VOLUME_PATTERN: &str = r"HFS\s+(.+)";

/// The working and final images for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagePaths {
    pub sparse: PathBuf,
    pub dmg: PathBuf,
}

impl ImagePaths {
    /// `<dir>/<installer base name>.sparseimage` and `.dmg`.
    pub fn new(settings: &Settings, dir: &Path) -> Self {
        let base = settings.installer_base_name();
        Self {
            sparse: dir.join(format!("{base}.sparseimage")),
            dmg: dir.join(format!("{base}.dmg")),
        }
    }

    /// Removes images left by an earlier run.
    pub fn remove_stale(&self) -> Result<()> {
        remove_path(&self.sparse)?;
        remove_path(&self.dmg)
    }
}

/// Volume name the template `.DS_Store` was recorded against.
///
/// Finder positions and the background image break if it changes.
pub fn volume_name(settings: &Settings) -> String {
    format!("{} Installer", settings.vendor_base())
}

pub async fn create_sparse_image(sparse: &Path, volname: &str) -> Result<()> {
    log::info!("Creating {}", sparse.display());
    run_command(
        "hdiutil",
        [
            OsStr::new("create"),
            sparse.as_os_str(),
            OsStr::new("-volname"),
            OsStr::new(volname),
            OsStr::new("-fs"),
            OsStr::new("HFS+"),
            OsStr::new("-type"),
            OsStr::new("SPARSE"),
            OsStr::new("-megabytes"),
            OsStr::new(SPARSE_MEGABYTES),
            OsStr::new("-layout"),
            OsStr::new("SPUD"),
        ],
    )
    .await?;
    Ok(())
}

/// An attached image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MountedVolume {
    /// Whole-disk device node, e.g. `/dev/disk3`
    pub device: String,
    pub path: PathBuf,
}

fn pattern(source: &str) -> Result<Regex> {
    Regex::new(source).map_err(|e| Error::GenericError(format!("bad pattern {source}: {e}")))
}

/// Pulls the device node and mount point out of `hdiutil attach` output.
pub fn parse_attach_output(output: &str) -> Result<MountedVolume> {
    let device = pattern(DEVICE_PATTERN)?
        .find(output)
        .map(|m| m.as_str().trim().to_string())
        .with_context(|| format!("no device node in hdiutil output: {output}"))?;
    let path = pattern(VOLUME_PATTERN)?
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| PathBuf::from(m.as_str().trim()))
        .with_context(|| format!("no HFS volume in hdiutil output: {output}"))?;
    Ok(MountedVolume { device, path })
}

/// Attaches `sparse` privately (hidden from the Finder sidebar).
pub async fn attach(sparse: &Path) -> Result<MountedVolume> {
    let output = run_command(
        "hdiutil",
        [OsStr::new("attach"), OsStr::new("-private"), sparse.as_os_str()],
    )
    .await
    .map_err(|e| {
        Error::GenericError(format!("failed to mount image at {}: {e}", sparse.display()))
    })?;
    let volume = parse_attach_output(&String::from_utf8_lossy(&output.stdout))?;

    if volume.device != "/dev/disk1" {
        log::warn!(
            "Image attached as {}; hiding files with SetFile may fail",
            volume.device
        );
    }
    log::debug!("Mounted {} at {}", volume.device, volume.path.display());
    Ok(volume)
}

pub async fn detach(device: &str) -> Result<()> {
    run_command("hdiutil", ["detach", "-force", device]).await?;
    log::debug!("Detached {device}");
    Ok(())
}
