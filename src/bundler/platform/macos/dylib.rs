//! Shared libraries in the app bundle and the links that let nested
//! helper apps load them.
//!
//! Libraries land once in `Contents/Resources`. Each helper app
//! (`SLPlugin.app`, `mac-crash-logger.app`) gets a relative symlink per
//! library in its own `Contents/Resources`, so the bundle carries a single
//! copy that survives being dragged to `/Applications`.

use crate::bundler::{
    error::Result,
    manifest::{ManifestBuilder, SymlinkRequest},
    utils::process::run_command_blocking,
};
use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

/// Install name baked into CEF consumers at link time.
pub const CEF_RPATH: &str =
    "@rpath/Frameworks/Chromium Embedded Framework.framework/Chromium Embedded Framework";

/// Libraries staged so far, relative to the destination they were staged
/// into.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RememberedLibs(Vec<PathBuf>);

impl RememberedLibs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `src` as `dst` if present and remembers every file written.
    ///
    /// Wildcards expand, so `libnghttp2.*dylib` remembers each versioned
    /// name.
    pub fn path_optional(
        &mut self,
        manifest: &mut ManifestBuilder,
        src: impl AsRef<Path>,
        dst: impl AsRef<Path>,
    ) -> Result<usize> {
        let dst = dst.as_ref();
        let resolution = manifest.path_to(src, dst)?;
        if resolution.is_missing() {
            log::info!("Skipping {}", dst.display());
            return Ok(0);
        }
        let root = manifest.current().dest_root.clone();
        let before = self.0.len();
        self.0.extend(
            resolution
                .dests()
                .iter()
                .filter_map(|d| d.strip_prefix(&root).ok())
                .map(Path::to_path_buf),
        );
        Ok(self.0.len() - before)
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.0
    }

    /// Links every remembered library into `app/Contents/Resources`,
    /// pointing three levels up at the real copy.
    ///
    /// A link that can't be created is logged and skipped.
    pub fn link_into(&self, manifest: &ManifestBuilder, app: &str) -> Result<()> {
        let resources = Path::new(app).join("Contents").join("Resources");
        for lib in &self.0 {
            let target = Path::new("../../..").join(lib);
            manifest.symlinkf(SymlinkRequest::new(target).at(resources.join(lib)))?;
        }
        Ok(())
    }
}

/// Points the CEF load command of `binary` at `new_path`.
///
/// A binary that was not staged is skipped with a warning.
pub fn change_cef_install_name(binary: &Path, new_path: &str) -> Result<()> {
    if !binary.exists() {
        log::warn!(
            "{} was not staged; leaving its CEF install name alone",
            binary.display()
        );
        return Ok(());
    }
    run_command_blocking(
        "install_name_tool",
        [
            OsStr::new("-change"),
            OsStr::new(CEF_RPATH),
            OsStr::new(new_path),
            binary.as_os_str(),
        ],
    )?;
    log::debug!("Rewrote CEF install name in {}", binary.display());
    Ok(())
}
