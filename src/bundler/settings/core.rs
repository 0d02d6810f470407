//! Core Settings struct and implementations.

use super::{Action, AddressSize, Arch, Platform, Version};
use std::path::{Path, PathBuf};

/// Build configuration for one packaging run.
///
/// Constructed once via [`SettingsBuilder`](super::SettingsBuilder), which
/// checks the required keys and fills in defaults. Immutable afterwards;
/// the manifest builder and every platform packager read from it.
///
/// # Examples
///
/// ```no_run
/// use viewer_bundler::bundler::{Platform, SettingsBuilder};
///
/// # fn example() -> viewer_bundler::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .platform(Platform::Linux)
///     .arch("x86_64".parse()?)
///     .source("indra/newview")
///     .build_dir("build-linux-x86_64/newview")
///     .dest("build-linux-x86_64/newview/packaged")
///     .version("7.1.9.74745".parse()?)
///     .channel("Firestorm-Release")
///     .build()?;
/// assert_eq!(settings.app_name(), "FirestormViewer");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Settings {
    pub(super) platform: Platform,
    pub(super) arch: Arch,

    /// Source tree holding resources (`indra/newview`).
    pub(super) source: PathBuf,

    /// Build tree holding compiled binaries.
    pub(super) build: PathBuf,

    /// Staging tree to populate.
    pub(super) dest: PathBuf,

    /// CMake configuration subdirectory (`RelWithDebInfo`, `Release`).
    pub(super) configuration: String,

    /// `Release` enables stripping and archive creation on Linux.
    pub(super) buildtype: String,

    pub(super) actions: Vec<Action>,
    pub(super) version: Version,
    pub(super) channel: String,
    pub(super) channel_suffix: Option<String>,
    pub(super) grid: Option<String>,
    pub(super) sourceid: Option<String>,

    /// Code-signing identity (macOS) or signing switch (Windows).
    pub(super) signature: Option<String>,

    /// BugSplat crash reporting database.
    pub(super) bugsplat: Option<String>,

    /// macOS bundle identifier.
    pub(super) bundleid: Option<String>,

    /// Build targets OpenSim grids rather than Second Life only.
    pub(super) opensim: bool,

    pub(super) vendor_base: String,
    pub(super) update_service: String,
}

impl Settings {
    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn arch(&self) -> &Arch {
        &self.arch
    }

    pub fn address_size(&self) -> AddressSize {
        self.arch.address_size()
    }

    pub fn source_dir(&self) -> &Path {
        &self.source
    }

    pub fn build_dir(&self) -> &Path {
        &self.build
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest
    }

    pub fn configuration(&self) -> &str {
        &self.configuration
    }

    /// Whether binaries come from the `Debug` configuration.
    pub fn is_debug_configuration(&self) -> bool {
        self.configuration.eq_ignore_ascii_case("debug")
    }

    pub fn buildtype(&self) -> &str {
        &self.buildtype
    }

    /// Whether this is a `Release` build.
    pub fn is_release_build(&self) -> bool {
        self.buildtype.eq_ignore_ascii_case("release")
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Whether the `package` action was requested.
    ///
    /// Some resources are only staged when building an installer.
    pub fn is_packaging(&self) -> bool {
        self.actions.contains(&Action::Package)
    }

    pub fn has_action(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn channel_suffix(&self) -> Option<&str> {
        self.channel_suffix.as_deref()
    }

    pub fn grid(&self) -> Option<&str> {
        self.grid.as_deref()
    }

    pub fn sourceid(&self) -> Option<&str> {
        self.sourceid.as_deref()
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn bugsplat(&self) -> Option<&str> {
        self.bugsplat.as_deref()
    }

    pub fn bundleid(&self) -> Option<&str> {
        self.bundleid.as_deref()
    }

    pub fn is_opensim(&self) -> bool {
        self.opensim
    }

    pub fn vendor_base(&self) -> &str {
        &self.vendor_base
    }

    pub fn update_service(&self) -> &str {
        &self.update_service
    }
}
