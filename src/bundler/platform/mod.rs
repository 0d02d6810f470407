//! Platform-specific staging and packaging.
//!
//! Each target OS implements [`PlatformPackager`]: a file list declared
//! against the shared [`ManifestBuilder`], and a finishing step that turns
//! the staged tree into an installer artifact.
//!
//! # Module Organization
//!
//! - `common` - resources shared by every platform, build-data sidecar
//! - `windows` - file list, NSIS script generation, makensis
//! - `macos` - app bundle layout, disk image creation, codesign
//! - `linux` - file list, strip, permissions, tarball

pub mod common;
pub mod linux;
pub mod macos;
pub mod windows;

use crate::bundler::{
    Result,
    manifest::ManifestBuilder,
    settings::{Platform, Settings},
};
use common::BuildData;
use std::path::{Path, PathBuf};

/// Per-platform half of a packaging run.
#[allow(async_fn_in_trait)]
pub trait PlatformPackager {
    fn settings(&self) -> &Settings;

    /// Declares and stages the platform's files.
    fn collect_files(&self, manifest: &mut ManifestBuilder) -> Result<()>;

    /// Builds the installer artifact from the staged tree and returns its
    /// path.
    async fn package_finish(&self, manifest: &mut ManifestBuilder) -> Result<PathBuf>;

    /// Whether installer-only resources are staged.
    fn is_packaging_viewer(&self) -> bool {
        self.settings().is_packaging()
    }

    /// Build metadata written next to the common resources.
    fn build_data(&self) -> BuildData {
        BuildData::new(self.settings())
    }
}

/// The packager selected by [`Settings::platform`].
#[derive(Debug)]
pub enum Packager<'a> {
    Windows(windows::WindowsPackager<'a>),
    Darwin(macos::DarwinPackager<'a>),
    Linux(linux::LinuxPackager<'a>),
}

impl<'a> Packager<'a> {
    pub fn for_settings(settings: &'a Settings) -> Self {
        match settings.platform() {
            Platform::Windows => Packager::Windows(windows::WindowsPackager::new(settings)),
            Platform::Darwin => Packager::Darwin(macos::DarwinPackager::new(settings)),
            Platform::Linux => Packager::Linux(linux::LinuxPackager::new(settings)),
        }
    }
}

impl PlatformPackager for Packager<'_> {
    fn settings(&self) -> &Settings {
        match self {
            Packager::Windows(p) => p.settings(),
            Packager::Darwin(p) => p.settings(),
            Packager::Linux(p) => p.settings(),
        }
    }

    fn collect_files(&self, manifest: &mut ManifestBuilder) -> Result<()> {
        match self {
            Packager::Windows(p) => p.collect_files(manifest),
            Packager::Darwin(p) => p.collect_files(manifest),
            Packager::Linux(p) => p.collect_files(manifest),
        }
    }

    async fn package_finish(&self, manifest: &mut ManifestBuilder) -> Result<PathBuf> {
        match self {
            Packager::Windows(p) => p.package_finish(manifest).await,
            Packager::Darwin(p) => p.package_finish(manifest).await,
            Packager::Linux(p) => p.package_finish(manifest).await,
        }
    }

    fn is_packaging_viewer(&self) -> bool {
        match self {
            Packager::Windows(p) => p.is_packaging_viewer(),
            Packager::Darwin(p) => p.is_packaging_viewer(),
            Packager::Linux(p) => p.is_packaging_viewer(),
        }
    }

    fn build_data(&self) -> BuildData {
        match self {
            Packager::Windows(p) => p.build_data(),
            Packager::Darwin(p) => p.build_data(),
            Packager::Linux(p) => p.build_data(),
        }
    }
}

/// Directories around the build tree that file lists pull from.
#[derive(Clone, Debug)]
pub struct BuildLayout {
    /// The build tree itself
    pub build: PathBuf,
    /// Prebuilt third-party packages (`<build>/../packages`)
    pub packages: PathBuf,
}

impl BuildLayout {
    pub fn new(settings: &Settings) -> Self {
        let build = settings.build_dir().to_path_buf();
        let packages = crate::bundler::utils::fs::normalize_path(&build.join("../packages"));
        Self { build, packages }
    }

    /// `<packages>/lib/release`
    pub fn release_libs(&self) -> PathBuf {
        self.packages.join("lib").join("release")
    }

    /// `<packages>/lib/debug`
    pub fn debug_libs(&self) -> PathBuf {
        self.packages.join("lib").join("debug")
    }

    /// `<packages>/bin/release`
    pub fn release_bins(&self) -> PathBuf {
        self.packages.join("bin").join("release")
    }

    /// A sibling of the build tree, e.g. `media_plugins`.
    pub fn sibling(&self, name: impl AsRef<Path>) -> PathBuf {
        crate::bundler::utils::fs::normalize_path(&self.build.join("..").join(name))
    }
}
