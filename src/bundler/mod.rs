//! Viewer staging and installer packaging.
//!
//! A run walks one platform's file list against a [`ManifestBuilder`]
//! rooted at the source, build and destination trees, then hands the
//! staged tree to the platform's installer step.
//!
//! # Module Organization
//!
//! - [`manifest`] - prefix stack, copy rules, symlinks, generated files
//! - [`settings`] - validated run configuration and derived names
//! - [`platform`] - per-OS file lists and installer steps
//! - [`builder`] - the [`Bundler`] orchestrator, checksums, tool checks
//! - [`utils`] - filesystem, process and retry helpers
//! - [`error`] - the [`Error`] type shared by all of the above

pub mod builder;
pub mod error;
pub mod manifest;
pub mod platform;
pub mod settings;
pub mod utils;

pub use builder::Bundler;
pub use error::{Error, Result};
pub use manifest::{ManifestBuilder, ManifestEntry, Scope, SymlinkRequest};
pub use platform::{Packager, PlatformPackager};
pub use settings::{
    Action, AddressSize, Arch, ChannelType, Platform, Settings, SettingsBuilder, Version,
};

use std::path::PathBuf;

/// Outcome of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundledArtifact {
    /// The installer, or the staging directory when nothing was packaged
    pub path: PathBuf,
    /// Size in bytes (summed over files for a directory)
    pub size: u64,
    /// Hex-encoded SHA-256
    pub checksum: String,
    /// Number of files staged
    pub manifest_len: usize,
    /// Whether an installer step ran
    pub packaged: bool,
}
