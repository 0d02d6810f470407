//! Command line argument parsing and validation.
//!
//! Every flag can also be supplied through a `VIEWER_*` environment
//! variable. Flags and variables win over values read from `--config`.

use crate::bundler::{
    Action, Arch, Platform, SettingsBuilder, Version, settings::SettingsFile,
};
use crate::error::{CliError, Result};
use clap::Parser;
use std::path::PathBuf;

/// Stages a built viewer and packages it for distribution
#[derive(Parser, Debug)]
#[command(
    name = "viewer_manifest",
    version,
    about = "Stages a built viewer and packages it for distribution",
    long_about = "Copies the files of a compiled viewer from the source and build trees into a
staging directory, then builds the platform installer from it:
an NSIS setup executable on Windows, a disk image on macOS and a tarball on Linux.

Usage:
  viewer_manifest --platform linux --arch x86_64 --source indra/newview \\
      --build build-linux-x86_64/newview --dest build-linux-x86_64/newview/packaged \\
      --viewer-version 7.1.9.74745 --channel Firestorm-Release
  viewer_manifest --config viewer.toml --actions copy

Exit code 0 = every requested action completed."
)]
pub struct Args {
    /// Settings file (TOML) supplying defaults for any flag not given
    #[arg(short = 'c', long, value_name = "FILE", env = "VIEWER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Target platform: windows, darwin or linux (defaults to the host)
    #[arg(short, long, value_name = "PLATFORM", env = "VIEWER_PLATFORM")]
    pub platform: Option<String>,

    /// CPU architecture of the build: i686, x86_64 or universal
    #[arg(short, long, value_name = "ARCH", env = "VIEWER_ARCH")]
    pub arch: Option<String>,

    /// Viewer source directory (indra/newview)
    #[arg(short, long, value_name = "DIR", env = "VIEWER_SOURCE")]
    pub source: Option<PathBuf>,

    /// Build output directory holding the compiled binaries
    #[arg(short, long, value_name = "DIR", env = "VIEWER_BUILD")]
    pub build: Option<PathBuf>,

    /// Staging directory to populate
    #[arg(short, long, value_name = "DIR", env = "VIEWER_DEST")]
    pub dest: Option<PathBuf>,

    /// Build configuration (Debug, RelWithDebInfo, Release)
    #[arg(long, value_name = "NAME", env = "VIEWER_CONFIGURATION")]
    pub configuration: Option<String>,

    /// Build type; binaries are only stripped and archived for Release
    #[arg(long, value_name = "TYPE", env = "VIEWER_BUILDTYPE")]
    pub buildtype: Option<String>,

    /// Steps to run, comma separated
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        value_name = "ACTION",
        env = "VIEWER_ACTIONS"
    )]
    pub actions: Vec<Action>,

    /// Four-part viewer version, e.g. 7.1.9.74745
    #[arg(long = "viewer-version", value_name = "VERSION", env = "VIEWER_VERSION")]
    pub viewer_version: Option<String>,

    /// File containing the four-part viewer version
    #[arg(
        long,
        value_name = "FILE",
        env = "VIEWER_VERSIONFILE",
        conflicts_with = "viewer_version"
    )]
    pub versionfile: Option<PathBuf>,

    /// Channel name, e.g. Firestorm-Release
    #[arg(long, value_name = "NAME", env = "VIEWER_CHANNEL")]
    pub channel: Option<String>,

    /// Suffix appended to the channel name
    #[arg(long = "channel-suffix", value_name = "SUFFIX", env = "VIEWER_CHANNEL_SUFFIX")]
    pub channel_suffix: Option<String>,

    /// Default grid recorded in settings_install.xml
    #[arg(long, value_name = "GRID", env = "VIEWER_GRID")]
    pub grid: Option<String>,

    /// Source id recorded in settings_install.xml
    #[arg(long, value_name = "ID", env = "VIEWER_SOURCEID")]
    pub sourceid: Option<String>,

    /// Code signing identity; signing is skipped when absent
    #[arg(long, value_name = "IDENTITY", env = "VIEWER_SIGNATURE")]
    pub signature: Option<String>,

    /// BugSplat database to which to post crashes
    #[arg(long, value_name = "DB", env = "VIEWER_BUGSPLAT")]
    pub bugsplat: Option<String>,

    /// macOS bundle identifier
    #[arg(long, value_name = "ID", env = "VIEWER_BUNDLEID")]
    pub bundleid: Option<String>,

    /// Build targets OpenSim grids
    #[arg(long, env = "VIEWER_OPENSIM")]
    pub opensim: bool,

    /// Vendor prefix of the channel name
    #[arg(long = "vendor-base", value_name = "NAME", env = "VIEWER_VENDOR_BASE")]
    pub vendor_base: Option<String>,

    /// Update service URL recorded in build_data.json
    #[arg(long = "update-service", value_name = "URL", env = "VIEWER_UPDATE_SERVICE")]
    pub update_service: Option<String>,

    /// Log per-file detail
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Layers the flags over `--config` into a settings builder.
    ///
    /// Values are parsed here so a bad flag is reported as a
    /// [`CliError::InvalidArguments`] naming the flag.
    pub fn to_builder(&self) -> Result<SettingsBuilder> {
        let mut builder = SettingsBuilder::new();

        let platform = match &self.platform {
            Some(p) => Some(p.parse::<Platform>().map_err(|e| invalid("--platform", e))?),
            None => None,
        };
        // without a flag or file value, fall back to the host
        let file = match &self.config {
            Some(path) => Some(SettingsFile::load(path)?),
            None => None,
        };
        let file_platform = file.as_ref().and_then(|f| f.platform);
        if let Some(platform) = platform.or(file_platform).or_else(Platform::host) {
            builder = builder.platform(platform);
        }

        if let Some(arch) = &self.arch {
            builder = builder.arch(arch.parse::<Arch>().map_err(|e| invalid("--arch", e))?);
        }
        if let Some(version) = self.version()? {
            builder = builder.version(version);
        }
        if !self.actions.is_empty() {
            builder = builder.actions(self.actions.clone());
        }
        if self.opensim {
            builder = builder.opensim(true);
        }

        if let Some(v) = &self.source {
            builder = builder.source(v);
        }
        if let Some(v) = &self.build {
            builder = builder.build_dir(v);
        }
        if let Some(v) = &self.dest {
            builder = builder.dest(v);
        }

        let strings: [(&Option<String>, fn(SettingsBuilder, String) -> SettingsBuilder); 11] = [
            (&self.configuration, |b, v| b.configuration(v)),
            (&self.buildtype, |b, v| b.buildtype(v)),
            (&self.channel, |b, v| b.channel(v)),
            (&self.channel_suffix, |b, v| b.channel_suffix(v)),
            (&self.grid, |b, v| b.grid(v)),
            (&self.sourceid, |b, v| b.sourceid(v)),
            (&self.signature, |b, v| b.signature(v)),
            (&self.bugsplat, |b, v| b.bugsplat(v)),
            (&self.bundleid, |b, v| b.bundleid(v)),
            (&self.vendor_base, |b, v| b.vendor_base(v)),
            (&self.update_service, |b, v| b.update_service(v)),
        ];
        for (value, set) in strings {
            if let Some(value) = value {
                builder = set(builder, value.clone());
            }
        }

        Ok(match file {
            Some(file) => builder.defaults_from(file),
            None => builder,
        })
    }

    fn version(&self) -> Result<Option<Version>> {
        let text = match (&self.viewer_version, &self.versionfile) {
            (Some(v), _) => v.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)?,
            (None, None) => return Ok(None),
        };
        let version = text
            .trim()
            .parse::<Version>()
            .map_err(|e| invalid("--viewer-version", e))?;
        Ok(Some(version))
    }
}

fn invalid(flag: &str, err: impl std::fmt::Display) -> CliError {
    CliError::InvalidArguments {
        reason: format!("{flag}: {err}"),
    }
}
