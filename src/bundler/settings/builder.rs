//! Builder for constructing Settings.

use super::{Action, Arch, Platform, Settings, Version};
use crate::bundler::error::{Error, ErrorExt, Result};
use path_absolutize::Absolutize;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Vendor prefix of every channel name.
pub const DEFAULT_VENDOR_BASE: &str = "Firestorm";

/// Update service recorded in the build-data sidecar.
pub const DEFAULT_UPDATE_SERVICE: &str = "https://update.secondlife.com/update";

/// Builder for constructing [`Settings`].
///
/// Required: `platform`, `arch`, `source`, `build_dir`, `dest`, `version`,
/// `channel`. Everything else has a default applied in [`Self::build`].
///
/// Values set on the builder win over values from a [`SettingsFile`]
/// merged with [`Self::defaults_from`].
#[derive(Clone, Debug, Default)]
pub struct SettingsBuilder {
    platform: Option<Platform>,
    arch: Option<Arch>,
    source: Option<PathBuf>,
    build: Option<PathBuf>,
    dest: Option<PathBuf>,
    configuration: Option<String>,
    buildtype: Option<String>,
    actions: Option<Vec<Action>>,
    version: Option<Version>,
    channel: Option<String>,
    channel_suffix: Option<String>,
    grid: Option<String>,
    sourceid: Option<String>,
    signature: Option<String>,
    bugsplat: Option<String>,
    bundleid: Option<String>,
    opensim: Option<bool>,
    vendor_base: Option<String>,
    update_service: Option<String>,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn arch(mut self, arch: Arch) -> Self {
        self.arch = Some(arch);
        self
    }

    /// Sets the source tree (`indra/newview`).
    ///
    /// # Required
    pub fn source<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the build tree holding compiled binaries.
    ///
    /// # Required
    pub fn build_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.build = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the staging directory.
    ///
    /// # Required
    pub fn dest<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.dest = Some(path.as_ref().to_path_buf());
        self
    }

    /// Default: `RelWithDebInfo`
    pub fn configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = Some(configuration.into());
        self
    }

    /// Default: `Release`
    pub fn buildtype(mut self, buildtype: impl Into<String>) -> Self {
        self.buildtype = Some(buildtype.into());
        self
    }

    /// Default: `[copy, package]`
    pub fn actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn channel_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.channel_suffix = Some(suffix.into());
        self
    }

    pub fn grid(mut self, grid: impl Into<String>) -> Self {
        self.grid = Some(grid.into());
        self
    }

    pub fn sourceid(mut self, sourceid: impl Into<String>) -> Self {
        self.sourceid = Some(sourceid.into());
        self
    }

    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn bugsplat(mut self, db: impl Into<String>) -> Self {
        self.bugsplat = Some(db.into());
        self
    }

    pub fn bundleid(mut self, id: impl Into<String>) -> Self {
        self.bundleid = Some(id.into());
        self
    }

    pub fn opensim(mut self, opensim: bool) -> Self {
        self.opensim = Some(opensim);
        self
    }

    /// Default: `Firestorm`
    pub fn vendor_base(mut self, vendor: impl Into<String>) -> Self {
        self.vendor_base = Some(vendor.into());
        self
    }

    /// Default: [`DEFAULT_UPDATE_SERVICE`]
    pub fn update_service(mut self, url: impl Into<String>) -> Self {
        self.update_service = Some(url.into());
        self
    }

    /// Fills every unset value from `file`.
    pub fn defaults_from(mut self, file: SettingsFile) -> Self {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }
        fill(&mut self.platform, file.platform);
        fill(&mut self.arch, file.arch);
        fill(&mut self.source, file.source);
        fill(&mut self.build, file.build);
        fill(&mut self.dest, file.dest);
        fill(&mut self.configuration, file.configuration);
        fill(&mut self.buildtype, file.buildtype);
        fill(&mut self.actions, file.actions);
        fill(&mut self.version, file.version);
        fill(&mut self.channel, file.channel);
        fill(&mut self.channel_suffix, file.channel_suffix);
        fill(&mut self.grid, file.grid);
        fill(&mut self.sourceid, file.sourceid);
        fill(&mut self.signature, file.signature);
        fill(&mut self.bugsplat, file.bugsplat);
        fill(&mut self.bundleid, file.bundleid);
        fill(&mut self.opensim, file.opensim);
        fill(&mut self.vendor_base, file.vendor_base);
        fill(&mut self.update_service, file.update_service);
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSettings`] naming the first missing required key,
    /// or when the channel is empty or no action was requested.
    pub fn build(self) -> Result<Settings> {
        fn required<T>(value: Option<T>, key: &str) -> Result<T> {
            value.ok_or_else(|| Error::InvalidSettings(format!("{key} is required")))
        }
        // empty strings from env vars count as unset
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let channel = required(non_empty(self.channel), "channel")?;
        let actions = self
            .actions
            .unwrap_or_else(|| vec![Action::Copy, Action::Package]);
        if actions.is_empty() {
            return Err(Error::InvalidSettings("at least one action is required".into()));
        }

        Ok(Settings {
            platform: required(self.platform, "platform")?,
            arch: required(self.arch, "arch")?,
            source: absolute(required(self.source, "source")?)?,
            build: absolute(required(self.build, "build")?)?,
            dest: absolute(required(self.dest, "dest")?)?,
            configuration: non_empty(self.configuration)
                .unwrap_or_else(|| "RelWithDebInfo".to_string()),
            buildtype: non_empty(self.buildtype).unwrap_or_else(|| "Release".to_string()),
            actions,
            version: required(self.version, "version")?,
            channel,
            channel_suffix: non_empty(self.channel_suffix),
            grid: non_empty(self.grid),
            sourceid: non_empty(self.sourceid),
            signature: non_empty(self.signature),
            bugsplat: non_empty(self.bugsplat),
            bundleid: non_empty(self.bundleid),
            opensim: self.opensim.unwrap_or(false),
            vendor_base: non_empty(self.vendor_base)
                .unwrap_or_else(|| DEFAULT_VENDOR_BASE.to_string()),
            update_service: non_empty(self.update_service)
                .unwrap_or_else(|| DEFAULT_UPDATE_SERVICE.to_string()),
        })
    }
}

fn absolute(path: PathBuf) -> Result<PathBuf> {
    Ok(path
        .absolutize()
        .fs_context("resolving directory", &path)?
        .into_owned())
}

/// On-disk form of the settings, read from a TOML file.
///
/// ```toml
/// platform = "linux"
/// arch = "x86_64"
/// source = "indra/newview"
/// build = "build-linux-x86_64/newview"
/// dest = "build-linux-x86_64/newview/packaged"
/// version = "7.1.9.74745"
/// channel = "Firestorm-Release"
/// actions = ["copy", "package"]
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    pub platform: Option<Platform>,
    pub arch: Option<Arch>,
    pub source: Option<PathBuf>,
    pub build: Option<PathBuf>,
    pub dest: Option<PathBuf>,
    pub configuration: Option<String>,
    pub buildtype: Option<String>,
    pub actions: Option<Vec<Action>>,
    pub version: Option<Version>,
    pub channel: Option<String>,
    pub channel_suffix: Option<String>,
    pub grid: Option<String>,
    pub sourceid: Option<String>,
    pub signature: Option<String>,
    pub bugsplat: Option<String>,
    pub bundleid: Option<String>,
    pub opensim: Option<bool>,
    pub vendor_base: Option<String>,
    pub update_service: Option<String>,
}

impl SettingsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).fs_context("reading settings file", path)?;
        Self::parse(&text).map_err(|e| match e {
            Error::InvalidSettings(msg) => {
                Error::InvalidSettings(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::InvalidSettings(e.to_string()))
    }
}
