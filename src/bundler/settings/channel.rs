//! Names derived from the channel: app name, icon directory, installer
//! base name.

use super::Settings;
use std::fmt;

/// Release track a channel belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChannelType {
    Release,
    Beta,
    Nightly,
    Private,
}

impl ChannelType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelType::Release => "release",
            ChannelType::Beta => "beta",
            ChannelType::Nightly => "nightly",
            ChannelType::Private => "private",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn words_joined(s: &str, sep: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(sep)
}

impl Settings {
    /// Channel plus the package suffix, space separated.
    pub fn channel_with_suffix(&self) -> String {
        match self.channel_suffix() {
            Some(suffix) if !suffix.is_empty() => format!("{} {}", self.channel, suffix),
            _ => self.channel.clone(),
        }
    }

    /// The channel with the vendor base removed: `Firestorm-Beta` → `Beta`.
    pub fn channel_variant(&self) -> String {
        self.channel
            .replace(&self.vendor_base, "")
            .trim_matches(|c: char| c.is_whitespace() || c == '-')
            .to_string()
    }

    pub fn channel_type(&self) -> ChannelType {
        let variant = self.channel_variant().to_lowercase();
        if variant.starts_with("release") {
            ChannelType::Release
        } else if variant.starts_with("beta") {
            ChannelType::Beta
        } else if variant.starts_with("nightly") {
            ChannelType::Nightly
        } else {
            ChannelType::Private
        }
    }

    /// Variant words joined with `_`, without `Release` on the release
    /// track, followed by the words of the package suffix.
    pub fn channel_variant_app_suffix(&self) -> String {
        let mut suffix = self.channel_variant();
        if self.channel_type() == ChannelType::Release {
            suffix = suffix.replace("Release", "").trim().to_string();
        }
        let mut parts = vec![words_joined(&suffix, "_")];
        parts.extend(
            self.channel_suffix()
                .unwrap_or_default()
                .split_whitespace()
                .map(str::to_string),
        );
        parts.join("_")
    }

    /// Application name: `FirestormViewer` on the release track, vendor
    /// base plus variant otherwise, with `OS` after the vendor base for
    /// OpenSim builds.
    pub fn app_name(&self) -> String {
        let mut suffix = match self.channel_type() {
            ChannelType::Release => "Viewer".to_string(),
            _ => self.channel_variant(),
        };
        if self.opensim {
            suffix.insert_str(0, "OS");
        }
        format!("{}{}", self.vendor_base, suffix)
    }

    /// [`Self::app_name`] with all whitespace removed.
    pub fn app_name_oneword(&self) -> String {
        words_joined(&self.app_name(), "")
    }

    /// Icon directory relative to the source tree.
    pub fn icon_path(&self) -> String {
        let os = if self.opensim { "-os" } else { "" };
        format!("icons/{}{os}", self.channel_type())
    }

    /// `Phoenix-<vendor>[OS]<variant>_<version>_<arch>`.
    pub fn installer_base_name(&self) -> String {
        let mut base = format!("Phoenix-{}", self.vendor_base);
        if self.opensim {
            base.push_str("OS");
        }
        format!(
            "{}{}_{}_{}",
            words_joined(&base, "_"),
            self.channel_variant_app_suffix(),
            self.version.underscored(),
            self.arch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{Platform, SettingsBuilder};

    fn settings(channel: &str, opensim: bool, suffix: Option<&str>) -> Settings {
        let mut b = SettingsBuilder::new()
            .platform(Platform::Windows)
            .arch("x86_64".parse().unwrap())
            .source("src")
            .build_dir("build")
            .dest("dst")
            .version("7.1.9.74745".parse().unwrap())
            .channel(channel)
            .opensim(opensim);
        if let Some(s) = suffix {
            b = b.channel_suffix(s);
        }
        b.build().unwrap()
    }

    #[test]
    fn release_channel_uses_viewer_suffix() {
        let s = settings("Firestorm-Release", false, None);
        assert_eq!(s.channel_variant(), "Release");
        assert_eq!(s.channel_type(), ChannelType::Release);
        assert_eq!(s.app_name(), "FirestormViewer");
        assert_eq!(s.icon_path(), "icons/release");
        assert_eq!(s.channel_variant_app_suffix(), "");
        assert_eq!(
            s.installer_base_name(),
            "Phoenix-Firestorm_7_1_9_74745_x86_64"
        );
    }

    #[test]
    fn opensim_beta_inserts_os() {
        let s = settings("Firestorm-Beta", true, None);
        assert_eq!(s.channel_type(), ChannelType::Beta);
        assert_eq!(s.app_name(), "FirestormOSBeta");
        assert_eq!(s.icon_path(), "icons/beta-os");
        assert!(s.installer_base_name().starts_with("Phoenix-FirestormOSBeta_"));
    }

    #[test]
    fn unknown_variant_is_private_and_suffix_is_appended() {
        let s = settings("Firestorm Private Tester", false, Some("extra pkg"));
        assert_eq!(s.channel_type(), ChannelType::Private);
        assert_eq!(s.app_name(), "FirestormPrivate Tester");
        assert_eq!(s.app_name_oneword(), "FirestormPrivateTester");
        assert_eq!(s.channel_variant_app_suffix(), "Private_Tester_extra_pkg");
        assert_eq!(s.channel_with_suffix(), "Firestorm Private Tester extra pkg");
    }
}
