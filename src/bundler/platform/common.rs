//! Viewer resources shared by every platform, and the build-data sidecar.

use super::{BuildLayout, PlatformPackager};
use crate::bundler::{
    Result,
    error::ErrorExt,
    manifest::{ManifestBuilder, Scope},
    settings::Settings,
};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::{collections::BTreeMap, fs, path::Path};

/// Chromium locale packs shipped with the CEF runtime.
pub const CEF_LOCALES: [&str; 53] = [
    "am", "ar", "bg", "bn", "ca", "cs", "da", "de", "el", "en-GB", "en-US", "es-419", "es", "et",
    "fa", "fi", "fil", "fr", "gu", "he", "hi", "hr", "hu", "id", "it", "ja", "kn", "ko", "lt",
    "lv", "ml", "mr", "ms", "nb", "nl", "pl", "pt-BR", "pt-PT", "ro", "ru", "sk", "sl", "sr",
    "sv", "sw", "ta", "te", "th", "tr", "uk", "vi", "zh-CN", "zh-TW",
];

/// Contents of `build_data.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BuildData {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Channel Base")]
    pub channel_base: String,
    #[serde(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Address Size")]
    pub address_size: u32,
    #[serde(rename = "Update Service")]
    pub update_service: String,
    #[serde(rename = "BugSplat DB", skip_serializing_if = "Option::is_none")]
    pub bugsplat_db: Option<String>,
    /// Windows only: the renamed viewer executable
    #[serde(rename = "Executable", skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
    /// macOS only
    #[serde(rename = "Bundle Id", skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
}

impl BuildData {
    pub fn new(settings: &Settings) -> Self {
        Self {
            kind: "viewer".into(),
            version: settings.version().to_string(),
            channel_base: settings.vendor_base().to_string(),
            channel: settings.channel_with_suffix(),
            platform: settings.platform().build_data_name().to_string(),
            address_size: settings.address_size().bits(),
            update_service: settings.update_service().to_string(),
            bugsplat_db: settings.bugsplat().map(str::to_string),
            executable: None,
            bundle_id: None,
        }
    }
}

/// Stages the resources every platform ships, relative to the current
/// prefix of `manifest`.
pub fn collect_viewer_resources<P: PlatformPackager + ?Sized>(
    packager: &P,
    manifest: &mut ManifestBuilder,
) -> Result<()> {
    let settings = packager.settings();
    let layout = BuildLayout::new(settings);

    manifest.path_to(
        "../../scripts/messages/message_template.msg",
        "app_settings/message_template.msg",
    )?;
    manifest.path_to("../../etc/message.xml", "app_settings/message.xml")?;
    {
        let mut dicts = manifest.prefix(Scope::src(&layout.packages).and_dst("app_settings"));
        dicts.path("dictionaries")?;
    }

    if !packager.is_packaging_viewer() {
        return Ok(());
    }

    {
        let mut app_settings = manifest.prefix(Scope::src_dst("app_settings"));
        app_settings.exclude("logcontrol.xml")?;
        app_settings.exclude("logcontrol-dev.xml")?;
        for pattern in ["*.ini", "*.xml", "*.db2", "shaders"] {
            app_settings.path(pattern)?;
        }

        let contributions = settings.source_dir().join("../../doc/contributions.txt");
        let names = extract_names(&contributions)?;
        app_settings.put_in_file(names.join(", "), "contributors.txt", "contributions.txt")?;

        for dir in ["windlight", "filters", "beams", "beamsColors"] {
            app_settings.path(dir)?;
        }
        app_settings.path_to(layout.build.join("packages-info.txt"), "packages-info.txt")?;

        let install = settings_install_xml(settings);
        app_settings.put_in_file(install, "settings_install.xml", "environment")?;
    }

    {
        let mut character = manifest.prefix(Scope::src_dst("character"));
        for pattern in ["*.llm", "*.xml", "*.tga"] {
            character.path(pattern)?;
        }
    }
    {
        let mut fonts = manifest.prefix(Scope::src_dst("fonts"));
        for pattern in ["*.ttf", "*.txt", "*.xml"] {
            fonts.path(pattern)?;
        }
    }
    {
        let mut fs_resources = manifest.prefix(Scope::src_dst("fs_resources"));
        for pattern in ["*.txt", "*.lsl", "*.lsltxt"] {
            fs_resources.path(pattern)?;
        }
    }

    collect_skins(manifest)?;

    {
        let mut local_assets = manifest.prefix(Scope::src_dst("local_assets"));
        local_assets.path("*.j2c")?;
        local_assets.path("*.tga")?;
    }

    manifest.path("gpu_table.txt")?;

    let build_data = serde_json::to_string(&packager.build_data())?;
    manifest.put_in_file(build_data, "build_data.json", "build data")?;
    Ok(())
}

const IMAGE_PATTERNS: [&str; 8] = [
    "*/*.tga", "*/*.j2c", "*/*.jpg", "*/*.png", "*.tga", "*.j2c", "*.jpg", "*.png",
];

fn collect_skins(manifest: &mut ManifestBuilder) -> Result<()> {
    let mut skins = manifest.prefix(Scope::src_dst("skins"));
    skins.path("skins.xml")?;
    {
        let mut textures = skins.prefix(Scope::src_dst("*/textures"));
        for pattern in IMAGE_PATTERNS {
            textures.path(pattern)?;
        }
        textures.path("textures.xml")?;
    }
    skins.path("*/xui/*/*.xml")?;
    skins.path("*/xui/*/widgets/*.xml")?;
    skins.path("*/themes/*/colors.xml")?;
    {
        let mut themes = skins.prefix(Scope::src_dst("*/themes/*/textures"));
        for pattern in IMAGE_PATTERNS {
            themes.path(pattern)?;
        }
    }
    skins.path("*/*.xml")?;

    // local html is no longer used; ship it renamed so it can be restored
    let mut html = skins.prefix(Scope::src("*/html").and_dst("*/html.old"));
    html.path("*.png")?;
    html.path("*/*/*.html")?;
    html.path("*/*/*.gif")?;
    Ok(())
}

/// Contributor names from `contributions.txt`, shuffled.
///
/// Everything up to the first blank line is header. After that, a line
/// starting with a non-blank character is a name; indented lines describe
/// contributions.
pub fn extract_names(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).fs_context("reading contributors", path)?;
    let mut names: Vec<String> = text
        .lines()
        .skip_while(|line| !line.trim().is_empty())
        .skip(1)
        .filter(|line| line.chars().next().is_some_and(|c| !c.is_whitespace()))
        .map(|line| line.trim_end().to_string())
        .collect();
    names.shuffle(&mut rand::thread_rng());
    Ok(names)
}

struct InstallSetting<'a> {
    comment: &'a str,
    persist: u8,
    value: String,
}

/// `settings_install.xml`: an LLSD map of the settings baked in at
/// packaging time. Empty when none apply.
pub fn settings_install_xml(settings: &Settings) -> String {
    let mut entries = BTreeMap::new();
    if let Some(sourceid) = settings.sourceid() {
        log::info!("Set sourceid in settings_install.xml to '{sourceid}'");
        entries.insert(
            "sourceid",
            InstallSetting {
                comment: "Identify referring agency to Linden web servers",
                persist: 1,
                value: sourceid.to_string(),
            },
        );
    }
    if settings.channel_suffix().is_some() {
        let channel = settings.channel_with_suffix();
        log::info!("Set CmdLineChannel in settings_install.xml to '{channel}'");
        entries.insert(
            "CmdLineChannel",
            InstallSetting {
                comment: "Command line specified channel name",
                persist: 0,
                value: channel,
            },
        );
    }
    if let Some(grid) = settings.grid() {
        log::info!("Set CmdLineGridChoice in settings_install.xml to '{grid}'");
        entries.insert(
            "CmdLineGridChoice",
            InstallSetting {
                comment: "Default grid",
                persist: 0,
                value: grid.to_string(),
            },
        );
    }

    let mut xml = String::from("<?xml version=\"1.0\" ?>\n<llsd>\n<map>\n");
    for (key, setting) in &entries {
        xml.push_str(&format!("  <key>{}</key>\n  <map>\n", escape_xml(key)));
        xml.push_str(&format!(
            "    <key>Comment</key>\n    <string>{}</string>\n",
            escape_xml(setting.comment)
        ));
        xml.push_str(&format!(
            "    <key>Persist</key>\n    <integer>{}</integer>\n",
            setting.persist
        ));
        xml.push_str("    <key>Type</key>\n    <string>String</string>\n");
        xml.push_str(&format!(
            "    <key>Value</key>\n    <string>{}</string>\n  </map>\n",
            escape_xml(&setting.value)
        ));
    }
    xml.push_str("</map>\n</llsd>\n");
    xml
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{Platform, SettingsBuilder};

    fn settings() -> Settings {
        SettingsBuilder::new()
            .platform(Platform::Windows)
            .arch("i686".parse().unwrap())
            .source("s")
            .build_dir("b")
            .dest("d")
            .version("7.1.9.74745".parse().unwrap())
            .channel("Firestorm-Beta")
            .channel_suffix("x64")
            .grid("agni")
            .bugsplat("firestorm_db")
            .build()
            .unwrap()
    }

    #[test]
    fn build_data_uses_expected_keys() {
        let json = serde_json::to_value(BuildData::new(&settings())).unwrap();
        assert_eq!(json["Type"], "viewer");
        assert_eq!(json["Version"], "7.1.9.74745");
        assert_eq!(json["Channel Base"], "Firestorm");
        assert_eq!(json["Channel"], "Firestorm-Beta x64");
        assert_eq!(json["Platform"], "win");
        assert_eq!(json["Address Size"], 32);
        assert_eq!(json["Update Service"], "https://update.secondlife.com/update");
        assert_eq!(json["BugSplat DB"], "firestorm_db");
        assert!(json.get("Executable").is_none());
    }

    #[test]
    fn names_skip_header_and_descriptions() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("contributions.txt");
        fs::write(
            &path,
            "Header line\nmore header\n\nAlice Resident\n\tVWR-1\nBob Linden  \n    STORM-2\n",
        )
        .unwrap();
        let mut names = extract_names(&path).unwrap();
        names.sort();
        assert_eq!(names, ["Alice Resident", "Bob Linden"]);
    }

    #[test]
    fn settings_install_lists_supplied_values() {
        let xml = settings_install_xml(&settings());
        assert!(xml.contains("<key>CmdLineChannel</key>"));
        assert!(xml.contains("<string>Firestorm-Beta x64</string>"));
        assert!(xml.contains("<key>CmdLineGridChoice</key>"));
        assert!(!xml.contains("sourceid"));
        assert!(xml.starts_with("<?xml"));
    }
}
