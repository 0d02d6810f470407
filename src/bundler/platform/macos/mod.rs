//! macOS app bundle layout and disk image packaging.
//!
//! The `.app` produced by the build is the staging root. Everything else
//! is layered into its `Contents` directory; helper apps nested under
//! `Contents/Resources` reach the shared libraries and the CEF framework
//! through relative symlinks so the bundle stays relocatable.

pub mod dmg;
pub mod dylib;
pub mod sign;

use super::{BuildLayout, PlatformPackager, common};
use crate::bundler::{
    error::Result,
    manifest::{ManifestBuilder, Scope, SymlinkRequest},
    platform::common::BuildData,
    settings::{Action, Settings},
    utils::process::run_command_blocking,
};
use dylib::{RememberedLibs, change_cef_install_name};
use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

/// Framework directory name shared by the viewer and its helpers.
pub const CEF_FRAMEWORK: &str = "Chromium Embedded Framework.framework";

/// Translations shipped besides English.
const LPROJ: [&str; 15] = [
    "German", "Japanese", "Korean", "da", "es", "fr", "hu", "it", "nl", "pl", "pt", "ru", "tr",
    "uk", "zh-Hans",
];

/// Libraries the helper apps load, linked into each of them.
const SHARED_DYLIBS: [&str; 9] = [
    "libapr-1.0.dylib",
    "libaprutil-1.0.dylib",
    "libcollada14dom.dylib",
    "libexpat.1.dylib",
    "libexception_handler.dylib",
    "libGLOD.dylib",
    // the unversioned name links to the major, which links to the full version
    "libnghttp2.*dylib",
    "libgrowl.dylib",
    "libgrowl++.dylib",
];

/// Voice runtime, used only by the viewer itself.
const VOICE_FILES: [&str; 8] = [
    "libalut.dylib",
    "libopenal.dylib",
    "libortp.dylib",
    "libsndfile.dylib",
    "libvivoxoal.dylib",
    "libvivoxsdk.dylib",
    "libvivoxplatform.dylib",
    "SLVoice",
];

/// Nested apps and the build directories they come from.
const HELPER_APPS: [(&str, &str); 2] = [
    ("mac_crash_logger", "mac-crash-logger.app"),
    ("llplugin/slplugin", "SLPlugin.app"),
];

#[derive(Debug)]
pub struct DarwinPackager<'a> {
    settings: &'a Settings,
}

impl<'a> DarwinPackager<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Libraries whose build flavour follows the configuration.
    fn collect_fmod(
        &self,
        libs: &mut RememberedLibs,
        m: &mut ManifestBuilder,
        layout: &BuildLayout,
    ) -> Result<()> {
        let (dir, suffix) = if self.settings.is_debug_configuration() {
            (layout.debug_libs(), "L")
        } else {
            (layout.release_libs(), "")
        };
        for base in ["libfmod", "libfmodex"] {
            let lib = format!("{base}{suffix}.dylib");
            libs.path_optional(m, dir.join(&lib), &lib)?;
        }
        Ok(())
    }

    fn collect_resources(&self, m: &mut ManifestBuilder, layout: &BuildLayout) -> Result<()> {
        let settings = self.settings;
        let config = settings.configuration();
        let relpkgdir = layout.release_libs();

        common::collect_viewer_resources(self, m)?;

        m.with_prefix(Scope::src_dst("cursors_mac"), |m| m.path("*.tif"))?;
        m.path_to("licenses-mac.txt", "licenses.txt")?;
        m.path("featuretable_mac.txt")?;
        m.path("VivoxAUP.txt")?;
        m.with_prefix(Scope::src(&layout.packages), |m| m.path("ca-bundle.crt"))?;
        m.with_prefix(Scope::src(settings.icon_path()), |m| m.path("firestorm_icon.icns"))?;
        m.path("Firestorm.nib")?;

        m.path("English.lproj/language.txt")?;
        let version = settings.version().to_string();
        m.replace_in(
            "English.lproj/InfoPlist.strings",
            None,
            [("%%VERSION%%", version.as_str())],
        )?;
        for lang in LPROJ {
            m.path(format!("{lang}.lproj"))?;
        }

        let mut libs = RememberedLibs::new();
        let llcommon = m.find_existing_file([
            Path::new("../llcommon").join(config).join("libllcommon.dylib"),
            relpkgdir.join("libllcommon.dylib"),
        ])?;
        libs.path_optional(m, llcommon, "libllcommon.dylib")?;
        for lib in SHARED_DYLIBS {
            libs.path_optional(m, relpkgdir.join(lib), lib)?;
        }

        for file in VOICE_FILES {
            m.path2basename(&relpkgdir, file)?;
        }
        if settings.is_opensim() {
            m.with_prefix(Scope::src(relpkgdir.join("voice_os")).and_dst("voice_os"), |m| {
                for file in VOICE_FILES {
                    m.path(file)?;
                }
                Ok(())
            })?;
            m.with_prefix(Scope::src(&layout.packages).and_dst("voice_os"), |m| {
                m.path("ca-bundle.crt")
            })?;
        }

        self.collect_fmod(&mut libs, m, layout)?;

        for (build_dir, app) in HELPER_APPS {
            m.path2basename(Path::new("..").join(build_dir).join(config), app)?;
            libs.link_into(m, app)?;
        }

        let bin_x86 = layout.packages.join("bin_x86");
        m.with_prefix(Scope::src(&bin_x86), |m| {
            m.path("SLPlugin.app")?;
            let mut plugins = m.prefix(Scope::src_dst("llplugin"));
            plugins.path("media_plugin_quicktime.dylib")?;
            plugins.path("media_plugin_cef.dylib")?;
            Ok(())
        })?;

        // Dullahan's helper looks for CEF under its own MacOS directory
        m.with_prefix(Scope::dst("SLPlugin.app/Contents/Frameworks"), |m| {
            m.path2basename(&relpkgdir, "DullahanHelper.app")?;
            Ok(())
        })?;
        let helper_exe = m.dst_path_of(
            "SLPlugin.app/Contents/Frameworks/DullahanHelper.app/Contents/MacOS/DullahanHelper",
        );
        change_cef_install_name(
            &helper_exe,
            &format!("@executable_path/Frameworks/{CEF_FRAMEWORK}/Chromium Embedded Framework"),
        )?;

        m.with_prefix(Scope::dst("llplugin"), |m| {
            let media = Path::new("../media_plugins");
            m.path2basename(media.join("cef").join(config), "media_plugin_cef.dylib")?;
            m.path2basename(media.join("libvlc").join(config), "media_plugin_libvlc.dylib")?;
            m.with_prefix(Scope::src(&relpkgdir).and_dst("lib"), |m| m.path("libvlc*.dylib*"))?;
            m.with_prefix(Scope::src(relpkgdir.join("plugins")).and_dst("lib"), |m| {
                m.path("*.dylib")?;
                m.path("plugins.dat")
            })?;
            Ok(())
        })?;
        // only after the plugin itself is staged
        change_cef_install_name(
            &m.dst_path_of("llplugin/media_plugin_cef.dylib"),
            &format!("@executable_path/../Frameworks/{CEF_FRAMEWORK}/Chromium Embedded Framework"),
        )?;

        m.with_prefix(Scope::src(bin_x86.join("Frameworks")).and_dst("Frameworks"), |m| {
            m.path(CEF_FRAMEWORK)
        })?;
        Ok(())
    }

    /// Links the plugin app's framework to the viewer's, then Dullahan's
    /// helper to the plugin app's link. `contents` is `<app>/Contents`.
    ///
    /// Linking a whole `Frameworks` directory instead would make a cycle.
    fn link_cef_framework(&self, m: &ManifestBuilder, contents: &Path) -> Result<()> {
        let real = contents.join("Frameworks").join(CEF_FRAMEWORK);
        let plugin_frameworks = contents.join("Resources/SLPlugin.app/Contents/Frameworks");
        let plugin_link = plugin_frameworks.join(CEF_FRAMEWORK);
        let helper_link = plugin_frameworks
            .join("DullahanHelper.app/Contents/MacOS/Frameworks")
            .join(CEF_FRAMEWORK);

        m.relsymlinkf(SymlinkRequest::new(real).at(&plugin_link).strict())?;
        m.relsymlinkf(
            SymlinkRequest::new(&plugin_link)
                .at(helper_link)
                .keep_last()
                .strict(),
        )?;
        Ok(())
    }
}

/// Adds `BugsplatServerURL` for `database` to the plist at `path`.
pub fn add_bugsplat_url(path: &Path, database: &str) -> Result<()> {
    let mut info = plist::Value::from_file(path)?;
    if let Some(dict) = info.as_dictionary_mut() {
        dict.insert(
            "BugsplatServerURL".to_string(),
            plist::Value::String(format!("https://{database}.bugsplat.com/")),
        );
    } else {
        log::warn!("{} is not a dictionary; BugSplat URL not set", path.display());
        return Ok(());
    }
    info.to_file_xml(path)?;
    Ok(())
}

impl PlatformPackager for DarwinPackager<'_> {
    fn settings(&self) -> &Settings {
        self.settings
    }

    /// The full bundle is needed even for a debugging run.
    fn is_packaging_viewer(&self) -> bool {
        true
    }

    fn build_data(&self) -> BuildData {
        let mut data = BuildData::new(self.settings);
        data.bundle_id = self.settings.bundleid().map(str::to_string);
        data
    }

    fn collect_files(&self, manifest: &mut ManifestBuilder) -> Result<()> {
        let settings = self.settings;
        let layout = BuildLayout::new(settings);

        // no-op when the build already staged into the destination
        manifest.path_to(Path::new(settings.configuration()).join("Firestorm.app"), "")?;

        {
            let mut contents = manifest.prefix(Scope::dst("Contents"));
            let info = contents.path("Info.plist")?;
            if let (Some(db), Some(plist)) = (settings.bugsplat(), info.dests().first()) {
                add_bugsplat_url(plist, db)?;
            }

            let relpkgdir = layout.release_libs();
            contents.path_to(relpkgdir.join("libndofdev.dylib"), "Resources/libndofdev.dylib")?;
            contents.path_to(
                relpkgdir.join("libhunspell-1.3.0.dylib"),
                "Resources/libhunspell-1.3.0.dylib",
            )?;
            contents.path_to("../packages/Frameworks/Growl", "Frameworks/Growl")?;

            contents.with_prefix(Scope::dst("Resources"), |m| self.collect_resources(m, &layout))?;
            contents.with_prefix(Scope::dst("Frameworks"), |m| {
                m.path2basename(&relpkgdir, CEF_FRAMEWORK)?;
                Ok(())
            })?;

            let root = contents.current().dest_root.clone();
            self.link_cef_framework(&contents, &root)?;
        }

        // -S keeps enough symbols for annotated crash backtraces
        if settings.has_action(Action::Package) || settings.has_action(Action::Unpacked) {
            let viewer = manifest.dst_path_of("Contents/MacOS/Firestorm");
            run_command_blocking("strip", [OsStr::new("-S"), viewer.as_os_str()])?;
        }
        Ok(())
    }

    async fn package_finish(&self, manifest: &mut ManifestBuilder) -> Result<PathBuf> {
        dmg::build_disk_image(self.settings, manifest).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{Platform, SettingsBuilder};
    use std::fs;

    #[test]
    fn bugsplat_url_is_added_to_info_plist() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Info.plist");
        let mut dict = plist::Dictionary::new();
        dict.insert("CFBundleName".into(), plist::Value::String("Firestorm".into()));
        plist::Value::Dictionary(dict).to_file_xml(&path).unwrap();

        add_bugsplat_url(&path, "firestorm_release").unwrap();

        let info = plist::Value::from_file(&path).unwrap();
        let dict = info.as_dictionary().unwrap();
        assert_eq!(
            dict.get("BugsplatServerURL").and_then(plist::Value::as_string),
            Some("https://firestorm_release.bugsplat.com/")
        );
        assert_eq!(
            dict.get("CFBundleName").and_then(plist::Value::as_string),
            Some("Firestorm")
        );
    }

    #[test]
    fn build_data_carries_bundle_id() {
        let settings = SettingsBuilder::new()
            .platform(Platform::Darwin)
            .arch("x86_64".parse().unwrap())
            .source("s")
            .build_dir("b")
            .dest("d")
            .version("7.1.9.74745".parse().unwrap())
            .channel("Firestorm-Release")
            .bundleid("com.phoenixviewer.firestorm.viewer-release")
            .build()
            .unwrap();
        let packager = DarwinPackager::new(&settings);
        assert!(packager.is_packaging_viewer());
        let json = serde_json::to_value(packager.build_data()).unwrap();
        assert_eq!(json["Platform"], "mac");
        assert_eq!(json["Bundle Id"], "com.phoenixviewer.firestorm.viewer-release");
        assert!(json.get("Executable").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn plugin_app_reaches_cef_through_relative_links() {
        let tmp = tempfile::tempdir().unwrap();
        let contents = tmp.path().join("stage/Contents");
        fs::create_dir_all(contents.join("Frameworks").join(CEF_FRAMEWORK)).unwrap();
        fs::write(contents.join("Frameworks").join(CEF_FRAMEWORK).join("marker"), "cef").unwrap();
        fs::create_dir_all(contents.join("Resources/SLPlugin.app/Contents/Frameworks")).unwrap();

        let settings = SettingsBuilder::new()
            .platform(Platform::Darwin)
            .arch("x86_64".parse().unwrap())
            .source(tmp.path().join("src"))
            .build_dir(tmp.path().join("build"))
            .dest(tmp.path().join("stage"))
            .version("7.1.9.74745".parse().unwrap())
            .channel("Firestorm-Release")
            .build()
            .unwrap();
        let manifest = ManifestBuilder::new(
            settings.source_dir(),
            settings.build_dir(),
            settings.dest_dir(),
        );
        let packager = DarwinPackager::new(&settings);
        let contents = fs::canonicalize(&contents).unwrap();
        packager.link_cef_framework(&manifest, &contents).unwrap();

        let plugin_link = contents
            .join("Resources/SLPlugin.app/Contents/Frameworks")
            .join(CEF_FRAMEWORK);
        assert_eq!(
            fs::read_link(&plugin_link).unwrap(),
            Path::new("../../../../Frameworks").join(CEF_FRAMEWORK)
        );
        let helper_link = plugin_link
            .parent()
            .unwrap()
            .join("DullahanHelper.app/Contents/MacOS/Frameworks")
            .join(CEF_FRAMEWORK);
        assert_eq!(
            fs::read_link(&helper_link).unwrap(),
            Path::new("../../../..").join(CEF_FRAMEWORK)
        );
        assert_eq!(fs::read_to_string(helper_link.join("marker")).unwrap(), "cef");
    }
}
