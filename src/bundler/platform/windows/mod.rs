//! Windows staging and NSIS packaging.

pub mod nsis;
pub mod sign;

use super::{BuildLayout, PlatformPackager, common::{self, CEF_LOCALES}};
use crate::bundler::{
    error::Result,
    manifest::{ManifestBuilder, Scope},
    platform::common::BuildData,
    settings::{AddressSize, ChannelType, Settings},
};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct WindowsPackager<'a> {
    settings: &'a Settings,
}

impl<'a> WindowsPackager<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// The viewer executable is renamed after the channel's app name.
    pub fn final_exe(&self) -> String {
        format!("{}.exe", self.settings.app_name_oneword())
    }

    fn is_64bit(&self) -> bool {
        self.settings.address_size() == AddressSize::Bits64
    }

    fn collect_shared_libs(
        &self,
        manifest: &mut ManifestBuilder,
        layout: &BuildLayout,
    ) -> Result<()> {
        let settings = self.settings;
        let debug = settings.is_debug_configuration();
        let x64 = self.is_64bit();
        let mut libs = manifest.prefix(Scope::src(
            layout.sibling("sharedlibs").join(settings.configuration()),
        ));

        // absent when linked statically
        for lib in ["llcommon.dll", "libapr-1.dll", "libaprutil-1.dll", "libapriconv-1.dll"] {
            libs.path(lib)?;
        }
        libs.path("glod.dll")?;

        let fmod = match (debug, x64) {
            (true, true) => "fmodL64.dll",
            (true, false) => "fmodL.dll",
            (false, true) => "fmod64.dll",
            (false, false) => "fmod.dll",
        };
        if libs.path(fmod)?.is_missing() {
            log::info!("Skipping fmodstudio audio library (assuming other audio engine)");
        }
        if libs.path(if x64 { "fmodex64.dll" } else { "fmodex.dll" })?.is_missing() {
            log::info!("Skipping fmodex audio library (assuming other audio engine)");
        }

        libs.path("openjpeg.dll")?;
        if debug {
            libs.path("msvcr120d.dll")?;
            libs.path("msvcp120d.dll")?;
        } else {
            libs.path("msvcr120.dll")?;
            libs.path("msvcp120.dll")?;
        }

        libs.path("SLVoice.exe")?;
        if x64 {
            libs.path("vivoxsdk_x64.dll")?;
            libs.path("ortp_x64.dll")?;
        } else {
            libs.path("vivoxsdk.dll")?;
            libs.path("ortp.dll")?;
        }
        for lib in [
            "libsndfile-1.dll",
            "vivoxoal.dll",
            "ssleay32.dll",
            "libeay32.dll",
            "nghttp2.dll",
            "libhunspell.dll",
        ] {
            libs.path(lib)?;
        }

        if settings.bugsplat().is_some() {
            let bugsplat: [&str; 3] = if x64 {
                ["BsSndRpt64.exe", "BugSplat64.dll", "BugSplatRc64.dll"]
            } else {
                ["BsSndRpt.exe", "BugSplat.dll", "BugSplatRc.dll"]
            };
            for file in bugsplat {
                libs.path(file)?;
            }
        }

        libs.path("growl.dll")?;
        libs.path("growl++.dll")?;

        // symbols for crash reports
        libs.path("ssleay32.pdb")?;
        libs.path("libeay32.pdb")?;
        libs.path_to("apr-1.pdb", "libarp.pdb")?;
        libs.path_to("aprutil-1.pdb", "libaprutil.pdb")?;

        let tcmalloc = if debug {
            "libtcmalloc_minimal-debug.dll"
        } else {
            "libtcmalloc_minimal.dll"
        };
        if libs.path(tcmalloc)?.is_missing() {
            log::info!("Skipping {tcmalloc}");
        }
        Ok(())
    }

    fn collect_media_plugins(
        &self,
        plugins: &mut ManifestBuilder,
        layout: &BuildLayout,
    ) -> Result<()> {
        let settings = self.settings;
        let config = settings.configuration();
        {
            let mut media = plugins.prefix(Scope::src(layout.sibling("media_plugins")));
            let mut plugin = |name: &str, file: &str| {
                media.path_to(Path::new(name).join(config).join(file), file)
            };
            plugin("cef", "media_plugin_cef.dll")?;
            plugin("libvlc", "media_plugin_libvlc.dll")?;
            // useful for debugging, never shipped with a release viewer
            if settings.channel_type() != ChannelType::Release {
                plugin("example", "media_plugin_example.dll")?;
            }
        }

        let runtime = if settings.is_debug_configuration() { "debug" } else { "release" };
        {
            let mut cef = plugins.prefix(Scope::src(layout.packages.join("bin").join(runtime)));
            for file in [
                "chrome_elf.dll",
                "d3dcompiler_43.dll",
                "d3dcompiler_47.dll",
                "libcef.dll",
                "libEGL.dll",
                "libGLESv2.dll",
                "dullahan_host.exe",
                "natives_blob.bin",
                "snapshot_blob.bin",
                "widevinecdmadapter.dll",
            ] {
                cef.path(file)?;
            }
        }

        // CEF needs the MSVC runtime next to the plugin
        {
            let mut msvc = plugins.prefix(Scope::src(layout.sibling("sharedlibs").join("Release")));
            msvc.path("msvcp120.dll")?;
            msvc.path("msvcr120.dll")?;
        }

        {
            let mut resources = plugins.prefix(Scope::src(layout.packages.join("resources")));
            for file in [
                "cef.pak",
                "cef_100_percent.pak",
                "cef_200_percent.pak",
                "cef_extensions.pak",
                "devtools_resources.pak",
                "icudtl.dat",
            ] {
                resources.path(file)?;
            }
        }

        {
            let mut locales = plugins.prefix(
                Scope::src(layout.packages.join("resources").join("locales")).and_dst("locales"),
            );
            for locale in CEF_LOCALES {
                locales.path(format!("{locale}.pak"))?;
            }
        }

        let mut vlc = plugins.prefix(Scope::src(layout.release_bins()));
        vlc.path("libvlc.dll")?;
        vlc.path("libvlccore.dll")?;
        vlc.path("plugins/")?;
        Ok(())
    }
}

impl PlatformPackager for WindowsPackager<'_> {
    fn settings(&self) -> &Settings {
        self.settings
    }

    fn build_data(&self) -> BuildData {
        let mut data = BuildData::new(self.settings);
        data.executable = Some(self.final_exe());
        data
    }

    fn collect_files(&self, manifest: &mut ManifestBuilder) -> Result<()> {
        let settings = self.settings;
        let layout = BuildLayout::new(settings);
        let config = settings.configuration();

        common::collect_viewer_resources(self, manifest)?;

        if self.is_packaging_viewer() {
            manifest.require_to(Path::new(config).join("firestorm-bin.exe"), self.final_exe())?;
        }

        manifest.path2basename(Path::new("../llplugin/slplugin").join(config), "slplugin.exe")?;

        self.collect_shared_libs(manifest, &layout)?;

        manifest.path_to("licenses-win32.txt", "licenses.txt")?;
        manifest.path("featuretable.txt")?;
        manifest.with_prefix(Scope::src(&layout.packages), |m| m.path("ca-bundle.crt"))?;
        manifest.path("VivoxAUP.txt")?;

        manifest.with_prefix(Scope::dst("llplugin"), |m| {
            self.collect_media_plugins(m, &layout)
        })?;

        manifest.path_to(
            format!("../win_crash_logger/{config}/windows-crash-logger.exe"),
            "win_crash_logger.exe",
        )?;

        // the 64-bit runtime copied by the build scripts can be the 32-bit one
        if self.is_64bit() {
            let runtime = layout.sibling("../indra/newview/installers/windows_x64");
            let msvc = |m: &mut ManifestBuilder| {
                m.path("msvcp120.dll")?;
                m.path("msvcr120.dll")
            };
            manifest.with_prefix(Scope::src(&runtime).and_dst("llplugin"), msvc)?;
            manifest.with_prefix(Scope::src(&runtime), msvc)?;
        }

        if settings.is_opensim() {
            manifest.with_prefix(
                Scope::src(layout.release_libs().join("voice_os")).and_dst("voice_os"),
                |m| {
                    for file in [
                        "libsndfile-1.dll",
                        "ortp.dll",
                        "SLVoice.exe",
                        "vivoxoal.dll",
                        "vivoxsdk.dll",
                    ] {
                        m.path(file)?;
                    }
                    Ok(())
                },
            )?;
            manifest.with_prefix(Scope::src(&layout.packages).and_dst("voice_os"), |m| {
                m.path("ca-bundle.crt")
            })?;
        }
        Ok(())
    }

    async fn package_finish(&self, manifest: &mut ManifestBuilder) -> Result<PathBuf> {
        nsis::build_installer(self, manifest).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{Platform, SettingsBuilder};

    fn settings(channel: &str) -> Settings {
        SettingsBuilder::new()
            .platform(Platform::Windows)
            .arch(crate::bundler::settings::Arch::X86_64)
            .source("s")
            .build_dir("b")
            .dest("d")
            .version("7.1.9.74745".parse().unwrap())
            .channel(channel)
            .build()
            .unwrap()
    }

    #[test]
    fn exe_follows_app_name() {
        let s = settings("Firestorm-Beta");
        let packager = WindowsPackager::new(&s);
        assert_eq!(packager.final_exe(), "FirestormBeta.exe");
        assert_eq!(
            packager.build_data().executable.as_deref(),
            Some("FirestormBeta.exe")
        );
    }
}
