//! Linux staging and tarball packaging.

pub mod archive;

use super::{BuildLayout, PlatformPackager, common};
use crate::bundler::{
    error::{Context, Result},
    manifest::{ManifestBuilder, Scope},
    settings::{Arch, Settings},
};
use std::path::PathBuf;

/// Runtime libraries from the prebuilt packages, installed under `lib/`.
const PACKAGED_LIBS: &[&str] = &[
    "libapr-1.so*",
    "libaprutil-1.so*",
    "libboost_context-mt.so*",
    "libboost_filesystem-mt.so*",
    "libboost_program_options-mt.so*",
    "libboost_regex-mt.so*",
    "libboost_signals-mt.so*",
    "libboost_system-mt.so*",
    "libboost_thread-mt.so*",
    "libboost_chrono-mt.so*",
    "libboost_date_time-mt.so*",
    "libboost_wave-mt.so*",
    "libcollada14dom.so*",
    "libdb*.so*",
    "libcrypto.so*",
    "libexpat.so*",
    "libssl.so*",
    "libGLOD.so",
    "libminizip.so",
    "libuuid.so*",
    "libSDL-1.2.so*",
    "libdirectfb*.so*",
    "libfusion*.so*",
    "libdirect*.so*",
    "libopenjpeg.so*",
    "libhunspell-1.3.so*",
    "libalut.so*",
    // bundled to work around incompatible system versions on some distros
    "libpng15.so.15",
    "libpng15.so.15.13.0",
    "libpng15.so.15.1.0",
];

/// Extra 32-bit libraries.
const I686_LIBS: &[&str] = &[
    "libapr-1.so",
    "libapr-1.so.0",
    "libapr-1.so.0.4.5",
    "libaprutil-1.so",
    "libaprutil-1.so.0",
    "libaprutil-1.so.0.4.1",
    "libdb*.so",
    "libexpat.so.*",
    "libGLOD.so",
    "libuuid.so*",
    "libSDL-1.2.so.*",
    "libdirectfb-1.*.so.*",
    "libfusion-1.*.so.*",
    "libdirect-1.*.so.*",
    "libopenjpeg.so*",
    "libdirectfb-1.4.so.5",
    "libfusion-1.4.so.5",
    "libdirect-1.4.so.5*",
    "libhunspell-1.3.so*",
    "libalut.so*",
    "libopenal.so*",
    // the versioned name only; the bare symlinks make some fonts render badly
    "libfontconfig.so.*.*",
    "libfreetype.so.*.*",
    "libtcmalloc.so*",
    "libfmodex-*.so",
    "libfmodex.so",
    "libfmodex.so*",
    "libfmod-*.so",
    "libfmod.so",
    "libfmod.so*",
];

#[derive(Debug)]
pub struct LinuxPackager<'a> {
    settings: &'a Settings,
}

impl<'a> LinuxPackager<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    fn collect_launcher(&self, manifest: &mut ManifestBuilder) -> Result<()> {
        manifest.path_to("licenses-linux.txt", "licenses.txt")?;
        manifest.path("VivoxAUP.txt")?;
        manifest.path_to("res/firestorm_icon.png", "firestorm_icon.png")?;

        let mut tools = manifest.prefix(Scope::src("linux_tools"));
        tools.path_to("client-readme.txt", "README-linux.txt")?;
        tools.path("FIRESTORM_DESKTOPINSTALL.txt")?;
        tools.path_to("client-readme-voice.txt", "README-linux-voice.txt")?;
        tools.path_to("client-readme-joystick.txt", "README-linux-joystick.txt")?;
        tools.path_to("wrapper.sh", "firestorm")?;
        tools.with_prefix(Scope::dst("etc"), |etc| {
            for script in [
                "handle_secondlifeprotocol.sh",
                "register_secondlifeprotocol.sh",
                "refresh_desktop_app_entry.sh",
                "launch_url.sh",
            ] {
                etc.path(script)?;
            }
            Ok(())
        })?;
        tools.path("install.sh")?;
        Ok(())
    }

    fn collect_media(&self, manifest: &mut ManifestBuilder, layout: &BuildLayout) -> Result<()> {
        let pkg_lib = layout.packages.join("lib");

        manifest.with_prefix(
            Scope::src(layout.sibling("media_plugins")).and_dst("bin/llplugin"),
            |plugins| {
                plugins.path_to(
                    "gstreamer010/libmedia_plugin_gstreamer010.so",
                    "libmedia_plugin_gstreamer.so",
                )?;
                plugins.path2basename("libvlc", "libmedia_plugin_libvlc.so")?;
                plugins.path_to("cef/libmedia_plugin_cef.so", "libmedia_plugin_cef.so")
            },
        )?;

        manifest.with_prefix(
            Scope::src(pkg_lib.join("vlc").join("plugins")).and_dst("bin/llplugin/vlc/plugins"),
            |vlc| {
                vlc.path("plugins.dat")?;
                vlc.path("*/*.so")
            },
        )?;
        manifest.with_prefix(Scope::src(&pkg_lib).and_dst("lib"), |lib| {
            lib.path("libvlc*.so*")
        })?;

        manifest.with_prefix(Scope::src(layout.release_libs()).and_dst("lib"), |lib| {
            lib.path("libcef.so")?;
            lib.path("libllceflib.so")
        })?;
        manifest.with_prefix(
            Scope::src(layout.packages.join("release").join("swiftshader"))
                .and_dst("bin/swiftshader"),
            |swiftshader| swiftshader.path("*.so"),
        )?;
        manifest.with_prefix(Scope::src(layout.release_bins()).and_dst("bin"), |bin| {
            for file in [
                "chrome-sandbox",
                "dullahan_host",
                "natives_blob.bin",
                "snapshot_blob.bin",
                "v8_context_snapshot.bin",
                "libffmpegsumo.so",
            ] {
                bin.path(file)?;
            }
            Ok(())
        })?;
        manifest.with_prefix(
            Scope::src(layout.packages.join("resources")).and_dst("bin"),
            |resources| {
                for file in [
                    "cef.pak",
                    "cef_extensions.pak",
                    "cef_100_percent.pak",
                    "cef_200_percent.pak",
                    "devtools_resources.pak",
                    "icudtl.dat",
                ] {
                    resources.path(file)?;
                }
                Ok(())
            },
        )?;
        manifest.with_prefix(
            Scope::src(layout.packages.join("resources").join("locales")).and_dst("bin/locales"),
            |locales| {
                for locale in common::CEF_LOCALES {
                    locales.path(format!("{locale}.pak"))?;
                }
                Ok(())
            },
        )
    }

    fn collect_packaged_libs(
        &self,
        manifest: &mut ManifestBuilder,
        layout: &BuildLayout,
    ) -> Result<()> {
        let release = layout.release_libs();
        manifest.with_prefix(Scope::src(&release).and_dst("lib"), |lib| {
            for pattern in PACKAGED_LIBS {
                lib.path(pattern)?;
            }
            // versioned name in case the package only ships the bare one
            lib.path_to("libopenal.so", "libopenal.so.1")?;
            lib.path("libopenal.so*")?;
            lib.path("libpangox-1.0.so*")?;
            lib.path("libfontconfig.so.*.*")?;
            if lib.path("libtcmalloc.so*")?.is_missing() {
                log::info!("tcmalloc files not found, skipping");
            }
            Ok(())
        })?;

        // the 32-bit Vivox runtime also serves 64-bit viewers
        manifest.with_prefix(Scope::src(&release).and_dst("bin"), |bin| {
            bin.path("SLVoice")?;
            bin.path("win32")
        })?;
        manifest.with_prefix(Scope::src(&release).and_dst("lib"), |lib| {
            for file in [
                "libortp.so",
                "libsndfile.so.1",
                "libvivoxoal.so.1",
                "libvivoxsdk.so",
                "libvivoxplatform.so",
            ] {
                lib.path(file)?;
            }
            Ok(())
        })
    }

    fn collect_i686(&self, manifest: &mut ManifestBuilder, layout: &BuildLayout) -> Result<()> {
        let release = layout.release_libs();
        manifest.with_prefix(Scope::src(&release).and_dst("lib"), |lib| {
            for pattern in I686_LIBS {
                lib.path(pattern)?;
            }
            Ok(())
        })?;
        manifest.with_prefix(Scope::src(&release).and_dst("bin"), |bin| bin.path("SLVoice"))?;
        manifest.with_prefix(Scope::src(&release).and_dst("lib"), |lib| {
            // no libvivoxoal: voice reuses the viewer's own OpenAL
            for file in [
                "libortp.so",
                "libsndfile.so.1",
                "libvivoxsdk.so",
                "libvivoxplatform.so",
            ] {
                lib.path(file)?;
            }
            Ok(())
        })
    }

    fn collect_x86_64(&self, manifest: &mut ManifestBuilder, layout: &BuildLayout) -> Result<()> {
        let release = layout.release_libs();
        if self.is_packaging_viewer() {
            manifest.with_prefix(Scope::src(&release).and_dst("lib"), |lib| {
                for pattern in [
                    "libffi*.so*",
                    "libfmodex64-*.so",
                    "libfmodex64.so",
                    "libfmodex64.so*",
                    "libfmod-*.so",
                    "libfmod.so",
                    "libfmod.so*",
                ] {
                    lib.path(pattern)?;
                }
                Ok(())
            })?;
            manifest.with_prefix(Scope::src(release.join("x64")).and_dst("lib"), |lib| {
                if lib.path("libLeap.so")?.is_missing() {
                    log::info!("Leap Motion library not found");
                }
                Ok(())
            })?;
        }

        manifest.with_prefix(Scope::dst("bin"), |bin| {
            bin.path2basename("../llplugin/slplugin", "SLPlugin")
        })?;
        manifest.with_prefix(Scope::dst("bin/llplugin"), |plugins| {
            plugins.path2basename("../media_plugins/webkit", "libmedia_plugin_webkit.so")?;
            plugins.path_to(
                "../media_plugins/gstreamer010/libmedia_plugin_gstreamer010.so",
                "libmedia_plugin_gstreamer.so",
            )
        })?;
        manifest.path("secondlife-i686.supp")?;
        Ok(())
    }
}

impl PlatformPackager for LinuxPackager<'_> {
    fn settings(&self) -> &Settings {
        self.settings
    }

    fn collect_files(&self, manifest: &mut ManifestBuilder) -> Result<()> {
        let settings = self.settings;
        let layout = BuildLayout::new(settings);

        common::collect_viewer_resources(self, manifest)?;
        self.collect_launcher(manifest)?;

        manifest.with_prefix(Scope::dst("bin"), |bin| {
            bin.path_to("firestorm-bin", "do-not-directly-run-firestorm-bin")?;
            bin.path_to("../linux_crash_logger/linux-crash-logger", "linux-crash-logger.bin")?;
            bin.path2basename("../llplugin/slplugin", "SLPlugin")
        })?;

        manifest.path("res-sdl")?;
        manifest.with_prefix(Scope::src(settings.icon_path()), |icons| {
            icons.path_to("firestorm_256.png", "firestorm_48.png")?;
            icons.with_prefix(Scope::dst("res-sdl"), |sdl| {
                sdl.path_to("firestorm_256.BMP", "ll_icon.BMP")
            })
        })?;

        self.collect_media(manifest, &layout)?;

        if manifest
            .path_to("../llcommon/libllcommon.so", "lib/libllcommon.so")?
            .is_missing()
        {
            log::info!("Skipping llcommon.so (assuming llcommon was linked statically)");
        }

        manifest.path("featuretable_linux.txt")?;
        manifest.with_prefix(Scope::src(&layout.packages).and_dst("bin"), |bin| {
            bin.path("ca-bundle.crt")
        })?;

        if self.is_packaging_viewer() {
            self.collect_packaged_libs(manifest, &layout)?;
        }

        match settings.arch() {
            Arch::X86(_) => self.collect_i686(manifest, &layout),
            Arch::X86_64 => self.collect_x86_64(manifest, &layout),
            Arch::Universal => Err(crate::bundler::Error::ArchError(
                "universal binaries are macOS only".into(),
            )),
        }
    }

    async fn package_finish(&self, manifest: &mut ManifestBuilder) -> Result<PathBuf> {
        let settings = self.settings;
        let staging = manifest.dest_base().to_path_buf();
        let name = archive::installer_name(settings);

        if settings.is_release_build() && self.is_packaging_viewer() {
            log::info!("Stripping the packaged binaries, since this is a Release build");
            archive::strip_binaries(&staging).await?;
        }
        archive::normalize_permissions(&staging)?;

        // move the tree so it has the right name inside the archive
        let parent = staging
            .parent()
            .context("staging directory has no parent")?;
        let rename = archive::StagingRename::new(&staging, &parent.join(&name))?;
        let archived = if settings.is_release_build() {
            archive::create_tarball(parent, &name, rename.path()).map(Some)
        } else {
            log::info!(
                "Skipping {name}.tar.gz for non-Release build ({})",
                settings.buildtype()
            );
            Ok(None)
        };
        rename.restore()?;

        match archived? {
            Some(tarball) => {
                log::info!("✓ Created tarball: {}", tarball.display());
                Ok(tarball)
            }
            None => Ok(staging),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{Action, Platform, SettingsBuilder};
    use std::{fs, path::Path};

    fn settings(root: &Path) -> Settings {
        SettingsBuilder::new()
            .platform(Platform::Linux)
            .arch(Arch::X86_64)
            .source(root.join("indra/newview"))
            .build_dir(root.join("build/newview"))
            .dest(root.join("build/newview/packaged"))
            .version("7.1.9.74745".parse().unwrap())
            .channel("Firestorm-Release")
            .actions(vec![Action::Copy])
            .build()
            .unwrap()
    }

    fn touch(path: PathBuf) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn installer_name_uses_app_name_arch_and_version() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(
            archive::installer_name(&settings(tmp.path())),
            "Phoenix_FirestormViewer_x86_64_7.1.9.74745"
        );
    }

    #[test]
    fn copy_only_run_stages_launcher_and_binaries() {
        let tmp = tempfile::tempdir().unwrap();
        let s = settings(tmp.path());
        touch(s.source_dir().join("licenses-linux.txt"));
        touch(s.source_dir().join("linux_tools/wrapper.sh"));
        touch(s.source_dir().join("linux_tools/launch_url.sh"));
        touch(s.build_dir().join("firestorm-bin"));

        let mut manifest = ManifestBuilder::new(s.source_dir(), s.build_dir(), s.dest_dir());
        LinuxPackager::new(&s).collect_files(&mut manifest).unwrap();

        let stage = s.dest_dir();
        assert!(stage.join("licenses.txt").is_file());
        assert!(stage.join("firestorm").is_file());
        assert!(stage.join("etc/launch_url.sh").is_file());
        assert!(stage.join("bin/do-not-directly-run-firestorm-bin").is_file());
        // installer-only resources are left out
        assert!(!stage.join("build_data.json").exists());
        assert_eq!(manifest.depth(), 1);
    }
}
