//! Dressing the mounted volume: app bundle, template files, the
//! Applications alias, Finder layout and hidden-file flags.
//!
//! The Finder layout is recorded in the template's `.DS_Store` and by
//! `installer-dmg.applescript`; both are keyed to the volume name.

use crate::bundler::{
    error::{ErrorExt, Result},
    manifest::ManifestBuilder,
    settings::Settings,
    utils::{
        fs::{copy_dir, copy_file, symlink},
        process::run_command,
    },
};
use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};
use tokio::time::{Duration, sleep};

/// Template used when the channel has none of its own.
pub const FALLBACK_TEMPLATE: &str = "installers/darwin/release-dmg";

/// Finder layout script, relative to the source tree.
pub const LAYOUT_SCRIPT: &str = "installers/darwin/installer-dmg.applescript";

/// Template files copied onto the volume before the layout script runs.
const TEMPLATE_FILES: [(&str, &str); 4] = [
    ("background.png", "background.png"),
    ("LGPL-license.txt", "LGPL License.txt"),
    ("VivoxAUP.txt", "Vivox Acceptable Use Policy.txt"),
    ("_DS_Store", ".DS_Store"),
];

/// Files the installer window must not show.
const HIDDEN_FILES: [&str; 3] = [".VolumeIcon.icns", "background.png", ".DS_Store"];

/// `installers/darwin/<flavor>-<channel type>-dmg`, relative to the
/// source tree.
pub fn channel_template(settings: &Settings) -> String {
    let flavor = if settings.is_opensim() {
        "firestormos"
    } else {
        "firestorm"
    };
    format!("installers/darwin/{flavor}-{}-dmg", settings.channel_type())
}

/// The channel's template directory if it exists, else
/// [`FALLBACK_TEMPLATE`].
pub fn template_dir(settings: &Settings, manifest: &ManifestBuilder) -> PathBuf {
    let preferred = channel_template(settings);
    log::info!("Trying template directory {preferred}");
    let dir = manifest.src_path_of(&preferred);
    if dir.exists() {
        return dir;
    }
    log::info!("Not found, trying template directory {FALLBACK_TEMPLATE}");
    manifest.src_path_of(FALLBACK_TEMPLATE)
}

/// Copies the staged app and the template files onto the volume.
pub fn populate_volume(app: &Path, app_name: &str, template: &Path, volume: &Path) -> Result<()> {
    let bundle = volume.join(format!("{app_name}.app"));
    log::info!("Copying to dmg {} {}", app.display(), bundle.display());
    copy_dir(app, &bundle, |_| true, |_, _| {})?;

    for (src, dst) in TEMPLATE_FILES {
        log::debug!("Copying to dmg {src} {dst}");
        copy_file(&template.join(src), &volume.join(dst))?;
    }
    Ok(())
}

/// Builds the `Applications` alias from the template's `.r` resource, or
/// falls back to a plain symlink when the template has none.
pub async fn create_applications_alias(template: &Path, volume: &Path) -> Result<PathBuf> {
    let alias = volume.join("Applications");
    let resource = template.join("Applications-alias.r");
    if resource.exists() {
        run_command(
            "Rez",
            [resource.as_os_str(), OsStr::new("-o"), alias.as_os_str()],
        )
        .await?;
    } else {
        log::info!("No alias resource in {}; linking /Applications", template.display());
        symlink(Path::new("/Applications"), &alias)
            .fs_context("creating Applications link", &alias)?;
    }
    Ok(alias)
}

/// Copies the volume icon. The layout script clobbers it, so this runs
/// afterwards.
pub fn copy_volume_icon(template: &Path, volume: &Path) -> Result<()> {
    log::info!("Copying volume icon to dmg");
    copy_file(&template.join("_VolumeIcon.icns"), &volume.join(".VolumeIcon.icns"))
}

/// Waits up to three seconds for a just-copied file to show up on the
/// volume.
async fn wait_for(path: &Path) {
    for attempt in 1..=3 {
        if path.exists() {
            log::debug!("Confirmed existence: {}", path.display());
            return;
        }
        log::info!("Waiting for {} to appear ({attempt})...", path.display());
        sleep(Duration::from_secs(1)).await;
    }
}

/// Lays out the volume and sets its Finder flags.
///
/// The alias must exist and the layout script must run before any file
/// is hidden.
pub async fn customize_volume(
    settings: &Settings,
    manifest: &ManifestBuilder,
    volname: &str,
    volume: &Path,
) -> Result<()> {
    let template = template_dir(settings, manifest);
    populate_volume(
        manifest.dest_base(),
        &settings.app_name(),
        &template,
        volume,
    )?;

    let alias = create_applications_alias(&template, volume).await?;
    run_command(
        "osascript",
        [manifest.src_path_of(LAYOUT_SCRIPT).as_os_str(), OsStr::new(volname)],
    )
    .await?;
    copy_volume_icon(&template, volume)?;

    for name in HIDDEN_FILES {
        let path = volume.join(name);
        wait_for(&path).await;
        run_command("SetFile", [OsStr::new("-a"), OsStr::new("V"), path.as_os_str()]).await?;
    }
    run_command("SetFile", [OsStr::new("-a"), OsStr::new("AC"), alias.as_os_str()]).await?;
    run_command("SetFile", [OsStr::new("-a"), OsStr::new("C"), volume.as_os_str()]).await?;
    log::info!("✓ Customized {}", volume.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::{Platform, SettingsBuilder};
    use std::fs;

    fn settings(channel: &str, root: &Path, opensim: bool) -> Settings {
        SettingsBuilder::new()
            .platform(Platform::Darwin)
            .arch("x86_64".parse().unwrap())
            .source(root.join("src"))
            .build_dir(root.join("build"))
            .dest(root.join("stage"))
            .version("7.1.9.74745".parse().unwrap())
            .channel(channel)
            .opensim(opensim)
            .build()
            .unwrap()
    }

    #[test]
    fn template_follows_flavor_and_channel() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(
            channel_template(&settings("Firestorm-Beta", tmp.path(), false)),
            "installers/darwin/firestorm-beta-dmg"
        );
        assert_eq!(
            channel_template(&settings("Firestorm-Release", tmp.path(), true)),
            "installers/darwin/firestormos-release-dmg"
        );
    }

    #[test]
    fn missing_channel_template_falls_back_to_release() {
        let tmp = tempfile::tempdir().unwrap();
        let s = settings("Firestorm-Private-Tester", tmp.path(), false);
        let manifest = ManifestBuilder::new(s.source_dir(), s.build_dir(), s.dest_dir());
        assert_eq!(
            template_dir(&s, &manifest),
            s.source_dir().join(FALLBACK_TEMPLATE)
        );

        let own = s.source_dir().join(channel_template(&s));
        fs::create_dir_all(&own).unwrap();
        assert_eq!(template_dir(&s, &manifest), own);
    }

    #[test]
    fn volume_gets_app_and_renamed_template_files() {
        let tmp = tempfile::tempdir().unwrap();
        let app = tmp.path().join("stage");
        fs::create_dir_all(app.join("Contents/MacOS")).unwrap();
        fs::write(app.join("Contents/MacOS/Firestorm"), "bin").unwrap();
        let template = tmp.path().join("template");
        fs::create_dir_all(&template).unwrap();
        for (src, _) in TEMPLATE_FILES {
            fs::write(template.join(src), src).unwrap();
        }
        let volume = tmp.path().join("volume");

        populate_volume(&app, "FirestormViewer", &template, &volume).unwrap();

        assert!(volume.join("FirestormViewer.app/Contents/MacOS/Firestorm").is_file());
        assert_eq!(fs::read_to_string(volume.join(".DS_Store")).unwrap(), "_DS_Store");
        assert!(volume.join("LGPL License.txt").is_file());
        assert!(volume.join("Vivox Acceptable Use Policy.txt").is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn alias_without_resource_is_a_symlink() {
        let tmp = tempfile::tempdir().unwrap();
        let volume = tmp.path().join("volume");
        fs::create_dir_all(&volume).unwrap();
        let alias = create_applications_alias(tmp.path(), &volume).await.unwrap();
        assert_eq!(fs::read_link(alias).unwrap(), PathBuf::from("/Applications"));
    }
}
