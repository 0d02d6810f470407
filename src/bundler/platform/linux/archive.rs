//! Linux tarball finishing: strip, permission cleanup, archive.

use crate::bundler::{
    error::{ErrorExt, Result},
    settings::Settings,
    utils::process::run_command_lenient,
};
use flate2::{Compression, write::GzEncoder};
use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// `Phoenix_<app name>_<arch>_<version>`, also the top-level directory
/// inside the archive.
pub fn installer_name(settings: &Settings) -> String {
    format!(
        "Phoenix_{}_{}_{}",
        settings.app_name(),
        settings.arch(),
        settings.version()
    )
}

/// Data files that live next to the binaries and must not be stripped.
const KEEP_UNSTRIPPED: [&str; 3] = ["dat", "pak", "bin"];

/// Regular files under `bin/` and `lib/` that `strip` should see.
pub fn strip_candidates(staging: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for dir in ["bin", "lib"] {
        let root = staging.join(dir);
        if !root.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&root).follow_links(false) {
            let entry = entry?;
            if !entry.file_type().is_file() || entry.file_name() == "update_install" {
                continue;
            }
            let keep = entry
                .path()
                .extension()
                .and_then(OsStr::to_str)
                .is_some_and(|ext| KEEP_UNSTRIPPED.contains(&ext));
            if !keep {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Runs `strip -S` over [`strip_candidates`]. A file strip refuses (a
/// script, say) is left as is.
pub async fn strip_binaries(staging: &Path) -> Result<usize> {
    let mut stripped = 0;
    for file in strip_candidates(staging)? {
        if run_command_lenient("strip", [OsStr::new("-S"), file.as_os_str()]).await {
            stripped += 1;
        }
    }
    log::info!("Stripped {stripped} binaries");
    Ok(stripped)
}

/// Mode a file with `mode` is widened to, if any.
///
/// Owner-only files become world readable; executability is kept.
pub fn widened_mode(mode: u32) -> Option<u32> {
    match mode {
        0o700 => Some(0o755),
        0o500 => Some(0o555),
        0o600 => Some(0o644),
        0o400 => Some(0o444),
        _ => None,
    }
}

/// Makes every directory `0755` and widens owner-only files.
#[cfg(unix)]
pub fn normalize_permissions(staging: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    for entry in WalkDir::new(staging).follow_links(false) {
        let entry = entry?;
        let mode = if entry.file_type().is_dir() {
            Some(0o755)
        } else if entry.file_type().is_file() {
            widened_mode(entry.metadata()?.permissions().mode() & 0o7777)
        } else {
            None
        };
        if let Some(mode) = mode {
            fs::set_permissions(entry.path(), fs::Permissions::from_mode(mode))
                .fs_context("setting permissions", entry.path())?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn normalize_permissions(_staging: &Path) -> Result<()> {
    Ok(())
}

/// The staging directory moved aside under the installer name.
///
/// Moved back by [`Self::restore`], or on drop if that was never reached.
#[derive(Debug)]
pub struct StagingRename {
    staged: PathBuf,
    renamed: PathBuf,
    restored: bool,
}

impl StagingRename {
    pub fn new(staged: &Path, renamed: &Path) -> Result<Self> {
        log::debug!("Moving {} to {}", staged.display(), renamed.display());
        fs::rename(staged, renamed).fs_context("renaming staging directory", staged)?;
        Ok(Self {
            staged: staged.to_path_buf(),
            renamed: renamed.to_path_buf(),
            restored: false,
        })
    }

    /// Where the tree currently lives.
    pub fn path(&self) -> &Path {
        &self.renamed
    }

    pub fn restore(mut self) -> Result<()> {
        self.restored = true;
        fs::rename(&self.renamed, &self.staged)
            .fs_context("restoring staging directory", &self.renamed)
    }
}

impl Drop for StagingRename {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(e) = fs::rename(&self.renamed, &self.staged) {
            log::error!(
                "Failed to move {} back to {}: {e}",
                self.renamed.display(),
                self.staged.display()
            );
        }
    }
}

/// Writes `<dir>/<name>.tar.gz` holding `tree` under the top-level
/// directory `name`.
///
/// Owners and timestamps are left out of the headers; modes and
/// symlinks are kept.
pub fn create_tarball(dir: &Path, name: &str, tree: &Path) -> Result<PathBuf> {
    let archive = dir.join(format!("{name}.tar.gz"));
    log::info!("Creating {}", archive.display());

    let file = fs::File::create(&archive).fs_context("creating archive", &archive)?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);
    builder.mode(tar::HeaderMode::Deterministic);
    builder
        .append_dir_all(name, tree)
        .fs_context("archiving", tree)?;
    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .fs_context("finishing archive", &archive)?;
    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn data_files_are_not_stripped() {
        let tmp = tempfile::tempdir().unwrap();
        let stage = tmp.path();
        for f in [
            "bin/do-not-directly-run-firestorm-bin",
            "bin/cef.pak",
            "bin/icudtl.dat",
            "bin/natives_blob.bin",
            "bin/update_install",
            "lib/libcef.so",
            "app_settings/settings.xml",
        ] {
            touch(&stage.join(f));
        }
        let files = strip_candidates(stage).unwrap();
        assert_eq!(
            files,
            [
                stage.join("bin/do-not-directly-run-firestorm-bin"),
                stage.join("lib/libcef.so"),
            ]
        );
    }

    #[test]
    fn owner_only_modes_are_widened() {
        assert_eq!(widened_mode(0o700), Some(0o755));
        assert_eq!(widened_mode(0o400), Some(0o444));
        assert_eq!(widened_mode(0o644), None);
        assert_eq!(widened_mode(0o750), None);
    }

    #[cfg(unix)]
    #[test]
    fn permissions_are_normalized() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("bin/firestorm");
        touch(&file);
        fs::set_permissions(&file, fs::Permissions::from_mode(0o700)).unwrap();
        fs::set_permissions(tmp.path().join("bin"), fs::Permissions::from_mode(0o750)).unwrap();

        normalize_permissions(tmp.path()).unwrap();
        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode(&file), 0o755);
        assert_eq!(mode(&tmp.path().join("bin")), 0o755);
    }

    #[test]
    fn rename_is_undone_on_drop() {
        let tmp = tempfile::tempdir().unwrap();
        let staged = tmp.path().join("packaged");
        touch(&staged.join("firestorm"));
        let renamed = tmp.path().join("Phoenix_FirestormViewer_x86_64_7.1.9.1");
        {
            let rename = StagingRename::new(&staged, &renamed).unwrap();
            assert!(rename.path().join("firestorm").exists());
            assert!(!staged.exists());
        }
        assert!(staged.join("firestorm").exists());
        assert!(!renamed.exists());
    }

    #[test]
    fn tarball_holds_tree_under_installer_name() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = tmp.path().join("Phoenix_X");
        touch(&tree.join("bin/firestorm"));
        let archive = create_tarball(tmp.path(), "Phoenix_X", &tree).unwrap();
        assert_eq!(archive, tmp.path().join("Phoenix_X.tar.gz"));

        let mut tar = tar::Archive::new(GzDecoder::new(fs::File::open(&archive).unwrap()));
        let names: Vec<PathBuf> = tar
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().into_owned())
            .collect();
        assert!(names.contains(&PathBuf::from("Phoenix_X/bin/firestorm")));
    }
}
