//! File system utilities for staging.
//!
//! Provides copy operations with automatic directory creation and
//! symlink preservation. Everything here is synchronous: staging runs
//! strictly in sequence and later copy rules may depend on earlier ones.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Creates all of the directories of the specified path.
pub fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path).fs_context("creating directory", path)
}

/// Removes whatever occupies `path`: symlink, file or directory tree.
///
/// A missing path is not an error.
pub fn remove_path(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e).fs_context("inspecting", path),
    };
    if metadata.is_dir() {
        fs::remove_dir_all(path).fs_context("removing directory", path)
    } else {
        fs::remove_file(path).fs_context("removing", path)
    }
}

/// Makes a symbolic link.
#[cfg(unix)]
pub fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

/// Makes a symbolic link, choosing the directory or file flavour from
/// what the target resolves to relative to the link's directory.
#[cfg(windows)]
pub fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    let resolved = link.parent().map(|p| p.join(target)).unwrap_or_else(|| target.to_path_buf());
    if resolved.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

/// Copies a single file, creating the destination's parent directories.
///
/// A source that is itself a symlink is recreated as a symlink with the
/// same target rather than dereferenced. An existing destination is
/// replaced. Copying a path onto itself is a no-op.
pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(from).fs_context("inspecting copy source", from)?;
    if metadata.is_dir() {
        return Err(Error::GenericError(format!("{from:?} is a directory")));
    }
    if same_file(from, to) {
        log::debug!("Skipping copy of {} onto itself", from.display());
        return Ok(());
    }
    if let Some(dest_dir) = to.parent() {
        create_dir_all(dest_dir)?;
    }
    if fs::symlink_metadata(to).is_ok() {
        remove_path(to)?;
    }

    if metadata.file_type().is_symlink() {
        let target = fs::read_link(from).fs_context("reading symlink", from)?;
        symlink(&target, to).fs_context("recreating symlink", to)?;
    } else {
        fs::copy(from, to).fs_context("copying file to", to)?;
    }
    Ok(())
}

/// Recursively copies a directory, invoking `on_file` with every
/// `(source, destination)` pair of non-directory entries that was copied.
///
/// `keep` is consulted for every entry below `from`; returning false
/// skips the entry (and, for directories, its whole subtree).
pub fn copy_dir<K, F>(from: &Path, to: &Path, mut keep: K, mut on_file: F) -> Result<usize>
where
    K: FnMut(&Path) -> bool,
    F: FnMut(&Path, &Path),
{
    if !from.is_dir() {
        return Err(Error::GenericError(format!("{from:?} is not a directory")));
    }
    create_dir_all(to)?;

    let mut copied = 0;
    let mut walker = walkdir::WalkDir::new(from).min_depth(1).sort_by_file_name().into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry?;
        if !keep(entry.path()) {
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }
        let rel_path = entry.path().strip_prefix(from)?;
        let dest_path = to.join(rel_path);

        if entry.file_type().is_dir() {
            create_dir_all(&dest_path)?;
        } else {
            copy_file(entry.path(), &dest_path)?;
            on_file(entry.path(), &dest_path);
            copied += 1;
        }
    }
    Ok(copied)
}

/// Whether two paths name the same existing file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Lexically normalizes a path, dropping `.` and folding `..` into the
/// preceding normal component where there is one.
pub fn normalize_path(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                } else {
                    components.push(component);
                }
            }
            _ => components.push(component),
        }
    }
    components.iter().collect()
}
