//! Idempotent symlink creation inside the staging tree.

use super::ManifestBuilder;
use crate::bundler::error::{Error, ErrorExt, Result};
use crate::bundler::utils::fs::{create_dir_all, symlink};
use path_absolutize::Absolutize;
use std::{
    ffi::OsString,
    fs, io,
    path::{Component, Path, PathBuf},
};

/// How [`relpath`] treats the path being linked to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PathResolution {
    /// Resolve every symlink along the path
    #[default]
    Resolve,
    /// Resolve the parent directories but not the final segment, which
    /// is itself a link that must be pointed at rather than through
    KeepLast,
}

/// A link to create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymlinkRequest {
    pub target: PathBuf,
    /// Defaults to the target's file name in the current destination
    pub link: Option<PathBuf>,
    /// Log creation failures instead of returning them
    pub catch_errors: bool,
    pub resolution: PathResolution,
}

impl SymlinkRequest {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            link: None,
            catch_errors: true,
            resolution: PathResolution::Resolve,
        }
    }

    pub fn at(mut self, link: impl Into<PathBuf>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Propagate creation failures.
    pub fn strict(mut self) -> Self {
        self.catch_errors = false;
        self
    }

    /// Treat the target as a link that must not be dereferenced.
    pub fn keep_last(mut self) -> Self {
        self.resolution = PathResolution::KeepLast;
        self
    }

    fn link_name(&self) -> Result<PathBuf> {
        match &self.link {
            Some(link) => Ok(link.clone()),
            None => self.target.file_name().map(PathBuf::from).ok_or_else(|| {
                Error::GenericError(format!("{} has no file name", self.target.display()))
            }),
        }
    }
}

/// What [`ensure_symlink`] found at the link location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymlinkOutcome {
    Created,
    /// Already a link to the same target
    Unchanged,
    ReplacedLink,
    ReplacedDirectory,
    ReplacedFile,
}

/// Makes `link` a symlink to `target`, replacing whatever occupies it.
///
/// Calling this twice with the same arguments leaves the tree as it was
/// after the first call.
pub fn ensure_symlink(target: &Path, link: &Path) -> Result<SymlinkOutcome> {
    if let Some(parent) = link.parent() {
        create_dir_all(parent)?;
    }

    let outcome = match fs::symlink_metadata(link) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => SymlinkOutcome::Created,
        Err(e) => return Err(e).fs_context("inspecting", link),
        Ok(meta) if meta.file_type().is_symlink() => {
            let current = fs::read_link(link).fs_context("reading symlink", link)?;
            if current == target {
                return Ok(SymlinkOutcome::Unchanged);
            }
            fs::remove_file(link)
                .or_else(|_| fs::remove_dir(link))
                .fs_context("removing stale symlink", link)?;
            SymlinkOutcome::ReplacedLink
        }
        Ok(meta) if meta.is_dir() => {
            log::warn!("Replacing directory {} with a symlink", link.display());
            fs::remove_dir_all(link).fs_context("removing directory", link)?;
            SymlinkOutcome::ReplacedDirectory
        }
        Ok(_) => {
            log::warn!("Replacing file {} with a symlink", link.display());
            fs::remove_file(link).fs_context("removing file", link)?;
            SymlinkOutcome::ReplacedFile
        }
    };

    symlink(target, link).fs_context("creating symlink", link)?;
    log::debug!("{} -> {}", link.display(), target.display());
    Ok(outcome)
}

impl ManifestBuilder {
    /// Links under the current destination root to a relative target,
    /// taken verbatim.
    ///
    /// An absolute target is refused with [`Error::AbsoluteSymlink`]
    /// whatever `catch_errors` says.
    pub fn symlinkf(&self, request: SymlinkRequest) -> Result<PathBuf> {
        let link = self.dst_path_of(request.link_name()?);
        if request.target.is_absolute() {
            return Err(Error::AbsoluteSymlink {
                link,
                target: request.target,
            });
        }
        let created = ensure_symlink(&request.target, &link);
        finish(created, &request, link)
    }

    /// Links under the current destination root to an absolute target,
    /// computing the relative path from the link's directory.
    ///
    /// A relative target is taken relative to the current destination
    /// root.
    pub fn relsymlinkf(&self, request: SymlinkRequest) -> Result<PathBuf> {
        let link = self.dst_path_of(request.link_name()?);
        let target = if request.target.is_absolute() {
            request.target.clone()
        } else {
            self.dst_path_of(&request.target)
        };
        let created = link
            .parent()
            .ok_or_else(|| Error::GenericError(format!("{} has no parent", link.display())))
            .and_then(|dir| {
                create_dir_all(dir)?;
                relpath(&target, dir, request.resolution)
            })
            .and_then(|relative| ensure_symlink(&relative, &link));
        finish(created, &request, link)
    }
}

fn finish(
    created: Result<SymlinkOutcome>,
    request: &SymlinkRequest,
    link: PathBuf,
) -> Result<PathBuf> {
    match created {
        Ok(_) => Ok(link),
        Err(e) if request.catch_errors => {
            log::warn!(
                "Can't symlink {} -> {}: {e}",
                link.display(),
                request.target.display()
            );
            Ok(link)
        }
        Err(e) => Err(e),
    }
}

/// Path to `path` relative to the directory `base`.
pub fn relpath(path: &Path, base: &Path, resolution: PathResolution) -> Result<PathBuf> {
    let path = match resolution {
        PathResolution::Resolve => realpath(path)?,
        PathResolution::KeepLast => match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
                realpath(parent)?.join(name)
            }
            _ => absolute(path)?,
        },
    };
    let base = realpath(base)?;
    Ok(diff_paths(&path, &base))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(path
        .absolutize()
        .fs_context("absolutizing", path)?
        .into_owned())
}

/// Absolute path with symlinks resolved as far as the path exists.
fn realpath(path: &Path) -> Result<PathBuf> {
    let abs = absolute(path)?;
    let mut existing = abs.as_path();
    let mut rest: Vec<OsString> = Vec::new();
    loop {
        if let Ok(mut resolved) = fs::canonicalize(existing) {
            resolved.extend(rest.iter().rev());
            return Ok(resolved);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(abs.clone()),
        }
    }
}

fn diff_paths(path: &Path, base: &Path) -> PathBuf {
    let path: Vec<Component> = path.components().collect();
    let base: Vec<Component> = base.components().collect();
    let common = path
        .iter()
        .zip(&base)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base.len() {
        out.push("..");
    }
    for component in &path[common..] {
        out.push(component);
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_walks_up_then_down() {
        assert_eq!(
            diff_paths(
                Path::new("/app/Contents/Frameworks/CEF.framework"),
                Path::new("/app/Contents/Resources/SLPlugin.app/Contents/Frameworks"),
            ),
            PathBuf::from("../../../../Frameworks/CEF.framework")
        );
        assert_eq!(diff_paths(Path::new("/a/b"), Path::new("/a/b")), PathBuf::from("."));
    }

    #[cfg(unix)]
    #[test]
    fn keep_last_does_not_follow_final_link() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("real/inner")).unwrap();
        std::os::unix::fs::symlink("real/inner", root.join("alias")).unwrap();
        fs::create_dir_all(root.join("from")).unwrap();

        let followed =
            relpath(&root.join("alias"), &root.join("from"), PathResolution::Resolve).unwrap();
        assert_eq!(followed, PathBuf::from("../real/inner"));

        let kept =
            relpath(&root.join("alias"), &root.join("from"), PathResolution::KeepLast).unwrap();
        assert_eq!(kept, PathBuf::from("../alias"));
    }

    #[test]
    fn request_defaults_to_target_basename() {
        let req = SymlinkRequest::new("/x/libfoo.dylib");
        assert_eq!(req.link_name().unwrap(), PathBuf::from("libfoo.dylib"));
        assert!(req.catch_errors);
        assert!(!req.clone().strict().catch_errors);
    }
}
