//! The manifest builder.
//!
//! Platform packagers describe their staging tree as a sequence of copy
//! rules evaluated against a stack of prefix frames. Each rule is resolved
//! and executed on the spot; the resulting `(source, destination)` pairs
//! are recorded in order for later consumers such as installer script
//! generation.

mod prefix;
mod resolve;
mod symlink;

pub use prefix::{PrefixFrame, PrefixGuard, Scope};
pub use resolve::{Requirement, Resolution};
pub use symlink::{PathResolution, SymlinkOutcome, SymlinkRequest, ensure_symlink, relpath};

use crate::bundler::error::{Error, ErrorExt, Result};
use crate::bundler::utils::fs::{create_dir_all, normalize_path};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

/// Where a manifest entry's content came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntrySource {
    /// Copied from this file
    File(PathBuf),
    /// Generated in-process; the label says by what
    Generated(String),
}

impl fmt::Display for EntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntrySource::File(path) => write!(f, "{}", path.display()),
            EntrySource::Generated(label) => write!(f, "<{label}>"),
        }
    }
}

/// One staged file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    pub source: EntrySource,
    /// Absolute path inside the staging tree
    pub dest: PathBuf,
}

/// Stack-scoped copy planner and executor.
#[derive(Debug)]
pub struct ManifestBuilder {
    frames: Vec<PrefixFrame>,
    entries: Vec<ManifestEntry>,
}

impl ManifestBuilder {
    /// Creates a builder whose root frame is `(source, build, dest)`.
    pub fn new(
        source: impl Into<PathBuf>,
        build: impl Into<PathBuf>,
        dest: impl Into<PathBuf>,
    ) -> Self {
        Self {
            frames: vec![PrefixFrame::root(source.into(), build.into(), dest.into())],
            entries: Vec::new(),
        }
    }

    /// Entries recorded so far, in insertion order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Destination root of the outermost frame.
    pub fn dest_base(&self) -> &Path {
        &self.frames[0].dest_root
    }

    /// Destination paths relative to [`Self::dest_base`].
    pub fn relative_dests(&self) -> Vec<PathBuf> {
        let base = self.dest_base();
        self.entries
            .iter()
            .filter_map(|e| e.dest.strip_prefix(base).ok().map(Path::to_path_buf))
            .collect()
    }

    fn record(&mut self, source: EntrySource, dest: PathBuf) {
        log::debug!("{} -> {}", source, dest.display());
        self.entries.push(ManifestEntry { source, dest });
    }

    /// `relpath` resolved against the current source root.
    pub fn src_path_of(&self, relpath: impl AsRef<Path>) -> PathBuf {
        normalize_path(&self.current().source_root.join(relpath))
    }

    /// `relpath` resolved against the current build root.
    pub fn build_path_of(&self, relpath: impl AsRef<Path>) -> PathBuf {
        normalize_path(&self.current().build_root.join(relpath))
    }

    /// `relpath` resolved against the current destination root.
    pub fn dst_path_of(&self, relpath: impl AsRef<Path>) -> PathBuf {
        normalize_path(&self.current().dest_root.join(relpath))
    }

    /// Writes generated `contents` to `dst` under the current destination
    /// root and records it under `label`.
    pub fn put_in_file(
        &mut self,
        contents: impl AsRef<[u8]>,
        dst: impl AsRef<Path>,
        label: &str,
    ) -> Result<PathBuf> {
        let dest = self.dst_path_of(dst);
        if let Some(parent) = dest.parent() {
            create_dir_all(parent)?;
        }
        fs::write(&dest, contents).fs_context("writing generated file", &dest)?;
        self.record(EntrySource::Generated(label.to_string()), dest.clone());
        Ok(dest)
    }

    /// Copies the text file `src` to `dst` (defaulting to `src`), applying
    /// each `(search, replacement)` pair literally and in order.
    pub fn replace_in<'a>(
        &mut self,
        src: impl AsRef<Path>,
        dst: Option<&Path>,
        substitutions: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<PathBuf> {
        let src = src.as_ref();
        let source = self.find_existing_file([src])?;
        let mut contents =
            fs::read_to_string(&source).fs_context("reading template", &source)?;
        for (search, replacement) in substitutions {
            contents = contents.replace(search, replacement);
        }
        let dest = self.dst_path_of(dst.unwrap_or(src));
        if let Some(parent) = dest.parent() {
            create_dir_all(parent)?;
        }
        fs::write(&dest, contents).fs_context("writing", &dest)?;
        self.record(EntrySource::File(source), dest.clone());
        Ok(dest)
    }

    /// Copies `dir/file` to `file` in the current destination.
    pub fn path2basename(&mut self, dir: impl AsRef<Path>, file: &str) -> Result<Resolution> {
        let src = dir.as_ref().join(file);
        self.path_to(src, file)
    }

    /// Returns the first candidate present under the current source root,
    /// then the current build root.
    pub fn find_existing_file<I, P>(&self, candidates: I) -> Result<PathBuf>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut tried = Vec::new();
        for candidate in candidates {
            let candidate = candidate.as_ref();
            for full in [self.src_path_of(candidate), self.build_path_of(candidate)] {
                if fs::symlink_metadata(&full).is_ok() {
                    return Ok(full);
                }
                tried.push(full);
            }
        }
        Err(Error::GenericError(format!(
            "none of the candidate files exist: {}",
            tried
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }
}

/// `path`, its parent, its grandparent, ... up to and including the first
/// component.
///
/// `a/b/c` yields `a/b/c`, `a/b`, `a`.
pub fn path_ancestors(path: &Path) -> impl Iterator<Item = &Path> {
    path.ancestors().filter(|p| !p.as_os_str().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(tmp: &Path) -> ManifestBuilder {
        ManifestBuilder::new(tmp.join("src"), tmp.join("build"), tmp.join("dst"))
    }

    #[test]
    fn ancestors_stop_at_first_component() {
        let got: Vec<_> = path_ancestors(Path::new("a/b/c")).collect();
        assert_eq!(got, [Path::new("a/b/c"), Path::new("a/b"), Path::new("a")]);
    }

    #[test]
    fn put_in_file_records_generated_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let mut m = builder(tmp.path());
        let dest = m
            .put_in_file("Alice\nBob", "app_settings/contributors.txt", "contributors")
            .unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "Alice\nBob");
        assert_eq!(
            m.entries()[0].source,
            EntrySource::Generated("contributors".into())
        );
    }

    #[test]
    fn replace_in_applies_substitutions_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src/template.nsi"), "v=%%VERSION%% c=%%CHANNEL%%").unwrap();
        let mut m = builder(tmp.path());

        let dest = m
            .replace_in(
                "template.nsi",
                Some(Path::new("out.nsi")),
                [("%%VERSION%%", "7.1.9"), ("%%CHANNEL%%", "Release")],
            )
            .unwrap();
        assert_eq!(fs::read_to_string(dest).unwrap(), "v=7.1.9 c=Release");
    }

    #[test]
    fn find_existing_file_falls_back_to_build_root() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("build")).unwrap();
        fs::write(tmp.path().join("build/viewer.exe"), "").unwrap();
        let m = builder(tmp.path());

        let found = m.find_existing_file(["missing.exe", "viewer.exe"]).unwrap();
        assert_eq!(found, tmp.path().join("build/viewer.exe"));
        assert!(m.find_existing_file(["nope"]).is_err());
    }
}
