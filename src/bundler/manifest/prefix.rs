//! Prefix frames and scoped narrowing of the source/destination roots.
//!
//! A frame is pushed when a scope is entered and popped when it is left.
//! [`PrefixGuard`] ties the pop to the guard's lifetime so the enclosing
//! frame comes back on every exit path, `?` and panics included.

use super::ManifestBuilder;
use crate::bundler::error::{Error, Result};
use crate::bundler::utils::fs::normalize_path;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

/// The roots in effect for a scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixFrame {
    /// Where resources are looked up
    pub source_root: PathBuf,
    /// Fallback lookup root for compiled artifacts
    pub build_root: PathBuf,
    /// Where matches are copied to
    pub dest_root: PathBuf,
    pub(super) excludes: Vec<glob::Pattern>,
}

impl PrefixFrame {
    pub(super) fn root(source: PathBuf, build: PathBuf, dest: PathBuf) -> Self {
        Self {
            source_root: source,
            build_root: build,
            dest_root: dest,
            excludes: Vec::new(),
        }
    }

    /// Exclusion patterns declared directly in this frame.
    pub fn excludes(&self) -> impl Iterator<Item = &str> {
        self.excludes.iter().map(glob::Pattern::as_str)
    }

    /// Whether an exclusion declared in this frame rejects `path`.
    ///
    /// Patterns without a separator match the file name; patterns with
    /// one match the path relative to this frame's source or build root.
    pub(super) fn rejects(&self, path: &Path) -> bool {
        self.excludes.iter().any(|pattern| {
            if pattern.as_str().contains('/') {
                [&self.source_root, &self.build_root]
                    .into_iter()
                    .filter_map(|root| strip_root(path, root))
                    .any(|rel| pattern.matches_path(&rel))
            } else {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| pattern.matches(name))
            }
        })
    }
}

/// `path` relative to `root`, where components of `root` may be globs
/// as in a `*/html` scope.
fn strip_root(path: &Path, root: &Path) -> Option<PathBuf> {
    let root = normalize_path(root);
    if let Ok(rel) = path.strip_prefix(&root) {
        return Some(rel.to_path_buf());
    }
    let mut rest = path.components();
    for expected in root.components() {
        let actual = rest.next()?;
        if actual == expected {
            continue;
        }
        let segment = glob::Pattern::new(expected.as_os_str().to_str()?).ok()?;
        if !segment.matches(actual.as_os_str().to_str()?) {
            return None;
        }
    }
    Some(rest.as_path().to_path_buf())
}

/// Narrowing to apply when a scope is entered.
///
/// Any side left unset is inherited unchanged from the enclosing frame.
/// Relative components are joined onto the enclosing roots; absolute ones
/// replace them.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    src: Option<PathBuf>,
    build: Option<PathBuf>,
    dst: Option<PathBuf>,
}

impl Scope {
    /// Narrow the source (and build) root only.
    pub fn src(path: impl Into<PathBuf>) -> Self {
        Self {
            src: Some(path.into()),
            ..Default::default()
        }
    }

    /// Narrow the destination root only.
    pub fn dst(path: impl Into<PathBuf>) -> Self {
        Self {
            dst: Some(path.into()),
            ..Default::default()
        }
    }

    /// Narrow source and destination by the same relative path.
    pub fn src_dst(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            src: Some(path.clone()),
            build: None,
            dst: Some(path),
        }
    }

    /// Also narrow the destination.
    pub fn and_dst(mut self, path: impl Into<PathBuf>) -> Self {
        self.dst = Some(path.into());
        self
    }

    /// Narrow the build root differently from the source root.
    pub fn and_build(mut self, path: impl Into<PathBuf>) -> Self {
        self.build = Some(path.into());
        self
    }

    pub(super) fn apply(&self, parent: &PrefixFrame) -> PrefixFrame {
        let join = |root: &Path, part: Option<&PathBuf>| match part {
            Some(part) => root.join(part),
            None => root.to_path_buf(),
        };
        PrefixFrame {
            source_root: join(&parent.source_root, self.src.as_ref()),
            build_root: join(&parent.build_root, self.build.as_ref().or(self.src.as_ref())),
            dest_root: join(&parent.dest_root, self.dst.as_ref()),
            excludes: Vec::new(),
        }
    }
}

impl ManifestBuilder {
    /// Enters a scope. Prefer [`ManifestBuilder::prefix`], which pairs the
    /// pop automatically.
    pub fn push(&mut self, scope: Scope) {
        let frame = scope.apply(self.current());
        log::debug!(
            "Entering prefix src={} dst={}",
            frame.source_root.display(),
            frame.dest_root.display()
        );
        self.frames.push(frame);
    }

    /// Leaves the innermost scope, returning its frame.
    ///
    /// The root frame can never be popped: trying to is a scoping bug and
    /// yields [`Error::PrefixUnderflow`].
    pub fn pop(&mut self) -> Result<PrefixFrame> {
        if self.frames.len() <= 1 {
            log::error!("Prefix stack underflow: mismatched scope entry/exit");
            return Err(Error::PrefixUnderflow);
        }
        self.frames.pop().ok_or(Error::PrefixUnderflow)
    }

    /// Enters a scope that is left when the returned guard is dropped.
    pub fn prefix(&mut self, scope: Scope) -> PrefixGuard<'_> {
        self.push(scope);
        let depth = self.frames.len();
        PrefixGuard {
            builder: self,
            depth,
        }
    }

    /// Runs `body` inside a scope.
    pub fn with_prefix<T>(
        &mut self,
        scope: Scope,
        body: impl FnOnce(&mut ManifestBuilder) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.prefix(scope);
        body(&mut guard)
    }

    /// The innermost frame.
    pub fn current(&self) -> &PrefixFrame {
        // frames always holds the root frame
        &self.frames[self.frames.len() - 1]
    }

    /// Number of frames, the root included.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Registers an exclusion for the current scope and everything nested
    /// in it. Sibling scopes are unaffected.
    pub fn exclude(&mut self, pattern: &str) -> Result<()> {
        let compiled = glob::Pattern::new(pattern).map_err(|e| Error::GlobPattern {
            pattern: pattern.to_string(),
            message: e.msg.to_string(),
        })?;
        let depth = self.frames.len() - 1;
        self.frames[depth].excludes.push(compiled);
        Ok(())
    }

    /// Whether any frame on the stack excludes `path`.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.frames.iter().any(|frame| frame.rejects(path))
    }
}

/// Scope guard returned by [`ManifestBuilder::prefix`].
///
/// Dereferences to the builder so rules can be declared through it, and
/// restores the enclosing frame on drop.
pub struct PrefixGuard<'a> {
    builder: &'a mut ManifestBuilder,
    depth: usize,
}

impl Deref for PrefixGuard<'_> {
    type Target = ManifestBuilder;

    fn deref(&self) -> &ManifestBuilder {
        self.builder
    }
}

impl DerefMut for PrefixGuard<'_> {
    fn deref_mut(&mut self) -> &mut ManifestBuilder {
        self.builder
    }
}

impl Drop for PrefixGuard<'_> {
    fn drop(&mut self) {
        // Drop frames pushed manually inside the scope along with our own.
        self.builder.frames.truncate(self.depth - 1);
    }
}
