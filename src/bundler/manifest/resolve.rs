//! Copy rules: pattern resolution fused with the copy itself.

use super::{EntrySource, ManifestBuilder};
use crate::bundler::error::{Error, ErrorExt, Result};
use crate::bundler::utils::fs::{copy_dir, copy_file, normalize_path};
use regex::Regex;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Whether a rule that matches nothing is acceptable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Requirement {
    /// Log and carry on
    #[default]
    Optional,
    /// Fail with [`Error::MissingSource`]
    Required,
}

/// Outcome of a copy rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Files were staged; holds every destination written, directory
    /// contents included
    Copied(Vec<PathBuf>),
    /// Nothing matched (only returned for [`Requirement::Optional`])
    Missing,
}

impl Resolution {
    pub fn is_missing(&self) -> bool {
        matches!(self, Resolution::Missing)
    }

    /// Number of files staged by the rule.
    pub fn count(&self) -> usize {
        self.dests().len()
    }

    pub fn dests(&self) -> &[PathBuf] {
        match self {
            Resolution::Copied(dests) => dests,
            Resolution::Missing => &[],
        }
    }
}

impl ManifestBuilder {
    /// Stages `src` under the same relative name. A miss is logged.
    pub fn path(&mut self, src: impl AsRef<Path>) -> Result<Resolution> {
        self.path_with(src, None::<&Path>, Requirement::Optional)
    }

    /// Stages `src` as `dst`. A miss is logged.
    pub fn path_to(&mut self, src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<Resolution> {
        self.path_with(src, Some(dst), Requirement::Optional)
    }

    /// Stages `src` under the same relative name. A miss is an error.
    pub fn require(&mut self, src: impl AsRef<Path>) -> Result<Resolution> {
        self.path_with(src, None::<&Path>, Requirement::Required)
    }

    /// Stages `src` as `dst`. A miss is an error.
    pub fn require_to(
        &mut self,
        src: impl AsRef<Path>,
        dst: impl AsRef<Path>,
    ) -> Result<Resolution> {
        self.path_with(src, Some(dst), Requirement::Required)
    }

    /// Resolves `src` against the current frame and copies every match.
    ///
    /// `src` may contain `*`, `?` and `[...]`. It is tried under the source
    /// root first and under the build root only when nothing matched there.
    /// Each `*` in `dst` receives the text captured by the corresponding `*`
    /// in `src`. Excluded matches are skipped; matched directories are
    /// copied whole.
    pub fn path_with(
        &mut self,
        src: impl AsRef<Path>,
        dst: Option<impl AsRef<Path>>,
        requirement: Requirement,
    ) -> Result<Resolution> {
        let src = src.as_ref();
        let dst: &Path = match &dst {
            Some(d) => AsRef::<Path>::as_ref(d),
            None => src,
        };
        let frame = self.current().clone();
        let dest_pattern = normalize_path(&frame.dest_root.join(dst));
        let searched = normalize_path(&frame.source_root.join(src));

        let mut roots = vec![frame.source_root.as_path()];
        if frame.build_root != frame.source_root {
            roots.push(frame.build_root.as_path());
        }

        let mut added = Vec::new();
        for root in roots {
            // a wildcard scope root makes every rule under it a glob
            let pattern = normalize_path(&root.join(src));
            if is_glob(&pattern) {
                let matches = expand(&pattern)?;
                if matches.is_empty() {
                    continue;
                }
                let transfer = WildcardTransfer::new(&pattern, &dest_pattern)?;
                for found in matches {
                    if self.is_excluded(&found) {
                        log::debug!("Excluding {}", found.display());
                        continue;
                    }
                    let dest = transfer.dest_for(&found)?;
                    self.copy_into(&found, &dest, &mut added)?;
                }
            } else {
                if fs::symlink_metadata(&pattern).is_err() {
                    continue;
                }
                if self.is_excluded(&pattern) {
                    log::debug!("Excluding {}", pattern.display());
                } else {
                    self.copy_into(&pattern, &dest_pattern, &mut added)?;
                }
            }
            break;
        }

        if !added.is_empty() {
            return Ok(Resolution::Copied(added));
        }
        match requirement {
            Requirement::Optional => {
                log::warn!("No files match {}; skipping", searched.display());
                Ok(Resolution::Missing)
            }
            Requirement::Required => Err(Error::MissingSource { pattern: searched }),
        }
    }

    fn copy_into(&mut self, src: &Path, dest: &Path, added: &mut Vec<PathBuf>) -> Result<()> {
        let metadata = fs::symlink_metadata(src).fs_context("inspecting", src)?;
        if metadata.is_dir() {
            let mut pairs = Vec::new();
            copy_dir(
                src,
                dest,
                |p| !self.is_excluded(p),
                |s, d| pairs.push((s.to_path_buf(), d.to_path_buf())),
            )?;
            for (s, d) in pairs {
                added.push(d.clone());
                self.record(EntrySource::File(s), d);
            }
        } else {
            copy_file(src, dest)?;
            added.push(dest.to_path_buf());
            self.record(EntrySource::File(src.to_path_buf()), dest.to_path_buf());
        }
        Ok(())
    }
}

fn is_glob(path: &Path) -> bool {
    path.to_string_lossy().contains(['*', '?', '['])
}

fn expand(pattern: &Path) -> Result<Vec<PathBuf>> {
    let text = pattern.to_string_lossy();
    let options = glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };
    let paths = glob::glob_with(&text, options).map_err(|e| Error::GlobPattern {
        pattern: text.to_string(),
        message: e.msg.to_string(),
    })?;

    let mut found = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => found.push(path),
            Err(e) => {
                let path = e.path().to_path_buf();
                return Err(io::Error::from(e)).fs_context("reading", path);
            }
        }
    }
    found.sort();
    Ok(found)
}

fn slashed(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Carries the text matched by each `*` of a source pattern over to the
/// `*` positions of a destination pattern.
struct WildcardTransfer {
    regex: Regex,
    dest: String,
}

impl WildcardTransfer {
    fn new(src_pattern: &Path, dest_pattern: &Path) -> Result<Self> {
        let src = slashed(src_pattern);
        let regex = Regex::new(&glob_to_regex(&src)).map_err(|e| Error::GlobPattern {
            pattern: src.clone(),
            message: e.to_string(),
        })?;
        Ok(Self {
            regex,
            dest: slashed(dest_pattern),
        })
    }

    fn dest_for(&self, matched: &Path) -> Result<PathBuf> {
        let text = slashed(matched);
        let captures = self.regex.captures(&text).ok_or_else(|| Error::GlobPattern {
            pattern: self.regex.as_str().to_string(),
            message: format!("{text} does not fit the pattern"),
        })?;

        let mut pieces = self.dest.split('*');
        let mut out = pieces.next().unwrap_or_default().to_string();
        for (index, piece) in pieces.enumerate() {
            let captured = captures.get(index + 1).ok_or_else(|| Error::GlobPattern {
                pattern: self.dest.clone(),
                message: "destination has more wildcards than the source".into(),
            })?;
            out.push_str(captured.as_str());
            out.push_str(piece);
        }
        Ok(PathBuf::from(out))
    }
}

/// Translates a glob into an anchored regex where each `*` is a capture
/// group confined to one path segment.
fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut regex = String::from("^");
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => regex.push_str("([^/]*)"),
            '?' => regex.push_str("[^/]"),
            '[' => {
                // a ']' right after the opening (or after '!') is literal
                let mut end = i + 1;
                if chars.get(end) == Some(&'!') {
                    end += 1;
                }
                if chars.get(end) == Some(&']') {
                    end += 1;
                }
                while end < chars.len() && chars[end] != ']' {
                    end += 1;
                }
                if end >= chars.len() {
                    regex.push_str(r"\[");
                } else {
                    regex.push('[');
                    let mut body = &chars[i + 1..end];
                    if body.first() == Some(&'!') {
                        regex.push('^');
                        body = &body[1..];
                    }
                    for &c in body {
                        if matches!(c, '\\' | '[' | ']' | '^' | '&' | '~') {
                            regex.push('\\');
                        }
                        regex.push(c);
                    }
                    regex.push(']');
                    i = end;
                }
            }
            c => regex.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
        i += 1;
    }
    regex.push('$');
    regex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stars_capture_single_segments() {
        let t = WildcardTransfer::new(
            Path::new("/src/skins/*/html"),
            Path::new("/dst/skins/*/html.old"),
        )
        .unwrap();
        assert_eq!(
            t.dest_for(Path::new("/src/skins/default/html")).unwrap(),
            PathBuf::from("/dst/skins/default/html.old")
        );
        assert!(t.dest_for(Path::new("/src/skins/a/b/html")).is_err());
    }

    #[test]
    fn classes_and_question_marks_match_without_capturing() {
        let t = WildcardTransfer::new(
            Path::new("/src/lib[!x]?/*.so"),
            Path::new("/dst/lib/*.so"),
        )
        .unwrap();
        assert_eq!(
            t.dest_for(Path::new("/src/libab/llkdu.so")).unwrap(),
            PathBuf::from("/dst/lib/llkdu.so")
        );
    }

    #[test]
    fn extra_destination_stars_are_rejected() {
        let t = WildcardTransfer::new(Path::new("/src/*.dll"), Path::new("/dst/*/*.dll")).unwrap();
        assert!(t.dest_for(Path::new("/src/a.dll")).is_err());
    }

    #[test]
    fn literal_characters_are_escaped() {
        assert_eq!(glob_to_regex("a.b+c"), r"^a\.b\+c$");
        assert_eq!(glob_to_regex("x[a-c]"), "^x[a-c]$");
        assert_eq!(glob_to_regex("open[x"), r"^open\[x$");
    }
}
