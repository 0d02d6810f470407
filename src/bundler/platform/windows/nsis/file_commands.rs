//! Install and uninstall file sections of the NSIS script.
//!
//! Both sections are derived from the staged manifest. Paths are visited
//! deepest directory first, with ties broken by ascending path, so the
//! output is identical across repeated builds of the same tree.

use crate::bundler::manifest::{ManifestEntry, path_ancestors};
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

/// Which section to generate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileCommandMode {
    /// `SetOutPath` / `File` pairs
    Install,
    /// `Delete` per file, then `RMDir` per directory
    Uninstall,
}

const INSTDIR: &str = "$INSTDIR";

/// Renders the file commands for `entries` staged under `dest_base`.
///
/// Debug symbol files (`.pdb`) are never installed.
pub fn nsi_file_commands(
    entries: &[ManifestEntry],
    dest_base: &Path,
    mode: FileCommandMode,
) -> String {
    let mut files: Vec<(PathBuf, &Path)> = entries
        .iter()
        .filter(|e| e.dest.extension().is_none_or(|ext| ext != "pdb"))
        .filter_map(|e| {
            e.dest
                .strip_prefix(dest_base)
                .ok()
                .map(|rel| (rel.to_path_buf(), e.dest.as_path()))
        })
        .collect();
    files.sort_by(|(a, _), (b, _)| deepest_first(a, b));
    files.dedup_by(|(a, _), (b, _)| a == b);

    let mut out = String::new();
    match mode {
        FileCommandMode::Install => {
            let mut out_path: Option<String> = None;
            for (rel, staged) in &files {
                let dir = installed_path(rel.parent().unwrap_or(Path::new("")));
                if out_path.as_deref() != Some(dir.as_str()) {
                    out.push_str(&format!("SetOutPath \"{dir}\"\n"));
                    out_path = Some(dir);
                }
                out.push_str(&format!("File \"{}\"\n", wpath(staged)));
            }
        }
        FileCommandMode::Uninstall => {
            for (rel, _) in &files {
                out.push_str(&format!("Delete \"{}\"\n", installed_path(rel)));
            }

            // every ancestor, so directories holding only directories go too
            let dirs: BTreeSet<PathBuf> = entries
                .iter()
                .filter_map(|e| e.dest.strip_prefix(dest_base).ok())
                .filter_map(Path::parent)
                .flat_map(path_ancestors)
                .map(Path::to_path_buf)
                .collect();
            let mut dirs: Vec<PathBuf> = dirs.into_iter().collect();
            dirs.sort_by(|a, b| deepest_first(a, b));
            for dir in dirs {
                out.push_str(&format!("RMDir \"{}\"\n", installed_path(&dir)));
            }
        }
    }
    out
}

fn deepest_first(a: &Path, b: &Path) -> std::cmp::Ordering {
    let depth = |p: &Path| p.components().count();
    depth(b).cmp(&depth(a)).then_with(|| a.cmp(b))
}

/// `$INSTDIR\<rel>` with Windows separators.
fn installed_path(rel: &Path) -> String {
    let rel = wpath(rel);
    if rel.is_empty() {
        INSTDIR.to_string()
    } else {
        format!("{INSTDIR}\\{rel}")
    }
}

/// Backslash separators, no trailing separator.
fn wpath(path: &Path) -> String {
    let s = path.to_string_lossy().replace('/', "\\");
    s.trim_end_matches('\\').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::manifest::EntrySource;

    fn entry(base: &Path, rel: &str) -> ManifestEntry {
        ManifestEntry {
            source: EntrySource::Generated("test".into()),
            dest: base.join(rel),
        }
    }

    #[test]
    fn install_groups_files_by_directory_deepest_first() {
        let base = Path::new("/stage");
        let entries = vec![
            entry(base, "Firestorm.exe"),
            entry(base, "llplugin/locales/de.pak"),
            entry(base, "llplugin/libcef.dll"),
            entry(base, "llplugin/locales/am.pak"),
        ];
        let out = nsi_file_commands(&entries, base, FileCommandMode::Install);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            [
                r#"SetOutPath "$INSTDIR\llplugin\locales""#,
                r#"File "\stage\llplugin\locales\am.pak""#,
                r#"File "\stage\llplugin\locales\de.pak""#,
                r#"SetOutPath "$INSTDIR\llplugin""#,
                r#"File "\stage\llplugin\libcef.dll""#,
                r#"SetOutPath "$INSTDIR""#,
                r#"File "\stage\Firestorm.exe""#,
            ]
        );
    }

    #[test]
    fn pdb_files_are_left_out() {
        let base = Path::new("/stage");
        let entries = vec![entry(base, "libeay32.pdb"), entry(base, "libeay32.dll")];
        let out = nsi_file_commands(&entries, base, FileCommandMode::Install);
        assert!(!out.contains(".pdb"));
        assert!(out.contains("libeay32.dll"));
    }

    #[test]
    fn uninstall_removes_each_directory_once() {
        let base = Path::new("/stage");
        let entries = vec![
            entry(base, "skins/default/xui/en/a.xml"),
            entry(base, "skins/default/xui/de/b.xml"),
            entry(base, "skins/skins.xml"),
        ];
        let out = nsi_file_commands(&entries, base, FileCommandMode::Uninstall);
        let rmdirs: Vec<&str> = out.lines().filter(|l| l.starts_with("RMDir")).collect();
        assert_eq!(
            rmdirs,
            [
                r#"RMDir "$INSTDIR\skins\default\xui\de""#,
                r#"RMDir "$INSTDIR\skins\default\xui\en""#,
                r#"RMDir "$INSTDIR\skins\default\xui""#,
                r#"RMDir "$INSTDIR\skins\default""#,
                r#"RMDir "$INSTDIR\skins""#,
            ]
        );
        assert_eq!(out.lines().filter(|l| l.starts_with("Delete")).count(), 3);
    }

    #[test]
    fn output_is_stable_regardless_of_entry_order() {
        let base = Path::new("/stage");
        let mut entries = vec![
            entry(base, "a/b/c.txt"),
            entry(base, "z.txt"),
            entry(base, "a/d.txt"),
        ];
        let first = nsi_file_commands(&entries, base, FileCommandMode::Uninstall);
        entries.reverse();
        let second = nsi_file_commands(&entries, base, FileCommandMode::Uninstall);
        assert_eq!(first, second);
    }
}
