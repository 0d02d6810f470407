//! NSIS utility functions.

use crate::bundler::error::{ErrorExt, Result};
use std::{fs, path::Path};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Write file with UTF-8 BOM (required by NSIS).
///
/// A BOM already present at the start of `content` is not doubled.
pub fn write_utf8_bom(path: &Path, content: &str) -> Result<()> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut bytes = Vec::with_capacity(UTF8_BOM.len() + content.len());
    bytes.extend_from_slice(UTF8_BOM);
    bytes.extend_from_slice(content.as_bytes());
    fs::write(path, bytes).fs_context("writing NSI script", path)
}

/// Rewrites the text file at `path` with a leading UTF-8 BOM.
pub fn add_utf8_bom(path: &Path) -> Result<()> {
    let content = fs::read_to_string(path).fs_context("reading NSI script", path)?;
    write_utf8_bom(path, &content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bom_is_written_once() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("setup.nsi");
        write_utf8_bom(&path, "\u{feff}Name x\n").unwrap();
        add_utf8_bom(&path).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], UTF8_BOM);
        assert_eq!(&bytes[3..], b"Name x\n");
    }
}
