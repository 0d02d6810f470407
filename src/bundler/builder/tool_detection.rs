//! External tool availability checking.
//!
//! Packaging shells out to platform tools. Their presence is checked once
//! up front so a missing tool is reported before staging work is spent,
//! not halfway through an installer build.

use crate::bundler::{platform::windows::nsis::toolset::find_makensis, settings::Platform};
use std::{path::PathBuf, sync::LazyLock};

fn locate(tool: &str) -> Option<PathBuf> {
    match which::which(tool) {
        Ok(path) => {
            log::debug!("Found {tool} at: {}", path.display());
            Some(path)
        }
        Err(e) => {
            log::debug!("{tool} not found in PATH: {e}");
            None
        }
    }
}

/// Whether makensis can be run, checked with `-VERSION`.
pub static HAS_MAKENSIS: LazyLock<bool> = LazyLock::new(|| {
    let path = match find_makensis() {
        Ok(path) => path,
        Err(e) => {
            log::debug!("{e}");
            return false;
        }
    };
    match std::process::Command::new(&path).arg("-VERSION").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout);
            log::info!("✓ makensis available: {}", version.trim());
            true
        }
        Ok(output) => {
            log::warn!(
                "makensis found at {} but -VERSION check failed (exit code: {:?}). Stderr: {}",
                path.display(),
                output.status.code(),
                String::from_utf8_lossy(&output.stderr)
            );
            false
        }
        Err(e) => {
            log::warn!(
                "makensis found at {} but failed to execute: {e}. Check file permissions.",
                path.display()
            );
            false
        }
    }
});

pub static HAS_STRIP: LazyLock<bool> = LazyLock::new(|| locate("strip").is_some());

pub static HAS_HDIUTIL: LazyLock<bool> = LazyLock::new(|| locate("hdiutil").is_some());

pub static HAS_SETFILE: LazyLock<bool> = LazyLock::new(|| locate("SetFile").is_some());

pub static HAS_OSASCRIPT: LazyLock<bool> = LazyLock::new(|| locate("osascript").is_some());

/// Tools the finishing step for `platform` needs.
pub fn packaging_tools(platform: Platform) -> Vec<(&'static str, &'static LazyLock<bool>)> {
    match platform {
        Platform::Windows => vec![("makensis", &HAS_MAKENSIS)],
        Platform::Darwin => vec![
            ("hdiutil", &HAS_HDIUTIL),
            ("SetFile", &HAS_SETFILE),
            ("osascript", &HAS_OSASCRIPT),
            ("strip", &HAS_STRIP),
        ],
        Platform::Linux => vec![("strip", &HAS_STRIP)],
    }
}

/// Names of the packaging tools for `platform` that can't be found.
pub fn missing_tools(platform: Platform) -> Vec<&'static str> {
    packaging_tools(platform)
        .into_iter()
        .filter(|&(_, available)| !**available)
        .map(|(name, _)| name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_platform_lists_its_tools() {
        let names = |p| {
            packaging_tools(p)
                .into_iter()
                .map(|(name, _)| name)
                .collect::<Vec<_>>()
        };
        assert_eq!(names(Platform::Windows), ["makensis"]);
        assert_eq!(names(Platform::Linux), ["strip"]);
        assert!(names(Platform::Darwin).contains(&"hdiutil"));
    }

    #[test]
    fn missing_tools_are_drawn_from_the_platform_list() {
        let listed = packaging_tools(Platform::Darwin);
        for name in missing_tools(Platform::Darwin) {
            assert!(listed.iter().any(|(n, _)| *n == name));
        }
    }
}
