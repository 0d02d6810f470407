//! Target platform, CPU architecture and related value types.

use crate::bundler::error::{Error, Result};
use serde::Deserialize;
use std::{fmt, str::FromStr};

/// Operating system the viewer is packaged for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Windows, packaged as an NSIS installer
    #[serde(alias = "win32", alias = "win")]
    Windows,
    /// macOS, packaged as a disk image
    #[serde(alias = "macos", alias = "mac")]
    Darwin,
    /// Linux, packaged as a tarball
    #[serde(alias = "lnx")]
    Linux,
}

impl Platform {
    /// Short name stored in the build-data sidecar.
    pub fn build_data_name(self) -> &'static str {
        match self {
            Platform::Windows => "win",
            Platform::Darwin => "mac",
            Platform::Linux => "lnx",
        }
    }

    /// Platform of the machine running the packager.
    pub fn host() -> Option<Self> {
        match std::env::consts::OS {
            "windows" => Some(Platform::Windows),
            "macos" => Some(Platform::Darwin),
            "linux" => Some(Platform::Linux),
            _ => None,
        }
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "windows" | "win32" | "win" => Ok(Platform::Windows),
            "darwin" | "macos" | "mac" => Ok(Platform::Darwin),
            "linux" | "lnx" => Ok(Platform::Linux),
            other => Err(Error::InvalidSettings(format!("unknown platform {other:?}"))),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Platform::Windows => "windows",
            Platform::Darwin => "darwin",
            Platform::Linux => "linux",
        })
    }
}

/// CPU architecture of the compiled viewer.
///
/// The spelling given on the command line is kept for installer names,
/// so `i686` and `i386` both map to [`Arch::X86`] but print as given.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Arch {
    /// 32-bit x86 (`i686`, `i386`)
    X86(String),
    /// 64-bit x86
    X86_64,
    /// macOS fat binary
    Universal,
}

impl Arch {
    /// Pointer width the packaged binaries were built for.
    pub fn address_size(&self) -> AddressSize {
        match self {
            Arch::X86(_) => AddressSize::Bits32,
            Arch::X86_64 | Arch::Universal => AddressSize::Bits64,
        }
    }
}

impl FromStr for Arch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "i686" | "i386" | "x86" => Ok(Arch::X86(s.to_string())),
            "x86_64" | "amd64" => Ok(Arch::X86_64),
            "universal" => Ok(Arch::Universal),
            other => Err(Error::ArchError(other.to_string())),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::X86(spelling) => f.write_str(spelling),
            Arch::X86_64 => f.write_str("x86_64"),
            Arch::Universal => f.write_str("universal"),
        }
    }
}

impl<'de> Deserialize<'de> for Arch {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 32- or 64-bit build.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum AddressSize {
    Bits32,
    Bits64,
}

impl AddressSize {
    pub fn bits(self) -> u32 {
        match self {
            AddressSize::Bits32 => 32,
            AddressSize::Bits64 => 64,
        }
    }
}

/// A step of the packaging run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Stage files into the destination tree
    Copy,
    /// Build the installer artifact from the staged tree
    Package,
    /// Stage an unpacked, runnable tree (macOS)
    Unpacked,
}

/// Four-part dotted viewer version, e.g. `7.1.9.74745`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct Version(pub [u32; 4]);

impl Version {
    /// `7-1-9-74745`
    pub fn dashed(&self) -> String {
        self.joined("-")
    }

    /// `7_1_9_74745`
    pub fn underscored(&self) -> String {
        self.joined("_")
    }

    fn joined(&self, sep: &str) -> String {
        self.0
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(sep)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined("."))
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid =
            || Error::InvalidSettings(format!("version {s:?} is not four dotted numbers"));
        let parts = s
            .trim()
            .split('.')
            .map(|p| p.parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>>>()?;
        let parts: [u32; 4] = parts.try_into().map_err(|_| invalid())?;
        Ok(Version(parts))
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_forms() {
        let v: Version = "7.1.9.74745".parse().unwrap();
        assert_eq!(v.to_string(), "7.1.9.74745");
        assert_eq!(v.dashed(), "7-1-9-74745");
        assert_eq!(v.underscored(), "7_1_9_74745");
        assert!("7.1.9".parse::<Version>().is_err());
        assert!("7.1.x.0".parse::<Version>().is_err());
    }

    #[test]
    fn arch_keeps_spelling_and_address_size() {
        let a: Arch = "i686".parse().unwrap();
        assert_eq!(a.to_string(), "i686");
        assert_eq!(a.address_size(), AddressSize::Bits32);
        assert_eq!("x86_64".parse::<Arch>().unwrap().address_size().bits(), 64);
        assert!("sparc".parse::<Arch>().is_err());
    }

    #[test]
    fn platform_aliases() {
        assert_eq!("win32".parse::<Platform>().unwrap(), Platform::Windows);
        assert_eq!("macos".parse::<Platform>().unwrap(), Platform::Darwin);
        assert_eq!(Platform::Linux.build_data_name(), "lnx");
    }
}
