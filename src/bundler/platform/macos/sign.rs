//! Code signing of the app bundle inside the mounted image.
//!
//! Signing happens on the copy inside the volume: moving a signed bundle
//! with a plain file copy drops the extended attributes that carry the
//! signature.

use crate::bundler::{
    error::{ErrorExt, Result},
    utils::{
        process::run_command,
        retry::{RetryPolicy, retry},
    },
};
use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};

/// Identity used when the signature setting is empty.
pub const DEFAULT_IDENTITY: &str = "Developer ID Application";

/// Names the build host's secrets checkout, when running under CI.
pub const SECRETS_ENV: &str = "build_secrets_checkout";

/// `identity`, or [`DEFAULT_IDENTITY`] when blank.
pub fn signing_identity(identity: &str) -> &str {
    if identity.trim().is_empty() {
        DEFAULT_IDENTITY
    } else {
        identity
    }
}

/// Keychain holding the signing certificate, and the file with its
/// password.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keychain {
    pub path: PathBuf,
    pub password_file: PathBuf,
}

impl Keychain {
    /// `~/Library/Keychains/viewer.keychain`, unlocked with
    /// `<secrets>/code-signing-osx/password.txt`.
    pub fn new(home: &Path, secrets: &Path) -> Self {
        Self {
            path: home.join("Library").join("Keychains").join("viewer.keychain"),
            password_file: secrets.join("code-signing-osx").join("password.txt"),
        }
    }

    /// Built from `HOME` and [`SECRETS_ENV`], if both are set.
    pub fn from_env() -> Option<Self> {
        let secrets = std::env::var_os(SECRETS_ENV)?;
        let home = std::env::var_os("HOME")?;
        Some(Self::new(Path::new(&home), Path::new(&secrets)))
    }

    async fn unlock(&self) -> Result<()> {
        let password = fs::read_to_string(&self.password_file)
            .fs_context("reading keychain password", &self.password_file)?;
        run_command(
            "security",
            [
                OsStr::new("unlock-keychain"),
                OsStr::new("-p"),
                OsStr::new(password.trim_end()),
                self.path.as_os_str(),
            ],
        )
        .await?;
        Ok(())
    }
}

/// Signs `app` and checks it with Gatekeeper.
///
/// Only a CI host with a secrets checkout carries the keychain; elsewhere
/// this logs and returns.
pub async fn sign_app(app: &Path, identity: &str) -> Result<()> {
    log::info!("Attempting to sign '{}'", app.display());
    let Some(keychain) = Keychain::from_env() else {
        log::info!("{SECRETS_ENV} not set; leaving {} unsigned", app.display());
        return Ok(());
    };
    let identity = signing_identity(identity);

    keychain.unlock().await?;
    let args = [
        OsStr::new("--verbose"),
        OsStr::new("--deep"),
        OsStr::new("--force"),
        OsStr::new("--keychain"),
        keychain.path.as_os_str(),
        OsStr::new("--sign"),
        OsStr::new(identity),
        app.as_os_str(),
    ];
    retry("codesign", RetryPolicy::EXTERNAL_TOOL, || run_command("codesign", args)).await?;

    run_command(
        "spctl",
        [OsStr::new("-a"), OsStr::new("-texec"), OsStr::new("-vv"), app.as_os_str()],
    )
    .await?;
    log::info!("✓ Signed {}", app.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_identity_uses_developer_id() {
        assert_eq!(signing_identity(""), DEFAULT_IDENTITY);
        assert_eq!(
            signing_identity("Developer ID Application: Phoenix"),
            "Developer ID Application: Phoenix"
        );
    }

    #[test]
    fn keychain_paths() {
        let keychain = Keychain::new(Path::new("/Users/build"), Path::new("/secrets"));
        assert_eq!(
            keychain.path,
            PathBuf::from("/Users/build/Library/Keychains/viewer.keychain")
        );
        assert_eq!(
            keychain.password_file,
            PathBuf::from("/secrets/code-signing-osx/password.txt")
        );
    }
}
