//! Main bundler orchestration.
//!
//! A run stages the platform's files into the destination tree and, when
//! the `package` action is requested, turns that tree into an installer.

use crate::bundler::{
    BundledArtifact, Result,
    manifest::ManifestBuilder,
    platform::{Packager, PlatformPackager},
    settings::Settings,
};

use super::{
    checksum::{calculate_sha256, total_size},
    tool_detection::missing_tools,
};

/// Main bundler orchestrator.
///
/// # Examples
///
/// ```no_run
/// use viewer_bundler::bundler::{Bundler, Settings};
///
/// # async fn example(settings: Settings) -> viewer_bundler::bundler::Result<()> {
/// let artifact = Bundler::new(settings).run().await?;
/// println!("{} ({} bytes)", artifact.path.display(), artifact.size);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Bundler {
    settings: Settings,
}

impl Bundler {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Stages every file, then packages when asked to.
    ///
    /// Without the `package` action the returned artifact is the staging
    /// directory itself.
    pub async fn run(&self) -> Result<BundledArtifact> {
        let settings = &self.settings;
        let packager = Packager::for_settings(settings);
        let packaging = settings.is_packaging();

        if packaging {
            let missing = missing_tools(settings.platform());
            if !missing.is_empty() {
                log::warn!(
                    "Packaging tools not found: {}. The installer step will likely fail.",
                    missing.join(", ")
                );
            }
        }

        let mut manifest = ManifestBuilder::new(
            settings.source_dir(),
            settings.build_dir(),
            settings.dest_dir(),
        );
        log::info!(
            "Staging {} {} for {} into {}",
            settings.app_name(),
            settings.version(),
            settings.platform(),
            settings.dest_dir().display()
        );
        packager.collect_files(&mut manifest)?;
        let manifest_len = manifest.entries().len();
        log::info!("✓ Staged {manifest_len} files");

        let path = if packaging {
            packager.package_finish(&mut manifest).await?
        } else {
            manifest.dest_base().to_path_buf()
        };

        let size = total_size(&path)?;
        let checksum = calculate_sha256(&path).await?;
        Ok(BundledArtifact {
            path,
            size,
            checksum,
            manifest_len,
            packaged: packaging,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
