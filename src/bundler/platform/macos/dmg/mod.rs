//! Disk image packaging.
//!
//! # Architecture
//!
//! - `creation` - sparse image, attach, device/volume parsing, detach
//! - `customization` - app and template files, Applications alias,
//!   Finder layout, hidden-file flags
//! - `conversion` - sparse to compressed UDZO
//!
//! The image is detached on every path once it has been attached, and
//! only a detached image is converted.

mod conversion;
mod creation;
mod customization;

pub use conversion::convert_to_compressed;
pub use creation::{
    ImagePaths, MountedVolume, attach, create_sparse_image, detach, parse_attach_output,
    volume_name,
};
pub use customization::{channel_template, customize_volume, template_dir};

use super::sign;
use crate::bundler::{
    error::{Context, Error, Result},
    manifest::ManifestBuilder,
    settings::Settings,
};
use std::path::PathBuf;

/// Builds `<installer base name>.dmg` next to the staged app bundle and
/// returns its path.
pub async fn build_disk_image(settings: &Settings, manifest: &ManifestBuilder) -> Result<PathBuf> {
    let staged = manifest.dest_base();
    let out_dir = staged
        .parent()
        .with_context(|| format!("{} has no parent directory", staged.display()))?;
    let images = ImagePaths::new(settings, out_dir);
    images.remove_stale()?;

    let volname = volume_name(settings);
    create_sparse_image(&images.sparse, &volname).await?;
    let volume = attach(&images.sparse).await?;

    let prepared = async {
        customize_volume(settings, manifest, &volname, &volume.path).await?;
        if let Some(identity) = settings.signature() {
            let app = volume.path.join(format!("{}.app", settings.app_name()));
            sign::sign_app(&app, identity).await?;
        }
        Ok::<_, Error>(())
    }
    .await;

    let detached = detach(&volume.device).await;
    prepared?;
    detached?;

    convert_to_compressed(&images.sparse, &images.dmg).await?;
    Ok(images.dmg)
}
