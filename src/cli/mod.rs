//! Command line interface for the viewer packager.
//!
//! Parses arguments, builds [`Settings`](crate::bundler::Settings), runs
//! the [`Bundler`] and prints a summary of the artifact.

mod args;

pub use args::Args;

use crate::bundler::{BundledArtifact, Bundler, Error};
use crate::error::{CliError, Result};

/// Main CLI entry point
pub async fn run(args: &Args) -> Result<i32> {
    let settings = args.to_builder()?.build().map_err(missing_argument)?;
    let artifact = Bundler::new(settings).run().await?;
    print_summary(&artifact);
    Ok(0)
}

// the builder names the first absent required key as "<key> is required"
fn missing_argument(err: Error) -> crate::error::BundlerError {
    match err {
        Error::InvalidSettings(msg) => match msg.strip_suffix(" is required") {
            Some(key) => CliError::MissingArgument {
                argument: key.to_string(),
            }
            .into(),
            None => Error::InvalidSettings(msg).into(),
        },
        other => other.into(),
    }
}

fn print_summary(artifact: &BundledArtifact) {
    let kind = if artifact.packaged { "Installer" } else { "Staged tree" };
    println!("{kind}: {}", artifact.path.display());
    println!("  files:  {}", artifact.manifest_len);
    println!("  size:   {} bytes", artifact.size);
    println!("  sha256: {}", artifact.checksum);
}
