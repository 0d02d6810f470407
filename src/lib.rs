//! Viewer packaging library
//!
//! Stages a compiled viewer into a distribution tree and builds the
//! platform installer from it:
//! - Windows NSIS setup executables
//! - macOS disk images
//! - Linux tarballs
//!
//! It can be used both as a CLI tool (`viewer_manifest`) and as a library
//! dependency.

pub mod bundler;
pub mod cli;
pub mod error;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
