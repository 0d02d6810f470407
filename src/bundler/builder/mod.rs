//! Run orchestration.
//!
//! - [`checksum`] - SHA-256 and size of the produced artifact
//! - [`orchestrator`] - the [`Bundler`] driving one staging/packaging run
//! - [`tool_detection`] - external tool availability checking

pub mod checksum;
mod orchestrator;
pub mod tool_detection;

pub use orchestrator::Bundler;
