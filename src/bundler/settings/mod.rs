//! Configuration for a packaging run.
//!
//! [`Settings`] is built once through [`SettingsBuilder`] from command
//! line values layered over an optional TOML [`SettingsFile`], then shared
//! read-only by the manifest builder and the platform packagers.

mod arch;
mod builder;
mod channel;
mod core;

pub use arch::{Action, AddressSize, Arch, Platform, Version};
pub use builder::{DEFAULT_UPDATE_SERVICE, DEFAULT_VENDOR_BASE, SettingsBuilder, SettingsFile};
pub use channel::ChannelType;
pub use self::core::Settings;
