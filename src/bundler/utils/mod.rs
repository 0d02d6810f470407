//! Shared helpers: filesystem primitives, external processes, retries.

pub mod fs;
pub mod process;
pub mod retry;
