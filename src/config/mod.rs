//! Configuration module for hook integration.
//!
//! # Module Structure
//!
//! - `defconfig`: Locates the kernel defconfig and toggles the feature key
//! - `registry`: The immutable table of hook sites (built-in or TOML)

pub mod defconfig;
pub mod registry;

pub use defconfig::{apply_toggle, Defconfig, ToggleOutcome};
pub use registry::HookRegistry;
