//! Kernel Source Module
//!
//! Handles interactions with the Linux kernel source tree:
//! - Git operations (reset, clean, external patch application)
//! - Guarded hook injection and removal in C sources

pub mod git;
pub mod patcher;
