//! KernelSU hook integrator
//!
//! Injects (or strips) guarded hook call-sites into a kernel source tree and
//! keeps the defconfig feature flag consistent with them, without carrying a
//! hand-written patch per tree.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Rules, toggle settings and per-file outcomes
//! - **config**: Defconfig toggle and the hook registry
//! - **kernel**: Source patching (header, call site, removal) and git patch application
//! - **orchestrator**: Per-file driver over the registry
//! - **log_collector**: `log` backend for reports and diagnostics

// Core foundational modules
pub mod error;
pub mod models;

// Defconfig toggle and registry
pub mod config;

// Source rewriting and git
pub mod kernel;

// Per-file driver
pub mod orchestrator;

// Console logging backend
pub mod log_collector;

// Re-export the log crate for macro usage
pub use log;

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{ConfigError, PatchError};

pub use models::{
    Candidate, FileOutcome, FileReport, InjectionRule, RemovalScope, RunReport, ToggleSpec,
};

pub use config::{apply_toggle, Defconfig, HookRegistry, ToggleOutcome};

pub use kernel::git::{GitError, PatchApplier, PatchOutcome};
pub use kernel::patcher::HookPatcher;

pub use orchestrator::{Orchestrator, OrchestratorOptions};

pub use log_collector::ConsoleCollector;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
