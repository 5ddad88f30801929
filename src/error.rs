//! Unified error type hierarchy for the hook integrator
//!
//! Provides structured error handling with ConfigError (defconfig and registry)
//! and PatchError (source rewriting). Git failures live in `kernel::git::GitError`.

use std::io;
use thiserror::Error;

/// Configuration file, defconfig and registry errors.
///
/// Every variant is fatal for the run: the enable decision is a precondition
/// for touching any source file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid TOML in registry: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Conflicting settings detected: {0}")]
    ConflictDetected(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Source rewriting errors.
///
/// The structural variants are per-file outcomes: the orchestrator records them
/// and moves on to the next target.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Invalid regex pattern: {0}")]
    RegexInvalid(String),

    #[error("Patch target file not found: {0}")]
    FileNotFound(String),

    #[error("No #include directive found")]
    NoIncludeDirective,

    #[error("Function {} not found", .candidates.join(", "))]
    FunctionNotFound { candidates: Vec<String> },

    #[error("No 'if' statement found in {function}")]
    NoConditional { function: String },

    #[error("IO error during patching: {0}")]
    IoError(#[from] io::Error),
}

impl PatchError {
    /// Whether this error comes from heuristic matching rather than the filesystem
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            PatchError::NoIncludeDirective
                | PatchError::FunctionNotFound { .. }
                | PatchError::NoConditional { .. }
        )
    }
}
