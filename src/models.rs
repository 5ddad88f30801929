//! Core data structures for hook injection.
//!
//! Rules and toggle settings are plain serde values so the registry can be
//! loaded from TOML; outcomes are what the orchestrator reports per file.

use crate::error::PatchError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Prefix that marks a syscall definition macro candidate
pub const SYSCALL_MACRO_PREFIX: &str = "SYSCALL_DEFINE";

/// One candidate function signature, tried in registry order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Identifier (`vfs_read`), pointer-returning form (`*devpts_get_priv`)
    /// or syscall macro head (`SYSCALL_DEFINE3(faccessat,`)
    pub signature: String,
    /// Identifier substitutions applied to the snippet when this candidate wins
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rewrites: BTreeMap<String, String>,
}

impl Candidate {
    pub fn new(signature: impl Into<String>) -> Self {
        Candidate {
            signature: signature.into(),
            rewrites: BTreeMap::new(),
        }
    }

    pub fn with_rewrite(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rewrites.insert(from.into(), to.into());
        self
    }

    /// Whether this candidate is a `SYSCALL_DEFINEn(name, ...)` macro form
    pub fn is_syscall_macro(&self) -> bool {
        self.signature.starts_with(SYSCALL_MACRO_PREFIX)
    }
}

/// Injection rule for one target file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionRule {
    /// Target file base name (e.g. "exec.c")
    pub file: String,
    /// Unique marker carried by this rule's guarded blocks
    pub marker: String,
    /// Core files are still patched when external modifications are disabled
    #[serde(default)]
    pub core: bool,
    /// Payload placed between the guard delimiters
    pub snippet: String,
    /// Candidates in priority order; the first match wins
    #[serde(rename = "candidate")]
    pub candidates: Vec<Candidate>,
}

impl InjectionRule {
    /// Marker used for this rule's guarded include block
    pub fn header_marker(&self) -> String {
        format!("{}:header", self.marker)
    }

    pub fn signatures(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.signature.clone()).collect()
    }
}

/// The single defconfig key toggled by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleSpec {
    /// Toggled key (e.g. "CONFIG_KSU")
    pub key: String,
    /// Mutually exclusive key that must not be `=y`
    pub conflict: String,
    /// Comment label written above an appended key
    pub label: String,
    /// Directories scanned for a defconfig, relative to the kernel root
    pub config_dirs: Vec<PathBuf>,
    /// File name suffix identifying a defconfig
    pub suffix: String,
}

impl Default for ToggleSpec {
    fn default() -> Self {
        ToggleSpec {
            key: "CONFIG_KSU".to_string(),
            conflict: "CONFIG_KPROBES".to_string(),
            label: "KernelSU".to_string(),
            config_dirs: vec![
                PathBuf::from("arch/arm64/configs"),
                PathBuf::from("arch/arm64/configs/vendor"),
            ],
            suffix: "_defconfig".to_string(),
        }
    }
}

/// What the disable path deletes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalScope {
    /// Only blocks carrying the rule's markers
    #[default]
    Marked,
    /// Every `#ifdef GUARD ... #endif` region in the file
    AllGuards,
}

/// Result of processing one target file
#[derive(Debug)]
pub enum FileOutcome {
    Injected {
        function: String,
        header_added: bool,
    },
    AlreadyInjected,
    Removed {
        blocks: usize,
    },
    NothingToRemove,
    SkippedUnregistered,
    SkippedPolicy,
    Failed(PatchError),
}

impl FileOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FileOutcome::Failed(_))
    }

    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            FileOutcome::SkippedUnregistered | FileOutcome::SkippedPolicy
        )
    }
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOutcome::Injected { function, header_added: true } => {
                write!(f, "added header and hook call to {}", function)
            }
            FileOutcome::Injected { function, header_added: false } => {
                write!(f, "added hook call to {} (header already present)", function)
            }
            FileOutcome::AlreadyInjected => write!(f, "hooks already present"),
            FileOutcome::Removed { blocks } => write!(f, "removed {} guarded block(s)", blocks),
            FileOutcome::NothingToRemove => write!(f, "no guarded blocks to remove"),
            FileOutcome::SkippedUnregistered => write!(f, "skipped (not in registry)"),
            FileOutcome::SkippedPolicy => write!(f, "skipped (external modifications disabled)"),
            FileOutcome::Failed(e) => write!(f, "error: {}", e),
        }
    }
}

/// Per-file entry of a run report
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
    /// Whether the file on disk was rewritten
    pub written: bool,
}

/// Outcome of a full orchestrator pass
#[derive(Debug, Default)]
pub struct RunReport {
    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn failures(&self) -> usize {
        self.files.iter().filter(|r| r.outcome.is_failure()).count()
    }

    pub fn skipped(&self) -> usize {
        self.files.iter().filter(|r| r.outcome.is_skip()).count()
    }

    pub fn written(&self) -> usize {
        self.files.iter().filter(|r| r.written).count()
    }

    pub fn outcome_for(&self, file_name: &str) -> Option<&FileOutcome> {
        self.files
            .iter()
            .find(|r| r.path.file_name().map_or(false, |n| n == file_name))
            .map(|r| &r.outcome)
    }
}
