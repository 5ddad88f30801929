//! Hook registry: which files get which hook, and where to find them.
//!
//! The registry is an immutable value built once per run, either from the
//! built-in KernelSU table or from a TOML file, and passed by reference to the
//! orchestrator.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::ConfigError;
use crate::models::{Candidate, InjectionRule, ToggleSpec};

/// Complete hook registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookRegistry {
    /// Preprocessor symbol guarding every injected block
    pub guard: String,
    /// Header included by the guarded include block
    pub header_include: String,
    /// Target files, relative to the kernel root
    pub targets: Vec<PathBuf>,
    #[serde(default)]
    pub toggle: ToggleSpec,
    #[serde(rename = "rule")]
    pub rules: Vec<InjectionRule>,
}

impl HookRegistry {
    /// The KernelSU manual-hook table
    pub fn builtin() -> Self {
        HookRegistry {
            guard: "CONFIG_KSU".to_string(),
            header_include: "ksu_hook.h".to_string(),
            targets: [
                "fs/exec.c",
                "fs/open.c",
                "fs/read_write.c",
                "fs/stat.c",
                "fs/devpts/inode.c",
                "drivers/input/input.c",
            ]
            .iter()
            .map(PathBuf::from)
            .collect(),
            toggle: ToggleSpec::default(),
            rules: vec![
                InjectionRule {
                    file: "exec.c".to_string(),
                    marker: "ksu_hook:exec".to_string(),
                    core: true,
                    candidates: vec![Candidate::new("do_execveat_common")],
                    snippet: "\tif (unlikely(ksu_execveat_hook))\n\
                              \t\tksu_handle_execveat(&fd, &filename, &argv, &envp, &flags);\n\
                              \telse\n\
                              \t\tksu_handle_execveat_sucompat(&fd, &filename, &argv, &envp, &flags);"
                        .to_string(),
                },
                InjectionRule {
                    file: "open.c".to_string(),
                    marker: "ksu_hook:open".to_string(),
                    core: true,
                    candidates: vec![
                        Candidate::new("do_faccessat"),
                        Candidate::new("SYSCALL_DEFINE3(faccessat,"),
                    ],
                    snippet: "\tksu_handle_faccessat(&dfd, &filename, &mode, NULL);".to_string(),
                },
                InjectionRule {
                    file: "read_write.c".to_string(),
                    marker: "ksu_hook:read_write".to_string(),
                    core: true,
                    candidates: vec![Candidate::new("vfs_read")],
                    snippet: "\tif (unlikely(ksu_vfs_read_hook))\n\
                              \t\tksu_handle_vfs_read(&file, &buf, &count, &pos);"
                        .to_string(),
                },
                InjectionRule {
                    file: "stat.c".to_string(),
                    marker: "ksu_hook:stat".to_string(),
                    core: true,
                    candidates: vec![
                        // vfs_statx names its flags parameter `flags`
                        Candidate::new("vfs_statx").with_rewrite("flag", "flags"),
                        Candidate::new("vfs_fstatat"),
                    ],
                    snippet: "\tif (unlikely(ksu_vfs_stat_hook))\n\
                              \t\tksu_handle_stat(&dfd, &filename, &flag);"
                        .to_string(),
                },
                InjectionRule {
                    file: "inode.c".to_string(),
                    marker: "ksu_hook:devpts".to_string(),
                    core: false,
                    candidates: vec![Candidate::new("*devpts_get_priv")],
                    snippet: "\tksu_handle_devpts(dentry->d_inode);".to_string(),
                },
                InjectionRule {
                    file: "input.c".to_string(),
                    marker: "ksu_hook:input".to_string(),
                    core: false,
                    candidates: vec![Candidate::new("input_handle_event")],
                    snippet: "\tif (unlikely(ksu_input_hook))\n\
                              \t\tksu_handle_input_handle_event(&type, &code, &value);"
                        .to_string(),
                },
            ],
        }
    }

    /// Parse and validate a TOML registry
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let registry: HookRegistry = toml::from_str(content)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Load a TOML registry from disk
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(format!("Registry file not found at: {}", path.display()))
            } else {
                ConfigError::IoError(e)
            }
        })?;
        let registry = Self::from_toml_str(&content)?;
        log::info!(
            "[Config] [REGISTRY] Loaded {} rule(s), {} target(s) from {}",
            registry.rules.len(),
            registry.targets.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Check the registry invariants.
    ///
    /// One rule per file name, unique markers (header markers included), at
    /// least one candidate per rule, and marker text that cannot close the
    /// C comment it is written into.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_identifier(&self.guard) {
            return Err(ConfigError::ValidationFailed(format!(
                "guard '{}' is not a preprocessor identifier",
                self.guard
            )));
        }
        if self.header_include.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("header_include cannot be empty".to_string()));
        }
        if !is_identifier(&self.toggle.key) || !is_identifier(&self.toggle.conflict) {
            return Err(ConfigError::ValidationFailed(format!(
                "toggle keys '{}' / '{}' must be identifiers",
                self.toggle.key, self.toggle.conflict
            )));
        }

        let mut files = HashSet::new();
        let mut markers = HashSet::new();
        for rule in &self.rules {
            if !files.insert(rule.file.as_str()) {
                return Err(ConfigError::ConflictDetected(format!(
                    "duplicate rule for file '{}'",
                    rule.file
                )));
            }
            if rule.candidates.is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "rule for '{}' has no candidate signatures",
                    rule.file
                )));
            }
            if rule.marker.trim().is_empty() || rule.marker.contains("*/") || rule.marker.contains('\n') {
                return Err(ConfigError::ValidationFailed(format!(
                    "rule for '{}' has an invalid marker '{}'",
                    rule.file, rule.marker
                )));
            }
            for marker in [rule.marker.clone(), rule.header_marker()] {
                if !markers.insert(marker.clone()) {
                    return Err(ConfigError::ConflictDetected(format!(
                        "marker '{}' is used more than once",
                        marker
                    )));
                }
            }
        }
        Ok(())
    }

    /// Rule registered for a file base name
    pub fn rule_for(&self, file_name: &str) -> Option<&InjectionRule> {
        self.rules.iter().find(|rule| rule.file == file_name)
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
