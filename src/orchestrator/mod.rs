//! Hook orchestration: run the registry over the kernel tree, one file at a time.
//!
//! Each target is read, rewritten in memory and written back at most once.
//! Structural and policy outcomes stay inside the per-file report; nothing a
//! single file does stops the files after it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::HookRegistry;
use crate::error::PatchError;
use crate::kernel::patcher::{HookPatcher, Rewrite};
use crate::models::{FileOutcome, FileReport, RemovalScope, RunReport};
use crate::report;

/// Run-wide switches
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorOptions {
    /// Inject hooks (true) or strip them (false)
    pub enable: bool,
    /// Only inject rules marked `core`
    pub disable_external_mods: bool,
    /// What the strip path removes
    pub scope: RemovalScope,
    /// Compute outcomes without writing files
    pub dry_run: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        OrchestratorOptions {
            enable: true,
            disable_external_mods: false,
            scope: RemovalScope::Marked,
            dry_run: false,
        }
    }
}

/// Drives hook injection or removal over a kernel tree
pub struct Orchestrator<'a> {
    registry: &'a HookRegistry,
    kernel_dir: PathBuf,
    options: OrchestratorOptions,
    patcher: HookPatcher,
}

impl<'a> Orchestrator<'a> {
    pub fn new(registry: &'a HookRegistry, kernel_dir: impl Into<PathBuf>, options: OrchestratorOptions) -> Self {
        let patcher = HookPatcher::new(&registry.guard, &registry.header_include);
        Orchestrator {
            registry,
            kernel_dir: kernel_dir.into(),
            options,
            patcher,
        }
    }

    /// Process every target listed in the registry
    pub fn run(&self) -> RunReport {
        self.process_paths(&self.registry.targets)
    }

    /// Process the given paths in order
    pub fn process_paths(&self, paths: &[PathBuf]) -> RunReport {
        log::info!(
            "[Orchestrator] [START] {} hooks in {} file(s) under {}{}",
            if self.options.enable { "Injecting" } else { "Removing" },
            paths.len(),
            self.kernel_dir.display(),
            if self.options.dry_run { " (dry run)" } else { "" }
        );

        let files = paths.iter().map(|path| self.process_file(path)).collect();
        let report = RunReport { files };

        log::info!(
            "[Orchestrator] [DONE] {} written, {} skipped, {} failed",
            report.written(),
            report.skipped(),
            report.failures()
        );
        report
    }

    /// Process one target path
    pub fn process_file(&self, path: &Path) -> FileReport {
        let (outcome, written) = self.evaluate(path);

        match &outcome {
            FileOutcome::Failed(e) if e.is_structural() => {
                log::warn!("[Orchestrator] [FILE] {}: {}", path.display(), e)
            }
            FileOutcome::Failed(e) => log::error!("[Orchestrator] [FILE] {}: {}", path.display(), e),
            other => log::debug!("[Orchestrator] [FILE] {}: {:?}", path.display(), other),
        }
        report!("{}: {}", path.display(), outcome);

        FileReport {
            path: path.to_path_buf(),
            outcome,
            written,
        }
    }

    fn evaluate(&self, path: &Path) -> (FileOutcome, bool) {
        let file_name = match path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => return (FileOutcome::SkippedUnregistered, false),
        };
        let Some(rule) = self.registry.rule_for(&file_name) else {
            return (FileOutcome::SkippedUnregistered, false);
        };

        if self.options.enable && self.options.disable_external_mods && !rule.core {
            return (FileOutcome::SkippedPolicy, false);
        }

        let full_path = self.resolve(path);
        let original = match fs::read_to_string(&full_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let missing = PatchError::FileNotFound(full_path.display().to_string());
                return (FileOutcome::Failed(missing), false);
            }
            Err(e) => return (FileOutcome::Failed(PatchError::IoError(e)), false),
        };

        let rewrite = if self.options.enable {
            self.patcher.inject(&original, rule)
        } else {
            self.patcher.strip(&original, rule, self.options.scope)
        };

        match rewrite {
            Ok(rewrite) => self.commit(&full_path, &original, rewrite),
            Err(e) => (FileOutcome::Failed(e), false),
        }
    }

    fn commit(&self, full_path: &Path, original: &str, rewrite: Rewrite) -> (FileOutcome, bool) {
        if !rewrite.changed(original) || self.options.dry_run {
            return (rewrite.outcome, false);
        }
        match fs::write(full_path, &rewrite.content) {
            Ok(()) => (rewrite.outcome, true),
            Err(e) => (FileOutcome::Failed(PatchError::IoError(e)), false),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.kernel_dir.join(path)
        }
    }
}
