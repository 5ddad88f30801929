//! External patch application using the `git2` crate.
//!
//! Resets the kernel tree to `HEAD`, removes untracked files, then applies a
//! unified diff in two phases: a dry-run check against the working directory,
//! and the real application only if the check passed.

use std::fs;
use std::path::{Path, PathBuf};
use git2::{ApplyLocation, ApplyOptions, Diff, ObjectType, Repository, ResetType, Status, StatusOptions};
use thiserror::Error;

/// Errors that can occur during git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Reset error: {0}")]
    Reset(String),

    #[error("Clean error: {0}")]
    Clean(String),

    #[error("Patch file not readable: {0}")]
    PatchNotFound(String),

    #[error("Patch apply failed after a successful check: {0}")]
    Apply(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Git2 error: {0}")]
    Git2(#[from] git2::Error),
}

/// Result type for git operations
pub type GitResult<T> = Result<T, GitError>;

/// Result of a check-then-apply run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    /// Check passed and the patch is now in the working tree
    Applied,
    /// Check failed; the tree is clean and unpatched. Holds the diagnostic.
    CheckFailed(String),
}

/// Applies external diffs to a kernel repository
pub struct PatchApplier {
    repo_path: PathBuf,
}

impl PatchApplier {
    /// Creates an applier for an existing repository
    pub fn new(repo_path: impl AsRef<Path>) -> GitResult<Self> {
        let repo_path = repo_path.as_ref().to_path_buf();
        Repository::open(&repo_path).map_err(|e| {
            GitError::Repository(format!(
                "Failed to open repository at {:?}: {}",
                repo_path, e
            ))
        })?;
        Ok(PatchApplier { repo_path })
    }

    fn open(&self) -> GitResult<Repository> {
        Repository::open(&self.repo_path)
            .map_err(|e| GitError::Repository(format!("Failed to open repository: {}", e)))
    }

    /// Discard all local edits and untracked files.
    ///
    /// Equivalent to `git reset --hard && git clean -fd`; ignored files stay.
    /// Returns the number of untracked entries removed.
    pub fn reset_clean(&self) -> GitResult<usize> {
        let repo = self.open()?;
        Self::reset_clean_repo(&repo)
    }

    fn reset_clean_repo(repo: &Repository) -> GitResult<usize> {
        let head = repo
            .head()
            .and_then(|head| head.peel(ObjectType::Commit))
            .map_err(|e| GitError::Reset(format!("Failed to resolve HEAD: {}", e)))?;
        repo.reset(&head, ResetType::Hard, None)
            .map_err(|e| GitError::Reset(format!("Hard reset failed: {}", e)))?;
        log::debug!("[Git] [RESET] Working tree reset to {}", head.id());

        let workdir = repo
            .workdir()
            .ok_or_else(|| GitError::Clean("Repository has no working directory".to_string()))?;

        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(false)
            .include_ignored(false);
        let statuses = repo
            .statuses(Some(&mut opts))
            .map_err(|e| GitError::Clean(format!("Failed to read status: {}", e)))?;

        let mut removed = 0usize;
        for entry in statuses.iter() {
            if !entry.status().contains(Status::WT_NEW) {
                continue;
            }
            let Some(relative) = entry.path() else {
                continue;
            };
            let path = workdir.join(relative);
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
            log::debug!("[Git] [CLEAN] Removed untracked {}", relative);
            removed += 1;
        }
        Ok(removed)
    }

    /// Reset the tree, then check and apply `patch_file`.
    ///
    /// The patch is read before the clean step so a patch kept untracked inside
    /// the tree survives. A check failure is an outcome, not an error.
    pub fn apply_patch(&self, patch_file: &Path) -> GitResult<PatchOutcome> {
        let buffer = fs::read(patch_file).map_err(|e| {
            GitError::PatchNotFound(format!("{}: {}", patch_file.display(), e))
        })?;

        let repo = self.open()?;
        let removed = Self::reset_clean_repo(&repo)?;
        log::info!(
            "[Git] [RESET] {} reset to HEAD, {} untracked entr{} removed",
            self.repo_path.display(),
            removed,
            if removed == 1 { "y" } else { "ies" }
        );

        let diff = match Diff::from_buffer(&buffer) {
            Ok(diff) => diff,
            Err(e) => {
                let diagnostic = format!("Failed to parse patch: {}", e.message());
                log::warn!("[Git] [CHECK] Patch {} does not apply cleanly: {}", patch_file.display(), diagnostic);
                return Ok(PatchOutcome::CheckFailed(diagnostic));
            }
        };

        let mut check = ApplyOptions::new();
        check.check(true);
        if let Err(e) = repo.apply(&diff, ApplyLocation::WorkDir, Some(&mut check)) {
            let diagnostic = e.message().to_string();
            log::warn!("[Git] [CHECK] Patch {} does not apply cleanly: {}", patch_file.display(), diagnostic);
            return Ok(PatchOutcome::CheckFailed(diagnostic));
        }

        repo.apply(&diff, ApplyLocation::WorkDir, None).map_err(|e| {
            GitError::Apply(format!("{}: {}", patch_file.display(), e.message()))
        })?;

        log::info!("[Git] [APPLY] Successfully applied patch {}", patch_file.display());
        Ok(PatchOutcome::Applied)
    }

    /// Returns the path to the repository
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }
}
