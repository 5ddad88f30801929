//! Guarded hook injection and removal for kernel C sources.
//!
//! `HookPatcher` works on in-memory content only; the orchestrator owns file
//! I/O so a file is written once, after every step for it has succeeded.

pub mod callsite;
pub mod guard;
pub mod header;

use crate::error::PatchError;
use crate::models::{FileOutcome, InjectionRule, RemovalScope};

/// Result type for patching operations
pub type PatchResult<T> = std::result::Result<T, PatchError>;

/// New content for a file together with what happened to it
#[derive(Debug)]
pub struct Rewrite {
    pub content: String,
    pub outcome: FileOutcome,
}

impl Rewrite {
    pub fn changed(&self, original: &str) -> bool {
        self.content != original
    }
}

/// Applies registry rules to source text
#[derive(Debug, Clone)]
pub struct HookPatcher {
    /// Preprocessor symbol guarding every block (e.g. CONFIG_KSU)
    guard: String,
    /// Header pulled in by the guarded include (e.g. ksu_hook.h)
    header: String,
}

impl HookPatcher {
    pub fn new(guard: impl Into<String>, header: impl Into<String>) -> Self {
        HookPatcher {
            guard: guard.into(),
            header: header.into(),
        }
    }

    pub fn guard(&self) -> &str {
        &self.guard
    }

    /// Add the guarded include and the guarded call site for `rule`.
    ///
    /// Both steps skip themselves when their marker is already present, so
    /// running this on an injected file yields `AlreadyInjected`.
    pub fn inject(&self, content: &str, rule: &InjectionRule) -> PatchResult<Rewrite> {
        let with_header = header::inject_header(
            content,
            &self.guard,
            &rule.header_marker(),
            &self.header,
        )?;
        let with_call = callsite::inject_call_site(&with_header.content, rule, &self.guard)?;

        let outcome = match with_call.function {
            Some(function) => FileOutcome::Injected {
                function,
                header_added: with_header.added,
            },
            None => {
                if with_header.added {
                    log::warn!(
                        "[Patcher] [HEADER] {} had a hook call but no header block; header restored",
                        rule.file
                    );
                }
                FileOutcome::AlreadyInjected
            }
        };

        Ok(Rewrite {
            content: with_call.content,
            outcome,
        })
    }

    /// Remove guarded blocks belonging to `rule` (or every guarded block).
    pub fn strip(&self, content: &str, rule: &InjectionRule, scope: RemovalScope) -> PatchResult<Rewrite> {
        let (stripped, blocks) = match scope {
            RemovalScope::Marked => {
                let (without_call, calls) = guard::remove_marked(content, &self.guard, &rule.marker)?;
                let (without_header, headers) =
                    guard::remove_marked(&without_call, &self.guard, &rule.header_marker())?;
                (without_header, calls + headers)
            }
            RemovalScope::AllGuards => guard::remove_all_guarded(content, &self.guard)?,
        };

        let outcome = if blocks == 0 {
            FileOutcome::NothingToRemove
        } else {
            FileOutcome::Removed { blocks }
        };

        Ok(Rewrite {
            content: stripped,
            outcome,
        })
    }
}
