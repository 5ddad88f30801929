//! Call-site injection: locate a function among ranked candidates and insert a
//! guarded snippet in front of its first `if (`.
//!
//! Matching is textual. The first `if` is used as a stand-in for "after the
//! locals, before the real logic"; functions without one are not supported.

use std::collections::BTreeMap;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use crate::error::PatchError;
use crate::models::{Candidate, InjectionRule};
use super::guard::{self, GuardedBlock};

static CONDITIONAL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\s*if\s*\(").expect("Invalid conditional regex")
});

/// A located function definition
#[derive(Debug, Clone, Copy)]
pub struct FunctionMatch<'a> {
    pub candidate: &'a Candidate,
    /// Offset of the body's opening brace
    pub open_brace: usize,
    /// Offset just past the line holding the opening brace
    pub body_start: usize,
}

/// Result of a call-site injection attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSiteInjection {
    pub content: String,
    /// Matched signature; `None` when the marker was already present
    pub function: Option<String>,
}

/// Build the definition pattern for one candidate.
///
/// Syscall macros are matched through to the first brace after the macro head,
/// on the same line or a later one; a `;` before it means a declaration, not a
/// definition. Plain names need `name(...) {` with any whitespace in between.
pub fn candidate_pattern(candidate: &Candidate) -> Result<Regex, PatchError> {
    let escaped = regex::escape(&candidate.signature);
    let pattern = if candidate.is_syscall_macro() {
        format!(r"(?s){}[^{{;]*(?P<open>\{{)[^\n]*\n", escaped)
    } else {
        let boundary = if starts_with_word_char(&candidate.signature) { r"\b" } else { "" };
        format!(r"(?s){}{}\s*\([^)]*\)\s*(?P<open>\{{).*?\n", boundary, escaped)
    };
    Regex::new(&pattern).map_err(|e| PatchError::RegexInvalid(format!("Invalid regex: {}", e)))
}

/// Find the first candidate, in order, whose definition appears in `content`.
pub fn locate_function<'a>(
    content: &str,
    candidates: &'a [Candidate],
) -> Result<Option<FunctionMatch<'a>>, PatchError> {
    for candidate in candidates {
        let regex = candidate_pattern(candidate)?;
        if let Some(caps) = regex.captures(content) {
            let (Some(whole), Some(open)) = (caps.get(0), caps.name("open")) else {
                continue;
            };
            log::debug!(
                "[Injector] [MATCH] {} at byte {}",
                candidate.signature,
                whole.start()
            );
            return Ok(Some(FunctionMatch {
                candidate,
                open_brace: open.start(),
                body_start: whole.end(),
            }));
        }
        log::debug!("[Injector] [MATCH] {} not found, trying next candidate", candidate.signature);
    }
    Ok(None)
}

/// Offset of the brace closing the body opened at `open_brace`.
///
/// Plain brace counting: braces inside strings, comments or character
/// literals are counted too. An unbalanced body runs to end of input.
pub fn body_end(content: &str, open_brace: usize) -> usize {
    let mut depth = 0usize;
    for (offset, byte) in content.as_bytes()[open_brace..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return open_brace + offset;
                }
            }
            _ => {}
        }
    }
    content.len()
}

/// Offset of the newline in front of the first `if (` inside the body.
///
/// The search starts at the newline closing the brace line, so an `if` that
/// is the first statement of the body is found too.
pub fn find_insertion_point(content: &str, found: &FunctionMatch<'_>) -> Option<usize> {
    let start = match content.as_bytes().get(found.body_start.wrapping_sub(1)) {
        Some(b'\n') => found.body_start - 1,
        _ => found.body_start,
    };
    let end = body_end(content, found.open_brace).max(start);
    CONDITIONAL_REGEX
        .find(&content[start..end])
        .map(|m| start + m.start())
}

/// Apply whole-identifier substitutions to a snippet.
pub fn rewrite_tokens(snippet: &str, rewrites: &BTreeMap<String, String>) -> Result<String, PatchError> {
    let mut out = snippet.to_string();
    for (from, to) in rewrites {
        if from.is_empty() {
            continue;
        }
        let lead = if starts_with_word_char(from) { r"\b" } else { "" };
        let trail = if from.chars().last().map_or(false, is_word_char) { r"\b" } else { "" };
        let pattern = format!("{}{}{}", lead, regex::escape(from), trail);
        let regex = Regex::new(&pattern)
            .map_err(|e| PatchError::RegexInvalid(format!("Invalid regex: {}", e)))?;
        out = regex.replace_all(&out, NoExpand(to)).into_owned();
    }
    Ok(out)
}

/// Insert `rule.snippet`, guarded by `guard`, before the first conditional of
/// the first matching candidate.
pub fn inject_call_site(
    content: &str,
    rule: &InjectionRule,
    guard: &str,
) -> Result<CallSiteInjection, PatchError> {
    if guard::contains_marker(content, guard, &rule.marker) {
        return Ok(CallSiteInjection {
            content: content.to_string(),
            function: None,
        });
    }

    let found = locate_function(content, &rule.candidates)?.ok_or_else(|| {
        PatchError::FunctionNotFound {
            candidates: rule.signatures(),
        }
    })?;

    let function = found.candidate.signature.clone();
    let insert_pos = find_insertion_point(content, &found)
        .ok_or_else(|| PatchError::NoConditional { function: function.clone() })?;

    let snippet = rewrite_tokens(&rule.snippet, &found.candidate.rewrites)?;
    let block = GuardedBlock::new(guard, &rule.marker, &snippet);

    Ok(CallSiteInjection {
        content: block.insert_at(content, insert_pos),
        function: Some(function),
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn starts_with_word_char(s: &str) -> bool {
    s.chars().next().map_or(false, is_word_char)
}
