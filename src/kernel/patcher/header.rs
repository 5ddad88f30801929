//! Guarded `#include` injection after the last include directive.

use crate::error::PatchError;
use super::guard::{self, GuardedBlock};

const INCLUDE_DIRECTIVE: &str = "#include";

/// Result of a header injection attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInjection {
    pub content: String,
    /// False when the marker was already present and nothing changed
    pub added: bool,
}

/// Insert `#include <header>` guarded by `guard` after the last textual
/// `#include` in `content`.
///
/// Uses the last occurrence in the text, not the last include that survives
/// preprocessing. A file that already carries `marker` is returned unchanged.
pub fn inject_header(
    content: &str,
    guard: &str,
    marker: &str,
    header: &str,
) -> Result<HeaderInjection, PatchError> {
    if guard::contains_marker(content, guard, marker) {
        return Ok(HeaderInjection {
            content: content.to_string(),
            added: false,
        });
    }

    let last_include = content
        .rfind(INCLUDE_DIRECTIVE)
        .ok_or(PatchError::NoIncludeDirective)?;

    let include_line = format!("{} <{}>", INCLUDE_DIRECTIVE, header);
    let block = GuardedBlock::new(guard, marker, &include_line);

    let injected = match content[last_include..].find('\n') {
        Some(offset) => block.insert_at(content, last_include + offset),
        // Include on the final, unterminated line
        None => block.append_unterminated(content),
    };

    Ok(HeaderInjection {
        content: injected,
        added: true,
    })
}
