//! Guarded blocks: `#ifdef GUARD /* marker */ ... #endif /* marker */`.
//!
//! A block is inserted as `"\n\n" + block + "\n"` in front of an existing
//! newline, or as `"\n\n" + block` after an unterminated last line, so removing
//! exactly that text restores the original bytes.

use regex::{NoExpand, Regex};
use crate::error::PatchError;

/// Padding placed in front of every inserted block
const LEADING_PADDING: &str = "\n\n";

/// A conditional-compilation region owned by one marker
#[derive(Debug, Clone, Copy)]
pub struct GuardedBlock<'a> {
    guard: &'a str,
    marker: &'a str,
    body: &'a str,
}

impl<'a> GuardedBlock<'a> {
    pub fn new(guard: &'a str, marker: &'a str, body: &'a str) -> Self {
        GuardedBlock { guard, marker, body }
    }

    pub fn begin_line(&self) -> String {
        begin_line(self.guard, self.marker)
    }

    pub fn end_line(&self) -> String {
        end_line(self.marker)
    }

    /// Block text without padding
    pub fn render(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.begin_line(),
            self.body.trim_end_matches('\n'),
            self.end_line()
        )
    }

    /// Insert the block in front of the newline at `pos`.
    ///
    /// `pos` must index a `\n` in `content` (or equal its length when the
    /// content ends there); anything else would not round-trip through removal.
    pub fn insert_at(&self, content: &str, pos: usize) -> String {
        debug_assert!(pos == content.len() || content.as_bytes()[pos] == b'\n');
        let block = self.render();
        let mut out = String::with_capacity(content.len() + block.len() + 3);
        out.push_str(&content[..pos]);
        out.push_str(LEADING_PADDING);
        out.push_str(&block);
        out.push('\n');
        out.push_str(&content[pos..]);
        out
    }

    /// Append the block to content that does not end in a newline.
    ///
    /// No newline follows the block, so marked removal restores the
    /// unterminated last line as it was.
    pub fn append_unterminated(&self, content: &str) -> String {
        format!("{}{}{}", content, LEADING_PADDING, self.render())
    }
}

fn begin_line(guard: &str, marker: &str) -> String {
    format!("#ifdef {} /* {} */", guard, marker)
}

fn end_line(marker: &str) -> String {
    format!("#endif /* {} */", marker)
}

/// Whether a block with this marker already exists in `content`
pub fn contains_marker(content: &str, guard: &str, marker: &str) -> bool {
    content.contains(&begin_line(guard, marker))
}

/// Remove every block carrying `marker`, padding included.
///
/// Returns the new content and the number of blocks removed.
pub fn remove_marked(content: &str, guard: &str, marker: &str) -> Result<(String, usize), PatchError> {
    let pattern = format!(
        r"(?s)(?:\n\n)?[ \t]*{}\n.*?{}\n?",
        regex::escape(&begin_line(guard, marker)),
        regex::escape(&end_line(marker))
    );
    replace_all_counted(content, &pattern)
}

/// Remove every `#ifdef GUARD ... #endif` region regardless of marker.
///
/// Matches lazily across newlines, so nested conditionals inside a region end
/// it early. Whitespace around the region is left in place.
pub fn remove_all_guarded(content: &str, guard: &str) -> Result<(String, usize), PatchError> {
    let pattern = format!(r"(?s)#ifdef {}\b.*?#endif[^\n]*", regex::escape(guard));
    replace_all_counted(content, &pattern)
}

fn replace_all_counted(content: &str, pattern: &str) -> Result<(String, usize), PatchError> {
    let regex = Regex::new(pattern)
        .map_err(|e| PatchError::RegexInvalid(format!("Invalid regex: {}", e)))?;
    let count = regex.find_iter(content).count();
    if count == 0 {
        return Ok((content.to_string(), 0));
    }
    Ok((regex.replace_all(content, NoExpand("")).into_owned(), count))
}
