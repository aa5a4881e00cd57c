/*!
 * Format preservation for translated text.
 *
 * ASS line-break escapes (`\N`, `\\N`, `\n`) are swapped for a sentinel
 * token before a batch leaves the process and swapped back afterwards, so
 * the model can neither translate nor mangle them.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder the model is told to leave untouched
pub const SENTINEL: &str = "<tag##do##not##translate>";

/// Escape every sentinel is restored to
pub const NORMALIZED_LINE_BREAK: &str = "\\n";

/// `\\N`, `\N` and `\n` as literal backslash sequences, longest first
static LINE_BREAK_ESCAPES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\\\N|\\N|\\n").unwrap()
});

/// Markdown code fence wrapped around a whole answer
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)\r?\n?```$").unwrap()
});

/// Format preserver for protecting escapes during translation
pub struct FormatPreserver;

impl FormatPreserver {
    /// Replace line-break escapes with the sentinel
    pub fn escape_line_breaks(text: &str) -> String {
        LINE_BREAK_ESCAPES.replace_all(text, SENTINEL).into_owned()
    }

    /// Replace every sentinel with the normalized line-break escape
    pub fn restore_line_breaks(text: &str) -> String {
        text.replace(SENTINEL, NORMALIZED_LINE_BREAK)
    }

    /// Remove a code fence the model wrapped around its answer
    pub fn strip_code_fence(text: &str) -> &str {
        match CODE_FENCE.captures(text).and_then(|caps| caps.get(1)) {
            Some(inner) => inner.as_str(),
            None => text,
        }
    }

    /// Turn a raw model answer into translated lines
    ///
    /// Blank lines are dropped: blank units are never submitted, so a blank
    /// line in the answer can only be padding added by the model.
    pub fn clean_response(text: &str) -> Vec<String> {
        let unwrapped = Self::strip_code_fence(text.trim());
        Self::restore_line_breaks(unwrapped)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect()
    }
}
