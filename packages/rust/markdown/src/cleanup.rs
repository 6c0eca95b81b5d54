//! Cleanup passes for generated article bodies.
//!
//! Each pass is a function `&str -> String` so they compose the same way
//! regardless of which stage needs them.

use std::sync::LazyLock;

use regex::Regex;

/// Run the passes every freshly generated draft goes through.
pub fn clean_draft(md: &str) -> String {
    let mut result = md.to_string();

    result = strip_end_markers(&result);
    result = normalize_line_endings(&result);
    result = clean_blank_lines(&result);

    result.trim().to_string()
}

// ---------------------------------------------------------------------------
// Pass 1: End-of-text sentinels
// ---------------------------------------------------------------------------

/// Remove every `---END---` sentinel line, wherever it appears.
///
/// The service sometimes emits the marker mid-article followed by more text,
/// so this is not a tail trim.
pub fn strip_end_markers(md: &str) -> String {
    static END_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n*---END---[^\n]*").expect("valid regex"));

    END_RE.replace_all(md, "").trim().to_string()
}

// ---------------------------------------------------------------------------
// Pass 2: Line endings
// ---------------------------------------------------------------------------

fn normalize_line_endings(md: &str) -> String {
    md.replace("\r\n", "\n")
}

// ---------------------------------------------------------------------------
// Pass 3: Blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of blank lines into a single blank line.
fn clean_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").to_string()
}

// ---------------------------------------------------------------------------
// Headings
// ---------------------------------------------------------------------------

fn h1_text(line: &str) -> Option<&str> {
    line.strip_prefix("# ").map(str::trim)
}

/// Text of the first level-1 heading within the first `max_lines` lines.
pub fn leading_h1(md: &str, max_lines: usize) -> Option<String> {
    md.lines()
        .take(max_lines)
        .find_map(h1_text)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

/// Drop the first level-1 heading line; the title lives in the header block.
pub fn remove_first_h1(md: &str) -> String {
    let mut removed = false;
    let lines: Vec<&str> = md
        .lines()
        .filter(|line| {
            if !removed && h1_text(line).is_some() {
                removed = true;
                return false;
            }
            true
        })
        .collect();

    lines.join("\n").trim().to_string()
}

/// First non-empty line that is not a heading, trimmed.
pub fn first_prose_line(md: &str) -> Option<&str> {
    md.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
}

/// First `n` characters of `text`.
pub fn take_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

// ---------------------------------------------------------------------------
// Header block
// ---------------------------------------------------------------------------

/// Split a document into its `---` delimited header block and body.
///
/// Returns `(None, text)` when the document has no header block.
pub fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    let Some(rest) = text.strip_prefix("---") else {
        return (None, text);
    };
    let Some(rest) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return (None, text);
    };

    match rest.find("\n---") {
        Some(end) => {
            let header = &rest[..end];
            let after = &rest[end + 4..];
            let body = after.split_once('\n').map_or("", |(_, body)| body);
            (Some(header), body.trim_start_matches('\n'))
        }
        None => (None, text),
    }
}

/// Value of a `key: value` line in a header block, with surrounding quotes removed.
pub fn front_matter_value(header: &str, key: &str) -> Option<String> {
    header.lines().find_map(|line| {
        let value = line.strip_prefix(key)?.strip_prefix(':')?;
        Some(value.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
    })
}
