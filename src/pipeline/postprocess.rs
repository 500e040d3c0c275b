//! Cosmetic cleanup of model replies.
//!
//! Replies are opaque markdown: nothing here inspects or validates their
//! structure. These passes only undo transport-level quirks so the reply
//! renders the same in the browser and the terminal:
//!
//! 1. Strip an outer ```` ```markdown ```` fence wrapping the whole reply
//! 2. Normalise line endings (CRLF → LF)
//! 3. Trim trailing whitespace per line
//! 4. Collapse 4+ consecutive newlines down to 3
//! 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
//! 6. End with exactly one newline
//!
//! Streaming fragments are never cleaned individually; only the assembled
//! final text is.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup passes in order.
pub fn clean_reply(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    ensure_final_newline(&s)
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        ['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}'],
        "",
    )
}

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_outer_fences() {
        assert_eq!(strip_markdown_fences("```markdown\n**Goal**\nX\n```"), "**Goal**\nX");
        assert_eq!(strip_markdown_fences("```\nplain\n```"), "plain");
    }

    #[test]
    fn inner_code_blocks_survive() {
        let input = "Intro\n```python\nprint(1)\n```\nOutro";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn normalises_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn collapses_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn removes_invisible_chars() {
        assert_eq!(remove_invisible_chars("a\u{200B}b\u{FEFF}c"), "abc");
    }

    #[test]
    fn full_cleanup() {
        let input = "```markdown\r\n1. **Research objective**:  find X   \r\n\r\n\r\n\r\n\r\n2. **Core methodology**: Y\r\n```";
        let out = clean_reply(input);
        assert!(out.starts_with("1. **Research objective**:  find X\n"));
        assert!(!out.contains("\n\n\n\n"));
        assert!(out.ends_with("Y\n"));
    }

    #[test]
    fn empty_reply_becomes_single_newline() {
        assert_eq!(clean_reply("   "), "\n");
    }
}
