//! Post-processing: deterministic formatting of extracted Markdown.
//!
//! Extractors emit structurally valid but untidy Markdown: Windows line
//! endings carried over from DOCX text runs, trailing spaces from PDF glyph
//! positioning, zero-width characters, headings glued to the previous
//! paragraph. These rules normalise the text before the replacement strategy
//! runs, so strategy patterns only ever see `\n` line breaks and trimmed lines.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule can split on `\n`.
//! Data-URI images are removed before trailing-whitespace trimming so the
//! lines they leave behind are emptied too.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all formatting rules to extracted Markdown.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 3. Remove embedded data-URI images
/// 4. Trim trailing whitespace per line
/// 5. Ensure heading lines have a blank line before them
/// 6. Ensure the text ends with exactly one newline (empty stays empty)
pub fn format_markdown(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = remove_data_uri_images(&s);
    let s = trim_trailing_whitespace(&s);
    let s = normalise_heading_spacing(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Remove data-URI images ───────────────────────────────────────────
//
// Some DOCX producers inline figures as `data:` URIs, which turns a single
// image into megabytes of base64 in the Markdown. The image itself is dropped;
// a bare `[label](data:...)` link keeps its label with an empty target.

static RE_DATA_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[[^\]]*\]\(data:image/[\w.+-]+;base64,?[^)]*\)").unwrap()
});

static RE_DATA_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(data:image/[\w.+-]+;base64,?[^)]*\)").unwrap());

fn remove_data_uri_images(input: &str) -> String {
    let s = RE_DATA_IMAGE.replace_all(input, "");
    RE_DATA_LINK.replace_all(&s, "()").to_string()
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .split('\n')
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Normalise heading spacing ────────────────────────────────────────

fn is_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    (1..=6).contains(&hashes) && line[hashes..].starts_with(' ')
}

fn normalise_heading_spacing(input: &str) -> String {
    // Ensure a blank line before each heading (unless at the very start)
    let mut result = String::with_capacity(input.len() + 64);
    let mut prev: Option<&str> = None;
    for line in input.split('\n') {
        if let Some(p) = prev {
            if is_heading(line) && !p.trim().is_empty() {
                result.push('\n');
            }
            result.push('\n');
        }
        result.push_str(line);
        prev = Some(line);
    }
    result
}

// ── Rule 6: Ensure file ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_trim_trailing_whitespace_keeps_blank_lines() {
        assert_eq!(
            trim_trailing_whitespace("  hello   \n\n\nworld  "),
            "  hello\n\n\nworld"
        );
    }

    #[test]
    fn test_ensure_final_newline() {
        assert_eq!(ensure_final_newline("hello"), "hello\n");
        assert_eq!(ensure_final_newline("hello\n\n\n"), "hello\n");
        assert_eq!(ensure_final_newline(""), "");
        assert_eq!(ensure_final_newline(" \n\n"), "");
    }

    #[test]
    fn test_heading_spacing() {
        let input = "some text\n# Heading\nmore text";
        assert_eq!(normalise_heading_spacing(input), "some text\n\n# Heading\nmore text");
    }

    #[test]
    fn test_heading_spacing_leaves_existing_blank_line() {
        let input = "text\n\n## Heading";
        assert_eq!(normalise_heading_spacing(input), input);
    }

    #[test]
    fn test_heading_spacing_ignores_hashtags() {
        let input = "text\n#hashtag\n####### seven";
        assert_eq!(normalise_heading_spacing(input), input);
    }

    #[test]
    fn test_heading_at_start_gets_no_blank_line() {
        assert_eq!(normalise_heading_spacing("# Title\nbody"), "# Title\nbody");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_remove_data_uri_images() {
        let input = "before ![](data:image/png;base64,iVBORw0KGgo=) after";
        assert_eq!(remove_data_uri_images(input), "before  after");
    }

    #[test]
    fn test_data_uri_link_keeps_label() {
        let input = "[diagram](data:image/jpeg;base64,AAAA)";
        assert_eq!(remove_data_uri_images(input), "[diagram]()");
    }

    #[test]
    fn test_keep_parenthesised_data_prose() {
        let input = "Results (data: 2023 survey) improved (data:text/plain,hi).";
        assert_eq!(remove_data_uri_images(input), input);
    }

    #[test]
    fn test_keep_real_image_link() {
        let input = "![Figure](https://example.org/fig1.png)";
        assert_eq!(remove_data_uri_images(input), input);
    }

    #[test]
    fn test_format_markdown_full_pipeline() {
        let input = "# Title\r\n\r\nSome text   \n## Section\u{200B}\n\n\n\nbody";
        let result = format_markdown(input);
        assert_eq!(result, "# Title\n\nSome text\n\n## Section\n\n\n\nbody\n");
    }
}
