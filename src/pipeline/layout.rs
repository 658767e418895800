//! Layout inference: turn positioned PDF text lines into Markdown blocks.
//!
//! ## Heading detection
//!
//! Characters are counted per rounded font size across the whole document.
//! The most frequent size is body text; every larger size is a heading
//! candidate. Candidates are ranked largest first and mapped to `#`, `##`, …
//! up to the configured number of levels.
//!
//! ## Paragraphs
//!
//! Consecutive lines with the same style and a normal line gap are joined
//! into one paragraph. A vertical gap above [`PARAGRAPH_GAP_FACTOR`] × font
//! size, a style change, a heading or a list marker starts a new block.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// A gap larger than this multiple of the font size ends a paragraph.
pub const PARAGRAPH_GAP_FACTOR: f32 = 1.5;

/// One visual line of text on a PDF page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    /// Dominant font size of the line in points.
    pub font_size: f32,
    /// Every glyph on the line is bold.
    pub bold: bool,
    /// Baseline in PDF user space (grows upwards).
    pub y: f32,
}

/// All lines of one page in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// 1-indexed page number.
    pub page_num: usize,
    pub lines: Vec<TextLine>,
}

// ── Heading map ──────────────────────────────────────────────────────────────

/// Font-size → heading-level lookup built from a document's text.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingMap {
    body_size: Option<u32>,
    /// Heading sizes, largest first; index 0 is level 1.
    levels: Vec<u32>,
}

fn size_key(size: f32) -> u32 {
    size.max(0.0).round() as u32
}

impl HeadingMap {
    /// A map that never reports headings.
    pub fn none() -> Self {
        Self {
            body_size: None,
            levels: Vec::new(),
        }
    }

    /// Rank font sizes over `pages`, keeping at most `max_levels` heading sizes.
    pub fn from_pages(pages: &[PageText], max_levels: usize) -> Self {
        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for line in pages.iter().flat_map(|p| p.lines.iter()) {
            let n = line.text.chars().filter(|c| !c.is_whitespace()).count();
            *counts.entry(size_key(line.font_size)).or_default() += n;
        }

        // Ties go to the smaller size: iteration is ascending and `>` keeps the first.
        let mut body: Option<(u32, usize)> = None;
        for (&size, &count) in &counts {
            if body.map_or(true, |(_, best)| count > best) {
                body = Some((size, count));
            }
        }
        let Some((body_size, _)) = body else {
            return Self::none();
        };

        let levels = counts
            .keys()
            .rev()
            .copied()
            .filter(|&s| s > body_size)
            .take(max_levels)
            .collect();

        Self {
            body_size: Some(body_size),
            levels,
        }
    }

    /// Heading level (1-based) for a font size, or `None` for body text.
    pub fn level_for(&self, font_size: f32) -> Option<usize> {
        let key = size_key(font_size);
        self.levels.iter().position(|&s| s == key).map(|i| i + 1)
    }

    pub fn body_size(&self) -> Option<u32> {
        self.body_size
    }

    pub fn heading_sizes(&self) -> &[u32] {
        &self.levels
    }
}

// ── Block rendering ──────────────────────────────────────────────────────────

static RE_ORDERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,3}[.)]\s").unwrap());

const BULLET_GLYPHS: &[char] = &['•', '◦', '▪', '●', '‣', '·', '–', '-', '*'];

/// Strip a leading bullet glyph, returning the item text.
fn strip_bullet(text: &str) -> Option<&str> {
    let first = text.chars().next()?;
    if !BULLET_GLYPHS.contains(&first) {
        return None;
    }
    let rest = &text[first.len_utf8()..];
    // ASCII markers need a following space so "-5 °C" or "*emphasis*" survive.
    let needs_space = first.is_ascii() || first == '–';
    if needs_space && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}

/// Escape a leading `#` so body text is not read as a heading.
fn escape_leading_hash(text: &str) -> String {
    if text.starts_with('#') {
        format!("\\{text}")
    } else {
        text.to_string()
    }
}

/// Append `next` to a paragraph, re-joining words hyphenated across lines.
fn join_line(buf: &mut String, next: &str) {
    if buf.is_empty() {
        buf.push_str(next);
        return;
    }
    let mut tail = buf.chars().rev();
    let hyphenated = tail.next() == Some('-')
        && tail.next().is_some_and(char::is_alphabetic)
        && next.starts_with(char::is_lowercase);
    if hyphenated {
        buf.pop();
    } else {
        buf.push(' ');
    }
    buf.push_str(next);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Heading(usize),
    ListItem,
    Paragraph,
}

#[derive(Debug)]
struct Block {
    kind: BlockKind,
    text: String,
    bold: bool,
}

impl Block {
    fn render(&self) -> String {
        match self.kind {
            BlockKind::Heading(level) => format!("{} {}", "#".repeat(level), self.text),
            BlockKind::ListItem => self.text.clone(),
            BlockKind::Paragraph if self.bold => format!("**{}**", self.text),
            BlockKind::Paragraph => escape_leading_hash(&self.text),
        }
    }
}

/// Render one page's lines as Markdown.
pub fn render_page(page: &PageText, headings: &HeadingMap) -> String {
    let mut blocks: Vec<Block> = Vec::new();
    let mut prev: Option<&TextLine> = None;

    for line in &page.lines {
        let text = line.text.trim();
        if text.is_empty() {
            continue;
        }

        let continues = prev.is_some_and(|p| {
            let gap = p.y - line.y;
            gap >= 0.0
                && gap <= PARAGRAPH_GAP_FACTOR * p.font_size.max(line.font_size)
                && size_key(p.font_size) == size_key(line.font_size)
                && p.bold == line.bold
        });
        prev = Some(line);

        if let Some(level) = headings.level_for(line.font_size) {
            match blocks.last_mut() {
                // Multi-line headings.
                Some(b) if continues && b.kind == BlockKind::Heading(level) => join_line(&mut b.text, text),
                _ => blocks.push(Block {
                    kind: BlockKind::Heading(level),
                    text: text.to_string(),
                    bold: line.bold,
                }),
            }
            continue;
        }

        if let Some(item) = strip_bullet(text) {
            blocks.push(Block {
                kind: BlockKind::ListItem,
                text: format!("- {item}"),
                bold: line.bold,
            });
            continue;
        }
        if RE_ORDERED_ITEM.is_match(text) {
            blocks.push(Block {
                kind: BlockKind::ListItem,
                text: text.to_string(),
                bold: line.bold,
            });
            continue;
        }

        match blocks.last_mut() {
            Some(b) if continues && matches!(b.kind, BlockKind::Paragraph | BlockKind::ListItem) => {
                join_line(&mut b.text, text)
            }
            _ => blocks.push(Block {
                kind: BlockKind::Paragraph,
                text: text.to_string(),
                bold: line.bold,
            }),
        }
    }

    let mut out = String::new();
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            let tight = block.kind == BlockKind::ListItem && blocks[i - 1].kind == BlockKind::ListItem;
            out.push_str(if tight { "\n" } else { "\n\n" });
        }
        out.push_str(&block.render());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, size: f32, y: f32) -> TextLine {
        TextLine {
            text: text.to_string(),
            font_size: size,
            bold: false,
            y,
        }
    }

    fn page(lines: Vec<TextLine>) -> PageText {
        PageText { page_num: 1, lines }
    }

    #[test]
    fn body_size_is_most_frequent() {
        let p = page(vec![
            line("Big Title", 24.0, 800.0),
            line("Some ordinary body text that is long", 11.0, 770.0),
            line("More ordinary body text", 11.0, 757.0),
            line("Section", 16.0, 730.0),
        ]);
        let map = HeadingMap::from_pages(&[p], 6);
        assert_eq!(map.body_size(), Some(11));
        assert_eq!(map.heading_sizes(), &[24, 16]);
        assert_eq!(map.level_for(24.2), Some(1));
        assert_eq!(map.level_for(16.0), Some(2));
        assert_eq!(map.level_for(11.0), None);
    }

    #[test]
    fn max_levels_caps_heading_sizes() {
        let p = page(vec![
            line("A", 30.0, 800.0),
            line("B", 20.0, 780.0),
            line("body body body body", 10.0, 760.0),
        ]);
        let map = HeadingMap::from_pages(&[p], 1);
        assert_eq!(map.level_for(30.0), Some(1));
        assert_eq!(map.level_for(20.0), None);
    }

    #[test]
    fn empty_document_has_no_headings() {
        let map = HeadingMap::from_pages(&[], 6);
        assert_eq!(map, HeadingMap::none());
        assert_eq!(map.level_for(40.0), None);
    }

    #[test]
    fn renders_headings_and_paragraphs() {
        let p = page(vec![
            line("Introduction", 18.0, 800.0),
            line("The quick brown fox jumps", 11.0, 770.0),
            line("over the lazy dog.", 11.0, 757.0),
            line("A second paragraph.", 11.0, 720.0),
        ]);
        let map = HeadingMap::from_pages(std::slice::from_ref(&p), 6);
        let md = render_page(&p, &map);
        assert_eq!(
            md,
            "# Introduction\n\nThe quick brown fox jumps over the lazy dog.\n\nA second paragraph."
        );
    }

    #[test]
    fn joins_hyphenated_words() {
        let mut buf = String::from("an exam-");
        join_line(&mut buf, "ple of hyphenation");
        assert_eq!(buf, "an example of hyphenation");

        let mut buf = String::from("well-");
        join_line(&mut buf, "Known");
        assert_eq!(buf, "well- Known");
    }

    #[test]
    fn bullets_become_tight_list() {
        let p = page(vec![
            line("• first item", 11.0, 800.0),
            line("• second item", 11.0, 787.0),
            line("continued here", 11.0, 774.0),
            line("1. numbered", 11.0, 761.0),
        ]);
        let md = render_page(&p, &HeadingMap::none());
        assert_eq!(md, "- first item\n- second item continued here\n1. numbered");
    }

    #[test]
    fn ascii_markers_need_space() {
        assert_eq!(strip_bullet("- item"), Some("item"));
        assert_eq!(strip_bullet("-5 degrees"), None);
        assert_eq!(strip_bullet("*emphasis*"), None);
        assert_eq!(strip_bullet("•tight"), Some("tight"));
        assert_eq!(strip_bullet("•"), None);
    }

    #[test]
    fn bold_paragraph_is_wrapped() {
        let mut l = line("Important notice", 11.0, 800.0);
        l.bold = true;
        let md = render_page(&page(vec![l]), &HeadingMap::none());
        assert_eq!(md, "**Important notice**");
    }

    #[test]
    fn leading_hash_in_body_is_escaped() {
        let md = render_page(&page(vec![line("#1 ranked", 11.0, 800.0)]), &HeadingMap::none());
        assert_eq!(md, "\\#1 ranked");
    }
}
