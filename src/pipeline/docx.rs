//! DOCX → Markdown: stream the OOXML body with quick-xml.
//!
//! Only `word/document.xml` is required. `styles.xml` resolves style names for
//! heading detection, `numbering.xml` tells bullets from ordered lists and the
//! document relationships supply hyperlink targets; each is optional.
//!
//! The output keeps one block per paragraph, separated by a blank line. Empty
//! paragraphs are kept as empty blocks, so runs of them show up as 3+
//! newlines that the replacement strategy collapses afterwards.

use crate::error::DocMdError;
use crate::output::{DocumentFormat, DocumentMetadata};
use crate::pipeline::input::validate_docx;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const NUMBERING_PART: &str = "word/numbering.xml";
const RELS_PART: &str = "word/_rels/document.xml.rels";
const CORE_PROPS_PART: &str = "docProps/core.xml";
const APP_PROPS_PART: &str = "docProps/app.xml";

/// Markdown and metadata extracted from a DOCX package.
#[derive(Debug, Clone)]
pub struct ExtractedDocx {
    /// Unformatted Markdown; formatting and the strategy run later.
    pub markdown: String,
    pub metadata: DocumentMetadata,
}

/// Convert DOCX `bytes` to raw Markdown.
///
/// `max_heading_levels` caps heading depth; deeper headings become plain
/// paragraphs.
pub fn extract_docx(bytes: &[u8], max_heading_levels: usize) -> Result<ExtractedDocx, DocMdError> {
    let mut package = DocxPackage::open(bytes)?;

    let document = package
        .read_part(DOCUMENT_PART)?
        .ok_or_else(|| DocMdError::NotADocx {
            detail: format!("zip archive has no {}", DOCUMENT_PART),
        })?;

    let styles = match package.read_part(STYLES_PART)? {
        Some(xml) => parse_styles(&xml)?,
        None => HashMap::new(),
    };
    let numbering = match package.read_part(NUMBERING_PART)? {
        Some(xml) => parse_numbering(&xml)?,
        None => Numbering::default(),
    };
    let links = match package.read_part(RELS_PART)? {
        Some(xml) => parse_relationships(&xml)?,
        None => HashMap::new(),
    };
    debug!(
        "DOCX parts: {} styles, {} numbering instances, {} relationships",
        styles.len(),
        numbering.instances.len(),
        links.len()
    );

    let ctx = BodyContext {
        styles: &styles,
        numbering: &numbering,
        links: &links,
        max_heading_levels,
    };
    let markdown = parse_body(&document, &ctx)?;
    let metadata = package.metadata()?;

    Ok(ExtractedDocx { markdown, metadata })
}

/// Read `docProps/core.xml` and `docProps/app.xml` without converting the body.
pub fn docx_metadata(bytes: &[u8]) -> Result<DocumentMetadata, DocMdError> {
    let mut package = DocxPackage::open(bytes)?;
    if package.read_part(DOCUMENT_PART)?.is_none() {
        return Err(DocMdError::NotADocx {
            detail: format!("zip archive has no {}", DOCUMENT_PART),
        });
    }
    package.metadata()
}

// ── Package access ───────────────────────────────────────────────────────────

struct DocxPackage<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> DocxPackage<'a> {
    fn open(bytes: &'a [u8]) -> Result<Self, DocMdError> {
        validate_docx(bytes)?;
        let archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| DocMdError::NotADocx {
            detail: e.to_string(),
        })?;
        Ok(Self { archive })
    }

    fn read_part(&mut self, name: &str) -> Result<Option<String>, DocMdError> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => {
                return Err(DocMdError::CorruptDocx {
                    detail: format!("{}: {}", name, e),
                })
            }
        };
        let mut xml = String::new();
        file.read_to_string(&mut xml)
            .map_err(|e| DocMdError::CorruptDocx {
                detail: format!("{}: {}", name, e),
            })?;
        Ok(Some(xml))
    }

    fn metadata(&mut self) -> Result<DocumentMetadata, DocMdError> {
        let mut metadata = DocumentMetadata {
            format: Some(DocumentFormat::Docx),
            ..Default::default()
        };

        if let Some(xml) = self.read_part(CORE_PROPS_PART)? {
            for (key, value) in simple_elements(&xml, CORE_PROPS_PART)? {
                let slot = match key.as_str() {
                    "title" => &mut metadata.title,
                    "creator" => &mut metadata.author,
                    "subject" => &mut metadata.subject,
                    "created" => &mut metadata.creation_date,
                    "modified" => &mut metadata.modification_date,
                    _ => continue,
                };
                *slot = Some(value);
            }
        }
        if let Some(xml) = self.read_part(APP_PROPS_PART)? {
            for (key, value) in simple_elements(&xml, APP_PROPS_PART)? {
                match key.as_str() {
                    "Application" => metadata.creator = Some(value),
                    "Pages" => metadata.page_count = value.parse().unwrap_or_default(),
                    _ => {}
                }
            }
        }
        Ok(metadata)
    }
}

// ── XML helpers ──────────────────────────────────────────────────────────────

fn corrupt(part: &str, err: impl std::fmt::Display) -> DocMdError {
    DocMdError::CorruptDocx {
        detail: format!("{}: {}", part, err),
    }
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .with_checks(false)
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// OOXML on/off properties: `<w:b/>` is on, `<w:b w:val="0"/>` is off.
fn toggle_on(e: &BytesStart<'_>) -> bool {
    !matches!(
        attr_value(e, b"val").as_deref(),
        Some("0" | "false" | "off" | "none")
    )
}

/// Collect `(local name, text)` for every leaf element with non-empty text.
fn simple_elements(xml: &str, part: &str) -> Result<Vec<(String, String)>, DocMdError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut out = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                current = Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Text(ref e)) => {
                if let Some(name) = current.take() {
                    let text = e.unescape().map_err(|err| corrupt(part, err))?;
                    let text = text.trim();
                    if !text.is_empty() {
                        out.push((name, text.to_string()));
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => return Err(corrupt(part, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

// ── styles.xml ───────────────────────────────────────────────────────────────

/// Style id → display name.
fn parse_styles(xml: &str) -> Result<HashMap<String, String>, DocMdError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut styles = HashMap::new();
    let mut current_id: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"style" => current_id = attr_value(e, b"styleId"),
                b"name" => {
                    if let (Some(id), Some(name)) = (current_id.as_ref(), attr_value(e, b"val")) {
                        styles.insert(id.clone(), name);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"style" => current_id = None,
            Ok(Event::Eof) => break,
            Err(e) => return Err(corrupt(STYLES_PART, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(styles)
}

fn normalize_style(style: &str) -> String {
    style
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn heading_level_from_style(style: &str) -> Option<usize> {
    let style = normalize_style(style);
    if style == "title" {
        return Some(1);
    }
    let level: usize = style.strip_prefix("heading")?.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

fn list_kind_from_style(style: &str) -> Option<ListKind> {
    let style = normalize_style(style);
    if style.starts_with("listbullet") {
        Some(ListKind::Bullet)
    } else if style.starts_with("listnumber") {
        Some(ListKind::Ordered)
    } else {
        None
    }
}

// ── numbering.xml ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Ordered,
}

#[derive(Debug, Default)]
struct Numbering {
    /// abstractNumId → ilvl → kind
    abstract_levels: HashMap<String, HashMap<u32, ListKind>>,
    /// numId → abstractNumId
    instances: HashMap<String, String>,
}

impl Numbering {
    fn kind(&self, num_id: &str, ilvl: u32) -> ListKind {
        self.instances
            .get(num_id)
            .and_then(|abs| self.abstract_levels.get(abs))
            .and_then(|levels| levels.get(&ilvl))
            .copied()
            .unwrap_or(ListKind::Bullet)
    }
}

fn parse_numbering(xml: &str) -> Result<Numbering, DocMdError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut numbering = Numbering::default();
    let mut abstract_id: Option<String> = None;
    let mut level: Option<u32> = None;
    let mut num_id: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"abstractNum" => abstract_id = attr_value(e, b"abstractNumId"),
                b"lvl" => level = attr_value(e, b"ilvl").and_then(|v| v.parse().ok()),
                b"numFmt" => {
                    if let (Some(abs), Some(lvl), Some(fmt)) =
                        (abstract_id.as_ref(), level, attr_value(e, b"val"))
                    {
                        let kind = if fmt == "bullet" || fmt == "none" {
                            ListKind::Bullet
                        } else {
                            ListKind::Ordered
                        };
                        numbering
                            .abstract_levels
                            .entry(abs.clone())
                            .or_default()
                            .insert(lvl, kind);
                    }
                }
                b"num" => num_id = attr_value(e, b"numId"),
                b"abstractNumId" => {
                    if let (Some(id), Some(abs)) = (num_id.as_ref(), attr_value(e, b"val")) {
                        numbering.instances.insert(id.clone(), abs);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"abstractNum" => abstract_id = None,
                b"lvl" => level = None,
                b"num" => num_id = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(corrupt(NUMBERING_PART, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(numbering)
}

// ── document.xml.rels ────────────────────────────────────────────────────────

/// Relationship id → external hyperlink target.
fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, DocMdError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut links = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let is_link = attr_value(e, b"Type").is_some_and(|t| t.ends_with("/hyperlink"));
                if let (true, Some(id), Some(target)) =
                    (is_link, attr_value(e, b"Id"), attr_value(e, b"Target"))
                {
                    links.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(corrupt(RELS_PART, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(links)
}

// ── document.xml body ────────────────────────────────────────────────────────

struct BodyContext<'a> {
    styles: &'a HashMap<String, String>,
    numbering: &'a Numbering,
    links: &'a HashMap<String, String>,
    max_heading_levels: usize,
}

impl BodyContext<'_> {
    /// Try both the style id and its display name.
    fn style_candidates<'s>(&'s self, id: &'s str) -> impl Iterator<Item = &'s str> {
        std::iter::once(id).chain(self.styles.get(id).map(String::as_str))
    }

    fn heading_level(&self, style: Option<&str>) -> Option<usize> {
        let style = style?;
        self.style_candidates(style)
            .find_map(heading_level_from_style)
            .filter(|&level| level <= self.max_heading_levels)
    }

    fn style_list_kind(&self, style: Option<&str>) -> Option<ListKind> {
        let style = style?;
        self.style_candidates(style).find_map(list_kind_from_style)
    }
}

enum Block {
    Text(String),
    ListItem(String),
}

#[derive(Default)]
struct Paragraph {
    text: String,
    style: Option<String>,
    num_id: Option<String>,
    ilvl: u32,
}

#[derive(Default)]
struct Run {
    text: String,
    bold: bool,
    italic: bool,
}

impl Run {
    fn render(self) -> String {
        let marker = match (self.bold, self.italic) {
            (true, true) => "***",
            (true, false) => "**",
            (false, true) => "*",
            (false, false) => return self.text,
        };
        let core = self.text.trim();
        if core.is_empty() {
            return self.text;
        }
        // Markers must hug the text, so surrounding spaces stay outside.
        let lead = &self.text[..self.text.len() - self.text.trim_start().len()];
        let trail = &self.text[self.text.trim_end().len()..];
        format!("{lead}{marker}{core}{marker}{trail}")
    }
}

struct Hyperlink {
    target: Option<String>,
    text: String,
}

#[derive(Default)]
struct Table {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: Vec<String>,
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', "<br>")
}

fn render_table(rows: &[Vec<String>]) -> String {
    let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    if cols == 0 {
        return String::new();
    }

    let render_row = |row: &Vec<String>| {
        let mut line = String::from("|");
        for idx in 0..cols {
            line.push(' ');
            line.push_str(row.get(idx).map(String::as_str).unwrap_or(""));
            line.push_str(" |");
        }
        line
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(render_row(&rows[0]));
    lines.push(format!("|{}", " --- |".repeat(cols)));
    lines.extend(rows.iter().skip(1).map(render_row));
    lines.join("\n")
}

/// Element names whose whole subtree carries no text we keep.
fn is_skipped(local: &[u8]) -> bool {
    matches!(
        local,
        b"drawing" | b"pict" | b"object" | b"AlternateContent" | b"instrText" | b"delText"
    )
}

fn parse_body(xml: &str, ctx: &BodyContext<'_>) -> Result<String, DocMdError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut skip_buf = Vec::new();

    let mut blocks: Vec<Block> = Vec::new();
    let mut tables: Vec<Table> = Vec::new();
    let mut para: Option<Paragraph> = None;
    let mut run: Option<Run> = None;
    let mut link: Option<Hyperlink> = None;
    let mut in_text = false;

    loop {
        let mut skip_to: Option<Vec<u8>> = None;
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                local if is_skipped(local) => skip_to = Some(e.name().as_ref().to_vec()),
                b"p" => para = Some(Paragraph::default()),
                b"r" => run = Some(Run::default()),
                b"t" => in_text = run.is_some(),
                b"hyperlink" => {
                    link = Some(Hyperlink {
                        target: attr_value(e, b"id").and_then(|id| ctx.links.get(&id).cloned()),
                        text: String::new(),
                    })
                }
                b"tbl" => tables.push(Table::default()),
                b"tc" => {
                    if let Some(table) = tables.last_mut() {
                        table.cell.clear();
                    }
                }
                _ => handle_property(e, &mut para, &mut run),
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"p" => finish_paragraph(Paragraph::default(), ctx, &mut blocks, &mut tables),
                b"tab" if run.is_some() => push_run_text(&mut run, "\t"),
                b"br" | b"cr" if run.is_some() => push_run_text(&mut run, "\n"),
                _ => handle_property(e, &mut para, &mut run),
            },
            Ok(Event::Text(ref e)) => {
                if in_text {
                    let text = e.unescape().map_err(|err| corrupt(DOCUMENT_PART, err))?;
                    push_run_text(&mut run, &text);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => {
                    if let Some(finished) = run.take() {
                        let rendered = finished.render();
                        match (link.as_mut(), para.as_mut()) {
                            (Some(link), _) => link.text.push_str(&rendered),
                            (None, Some(para)) => para.text.push_str(&rendered),
                            (None, None) => {}
                        }
                    }
                }
                b"hyperlink" => {
                    if let (Some(finished), Some(para)) = (link.take(), para.as_mut()) {
                        match finished.target {
                            Some(url) if !finished.text.trim().is_empty() => {
                                para.text.push_str(&format!("[{}]({})", finished.text.trim(), url))
                            }
                            _ => para.text.push_str(&finished.text),
                        }
                    }
                }
                b"p" => {
                    if let Some(finished) = para.take() {
                        finish_paragraph(finished, ctx, &mut blocks, &mut tables);
                    }
                }
                b"tc" => {
                    if let Some(table) = tables.last_mut() {
                        let cell = std::mem::take(&mut table.cell).join("<br>");
                        table.row.push(cell);
                    }
                }
                b"tr" => {
                    if let Some(table) = tables.last_mut() {
                        let row = std::mem::take(&mut table.row);
                        if !row.is_empty() {
                            table.rows.push(row);
                        }
                    }
                }
                b"tbl" => {
                    if let Some(table) = tables.pop() {
                        match tables.last_mut() {
                            // Nested tables collapse into the enclosing cell.
                            Some(parent) => {
                                let flat = table
                                    .rows
                                    .iter()
                                    .map(|row| row.join(" "))
                                    .collect::<Vec<_>>()
                                    .join(" ");
                                if !flat.trim().is_empty() {
                                    parent.cell.push(flat);
                                }
                            }
                            None => {
                                let rendered = render_table(&table.rows);
                                if !rendered.is_empty() {
                                    blocks.push(Block::Text(rendered));
                                }
                            }
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(corrupt(DOCUMENT_PART, e)),
            _ => {}
        }
        buf.clear();

        if let Some(end) = skip_to {
            reader
                .read_to_end_into(QName(&end), &mut skip_buf)
                .map_err(|e| corrupt(DOCUMENT_PART, e))?;
            skip_buf.clear();
        }
    }

    Ok(render_blocks(&blocks))
}

fn push_run_text(run: &mut Option<Run>, text: &str) {
    if let Some(run) = run.as_mut() {
        run.text.push_str(text);
    }
}

/// Paragraph and run properties that affect the Markdown.
fn handle_property(e: &BytesStart<'_>, para: &mut Option<Paragraph>, run: &mut Option<Run>) {
    match e.local_name().as_ref() {
        b"b" => {
            if let Some(run) = run.as_mut() {
                run.bold = toggle_on(e);
            }
        }
        b"i" => {
            if let Some(run) = run.as_mut() {
                run.italic = toggle_on(e);
            }
        }
        b"pStyle" if run.is_none() => {
            if let Some(para) = para.as_mut() {
                para.style = attr_value(e, b"val");
            }
        }
        b"numId" if run.is_none() => {
            if let Some(para) = para.as_mut() {
                para.num_id = attr_value(e, b"val");
            }
        }
        b"ilvl" if run.is_none() => {
            if let Some(para) = para.as_mut() {
                para.ilvl = attr_value(e, b"val")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
            }
        }
        _ => {}
    }
}

fn finish_paragraph(
    para: Paragraph,
    ctx: &BodyContext<'_>,
    blocks: &mut Vec<Block>,
    tables: &mut [Table],
) {
    let text = para.text.trim();

    if let Some(table) = tables.last_mut() {
        if !text.is_empty() {
            table.cell.push(escape_cell(text));
        }
        return;
    }

    if text.is_empty() {
        blocks.push(Block::Text(String::new()));
        return;
    }

    if let Some(level) = ctx.heading_level(para.style.as_deref()) {
        let text = text.replace('\n', " ");
        blocks.push(Block::Text(format!("{} {}", "#".repeat(level), text)));
        return;
    }

    // numId 0 explicitly removes numbering inherited from the style.
    let list_kind = match para.num_id.as_deref() {
        Some("0") => None,
        Some(id) => Some(ctx.numbering.kind(id, para.ilvl)),
        None => ctx.style_list_kind(para.style.as_deref()),
    };

    match list_kind {
        Some(kind) => {
            let indent = "  ".repeat(para.ilvl as usize);
            let marker = match kind {
                ListKind::Bullet => "-",
                ListKind::Ordered => "1.",
            };
            blocks.push(Block::ListItem(format!("{indent}{marker} {text}")));
        }
        None => blocks.push(Block::Text(text.to_string())),
    }
}

fn render_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut prev_list = false;
    for (idx, block) in blocks.iter().enumerate() {
        let (text, is_list) = match block {
            Block::Text(text) => (text.as_str(), false),
            Block::ListItem(text) => (text.as_str(), true),
        };
        if idx > 0 {
            out.push_str(if prev_list && is_list { "\n" } else { "\n\n" });
        }
        out.push_str(text);
        prev_list = is_list;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(
        styles: &'a HashMap<String, String>,
        numbering: &'a Numbering,
        links: &'a HashMap<String, String>,
    ) -> BodyContext<'a> {
        BodyContext {
            styles,
            numbering,
            links,
            max_heading_levels: 6,
        }
    }

    fn body(inner: &str) -> String {
        format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body>{inner}</w:body></w:document>"#
        )
    }

    fn convert(inner: &str) -> String {
        let styles = HashMap::new();
        let numbering = Numbering::default();
        let links = HashMap::new();
        parse_body(&body(inner), &ctx(&styles, &numbering, &links)).unwrap()
    }

    #[test]
    fn heading_levels_from_style_names() {
        assert_eq!(heading_level_from_style("Heading1"), Some(1));
        assert_eq!(heading_level_from_style("heading 3"), Some(3));
        assert_eq!(heading_level_from_style("Title"), Some(1));
        assert_eq!(heading_level_from_style("Heading7"), None);
        assert_eq!(heading_level_from_style("Normal"), None);
    }

    #[test]
    fn list_kinds_from_style_names() {
        assert_eq!(list_kind_from_style("ListBullet2"), Some(ListKind::Bullet));
        assert_eq!(list_kind_from_style("List Number"), Some(ListKind::Ordered));
        assert_eq!(list_kind_from_style("ListParagraph"), None);
    }

    #[test]
    fn paragraphs_and_headings() {
        let md = convert(concat!(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>Intro</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:t xml:space="preserve">Hello </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p>"#,
        ));
        assert_eq!(md, "## Intro\n\nHello world");
    }

    #[test]
    fn run_formatting_hugs_text() {
        let md = convert(concat!(
            r#"<w:p><w:r><w:t xml:space="preserve">a </w:t></w:r>"#,
            r#"<w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">bold </w:t></w:r>"#,
            r#"<w:r><w:rPr><w:i/></w:rPr><w:t>it</w:t></w:r>"#,
            r#"<w:r><w:rPr><w:b w:val="0"/></w:rPr><w:t xml:space="preserve"> plain</w:t></w:r></w:p>"#,
        ));
        assert_eq!(md, "a **bold** *it* plain");
    }

    #[test]
    fn empty_paragraphs_leave_extra_newlines() {
        let md = convert(r#"<w:p><w:r><w:t>a</w:t></w:r></w:p><w:p/><w:p/><w:p><w:r><w:t>b</w:t></w:r></w:p>"#);
        assert_eq!(md, "a\n\n\n\n\n\nb");
    }

    #[test]
    fn tables_render_as_gfm() {
        let md = convert(concat!(
            "<w:tbl>",
            "<w:tr><w:tc><w:p><w:r><w:t>Name</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Value</w:t></w:r></w:p></w:tc></w:tr>",
            "<w:tr><w:tc><w:p><w:r><w:t>a|b</w:t></w:r></w:p></w:tc>",
            "<w:tc><w:p><w:r><w:t>one</w:t></w:r></w:p><w:p><w:r><w:t>two</w:t></w:r></w:p></w:tc></w:tr>",
            "</w:tbl>",
        ));
        assert_eq!(md, "| Name | Value |\n| --- | --- |\n| a\\|b | one<br>two |");
    }

    #[test]
    fn numbered_lists_use_numbering_definitions() {
        let numbering = parse_numbering(concat!(
            r#"<w:numbering xmlns:w="w">"#,
            r#"<w:abstractNum w:abstractNumId="0"><w:lvl w:ilvl="0"><w:numFmt w:val="decimal"/></w:lvl>"#,
            r#"<w:lvl w:ilvl="1"><w:numFmt w:val="bullet"/></w:lvl></w:abstractNum>"#,
            r#"<w:num w:numId="7"><w:abstractNumId w:val="0"/></w:num>"#,
            r#"</w:numbering>"#,
        ))
        .unwrap();
        let styles = HashMap::new();
        let links = HashMap::new();
        let item = |lvl: u32, text: &str| {
            format!(
                r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="{lvl}"/><w:numId w:val="7"/></w:numPr></w:pPr><w:r><w:t>{text}</w:t></w:r></w:p>"#
            )
        };
        let xml = body(&format!("{}{}{}", item(0, "first"), item(1, "nested"), item(0, "second")));
        let md = parse_body(&xml, &ctx(&styles, &numbering, &links)).unwrap();
        assert_eq!(md, "1. first\n  - nested\n1. second");
    }

    #[test]
    fn hyperlinks_resolve_relationships() {
        let links = parse_relationships(concat!(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.org" TargetMode="External"/>"#,
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
            r#"</Relationships>"#,
        ))
        .unwrap();
        assert_eq!(links.len(), 1);

        let styles = HashMap::new();
        let numbering = Numbering::default();
        let xml = body(r#"<w:p><w:r><w:t xml:space="preserve">See </w:t></w:r><w:hyperlink r:id="rId4"><w:r><w:t>the site</w:t></w:r></w:hyperlink></w:p>"#);
        let md = parse_body(&xml, &ctx(&styles, &numbering, &links)).unwrap();
        assert_eq!(md, "See [the site](https://example.org)");
    }

    #[test]
    fn drawings_are_dropped() {
        let md = convert(concat!(
            r#"<w:p><w:r><w:t>before</w:t></w:r><w:r><w:drawing><wp:inline xmlns:wp="wp">"#,
            r#"<w:p><w:r><w:t>caption inside</w:t></w:r></w:p></wp:inline></w:drawing></w:r></w:p>"#,
        ));
        assert_eq!(md, "before");
    }

    #[test]
    fn style_names_resolve_through_styles_part() {
        let styles = parse_styles(concat!(
            r#"<w:styles xmlns:w="w"><w:style w:type="paragraph" w:styleId="Kop1">"#,
            r#"<w:name w:val="heading 1"/></w:style></w:styles>"#,
        ))
        .unwrap();
        let numbering = Numbering::default();
        let links = HashMap::new();
        let xml = body(r#"<w:p><w:pPr><w:pStyle w:val="Kop1"/></w:pPr><w:r><w:t>Inleiding</w:t></w:r></w:p>"#);
        let md = parse_body(&xml, &ctx(&styles, &numbering, &links)).unwrap();
        assert_eq!(md, "# Inleiding");
    }

    #[test]
    fn malformed_xml_is_corrupt() {
        let styles = HashMap::new();
        let numbering = Numbering::default();
        let links = HashMap::new();
        let err = parse_body("<w:document><w:body></w:p>", &ctx(&styles, &numbering, &links))
            .unwrap_err();
        assert!(matches!(err, DocMdError::CorruptDocx { .. }));
    }

    #[test]
    fn non_zip_bytes_are_not_a_docx() {
        assert!(matches!(
            extract_docx(b"PK\x03\x04garbage", 6),
            Err(DocMdError::NotADocx { .. })
        ));
        assert!(matches!(
            extract_docx(b"", 6),
            Err(DocMdError::EmptyInput { .. })
        ));
    }
}
