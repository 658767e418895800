//! Fixture builders shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const W_NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#;

/// A `w:p` with one plain run.
pub fn para(text: &str) -> String {
    format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
}

/// A `w:p` with a paragraph style.
pub fn styled(style: &str, text: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:pStyle w:val="{style}"/></w:pPr><w:r><w:t>{text}</w:t></w:r></w:p>"#
    )
}

/// A table whose first row is the header.
pub fn table(rows: &[&[&str]]) -> String {
    let mut xml = String::from("<w:tbl>");
    for row in rows {
        xml.push_str("<w:tr>");
        for cell in *row {
            xml.push_str(&format!("<w:tc>{}</w:tc>", para(cell)));
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}

/// Build a DOCX package around `body` (the children of `w:body`).
pub fn docx(body: &str) -> Vec<u8> {
    docx_with_parts(body, &[])
}

/// Like [`docx`], with extra `(name, contents)` zip entries.
pub fn docx_with_parts(body: &str, extra: &[(&str, &str)]) -> Vec<u8> {
    let document = format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {W_NS}><w:body>{body}</w:body></w:document>"#);
    let mut parts = vec![
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#.to_string(),
        ),
        ("word/document.xml", document),
    ];
    parts.extend(extra.iter().map(|(n, c)| (*n, c.to_string())));
    zip_parts(&parts)
}

pub fn zip_parts(parts: &[(&str, String)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, contents) in parts {
        zip.start_file(*name, options).unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn core_props(title: &str, creator: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/"><dc:title>{title}</dc:title><dc:creator>{creator}</dc:creator><dcterms:created>2024-03-01T09:00:00Z</dcterms:created></cp:coreProperties>"#
    )
}

/// A one-page PDF using the standard Helvetica font.
pub fn pdf(content: &str) -> Vec<u8> {
    pdf_pages(&[content])
}

/// A PDF with one page per content stream and a `/Title` in its Info
/// dictionary. Object layout: catalog, page tree, font, info, then a page
/// and its content stream for every page.
pub fn pdf_pages(contents: &[&str]) -> Vec<u8> {
    const FIRST_PAGE_ID: usize = 5;
    let kids: Vec<String> = (0..contents.len())
        .map(|i| format!("{} 0 R", FIRST_PAGE_ID + 2 * i))
        .collect();

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), contents.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
        "<< /Title (Quarterly Figures) /Author (Finance Team) >>".to_string(),
    ];
    for (i, content) in contents.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            FIRST_PAGE_ID + 2 * i + 1
        ));
        objects.push(format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, obj) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, obj).as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R /Info 4 0 R /ID [<0123456789ABCDEF0123456789ABCDEF> <0123456789ABCDEF0123456789ABCDEF>] >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}

/// [`pdf`] encrypted with RC4 (security handler revision 2) under
/// `user_password`.
pub fn encrypted_pdf(content: &str, user_password: &str) -> Vec<u8> {
    use pdf_extract::{Document, EncryptionState, EncryptionVersion, Permissions};

    let mut doc = Document::load_mem(&pdf(content)).unwrap();
    let state = EncryptionState::try_from(EncryptionVersion::V1 {
        document: &doc,
        owner_password: "owner-secret",
        user_password,
        permissions: Permissions::all(),
    })
    .unwrap();
    doc.encrypt(&state).unwrap();

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Page content with a 24pt title above two 12pt body lines.
pub const REPORT_PAGE: &str = "BT /F1 24 Tf 72 740 Td (Annual Report) Tj ET\n\
BT /F1 12 Tf 72 700 Td (The quick brown fox jumps over the lazy dog.) Tj ET\n\
BT /F1 12 Tf 72 686 Td (Revenue grew in every region this year.) Tj ET";

/// Two pages of body text for page selection tests.
pub const FIRST_PAGE: &str = "BT /F1 12 Tf 72 700 Td (First page text.) Tj ET";
pub const SECOND_PAGE: &str = "BT /F1 12 Tf 72 700 Td (Second page text.) Tj ET";
