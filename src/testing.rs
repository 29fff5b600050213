//! Builders for small in-memory DOCX packages used by tests.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Zips `[Content_Types].xml`, `_rels/.rels` and the given parts.
pub fn docx_with_parts(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    let fixed = [("[Content_Types].xml", CONTENT_TYPES), ("_rels/.rels", ROOT_RELS)];
    for (name, content) in fixed.iter().chain(parts.iter()) {
        writer
            .start_file(*name, options)
            .expect("zip entry should start");
        writer
            .write_all(content.as_bytes())
            .expect("zip entry should be written");
    }
    writer
        .finish()
        .expect("zip archive should finish")
        .into_inner()
}

/// Wraps `body_xml` in `w:document/w:body` and builds a package around it.
pub fn docx_with_body(body_xml: &str) -> Vec<u8> {
    let document = document_xml(body_xml);
    docx_with_parts(&[("word/document.xml", &document)])
}

/// The main document part for `body_xml`.
pub fn document_xml(body_xml: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{}"><w:body>{}</w:body></w:document>"#,
        W_NS, body_xml
    )
}

/// A paragraph with one run per entry of `runs`.
pub fn paragraph(runs: &[&str]) -> String {
    let runs: String = runs
        .iter()
        .map(|text| format!(r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#, text))
        .collect();
    format!("<w:p>{}</w:p>", runs)
}
