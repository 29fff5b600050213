//! Placeholder discovery over the main document and the other templated parts.

use super::fill::is_templated_part;
use crate::adapters::docx::{DocxPackage, MAIN_DOCUMENT};
use crate::Result;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const OPENER: &str = "{{";

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"))
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{\{([^}]+)\}\}").expect("valid placeholder pattern"))
}

/// Returns the distinct placeholder names of a DOCX, in first-seen order.
///
/// Fails with [`crate::Error::MalformedArchive`] when the bytes are not a
/// DOCX package.
pub fn extract_fields(docx: &[u8]) -> Result<Vec<String>> {
    let xml = DocxPackage::open(docx)?.main_document()?;
    Ok(placeholders_in_xml(&xml))
}

/// Every placeholder the renderer will substitute: the main document's
/// names first, then new names from headers, footers and notes in archive
/// order.
pub fn template_fields(docx: &[u8]) -> Result<Vec<String>> {
    let mut package = DocxPackage::open(docx)?;
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    collect_names(&package.main_document()?, &mut seen, &mut names);

    for part in package.part_names() {
        if part == MAIN_DOCUMENT || !is_templated_part(&part) {
            continue;
        }
        if let Some(xml) = package.read_part(&part)? {
            collect_names(&xml, &mut seen, &mut names);
        }
    }
    Ok(names)
}

/// Placeholder names found in a WordprocessingML fragment.
pub fn placeholders_in_xml(xml: &str) -> Vec<String> {
    let mut names = Vec::new();
    collect_names(xml, &mut HashSet::new(), &mut names);
    names
}

fn collect_names(xml: &str, seen: &mut HashSet<String>, names: &mut Vec<String>) {
    let text = visible_text(xml);
    for capture in placeholder_pattern().captures_iter(&text) {
        let name = capture[1].trim();
        if !name.is_empty() && seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
    }
}

/// Document text with all markup removed.
///
/// Only the three entities Word emits inside text runs are decoded, `&amp;`
/// last so `&amp;lt;` stays the literal `&lt;`.
pub fn visible_text(xml: &str) -> String {
    tag_pattern()
        .replace_all(xml, "")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Upload-time warnings about placeholders that will not be picked up.
pub fn audit_placeholders(docx: &[u8]) -> Result<Vec<String>> {
    let xml = DocxPackage::open(docx)?.main_document()?;
    let text = visible_text(&xml);

    let openers = text.matches(OPENER).count();
    let formed = placeholder_pattern()
        .captures_iter(&text)
        .filter(|c| !c[1].trim().is_empty())
        .count();

    let mut warnings = Vec::new();
    if openers > formed {
        warnings.push(format!(
            "{} '{{{{' opener(s) do not form a placeholder; check for stray braces or empty names",
            openers - formed
        ));
    }
    if formed == 0 {
        warnings.push("template contains no {{field}} placeholders".to_string());
    }
    Ok(warnings)
}
