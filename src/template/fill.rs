//! Placeholder substitution inside the WordprocessingML parts of a DOCX.
//!
//! Word freely splits a typed `{{name}}` across several runs (spell-check
//! marks, revision ids, formatting changes). Substitution therefore works on
//! the concatenated `<w:t>` text of each paragraph and maps every token back
//! onto the text nodes it spans.

use crate::adapters::docx::DocxPackage;
use crate::render::escape_xml_text;
use crate::{error::Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::OnceLock;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const PRESERVED_TEXT_TAG: &str = "<w:t xml:space=\"preserve\">";

/// How newlines inside field values are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LineBreaks {
    /// Each newline becomes a `<w:br/>` in the same run.
    #[default]
    Break,
    /// Newlines collapse to a single space.
    Space,
}

/// Options for [`fill`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillOptions {
    pub line_breaks: LineBreaks,
}

/// Whether a package entry is scanned for placeholders.
pub fn is_templated_part(name: &str) -> bool {
    match name {
        "word/document.xml" | "word/footnotes.xml" | "word/endnotes.xml" => true,
        _ => ["word/header", "word/footer"].iter().any(|prefix| {
            name.strip_prefix(prefix)
                .is_some_and(|rest| rest.ends_with(".xml") && !rest.contains('/'))
        }),
    }
}

/// Substitutes every placeholder of `template` and returns the new DOCX.
///
/// Missing values render as empty text; values are inserted literally.
pub fn fill(
    template: &[u8],
    values: &BTreeMap<String, String>,
    options: &FillOptions,
) -> Result<Vec<u8>> {
    let mut package = DocxPackage::open(template)?;
    package.main_document()?;

    package.rewrite(is_templated_part, |name, xml| {
        let tokens = scan_part(name, &xml)?;
        if tokens.is_empty() {
            return Ok(xml);
        }
        log::debug!("substituting {} placeholder(s) in {}", tokens.len(), name);
        Ok(apply_tokens(&xml, &tokens, values, options))
    })
}

/// Parses every templated part without writing, surfacing delimiter errors.
pub fn check_delimiters(template: &[u8]) -> Result<()> {
    let mut package = DocxPackage::open(template)?;
    package.main_document()?;

    for name in package.part_names() {
        if !is_templated_part(&name) {
            continue;
        }
        if let Some(xml) = package.read_part(&name)? {
            scan_part(&name, &xml)?;
        }
    }
    Ok(())
}

fn node_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"<w:p[\s>/]|</w:p>|<w:t(?:\s[^>]*)?>([^<]*)</w:t>")
            .expect("valid text node pattern")
    })
}

/// A `<w:t>` element: `element` covers the whole tag pair, `text` its content.
#[derive(Debug, Clone)]
struct TextNode {
    element: Range<usize>,
    text: Range<usize>,
}

/// One placeholder, located by the text nodes it touches.
#[derive(Debug)]
struct Token {
    name: String,
    /// Text nodes the token covers, in document order, with the byte range
    /// of each node's text that belongs to the token.
    pieces: Vec<(TextNode, Range<usize>)>,
}

fn paragraphs(xml: &str) -> Vec<Vec<TextNode>> {
    let mut groups = Vec::new();
    let mut current = Vec::new();

    for capture in node_pattern().captures_iter(xml) {
        match capture.get(1) {
            Some(text) => {
                let element = capture.get(0).map(|m| m.range()).unwrap_or_default();
                current.push(TextNode {
                    element,
                    text: text.range(),
                });
            }
            None => {
                if !current.is_empty() {
                    groups.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

fn scan_part(part: &str, xml: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();

    for nodes in paragraphs(xml) {
        let mut joined = String::new();
        let mut offsets = Vec::with_capacity(nodes.len());
        for node in &nodes {
            offsets.push(joined.len());
            joined.push_str(&xml[node.text.clone()]);
        }

        let mut cursor = 0;
        while let Some(found) = joined[cursor..].find(OPEN) {
            let open = cursor + found;
            let inner_start = open + OPEN.len();
            let Some(close_rel) = joined[inner_start..].find(CLOSE) else {
                return Err(syntax_error(part, "unclosed '{{'", &joined[open..]));
            };
            let close = inner_start + close_rel;
            if joined[inner_start..close].contains(OPEN) {
                return Err(syntax_error(
                    part,
                    "'{{' opened inside another placeholder",
                    &joined[open..],
                ));
            }
            let end = close + CLOSE.len();

            // Same grammar as extraction: a non-blank name without '}'.
            let inner = joined[inner_start..close].trim();
            if inner.is_empty() || inner.contains('}') {
                cursor = end;
                continue;
            }

            let pieces = nodes
                .iter()
                .enumerate()
                .filter_map(|(index, node)| {
                    let start = offsets[index];
                    let stop = start + node.text.len();
                    let from = open.max(start);
                    let to = end.min(stop);
                    (from < to).then(|| (node.clone(), from - start..to - start))
                })
                .collect();

            tokens.push(Token {
                name: decode_entities(inner),
                pieces,
            });
            cursor = end;
        }
    }

    Ok(tokens)
}

fn syntax_error(part: &str, problem: &str, context: &str) -> Error {
    let snippet: String = context.chars().take(24).collect();
    Error::TemplateSyntax {
        part: part.to_string(),
        detail: format!("{} near \"{}\"", problem, snippet),
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn render_value(value: &str, options: &FillOptions) -> String {
    let normalized = value.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<String> = normalized.split('\n').map(escape_xml_text).collect();
    match options.line_breaks {
        LineBreaks::Break => lines.join(&format!("</w:t><w:br/>{}", PRESERVED_TEXT_TAG)),
        LineBreaks::Space => lines.join(" "),
    }
}

fn apply_tokens(
    xml: &str,
    tokens: &[Token],
    values: &BTreeMap<String, String>,
    options: &FillOptions,
) -> String {
    // Edits per text node, keyed by the node's element start.
    let mut edits: BTreeMap<usize, (TextNode, Vec<(Range<usize>, Option<String>)>)> =
        BTreeMap::new();

    for token in tokens {
        let replacement = render_value(
            values.get(&token.name).map(String::as_str).unwrap_or_default(),
            options,
        );
        for (position, (node, range)) in token.pieces.iter().enumerate() {
            let entry = edits
                .entry(node.element.start)
                .or_insert_with(|| (node.clone(), Vec::new()));
            let inserted = (position == 0).then(|| replacement.clone());
            entry.1.push((range.clone(), inserted));
        }
    }

    let mut out = String::with_capacity(xml.len());
    let mut cursor = 0;
    for (node, mut cuts) in edits.into_values() {
        cuts.sort_by_key(|(range, _)| range.start);
        let text = &xml[node.text.clone()];

        out.push_str(&xml[cursor..node.element.start]);
        out.push_str(PRESERVED_TEXT_TAG);
        let mut at = 0;
        for (range, inserted) in cuts {
            out.push_str(&text[at..range.start]);
            if let Some(value) = inserted {
                out.push_str(&value);
            }
            at = range.end;
        }
        out.push_str(&text[at..]);
        out.push_str("</w:t>");
        cursor = node.element.end;
    }
    out.push_str(&xml[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{docx_with_body, docx_with_parts, document_xml};
    use pretty_assertions::assert_eq;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn fill_xml(xml: &str, pairs: &[(&str, &str)], options: &FillOptions) -> String {
        let tokens = scan_part("word/document.xml", xml).expect("scan should succeed");
        apply_tokens(xml, &tokens, &values(pairs), options)
    }

    #[test]
    fn test_templated_part_names() {
        assert!(is_templated_part("word/document.xml"));
        assert!(is_templated_part("word/header1.xml"));
        assert!(is_templated_part("word/footer3.xml"));
        assert!(is_templated_part("word/footnotes.xml"));
        assert!(!is_templated_part("word/styles.xml"));
        assert!(!is_templated_part("word/header1.xml.rels"));
        assert!(!is_templated_part("word/_rels/header1.xml.rels"));
        assert!(!is_templated_part("word/media/header.png"));
    }

    #[test]
    fn test_single_node_substitution() {
        let xml = "<w:p><w:r><w:t>Hello {{name}}!</w:t></w:r></w:p>";
        assert_eq!(
            fill_xml(xml, &[("name", "Ana")], &FillOptions::default()),
            "<w:p><w:r><w:t xml:space=\"preserve\">Hello Ana!</w:t></w:r></w:p>"
        );
    }

    #[test]
    fn test_split_placeholder_lands_in_opening_node() {
        let xml = concat!(
            "<w:p><w:r><w:t>Dear {{stu</w:t></w:r>",
            "<w:r><w:rPr><w:b/></w:rPr><w:t>dent_na</w:t></w:r>",
            "<w:r><w:t>me}}, hi</w:t></w:r></w:p>"
        );
        let filled = fill_xml(xml, &[("student_name", "Bia")], &FillOptions::default());
        assert_eq!(
            filled,
            concat!(
                "<w:p><w:r><w:t xml:space=\"preserve\">Dear Bia</w:t></w:r>",
                "<w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\"></w:t></w:r>",
                "<w:r><w:t xml:space=\"preserve\">, hi</w:t></w:r></w:p>"
            )
        );
    }

    #[test]
    fn test_untouched_nodes_stay_identical() {
        let xml = "<w:p><w:r><w:t xml:space=\"preserve\"> keep </w:t></w:r><w:r><w:t>{{x}}</w:t></w:r></w:p>";
        let filled = fill_xml(xml, &[("x", "1")], &FillOptions::default());
        assert!(filled.starts_with("<w:p><w:r><w:t xml:space=\"preserve\"> keep </w:t></w:r>"));
        assert!(filled.contains(">1</w:t>"));
    }

    #[test]
    fn test_values_are_escaped_and_not_rescanned() {
        let xml = "<w:p><w:r><w:t>{{a}}|{{b}}</w:t></w:r></w:p>";
        let filled = fill_xml(
            xml,
            &[("a", "<b>&</b>"), ("b", "{{a}}")],
            &FillOptions::default(),
        );
        assert!(filled.contains("&lt;b&gt;&amp;&lt;/b&gt;|{{a}}"));
    }

    #[test]
    fn test_missing_values_render_empty_and_extras_ignored() {
        let xml = "<w:p><w:r><w:t>[{{missing}}]</w:t></w:r></w:p>";
        let filled = fill_xml(xml, &[("unused", "x")], &FillOptions::default());
        assert!(filled.contains(">[]</w:t>"));
    }

    #[test]
    fn test_blank_and_brace_names_stay_literal() {
        for text in ["a {{}} b", "a {{   }} b", "a {{x}y}} b"] {
            let xml = format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text);
            assert!(scan_part("word/document.xml", &xml).unwrap().is_empty());
            assert_eq!(fill_xml(&xml, &[("", "X"), ("x}y", "X")], &FillOptions::default()), xml);
        }

        let xml = "<w:p><w:r><w:t>{{}} and {{name}}</w:t></w:r></w:p>";
        assert_eq!(
            fill_xml(xml, &[("name", "Ana")], &FillOptions::default()),
            "<w:p><w:r><w:t xml:space=\"preserve\">{{}} and Ana</w:t></w:r></w:p>"
        );
    }

    #[test]
    fn test_header_and_footer_parts_are_filled() {
        let docx = docx_with_parts(&[
            ("word/document.xml", &document_xml("<w:p><w:r><w:t>{{name}}</w:t></w:r></w:p>")),
            ("word/header1.xml", "<w:hdr><w:p><w:r><w:t>School: {{school}}</w:t></w:r></w:p></w:hdr>"),
            ("word/footer1.xml", "<w:ftr><w:p><w:r><w:t>{{school}} / {{name}}</w:t></w:r></w:p></w:ftr>"),
        ]);
        let out = fill(
            &docx,
            &values(&[("name", "Ana"), ("school", "Escola X")]),
            &FillOptions::default(),
        )
        .expect("fill should succeed");

        let mut package = DocxPackage::open(&out).unwrap();
        let header = package.read_part("word/header1.xml").unwrap().unwrap();
        let footer = package.read_part("word/footer1.xml").unwrap().unwrap();
        assert!(header.contains("School: Escola X"), "{}", header);
        assert!(footer.contains("Escola X / Ana"), "{}", footer);
    }

    #[test]
    fn test_line_break_modes() {
        let xml = "<w:p><w:r><w:t>{{address}}</w:t></w:r></w:p>";
        let broken = fill_xml(xml, &[("address", "Rua 1\r\nCentro")], &FillOptions::default());
        assert!(broken.contains("Rua 1</w:t><w:br/><w:t xml:space=\"preserve\">Centro"));

        let spaced = fill_xml(
            xml,
            &[("address", "Rua 1\nCentro")],
            &FillOptions {
                line_breaks: LineBreaks::Space,
            },
        );
        assert!(spaced.contains(">Rua 1 Centro</w:t>"));
        assert!(!spaced.contains("<w:br/>"));
    }

    #[test]
    fn test_placeholders_do_not_join_across_paragraphs() {
        let xml = "<w:p><w:r><w:t>{{na</w:t></w:r></w:p><w:p><w:r><w:t>me}}</w:t></w:r></w:p>";
        let err = scan_part("word/document.xml", xml).unwrap_err();
        assert!(matches!(err, Error::TemplateSyntax { ref part, .. } if part == "word/document.xml"));
    }

    #[test]
    fn test_nested_opener_is_rejected() {
        let err = scan_part("word/header1.xml", "<w:p><w:t>{{a {{b}}</w:t></w:p>").unwrap_err();
        match err {
            Error::TemplateSyntax { part, detail } => {
                assert_eq!(part, "word/header1.xml");
                assert!(detail.contains("inside another placeholder"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_fill_rewrites_package() {
        let docx = docx_with_body("<w:p><w:r><w:t>Nome: {{nome}}</w:t></w:r></w:p>");
        let out = fill(&docx, &values(&[("nome", "Carla")]), &FillOptions::default())
            .expect("fill should succeed");
        let xml = DocxPackage::open(&out).unwrap().main_document().unwrap();
        assert!(xml.contains("Nome: Carla"));
        assert!(!xml.contains("{{"));
    }

    #[test]
    fn test_check_delimiters_flags_unclosed_token() {
        let ok = docx_with_body("<w:p><w:r><w:t>{{a}}</w:t></w:r></w:p>");
        assert!(check_delimiters(&ok).is_ok());

        let broken = docx_with_body("<w:p><w:r><w:t>{{a</w:t></w:r></w:p>");
        assert!(matches!(
            check_delimiters(&broken),
            Err(Error::TemplateSyntax { .. })
        ));
    }
}
