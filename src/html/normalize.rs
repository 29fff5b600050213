//! Relabels visual elements the HTML conversion cannot reproduce, so they
//! show up as captioned placeholder blocks instead of vanishing.

use crate::localization::LocalizationStrategy;
use html5ever::{LocalName, Namespace, QualName};
use kuchiki::traits::TendrilSink;
use kuchiki::{Attribute, ExpandedName, NodeRef};
use std::fmt;

const HTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Class every normalized element carries.
pub const VISUAL_CLASS: &str = "docx-visual";
/// Class of the caption span placed inside normalized elements.
pub const CAPTION_CLASS: &str = "docx-visual-caption";
/// Attribute naming the kind of a normalized element.
pub const KIND_ATTR: &str = "data-visual-element";

const VOID_ELEMENTS: [&str; 6] = ["img", "br", "hr", "input", "embed", "wbr"];

/// Category of a normalized visual element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualKind {
    Drawing,
    Shape,
    Background,
    Textbox,
    Group,
    Canvas,
    Svg,
    Watermark,
    Header,
    Footer,
    Comment,
}

impl VisualKind {
    /// Class keywords recognised on `div` elements; the first match wins.
    const CLASS_KEYWORDS: [VisualKind; 9] = [
        VisualKind::Drawing,
        VisualKind::Shape,
        VisualKind::Background,
        VisualKind::Textbox,
        VisualKind::Group,
        VisualKind::Watermark,
        VisualKind::Header,
        VisualKind::Footer,
        VisualKind::Comment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VisualKind::Drawing => "drawing",
            VisualKind::Shape => "shape",
            VisualKind::Background => "background",
            VisualKind::Textbox => "textbox",
            VisualKind::Group => "group",
            VisualKind::Canvas => "canvas",
            VisualKind::Svg => "svg",
            VisualKind::Watermark => "watermark",
            VisualKind::Header => "header",
            VisualKind::Footer => "footer",
            VisualKind::Comment => "comment",
        }
    }

    /// Kind named by a `class` attribute value, matched case-insensitively.
    pub fn from_class(class: &str) -> Option<Self> {
        let class = class.to_ascii_lowercase();
        Self::CLASS_KEYWORDS
            .into_iter()
            .find(|kind| class.contains(kind.as_str()))
    }
}

impl fmt::Display for VisualKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Action {
    /// Mark the element itself and give it a caption child.
    Relabel(VisualKind),
    /// Move the element into a new captioned marker block.
    Wrap(VisualKind),
}

/// Normalizes an HTML fragment and returns the new fragment.
///
/// Running it on its own output changes nothing.
pub fn normalize(html: &str, localization: &dyn LocalizationStrategy) -> String {
    let document = kuchiki::parse_html().one(html);
    let Ok(body) = document.select_first("body") else {
        return html.to_string();
    };
    let body = body.as_node().clone();

    // Snapshot first: wrapping moves nodes while we iterate
    let nodes: Vec<NodeRef> = body.descendants().collect();
    let mut changed = 0usize;

    for node in nodes {
        let Some(action) = classify(&node) else {
            continue;
        };
        match action {
            Action::Relabel(kind) => relabel(&node, kind, localization.visual_caption(kind)),
            Action::Wrap(kind) => wrap(&node, kind, localization.visual_caption(kind)),
        }
        changed += 1;
    }

    if changed > 0 {
        log::debug!("normalized {} visual element(s)", changed);
    }
    body.children().map(|child| child.to_string()).collect()
}

fn classify(node: &NodeRef) -> Option<Action> {
    let element = node.as_element()?;
    let tag: &str = &element.name.local;
    let attrs = element.attributes.borrow();
    let class = attrs.get("class").unwrap_or("");

    if is_marker(node) {
        return None;
    }

    if tag == "canvas" || tag == "svg" {
        if node.parent().is_some_and(|parent| is_marker(&parent)) {
            return None;
        }
        let kind = if tag == "canvas" {
            VisualKind::Canvas
        } else {
            VisualKind::Svg
        };
        return Some(Action::Wrap(kind));
    }

    if tag == "div" {
        if let Some(kind) = VisualKind::from_class(class) {
            return Some(Action::Relabel(kind));
        }
    }

    let google_drawing = attrs.contains("data-google-docs-drawing")
        || attrs.contains("data-drawing")
        || class.split_whitespace().any(|c| c == "kix-canvas-tile-content");
    if google_drawing {
        if VOID_ELEMENTS.contains(&tag) {
            if node.parent().is_some_and(|parent| is_marker(&parent)) {
                return None;
            }
            return Some(Action::Wrap(VisualKind::Drawing));
        }
        return Some(Action::Relabel(VisualKind::Drawing));
    }

    None
}

fn is_marker(node: &NodeRef) -> bool {
    node.as_element().is_some_and(|element| {
        element
            .attributes
            .borrow()
            .get("class")
            .is_some_and(|class| class.split_whitespace().any(|c| c == VISUAL_CLASS))
    })
}

fn marker_class(kind: VisualKind) -> String {
    format!("{} docx-{}", VISUAL_CLASS, kind)
}

fn new_element(tag: &str, attributes: &[(&str, String)]) -> NodeRef {
    let name = QualName::new(None, Namespace::from(HTML_NS), LocalName::from(tag));
    NodeRef::new_element(
        name,
        attributes.iter().map(|(attr, value)| {
            (
                ExpandedName::new(Namespace::from(""), LocalName::from(*attr)),
                Attribute {
                    prefix: None,
                    value: value.clone(),
                },
            )
        }),
    )
}

fn caption(text: &str) -> NodeRef {
    let span = new_element("span", &[("class", CAPTION_CLASS.to_string())]);
    span.append(NodeRef::new_text(text));
    span
}

fn relabel(node: &NodeRef, kind: VisualKind, caption_text: &str) {
    if let Some(element) = node.as_element() {
        let mut attrs = element.attributes.borrow_mut();
        let existing = attrs.get("class").unwrap_or("").trim().to_string();
        let class = if existing.is_empty() {
            marker_class(kind)
        } else {
            format!("{} {}", existing, marker_class(kind))
        };
        attrs.insert("class", class);
        attrs.insert(KIND_ATTR, kind.as_str().to_string());
    }
    node.prepend(caption(caption_text));
}

/// Whether a `div` placed under `node` would end up outside it once the
/// markup is parsed again: a `<div>` start tag closes any open `<p>`.
fn in_paragraph(node: &NodeRef) -> bool {
    node.ancestors()
        .any(|ancestor| ancestor.as_element().is_some_and(|e| &*e.name.local == "p"))
}

fn wrap(node: &NodeRef, kind: VisualKind, caption_text: &str) {
    let tag = if in_paragraph(node) { "span" } else { "div" };
    let wrapper = new_element(
        tag,
        &[
            ("class", marker_class(kind)),
            (KIND_ATTR, kind.as_str().to_string()),
        ],
    );
    node.insert_before(wrapper.clone());
    wrapper.append(caption(caption_text));
    wrapper.append(node.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localization::{DefaultLocalization, PortugueseLocalization};
    use pretty_assertions::assert_eq;

    fn run(html: &str) -> String {
        normalize(html, &DefaultLocalization)
    }

    #[test]
    fn test_drawing_marker_is_relabelled() {
        let out = run("<p>a</p><div class=\"docx-drawing\" data-type=\"drawing\"></div>");
        assert_eq!(
            out,
            concat!(
                "<p>a</p><div class=\"docx-drawing docx-visual docx-drawing\" ",
                "data-type=\"drawing\" data-visual-element=\"drawing\">",
                "<span class=\"docx-visual-caption\">Drawing / visual element</span></div>"
            )
        );
    }

    #[test]
    fn test_first_matching_keyword_wins() {
        let out = run("<div class=\"Shape-Group\">x</div>");
        assert!(out.contains("data-visual-element=\"shape\""));
        assert!(out.contains("docx-visual docx-shape"));
    }

    #[test]
    fn test_svg_and_canvas_are_wrapped() {
        let out = normalize(
            "<p>t</p><svg width=\"10\"></svg><canvas></canvas>",
            &PortugueseLocalization,
        );
        assert!(out.contains(
            "<div class=\"docx-visual docx-svg\" data-visual-element=\"svg\"><span class=\"docx-visual-caption\">Gráfico Vetorial (SVG)</span><svg"
        ));
        assert!(out.contains("Canvas/Tela</span><canvas></canvas></div>"));
    }

    #[test]
    fn test_google_docs_artifacts_become_drawings() {
        let out = run("<span data-google-docs-drawing=\"1\">g</span><img data-drawing=\"x\" src=\"a.png\">");
        assert!(out.contains(
            "<span class=\"docx-visual docx-drawing\" data-google-docs-drawing=\"1\" data-visual-element=\"drawing\">"
        ));
        assert!(out.contains("<div class=\"docx-visual docx-drawing\" data-visual-element=\"drawing\"><span class=\"docx-visual-caption\">Drawing / visual element</span><img"));
    }

    #[test]
    fn test_inline_visuals_in_paragraphs_get_span_wrappers() {
        let out = run("<p>x<canvas></canvas></p>");
        assert_eq!(
            out,
            concat!(
                "<p>x<span class=\"docx-visual docx-canvas\" data-visual-element=\"canvas\">",
                "<span class=\"docx-visual-caption\">Canvas</span><canvas></canvas></span></p>"
            )
        );

        let out = run("<p><strong><img data-drawing=\"1\"></strong></p>");
        assert!(out.starts_with("<p><strong><span class=\"docx-visual docx-drawing\""), "{}", out);
        assert!(!out.contains("<div"));
    }

    #[test]
    fn test_svg_inside_marked_block_is_left_alone() {
        let out = run("<div class=\"docx-shape\"><svg></svg></div>");
        assert_eq!(out.matches("docx-visual-caption").count(), 1);
    }

    #[test]
    fn test_unrelated_markup_is_untouched() {
        let html = "<h1>T</h1><table class=\"docx-table\"><tbody><tr><td>c</td></tr></tbody></table>";
        assert_eq!(run(html), html);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let html = concat!(
            "<p>x</p><div class=\"docx-drawing\"></div><div class=\"textbox\">t</div>",
            "<svg></svg><canvas></canvas><div class=\"kix-canvas-tile-content\"></div>",
            "<img data-drawing=\"1\">",
            "<p>x<canvas></canvas></p><p><img data-drawing=\"1\"></p>",
            "<p>a<svg><circle r=\"1\"></circle></svg>b</p>"
        );
        let once = run(html);
        assert_eq!(run(&once), once);
    }
}
