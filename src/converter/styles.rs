//! Style resolver - handles style inheritance and property merging.

use rs_docx::formatting::{CharacterProperty, ParagraphProperty};
use rs_docx::styles::{Style, Styles};
use std::collections::HashMap;

/// Resolver for DOCX styles and inheritance.
pub struct StyleResolver<'a> {
    styles: &'a Styles<'a>,
    style_map: HashMap<&'a str, &'a Style<'a>>,
}

impl<'a> StyleResolver<'a> {
    pub fn new(styles: &'a Styles<'a>) -> Self {
        let style_map = styles
            .styles
            .iter()
            .map(|style| (style.style_id.as_ref(), style))
            .collect();
        Self { styles, style_map }
    }

    /// Whether the document defines a style with this id.
    pub fn contains(&self, style_id: &str) -> bool {
        self.style_map.contains_key(style_id)
    }

    /// Resolves the effective character properties for a run.
    ///
    /// Hierarchy (highest priority first):
    /// 1. Direct formatting on the run (rPr)
    /// 2. Character style applied to the run (rStyle) and its ancestors
    /// 3. Paragraph style applied to the paragraph (pStyle) and its ancestors
    /// 4. Document defaults (docDefaults)
    pub fn resolve_run_property(
        &self,
        direct_props: Option<&CharacterProperty<'a>>,
        run_style_id: Option<&str>,
        para_style_id: Option<&str>,
    ) -> CharacterProperty<'a> {
        let mut merged = CharacterProperty::default();

        if let Some(r_pr) = self
            .styles
            .default
            .as_ref()
            .and_then(|d| d.character.inner.as_ref())
        {
            merged = merge_char_props(merged, r_pr);
        }

        for style_id in [para_style_id, run_style_id].into_iter().flatten() {
            for style in self.chain(style_id) {
                if let Some(r_pr) = &style.character {
                    merged = merge_char_props(merged, r_pr);
                }
            }
        }

        if let Some(direct) = direct_props {
            merged = merge_char_props(merged, direct);
        }

        merged
    }

    /// Resolves the effective paragraph properties.
    pub fn resolve_paragraph_property(
        &self,
        direct_props: Option<&ParagraphProperty<'a>>,
        para_style_id: Option<&str>,
    ) -> ParagraphProperty<'a> {
        let mut merged = ParagraphProperty::default();

        if let Some(p_pr) = self
            .styles
            .default
            .as_ref()
            .and_then(|d| d.paragraph.inner.as_ref())
        {
            merged = merge_para_props(merged, p_pr);
        }

        if let Some(pid) = para_style_id {
            for style in self.chain(pid) {
                if let Some(p_pr) = &style.paragraph {
                    merged = merge_para_props(merged, p_pr);
                }
            }
        }

        if let Some(direct) = direct_props {
            merged = merge_para_props(merged, direct);
        }

        merged
    }

    /// Styles from the root of the `basedOn` chain down to `style_id`.
    fn chain(&self, style_id: &str) -> Vec<&'a Style<'a>> {
        let mut chain = Vec::new();
        let mut current = Some(style_id);

        while let Some(id) = current {
            let Some(style) = self.style_map.get(id).copied() else {
                break;
            };
            // Guard against basedOn cycles in damaged documents
            if chain.iter().any(|seen: &&Style| std::ptr::eq(*seen, style)) {
                break;
            }
            chain.push(style);
            current = style.base.as_ref().map(|b| b.value.as_ref());
        }

        chain.reverse();
        chain
    }
}

/// Returns `base` with every property set in `overlay` replaced.
fn merge_char_props<'a>(
    base: CharacterProperty<'a>,
    overlay: &CharacterProperty<'a>,
) -> CharacterProperty<'a> {
    let mut new = base;

    if overlay.bold.is_some() {
        new.bold = overlay.bold.clone();
    }
    if overlay.italics.is_some() {
        new.italics = overlay.italics.clone();
    }
    if overlay.strike.is_some() {
        new.strike = overlay.strike.clone();
    }
    if overlay.underline.is_some() {
        new.underline = overlay.underline.clone();
    }

    new
}

fn merge_para_props<'a>(
    base: ParagraphProperty<'a>,
    overlay: &ParagraphProperty<'a>,
) -> ParagraphProperty<'a> {
    let mut new = base;

    if overlay.justification.is_some() {
        new.justification = overlay.justification.clone();
    }
    if overlay.numbering.is_some() {
        new.numbering = overlay.numbering.clone();
    }
    if overlay.style_id.is_some() {
        new.style_id = overlay.style_id.clone();
    }

    new
}
