use super::image::Picture;
use super::{ImageExtractor, NumberingResolver, StyleResolver};
use crate::localization::LocalizationStrategy;
use crate::{ConvertOptions, Result};
use std::collections::HashMap;

/// Marker emitted for a DrawingML object with no embedded picture.
pub const DRAWING_MARKER: &str = "<div class=\"docx-drawing\" data-type=\"drawing\"></div>";
/// Marker emitted for a VML shape with no image data.
pub const SHAPE_MARKER: &str = "<div class=\"docx-shape\" data-type=\"shape\"></div>";

/// Context passed through conversion for shared mutable state.
pub struct ConversionContext<'a> {
    rels: &'a HashMap<String, String>,
    numbering: &'a NumberingResolver<'a>,
    image_extractor: &'a mut ImageExtractor,
    options: &'a ConvertOptions,
    style_resolver: &'a StyleResolver<'a>,
    localization: &'a dyn LocalizationStrategy,
    warnings: Vec<String>,
}

impl<'a> ConversionContext<'a> {
    pub fn new(
        rels: &'a HashMap<String, String>,
        numbering: &'a NumberingResolver<'a>,
        image_extractor: &'a mut ImageExtractor,
        options: &'a ConvertOptions,
        style_resolver: &'a StyleResolver<'a>,
        localization: &'a dyn LocalizationStrategy,
    ) -> Self {
        Self {
            rels,
            numbering,
            image_extractor,
            options,
            style_resolver,
            localization,
            warnings: Vec::new(),
        }
    }

    /// Records a non-fatal finding; repeated messages are kept once.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.warnings.contains(&message) {
            self.warnings.push(message);
        }
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    pub fn relationship_target(&self, id: &str) -> Option<&str> {
        self.rels.get(id).map(String::as_str)
    }

    /// HTML for a DrawingML object: the picture, a marker block, or nothing.
    pub fn drawing_html(&mut self, drawing: &rs_docx::document::Drawing) -> Result<String> {
        let picture = self.image_extractor.extract_from_drawing(drawing, self.rels)?;
        Ok(self.picture_html(picture, DRAWING_MARKER, "drawing"))
    }

    /// HTML for a VML picture: the image, a marker block, or nothing.
    pub fn pict_html(&mut self, pict: &rs_docx::document::Pict) -> Result<String> {
        let picture = self.image_extractor.extract_from_pict(pict, self.rels)?;
        Ok(self.picture_html(picture, SHAPE_MARKER, "shape"))
    }

    fn picture_html(&mut self, picture: Picture, marker: &str, what: &str) -> String {
        match picture {
            Picture::Html(html) => html,
            Picture::Skipped => String::new(),
            Picture::Missing(target) => {
                self.warn(format!("image '{}' is referenced but missing from the package", target));
                String::new()
            }
            Picture::NotAPicture => {
                self.warn(format!(
                    "{} without an embedded picture replaced by a placeholder block",
                    what
                ));
                marker.to_string()
            }
        }
    }

    pub fn resolve_run_property(
        &self,
        direct_props: Option<&rs_docx::formatting::CharacterProperty<'a>>,
        run_style_id: Option<&str>,
        para_style_id: Option<&str>,
    ) -> rs_docx::formatting::CharacterProperty<'a> {
        self.style_resolver
            .resolve_run_property(direct_props, run_style_id, para_style_id)
    }

    pub fn resolve_paragraph_property(
        &self,
        direct_props: Option<&rs_docx::formatting::ParagraphProperty<'a>>,
        para_style_id: Option<&str>,
    ) -> rs_docx::formatting::ParagraphProperty<'a> {
        self.style_resolver
            .resolve_paragraph_property(direct_props, para_style_id)
    }

    /// Heading level for a paragraph style, warning once about style ids the
    /// document does not define.
    pub fn heading_level(&mut self, style_id: &str) -> Option<usize> {
        let level = self.localization.parse_heading_style(style_id);
        if level.is_none() && !self.style_resolver.contains(style_id) {
            self.warn(format!("unrecognised paragraph style '{}'", style_id));
        }
        level
    }

    /// `(ordered, depth)` for a numbered paragraph, `None` when numbering is off.
    pub fn list_placement(&self, num_id: i32, ilvl: i32) -> Option<(bool, usize)> {
        if !self.numbering.is_numbered(num_id) {
            return None;
        }
        Some((
            self.numbering.is_ordered(num_id, ilvl),
            self.numbering.get_indent(num_id, ilvl),
        ))
    }

    pub fn preserve_whitespace(&self) -> bool {
        self.options.preserve_whitespace
    }
}
