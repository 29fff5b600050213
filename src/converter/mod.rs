//! Converter modules for DOCX to HTML transformation.

mod context;
mod image;
mod numbering;
mod paragraph;
mod run;
mod styles;
mod table;
mod table_grid;

use crate::adapters::docx::{AstExtractor, DocxExtractor};
use crate::localization::{DefaultLocalization, LocalizationStrategy};
use crate::render::{HtmlRenderer, Renderer};
use crate::{error::Error, ConvertOptions, ImageHandling, Result};
use rs_docx::DocxFile;
use std::collections::HashMap;
use std::path::Path;

pub use self::context::{ConversionContext, DRAWING_MARKER, SHAPE_MARKER};
pub use self::image::{ImageExtractor, Picture};
pub use self::numbering::NumberingResolver;
pub use self::paragraph::ParagraphConverter;
pub use self::run::{RunConverter, RunFormat, PAGE_BREAK};
pub use self::styles::StyleResolver;
pub use self::table::TableConverter;

/// HTML produced from a DOCX plus non-fatal findings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversion {
    pub html: String,
    pub warnings: Vec<String>,
}

/// Turns a DOCX file on disk into an HTML fragment.
pub trait HtmlConverter: Send + Sync {
    fn convert(&self, docx_path: &Path) -> Result<Conversion>;
}

/// Main converter struct that orchestrates DOCX to HTML conversion.
pub struct DocxToHtml {
    options: ConvertOptions,
    localization: &'static dyn LocalizationStrategy,
}

impl DocxToHtml {
    /// Creates a new converter with the given options.
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            options,
            localization: &DefaultLocalization,
        }
    }

    /// Creates a new converter with default options.
    pub fn with_defaults() -> Self {
        Self::new(ConvertOptions::default())
    }

    /// Uses `localization` to recognise heading style names.
    pub fn with_localization(mut self, localization: &'static dyn LocalizationStrategy) -> Self {
        self.localization = localization;
        self
    }

    fn build_relationship_map(docx: &rs_docx::Docx) -> HashMap<String, String> {
        docx.document_rels
            .iter()
            .flat_map(|doc_rels| doc_rels.relationships.iter())
            .map(|rel| (rel.id.to_string(), rel.target.to_string()))
            .collect()
    }
}

impl HtmlConverter for DocxToHtml {
    fn convert(&self, docx_path: &Path) -> Result<Conversion> {
        let docx_file = DocxFile::from_file(docx_path)
            .map_err(|e| Error::MalformedArchive(format!("{:?}", e)))?;
        let docx = docx_file
            .parse()
            .map_err(|e| Error::MalformedArchive(format!("{:?}", e)))?;

        let rels = Self::build_relationship_map(&docx);
        let numbering_resolver = NumberingResolver::new(&docx);
        let style_resolver = StyleResolver::new(&docx.styles);
        let mut image_extractor = match self.options.image_handling {
            ImageHandling::Inline => ImageExtractor::new_inline(docx_path),
            ImageHandling::Skip => ImageExtractor::new_skip(),
        };

        let mut context = ConversionContext::new(
            &rels,
            &numbering_resolver,
            &mut image_extractor,
            &self.options,
            &style_resolver,
            self.localization,
        );

        let ast = DocxExtractor.extract(&docx.document.body.content, &mut context)?;
        let html = HtmlRenderer.render(&ast)?;
        let warnings = context.take_warnings();

        log::debug!(
            "converted {} into {} block(s), {} warning(s)",
            docx_path.display(),
            ast.blocks.len(),
            warnings.len()
        );
        Ok(Conversion { html, warnings })
    }
}
