use super::AstExtractor;
use crate::converter::{
    ConversionContext, ParagraphConverter, TableConverter, DRAWING_MARKER, PAGE_BREAK,
    SHAPE_MARKER,
};
use crate::core::ast::{BlockNode, DocumentAst};
use crate::render::escape_html_attr;
use crate::Result;
use rs_docx::document::BodyContent;

/// Page break as a block, so `break-after` applies in print.
pub const PAGE_BREAK_BLOCK: &str = "<div class=\"page-break\"></div>";

/// Walks the document body into HTML blocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxExtractor;

impl AstExtractor for DocxExtractor {
    fn extract<'a>(
        &self,
        body: &[BodyContent<'a>],
        context: &mut ConversionContext<'a>,
    ) -> Result<DocumentAst> {
        let mut doc = DocumentAst::default();
        for content in body {
            self.extract_content(content, context, &mut doc)?;
        }
        Ok(doc)
    }
}

impl DocxExtractor {
    fn extract_content<'a>(
        &self,
        content: &BodyContent<'a>,
        context: &mut ConversionContext<'a>,
        output: &mut DocumentAst,
    ) -> Result<()> {
        match content {
            BodyContent::Paragraph(para) => {
                if let Some(block) = ParagraphConverter::convert(para, context)? {
                    output.blocks.push(lift_standalone(block));
                }
            }
            BodyContent::Table(table) => {
                let converted = TableConverter::convert(table, context)?;
                output.blocks.push(BlockNode::TableHtml(converted));
            }
            BodyContent::Sdt(sdt) => {
                if let Some(sdt_content) = &sdt.content {
                    for child in &sdt_content.content {
                        self.extract_content(child, context, output)?;
                    }
                }
            }
            BodyContent::BookmarkStart(bookmark) => {
                if let Some(name) = &bookmark.name {
                    output.blocks.push(BlockNode::RawHtml(format!(
                        "<a id=\"{}\"></a>",
                        escape_html_attr(name)
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// A plain paragraph whose only content is drawing markers or page breaks
/// is emitted as those blocks, so no `div` ends up nested inside `<p>`.
fn lift_standalone(block: BlockNode) -> BlockNode {
    match block {
        BlockNode::Paragraph { html, .. } if is_standalone(&html) => {
            BlockNode::RawHtml(html.replace(PAGE_BREAK, PAGE_BREAK_BLOCK))
        }
        other => other,
    }
}

fn is_standalone(html: &str) -> bool {
    let mut rest = html;
    while let Some(anchor) = rest.strip_prefix("<a id=\"") {
        match anchor.find("</a>") {
            Some(end) => rest = &anchor[end + "</a>".len()..],
            None => return false,
        }
    }
    !rest.is_empty()
        && rest
            .replace(DRAWING_MARKER, "")
            .replace(SHAPE_MARKER, "")
            .replace(PAGE_BREAK, "")
            .trim()
            .is_empty()
}
