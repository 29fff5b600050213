//! Paragraph converter - handles paragraph elements and their structure.

use super::run::RunFormat;
use super::{ConversionContext, RunConverter};
use crate::core::ast::{Align, BlockKind, BlockNode};
use crate::render::escape_html_attr;
use crate::Result;
use rs_docx::document::{
    BodyContent, CharType, Hyperlink, Paragraph, ParagraphContent, Run, RunContent,
};
use rs_docx::formatting::JustificationVal;

/// Converter for Paragraph elements.
pub struct ParagraphConverter;

/// Segment of HTML with consistent styling.
#[derive(Debug, Clone, PartialEq, Default)]
struct FormattedSegment {
    html: String,
    format: RunFormat,
    anchor: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldPhase {
    Instruction,
    Result,
}

impl ParagraphConverter {
    /// Filters a run so only field-visible content remains, updating field stack.
    fn filter_run_by_field_state<'a>(run: &Run<'a>, field_stack: &mut Vec<FieldPhase>) -> Run<'a> {
        let mut filtered = run.clone();
        filtered.content.clear();

        for content in &run.content {
            match content {
                RunContent::FieldChar(fc) => match &fc.ty {
                    Some(CharType::Begin) => field_stack.push(FieldPhase::Instruction),
                    Some(CharType::Separate) => {
                        if let Some(last) = field_stack.last_mut() {
                            *last = FieldPhase::Result;
                        }
                    }
                    Some(CharType::End) => {
                        let _ = field_stack.pop();
                    }
                    None => {}
                },
                // Field instructions are never rendered.
                RunContent::InstrText(_) | RunContent::DelInstrText(_) => {}
                _ => {
                    if field_stack.last() != Some(&FieldPhase::Instruction) {
                        filtered.content.push(content.clone());
                    }
                }
            }
        }

        filtered
    }

    /// Converts a Paragraph to a block; `None` for paragraphs with no content.
    pub fn convert<'a>(
        para: &Paragraph<'a>,
        context: &mut ConversionContext<'a>,
    ) -> Result<Option<BlockNode>> {
        let segments = Self::merge_segments(Self::collect_segments(para, context)?);

        // Bookmarks before any content become ids at the start of the block
        let mut leading_anchors = String::new();
        let mut content_segments = Vec::new();
        let mut looking_for_anchors = true;

        for seg in segments {
            if looking_for_anchors && seg.html.is_empty() {
                if let Some(anchor) = &seg.anchor {
                    leading_anchors.push_str(&format!("<a id=\"{}\"></a>", escape_html_attr(anchor)));
                    continue;
                }
            }
            looking_for_anchors = false;
            content_segments.push(seg);
        }

        let html = Self::segments_to_html(&content_segments);
        let html = if context.preserve_whitespace() {
            html
        } else {
            html.trim().to_string()
        };

        if html.is_empty() {
            if leading_anchors.is_empty() {
                return Ok(None);
            }
            return Ok(Some(BlockNode::RawHtml(leading_anchors)));
        }

        Self::apply_paragraph_formatting(para, leading_anchors + &html, context).map(Some)
    }

    /// Collects formatted segments from paragraph content.
    fn collect_segments<'a>(
        para: &Paragraph<'a>,
        context: &mut ConversionContext<'a>,
    ) -> Result<Vec<FormattedSegment>> {
        let mut segments = Vec::new();
        let mut field_stack = Vec::new();

        let para_style_id = para
            .property
            .as_ref()
            .and_then(|p| p.style_id.as_ref())
            .map(|s| s.value.as_ref());

        for content in &para.content {
            match content {
                ParagraphContent::Run(run) => {
                    let filtered_run = Self::filter_run_by_field_state(run, &mut field_stack);
                    if filtered_run.content.is_empty() {
                        continue;
                    }
                    segments.extend(Self::run_segment(&filtered_run, context, para_style_id)?);
                }
                ParagraphContent::Link(hyperlink) => {
                    let link_html = Self::convert_hyperlink(hyperlink, context, para_style_id)?;
                    if !link_html.is_empty() {
                        segments.push(FormattedSegment {
                            html: link_html,
                            ..Default::default()
                        });
                    }
                }
                ParagraphContent::BookmarkStart(bookmark) => {
                    if let Some(name) = &bookmark.name {
                        segments.push(FormattedSegment {
                            anchor: Some(name.to_string()),
                            ..Default::default()
                        });
                    }
                }
                ParagraphContent::SDT(sdt) => {
                    // Structured document tags (TOC, content controls) - keep inner content
                    if let Some(sdt_content) = &sdt.content {
                        for bc in &sdt_content.content {
                            if let BodyContent::Paragraph(inner_para) = bc {
                                segments.extend(Self::collect_segments(inner_para, context)?);
                            }
                        }
                    }
                }
                ParagraphContent::Insertion(ins) => {
                    // Tracked insertions are part of the visible text
                    for run in &ins.runs {
                        segments.extend(Self::run_segment(run, context, para_style_id)?);
                    }
                }
                // Tracked deletions are not part of the document anymore
                ParagraphContent::Deletion(_) => {}
                _ => {}
            }
        }

        Ok(segments)
    }

    fn run_segment<'a>(
        run: &Run<'a>,
        context: &mut ConversionContext<'a>,
        para_style_id: Option<&str>,
    ) -> Result<Option<FormattedSegment>> {
        let html = RunConverter::content_html(run, context)?;
        if html.is_empty() {
            return Ok(None);
        }
        Ok(Some(FormattedSegment {
            html,
            format: RunConverter::format(run, context, para_style_id),
            anchor: None,
        }))
    }

    /// Merges adjacent segments with identical formatting.
    fn merge_segments(segments: Vec<FormattedSegment>) -> Vec<FormattedSegment> {
        let mut merged: Vec<FormattedSegment> = Vec::new();

        for seg in segments {
            if let Some(last) = merged.last_mut() {
                if last.format == seg.format && last.anchor == seg.anchor {
                    last.html.push_str(&seg.html);
                    continue;
                }
            }
            merged.push(seg);
        }

        merged
    }

    fn segments_to_html(segments: &[FormattedSegment]) -> String {
        let mut result = String::new();
        for seg in segments {
            if let Some(anchor) = &seg.anchor {
                result.push_str(&format!("<a id=\"{}\"></a>", escape_html_attr(anchor)));
            }
            result.push_str(&seg.format.wrap(&seg.html));
        }
        result
    }

    /// Applies paragraph-level structure (heading, list item, alignment).
    fn apply_paragraph_formatting<'a>(
        para: &Paragraph<'a>,
        html: String,
        context: &mut ConversionContext<'a>,
    ) -> Result<BlockNode> {
        let para_style_id = para
            .property
            .as_ref()
            .and_then(|p| p.style_id.as_ref())
            .map(|s| s.value.as_ref());

        let effective_props =
            context.resolve_paragraph_property(para.property.as_ref(), para_style_id);

        let heading_level = effective_props
            .style_id
            .as_ref()
            .and_then(|style| context.heading_level(&style.value));

        let align = effective_props
            .justification
            .as_ref()
            .and_then(|jc| match jc.value {
                JustificationVal::Center => Some(Align::Center),
                JustificationVal::Right => Some(Align::Right),
                _ => None,
            });

        if let Some(level) = heading_level {
            return Ok(BlockNode::Paragraph {
                kind: BlockKind::Heading(level.clamp(1, 6)),
                align,
                html,
            });
        }

        if let Some(num_pr) = &effective_props.numbering {
            if let (Some(num_id), Some(ilvl)) = (&num_pr.id, &num_pr.level) {
                if let Some((ordered, level)) =
                    context.list_placement(num_id.value as i32, ilvl.value as i32)
                {
                    return Ok(BlockNode::ListItem {
                        ordered,
                        level,
                        html,
                    });
                }
            }
        }

        Ok(BlockNode::Paragraph {
            kind: BlockKind::Paragraph,
            align,
            html,
        })
    }

    /// Converts a hyperlink to an `<a href>` element.
    fn convert_hyperlink<'a>(
        hyperlink: &Hyperlink<'a>,
        context: &mut ConversionContext<'a>,
        para_style_id: Option<&str>,
    ) -> Result<String> {
        let mut link_html = String::new();
        let mut field_stack = Vec::new();

        for run in &hyperlink.content {
            let filtered_run = Self::filter_run_by_field_state(run, &mut field_stack);
            if filtered_run.content.is_empty() {
                continue;
            }
            link_html.push_str(&RunConverter::convert(&filtered_run, context, para_style_id)?);
        }

        if link_html.is_empty() {
            return Ok(link_html);
        }

        // Internal bookmark links (TOC entries) use the anchor, external ones a relationship
        let url = if let Some(anchor) = &hyperlink.anchor {
            format!("#{}", anchor)
        } else if let Some(id) = &hyperlink.id {
            context
                .relationship_target(id.as_ref())
                .map(str::to_owned)
                .unwrap_or_else(|| "#".to_string())
        } else {
            "#".to_string()
        };

        Ok(format!(
            "<a href=\"{}\">{}</a>",
            escape_html_attr(&url),
            link_html
        ))
    }
}
