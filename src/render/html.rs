use crate::core::ast::{Align, BlockKind, BlockNode, DocumentAst};
use crate::render::Renderer;
use crate::Result;

#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render(&self, document: &DocumentAst) -> Result<String> {
        Ok(self.render_blocks(&document.blocks))
    }
}

/// An open `<ol>`/`<ul>` and whether its last `<li>` is still open.
struct OpenList {
    ordered: bool,
    item_open: bool,
}

impl HtmlRenderer {
    /// Renders a block sequence, grouping consecutive list items into nested
    /// lists. Used for the document body and for table cells.
    pub fn render_blocks(&self, blocks: &[BlockNode]) -> String {
        let mut out = String::new();
        let mut lists: Vec<OpenList> = Vec::new();

        for block in blocks {
            match block {
                BlockNode::ListItem {
                    ordered,
                    level,
                    html,
                } => {
                    let depth = level + 1;
                    while lists.len() > depth {
                        close_list(&mut lists, &mut out);
                    }
                    if lists.len() == depth {
                        let same_kind = lists.last().is_some_and(|top| top.ordered == *ordered);
                        if !same_kind {
                            close_list(&mut lists, &mut out);
                        } else if let Some(top) = lists.last_mut().filter(|top| top.item_open) {
                            out.push_str("</li>\n");
                            top.item_open = false;
                        }
                    }
                    while lists.len() < depth {
                        out.push_str(if *ordered { "<ol>\n" } else { "<ul>\n" });
                        lists.push(OpenList {
                            ordered: *ordered,
                            item_open: false,
                        });
                    }
                    out.push_str("<li>");
                    out.push_str(html);
                    if let Some(top) = lists.last_mut() {
                        top.item_open = true;
                    }
                }
                other => {
                    while !lists.is_empty() {
                        close_list(&mut lists, &mut out);
                    }
                    render_block(other, &mut out);
                }
            }
        }

        while !lists.is_empty() {
            close_list(&mut lists, &mut out);
        }
        out
    }
}

fn close_list(lists: &mut Vec<OpenList>, out: &mut String) {
    if let Some(list) = lists.pop() {
        if list.item_open {
            out.push_str("</li>\n");
        }
        out.push_str(if list.ordered { "</ol>\n" } else { "</ul>\n" });
    }
}

fn render_block(block: &BlockNode, out: &mut String) {
    match block {
        BlockNode::Paragraph { kind, align, html } => {
            let tag = match kind {
                BlockKind::Paragraph => "p".to_string(),
                BlockKind::Heading(level) => format!("h{}", (*level).clamp(1, 6)),
            };
            let style = match align {
                Some(Align::Center) => " style=\"text-align: center;\"",
                Some(Align::Right) => " style=\"text-align: right;\"",
                None => "",
            };
            out.push_str(&format!("<{tag}{style}>{html}</{tag}>\n"));
        }
        BlockNode::TableHtml(html) | BlockNode::RawHtml(html) => {
            if !html.is_empty() {
                out.push_str(html);
                out.push('\n');
            }
        }
        BlockNode::ListItem { .. } => {}
    }
}
