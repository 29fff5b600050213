mod escape;
mod html;

use crate::core::ast::DocumentAst;
use crate::Result;

pub use escape::{escape_html_attr, escape_html_text, escape_xml_text};
pub use html::HtmlRenderer;

pub trait Renderer {
    fn render(&self, document: &DocumentAst) -> Result<String>;
}
