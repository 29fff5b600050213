//! Run element converter - handles text runs with formatting.

use super::ConversionContext;
use crate::render::escape_html_text;
use crate::Result;
use rs_docx::document::{BreakType, Run, RunContent};
use rs_docx::formatting::CharacterProperty;

/// Page breaks survive into HTML as an empty span the print stylesheet honours.
pub const PAGE_BREAK: &str = "<span class=\"page-break\"></span>";

/// Character formatting that maps onto HTML inline tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunFormat {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
}

impl RunFormat {
    pub fn from_property(props: &CharacterProperty<'_>) -> Self {
        Self {
            bold: props
                .bold
                .as_ref()
                .map(|b| b.value.unwrap_or(true))
                .unwrap_or(false),
            italic: props
                .italics
                .as_ref()
                .map(|i| i.value.unwrap_or(true))
                .unwrap_or(false),
            underline: props.underline.is_some(),
            strike: props
                .strike
                .as_ref()
                .map(|s| s.value.unwrap_or(true))
                .unwrap_or(false),
        }
    }

    /// Wraps `html` in the tags for this format, innermost first:
    /// `<strong><em><u><s>..</s></u></em></strong>`.
    pub fn wrap(&self, html: &str) -> String {
        if html.trim().is_empty() {
            return html.to_string();
        }
        let mut result = html.to_string();
        if self.strike {
            result = format!("<s>{}</s>", result);
        }
        if self.underline {
            result = format!("<u>{}</u>", result);
        }
        if self.italic {
            result = format!("<em>{}</em>", result);
        }
        if self.bold {
            result = format!("<strong>{}</strong>", result);
        }
        result
    }
}

/// Converter for Run elements.
pub struct RunConverter;

impl RunConverter {
    /// Converts a Run to formatted HTML.
    pub fn convert<'a>(
        run: &Run<'a>,
        context: &mut ConversionContext<'a>,
        para_style_id: Option<&str>,
    ) -> Result<String> {
        let html = Self::content_html(run, context)?;
        if html.is_empty() {
            return Ok(html);
        }
        Ok(Self::format(run, context, para_style_id).wrap(&html))
    }

    /// Effective formatting of a run after style resolution.
    pub fn format<'a>(
        run: &Run<'a>,
        context: &ConversionContext<'a>,
        para_style_id: Option<&str>,
    ) -> RunFormat {
        let run_style_id = run
            .property
            .as_ref()
            .and_then(|props| props.style_id.as_ref())
            .map(|style| style.value.as_ref());

        let effective_props =
            context.resolve_run_property(run.property.as_ref(), run_style_id, para_style_id);
        RunFormat::from_property(&effective_props)
    }

    /// Unformatted HTML for the run's content. Field instructions are dropped.
    pub fn content_html<'a>(run: &Run<'a>, context: &mut ConversionContext<'a>) -> Result<String> {
        let mut html = String::new();

        for content in &run.content {
            match content {
                RunContent::Text(t) => {
                    html.push_str(&escape_html_text(&t.text));
                }
                RunContent::Break(br) => match br.ty {
                    Some(BreakType::Page) => html.push_str(PAGE_BREAK),
                    _ => html.push_str("<br/>"),
                },
                RunContent::Tab(_) => {
                    html.push('\t');
                }
                RunContent::CarriageReturn(_) => {
                    html.push_str("<br/>");
                }
                RunContent::Drawing(drawing) => {
                    html.push_str(&context.drawing_html(drawing)?);
                }
                RunContent::Pict(pict) => {
                    html.push_str(&context.pict_html(pict)?);
                }
                RunContent::Sym(sym) => {
                    // Symbol character - use Unicode if possible
                    let decoded = sym
                        .char
                        .as_ref()
                        .and_then(|code| u32::from_str_radix(code, 16).ok())
                        .and_then(char::from_u32);
                    if let Some(c) = decoded {
                        html.push_str(&escape_html_text(&c.to_string()));
                    }
                }
                _ => {}
            }
        }

        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_nests_tags() {
        let format = RunFormat {
            bold: true,
            italic: true,
            underline: true,
            strike: false,
        };
        assert_eq!(format.wrap("x"), "<strong><em><u>x</u></em></strong>");
        assert_eq!(format.wrap("  "), "  ");
        assert_eq!(RunFormat::default().wrap("plain"), "plain");
    }
}
