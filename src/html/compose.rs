//! Wraps converted HTML fragments into standalone documents.

use crate::localization::LocalizationStrategy;
use crate::render::escape_html_text;

/// Print style sheet applied to documents headed for the PDF renderer.
pub const PRINT_STYLESHEET: &str = r#"@page { size: A4; margin: 2cm; }
* { box-sizing: border-box; }
body {
  font-family: 'Times New Roman', serif;
  font-size: 12pt;
  line-height: 1.4;
  color: #000;
  background: white;
  margin: 0;
  padding: 0;
  -webkit-print-color-adjust: exact;
  print-color-adjust: exact;
}
h1 { font-size: 20pt; font-weight: bold; }
h2 { font-size: 18pt; font-weight: bold; }
h3 { font-size: 16pt; font-weight: bold; }
h4 { font-size: 14pt; font-weight: bold; }
h5 { font-size: 13pt; font-weight: bold; }
h6 { font-size: 12pt; font-weight: bold; }
p { text-align: justify; margin: 0 0 6pt 0; }
ul, ol { padding-left: 30px; margin: 6pt 0; }
img { max-width: 100%; height: auto; display: block; margin: 10px auto; }
table {
  border-collapse: collapse;
  width: 100%;
  margin: 5px 0;
  border: 1px solid #000;
  page-break-inside: avoid;
  break-inside: avoid;
}
tr { page-break-inside: avoid; break-inside: avoid; }
td, th {
  border: 1px solid #000;
  padding: 6px;
  text-align: left;
  vertical-align: top;
  page-break-inside: avoid;
  break-inside: avoid;
}
.page-break { page-break-after: always; break-after: page; }
.docx-visual {
  display: block;
  margin: 8px 0;
  padding: 8px;
  border: 1px solid #007bff;
  border-radius: 4px;
  background-color: #f8f9fa;
  page-break-inside: avoid;
  break-inside: avoid;
}
.docx-visual-caption {
  display: block;
  margin-bottom: 4px;
  font-size: 10pt;
  font-weight: bold;
  color: #007bff;
}
hr { border: none; border-top: 2px solid #dee2e6; margin: 16px 0; }
"#;

/// Screen style sheet for HTML previews.
pub const PREVIEW_STYLESHEET: &str = r#"body {
  font-family: Georgia, 'Times New Roman', serif;
  font-size: 16px;
  line-height: 1.5;
  color: #222;
  background: #f4f4f4;
  margin: 0;
  padding: 24px 0;
}
main {
  max-width: 800px;
  margin: 0 auto;
  padding: 40px 48px;
  background: white;
  box-shadow: 0 1px 4px rgba(0, 0, 0, 0.15);
}
p { text-align: justify; }
ul, ol { padding-left: 30px; }
img { max-width: 100%; height: auto; }
table { border-collapse: collapse; width: 100%; margin: 8px 0; }
td, th { border: 1px solid #999; padding: 6px; vertical-align: top; }
.page-break { border-top: 1px dashed #bbb; margin: 24px 0; }
.docx-visual {
  display: block;
  margin: 8px 0;
  padding: 8px;
  border: 1px dashed #007bff;
  border-radius: 4px;
  background-color: #f1f7ff;
}
.docx-visual-caption { display: block; font-size: 12px; font-weight: bold; color: #007bff; }
"#;

fn document(body_html: &str, title: &str, lang: &str, stylesheet: &str, wrap_main: bool) -> String {
    let (open, close) = if wrap_main {
        ("<main>\n", "\n</main>")
    } else {
        ("", "")
    };
    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html lang=\"{lang}\">\n",
            "<head>\n",
            "<meta charset=\"UTF-8\">\n",
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
            "<title>{title}</title>\n",
            "<style>\n{style}</style>\n",
            "</head>\n",
            "<body>\n{open}{body}{close}\n</body>\n",
            "</html>\n"
        ),
        lang = lang,
        title = escape_html_text(title),
        style = stylesheet,
        open = open,
        body = body_html,
        close = close,
    )
}

/// Builds the print-ready document handed to the PDF renderer.
pub fn compose(body_html: &str, title: &str, localization: &dyn LocalizationStrategy) -> String {
    document(body_html, title, localization.lang(), PRINT_STYLESHEET, false)
}

/// Builds a standalone preview page with a screen style.
pub fn compose_preview(
    body_html: &str,
    title: &str,
    localization: &dyn LocalizationStrategy,
) -> String {
    document(body_html, title, localization.lang(), PREVIEW_STYLESHEET, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localization::{DefaultLocalization, PortugueseLocalization};

    #[test]
    fn test_compose_wraps_body_with_print_rules() {
        let doc = compose("<p>Hello</p>", "Report", &DefaultLocalization);
        assert!(doc.starts_with("<!DOCTYPE html>\n<html lang=\"en\">"));
        assert!(doc.contains("<title>Report</title>"));
        assert!(doc.contains("@page { size: A4; margin: 2cm; }"));
        assert!(doc.contains("<body>\n<p>Hello</p>\n</body>"));
        assert!(doc.contains("h1 { font-size: 20pt;"));
        assert!(doc.contains("h6 { font-size: 12pt;"));
    }

    #[test]
    fn test_table_parts_avoid_page_breaks() {
        for selector in ["table {", "tr {", "td, th {"] {
            let start = PRINT_STYLESHEET.find(selector).unwrap();
            let block = &PRINT_STYLESHEET[start..];
            let block = &block[..block.find('}').unwrap()];
            assert!(block.contains("page-break-inside: avoid"), "{}", selector);
            assert!(block.contains("break-inside: avoid"), "{}", selector);
        }
    }

    #[test]
    fn test_title_is_escaped_and_lang_localized() {
        let doc = compose("", "<Contrato & Termo>", &PortugueseLocalization);
        assert!(doc.contains("<html lang=\"pt-BR\">"));
        assert!(doc.contains("<title>&lt;Contrato &amp; Termo&gt;</title>"));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let a = compose("<p>x</p>", "t", &DefaultLocalization);
        let b = compose("<p>x</p>", "t", &DefaultLocalization);
        assert_eq!(a, b);
    }

    #[test]
    fn test_preview_uses_screen_style() {
        let doc = compose_preview("<p>x</p>", "t", &DefaultLocalization);
        assert!(doc.contains("<main>\n<p>x</p>\n</main>"));
        assert!(!doc.contains("@page"));
    }
}
