use docfill::converter::{DocxToHtml, HtmlConverter};
use docfill::html::normalize;
use docfill::testing::{docx_with_body, paragraph};
use docfill::{DefaultLocalization, PortugueseLocalization};
use hard_xml::XmlRead;
use rs_docx::document::{Paragraph, Run};
use rs_docx::Docx;

#[test]
fn test_shapes_become_labelled_blocks_after_normalization() {
    let dir = tempfile::tempdir().unwrap();
    let body = format!(
        "{}{}{}",
        paragraph(&["Before"]),
        r#"<w:p><w:r><w:pict><v:shape id="S1"/></w:pict></w:r></w:p>"#,
        paragraph(&["After"])
    );
    let path = dir.path().join("shape.docx");
    std::fs::write(&path, docx_with_body(&body)).unwrap();

    let conversion = DocxToHtml::with_defaults().convert(&path).unwrap();
    assert!(conversion.html.contains("<div class=\"docx-shape\" data-type=\"shape\"></div>"));
    assert_eq!(conversion.warnings.len(), 1);

    let html = normalize(&conversion.html, &PortugueseLocalization);
    assert!(html.contains("data-visual-element=\"shape\""), "{}", html);
    assert!(html.contains("<span class=\"docx-visual-caption\">Forma/Shape</span>"));
    assert!(html.find("Before").unwrap() < html.find("Forma/Shape").unwrap());
    assert!(html.find("Forma/Shape").unwrap() < html.find("After").unwrap());
}

#[test]
fn test_formatting_and_escaping_survive_conversion() {
    let dir = tempfile::tempdir().unwrap();
    let mut docx = Docx::default();
    let bold = Run::from_str(r#"<w:r><w:rPr><w:b/></w:rPr><w:t>Total:</w:t></w:r>"#)
        .expect("valid run");
    let plain = Run::from_str(r#"<w:r><w:t xml:space="preserve"> 5 &lt; 7 &amp; true</w:t></w:r>"#)
        .expect("valid run");
    docx.document.push(Paragraph::default().push(bold).push(plain));
    let path = dir.path().join("format.docx");
    docx.write_file(&path).expect("failed to write docx");

    let conversion = DocxToHtml::with_defaults().convert(&path).unwrap();
    assert!(
        conversion
            .html
            .contains("<p><strong>Total:</strong> 5 &lt; 7 &amp; true</p>"),
        "{}",
        conversion.html
    );
    let normalized = normalize(&conversion.html, &DefaultLocalization);
    assert!(normalized.contains("5 &lt; 7 &amp; true"));
}

#[test]
fn test_non_docx_bytes_are_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fake.docx");
    std::fs::write(&path, b"plain text").unwrap();
    let err = DocxToHtml::with_defaults().convert(&path).unwrap_err();
    assert!(err.is_client_error(), "{}", err);
}
