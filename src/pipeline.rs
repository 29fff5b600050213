//! Sequences validation, filling, conversion, normalization and printing.

use crate::converter::{DocxToHtml, HtmlConverter};
use crate::error::{Error, Result, Stage};
use crate::html::{compose, normalize};
use crate::pdf::{ChromePdfRenderer, PdfBackend};
use crate::template::{self, FieldSpec, FieldValues, TemplateStore, DOCX_MIME};
use crate::PipelineOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Output requested from [`Pipeline::produce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OutputKind {
    Docx,
    Pdf,
    #[serde(alias = "html")]
    #[value(name = "html")]
    HtmlPreview,
}

impl OutputKind {
    pub fn content_type(self) -> &'static str {
        match self {
            OutputKind::Docx => DOCX_MIME,
            OutputKind::Pdf => "application/pdf",
            OutputKind::HtmlPreview => "text/html; charset=utf-8",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::Docx => "docx",
            OutputKind::Pdf => "pdf",
            OutputKind::HtmlPreview => "html",
        }
    }
}

/// Download formats offered by [`Pipeline::generate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Docx,
    Pdf,
}

impl From<OutputFormat> for OutputKind {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Docx => OutputKind::Docx,
            OutputFormat::Pdf => OutputKind::Pdf,
        }
    }
}

/// Bytes produced by a render plus everything worth telling the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: OutputKind,
    pub bytes: Vec<u8>,
    pub warnings: Vec<String>,
}

impl Artifact {
    pub fn content_type(&self) -> &'static str {
        self.kind.content_type()
    }
}

/// Normalized HTML fragment of a filled template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub html: String,
    pub warnings: Vec<String>,
}

/// A template's bytes and field schema, ready to render.
#[derive(Debug, Clone)]
pub struct LoadedTemplate {
    /// Document title used for composed HTML.
    pub title: String,
    pub bytes: Vec<u8>,
    pub fields: Vec<FieldSpec>,
}

impl LoadedTemplate {
    /// Loads an unregistered DOCX, treating each placeholder of every
    /// templated part as a text field.
    pub fn from_bytes(title: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let fields = template::template_fields(&bytes)?
            .into_iter()
            .map(FieldSpec::text)
            .collect();
        Ok(Self {
            title: title.into(),
            bytes,
            fields,
        })
    }

    /// Loads a registered template with its stored field schema.
    pub async fn from_store(store: &dyn TemplateStore, id: &str) -> Result<Self> {
        let meta = store.get(id).await?;
        let bytes = store.read_bytes(id).await?;
        Ok(Self {
            title: meta.name,
            bytes,
            fields: meta.fields,
        })
    }
}

/// Runs render jobs. Cheap to clone; clones share the engine permits.
#[derive(Clone)]
pub struct Pipeline {
    converter: Arc<dyn HtmlConverter>,
    pdf: Arc<dyn PdfBackend>,
    options: PipelineOptions,
    permits: Arc<Semaphore>,
}

impl Pipeline {
    /// Pipeline with the in-crate converter and headless Chrome.
    pub fn new(options: PipelineOptions) -> Self {
        let converter = DocxToHtml::new(options.convert.clone())
            .with_localization(options.locale.strategy());
        let mut pdf_options = options.pdf.clone();
        if pdf_options.work_dir.is_none() {
            pdf_options.work_dir = Some(options.work_dir.clone());
        }
        Self::with_backends(
            options,
            Arc::new(converter),
            Arc::new(ChromePdfRenderer::new(pdf_options)),
        )
    }

    pub fn with_backends(
        options: PipelineOptions,
        converter: Arc<dyn HtmlConverter>,
        pdf: Arc<dyn PdfBackend>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(options.max_concurrent_renders.max(1)));
        Self {
            converter,
            pdf,
            options,
            permits,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Placeholder names of a DOCX, in document order.
    pub fn extract_fields(&self, docx: &[u8]) -> Result<Vec<String>> {
        template::extract_fields(docx)
    }

    /// Fills `template` and renders it as a downloadable document.
    pub async fn generate(
        &self,
        template: &LoadedTemplate,
        values: &FieldValues,
        format: OutputFormat,
    ) -> Result<Artifact> {
        self.produce(template, values, format.into()).await
    }

    /// Fills `template` and returns its normalized HTML.
    pub async fn preview(&self, template: &LoadedTemplate, values: &FieldValues) -> Result<Preview> {
        let artifact = self.produce(template, values, OutputKind::HtmlPreview).await?;
        let html = String::from_utf8(artifact.bytes)
            .map_err(|e| Error::Conversion(format!("preview is not UTF-8: {}", e)))?;
        Ok(Preview {
            html,
            warnings: artifact.warnings,
        })
    }

    /// Runs every stage `kind` needs. Temporary files are gone when this returns.
    pub async fn produce(
        &self,
        template: &LoadedTemplate,
        values: &FieldValues,
        kind: OutputKind,
    ) -> Result<Artifact> {
        log::debug!("render '{}' as {:?}", template.title, kind);

        let resolution = template::resolve(&template.fields, values, self.options.field_policy)
            .map_err(|e| e.at(Stage::Validate))?;
        let mut warnings = resolution.warnings;

        let filled = self
            .fill(template.bytes.clone(), resolution.values)
            .await
            .map_err(|e| e.at(Stage::Fill))?;
        if kind == OutputKind::Docx {
            return Ok(self.finish(template, kind, filled, warnings));
        }

        let conversion = self.convert(filled).await.map_err(|e| e.at(Stage::Convert))?;
        for warning in &conversion.warnings {
            log::warn!("{}: {}", template.title, warning);
        }
        warnings.extend(conversion.warnings);

        let localization = self.options.locale.strategy();
        let body = normalize(&conversion.html, localization);
        if kind == OutputKind::HtmlPreview {
            return Ok(self.finish(template, kind, body.into_bytes(), warnings));
        }

        let document = compose(&body, &template.title, localization);
        let pdf = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|e| Error::RenderEngine(e.to_string()).at(Stage::Pdf))?;
            self.pdf
                .render_pdf(&document)
                .await
                .map_err(|e| e.at(Stage::Pdf))?
        };
        Ok(self.finish(template, kind, pdf, warnings))
    }

    fn finish(
        &self,
        template: &LoadedTemplate,
        kind: OutputKind,
        bytes: Vec<u8>,
        warnings: Vec<String>,
    ) -> Artifact {
        log::info!(
            "rendered '{}' as {} ({} bytes, {} warning(s))",
            template.title,
            kind.extension(),
            bytes.len(),
            warnings.len()
        );
        Artifact {
            kind,
            bytes,
            warnings,
        }
    }

    async fn fill(&self, template: Vec<u8>, values: FieldValues) -> Result<Vec<u8>> {
        let options = self.options.fill.clone();
        tokio::task::spawn_blocking(move || template::fill(&template, &values, &options))
            .await
            .map_err(|e| Error::Conversion(format!("fill worker failed: {}", e)))?
    }

    async fn convert(&self, filled: Vec<u8>) -> Result<crate::Conversion> {
        let scratch = crate::scratch_file(&self.options.work_dir, "docx")?;
        tokio::fs::write(scratch.path(), &filled).await?;

        let converter = Arc::clone(&self.converter);
        let path: PathBuf = scratch.path().to_path_buf();
        let result = tokio::task::spawn_blocking(move || converter.convert(&path))
            .await
            .map_err(|e| Error::Conversion(format!("conversion worker failed: {}", e)));

        if let Err(e) = scratch.close() {
            log::warn!("failed to remove temporary DOCX: {}", e);
        }
        result?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::docx::DocxPackage;
    use crate::testing::{docx_with_body, docx_with_parts, document_xml, paragraph};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakePdf {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PdfBackend for FakePdf {
        async fn render_pdf(&self, html: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("%PDF-1.4\n{}", html.len()).into_bytes())
        }
    }

    fn pipeline(dir: &std::path::Path) -> (Pipeline, Arc<FakePdf>) {
        let pdf = Arc::new(FakePdf {
            calls: AtomicUsize::new(0),
        });
        let options = PipelineOptions {
            work_dir: dir.to_path_buf(),
            ..PipelineOptions::default()
        };
        let pipeline = Pipeline::with_backends(
            options,
            Arc::new(DocxToHtml::with_defaults()),
            pdf.clone(),
        );
        (pipeline, pdf)
    }

    fn letter() -> LoadedTemplate {
        let body = paragraph(&["Dear {{name}},"]);
        LoadedTemplate::from_bytes("Letter", docx_with_body(&body)).unwrap()
    }

    fn values(pairs: &[(&str, &str)]) -> FieldValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>()
    }

    #[tokio::test]
    async fn test_docx_output_skips_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, pdf) = pipeline(dir.path());
        let artifact = pipeline
            .generate(&letter(), &values(&[("name", "Ana")]), OutputFormat::Docx)
            .await
            .unwrap();
        assert_eq!(artifact.content_type(), DOCX_MIME);
        assert_eq!(
            template::extract_fields(&artifact.bytes).unwrap(),
            Vec::<String>::new()
        );
        assert_eq!(pdf.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_preview_contains_value_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(dir.path());
        let preview = pipeline
            .preview(&letter(), &values(&[("name", "Ana & Bia")]))
            .await
            .unwrap();
        assert!(preview.html.contains("Dear Ana &amp; Bia,"), "{}", preview.html);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_pdf_goes_through_backend() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, pdf) = pipeline(dir.path());
        let artifact = pipeline
            .generate(&letter(), &values(&[("name", "Ana")]), OutputFormat::Pdf)
            .await
            .unwrap();
        assert!(artifact.bytes.starts_with(b"%PDF"));
        assert_eq!(artifact.content_type(), "application/pdf");
        assert_eq!(pdf.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_strict_policy_fails_in_validate_stage() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = Arc::new(FakePdf {
            calls: AtomicUsize::new(0),
        });
        let options = PipelineOptions {
            work_dir: dir.path().to_path_buf(),
            field_policy: crate::FieldPolicy::Strict,
            ..PipelineOptions::default()
        };
        let pipeline =
            Pipeline::with_backends(options, Arc::new(DocxToHtml::with_defaults()), pdf);
        let err = pipeline
            .generate(&letter(), &values(&[("nome", "Ana")]), OutputFormat::Docx)
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Validate));
        assert!(matches!(err.root(), Error::FieldValidation(_)));
    }

    #[tokio::test]
    async fn test_lenient_policy_reports_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(dir.path());
        let preview = pipeline
            .preview(&letter(), &values(&[("nome", "Ana")]))
            .await
            .unwrap();
        assert!(preview.html.contains("Dear ,"));
        assert!(preview.warnings.iter().any(|w| w.contains("nome")));
    }

    #[tokio::test]
    async fn test_header_placeholders_are_filled_under_both_policies() {
        let bytes = docx_with_parts(&[
            ("word/document.xml", &document_xml(&paragraph(&["Dear {{name}}"]))),
            ("word/header1.xml", &format!("<w:hdr>{}</w:hdr>", paragraph(&["School: {{school}}"]))),
        ]);
        let template = LoadedTemplate::from_bytes("Letter", bytes).unwrap();
        let given = values(&[("name", "Ana"), ("school", "Escola X")]);

        for policy in [crate::FieldPolicy::Lenient, crate::FieldPolicy::Strict] {
            let dir = tempfile::tempdir().unwrap();
            let options = PipelineOptions {
                work_dir: dir.path().to_path_buf(),
                field_policy: policy,
                ..PipelineOptions::default()
            };
            let pipeline = Pipeline::new(options);
            let artifact = pipeline
                .generate(&template, &given, OutputFormat::Docx)
                .await
                .unwrap();
            assert!(artifact.warnings.is_empty(), "{:?}", artifact.warnings);

            let mut package = DocxPackage::open(&artifact.bytes).unwrap();
            let header = package.read_part("word/header1.xml").unwrap().unwrap();
            assert!(header.contains("School: Escola X"), "{}", header);
        }
    }
}
