//! # docfill
//!
//! Fills `{{field}}` placeholders in DOCX templates and renders the result as
//! DOCX, an HTML preview, or a PDF printed by headless Chrome.
//!
//! ## Example
//!
//! ```no_run
//! use docfill::{LoadedTemplate, OutputFormat, Pipeline, PipelineOptions};
//! use std::collections::BTreeMap;
//!
//! # async fn run() -> docfill::Result<()> {
//! let bytes = std::fs::read("contract.docx")?;
//! let template = LoadedTemplate::from_bytes("Contract", bytes)?;
//!
//! let mut values = BTreeMap::new();
//! values.insert("name".to_string(), "Ana".to_string());
//!
//! let pipeline = Pipeline::new(PipelineOptions::default());
//! let artifact = pipeline.generate(&template, &values, OutputFormat::Pdf).await?;
//! std::fs::write("contract.pdf", &artifact.bytes)?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod converter;
pub mod core;
pub mod error;
pub mod html;
pub mod localization;
pub mod pdf;
pub mod pipeline;
pub mod render;
pub mod template;

#[doc(hidden)]
pub mod testing;

pub use converter::{Conversion, DocxToHtml, HtmlConverter};
pub use error::{Error, Result, Stage};
pub use localization::{DefaultLocalization, Locale, LocalizationStrategy, PortugueseLocalization};
pub use pdf::{ChromePdfRenderer, PdfBackend, PdfOptions};
pub use pipeline::{Artifact, LoadedTemplate, OutputFormat, OutputKind, Pipeline, Preview};
pub use template::{extract_fields, fill, FieldPolicy, FieldSpec, FieldValues, FillOptions};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Options for DOCX to HTML conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// How to handle images in the document.
    pub image_handling: ImageHandling,
    /// Whether to preserve exact whitespace.
    pub preserve_whitespace: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            image_handling: ImageHandling::Inline,
            preserve_whitespace: false,
        }
    }
}

/// Specifies how images should be handled during conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageHandling {
    /// Embed images as base64 data URIs.
    Inline,
    /// Skip images entirely.
    Skip,
}

/// Settings for a [`Pipeline`], loadable from a JSON config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Directory for temporary DOCX and HTML files.
    pub work_dir: PathBuf,
    pub fill: FillOptions,
    pub field_policy: FieldPolicy,
    pub convert: ConvertOptions,
    pub pdf: PdfOptions,
    /// Upper bound on headless engines running at once.
    pub max_concurrent_renders: usize,
    pub locale: Locale,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir(),
            fill: FillOptions::default(),
            field_policy: FieldPolicy::default(),
            convert: ConvertOptions::default(),
            pdf: PdfOptions::default(),
            max_concurrent_renders: 2,
            locale: Locale::default(),
        }
    }
}

/// Creates `docfill-<unix-millis>-<random>.<ext>` under `dir`, removed on drop.
pub(crate) fn scratch_file(dir: &Path, ext: &str) -> Result<tempfile::NamedTempFile> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let file = tempfile::Builder::new()
        .prefix(&format!("docfill-{}-", millis))
        .suffix(&format!(".{}", ext))
        .tempfile_in(dir)?;
    Ok(file)
}

// Python bindings (only when 'python' feature is enabled)
#[cfg(feature = "python")]
mod python_bindings {
    use super::*;
    use pyo3::prelude::*;
    use pyo3::types::PyBytes;
    use std::collections::BTreeMap;

    fn to_py_err(e: Error) -> PyErr {
        if e.is_client_error() {
            PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string())
        } else {
            PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(e.to_string())
        }
    }

    /// Returns the placeholder names of a DOCX template, in document order.
    #[pyfunction]
    #[pyo3(name = "extract_fields")]
    fn py_extract_fields(template: &[u8]) -> PyResult<Vec<String>> {
        extract_fields(template).map_err(to_py_err)
    }

    /// Fills a DOCX template and returns the new document bytes.
    #[pyfunction]
    fn fill_docx<'py>(
        py: Python<'py>,
        template: &[u8],
        values: BTreeMap<String, String>,
    ) -> PyResult<Bound<'py, PyBytes>> {
        let filled = fill(template, &values, &FillOptions::default()).map_err(to_py_err)?;
        Ok(PyBytes::new(py, &filled))
    }

    /// A Python module implemented in Rust.
    #[pymodule]
    pub fn docfill(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(py_extract_fields, m)?)?;
        m.add_function(wrap_pyfunction!(fill_docx, m)?)?;
        Ok(())
    }
}
