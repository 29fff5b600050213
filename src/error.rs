//! Error types for docfill.

use std::fmt;
use thiserror::Error;

/// Result type for docfill operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage a failure happened in.
///
/// Normalizing and composing HTML cannot fail, so they have no tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Fill,
    Convert,
    Pdf,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Fill => "fill",
            Stage::Convert => "convert",
            Stage::Pdf => "pdf",
        };
        f.write_str(name)
    }
}

/// Error types that can occur while registering or rendering templates.
#[derive(Error, Debug)]
pub enum Error {
    /// Bytes are not a ZIP archive or lack the main document part.
    #[error("Malformed DOCX archive: {0}")]
    MalformedArchive(String),

    /// Placeholder delimiters are unbalanced.
    #[error("Template syntax error in {part}: {detail}")]
    TemplateSyntax { part: String, detail: String },

    /// Field values do not satisfy the template's field schema.
    #[error("Invalid field values: {0}")]
    FieldValidation(String),

    /// The rendering engine did not finish a stage in time.
    #[error("Rendering timed out during {stage} after {timeout_ms} ms; retry with the docx format")]
    RenderTimeout { stage: &'static str, timeout_ms: u64 },

    /// The rendering engine failed to start, load, or print.
    #[error("Rendering engine error: {0}")]
    RenderEngine(String),

    /// DOCX to HTML conversion failed.
    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Upload violates the storage policy (type, size, name).
    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    /// Error occurred during file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A pipeline stage failed; `source` is the underlying error.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Tags this error with the pipeline stage it came from.
    ///
    /// Errors that already carry a stage keep the innermost one.
    pub fn at(self, stage: Stage) -> Self {
        match self {
            tagged @ Error::Stage { .. } => tagged,
            other => Error::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Returns the error with any stage tags removed.
    pub fn root(&self) -> &Error {
        match self {
            Error::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Stage the error was raised in, if it went through the pipeline.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether the caller is at fault (4xx semantics) rather than the host.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.root(),
            Error::MalformedArchive(_)
                | Error::TemplateSyntax { .. }
                | Error::FieldValidation(_)
                | Error::UploadRejected(_)
                | Error::TemplateNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_tag_keeps_innermost_stage() {
        let err = Error::MalformedArchive("bad".into())
            .at(Stage::Fill)
            .at(Stage::Pdf);
        assert_eq!(err.stage(), Some(Stage::Fill));
        assert!(matches!(err.root(), Error::MalformedArchive(_)));
        assert_eq!(
            err.to_string(),
            "fill stage failed: Malformed DOCX archive: bad"
        );
    }

    #[test]
    fn test_stage_names() {
        let names: Vec<String> = [Stage::Validate, Stage::Fill, Stage::Convert, Stage::Pdf]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, vec!["validate", "fill", "convert", "pdf"]);
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::FieldValidation("x".into()).at(Stage::Validate).is_client_error());
        assert!(!Error::RenderEngine("crash".into()).is_client_error());
        assert!(!Error::RenderTimeout {
            stage: "printing",
            timeout_ms: 10
        }
        .is_client_error());
    }
}
