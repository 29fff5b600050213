//! Template records persisted on the file system.
//!
//! Each template is stored as `<id>.docx` next to an `<id>.json` metadata
//! file under one root directory.

use super::fill::check_delimiters;
use super::placeholders::{audit_placeholders, template_fields};
use super::schema::FieldSpec;
use crate::{error::Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// MIME type browsers send for `.docx` uploads.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// A registered DOCX template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    pub original_filename: String,
    pub file_path: PathBuf,
    pub fields: Vec<FieldSpec>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

/// An uploaded file waiting to be registered.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub description: Option<String>,
    pub owner: Option<String>,
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Limits applied to uploads before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadPolicy {
    pub max_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

impl UploadPolicy {
    pub fn check(&self, upload: &Upload) -> Result<()> {
        if upload.name.trim().is_empty() {
            return Err(Error::UploadRejected("template name is required".to_string()));
        }

        let mime_ok = upload.content_type.as_deref() == Some(DOCX_MIME);
        let extension_ok = Path::new(&upload.filename)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("docx"));
        if !mime_ok && !extension_ok {
            return Err(Error::UploadRejected(format!(
                "'{}' is not a .docx file",
                upload.filename
            )));
        }

        if upload.bytes.len() > self.max_bytes {
            return Err(Error::UploadRejected(format!(
                "file is {} bytes, the limit is {} bytes",
                upload.bytes.len(),
                self.max_bytes
            )));
        }
        Ok(())
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct Registration {
    pub template: Template,
    /// Placeholder audit findings worth showing to the uploader.
    pub warnings: Vec<String>,
}

/// Metadata-level changes; `None` leaves a value as it is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Must list exactly the template's placeholder names, in order.
    pub fields: Option<Vec<FieldSpec>>,
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// All templates, newest first.
    async fn list(&self) -> Result<Vec<Template>>;
    async fn get(&self, id: &str) -> Result<Template>;
    async fn create(&self, upload: Upload) -> Result<Registration>;
    async fn update(&self, id: &str, update: TemplateUpdate) -> Result<Template>;
    async fn delete(&self, id: &str) -> Result<()>;
    async fn read_bytes(&self, id: &str) -> Result<Vec<u8>>;
}

/// [`TemplateStore`] backed by a directory.
#[derive(Debug, Clone)]
pub struct FsTemplateStore {
    root: PathBuf,
    policy: UploadPolicy,
}

impl FsTemplateStore {
    pub async fn open(root: impl Into<PathBuf>, policy: UploadPolicy) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root, policy })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn docx_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.docx", id))
    }

    fn meta_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }

    /// Ids are UUIDs; anything else can never name a stored template.
    fn checked_id(id: &str) -> Result<String> {
        Uuid::parse_str(id)
            .map(|uuid| uuid.to_string())
            .map_err(|_| Error::TemplateNotFound(id.to_string()))
    }

    async fn write_meta(&self, template: &Template) -> Result<()> {
        let json = serde_json::to_vec_pretty(template)?;
        let path = self.meta_path(&template.id);
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, json).await?;
        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            Self::remove_quietly(&staging).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn remove_quietly(path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::warn!("failed to remove {}: {}", path.display(), e),
        }
    }
}

/// Fields and audit warnings for freshly uploaded bytes.
fn inspect(bytes: &[u8]) -> Result<(Vec<FieldSpec>, Vec<String>)> {
    check_delimiters(bytes)?;
    let names = template_fields(bytes)?;
    let warnings = audit_placeholders(bytes)?;
    Ok((names.into_iter().map(FieldSpec::text).collect(), warnings))
}

#[async_trait]
impl TemplateStore for FsTemplateStore {
    async fn list(&self) -> Result<Vec<Template>> {
        let mut templates = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<Template>(&bytes) {
                Ok(template) => templates.push(template),
                Err(e) => log::warn!("skipping unreadable metadata {}: {}", path.display(), e),
            }
        }

        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }

    async fn get(&self, id: &str) -> Result<Template> {
        let id = Self::checked_id(id)?;
        let bytes = match tokio::fs::read(self.meta_path(&id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::TemplateNotFound(id)),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn create(&self, upload: Upload) -> Result<Registration> {
        self.policy.check(&upload)?;

        let id = Uuid::new_v4().to_string();
        let file_path = self.docx_path(&id);
        tokio::fs::write(&file_path, &upload.bytes).await?;

        let (fields, warnings) = match inspect(&upload.bytes) {
            Ok(found) => found,
            Err(e) => {
                Self::remove_quietly(&file_path).await;
                return Err(e);
            }
        };

        let now = Utc::now();
        let template = Template {
            id,
            name: upload.name.trim().to_string(),
            description: upload.description,
            owner: upload.owner,
            original_filename: upload.filename,
            file_path,
            fields,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.write_meta(&template).await {
            Self::remove_quietly(&template.file_path).await;
            return Err(e);
        }

        for warning in &warnings {
            log::warn!("template {}: {}", template.id, warning);
        }
        log::info!(
            "registered template {} with {} field(s)",
            template.id,
            template.fields.len()
        );
        Ok(Registration { template, warnings })
    }

    async fn update(&self, id: &str, update: TemplateUpdate) -> Result<Template> {
        let mut template = self.get(id).await?;

        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::FieldValidation(
                    "template name must not be empty".to_string(),
                ));
            }
            template.name = name.to_string();
        }
        if let Some(description) = update.description {
            template.description = Some(description);
        }
        if let Some(fields) = update.fields {
            let given: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
            if given != template.field_names() {
                return Err(Error::FieldValidation(format!(
                    "field names must be exactly {:?}",
                    template.field_names()
                )));
            }
            template.fields = fields;
        }

        template.updated_at = Utc::now();
        self.write_meta(&template).await?;
        Ok(template)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let template = self.get(id).await?;
        tokio::fs::remove_file(self.meta_path(&template.id)).await?;
        Self::remove_quietly(&template.file_path).await;
        log::info!("deleted template {}", template.id);
        Ok(())
    }

    async fn read_bytes(&self, id: &str) -> Result<Vec<u8>> {
        let template = self.get(id).await?;
        Ok(tokio::fs::read(&template.file_path).await?)
    }
}
