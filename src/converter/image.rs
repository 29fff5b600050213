//! Image extractor - turns embedded pictures into inline `<img>` tags.

use crate::{error::Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rs_docx::document::{Drawing, Pict};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// What a drawing or VML picture turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum Picture {
    /// Rendered `<img>` element.
    Html(String),
    /// A picture exists but images are being skipped.
    Skipped,
    /// The picture's media part could not be found.
    Missing(String),
    /// No embedded picture: a shape, chart or other vector content.
    NotAPicture,
}

/// Extractor for images embedded in DOCX.
pub struct ImageExtractor {
    mode: ImageMode,
}

enum ImageMode {
    Inline(PathBuf),
    Skip,
}

impl ImageExtractor {
    /// Creates an extractor that embeds images as base64 data URIs.
    pub fn new_inline<P: AsRef<Path>>(docx_path: P) -> Self {
        Self {
            mode: ImageMode::Inline(docx_path.as_ref().to_path_buf()),
        }
    }

    /// Creates an extractor that skips all images.
    pub fn new_skip() -> Self {
        Self {
            mode: ImageMode::Skip,
        }
    }

    pub fn extract_from_drawing(
        &mut self,
        drawing: &Drawing,
        rels: &HashMap<String, String>,
    ) -> Result<Picture> {
        match Self::find_blip_id(drawing) {
            Some(rel_id) => self.process(&rel_id, rels),
            None => Ok(Picture::NotAPicture),
        }
    }

    /// Extracts image from a Pict element (VML).
    pub fn extract_from_pict(
        &mut self,
        pict: &Pict,
        rels: &HashMap<String, String>,
    ) -> Result<Picture> {
        match Self::find_pict_blip_id(pict) {
            Some(rel_id) => self.process(&rel_id, rels),
            None => Ok(Picture::NotAPicture),
        }
    }

    fn find_blip_id(drawing: &Drawing) -> Option<String> {
        // Inline first (most common), then anchored (floating) pictures
        let graphics = [
            drawing.inline.as_ref().and_then(|i| i.graphic.as_ref()),
            drawing.anchor.as_ref().and_then(|a| a.graphic.as_ref()),
        ];

        graphics
            .into_iter()
            .flatten()
            .filter_map(|graphic| graphic.data.children.first())
            .map(|pic| pic.fill.blip.embed.to_string())
            .find(|embed| !embed.is_empty())
    }

    fn find_pict_blip_id(pict: &Pict) -> Option<String> {
        let shape_image = pict
            .shape
            .as_ref()
            .and_then(|shape| shape.image_data.as_ref())
            .and_then(|img| img.id.as_ref());
        let rect_image = pict
            .rect
            .as_ref()
            .and_then(|rect| rect.image_data.as_ref())
            .and_then(|img| img.id.as_ref());

        shape_image.or(rect_image).map(|id| id.to_string())
    }

    fn process(&mut self, rel_id: &str, rels: &HashMap<String, String>) -> Result<Picture> {
        let ImageMode::Inline(docx_path) = &self.mode else {
            return Ok(Picture::Skipped);
        };
        let Some(image_path) = rels.get(rel_id) else {
            return Ok(Picture::Missing(rel_id.to_string()));
        };

        let Some(image_data) = Self::read_media(docx_path, image_path)? else {
            return Ok(Picture::Missing(image_path.clone()));
        };

        let ext = Path::new(image_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png");
        let mime_type = match ext.to_lowercase().as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "bmp" => "image/bmp",
            "svg" => "image/svg+xml",
            _ => "application/octet-stream",
        };

        Ok(Picture::Html(format!(
            "<img src=\"data:{};base64,{}\" alt=\"image\" />",
            mime_type,
            BASE64.encode(&image_data)
        )))
    }

    /// Reads a media part; relationship targets are relative to `word/`.
    fn read_media(docx_path: &Path, image_path: &str) -> Result<Option<Vec<u8>>> {
        let file = File::open(docx_path)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| Error::MalformedArchive(format!("failed to open DOCX as ZIP: {}", e)))?;

        let trimmed = image_path.trim_start_matches('/');
        let full_path = if trimmed.starts_with("word/") {
            trimmed.to_string()
        } else {
            format!("word/{}", trimmed)
        };

        for path in [full_path.as_str(), trimmed] {
            if let Ok(mut entry) = archive.by_name(path) {
                let mut data = Vec::new();
                entry.read_to_end(&mut data)?;
                return Ok(Some(data));
            }
        }

        Ok(None)
    }
}
