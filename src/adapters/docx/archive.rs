//! ZIP-level access to a DOCX package.

use crate::{error::Error, Result};
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Path of the main document part inside the package.
pub const MAIN_DOCUMENT: &str = "word/document.xml";

/// ZIP local-file-header signature every DOCX starts with.
const ZIP_MAGIC: &[u8] = b"PK";

/// Largest decompressed size accepted for a single XML part.
const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;

/// Declared entry sizes are untrusted; preallocate at most this much.
const MAX_PREALLOC: u64 = 1024 * 1024;

/// A DOCX package opened from memory.
pub struct DocxPackage<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> DocxPackage<'a> {
    /// Opens a package, rejecting anything that is not a ZIP archive.
    pub fn open(bytes: &'a [u8]) -> Result<Self> {
        if !bytes.starts_with(ZIP_MAGIC) {
            return Err(Error::MalformedArchive(
                "missing ZIP signature".to_string(),
            ));
        }
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::MalformedArchive(format!("failed to open ZIP: {}", e)))?;
        Ok(Self { archive })
    }

    /// Names of all entries, in archive order.
    pub fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_owned).collect()
    }

    /// Reads a part as UTF-8 text, `None` when the part does not exist.
    pub fn read_part(&mut self, name: &str) -> Result<Option<String>> {
        let entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(Error::MalformedArchive(format!("{}: {}", name, e))),
        };
        let declared = entry.size();
        read_text(entry, name, declared, MAX_PART_BYTES).map(Some)
    }

    /// Reads `word/document.xml`, which every DOCX must have.
    pub fn main_document(&mut self) -> Result<String> {
        self.read_part(MAIN_DOCUMENT)?
            .ok_or_else(|| Error::MalformedArchive(format!("missing {}", MAIN_DOCUMENT)))
    }

    /// Writes a new package where every part accepted by `select` is passed
    /// through `edit`. Other entries are copied without recompression.
    pub fn rewrite<S, E>(mut self, select: S, mut edit: E) -> Result<Vec<u8>>
    where
        S: Fn(&str) -> bool,
        E: FnMut(&str, String) -> Result<String>,
    {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for index in 0..self.archive.len() {
            let (name, method) = {
                let entry = self.archive.by_index_raw(index)?;
                (entry.name().to_string(), entry.compression())
            };

            if !select(&name) {
                let entry = self.archive.by_index_raw(index)?;
                writer.raw_copy_file(entry)?;
                continue;
            }

            let entry = self.archive.by_index(index)?;
            let declared = entry.size();
            let xml = read_text(entry, &name, declared, MAX_PART_BYTES)?;
            let edited = edit(&name, xml)?;

            writer.start_file(
                name.as_str(),
                SimpleFileOptions::default().compression_method(method),
            )?;
            writer.write_all(edited.as_bytes())?;
        }

        Ok(writer.finish()?.into_inner())
    }
}

/// Reads at most `limit` decompressed bytes of a part as UTF-8.
fn read_text(reader: impl Read, name: &str, declared: u64, limit: u64) -> Result<String> {
    let mut bytes = Vec::with_capacity(declared.min(limit).min(MAX_PREALLOC) as usize);
    reader
        .take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|e| Error::MalformedArchive(format!("{}: {}", name, e)))?;
    if bytes.len() as u64 > limit {
        return Err(Error::MalformedArchive(format!(
            "{} exceeds {} bytes when decompressed",
            name, limit
        )));
    }
    String::from_utf8(bytes)
        .map_err(|_| Error::MalformedArchive(format!("{} is not valid UTF-8", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::docx_with_parts;

    #[test]
    fn test_rejects_bytes_without_zip_signature() {
        let result = DocxPackage::open(b"%PDF-1.7 not a docx");
        assert!(matches!(result, Err(Error::MalformedArchive(_))));
    }

    #[test]
    fn test_rejects_truncated_zip() {
        let result = DocxPackage::open(b"PK\x03\x04garbage");
        assert!(matches!(result, Err(Error::MalformedArchive(_))));
    }

    #[test]
    fn test_part_size_is_capped_regardless_of_declared_size() {
        let text = read_text(Cursor::new(b"<w:t/>".to_vec()), MAIN_DOCUMENT, u64::MAX, 6).unwrap();
        assert_eq!(text, "<w:t/>");

        let oversized = read_text(Cursor::new(vec![b'a'; 64]), MAIN_DOCUMENT, 0, 16);
        assert!(matches!(
            oversized,
            Err(Error::MalformedArchive(msg)) if msg.contains("exceeds 16 bytes")
        ));
    }

    #[test]
    fn test_missing_main_document_is_malformed() {
        let bytes = docx_with_parts(&[("word/styles.xml", "<w:styles/>")]);
        let mut package = DocxPackage::open(&bytes).expect("zip should open");
        assert!(matches!(
            package.main_document(),
            Err(Error::MalformedArchive(msg)) if msg.contains(MAIN_DOCUMENT)
        ));
    }

    #[test]
    fn test_rewrite_only_touches_selected_parts() {
        let bytes = docx_with_parts(&[
            (MAIN_DOCUMENT, "<w:document>old</w:document>"),
            ("word/styles.xml", "<w:styles/>"),
        ]);
        let package = DocxPackage::open(&bytes).expect("zip should open");
        let out = package
            .rewrite(
                |name| name == MAIN_DOCUMENT,
                |_, xml| Ok(xml.replace("old", "new")),
            )
            .expect("rewrite should work");

        assert!(out.starts_with(b"PK"));
        let mut reopened = DocxPackage::open(&out).expect("output should open");
        assert_eq!(
            reopened.main_document().unwrap(),
            "<w:document>new</w:document>"
        );
        assert_eq!(
            reopened.read_part("word/styles.xml").unwrap().as_deref(),
            Some("<w:styles/>")
        );
        assert_eq!(reopened.part_names().len(), 2);
    }
}
