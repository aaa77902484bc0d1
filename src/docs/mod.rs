pub mod docx;
pub mod ingest;
pub mod types;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::error::ReviewError;
use docx::DocxDocument;

/// File formats the reviewer can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Docx,
    Pdf,
    Text,
    Html,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "docx" => Some(Self::Docx),
            "pdf" => Some(Self::Pdf),
            "txt" | "md" => Some(Self::Text),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }

    /// Formats accepted as uploads for review.
    pub fn is_reviewable(self) -> bool {
        matches!(self, Self::Docx | Self::Pdf)
    }
}

/// An uploaded document, read once and only mutated through annotation.
pub struct UploadedDocument {
    pub path: PathBuf,
    pub raw_text: String,
    pub paragraphs: Vec<String>,
    /// Present for formats that can carry inline annotations.
    pub editable: Option<DocxDocument>,
}

impl UploadedDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let format = DocumentFormat::from_path(path)
            .filter(|f| f.is_reviewable())
            .ok_or_else(|| ReviewError::UnsupportedFileType(path.to_path_buf()))?;

        match format {
            DocumentFormat::Docx => {
                let doc = DocxDocument::open(path)?;
                Ok(Self {
                    path: path.to_path_buf(),
                    raw_text: doc.text(),
                    paragraphs: doc.paragraph_texts(),
                    editable: Some(doc),
                })
            }
            _ => {
                let raw_text = read_text(path, format)?;
                let paragraphs = raw_text
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();
                Ok(Self {
                    path: path.to_path_buf(),
                    raw_text,
                    paragraphs,
                    editable: None,
                })
            }
        }
    }
}

/// Plain text of any readable format.
pub fn read_text(path: &Path, format: DocumentFormat) -> Result<String> {
    let text = match format {
        DocumentFormat::Docx => DocxDocument::open(path)?.text(),
        DocumentFormat::Pdf => {
            let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            pdf_extract::extract_text_from_mem(&bytes)
                .with_context(|| format!("Failed to extract text from {}", path.display()))?
        }
        DocumentFormat::Text => {
            let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            String::from_utf8_lossy(&bytes).to_string()
        }
        DocumentFormat::Html => {
            let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            html2text::from_read(&bytes[..], 120)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).to_string())
        }
    };
    debug!(path = %path.display(), chars = text.len(), ?format, "text extracted");
    Ok(text)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("a/B.DOCX")), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_path(Path::new("x.pdf")), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_path(Path::new("notes.md")), Some(DocumentFormat::Text));
        assert_eq!(DocumentFormat::from_path(Path::new("page.htm")), Some(DocumentFormat::Html));
        assert_eq!(DocumentFormat::from_path(Path::new("sheet.xlsx")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_upload_rejects_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Articles of Association").unwrap();
        let err = UploadedDocument::load(&path).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ReviewError>(),
            Some(ReviewError::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn test_upload_docx_is_editable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moa.docx");
        docx::test_support::write_docx(&path, &["MEMORANDUM OF ASSOCIATION", "Clause 1"]);
        let doc = UploadedDocument::load(&path).unwrap();
        assert_eq!(doc.raw_text, "MEMORANDUM OF ASSOCIATION\nClause 1");
        assert_eq!(doc.paragraphs.len(), 2);
        assert!(doc.editable.is_some());
    }

    #[test]
    fn test_read_text_lossy_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.txt");
        std::fs::write(&path, b"Companies Regulations \xff 2020").unwrap();
        let text = read_text(&path, DocumentFormat::Text).unwrap();
        assert!(text.starts_with("Companies Regulations"));
        assert!(text.ends_with("2020"));
    }

    #[test]
    fn test_upload_pdf_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ubo.pdf");
        test_support::write_pdf(&path, &["UBO Declaration Form", "Beneficial owner: Jane Doe"]);

        let doc = UploadedDocument::load(&path).unwrap();
        assert!(doc.editable.is_none());
        assert!(doc.raw_text.contains("UBO Declaration"));
        assert!(!doc.paragraphs.is_empty());
        assert!(doc.paragraphs.iter().all(|p| !p.is_empty() && p.trim() == p));
    }

    #[test]
    fn test_read_text_html_reference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guidance.html");
        std::fs::write(
            &path,
            "<html><body><h1>Registered Office</h1><p>Every company must have an office in ADGM.</p></body></html>",
        )
        .unwrap();

        let text = read_text(&path, DocumentFormat::Html).unwrap();
        assert!(text.contains("Registered Office"));
        assert!(text.contains("Every company must have an office in ADGM."));
        assert!(!text.contains("<p>"));
    }
}
