//! Document text extraction.
//!
//! The indexer only needs "path in, text out"; [`Extractor`] is that seam.
//! [`FileExtractor`] picks a decoder from the file extension:
//!
//! | Extension | Decoder |
//! |-----------|---------|
//! | `.pdf` | `pdf-extract`, all pages concatenated |
//! | `.docx` | `word/document.xml` runs, one line per paragraph |
//! | `.txt`, `.md` | UTF-8 text as-is |

use std::io::Read;
use std::path::Path;

use crate::error::{RagError, Result};

/// Maximum decompressed bytes read from `word/document.xml` (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Turns a document on disk into its full text content.
pub trait Extractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" | "md" => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// Extension-dispatching extractor for local files.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileExtractor;

impl Extractor for FileExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let kind = DocumentKind::from_path(path).ok_or_else(|| {
            RagError::Extraction(format!(
                "unsupported document type: {} (expected .pdf, .docx, .txt or .md)",
                path.display()
            ))
        })?;
        let bytes = std::fs::read(path).map_err(|e| {
            RagError::Extraction(format!("failed to read {}: {}", path.display(), e))
        })?;
        log::info!("extracting text from {} ({:?})", path.display(), kind);
        let text = extract_bytes(&bytes, kind)?;
        log::debug!("extracted {} chars", text.chars().count());
        Ok(text)
    }
}

/// Decode in-memory document bytes of a known kind.
pub fn extract_bytes(bytes: &[u8], kind: DocumentKind) -> Result<String> {
    match kind {
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| RagError::Extraction(format!("PDF extraction failed: {}", e))),
        DocumentKind::Docx => extract_docx(bytes),
        DocumentKind::PlainText => String::from_utf8(bytes.to_vec())
            .map_err(|e| RagError::Extraction(format!("text is not valid UTF-8: {}", e))),
    }
}

fn docx_error(e: impl std::fmt::Display) -> RagError {
    RagError::Extraction(format!("DOCX extraction failed: {}", e))
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(docx_error)?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| docx_error("word/document.xml not found"))?;
    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(docx_error)?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(docx_error("word/document.xml exceeds size limit"));
    }
    docx_paragraphs(&xml)
}

/// Collect `<w:t>` text, ending each `<w:p>` paragraph with a newline.
fn docx_paragraphs(xml: &[u8]) -> Result<String> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf).map_err(docx_error)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(docx_error)?;
                out.push_str(&text);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim_end_matches('\n').to_string())
}
