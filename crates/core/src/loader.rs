//! Document loading.
//!
//! Reads a source file into page-level text blocks. PDF pages come from
//! lopdf; DOCX files are unpacked as OOXML and their `w:t` runs concatenated
//! into a single logical page. Any other extension is rejected up front.

use std::io::Read;
use std::path::Path;

use chrono::Utc;
use lopdf::Document;
use sha2::{Digest, Sha256};

use crate::error::IngestError;
use crate::models::DocumentFingerprint;

/// Text of one source page, 1-based numbering.
#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// Loads a document into page texts, dispatching on the file extension.
pub fn load_pages(path: &Path) -> Result<Vec<PageText>, IngestError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => load_pdf(path),
        "doc" | "docx" => load_docx(path),
        other => Err(IngestError::UnsupportedFormat(format!(
            "{other:?} ({})",
            path.display()
        ))),
    }
}

/// Computes the document fingerprint: sha256 over the raw file bytes.
pub fn fingerprint(path: &Path) -> Result<DocumentFingerprint, IngestError> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);

    Ok(DocumentFingerprint {
        source_path: path.to_string_lossy().to_string(),
        checksum: format!("{:x}", hasher.finalize()),
        ingested_at: Utc::now(),
    })
}

fn load_pdf(path: &Path) -> Result<Vec<PageText>, IngestError> {
    let document = Document::load(path).map_err(|error| IngestError::Load(error.to_string()))?;

    let mut pages = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        let text = document
            .extract_text(&[page_no])
            .map_err(|error| IngestError::Load(error.to_string()))?;

        if !text.trim().is_empty() {
            pages.push(PageText {
                number: page_no,
                text,
            });
        }
    }

    if pages.is_empty() {
        return Err(IngestError::Load(format!(
            "pdf had no readable page text: {}",
            path.display()
        )));
    }

    Ok(pages)
}

fn load_docx(path: &Path) -> Result<Vec<PageText>, IngestError> {
    let file = std::fs::File::open(path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|error| IngestError::Load(error.to_string()))?;

    let mut document_xml = Vec::new();
    archive
        .by_name("word/document.xml")
        .map_err(|error| IngestError::Load(format!("word/document.xml: {error}")))?
        .read_to_end(&mut document_xml)?;

    let text = extract_text_runs(&document_xml)?;
    if text.trim().is_empty() {
        return Err(IngestError::Load(format!(
            "docx had no readable text: {}",
            path.display()
        )));
    }

    // Word documents have no fixed pagination; treat the body as one page.
    Ok(vec![PageText { number: 1, text }])
}

/// Collects `w:t` text runs, inserting paragraph breaks at `w:p` boundaries so
/// the chunker still sees paragraph structure.
fn extract_text_runs(xml: &[u8]) -> Result<String, IngestError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut out = String::new();
    let mut in_text_run = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(element)) => {
                if element.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            Ok(quick_xml::events::Event::Text(text)) if in_text_run => {
                out.push_str(
                    text.unescape()
                        .map_err(|error| IngestError::Load(error.to_string()))?
                        .as_ref(),
                );
            }
            Ok(quick_xml::events::Event::End(element)) => {
                match element.local_name().as_ref() {
                    b"t" => in_text_run = false,
                    b"p" => out.push_str("\n\n"),
                    _ => {}
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Ok(_) => {}
            Err(error) => return Err(IngestError::Load(error.to_string())),
        }
        buf.clear();
    }

    Ok(out)
}
