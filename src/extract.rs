//! Best-effort text extraction for uploaded files.
//!
//! Collaborator boundary for the ingestion pipeline: given file bytes and a
//! filename, return plain UTF-8 text. Extraction failures are non-fatal to
//! ingestion; the caller logs and skips the file's content.
//!
//! Plain-text extensions are read directly (lossy UTF-8); PDF goes through
//! `pdf-extract`; DOCX is unzipped and its `w:t` runs concatenated.

use std::io::Read;

/// File extensions whose content can be turned into text.
const TEXT_EXTENSIONS: [&str; 5] = ["txt", "md", "markdown", "csv", "tsv"];

/// Maximum decompressed bytes read from a DOCX ZIP entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

/// True when the filename's extension is one the extractor understands.
pub fn is_text_extractable(filename: &str) -> bool {
    match extension_of(filename) {
        Some(ext) => TEXT_EXTENSIONS.contains(&ext.as_str()) || ext == "pdf" || ext == "docx",
        None => false,
    }
}

/// Extract plain text from the file bytes, dispatching on extension.
pub fn extract_text(bytes: &[u8], filename: &str) -> Result<String, ExtractError> {
    let ext = extension_of(filename)
        .ok_or_else(|| ExtractError::UnsupportedExtension(filename.to_string()))?;

    if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        return Ok(String::from_utf8_lossy(bytes).into_owned());
    }

    match ext.as_str() {
        "pdf" => extract_pdf(bytes),
        "docx" => extract_docx(bytes),
        other => Err(ExtractError::UnsupportedExtension(other.to_string())),
    }
}

fn extension_of(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;

    let mut doc_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractError::Docx(e.to_string()))?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| ExtractError::Docx(e.to_string()))?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(ExtractError::Docx(
                "word/document.xml exceeds size limit".to_string(),
            ));
        }
    }

    extract_w_t_elements(&doc_xml)
}

/// Concatenate the text runs (`w:t`) of a DOCX body, one paragraph per line.
fn extract_w_t_elements(xml: &[u8]) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(ref e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = false;
                } else if e.local_name().as_ref() == b"p" {
                    out.push('\n');
                }
            }
            Ok(Event::Text(ref t)) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractError::Docx(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim().to_string())
}
