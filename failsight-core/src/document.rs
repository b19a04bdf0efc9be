//! Paragraph-structured documents.
//!
//! Word documents are read from the `word/document.xml` part of the archive.
//! Only body-level paragraphs count, so text inside tables, headers and text
//! boxes never produces a paragraph. Anything that is not a ZIP archive is
//! treated as plain text with one paragraph per line.

use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use crate::encoding::{decode_with_fallback, resolve_label};
use crate::error::{FailsightError, Result, SourceKind};
use crate::fingerprint::SourceFingerprint;

const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";
const DOCUMENT_PART: &str = "word/document.xml";
const PLAIN_TEXT_FALLBACK: &str = "latin1";

#[derive(Debug, Clone)]
pub struct Document {
    paragraphs: Vec<String>,
    fingerprint: SourceFingerprint,
}

impl Document {
    /// Read and parse a document from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            tracing::debug!("Reading {} failed: {}", path.display(), e);
            FailsightError::SourceNotFound {
                kind: SourceKind::Document,
                path: path.to_path_buf(),
            }
        })?;
        let document = Self::from_bytes(&bytes, path)?;
        tracing::info!(
            "Loaded document {} ({} paragraphs)",
            path.display(),
            document.len()
        );
        Ok(document)
    }

    /// Parse an in-memory document; `origin` is only used in errors.
    pub fn from_bytes(bytes: &[u8], origin: &Path) -> Result<Self> {
        let paragraphs = if bytes.starts_with(ZIP_SIGNATURE) {
            docx_paragraphs(bytes, origin)?
        } else {
            text_paragraphs(bytes, origin)?
        };
        Ok(Self {
            paragraphs,
            fingerprint: SourceFingerprint::of(origin, bytes),
        })
    }

    /// Paragraphs in document order, untrimmed.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> + '_ {
        self.paragraphs.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    pub fn fingerprint(&self) -> &SourceFingerprint {
        &self.fingerprint
    }
}

fn text_paragraphs(bytes: &[u8], origin: &Path) -> Result<Vec<String>> {
    let decoded = decode_with_fallback(bytes, resolve_label(PLAIN_TEXT_FALLBACK)?).map_err(|e| {
        FailsightError::format(SourceKind::Document, origin, e)
    })?;
    Ok(decoded.text.lines().map(str::to_string).collect())
}

fn docx_paragraphs(bytes: &[u8], origin: &Path) -> Result<Vec<String>> {
    let format_err = |reason: String| FailsightError::format(SourceKind::Document, origin, reason);

    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| format_err(format!("bad archive: {}", e)))?;
    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| format_err(format!("{}: {}", DOCUMENT_PART, e)))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| format_err(format!("{}: {}", DOCUMENT_PART, e)))?;

    parse_body_paragraphs(&xml).map_err(format_err)
}

/// Collect the text of every `w:p` that is a direct child of `w:body`.
pub(crate) fn parse_body_paragraphs(xml: &str) -> std::result::Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    // nested w:p inside a body paragraph (text boxes) stays out of the parent's text
    let mut nested_depth = 0usize;
    let mut in_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("XML error at byte {}: {}", reader.buffer_position(), e))?;
        match event {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                match name.as_slice() {
                    b"w:p" if current.is_none() && parent_is_body(&stack) => {
                        current = Some(String::new());
                    }
                    b"w:p" if current.is_some() => nested_depth += 1,
                    b"w:t" => in_text = current.is_some() && nested_depth == 0,
                    _ => {}
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                let name = e.name();
                match name.as_ref() {
                    b"w:p" if current.is_none() && parent_is_body(&stack) => {
                        paragraphs.push(String::new());
                    }
                    b"w:tab" => push_text(&mut current, nested_depth, "\t"),
                    b"w:br" | b"w:cr" => push_text(&mut current, nested_depth, "\n"),
                    _ => {}
                }
            }
            Event::Text(t) => {
                if in_text {
                    let text = t.unescape().map_err(|e| format!("bad text: {}", e))?;
                    push_text(&mut current, nested_depth, &text);
                }
            }
            Event::CData(t) => {
                if in_text {
                    push_text(&mut current, nested_depth, &String::from_utf8_lossy(&t));
                }
            }
            Event::End(e) => {
                stack.pop();
                match e.name().as_ref() {
                    b"w:t" => in_text = false,
                    b"w:p" if nested_depth > 0 => nested_depth -= 1,
                    b"w:p" => {
                        if let Some(text) = current.take() {
                            paragraphs.push(text);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("unexpected end of document.xml".to_string());
    }
    if !xml.contains("<w:body") {
        return Err("document.xml has no w:body element".to_string());
    }
    Ok(paragraphs)
}

fn parent_is_body(stack: &[Vec<u8>]) -> bool {
    stack.last().map(|n| n.as_slice() == b"w:body").unwrap_or(false)
}

fn push_text(current: &mut Option<String>, nested_depth: usize, text: &str) {
    if nested_depth == 0 {
        if let Some(buf) = current.as_mut() {
            buf.push_str(text);
        }
    }
}
