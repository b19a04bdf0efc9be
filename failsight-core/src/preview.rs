//! First rows of an arbitrary uploaded delimited file.
//!
//! Independent of the loaded context: nothing here reads or changes the
//! narratives or the sensor table.

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::encoding::decode_with_fallback;
use crate::error::{FailsightError, Result, SourceKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePreview {
    /// Name of the encoding that decoded the upload.
    pub encoding: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// More records followed the ones shown.
    pub truncated: bool,
}

/// Decode `bytes` (UTF-8, then `fallback`) and return the header plus up to `rows` records.
///
/// Ragged rows are shown as-is. The delimiter is `,`.
pub fn preview_delimited(bytes: &[u8], rows: usize, fallback: &'static Encoding) -> Result<TablePreview> {
    let decoded = decode_with_fallback(bytes, fallback)?;
    if decoded.used_fallback() {
        tracing::info!("Upload preview decoded as {}", decoded.encoding.name());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(decoded.text.as_bytes());
    let upload_err = |e: csv::Error| FailsightError::format(SourceKind::Upload, "upload", e);

    let headers = reader
        .headers()
        .map_err(upload_err)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut records = reader.records();
    let mut shown = Vec::with_capacity(rows);
    for record in records.by_ref().take(rows) {
        let record = record.map_err(upload_err)?;
        shown.push(record.iter().map(str::to_string).collect());
    }
    let truncated = records.next().is_some();

    Ok(TablePreview {
        encoding: decoded.encoding.name().to_string(),
        headers,
        rows: shown,
        truncated,
    })
}
