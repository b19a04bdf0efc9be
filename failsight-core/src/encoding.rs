//! UTF-8 first, one named alternate second.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};

use crate::error::{FailsightError, Result};

/// Text decoded from raw bytes, with the encoding that succeeded.
#[derive(Debug, Clone)]
pub struct Decoded<'a> {
    pub text: Cow<'a, str>,
    pub encoding: &'static Encoding,
}

impl Decoded<'_> {
    pub fn used_fallback(&self) -> bool {
        self.encoding != UTF_8
    }
}

/// Resolve a WHATWG encoding label such as `latin1`, `windows-1252` or `shift_jis`.
pub fn resolve_label(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
        FailsightError::Config(config::ConfigError::Message(format!(
            "unknown text encoding label '{}'",
            label
        )))
    })
}

/// Decode `bytes` as UTF-8 (leading BOM stripped), falling back to `fallback`.
///
/// Neither attempt substitutes replacement characters: malformed input in both
/// encodings is a `Decode` error.
pub fn decode_with_fallback<'a>(bytes: &'a [u8], fallback: &'static Encoding) -> Result<Decoded<'a>> {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(body) {
        return Ok(Decoded {
            text: Cow::Borrowed(text),
            encoding: UTF_8,
        });
    }

    tracing::warn!(
        "Input is not valid UTF-8, retrying as {}",
        fallback.name()
    );
    match fallback.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => Ok(Decoded {
            text,
            encoding: fallback,
        }),
        None => Err(FailsightError::Decode {
            encoding: fallback.name().to_string(),
        }),
    }
}
