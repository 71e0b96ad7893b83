//! File content codec.
//!
//! The files API returns content base64-encoded. [`decode`] turns it into what
//! the editor opens: images as data URIs, PNGs carrying a diagram as the
//! diagram XML, everything else as UTF-8 text. [`encode`] is the inverse used
//! for writes.

use std::sync::LazyLock;

use base64::prelude::*;
use regex::Regex;
use tracing::{debug, trace};

use crate::error::CodecError;
use crate::png;

/// Encoding name used by the files API.
pub const BASE64: &str = "base64";

/// `data:<mime>;base64,<payload>`
static DATA_URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:([A-Za-z0-9.+/-]+);base64,").expect("Invalid regex")
});

// ============================================================================
// File Kinds
// ============================================================================

/// How a file is represented by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.jpg` / `.jpeg`
    Jpeg,
    /// `.gif`
    Gif,
    /// `.png`, possibly carrying a diagram.
    Png,
    /// Anything else, treated as UTF-8 text.
    Text,
}

impl FileKind {
    /// Classifies a file name by extension, case-insensitively.
    pub fn from_name(name: &str) -> Self {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "gif" => Self::Gif,
            "png" => Self::Png,
            _ => Self::Text,
        }
    }

    /// MIME type for image kinds.
    pub fn mime(self) -> Option<&'static str> {
        match self {
            Self::Jpeg => Some("image/jpeg"),
            Self::Gif => Some("image/gif"),
            Self::Png => Some("image/png"),
            Self::Text => None,
        }
    }
}

// ============================================================================
// Data URIs
// ============================================================================

/// Wraps base64 `payload` into a data URI.
pub fn data_uri(mime: &str, payload: &str) -> String {
    format!("data:{mime};base64,{payload}")
}

/// Returns the base64 payload of a data URI.
pub fn data_uri_payload(content: &str) -> Option<&str> {
    DATA_URI_RE
        .find(content)
        .map(|prefix| &content[prefix.end()..])
}

/// Decodes base64, ignoring embedded line breaks and whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid base64.
pub fn decode_bytes(encoded: &str) -> Result<Vec<u8>, CodecError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(BASE64_STANDARD.decode(compact)?)
}

// ============================================================================
// Decode / Encode
// ============================================================================

/// Decodes file content as returned by the files API.
///
/// Content whose `encoding` is not base64 is returned unchanged.
///
/// # Errors
///
/// Returns an error if base64 text content is not valid base64 or UTF-8.
pub fn decode(name: &str, encoding: Option<&str>, content: &str) -> Result<String, CodecError> {
    if encoding != Some(BASE64) {
        trace!(name, "Content is not base64, passing through");
        return Ok(content.to_string());
    }

    let kind = FileKind::from_name(name);
    match kind {
        FileKind::Jpeg | FileKind::Gif => Ok(data_uri(kind.mime().unwrap_or_default(), content)),
        FileKind::Png => {
            let bytes = decode_bytes(content)?;
            match png::extract_diagram(&bytes) {
                Ok(Some(xml)) => {
                    debug!(name, "Found diagram embedded in PNG");
                    Ok(xml)
                }
                Ok(None) => Ok(data_uri("image/png", content)),
                Err(e) => {
                    debug!(name, error = %e, "Unreadable PNG, opening as image");
                    Ok(data_uri("image/png", content))
                }
            }
        }
        FileKind::Text => Ok(String::from_utf8(decode_bytes(content)?)?),
    }
}

/// Base64-encodes `content` for a write, unless it already is encoded.
pub fn encode(content: &str, already_encoded: bool) -> String {
    if already_encoded {
        content.to_string()
    } else {
        BASE64_STANDARD.encode(content)
    }
}

/// Base64-encodes raw bytes.
pub fn encode_bytes(bytes: &[u8]) -> String {
    BASE64_STANDARD.encode(bytes)
}

// ============================================================================
// Tests
// ============================================================================
