//! Diagram XML embedded in PNG text chunks.
//!
//! Editors store the diagram source of an exported PNG in a `tEXt` (or
//! compressed `zTXt`) chunk keyed `mxfile`, percent-encoded. Reading a PNG
//! back as a diagram only needs that chunk; producing a PNG needs a renderer,
//! which is injected through [`PngExporter`].

use std::io::Cursor;

use ::png::{Decoder, Encoder, Info, Transformations};

use crate::error::CodecError;

/// The eight-byte PNG signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Text chunk keywords that carry diagram source.
const DIAGRAM_KEYWORDS: &[&str] = &["mxfile", "mxGraphModel"];

/// Keyword used when embedding.
const EMBED_KEYWORD: &str = "mxfile";

// ============================================================================
// Exporter
// ============================================================================

/// Renders diagram XML into a PNG that embeds it.
pub trait PngExporter: Send + Sync {
    /// Returns the PNG bytes for `xml`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn export_png(&self, xml: &str) -> Result<Vec<u8>, CodecError>;
}

/// Exporter that embeds the diagram into a fixed preview image.
#[derive(Debug, Clone)]
pub struct EmbeddingExporter {
    preview: Vec<u8>,
}

impl EmbeddingExporter {
    /// Uses `preview` as the visible image.
    pub fn new(preview: Vec<u8>) -> Self {
        Self { preview }
    }
}

impl PngExporter for EmbeddingExporter {
    fn export_png(&self, xml: &str) -> Result<Vec<u8>, CodecError> {
        embed_diagram(&self.preview, xml)
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// A fully read PNG: header info with every text chunk, plus the raw frame.
struct DecodedPng {
    info: Info<'static>,
    frame: Vec<u8>,
}

fn png_error(e: impl std::fmt::Display) -> CodecError {
    CodecError::Png(e.to_string())
}

/// Reads the whole stream so text chunks after the image data are seen too.
fn read_png(bytes: &[u8]) -> Result<DecodedPng, CodecError> {
    if !bytes.starts_with(&PNG_SIGNATURE) {
        return Err(CodecError::Png("missing signature".to_string()));
    }

    let mut decoder = Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(Transformations::IDENTITY);
    let mut reader = decoder.read_info().map_err(png_error)?;

    let mut frame = vec![0; reader.output_buffer_size()];
    let output = reader.next_frame(&mut frame).map_err(png_error)?;
    frame.truncate(output.buffer_size());
    reader.finish().map_err(png_error)?;

    Ok(DecodedPng {
        info: reader.info().clone(),
        frame,
    })
}

fn is_diagram_keyword(keyword: &str) -> bool {
    DIAGRAM_KEYWORDS.contains(&keyword)
}

fn unescape(text: &str) -> String {
    urlencoding::decode(text).map_or_else(|_| text.to_string(), |s| s.into_owned())
}

/// Diagram text from the `tEXt` chunks, then the `zTXt` chunks.
fn diagram_text(info: &Info<'_>) -> Result<Option<String>, CodecError> {
    let plain = info
        .uncompressed_latin1_text
        .iter()
        .filter(|chunk| is_diagram_keyword(&chunk.keyword))
        .map(|chunk| unescape(&chunk.text))
        .find(|xml| !xml.is_empty());
    if plain.is_some() {
        return Ok(plain);
    }

    for chunk in &info.compressed_latin1_text {
        if !is_diagram_keyword(&chunk.keyword) {
            continue;
        }
        let xml = unescape(&chunk.get_text().map_err(png_error)?);
        if !xml.is_empty() {
            return Ok(Some(xml));
        }
    }
    Ok(None)
}

// ============================================================================
// Extraction / Embedding
// ============================================================================

/// Returns the diagram XML embedded in `png`, if any.
///
/// # Errors
///
/// Returns an error if the stream is not a readable PNG or a compressed
/// chunk is corrupt.
pub fn extract_diagram(png: &[u8]) -> Result<Option<String>, CodecError> {
    diagram_text(&read_png(png)?.info)
}

/// Returns a copy of `png` carrying `xml` in an `mxfile` text chunk.
///
/// The image is re-encoded with the same geometry and color format. Existing
/// diagram chunks are dropped; other `tEXt` chunks are kept.
///
/// # Errors
///
/// Returns an error if `png` cannot be read or the copy cannot be written.
pub fn embed_diagram(png: &[u8], xml: &str) -> Result<Vec<u8>, CodecError> {
    let DecodedPng { info, frame } = read_png(png)?;

    let mut out = Vec::with_capacity(png.len() + xml.len());
    {
        let mut encoder = Encoder::new(&mut out, info.width, info.height);
        encoder.set_color(info.color_type);
        encoder.set_depth(info.bit_depth);
        if let Some(palette) = &info.palette {
            encoder.set_palette(palette.to_vec());
        }
        if let Some(trns) = &info.trns {
            encoder.set_trns(trns.to_vec());
        }

        for chunk in &info.uncompressed_latin1_text {
            if !is_diagram_keyword(&chunk.keyword) {
                encoder
                    .add_text_chunk(chunk.keyword.clone(), chunk.text.clone())
                    .map_err(png_error)?;
            }
        }
        encoder
            .add_text_chunk(EMBED_KEYWORD.to_string(), urlencoding::encode(xml).into_owned())
            .map_err(png_error)?;

        let mut writer = encoder.write_header().map_err(png_error)?;
        writer.write_image_data(&frame).map_err(png_error)?;
        writer.finish().map_err(png_error)?;
    }

    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ::png::{BitDepth, ColorType};

    /// Encodes a 1x1 RGBA image, optionally with extra chunks.
    fn encode_png(add_chunks: impl FnOnce(&mut Encoder<'_, &mut Vec<u8>>)) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut encoder = Encoder::new(&mut out, 1, 1);
            encoder.set_color(ColorType::Rgba);
            encoder.set_depth(BitDepth::Eight);
            add_chunks(&mut encoder);
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(&[255, 0, 0, 255]).unwrap();
            writer.finish().unwrap();
        }
        out
    }

    /// A 1x1 red PNG without text chunks.
    pub(crate) fn tiny_png() -> Vec<u8> {
        encode_png(|_| {})
    }

    #[test]
    fn test_plain_png_has_no_diagram() {
        assert_eq!(extract_diagram(&tiny_png()).unwrap(), None);
    }

    #[test]
    fn test_embed_then_extract() {
        let xml = r#"<mxfile><diagram name="Page 1">a &amp; b</diagram></mxfile>"#;
        let png = embed_diagram(&tiny_png(), xml).unwrap();

        assert_eq!(extract_diagram(&png).unwrap().as_deref(), Some(xml));
        assert_eq!(read_png(&png).unwrap().frame, vec![255, 0, 0, 255]);

        // Re-embedding replaces the previous chunk.
        let again = embed_diagram(&png, "<mxfile/>").unwrap();
        let info = read_png(&again).unwrap().info;
        assert_eq!(info.uncompressed_latin1_text.len(), 1);
        assert_eq!(extract_diagram(&again).unwrap().as_deref(), Some("<mxfile/>"));
    }

    #[test]
    fn test_embed_keeps_other_text() {
        let png = encode_png(|e| {
            e.add_text_chunk("Software".to_string(), "draw".to_string()).unwrap();
        });
        let embedded = embed_diagram(&png, "<mxfile/>").unwrap();

        let info = read_png(&embedded).unwrap().info;
        assert!(info
            .uncompressed_latin1_text
            .iter()
            .any(|c| c.keyword == "Software" && c.text == "draw"));
    }

    #[test]
    fn test_compressed_chunk() {
        let png = encode_png(|e| {
            e.add_ztxt_chunk("mxGraphModel".to_string(), "%3CmxGraphModel%2F%3E".to_string())
                .unwrap();
        });

        assert_eq!(extract_diagram(&png).unwrap().as_deref(), Some("<mxGraphModel/>"));
    }

    #[test]
    fn test_ignores_unrelated_keywords() {
        let png = encode_png(|e| {
            e.add_text_chunk("Comment".to_string(), "%3Cmxfile%2F%3E".to_string()).unwrap();
        });
        assert_eq!(extract_diagram(&png).unwrap(), None);
    }

    #[test]
    fn test_rejects_non_png() {
        assert!(extract_diagram(b"GIF89a").is_err());

        let mut truncated = tiny_png();
        truncated.truncate(20);
        assert!(extract_diagram(&truncated).is_err());
    }
}
