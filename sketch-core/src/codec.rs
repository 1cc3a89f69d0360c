//! Raster encoding and decoding.
//!
//! Supports raw image bytes and base64 `data:` URIs, the format drawings
//! travel in between the surface and the transformation pipeline.

use std::io::Cursor;

use base64::Engine;
use image::RgbaImage;

use crate::error::{SketchError, SketchResult};

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }
        Self::Unknown
    }

    /// MIME type for this format.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Unknown => "application/octet-stream",
        }
    }
}

/// A parsed base64 data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// Declared MIME type (`image/png` if absent).
    pub mime: String,
    /// Decoded payload.
    pub bytes: Vec<u8>,
}

/// Parse a `data:<mime>;base64,<payload>` URI.
///
/// # Errors
///
/// Returns [`SketchError::InvalidDataUri`] if the URI is malformed, is not
/// base64 encoded, or carries an empty payload.
pub fn parse_data_uri(uri: &str) -> SketchResult<DataUri> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| SketchError::InvalidDataUri("not a data URI".to_string()))?;

    let (metadata, encoded) = rest
        .split_once(',')
        .ok_or_else(|| SketchError::InvalidDataUri("missing comma".to_string()))?;

    let mut parts = metadata.split(';');
    let mime = match parts.next() {
        Some(m) if !m.is_empty() => m.to_string(),
        _ => "image/png".to_string(),
    };
    if !parts.any(|p| p == "base64") {
        return Err(SketchError::InvalidDataUri(
            "only base64 data URIs are supported".to_string(),
        ));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| SketchError::InvalidDataUri(format!("bad base64 payload: {e}")))?;
    if bytes.is_empty() {
        return Err(SketchError::InvalidDataUri("empty payload".to_string()));
    }

    Ok(DataUri { mime, bytes })
}

/// Build a data URI from raw bytes and a MIME type.
#[must_use]
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{encoded}")
}

/// Build a PNG data URI from encoded PNG bytes.
#[must_use]
pub fn png_data_uri(png: &[u8]) -> String {
    data_uri(ImageFormat::Png.mime(), png)
}

/// Decode image bytes of any supported format into RGBA.
///
/// # Errors
///
/// Returns [`SketchError::Decode`] if the bytes are not a decodable image.
pub fn decode_image(bytes: &[u8]) -> SketchResult<RgbaImage> {
    let img = image::load_from_memory(bytes).map_err(|e| SketchError::Decode(e.to_string()))?;
    Ok(img.to_rgba8())
}

/// Decode the image carried by a data URI.
///
/// # Errors
///
/// Returns an error if the URI is malformed or its payload does not decode.
pub fn decode_data_uri_image(uri: &str) -> SketchResult<RgbaImage> {
    let parsed = parse_data_uri(uri)?;
    decode_image(&parsed.bytes)
}

/// Encode an RGBA raster as PNG.
///
/// # Errors
///
/// Returns [`SketchError::Encode`] if encoding fails.
pub fn encode_png(image: &RgbaImage) -> SketchResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| SketchError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Re-encode any supported image payload as PNG.
///
/// PNG input is returned unchanged.
///
/// # Errors
///
/// Returns an error if the payload cannot be decoded or encoded.
pub fn normalize_to_png(bytes: &[u8]) -> SketchResult<Vec<u8>> {
    if ImageFormat::from_magic_bytes(bytes) == ImageFormat::Png {
        decode_image(bytes)?;
        return Ok(bytes.to_vec());
    }
    encode_png(&decode_image(bytes)?)
}
