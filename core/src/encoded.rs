//! Self-describing image payloads passed from acquisition to analysis.

use std::fmt;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::errors::ImageError;

const BASE64_MARKER: &str = ";base64,";

/// An image carried as a `data:<media-type>;base64,<payload>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    uri: String,
    // Offset of the payload inside `uri`
    payload_start: usize,
}

impl EncodedImage {
    /// Encode raw bytes under the given media type.
    pub fn from_bytes(media_type: &str, bytes: &[u8]) -> Result<Self, ImageError> {
        check_media_type(media_type)?;
        let uri = format!("data:{}{}{}", media_type, BASE64_MARKER, STANDARD.encode(bytes));
        Self::parse(uri)
    }

    /// Validate an existing data URI.
    pub fn parse(uri: impl Into<String>) -> Result<Self, ImageError> {
        let uri = uri.into();
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| ImageError::NotDataUri(preview(&uri)))?;
        let marker = rest
            .find(BASE64_MARKER)
            .ok_or_else(|| ImageError::NotDataUri(preview(&uri)))?;
        check_media_type(&rest[..marker])?;

        let payload_start = "data:".len() + marker + BASE64_MARKER.len();
        STANDARD.decode(&uri[payload_start..])?;

        Ok(Self { uri, payload_start })
    }

    /// Read an image file fully into memory and encode it.
    pub async fn from_file(path: &Path) -> Result<Self, ImageError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ImageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let media_type = sniff_media_type(path, &bytes)?;
        Self::from_bytes(media_type, &bytes)
    }

    pub fn media_type(&self) -> &str {
        &self.uri["data:".len()..self.payload_start - BASE64_MARKER.len()]
    }

    /// The raw base64 payload, without the scheme and type prefix.
    pub fn payload(&self) -> &str {
        &self.uri[self.payload_start..]
    }

    pub fn split(&self) -> (&str, &str) {
        (self.media_type(), self.payload())
    }

    pub fn as_data_uri(&self) -> &str {
        &self.uri
    }

    pub fn decode(&self) -> Result<Vec<u8>, ImageError> {
        Ok(STANDARD.decode(self.payload())?)
    }
}

impl fmt::Display for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

/// Work out the media type of an image file, or reject it.
pub fn sniff_media_type(path: &Path, bytes: &[u8]) -> Result<&'static str, ImageError> {
    let format = image::guess_format(bytes)
        .ok()
        .or_else(|| image::ImageFormat::from_path(path).ok())
        .ok_or_else(|| ImageError::NotAnImage(path.to_path_buf()))?;
    Ok(format.to_mime_type())
}

fn check_media_type(media_type: &str) -> Result<(), ImageError> {
    match media_type.strip_prefix("image/") {
        Some(subtype) if !subtype.is_empty() => Ok(()),
        _ => Err(ImageError::UnsupportedMediaType(media_type.to_string())),
    }
}

fn preview(uri: &str) -> String {
    uri.chars().take(32).collect()
}
