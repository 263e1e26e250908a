use std::fmt;
use std::io::Cursor;
use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose, Engine as _};

/// Largest file accepted by an upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DataUriError {
    #[error("missing data: URI scheme")]
    MissingScheme,
    #[error("data URI has no payload separator")]
    MissingPayload,
    #[error("data URI is not base64 encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    InvalidPayload(String),
}

/// Image bytes tagged with their MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    mime_type: String,
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl EncodedImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn base64_payload(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }

    #[cfg(test)]
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_payload())
    }

    pub fn from_data_uri(uri: &str) -> Result<Self, DataUriError> {
        let rest = uri
            .trim()
            .strip_prefix("data:")
            .ok_or(DataUriError::MissingScheme)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUriError::MissingPayload)?;

        let mut params = header.split(';');
        let mime_type = params.next().unwrap_or_default().trim();
        if !params.any(|param| param.trim().eq_ignore_ascii_case("base64")) {
            return Err(DataUriError::NotBase64);
        }

        let bytes = general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|err| DataUriError::InvalidPayload(err.to_string()))?;
        let mime_type = if mime_type.is_empty() {
            "application/octet-stream"
        } else {
            mime_type
        };
        Ok(Self::new(bytes, mime_type))
    }

    /// Reads the pixel size from the image header; `None` when the format
    /// isn't one we can inspect.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        image::ImageReader::new(Cursor::new(&self.bytes))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }
}

/// A file picked by the user, before validation. `size` is the size the
/// file reported; `bytes` stays empty when that is over the upload limit.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub display_name: Option<String>,
    pub bytes: Vec<u8>,
    size: usize,
}

impl UploadedFile {
    pub fn new(bytes: Vec<u8>, display_name: Option<String>) -> Self {
        Self {
            display_name,
            size: bytes.len(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Reads the file at `path`. Files larger than [`MAX_UPLOAD_BYTES`] are
    /// sized from metadata only and their contents are never loaded.
    pub async fn read(path: &Path) -> Result<Self> {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if !metadata.is_file() {
            bail!("{} is not a file", path.display());
        }
        let display_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if size > MAX_UPLOAD_BYTES {
            return Ok(Self {
                display_name,
                bytes: Vec::new(),
                size,
            });
        }

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::new(bytes, display_name))
    }
}

pub fn format_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let value = bytes as f64;
    if value >= KIB * KIB {
        format!("{:.1} MiB", value / (KIB * KIB))
    } else if value >= KIB {
        format!("{:.1} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([200, 10, 10]));
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .expect("encode png");
    buffer.into_inner()
}
