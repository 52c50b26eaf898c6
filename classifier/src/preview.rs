use std::path::Path;

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;

use crate::errors::InferenceError;

/// Read a file as a `data:` URL, the way a browser file reader does. The
/// content is not validated.
pub fn read_as_data_url(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = fs_err::read(path)?;
    Ok(format!("data:{};base64,{}", mime_for(path), STANDARD.encode(bytes)))
}

pub fn decode_data_url(url: &str) -> Result<DynamicImage, InferenceError> {
    let payload = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_mime, payload)| payload)
        .ok_or_else(|| InferenceError::Preview("not a base64 data url".into()))?;
    let bytes = STANDARD.decode(payload).map_err(|e| InferenceError::Preview(e.to_string()))?;
    Ok(image::load_from_memory(&bytes)?)
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        Some("tif" | "tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}
