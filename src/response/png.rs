//! PNG and base64 encoding for produced images

use base64::{engine::general_purpose::STANDARD, Engine};
use image::DynamicImage;
use std::io::Cursor;

use crate::error::{AppError, Result};

/// Encode an image as PNG bytes, then as a base64 string
pub fn encode_png(image: &DynamicImage) -> Result<String> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(STANDARD.encode(&bytes))
}

/// Decode a base64 string to binary data
pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    // Handle data URL format (e.g., "data:image/png;base64,...")
    let data = if encoded.contains(',') {
        encoded.split(',').last().unwrap_or(encoded)
    } else {
        encoded
    };

    STANDARD
        .decode(data.trim())
        .map_err(|e| AppError::InvalidRequest(format!("Invalid base64 data: {}", e)))
}
