//! Clipboard integration for reading snipped images.

use std::io::Cursor;

use arboard::{Clipboard, Error as ArboardError};
use image::{ImageFormat, RgbaImage};

/// Read the current clipboard image as PNG bytes.
///
/// Returns `Ok(None)` when the clipboard is empty or holds something that is
/// not a raster image.
///
/// # Errors
/// Fails when the clipboard cannot be opened or the image cannot be encoded.
pub fn read_image_png() -> Result<Option<Vec<u8>>, String> {
    let mut clipboard =
        Clipboard::new().map_err(|e| format!("Failed to open clipboard: {}", e))?;

    let image = match clipboard.get_image() {
        Ok(image) => image,
        Err(ArboardError::ContentNotAvailable) => {
            log::trace!("Clipboard holds no image");
            return Ok(None);
        }
        Err(e) => return Err(format!("Failed to read clipboard image: {}", e)),
    };

    encode_png(image.width, image.height, image.bytes.into_owned()).map(Some)
}

/// Encode raw RGBA pixels as PNG.
pub fn encode_png(width: usize, height: usize, rgba: Vec<u8>) -> Result<Vec<u8>, String> {
    let width = u32::try_from(width).map_err(|_| format!("Image width {} too large", width))?;
    let height =
        u32::try_from(height).map_err(|_| format!("Image height {} too large", height))?;

    let buffer = RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
        format!(
            "Clipboard pixel buffer does not match {}x{} RGBA dimensions",
            width, height
        )
    })?;

    let mut png = Vec::new();
    buffer
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| format!("Failed to encode clipboard image as PNG: {}", e))?;

    log::trace!("Encoded {}x{} clipboard image ({} bytes)", width, height, png.len());
    Ok(png)
}
