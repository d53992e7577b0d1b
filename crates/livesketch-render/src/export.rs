//! PNG export of a rendered surface.

use crate::raster::RasterSurface;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write PNG header: {0}")]
    Header(String),
    #[error("Failed to write PNG data: {0}")]
    Data(String),
}

/// An encoded image ready to be written out.
#[derive(Debug, Clone)]
pub struct ExportedImage {
    /// `<title>.png`
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Encode the surface as PNG, named after the drawing title.
pub fn export_png(surface: &RasterSurface, title: &str) -> Result<ExportedImage, ExportError> {
    let bytes = encode_png(surface.as_bytes(), surface.width(), surface.height())?;
    let file_name = format!("{}.png", file_stem(title));
    log::info!("PNG export complete: {} ({} bytes)", file_name, bytes.len());
    Ok(ExportedImage { file_name, bytes })
}

/// Encode RGBA pixel data to PNG bytes.
pub fn encode_png(rgba_data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, ExportError> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| ExportError::Header(e.to_string()))?;
        writer
            .write_image_data(rgba_data)
            .map_err(|e| ExportError::Data(e.to_string()))?;
    }
    Ok(png_data)
}

/// Title with characters that cannot appear in a file name replaced.
fn file_stem(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if stem.is_empty() {
        "drawing".to_string()
    } else {
        stem
    }
}
