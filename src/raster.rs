//! # Raster Module
//!
//! Turns compressed image containers (PNG, JPEG, ...) into an addressable
//! luminance grid that the QR decoder can sample.

use std::io::Cursor;

use image::{GrayImage, ImageFormat};
use log::{debug, info};

use crate::qr_config::QrConfig;
use crate::qr_errors::AcquisitionError;

/// Decoded pixel grid, one 8-bit luminance sample per pixel
#[derive(Debug, Clone)]
pub struct RasterImage {
    luma: GrayImage,
    format: Option<ImageFormat>,
}

impl RasterImage {
    /// Wrap an already decoded luminance buffer
    pub fn from_luma(luma: GrayImage) -> Self {
        Self { luma, format: None }
    }

    pub fn width(&self) -> u32 {
        self.luma.width()
    }

    pub fn height(&self) -> u32 {
        self.luma.height()
    }

    /// Luminance at `(x, y)`, 0 is black
    pub fn luminance(&self, x: u32, y: u32) -> u8 {
        self.luma.get_pixel(x, y).0[0]
    }

    pub fn as_luma(&self) -> &GrayImage {
        &self.luma
    }

    /// Container format the raster was decoded from, if any
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }
}

/// Bytes needed to hold the fully decoded RGBA buffer of an image
pub fn estimate_memory_usage(width: u32, height: u32) -> u64 {
    u64::from(width) * u64::from(height) * 4
}

fn sniff_format(bytes: &[u8], config: &QrConfig) -> Result<ImageFormat, AcquisitionError> {
    if bytes.is_empty() {
        return Err(AcquisitionError::Empty);
    }
    if bytes.len() < config.min_format_bytes {
        return Err(AcquisitionError::UnsupportedFormat(format!(
            "need at least {} bytes to detect the format, got {}",
            config.min_format_bytes,
            bytes.len()
        )));
    }

    let header = &bytes[..bytes.len().min(config.buffer_size)];
    let format = image::guess_format(header)
        .map_err(|e| AcquisitionError::UnsupportedFormat(e.to_string()))?;

    let supported = matches!(
        format,
        ImageFormat::Png
            | ImageFormat::Jpeg
            | ImageFormat::Bmp
            | ImageFormat::Tiff
            | ImageFormat::WebP
            | ImageFormat::Gif
    );
    if supported {
        Ok(format)
    } else {
        Err(AcquisitionError::UnsupportedFormat(format!("{format:?}")))
    }
}

/// Check whether the bytes start with a container format we can rasterize
pub fn is_supported_image_format(bytes: &[u8], config: &QrConfig) -> bool {
    match sniff_format(bytes, config) {
        Ok(format) => {
            debug!("Detected supported image format: {:?}", format);
            true
        }
        Err(e) => {
            debug!("Rejected image during format detection: {}", e);
            false
        }
    }
}

/// Validate size and container format before any pixel decoding happens
pub fn validate_image_bytes(bytes: &[u8], config: &QrConfig) -> Result<ImageFormat, AcquisitionError> {
    let size = bytes.len() as u64;
    if size > config.max_file_size {
        return Err(AcquisitionError::TooLarge {
            size,
            limit: config.max_file_size,
        });
    }

    let format = sniff_format(bytes, config)?;

    let limit = config.format_limits.limit_for(format).min(config.max_file_size);
    if size > limit {
        return Err(AcquisitionError::TooLarge { size, limit });
    }

    Ok(format)
}

/// Decode container bytes into a luminance raster
///
/// The header dimensions are checked against `max_image_pixels` before the
/// body is decoded, so oversized images are rejected without allocating
/// their pixel buffer. The input slice is never modified.
pub fn load_raster(bytes: &[u8], config: &QrConfig) -> Result<RasterImage, AcquisitionError> {
    let format = validate_image_bytes(bytes, config)?;

    let (width, height) = image::io::Reader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(AcquisitionError::from)?;

    if width == 0 || height == 0 || u64::from(width) * u64::from(height) > config.max_image_pixels {
        return Err(AcquisitionError::DimensionsTooLarge { width, height });
    }

    info!(
        "Rasterizing {:?} image {}x{} (~{} bytes decoded)",
        format,
        width,
        height,
        estimate_memory_usage(width, height)
    );

    let decoded = image::load_from_memory_with_format(bytes, format)?;

    Ok(RasterImage {
        luma: decoded.to_luma8(),
        format: Some(format),
    })
}
