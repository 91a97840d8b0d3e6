//! # QR Configuration Module
//!
//! This module defines configuration structures for QR processing,
//! including acquisition limits, decode bounds, and default encode styling.

use serde::{Deserialize, Serialize};

use crate::qr_encoder::{EcLevel, QrStyle};

// Constants for QR configuration
pub const FORMAT_DETECTION_BUFFER_SIZE: usize = 32;
pub const MIN_FORMAT_BYTES: usize = 8;
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB limit for image files
pub const MAX_IMAGE_PIXELS: u64 = 40_000_000; // ~40 megapixels
pub const DEFAULT_DECODE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Upper bounds for the encode path
pub const MAX_MARGIN: u32 = 64;
pub const MAX_WIDTH: u32 = 4096;

/// Format-specific file size limits for different image formats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatSizeLimits {
    /// PNG format limit (higher due to better compression)
    pub png_max: u64,
    /// JPEG format limit (moderate due to lossy compression)
    pub jpeg_max: u64,
    /// BMP format limit (lower due to uncompressed nature)
    pub bmp_max: u64,
    /// TIFF format limit (can be large, multi-page support)
    pub tiff_max: u64,
    /// WebP and GIF limit
    pub other_max: u64,
}

impl Default for FormatSizeLimits {
    fn default() -> Self {
        Self {
            png_max: 15 * 1024 * 1024,  // 15MB for PNG
            jpeg_max: 10 * 1024 * 1024, // 10MB for JPEG
            bmp_max: 5 * 1024 * 1024,   // 5MB for BMP
            tiff_max: 20 * 1024 * 1024, // 20MB for TIFF
            other_max: 10 * 1024 * 1024,
        }
    }
}

impl FormatSizeLimits {
    /// Size limit in bytes for a detected container format
    pub fn limit_for(&self, format: image::ImageFormat) -> u64 {
        match format {
            image::ImageFormat::Png => self.png_max,
            image::ImageFormat::Jpeg => self.jpeg_max,
            image::ImageFormat::Bmp => self.bmp_max,
            image::ImageFormat::Tiff => self.tiff_max,
            _ => self.other_max,
        }
    }
}

/// Configuration structure for QR processing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrConfig {
    /// Buffer size for format detection in bytes
    pub buffer_size: usize,
    /// Minimum bytes required for format detection
    pub min_format_bytes: usize,
    /// Maximum allowed file size in bytes (general limit, also applied to downloads)
    pub max_file_size: u64,
    /// Format-specific size limits
    pub format_limits: FormatSizeLimits,
    /// Largest accepted image, in pixels, checked before the full decode
    pub max_image_pixels: u64,
    /// Wall-clock bound on rasterization plus symbol decoding
    pub decode_timeout_secs: u64,
    /// Wall-clock bound on fetching the image from the chat service
    pub download_timeout_secs: u64,
    /// Style used by `/qr` when the user gives no options
    pub default_style: QrStyle,
}

impl Default for QrConfig {
    fn default() -> Self {
        Self {
            buffer_size: FORMAT_DETECTION_BUFFER_SIZE,
            min_format_bytes: MIN_FORMAT_BYTES,
            max_file_size: MAX_FILE_SIZE,
            format_limits: FormatSizeLimits::default(),
            max_image_pixels: MAX_IMAGE_PIXELS,
            decode_timeout_secs: DEFAULT_DECODE_TIMEOUT_SECS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            default_style: QrStyle {
                ec_level: EcLevel::Medium,
                ..QrStyle::default()
            },
        }
    }
}
