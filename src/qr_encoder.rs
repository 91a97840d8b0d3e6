//! # QR Encoder Module
//!
//! Builds a QR symbol from text with the `qrcode` crate and rasterizes it
//! into a PNG. Symbol versions, masking and capacity limits all come from
//! the crate's ISO/IEC 18004 tables.

use std::fmt;
use std::str::FromStr;

use image::codecs::png::PngEncoder;
use image::{ImageBuffer, ImageEncoder, Rgba, RgbaImage};
use log::{debug, info};
use qrcode::types::QrError;
use qrcode::{Color, QrCode};
use serde::{Deserialize, Serialize};

use crate::qr_config::{MAX_MARGIN, MAX_WIDTH};
use crate::qr_errors::EncodeError;

/// QR error-correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EcLevel {
    Low,
    Medium,
    Quartile,
    High,
}

impl EcLevel {
    pub fn letter(&self) -> char {
        match self {
            EcLevel::Low => 'L',
            EcLevel::Medium => 'M',
            EcLevel::Quartile => 'Q',
            EcLevel::High => 'H',
        }
    }

    fn to_qrcode(self) -> qrcode::EcLevel {
        match self {
            EcLevel::Low => qrcode::EcLevel::L,
            EcLevel::Medium => qrcode::EcLevel::M,
            EcLevel::Quartile => qrcode::EcLevel::Q,
            EcLevel::High => qrcode::EcLevel::H,
        }
    }
}

impl fmt::Display for EcLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for EcLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(EcLevel::Low),
            "m" | "medium" => Ok(EcLevel::Medium),
            "q" | "quartile" => Ok(EcLevel::Quartile),
            "h" | "high" => Ok(EcLevel::High),
            other => Err(format!("unknown error-correction level: {other}")),
        }
    }
}

/// Smallest number of pixels per module the decoder reads back reliably
pub const MIN_MODULE_PIXELS: u32 = 2;

/// Largest byte-mode payload a version 40 symbol holds at `level`
pub fn max_byte_capacity(level: EcLevel) -> usize {
    match level {
        EcLevel::Low => 2953,
        EcLevel::Medium => 2331,
        EcLevel::Quartile => 1663,
        EcLevel::High => 1273,
    }
}

fn is_alphanumeric_mode(c: char) -> bool {
    matches!(c, '0'..='9' | 'A'..='Z' | ' ' | '$' | '%' | '*' | '+' | '-' | '.' | '/' | ':')
}

/// Largest payload like `text` a version 40 symbol holds at `level`
///
/// All-digit and QR-alphanumeric texts are packed more densely than bytes.
/// Mixed texts are bounded by the byte-mode figure.
pub fn max_capacity(text: &str, level: EcLevel) -> usize {
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        match level {
            EcLevel::Low => 7089,
            EcLevel::Medium => 5596,
            EcLevel::Quartile => 3993,
            EcLevel::High => 3057,
        }
    } else if !text.is_empty() && text.chars().all(is_alphanumeric_mode) {
        match level {
            EcLevel::Low => 4296,
            EcLevel::Medium => 3391,
            EcLevel::Quartile => 2420,
            EcLevel::High => 1852,
        }
    } else {
        max_byte_capacity(level)
    }
}

/// Rendering options for a generated symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrStyle {
    pub ec_level: EcLevel,
    /// Quiet zone, in modules
    pub margin: u32,
    /// Output width (and height) in pixels
    pub width: u32,
    /// Colour of dark modules, `#RGB`, `#RRGGBB` or `#RRGGBBAA`
    pub dark_color: String,
    /// Colour of light modules and the quiet zone
    pub light_color: String,
}

impl Default for QrStyle {
    fn default() -> Self {
        Self {
            ec_level: EcLevel::Medium,
            margin: 4,
            width: 400,
            dark_color: "#000000".to_string(),
            light_color: "#ffffff".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QrEncodeRequest {
    pub text: String,
    pub style: QrStyle,
}

impl QrEncodeRequest {
    pub fn new(text: impl Into<String>, style: QrStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// A rendered PNG, ready to be sent as an attachment
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Side of the symbol in modules, quiet zone excluded
    pub modules: u32,
}

/// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional)
pub fn parse_color(value: &str) -> Result<Rgba<u8>, EncodeError> {
    let invalid = || EncodeError::InvalidColor(value.to_string());
    let hex = value.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = channel(&c.to_string())?;
                rgb[i] = v * 17;
            }
            Ok(Rgba([rgb[0], rgb[1], rgb[2], 255]))
        }
        6 | 8 => {
            let r = channel(&hex[0..2])?;
            let g = channel(&hex[2..4])?;
            let b = channel(&hex[4..6])?;
            let a = if hex.len() == 8 { channel(&hex[6..8])? } else { 255 };
            Ok(Rgba([r, g, b, a]))
        }
        _ => Err(invalid()),
    }
}

fn validate_style(style: &QrStyle) -> Result<(Rgba<u8>, Rgba<u8>), EncodeError> {
    if style.margin > MAX_MARGIN {
        return Err(EncodeError::InvalidMargin(style.margin));
    }
    if style.width == 0 || style.width > MAX_WIDTH {
        return Err(EncodeError::InvalidWidth(style.width));
    }
    Ok((parse_color(&style.dark_color)?, parse_color(&style.light_color)?))
}

fn build_symbol(text: &str, level: EcLevel) -> Result<QrCode, EncodeError> {
    QrCode::with_error_correction_level(text.as_bytes(), level.to_qrcode()).map_err(|e| match e {
        QrError::DataTooLong => EncodeError::CapacityExceeded {
            level,
            length: text.len(),
            max: max_capacity(text, level),
        },
        other => EncodeError::Symbol(other.to_string()),
    })
}

/// Encode `request.text` into a PNG QR image
///
/// Modules are drawn with a uniform integer scale of at least
/// [`MIN_MODULE_PIXELS`] and the symbol is centred on a `width x width`
/// canvas filled with the light colour.
pub fn encode(request: &QrEncodeRequest) -> Result<EncodedImage, EncodeError> {
    if request.text.is_empty() {
        return Err(EncodeError::EmptyText);
    }
    let style = &request.style;
    let (dark, light) = validate_style(style)?;
    let code = build_symbol(&request.text, style.ec_level)?;

    let modules = code.width() as u32;
    let total = modules + 2 * style.margin;
    if style.width < total * MIN_MODULE_PIXELS {
        return Err(EncodeError::WidthTooSmall {
            width: style.width,
            required: total * MIN_MODULE_PIXELS,
        });
    }

    let scale = style.width / total;
    let offset = (style.width - total * scale) / 2 + style.margin * scale;
    debug!(
        "Rendering {}x{} module symbol at scale {} on {}px canvas",
        modules, modules, scale, style.width
    );

    let mut img: RgbaImage = ImageBuffer::from_pixel(style.width, style.width, light);
    let colors = code.to_colors();
    for (i, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let x = (i as u32) % modules;
        let y = (i as u32) / modules;
        for dy in 0..scale {
            for dx in 0..scale {
                img.put_pixel(offset + x * scale + dx, offset + y * scale + dy, dark);
            }
        }
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(img.as_raw(), style.width, style.width, image::ColorType::Rgba8)
        .map_err(|e| EncodeError::Render(e.to_string()))?;

    info!(
        "Encoded {} bytes of text at level {} into {} byte PNG",
        request.text.len(),
        style.ec_level,
        png.len()
    );

    Ok(EncodedImage {
        png,
        width: style.width,
        height: style.width,
        modules,
    })
}
