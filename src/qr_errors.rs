//! # QR Error Types Module
//!
//! This module defines the error types returned by the QR pipelines.
//! "No symbol found" is not an error: the decoder reports it as `Ok(None)`.

use crate::qr_encoder::EcLevel;

/// Errors raised while turning raw bytes into a raster image
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionError {
    /// Fetching the file from the chat service failed
    Download(String),
    /// Fetching the file took longer than the configured bound
    Timeout(u64),
    /// The file exceeds a size limit
    TooLarge { size: u64, limit: u64 },
    /// Nothing was received
    Empty,
    /// The container format is not one we accept
    UnsupportedFormat(String),
    /// The container header looked right but the body could not be decoded
    Malformed(String),
    /// The image has more pixels than the configured bound
    DimensionsTooLarge { width: u32, height: u32 },
}

impl std::fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquisitionError::Download(msg) => write!(f, "Download error: {msg}"),
            AcquisitionError::Timeout(secs) => write!(f, "Download timed out after {secs}s"),
            AcquisitionError::TooLarge { size, limit } => {
                write!(f, "File too large: {size} bytes (limit {limit} bytes)")
            }
            AcquisitionError::Empty => write!(f, "Image data is empty"),
            AcquisitionError::UnsupportedFormat(msg) => write!(f, "Unsupported image format: {msg}"),
            AcquisitionError::Malformed(msg) => write!(f, "Malformed image: {msg}"),
            AcquisitionError::DimensionsTooLarge { width, height } => {
                write!(f, "Image dimensions too large: {width}x{height}")
            }
        }
    }
}

impl std::error::Error for AcquisitionError {}

impl From<image::ImageError> for AcquisitionError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => AcquisitionError::UnsupportedFormat(e.to_string()),
            other => AcquisitionError::Malformed(other.to_string()),
        }
    }
}

/// Faults inside the symbol decoder, distinct from "no symbol found"
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The decoding engine failed unexpectedly
    Engine(String),
    /// Decoding exceeded the wall-clock bound
    Timeout(u64),
    /// The blocking worker running the decode was lost
    Worker(String),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Engine(msg) => write!(f, "Decoder fault: {msg}"),
            DecodeError::Timeout(secs) => write!(f, "Decoding timed out after {secs}s"),
            DecodeError::Worker(msg) => write!(f, "Decode worker error: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Errors raised while building a QR image
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// Nothing to encode
    EmptyText,
    /// The payload does not fit in a version 40 symbol at this level
    CapacityExceeded {
        level: EcLevel,
        length: usize,
        max: usize,
    },
    /// A colour string could not be parsed
    InvalidColor(String),
    /// Quiet zone outside `0..=MAX_MARGIN`
    InvalidMargin(u32),
    /// Width outside `1..=MAX_WIDTH`
    InvalidWidth(u32),
    /// The requested width cannot fit one pixel per module
    WidthTooSmall { width: u32, required: u32 },
    /// Any other refusal from the symbol builder
    Symbol(String),
    /// PNG serialization failed
    Render(String),
}

impl std::fmt::Display for EncodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeError::EmptyText => write!(f, "Nothing to encode: text is empty"),
            EncodeError::CapacityExceeded { level, length, max } => write!(
                f,
                "Capacity exceeded: {length} bytes do not fit at level {} (max {max} bytes)",
                level.letter()
            ),
            EncodeError::InvalidColor(value) => write!(f, "Invalid color: {value}"),
            EncodeError::InvalidMargin(value) => write!(f, "Invalid margin: {value}"),
            EncodeError::InvalidWidth(value) => write!(f, "Invalid width: {value}"),
            EncodeError::WidthTooSmall { width, required } => {
                write!(f, "Width {width}px is too small, at least {required}px required")
            }
            EncodeError::Symbol(msg) => write!(f, "Symbol error: {msg}"),
            EncodeError::Render(msg) => write!(f, "Render error: {msg}"),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Everything that can stop the decode pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    Acquisition(AcquisitionError),
    Decode(DecodeError),
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::Acquisition(e) => write!(f, "{e}"),
            ScanError::Decode(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScanError::Acquisition(e) => Some(e),
            ScanError::Decode(e) => Some(e),
        }
    }
}

impl From<AcquisitionError> for ScanError {
    fn from(err: AcquisitionError) -> Self {
        ScanError::Acquisition(err)
    }
}

impl From<DecodeError> for ScanError {
    fn from(err: DecodeError) -> Self {
        ScanError::Decode(err)
    }
}
