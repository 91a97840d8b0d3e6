//! # QR Pipeline Module
//!
//! Straight-line decode and encode pipelines used by the bot handlers.
//! Rasterization and symbol decoding are CPU bound, so they run on a
//! blocking worker under a wall-clock bound.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::content_classifier::{classify, ContentType};
use crate::qr_config::QrConfig;
use crate::qr_decoder::{self, QrDecodeResult};
use crate::qr_encoder::{self, EncodedImage, QrEncodeRequest};
use crate::qr_errors::{DecodeError, EncodeError, ScanError};
use crate::raster;

/// Result of scanning one image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeOutcome {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_point_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ContentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<usize>,
    /// Pixel dimensions of the scanned image
    pub width: u32,
    pub height: u32,
}

impl DecodeOutcome {
    fn from_result(result: Option<QrDecodeResult>, width: u32, height: u32) -> Self {
        match result {
            Some(result) => Self {
                found: true,
                classification: Some(classify(&result.text)),
                reference_point_count: Some(result.reference_points.len()),
                version: Some(result.version),
                text: Some(result.text),
                width,
                height,
            },
            None => Self {
                found: false,
                text: None,
                reference_point_count: None,
                classification: None,
                version: None,
                width,
                height,
            },
        }
    }
}

/// Rasterize and decode synchronously
pub fn scan_image_blocking(bytes: &[u8], config: &QrConfig) -> Result<DecodeOutcome, ScanError> {
    let raster = raster::load_raster(bytes, config)?;
    let result = qr_decoder::decode(&raster)?;
    Ok(DecodeOutcome::from_result(result, raster.width(), raster.height()))
}

/// Rasterize and decode on a blocking worker, bounded by `decode_timeout_secs`
pub async fn scan_image(bytes: Arc<Vec<u8>>, config: &QrConfig) -> Result<DecodeOutcome, ScanError> {
    scan_image_within(bytes, config, Duration::from_secs(config.decode_timeout_secs)).await
}

/// Rasterize and decode on a blocking worker, giving up after `limit`
///
/// The worker is not cancelled on timeout; it finishes in the background
/// and its result is dropped.
pub async fn scan_image_within(
    bytes: Arc<Vec<u8>>,
    config: &QrConfig,
    limit: Duration,
) -> Result<DecodeOutcome, ScanError> {
    let worker_config = config.clone();
    let worker = tokio::task::spawn_blocking(move || scan_image_blocking(&bytes, &worker_config));

    let outcome = match tokio::time::timeout(limit, worker).await {
        Ok(Ok(result)) => result?,
        Ok(Err(join_err)) => {
            warn!("Decode worker failed: {}", join_err);
            return Err(DecodeError::Worker(join_err.to_string()).into());
        }
        Err(_) => {
            warn!("Decode exceeded {:?} bound", limit);
            return Err(DecodeError::Timeout(limit.as_secs()).into());
        }
    };

    info!(
        "Scan finished: found={} size={}x{}",
        outcome.found, outcome.width, outcome.height
    );
    Ok(outcome)
}

/// Build a QR image for the request
pub fn generate_qr(request: &QrEncodeRequest) -> Result<EncodedImage, EncodeError> {
    match qr_encoder::encode(request) {
        Ok(image) => Ok(image),
        Err(e) => {
            info!("QR generation refused: {}", e);
            Err(e)
        }
    }
}
