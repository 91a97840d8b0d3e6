//! # QR Decoder Module
//!
//! Locates and reads QR symbols in a [`RasterImage`]. Finder-pattern search,
//! module sampling and Reed–Solomon correction are delegated to `rqrr`;
//! this module only adapts the raster, picks a binarization strategy and
//! reports what the engine found.
//!
//! An image without a readable symbol is a normal outcome (`Ok(None)`).
//! `DecodeError` is reserved for faults inside the engine itself, and only
//! when every strategy hit one.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use image::imageops::{self, FilterType};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::qr_encoder::EcLevel;
use crate::qr_errors::DecodeError;
use crate::raster::RasterImage;

/// A geometric marker used by the decoder to locate the symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub x: i32,
    pub y: i32,
}

/// Payload and structural metadata of a decoded symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrDecodeResult {
    pub text: String,
    /// Corners of the located symbol, in image coordinates
    pub reference_points: Vec<ReferencePoint>,
    /// Symbol version, 1 to 40
    pub version: usize,
    pub ec_level: Option<EcLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Greyscale,
    MeanThreshold,
    /// Nearest-neighbour upscale before greyscale preparation
    Upscaled,
}

const STRATEGIES: [Strategy; 3] = [Strategy::Greyscale, Strategy::MeanThreshold, Strategy::Upscaled];

const UPSCALE_FACTOR: u32 = 2;

/// Rasters above this pixel count skip the upscaled pass
pub const MAX_UPSCALE_SOURCE_PIXELS: u64 = 4_000_000;

// Two-bit EC indicator from the format information.
fn ec_level_from_format(bits: u16) -> Option<EcLevel> {
    match bits {
        0 => Some(EcLevel::Medium),
        1 => Some(EcLevel::Low),
        2 => Some(EcLevel::High),
        3 => Some(EcLevel::Quartile),
        _ => None,
    }
}

fn mean_luminance(raster: &RasterImage) -> u8 {
    let pixels = raster.as_luma().as_raw();
    if pixels.is_empty() {
        return 128;
    }
    let sum: u64 = pixels.iter().map(|&p| u64::from(p)).sum();
    (sum / pixels.len() as u64) as u8
}

// Area enclosed by the corner points (shoelace formula).
fn symbol_area(points: &[ReferencePoint]) -> i64 {
    let n = points.len();
    let twice: i64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y)
        })
        .sum();
    twice.abs() / 2
}

fn can_upscale(raster: &RasterImage) -> bool {
    u64::from(raster.width()) * u64::from(raster.height()) <= MAX_UPSCALE_SOURCE_PIXELS
}

fn run_strategy(raster: &RasterImage, strategy: Strategy) -> Option<QrDecodeResult> {
    let w = raster.width() as usize;
    let h = raster.height() as usize;
    let luma = raster.as_luma();

    let (mut prepared, scale) = match strategy {
        Strategy::Greyscale => (
            rqrr::PreparedImage::prepare_from_greyscale(w, h, |x, y| {
                luma.get_pixel(x as u32, y as u32).0[0]
            }),
            1,
        ),
        Strategy::MeanThreshold => {
            let threshold = mean_luminance(raster);
            (
                rqrr::PreparedImage::prepare_from_bitmap(w, h, |x, y| {
                    luma.get_pixel(x as u32, y as u32).0[0] < threshold
                }),
                1,
            )
        }
        Strategy::Upscaled => {
            let big = imageops::resize(
                luma,
                raster.width() * UPSCALE_FACTOR,
                raster.height() * UPSCALE_FACTOR,
                FilterType::Nearest,
            );
            (
                rqrr::PreparedImage::prepare_from_greyscale(
                    big.width() as usize,
                    big.height() as usize,
                    |x, y| big.get_pixel(x as u32, y as u32).0[0],
                ),
                UPSCALE_FACTOR as i32,
            )
        }
    };

    let grids = prepared.detect_grids();
    debug!("{:?}: {} candidate grid(s)", strategy, grids.len());

    let mut best: Option<QrDecodeResult> = None;
    for grid in grids {
        match grid.decode() {
            Ok((meta, text)) => {
                let candidate = QrDecodeResult {
                    text,
                    reference_points: grid
                        .bounds
                        .iter()
                        .map(|p| ReferencePoint {
                            x: p.x / scale,
                            y: p.y / scale,
                        })
                        .collect(),
                    version: meta.version.0,
                    ec_level: ec_level_from_format(meta.ecc_level),
                };
                let larger = best.as_ref().map_or(true, |b| {
                    symbol_area(&candidate.reference_points) > symbol_area(&b.reference_points)
                });
                if larger {
                    best = Some(candidate);
                }
            }
            Err(e) => debug!("{:?}: grid located but unreadable: {}", strategy, e),
        }
    }
    best
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "decoder panicked".to_string())
}

// Runs each strategy in turn. A panic in one strategy only skips it; the
// scan is a fault only when no strategy ran to completion.
fn try_strategies<F>(
    raster: &RasterImage,
    strategies: &[Strategy],
    run: F,
) -> Result<Option<QrDecodeResult>, DecodeError>
where
    F: Fn(&RasterImage, Strategy) -> Option<QrDecodeResult>,
{
    let mut last_fault = None;
    let mut completed = 0;

    for &strategy in strategies {
        match panic::catch_unwind(AssertUnwindSafe(|| run(raster, strategy))) {
            Ok(Some(result)) => {
                info!(
                    "QR symbol decoded with {:?} strategy: version {}, {} chars",
                    strategy,
                    result.version,
                    result.text.chars().count()
                );
                return Ok(Some(result));
            }
            Ok(None) => completed += 1,
            Err(payload) => {
                let msg = panic_message(&*payload);
                warn!("QR engine fault during {:?} strategy: {}", strategy, msg);
                last_fault = Some(msg);
            }
        }
    }

    match last_fault {
        Some(msg) if completed == 0 => Err(DecodeError::Engine(msg)),
        _ => {
            info!("No QR symbol found in {}x{} image", raster.width(), raster.height());
            Ok(None)
        }
    }
}

/// Decode the most prominent readable QR symbol in `raster`
pub fn decode(raster: &RasterImage) -> Result<Option<QrDecodeResult>, DecodeError> {
    if raster.width() == 0 || raster.height() == 0 {
        return Ok(None);
    }

    let strategies: Vec<Strategy> = STRATEGIES
        .into_iter()
        .filter(|s| *s != Strategy::Upscaled || can_upscale(raster))
        .collect();
    try_strategies(raster, &strategies, run_strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma};

    #[test]
    fn test_blank_image_has_no_symbol() {
        let blank: GrayImage = ImageBuffer::from_pixel(64, 64, Luma([255u8]));
        let result = decode(&RasterImage::from_luma(blank)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_empty_raster_has_no_symbol() {
        let empty: GrayImage = ImageBuffer::new(0, 0);
        assert!(decode(&RasterImage::from_luma(empty)).unwrap().is_none());
    }

    #[test]
    fn test_ec_level_bits() {
        assert_eq!(ec_level_from_format(1), Some(EcLevel::Low));
        assert_eq!(ec_level_from_format(0), Some(EcLevel::Medium));
        assert_eq!(ec_level_from_format(3), Some(EcLevel::Quartile));
        assert_eq!(ec_level_from_format(2), Some(EcLevel::High));
        assert_eq!(ec_level_from_format(7), None);
    }

    fn found(text: &str) -> QrDecodeResult {
        QrDecodeResult {
            text: text.to_string(),
            reference_points: vec![],
            version: 1,
            ec_level: Some(EcLevel::Medium),
        }
    }

    fn raster() -> RasterImage {
        RasterImage::from_luma(ImageBuffer::from_pixel(8, 8, Luma([255u8])))
    }

    #[test]
    fn test_fault_in_one_strategy_falls_through() {
        let result = try_strategies(&raster(), &STRATEGIES, |_, strategy| {
            if strategy == Strategy::Greyscale {
                panic!("assertion failed: scan >= 1");
            }
            Some(found("next strategy"))
        });
        assert_eq!(result.unwrap().unwrap().text, "next strategy");
    }

    #[test]
    fn test_fault_and_miss_is_not_found() {
        let result = try_strategies(&raster(), &STRATEGIES, |_, strategy| {
            if strategy == Strategy::MeanThreshold {
                panic!("engine broke");
            }
            None
        });
        assert_eq!(result, Ok(None));
    }

    #[test]
    fn test_fault_in_every_strategy_is_an_error() {
        let result = try_strategies(&raster(), &STRATEGIES, |_, _| -> Option<QrDecodeResult> {
            panic!("engine broke")
        });
        assert_eq!(result, Err(DecodeError::Engine("engine broke".to_string())));
    }

    #[test]
    fn test_symbol_area() {
        let square = [
            ReferencePoint { x: 0, y: 0 },
            ReferencePoint { x: 10, y: 0 },
            ReferencePoint { x: 10, y: 10 },
            ReferencePoint { x: 0, y: 10 },
        ];
        assert_eq!(symbol_area(&square), 100);
        assert_eq!(symbol_area(&[]), 0);
    }

    #[test]
    fn test_large_rasters_skip_upscale() {
        assert!(can_upscale(&raster()));
        let big = RasterImage::from_luma(ImageBuffer::from_pixel(2001, 2000, Luma([255u8])));
        assert!(!can_upscale(&big));
    }

    #[test]
    fn test_mean_luminance() {
        let mut img: GrayImage = ImageBuffer::from_pixel(2, 1, Luma([0u8]));
        img.put_pixel(1, 0, Luma([200u8]));
        assert_eq!(mean_luminance(&RasterImage::from_luma(img)), 100);
    }
}
