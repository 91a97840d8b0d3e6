//! # QR Telegram Bot
//!
//! A Telegram bot that reads QR codes from photos and generates QR code
//! images from text.

pub mod bot;
pub mod config;
pub mod content_classifier;
pub mod localization;
pub mod qr;
pub mod qr_config;
pub mod qr_decoder;
pub mod qr_encoder;
pub mod qr_errors;
pub mod raster;
pub mod transport;
