//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Routes incoming text, photo, and document messages
//! - `command_parser`: Parses `/start`, `/help` and `/qr` with its options
//! - `reply_builder`: Formats localized replies for every outcome

pub mod command_parser;
pub mod message_handler;
pub mod reply_builder;

// Re-export main handler function for use in main.rs
pub use message_handler::message_handler;

// Re-export utility functions that might be used elsewhere
pub use command_parser::{parse_command, parse_qr_args, BotCommand};
pub use message_handler::{handle_incoming, Incoming, IncomingKind};
pub use reply_builder::{format_decode_reply, format_encode_reply, Reply};
