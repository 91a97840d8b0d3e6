//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::FileId;
use tracing::{debug, error, info, warn};

use crate::qr::{generate_qr, scan_image};
use crate::qr_config::QrConfig;
use crate::transport::{ChatTransport, TelegramTransport};

use super::command_parser::{parse_command, parse_qr_args, BotCommand};
use super::reply_builder::{
    format_acquisition_error, format_decode_reply, format_encode_reply, format_option_error,
    format_scan_error, help_message, welcome_message, Reply,
};
use crate::localization::t_lang;

/// What an incoming message asks the bot to do
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingKind {
    Text(String),
    /// Largest available size of a photo
    Photo(FileId),
    /// Document whose MIME type is `image/*`
    ImageDocument(FileId),
    /// Document of any other type
    OtherDocument(String),
    DocumentWithoutMime,
    Unsupported,
}

/// Transport-independent view of a Telegram message
#[derive(Debug, Clone, PartialEq)]
pub struct Incoming {
    pub chat_id: ChatId,
    pub language_code: Option<String>,
    pub kind: IncomingKind,
}

impl Incoming {
    pub fn from_message(msg: &Message) -> Self {
        // Extract user's language code from Telegram
        let language_code = msg
            .from
            .as_ref()
            .and_then(|user| user.language_code.clone());

        let kind = if let Some(text) = msg.text() {
            IncomingKind::Text(text.to_string())
        } else if let Some(largest_photo) = msg.photo().and_then(|photos| photos.last()) {
            IncomingKind::Photo(largest_photo.file.id.clone())
        } else if let Some(doc) = msg.document() {
            match &doc.mime_type {
                Some(mime_type) if mime_type.to_string().starts_with("image/") => {
                    IncomingKind::ImageDocument(doc.file.id.clone())
                }
                Some(mime_type) => IncomingKind::OtherDocument(mime_type.to_string()),
                None => IncomingKind::DocumentWithoutMime,
            }
        } else {
            IncomingKind::Unsupported
        };

        Self {
            chat_id: msg.chat.id,
            language_code,
            kind,
        }
    }
}

async fn send_reply<T: ChatTransport>(transport: &T, chat_id: ChatId, reply: Reply) -> Result<()> {
    match reply.attachment {
        Some(png) => transport.send_image(chat_id, png, &reply.text).await,
        None => transport.send_text(chat_id, &reply.text).await,
    }
}

/// Download an image, look for a QR code and report what was found
pub async fn scan_and_reply<T: ChatTransport>(
    transport: &T,
    chat_id: ChatId,
    file_id: &FileId,
    language_code: Option<&str>,
    config: &QrConfig,
) -> Result<()> {
    if let Err(e) = transport.send_upload_action(chat_id).await {
        warn!(user_id = %chat_id, error = %e, "Failed to send chat action");
    }

    let bytes = match transport.download_file(file_id, config.max_file_size).await {
        Ok(bytes) => {
            debug!(user_id = %chat_id, size = bytes.len(), "Image downloaded successfully");
            bytes
        }
        Err(e) => {
            error!(user_id = %chat_id, error = %e, "Failed to download image for user");
            transport
                .send_text(chat_id, &format_acquisition_error(&e, language_code))
                .await?;
            return Ok(());
        }
    };

    match scan_image(Arc::new(bytes), config).await {
        Ok(outcome) => {
            if outcome.found {
                info!(
                    user_id = %chat_id,
                    classification = ?outcome.classification,
                    reference_points = ?outcome.reference_point_count,
                    "QR code found"
                );
            } else {
                info!(user_id = %chat_id, "No QR code found in image");
            }
            send_reply(transport, chat_id, format_decode_reply(&outcome, language_code)).await
        }
        Err(e) => {
            error!(user_id = %chat_id, error = %e, "QR scan failed for user");
            transport
                .send_text(chat_id, &format_scan_error(&e, language_code))
                .await
        }
    }
}

/// Handle `/qr`: build the image and send it, or explain what was wrong
pub async fn generate_and_reply<T: ChatTransport>(
    transport: &T,
    chat_id: ChatId,
    args: &str,
    language_code: Option<&str>,
    config: &QrConfig,
) -> Result<()> {
    let request = match parse_qr_args(args, &config.default_style) {
        Ok(request) => request,
        Err(e) => {
            debug!(user_id = %chat_id, option = e.option(), "Rejected /qr option");
            return transport
                .send_text(chat_id, &format_option_error(&e, language_code))
                .await;
        }
    };

    let result = generate_qr(&request);
    match &result {
        Ok(image) => info!(
            user_id = %chat_id,
            ec_level = %request.style.ec_level,
            modules = image.modules,
            "QR code generated"
        ),
        Err(e) => warn!(user_id = %chat_id, error = %e, "QR generation failed"),
    }

    send_reply(
        transport,
        chat_id,
        format_encode_reply(&request, result, language_code),
    )
    .await
}

async fn handle_text_message<T: ChatTransport>(
    transport: &T,
    chat_id: ChatId,
    text: &str,
    language_code: Option<&str>,
    config: &QrConfig,
) -> Result<()> {
    debug!(user_id = %chat_id, message_length = text.len(), "Received text message from user");

    match parse_command(text) {
        Some(BotCommand::Start) => {
            transport
                .send_text(chat_id, &welcome_message(language_code))
                .await
        }
        Some(BotCommand::Help) => transport.send_text(chat_id, &help_message(language_code)).await,
        Some(BotCommand::Qr(args)) => {
            generate_and_reply(transport, chat_id, &args, language_code, config).await
        }
        Some(BotCommand::Unknown(_)) | None => {
            transport
                .send_text(chat_id, &t_lang("text-tip", language_code))
                .await
        }
    }
}

/// Route one incoming message
pub async fn handle_incoming<T: ChatTransport>(
    transport: &T,
    incoming: &Incoming,
    config: &QrConfig,
) -> Result<()> {
    let chat_id = incoming.chat_id;
    let language_code = incoming.language_code.as_deref();

    match &incoming.kind {
        IncomingKind::Text(text) => {
            handle_text_message(transport, chat_id, text, language_code, config).await
        }
        IncomingKind::Photo(file_id) => {
            debug!(user_id = %chat_id, "Received photo message from user");
            scan_and_reply(transport, chat_id, file_id, language_code, config).await
        }
        IncomingKind::ImageDocument(file_id) => {
            debug!(user_id = %chat_id, "Received image document from user");
            scan_and_reply(transport, chat_id, file_id, language_code, config).await
        }
        IncomingKind::OtherDocument(mime_type) => {
            debug!(user_id = %chat_id, mime_type = %mime_type, "Received non-image document from user");
            transport
                .send_text(chat_id, &t_lang("error-unsupported-format", language_code))
                .await
        }
        IncomingKind::DocumentWithoutMime => {
            debug!(user_id = %chat_id, "Received document without mime type from user");
            transport
                .send_text(chat_id, &t_lang("error-no-mime-type", language_code))
                .await
        }
        IncomingKind::Unsupported => {
            debug!(user_id = %chat_id, "Received unsupported message type from user");
            transport
                .send_text(chat_id, &t_lang("unsupported-message", language_code))
                .await
        }
    }
}

/// Dispatcher endpoint for every message update
pub async fn message_handler(
    msg: Message,
    transport: Arc<TelegramTransport>,
    config: Arc<QrConfig>,
) -> Result<()> {
    let incoming = Incoming::from_message(&msg);
    if let Err(e) = handle_incoming(transport.as_ref(), &incoming, &config).await {
        // Replies are best effort, a failed send must not stop the dispatcher
        error!(user_id = %incoming.chat_id, error = %e, "Failed to handle message");
    }
    Ok(())
}
