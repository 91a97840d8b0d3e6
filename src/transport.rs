//! Chat transport used by the bot handlers
//!
//! Handlers talk to Telegram only through [`ChatTransport`], so a fake can
//! stand in for the real bot in tests. The Telegram implementation is built
//! once at startup and handed to the dispatcher.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, FileId, InputFile};
use tracing::{debug, warn};

use crate::qr_config::QrConfig;
use crate::qr_errors::AcquisitionError;

pub trait ChatTransport: Send + Sync {
    /// Send a plain text message
    fn send_text(&self, chat_id: ChatId, text: &str) -> impl Future<Output = Result<()>> + Send;

    /// Send a PNG as a photo with a caption
    fn send_image(
        &self,
        chat_id: ChatId,
        png: Vec<u8>,
        caption: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Show the "sending photo" indicator while we work
    fn send_upload_action(&self, chat_id: ChatId) -> impl Future<Output = Result<()>> + Send;

    /// Fetch a file's bytes, refusing anything larger than `max_bytes`
    fn download_file(
        &self,
        file_id: &FileId,
        max_bytes: u64,
    ) -> impl Future<Output = Result<Vec<u8>, AcquisitionError>> + Send;
}

/// Response body collected chunk by chunk, refused once it passes `limit`
#[derive(Debug)]
pub struct BoundedBody {
    buf: Vec<u8>,
    limit: u64,
}

impl BoundedBody {
    pub fn new(limit: u64) -> Self {
        Self {
            buf: Vec::new(),
            limit,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<(), AcquisitionError> {
        let size = (self.buf.len() + chunk.len()) as u64;
        if size > self.limit {
            return Err(AcquisitionError::TooLarge {
                size,
                limit: self.limit,
            });
        }
        self.buf.extend_from_slice(chunk);
        Ok(())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// [`ChatTransport`] backed by the Telegram Bot API
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
    http: reqwest::Client,
    download_timeout_secs: u64,
}

impl TelegramTransport {
    pub fn new(bot: Bot, config: &QrConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .build()?;
        Ok(Self {
            bot,
            http,
            download_timeout_secs: config.download_timeout_secs,
        })
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    fn map_http_error(&self, err: reqwest::Error) -> AcquisitionError {
        if err.is_timeout() {
            AcquisitionError::Timeout(self.download_timeout_secs)
        } else {
            AcquisitionError::Download(err.to_string())
        }
    }
}

impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.bot.send_message(chat_id, text).await?;
        Ok(())
    }

    async fn send_image(&self, chat_id: ChatId, png: Vec<u8>, caption: &str) -> Result<()> {
        let input_file = InputFile::memory(png).file_name("qr.png");
        self.bot
            .send_photo(chat_id, input_file)
            .caption(caption)
            .await?;
        Ok(())
    }

    async fn send_upload_action(&self, chat_id: ChatId) -> Result<()> {
        self.bot
            .send_chat_action(chat_id, ChatAction::UploadPhoto)
            .await?;
        Ok(())
    }

    async fn download_file(&self, file_id: &FileId, max_bytes: u64) -> Result<Vec<u8>, AcquisitionError> {
        let file = self
            .bot
            .get_file(file_id.clone())
            .await
            .map_err(|e| AcquisitionError::Download(e.to_string()))?;

        let advertised = u64::from(file.meta.size);
        if advertised > max_bytes {
            return Err(AcquisitionError::TooLarge {
                size: advertised,
                limit: max_bytes,
            });
        }

        let url = format!(
            "https://api.telegram.org/file/bot{}/{}",
            self.bot.token(),
            file.path
        );

        let mut response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.map_http_error(e))?;

        if let Some(length) = response.content_length() {
            if length > max_bytes {
                return Err(AcquisitionError::TooLarge {
                    size: length,
                    limit: max_bytes,
                });
            }
        }

        let mut body = BoundedBody::new(max_bytes);
        while let Some(chunk) = response.chunk().await.map_err(|e| self.map_http_error(e))? {
            if let Err(e) = body.push(&chunk) {
                warn!(limit = max_bytes, "Downloaded body over limit");
                return Err(e);
            }
        }
        let bytes = body.into_inner();

        debug!(size = bytes.len(), "File downloaded");
        Ok(bytes)
    }
}
