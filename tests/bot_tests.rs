use anyhow::Result;
use qr_bot::bot::reply_builder::{format_scan_error, truncate_payload};
use qr_bot::bot::{handle_incoming, Incoming, IncomingKind};
use qr_bot::localization::t_lang;
use qr_bot::qr::scan_image_blocking;
use qr_bot::qr_config::QrConfig;
use qr_bot::qr_encoder::{encode, QrEncodeRequest, QrStyle};
use qr_bot::qr_errors::{AcquisitionError, DecodeError, ScanError};
use qr_bot::transport::ChatTransport;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;
use teloxide::types::{ChatId, FileId};

#[cfg(test)]
mod tests {
    use super::*;

    const CHAT: ChatId = ChatId(4242);

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Text(String),
        Image { png: Vec<u8>, caption: String },
        UploadAction,
    }

    /// Records everything the handlers send and serves files from memory
    #[derive(Default)]
    struct FakeTransport {
        sent: Mutex<Vec<Sent>>,
        files: HashMap<String, Vec<u8>>,
    }

    impl FakeTransport {
        fn with_file(file_id: &str, bytes: Vec<u8>) -> Self {
            let mut files = HashMap::new();
            files.insert(file_id.to_string(), bytes);
            Self {
                files,
                ..Default::default()
            }
        }

        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        fn texts(&self) -> Vec<String> {
            self.sent()
                .into_iter()
                .filter_map(|s| match s {
                    Sent::Text(text) => Some(text),
                    _ => None,
                })
                .collect()
        }
    }

    impl ChatTransport for FakeTransport {
        async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
            assert_eq!(chat_id, CHAT);
            self.sent.lock().unwrap().push(Sent::Text(text.to_string()));
            Ok(())
        }

        async fn send_image(&self, chat_id: ChatId, png: Vec<u8>, caption: &str) -> Result<()> {
            assert_eq!(chat_id, CHAT);
            self.sent.lock().unwrap().push(Sent::Image {
                png,
                caption: caption.to_string(),
            });
            Ok(())
        }

        async fn send_upload_action(&self, _chat_id: ChatId) -> Result<()> {
            self.sent.lock().unwrap().push(Sent::UploadAction);
            Ok(())
        }

        async fn download_file(&self, file_id: &FileId, max_bytes: u64) -> Result<Vec<u8>, AcquisitionError> {
            let bytes = self
                .files
                .get(&file_id.0)
                .cloned()
                .ok_or_else(|| AcquisitionError::Download("file not found".to_string()))?;
            if bytes.len() as u64 > max_bytes {
                return Err(AcquisitionError::TooLarge {
                    size: bytes.len() as u64,
                    limit: max_bytes,
                });
            }
            Ok(bytes)
        }
    }

    fn incoming(kind: IncomingKind, language_code: Option<&str>) -> Incoming {
        Incoming {
            chat_id: CHAT,
            language_code: language_code.map(str::to_string),
            kind,
        }
    }

    fn text(message: &str) -> Incoming {
        incoming(IncomingKind::Text(message.to_string()), Some("en"))
    }

    fn photo(file_id: &str, language_code: Option<&str>) -> Incoming {
        incoming(IncomingKind::Photo(FileId(file_id.to_string())), language_code)
    }

    fn qr_png(payload: &str) -> Vec<u8> {
        encode(&QrEncodeRequest::new(payload, QrStyle::default()))
            .unwrap()
            .png
    }

    fn blank_png() -> Vec<u8> {
        let img = image::GrayImage::from_pixel(120, 120, image::Luma([255u8]));
        let mut out = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    /// Test /start sends the welcome message
    #[tokio::test]
    async fn test_start_command() {
        let transport = FakeTransport::default();
        handle_incoming(&transport, &text("/start"), &QrConfig::default())
            .await
            .unwrap();

        let texts = transport.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("I read and create QR codes"));
        assert!(texts[0].contains("/qr"));
    }

    /// Test /help lists the /qr options
    #[tokio::test]
    async fn test_help_command() {
        let transport = FakeTransport::default();
        handle_incoming(&transport, &text("/help"), &QrConfig::default())
            .await
            .unwrap();

        let texts = transport.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("--ec=L|M|Q|H"));
    }

    /// Test plain text and unknown commands get a hint
    #[tokio::test]
    async fn test_plain_text_gets_hint() {
        let transport = FakeTransport::default();
        let config = QrConfig::default();
        handle_incoming(&transport, &text("hello there"), &config).await.unwrap();
        handle_incoming(&transport, &text("/unknown"), &config).await.unwrap();

        let hint = t_lang("text-tip", Some("en"));
        assert_eq!(transport.texts(), vec![hint.clone(), hint]);
    }

    /// Test a photo with a QR code is decoded and classified
    #[tokio::test]
    async fn test_photo_with_qr() {
        let transport = FakeTransport::with_file("photo-1", qr_png("https://example.com/menu"));
        handle_incoming(&transport, &photo("photo-1", Some("en")), &QrConfig::default())
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0], Sent::UploadAction);
        let texts = transport.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("QR read"));
        assert!(texts[0].contains("https://example.com/menu"));
        assert!(texts[0].contains("Web link"));
        assert!(texts[0].contains("reference points: 4"));
        assert!(texts[0].contains("400x400"));
    }

    /// Test a photo without a QR code tells the user right away
    #[tokio::test]
    async fn test_photo_without_qr_notifies_user() {
        let transport = FakeTransport::with_file("blank", blank_png());
        handle_incoming(&transport, &photo("blank", Some("en")), &QrConfig::default())
            .await
            .unwrap();

        assert_eq!(transport.texts(), vec![t_lang("qr-not-found", Some("en"))]);
    }

    /// Test the not-found reply follows the user's language
    #[tokio::test]
    async fn test_photo_without_qr_in_spanish() {
        let transport = FakeTransport::with_file("blank", blank_png());
        handle_incoming(&transport, &photo("blank", Some("es-AR")), &QrConfig::default())
            .await
            .unwrap();

        assert_eq!(
            transport.texts(),
            vec!["❌ No pude leer el QR. Intenta recortar la imagen.".to_string()]
        );
    }

    /// Test a corrupt file is reported as unsupported
    #[tokio::test]
    async fn test_corrupt_image() {
        let transport = FakeTransport::with_file("junk", b"definitely not an image".to_vec());
        handle_incoming(&transport, &photo("junk", None), &QrConfig::default())
            .await
            .unwrap();

        assert_eq!(
            transport.texts(),
            vec![t_lang("error-unsupported-format", None)]
        );
    }

    /// Test a failed download is reported
    #[tokio::test]
    async fn test_download_failure() {
        let transport = FakeTransport::default();
        handle_incoming(&transport, &photo("missing", None), &QrConfig::default())
            .await
            .unwrap();

        assert_eq!(transport.texts(), vec![t_lang("error-download-failed", None)]);
    }

    /// Test the download size bound comes from the configuration
    #[tokio::test]
    async fn test_download_too_large() {
        let transport = FakeTransport::with_file("big", qr_png("big"));
        let config = QrConfig {
            max_file_size: 16,
            ..Default::default()
        };
        handle_incoming(&transport, &photo("big", None), &config).await.unwrap();

        let texts = transport.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("limit 16 bytes"));
    }

    /// Test image documents are scanned like photos
    #[tokio::test]
    async fn test_image_document() {
        let transport = FakeTransport::with_file("doc", qr_png("WIFI:T:WPA;S:cafe;P:secret;;"));
        let message = incoming(IncomingKind::ImageDocument(FileId("doc".to_string())), None);
        handle_incoming(&transport, &message, &QrConfig::default())
            .await
            .unwrap();

        let texts = transport.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("WiFi network"));
    }

    /// Test non-image documents and other messages
    #[tokio::test]
    async fn test_unsupported_inputs() {
        let transport = FakeTransport::default();
        let config = QrConfig::default();
        handle_incoming(
            &transport,
            &incoming(IncomingKind::OtherDocument("application/pdf".to_string()), None),
            &config,
        )
        .await
        .unwrap();
        handle_incoming(&transport, &incoming(IncomingKind::DocumentWithoutMime, None), &config)
            .await
            .unwrap();
        handle_incoming(&transport, &incoming(IncomingKind::Unsupported, None), &config)
            .await
            .unwrap();

        assert_eq!(
            transport.texts(),
            vec![
                t_lang("error-unsupported-format", None),
                t_lang("error-no-mime-type", None),
                t_lang("unsupported-message", None),
            ]
        );
    }

    /// Test /qr sends an image that decodes back to the text
    #[tokio::test]
    async fn test_generate_command() {
        let transport = FakeTransport::default();
        handle_incoming(&transport, &text("/qr --ec=H hello world"), &QrConfig::default())
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let Sent::Image { png, caption } = &sent[0] else {
            panic!("expected an image, got {:?}", sent[0]);
        };
        assert!(caption.contains("(error correction H)"));
        assert!(caption.contains("hello world"));

        let outcome = scan_image_blocking(png, &QrConfig::default()).unwrap();
        assert_eq!(outcome.text.as_deref(), Some("hello world"));
    }

    /// Test /qr without text answers with usage
    #[tokio::test]
    async fn test_generate_without_text() {
        let transport = FakeTransport::default();
        handle_incoming(&transport, &text("/qr"), &QrConfig::default())
            .await
            .unwrap();

        assert_eq!(transport.texts(), vec![t_lang("encode-usage", Some("en"))]);
    }

    /// Test /qr with text over capacity explains the limit
    #[tokio::test]
    async fn test_generate_over_capacity() {
        let transport = FakeTransport::default();
        let long = "x".repeat(1300);
        handle_incoming(&transport, &text(&format!("/qr --ec=H {long}")), &QrConfig::default())
            .await
            .unwrap();

        let texts = transport.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("1300 bytes"));
        assert!(texts[0].contains("1273"));
    }

    /// Test /qr with a bad option names it
    #[tokio::test]
    async fn test_generate_bad_option() {
        let transport = FakeTransport::default();
        handle_incoming(&transport, &text("/qr --shape=round hi"), &QrConfig::default())
            .await
            .unwrap();

        let texts = transport.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("--shape=round"));
    }

    /// Test /qr with an invalid colour
    #[tokio::test]
    async fn test_generate_bad_color() {
        let transport = FakeTransport::default();
        handle_incoming(&transport, &text("/qr --dark=#12 hi"), &QrConfig::default())
            .await
            .unwrap();

        let texts = transport.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("Invalid color: #12"));
    }

    /// Test captions stay inside Telegram's limit for astral-plane text
    #[tokio::test]
    async fn test_generate_caption_counts_utf16_units() {
        let transport = FakeTransport::default();
        let emoji = "😀".repeat(700);
        handle_incoming(&transport, &text(&format!("/qr --ec=L {emoji}")), &QrConfig::default())
            .await
            .unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let Sent::Image { caption, .. } = &sent[0] else {
            panic!("expected an image, got {:?}", sent[0]);
        };
        assert!(caption.encode_utf16().count() <= 1024);
        assert!(caption.ends_with(&t_lang("truncated-suffix", Some("en"))));
    }

    /// Test truncation never splits a character and counts UTF-16 units
    #[test]
    fn test_truncate_payload_units() {
        assert_eq!(truncate_payload("short", 10, None), "short");

        let cut = truncate_payload("😀😀😀", 5, None);
        let suffix = t_lang("truncated-suffix", None);
        assert_eq!(cut, format!("😀😀{suffix}"));
    }

    /// Test decode failures get their own messages, distinct from "not found"
    #[test]
    fn test_decode_error_messages() {
        let timeout = format_scan_error(&ScanError::Decode(DecodeError::Timeout(10)), Some("en"));
        let engine = format_scan_error(
            &ScanError::Decode(DecodeError::Engine("boom".to_string())),
            Some("en"),
        );
        assert_eq!(timeout, t_lang("error-decode-timeout", Some("en")));
        assert_eq!(engine, t_lang("error-decode-engine", Some("en")));
        assert_ne!(engine, t_lang("qr-not-found", Some("en")));
        assert_ne!(timeout, t_lang("qr-not-found", Some("en")));
    }
}
