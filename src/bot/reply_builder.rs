//! Reply Builder module for formatting the messages the bot sends back

use crate::localization::{t_args_lang, t_lang};
use crate::qr::DecodeOutcome;
use crate::qr_config::{MAX_MARGIN, MAX_WIDTH};
use crate::qr_encoder::{EncodedImage, QrEncodeRequest};
use crate::qr_errors::{AcquisitionError, DecodeError, EncodeError, ScanError};

use super::command_parser::OptionError;

/// UTF-16 units of payload echoed in a text message (Telegram allows 4096 in total)
pub const MESSAGE_PAYLOAD_UNITS: usize = 3500;
/// UTF-16 units of payload echoed in a photo caption (Telegram allows 1024 in total)
pub const CAPTION_PAYLOAD_UNITS: usize = 900;

/// A message to send, optionally with a PNG attachment
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub attachment: Option<Vec<u8>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachment: None,
        }
    }
}

/// Cut `text` to at most `max_units` UTF-16 code units, marking the cut
///
/// Telegram measures message and caption length in UTF-16 units, so an
/// astral-plane character counts twice. Characters are never split.
pub fn truncate_payload(text: &str, max_units: usize, language_code: Option<&str>) -> String {
    if text.encode_utf16().count() <= max_units {
        return text.to_string();
    }
    let mut used = 0;
    let kept: String = text
        .chars()
        .take_while(|c| {
            used += c.len_utf16();
            used <= max_units
        })
        .collect();
    format!("{kept}{}", t_lang("truncated-suffix", language_code))
}

pub fn welcome_message(language_code: Option<&str>) -> String {
    format!(
        "{}\n\n{}\n\n{}\n{}\n{}\n{}",
        t_lang("welcome-title", language_code),
        t_lang("welcome-description", language_code),
        t_lang("welcome-commands", language_code),
        t_lang("welcome-start", language_code),
        t_lang("welcome-help", language_code),
        t_lang("welcome-qr", language_code)
    )
}

pub fn help_message(language_code: Option<&str>) -> String {
    [
        "help-title",
        "help-scan",
        "help-generate",
        "help-options",
        "help-example",
        "help-tips",
    ]
    .iter()
    .map(|key| t_lang(key, language_code))
    .collect::<Vec<_>>()
    .join("\n\n")
}

/// Reply for a finished scan, found or not
pub fn format_decode_reply(outcome: &DecodeOutcome, language_code: Option<&str>) -> Reply {
    let (Some(text), Some(kind)) = (&outcome.text, outcome.classification) else {
        return Reply::text(t_lang("qr-not-found", language_code));
    };

    let width = outcome.width.to_string();
    let height = outcome.height.to_string();
    let points = outcome.reference_point_count.unwrap_or(0).to_string();
    let version = outcome
        .version
        .map(|v| v.to_string())
        .unwrap_or_else(|| "?".to_string());
    let kind_label = t_lang(kind.label_key(), language_code);

    Reply::text(format!(
        "{}\n{}\n\n{}\n{}",
        t_lang("qr-found-title", language_code),
        truncate_payload(text, MESSAGE_PAYLOAD_UNITS, language_code),
        t_args_lang("qr-found-type", &[("kind", kind_label.as_str())], language_code),
        t_args_lang(
            "qr-found-details",
            &[
                ("width", width.as_str()),
                ("height", height.as_str()),
                ("points", points.as_str()),
                ("version", version.as_str()),
            ],
            language_code
        )
    ))
}

/// Reply for an encode attempt: the image with a caption, or the reason it failed
pub fn format_encode_reply(
    request: &QrEncodeRequest,
    result: Result<EncodedImage, EncodeError>,
    language_code: Option<&str>,
) -> Reply {
    match result {
        Ok(image) => {
            let level = request.style.ec_level.to_string();
            Reply {
                text: format!(
                    "{}\n{}",
                    t_args_lang("encode-success", &[("level", level.as_str())], language_code),
                    truncate_payload(&request.text, CAPTION_PAYLOAD_UNITS, language_code)
                ),
                attachment: Some(image.png),
            }
        }
        Err(e) => Reply::text(format_encode_error(&e, language_code)),
    }
}

pub fn format_encode_error(error: &EncodeError, language_code: Option<&str>) -> String {
    match error {
        EncodeError::EmptyText => t_lang("encode-usage", language_code),
        EncodeError::CapacityExceeded { level, length, max } => t_args_lang(
            "encode-error-capacity",
            &[
                ("length", length.to_string().as_str()),
                ("max", max.to_string().as_str()),
                ("level", level.to_string().as_str()),
            ],
            language_code,
        ),
        EncodeError::InvalidColor(value) => {
            t_args_lang("encode-error-color", &[("value", value.as_str())], language_code)
        }
        EncodeError::InvalidMargin(value) => t_args_lang(
            "encode-error-margin",
            &[("value", value.to_string().as_str()), ("max", MAX_MARGIN.to_string().as_str())],
            language_code,
        ),
        EncodeError::InvalidWidth(value) => t_args_lang(
            "encode-error-width",
            &[("value", value.to_string().as_str()), ("max", MAX_WIDTH.to_string().as_str())],
            language_code,
        ),
        EncodeError::WidthTooSmall { width, required } => t_args_lang(
            "encode-error-width-small",
            &[("width", width.to_string().as_str()), ("required", required.to_string().as_str())],
            language_code,
        ),
        EncodeError::Symbol(_) | EncodeError::Render(_) => {
            t_lang("encode-error-generic", language_code)
        }
    }
}

pub fn format_option_error(error: &OptionError, language_code: Option<&str>) -> String {
    format!(
        "{}\n{}",
        t_args_lang("encode-error-option", &[("option", error.option())], language_code),
        t_lang("encode-usage", language_code)
    )
}

pub fn format_acquisition_error(error: &AcquisitionError, language_code: Option<&str>) -> String {
    match error {
        AcquisitionError::Download(_) => t_lang("error-download-failed", language_code),
        AcquisitionError::Timeout(_) => t_lang("error-download-timeout", language_code),
        AcquisitionError::TooLarge { size, limit } => t_args_lang(
            "error-too-large",
            &[("size", size.to_string().as_str()), ("limit", limit.to_string().as_str())],
            language_code,
        ),
        AcquisitionError::Empty => t_lang("error-empty-image", language_code),
        AcquisitionError::UnsupportedFormat(_) => t_lang("error-unsupported-format", language_code),
        AcquisitionError::Malformed(_) => t_lang("error-image-load", language_code),
        AcquisitionError::DimensionsTooLarge { width, height } => t_args_lang(
            "error-image-dimensions",
            &[("width", width.to_string().as_str()), ("height", height.to_string().as_str())],
            language_code,
        ),
    }
}

pub fn format_scan_error(error: &ScanError, language_code: Option<&str>) -> String {
    match error {
        ScanError::Acquisition(e) => format_acquisition_error(e, language_code),
        ScanError::Decode(DecodeError::Timeout(_)) => t_lang("error-decode-timeout", language_code),
        ScanError::Decode(_) => t_lang("error-decode-engine", language_code),
    }
}
