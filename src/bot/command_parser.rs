//! Command parsing for text messages

use crate::qr_encoder::{QrEncodeRequest, QrStyle};

#[derive(Debug, Clone, PartialEq)]
pub enum BotCommand {
    Start,
    Help,
    /// `/qr`, with everything after the command word
    Qr(String),
    /// Any other slash command
    Unknown(String),
}

/// A `/qr` option that could not be applied
#[derive(Debug, Clone, PartialEq)]
pub enum OptionError {
    Unknown(String),
    InvalidValue(String),
}

impl OptionError {
    /// The offending option as the user typed it
    pub fn option(&self) -> &str {
        match self {
            OptionError::Unknown(option) | OptionError::InvalidValue(option) => option,
        }
    }
}

/// Parse a slash command, returns `None` for ordinary text
///
/// The command word may carry a `@botname` suffix, as Telegram adds in groups.
pub fn parse_command(text: &str) -> Option<BotCommand> {
    let text = text.trim_start();
    if !text.starts_with('/') {
        return None;
    }

    let (word, rest) = match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], &text[idx..]),
        None => (text, ""),
    };
    let name = word[1..].split('@').next().unwrap_or("").to_ascii_lowercase();

    Some(match name.as_str() {
        "start" => BotCommand::Start,
        "help" => BotCommand::Help,
        "qr" => BotCommand::Qr(rest.trim().to_string()),
        _ => BotCommand::Unknown(name),
    })
}

/// Turn `/qr` arguments into an encode request
///
/// Leading `--key=value` tokens set style options, a bare `--` ends the
/// options, and everything after is the payload with its spacing kept.
pub fn parse_qr_args(args: &str, defaults: &QrStyle) -> Result<QrEncodeRequest, OptionError> {
    let mut style = defaults.clone();
    let mut rest = args.trim_start();

    while rest.starts_with("--") {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let token = &rest[..end];
        rest = rest[end..].trim_start();

        if token == "--" {
            break;
        }

        let (key, value) = token[2..].split_once('=').unwrap_or((&token[2..], ""));
        let invalid = || OptionError::InvalidValue(token.to_string());
        match key.to_ascii_lowercase().as_str() {
            "ec" | "level" => style.ec_level = value.parse().map_err(|_| invalid())?,
            "margin" => style.margin = value.parse().map_err(|_| invalid())?,
            "width" | "size" => style.width = value.parse().map_err(|_| invalid())?,
            "dark" => {
                if value.is_empty() {
                    return Err(invalid());
                }
                style.dark_color = value.to_string();
            }
            "light" => {
                if value.is_empty() {
                    return Err(invalid());
                }
                style.light_color = value.to_string();
            }
            _ => return Err(OptionError::Unknown(token.to_string())),
        }
    }

    Ok(QrEncodeRequest::new(rest.trim_end(), style))
}
