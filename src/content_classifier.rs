//! # Content Classifier Module
//!
//! Labels a decoded QR payload by its well-known URI scheme or prefix.
//! Rules are tried in a fixed order and the first match wins; anything
//! that matches no rule is plain text.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// What kind of data a QR payload carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    WebLink,
    Wifi,
    Email,
    Phone,
    Sms,
    Geo,
    Contact,
    PlainText,
}

impl ContentType {
    /// Localization key for the human readable label
    pub fn label_key(&self) -> &'static str {
        match self {
            ContentType::WebLink => "content-web-link",
            ContentType::Wifi => "content-wifi",
            ContentType::Email => "content-email",
            ContentType::Phone => "content-phone",
            ContentType::Sms => "content-sms",
            ContentType::Geo => "content-geo",
            ContentType::Contact => "content-contact",
            ContentType::PlainText => "content-plain-text",
        }
    }
}

lazy_static! {
    // Order matters: this is the priority order of the rules.
    static ref RULES: Vec<(Regex, ContentType)> = vec![
        (Regex::new(r"(?i)^https?://").expect("web link rule should be valid"), ContentType::WebLink),
        (Regex::new(r"(?i)^WIFI:").expect("wifi rule should be valid"), ContentType::Wifi),
        (Regex::new(r"(?i)^mailto:").expect("email rule should be valid"), ContentType::Email),
        (Regex::new(r"(?i)^tel:").expect("phone rule should be valid"), ContentType::Phone),
        (Regex::new(r"(?i)^smsto:").expect("sms rule should be valid"), ContentType::Sms),
        (Regex::new(r"(?i)^geo:").expect("geo rule should be valid"), ContentType::Geo),
        (Regex::new(r"(?i)^BEGIN:VCARD").expect("contact rule should be valid"), ContentType::Contact),
    ];
}

/// Classify a decoded payload
pub fn classify(text: &str) -> ContentType {
    RULES
        .iter()
        .find(|(rule, _)| rule.is_match(text))
        .map(|(_, content_type)| *content_type)
        .unwrap_or(ContentType::PlainText)
}
