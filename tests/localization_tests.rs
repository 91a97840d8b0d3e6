//! # Localization Tests
//!
//! This module contains unit tests for the localization functionality,
//! testing message retrieval and formatting with various edge cases.

use qr_bot::localization::LocalizationManager;
use std::collections::HashMap;

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> LocalizationManager {
        // Create a new localization manager for each test
        LocalizationManager::new().expect("Failed to create localization manager")
    }

    #[test]
    fn test_get_message_existing_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("welcome-commands", "en", None);
        assert_eq!(message, "Commands:");
    }

    #[test]
    fn test_get_message_nonexistent_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("nonexistent-key", "en", None);
        assert!(message.starts_with("Missing translation:"));
    }

    #[test]
    fn test_get_message_unsupported_language() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("welcome-commands", "de", None);
        // Should fall back to English
        assert_eq!(message, "Commands:");
    }

    #[test]
    fn test_get_message_with_args() {
        let manager = setup_localization();

        let mut args = HashMap::new();
        args.insert("width", "640");
        args.insert("height", "480");
        args.insert("points", "4");
        args.insert("version", "3");

        let message = manager.get_message_in_language("qr-found-details", "en", Some(&args));
        assert_eq!(message, "Image: 640x480 px, reference points: 4, version: 3");
    }

    #[test]
    fn test_get_message_missing_args() {
        let manager = setup_localization();

        // Missing arguments are reported by fluent but still produce text
        let message = manager.get_message_in_language("qr-found-details", "en", None);
        assert!(!message.is_empty());
        assert!(message.starts_with("Image:"));
    }

    #[test]
    fn test_spanish_localization() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("qr-not-found", "es", None);
        assert_eq!(message, "❌ No pude leer el QR. Intenta recortar la imagen.");
        let english_message = manager.get_message_in_language("qr-not-found", "en", None);
        assert_ne!(message, english_message);
    }

    #[test]
    fn test_every_english_key_exists_in_spanish() {
        let manager = setup_localization();
        let keys = [
            "welcome-title",
            "help-options",
            "qr-found-title",
            "qr-found-type",
            "content-web-link",
            "content-plain-text",
            "truncated-suffix",
            "error-download-failed",
            "error-decode-timeout",
            "encode-usage",
            "encode-error-capacity",
            "encode-error-generic",
        ];
        for key in keys {
            let message = manager.get_message_in_language(key, "es", None);
            assert!(!message.starts_with("Missing"), "missing Spanish message {key}");
        }
    }

    #[test]
    fn test_language_detection() {
        use qr_bot::localization::detect_language;

        assert_eq!(detect_language(Some("en")), "en");
        assert_eq!(detect_language(Some("en-US")), "en");
        assert_eq!(detect_language(Some("es")), "es");
        assert_eq!(detect_language(Some("es-MX")), "es");
        assert_eq!(detect_language(Some("ES_es")), "es");
        assert_eq!(detect_language(None), "en"); // Default to English
        assert_eq!(detect_language(Some("unsupported")), "en"); // Fallback to English
    }

    #[test]
    fn test_convenience_functions() {
        // Initialize the global localization manager for this test
        qr_bot::localization::init_localization().expect("Failed to initialize localization");

        let message = qr_bot::localization::t_lang("welcome-commands", Some("es-ES"));
        assert_eq!(message, "Comandos:");

        let args = vec![("level", "H")];
        let message_with_args =
            qr_bot::localization::t_args_lang("encode-success", &args, Some("en"));
        assert!(message_with_args.contains("(error correction H)"));
    }
}
