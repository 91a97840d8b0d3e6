//! # Localization Module
//!
//! Fluent based message catalogue for the bot. English and Spanish bundles
//! are embedded at compile time; any other language falls back to English.

use anyhow::Result;
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::sync::OnceLock;
use unic_langid::LanguageIdentifier;

pub const DEFAULT_LANGUAGE: &str = "en";

const RESOURCES: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en/main.ftl")),
    ("es", include_str!("../locales/es/main.ftl")),
];

/// Localization manager for the QR bot
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a new localization manager with every embedded language loaded
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        for (language, source) in RESOURCES {
            let locale: LanguageIdentifier = language.parse()?;
            let bundle = Self::create_bundle(&locale, source)?;
            bundles.insert(language.to_string(), bundle);
        }

        Ok(Self { bundles })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(locale: &LanguageIdentifier, source: &str) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // Messages are plain Telegram text, bidi isolation marks would show up verbatim
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow::anyhow!("Invalid {} resource: {:?}", locale, errors))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow::anyhow!("Duplicate messages in {} resource: {:?}", locale, errors))?;

        Ok(bundle)
    }

    /// Get a localized message in the requested language, falling back to English
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let bundle = match self
            .bundles
            .get(language)
            .or_else(|| self.bundles.get(DEFAULT_LANGUAGE))
        {
            Some(bundle) => bundle,
            None => return format!("Missing translation: {key}"),
        };

        let msg = match bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {key}"),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {key}"),
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (k, v) in args {
                fluent_args.set(*k, FluentValue::from(*v));
            }
            fluent_args
        });

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            log::debug!("Formatting {} produced {} error(s)", key, errors.len());
        }
        value.into_owned()
    }

    /// Get a localized English message
    pub fn get_message(&self, key: &str, args: Option<&HashMap<&str, &str>>) -> String {
        self.get_message_in_language(key, DEFAULT_LANGUAGE, args)
    }
}

/// Map a Telegram `language_code` (e.g. "es-MX") to a supported language
pub fn detect_language(language_code: Option<&str>) -> &'static str {
    let primary = language_code
        .and_then(|code| code.split(['-', '_']).next())
        .map(|code| code.to_ascii_lowercase());

    match primary.as_deref() {
        Some("es") => "es",
        _ => DEFAULT_LANGUAGE,
    }
}

/// Global localization instance
static LOCALIZATION_MANAGER: OnceLock<LocalizationManager> = OnceLock::new();

/// Initialize the global localization manager
pub fn init_localization() -> Result<()> {
    get_localization_manager().map(|_| ())
}

/// Get the global localization manager, building it on first use
pub fn get_localization_manager() -> Result<&'static LocalizationManager> {
    if let Some(manager) = LOCALIZATION_MANAGER.get() {
        return Ok(manager);
    }
    let manager = LocalizationManager::new()?;
    Ok(LOCALIZATION_MANAGER.get_or_init(|| manager))
}

/// Convenience function to get a localized message for a user's language code
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    t_args_lang(key, &[], language_code)
}

/// Convenience function to get a localized message with arguments
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    match get_localization_manager() {
        Ok(manager) => {
            let language = detect_language(language_code);
            if args.is_empty() {
                manager.get_message_in_language(key, language, None)
            } else {
                let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
                manager.get_message_in_language(key, language, Some(&args_map))
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Localization unavailable");
            key.to_string()
        }
    }
}
