use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tracing::warn;
use unic_langid::LanguageIdentifier;

/// Language used when the user's language is unknown or unsupported
pub const FALLBACK_LANGUAGE: &str = "en";

const RESOURCES: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en/main.ftl")),
    ("ru", include_str!("../locales/ru/main.ftl")),
];

/// Localization manager for the bot's user-facing texts
pub struct LocalizationManager {
    bundles: HashMap<String, Arc<FluentBundle<FluentResource>>>,
}

impl LocalizationManager {
    /// Create a new localization manager with every bundled language
    pub fn new() -> anyhow::Result<Self> {
        let mut bundles = HashMap::new();

        for (language, source) in RESOURCES {
            let locale: LanguageIdentifier = language.parse()?;
            let bundle = Self::create_bundle(&locale, source);
            bundles.insert(language.to_string(), Arc::new(bundle));
        }

        Ok(Self { bundles })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(locale: &LanguageIdentifier, source: &str) -> FluentBundle<FluentResource> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // Isolation marks would leak into Telegram messages
        bundle.set_use_isolating(false);

        match FluentResource::try_new(source.to_string()) {
            Ok(resource) => {
                if let Err(errors) = bundle.add_resource(resource) {
                    warn!(locale = %locale, errors = ?errors, "Conflicting messages in locale resource");
                }
            }
            Err((resource, errors)) => {
                warn!(locale = %locale, errors = ?errors, "Locale resource has syntax errors, loading valid entries only");
                let _ = bundle.add_resource(resource);
            }
        }

        bundle
    }

    /// Normalize a Telegram language code ("ru-RU", "en") to a bundled language
    pub fn resolve_language<'a>(&'a self, language_code: Option<&'a str>) -> &'a str {
        language_code
            .map(|code| code.split(['-', '_']).next().unwrap_or(code))
            .filter(|code| self.bundles.contains_key(*code))
            .unwrap_or(FALLBACK_LANGUAGE)
    }

    /// Get a localized message in a specific language
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let bundle = match self
            .bundles
            .get(language)
            .or_else(|| self.bundles.get(FALLBACK_LANGUAGE))
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
            warn!(key = %key, errors = ?errors, "Errors while formatting message");
        }
        value.into_owned()
    }

    /// Get a localized message for a Telegram language code
    pub fn get_message(&self, key: &str, language_code: Option<&str>) -> String {
        self.get_message_in_language(key, self.resolve_language(language_code), None)
    }

    /// Get a localized message with simple string arguments
    pub fn get_message_with_args(
        &self,
        key: &str,
        args: &[(&str, &str)],
        language_code: Option<&str>,
    ) -> String {
        let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
        self.get_message_in_language(key, self.resolve_language(language_code), Some(&args_map))
    }
}

/// Global localization instance
static LOCALIZATION_MANAGER: LazyLock<LocalizationManager> = LazyLock::new(|| {
    LocalizationManager::new().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to build localization bundles");
        LocalizationManager {
            bundles: HashMap::new(),
        }
    })
});

/// Get the global localization manager
pub fn get_localization_manager() -> &'static LocalizationManager {
    &LOCALIZATION_MANAGER
}

/// Convenience function to get a localized message
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    get_localization_manager().get_message(key, language_code)
}

/// Convenience function to get a localized message with arguments
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    get_localization_manager().get_message_with_args(key, args, language_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_ids(source: &str) -> Vec<&str> {
        source
            .lines()
            .filter(|line| !line.starts_with([' ', '#']) && line.contains(" ="))
            .filter_map(|line| line.split(" =").next())
            .map(str::trim)
            .collect()
    }

    #[test]
    fn test_every_english_key_is_translated() {
        let manager = LocalizationManager::new().unwrap();
        let ru = &manager.bundles["ru"];

        for id in message_ids(RESOURCES[0].1) {
            assert!(ru.has_message(id), "missing ru translation for {id}");
        }
    }

    #[test]
    fn test_language_resolution() {
        let manager = LocalizationManager::new().unwrap();
        assert_eq!(manager.resolve_language(Some("ru")), "ru");
        assert_eq!(manager.resolve_language(Some("ru-RU")), "ru");
        assert_eq!(manager.resolve_language(Some("de")), "en");
        assert_eq!(manager.resolve_language(None), "en");
    }
}
