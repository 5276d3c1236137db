//! Internationalization (i18n) module.
//!
//! Translations are embedded at build time and looked up by dotted key.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::Value;
use tracing::warn;

/// Global translation store: LangCode -> Key -> Text
static TRANSLATIONS: OnceLock<HashMap<&'static str, Value>> = OnceLock::new();

const FALLBACK: &str = "en";

fn store() -> &'static HashMap<&'static str, Value> {
    TRANSLATIONS.get_or_init(|| {
        let mut map = HashMap::new();
        for (lang, raw) in [("en", include_str!("en.json")), ("ja", include_str!("ja.json"))] {
            match serde_json::from_str(raw) {
                Ok(val) => {
                    map.insert(lang, val);
                }
                Err(e) => warn!("Failed to parse {} translations: {}", lang, e),
            }
        }
        map
    })
}

/// Load the tables eagerly so a broken file shows up at startup.
pub fn init() {
    let loaded = store().len();
    if loaded == 0 {
        warn!("No translations loaded; keys will be shown verbatim");
    }
}

/// Whether a locale has a translation table.
pub fn is_supported(lang: &str) -> bool {
    store().contains_key(lang)
}

/// Get text for a key in a specific language.
/// Supports nested keys via dot notation, e.g., "antinuke.reloaded".
pub fn get_text(lang: &str, key: &str) -> String {
    let store = store();

    if let Some(text) = store.get(lang).and_then(|val| resolve_key(val, key)) {
        return text;
    }

    if lang != FALLBACK
        && let Some(text) = store.get(FALLBACK).and_then(|val| resolve_key(val, key))
    {
        return text;
    }

    key.to_string()
}

/// `get_text` with `{name}` placeholders substituted.
pub fn format_text(lang: &str, key: &str, args: &[(&str, &str)]) -> String {
    args.iter()
        .fold(get_text(lang, key), |text, (name, value)| {
            text.replace(&format!("{{{}}}", name), value)
        })
}

fn resolve_key(val: &Value, key: &str) -> Option<String> {
    let mut current = val;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    current.as_str().map(|s| s.to_string())
}
