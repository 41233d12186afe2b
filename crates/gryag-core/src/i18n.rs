//! User-visible error strings resolved against a locale bundle.
//!
//! Bundles are flat JSON maps (`config/locales/<lang>.json`). A missing
//! bundle or key falls back to hard-coded English so a broken deployment
//! still answers users with something coherent.

use std::collections::HashMap;
use std::path::Path;

use tracing::warn;

use crate::error::{GryagError, Result};

/// Keys the core resolves. Kept here so tests can enumerate them.
pub const ERROR_CONTEXT_BUILD: &str = "error_context_build";
pub const ERROR_GENERATION: &str = "error_generation";

const FALLBACK: &[(&str, &str)] = &[
    (
        ERROR_CONTEXT_BUILD,
        "I couldn't gather the conversation context. Please try again in a moment.",
    ),
    (
        ERROR_GENERATION,
        "Something went wrong while writing a reply. Please try again.",
    ),
];

pub struct Localizer {
    strings: HashMap<String, String>,
}

impl Localizer {
    /// Load `<dir>/<lang>.json`. An unreadable bundle is an error so startup
    /// can decide; use [`Localizer::fallback`] when no bundle is configured.
    pub fn load(dir: &str, lang: &str) -> Result<Self> {
        let path = Path::new(dir).join(format!("{lang}.json"));
        let data = std::fs::read_to_string(&path).map_err(|e| {
            GryagError::I18n(format!("read {}: {e}", path.display()))
        })?;
        let strings: HashMap<String, String> = serde_json::from_str(&data)
            .map_err(|e| GryagError::I18n(format!("parse {}: {e}", path.display())))?;
        Ok(Self { strings })
    }

    /// Load with a logged fallback instead of failing — used when the locale
    /// directory is optional for the deployment.
    pub fn load_or_fallback(dir: &str, lang: &str) -> Self {
        match Self::load(dir, lang) {
            Ok(l) => l,
            Err(e) => {
                warn!(%lang, error = %e, "locale bundle unavailable, using English fallback");
                Self::fallback()
            }
        }
    }

    /// English-only localizer built from the hard-coded fallback table.
    pub fn fallback() -> Self {
        Self {
            strings: HashMap::new(),
        }
    }

    /// Resolve a key. Bundle first, then the built-in English table, then
    /// the key itself (never panics, never returns empty).
    pub fn get(&self, key: &str) -> String {
        if let Some(s) = self.strings.get(key) {
            return s.clone();
        }
        FALLBACK
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}
