//! Language packs and text lookup.
//!
//! Lookup never fails: requested bundle, then the default bundle, then the
//! key itself. Placeholder substitution that cannot complete hands back the
//! raw template.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const LANGUAGE_NAME_KEY: &str = "language_name";

pub type Bundle = HashMap<String, String>;

/// Named placeholder values, e.g. `&[("code", "7".into())]`.
pub type Params<'a> = &'a [(&'a str, String)];

// ── Parsing ───────────────────────────────────────────────────────────────────

pub fn parse_bundle(text: &str) -> Bundle {
    let mut data = Bundle::new();
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        data.insert(key.trim().to_string(), value.trim().replace("\\n", "\n"));
    }
    data
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// Every loaded bundle, keyed by lower-case language code.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    bundles: BTreeMap<String, Bundle>,
}

impl Catalog {
    /// Load every `*.txt` file in `dir`. A missing directory yields an empty
    /// catalog; an unreadable pack is an error.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut catalog = Self::default();
        if !dir.is_dir() {
            return Ok(catalog);
        }
        let entries =
            std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            let Some(code) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            catalog.insert(code, parse_bundle(&text));
        }
        tracing::debug!(languages = ?catalog.codes(), dir = %dir.display(), "language packs loaded");
        Ok(catalog)
    }

    /// Empty bundles are dropped: a language with no entries is unavailable.
    pub fn insert(&mut self, code: &str, bundle: Bundle) {
        if bundle.is_empty() {
            tracing::debug!(code, "skipping empty language pack");
            return;
        }
        self.bundles.insert(code.to_lowercase(), bundle);
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.bundles.contains_key(code)
    }

    /// Sorted language codes.
    pub fn codes(&self) -> Vec<&str> {
        self.bundles.keys().map(String::as_str).collect()
    }

    pub fn display_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.bundles
            .get(code)
            .and_then(|b| b.get(LANGUAGE_NAME_KEY))
            .map(String::as_str)
            .unwrap_or(code)
    }

    /// Pick a language from a `LANG`-style locale string (`es_ES.UTF-8`),
    /// falling back to the default language and then the first code.
    pub fn pick_default(&self, locale: &str) -> String {
        let code = locale
            .split('.')
            .next()
            .unwrap_or("")
            .split('_')
            .next()
            .unwrap_or("")
            .to_lowercase();
        if self.contains(&code) {
            return code;
        }
        if self.contains(DEFAULT_LANGUAGE) {
            return DEFAULT_LANGUAGE.to_string();
        }
        self.codes()
            .first()
            .map(|c| c.to_string())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
    }

    fn template<'a>(&'a self, language: &str, key: &'a str) -> &'a str {
        if let Some(v) = self.bundles.get(language).and_then(|b| b.get(key)) {
            return v;
        }
        if let Some(v) = self.bundles.get(DEFAULT_LANGUAGE).and_then(|b| b.get(key)) {
            return v;
        }
        key
    }

    pub fn resolve(&self, language: &str, key: &str, params: Params) -> String {
        let template = self.template(language, key);
        match substitute(template, params) {
            Some(text) => text,
            None => {
                tracing::debug!(language, key, "placeholder substitution failed");
                template.to_string()
            }
        }
    }
}

// ── Placeholders ──────────────────────────────────────────────────────────────

/// Replace `{name}` with its value. `{{`/`}}` are literal braces. `None`
/// when a name has no value or the braces don't balance.
pub fn substitute(template: &str, params: Params) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next()? {
                        '}' => break,
                        '{' => return None,
                        ch => name.push(ch),
                    }
                }
                if name.is_empty() {
                    return None;
                }
                let (_, value) = params.iter().find(|(k, _)| *k == name)?;
                out.push_str(value);
            }
            '}' => return None,
            ch => out.push(ch),
        }
    }
    Some(out)
}
