//! Session context: the mutable state of one interactive run.
//!
//! Owned by the navigation loop and passed by reference to every render and
//! dispatch call; nothing here is global.

use crate::i18n::{Catalog, Params};

#[derive(Debug, Clone)]
pub struct Session {
    pub language: String,
    /// Last status message; empty hides the status line.
    pub status: String,
    /// Elevation was granted earlier in this session.
    pub elevated: bool,
}

impl Session {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            status: String::new(),
            elevated: false,
        }
    }

    /// Resolve `key` in the active language.
    pub fn t(&self, catalog: &Catalog, key: &str) -> String {
        catalog.resolve(&self.language, key, &[])
    }

    pub fn tf(&self, catalog: &Catalog, key: &str, params: Params) -> String {
        catalog.resolve(&self.language, key, params)
    }

    /// Set the status line to the localized text for `key`.
    pub fn set_status(&mut self, catalog: &Catalog, key: &str, params: Params) {
        self.status = catalog.resolve(&self.language, key, params);
        tracing::debug!(status = %self.status, "status updated");
    }
}
