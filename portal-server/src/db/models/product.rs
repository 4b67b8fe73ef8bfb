//! Product Model
//!
//! Products are catalog data owned elsewhere; this core only reads them
//! to validate orders and to snapshot display names at creation time.

use serde::{Deserialize, Serialize};

/// Bilingual display text (English / Arabic)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LocalizedText {
    pub en: String,
    pub ar: String,
}

impl LocalizedText {
    pub fn new(en: impl Into<String>, ar: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            ar: ar.into(),
        }
    }

    /// Preferred label for log lines and diff notes
    pub fn label(&self) -> &str {
        if self.en.is_empty() { &self.ar } else { &self.en }
    }
}

/// Catalog product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: LocalizedText,
    pub is_available: bool,
    #[serde(default)]
    pub sort_order: i32,
}
