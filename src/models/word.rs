// src/models/word.rs

use serde::{Deserialize, Serialize};

/// The word of the day as assembled by the scraper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    /// Headword, empty until found on the front page
    pub text: String,

    /// Definitions in detail-page document order
    pub definitions: Vec<String>,

    /// Absolute URL of the detail page, empty until discovered
    pub source_url: String,
}

impl Word {
    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }

    pub fn has_definitions(&self) -> bool {
        !self.definitions.is_empty()
    }
}
