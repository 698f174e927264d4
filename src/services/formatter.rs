// src/services/formatter.rs

//! Telegram MarkdownV2 message formatting.

use crate::models::Word;

/// Characters MarkdownV2 reserves outside of entities.
pub const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

const TITLE: &str = "Palabra del día";

/// Escape every reserved MarkdownV2 character with a backslash.
///
/// # Examples
/// ```
/// use wod_rae::services::escape_markdown_v2;
///
/// assert_eq!(escape_markdown_v2("1. m."), "1\\. m\\.");
/// ```
pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render the word as a MarkdownV2 message.
///
/// The headword is a bold link to the detail page, followed by one line per
/// definition. Scraped text is escaped once here; the markup is not.
pub fn format_message(word: &Word) -> String {
    let mut message = format!(
        "*{TITLE}*:\n[*{}*]({})\n",
        escape_markdown_v2(&word.text),
        escape_markdown_v2(&word.source_url)
    );

    for definition in &word.definitions {
        message.push_str(&escape_markdown_v2(definition));
        message.push('\n');
    }

    log::debug!("created word definition message: {message:?}");
    message
}
