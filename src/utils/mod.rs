//! Utility functions.
//!
//! Collection of helper functions used across the bot.

/// Discord rejects messages longer than this.
pub const MESSAGE_LIMIT: usize = 2000;

/// Parse a snowflake id from a raw number or a mention
/// (`<@id>`, `<@!id>`, `<@&id>`, `<#id>`).
pub fn parse_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let digits = raw
        .strip_prefix('<')
        .and_then(|s| s.strip_suffix('>'))
        .map(|inner| inner.trim_start_matches(['@', '!', '&', '#']))
        .unwrap_or(raw);

    digits.parse::<u64>().ok().filter(|id| *id != 0)
}

/// Escape Discord markdown so user-supplied text renders literally.
pub fn escape_markdown(text: &str) -> String {
    let special_chars = ['\\', '*', '_', '~', '`', '|', '>'];

    let mut result = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        if special_chars.contains(&c) {
            result.push('\\');
        }
        result.push(c);
    }
    result
}

/// Cut text to the message limit on a char boundary, marking the cut.
pub fn truncate_message(text: &str) -> String {
    if text.chars().count() <= MESSAGE_LIMIT {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MESSAGE_LIMIT - 1).collect();
    cut.push('…');
    cut
}
