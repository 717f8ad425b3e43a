/// Maximum length of a text message, in characters.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Maximum length of a media caption, in characters.
pub const TELEGRAM_CAPTION_LIMIT: usize = 1024;

/// Split `text` into pieces of at most `limit` characters each.
///
/// Pieces are cut on the last line break that fits, then on the last space,
/// and only mid-word if a single word is longer than `limit`. Whitespace
/// around cuts is dropped. Empty input gives no pieces.
pub fn split_for_telegram(text: &str, limit: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    if limit == 0 {
        return chunks;
    }

    let mut rest = text.trim();
    while !rest.is_empty() {
        // Byte offset of the first character that doesn't fit.
        let Some((cut_at, _)) = rest.char_indices().nth(limit) else {
            chunks.push(rest);
            break;
        };

        let split_at = if rest[cut_at..].starts_with(char::is_whitespace) {
            cut_at
        } else {
            let window = &rest[..cut_at];
            window
                .rfind('\n')
                .or_else(|| window.rfind(' '))
                .filter(|&i| i > 0)
                .unwrap_or(cut_at)
        };

        let (chunk, tail) = rest.split_at(split_at);
        chunks.push(chunk.trim_end());
        rest = tail.trim_start();
    }

    chunks
}

/// Cut `text` down to `limit` characters, ending it with an ellipsis if
/// anything was cut.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit.saturating_sub(1)).collect();
    out.push('…');
    out
}
