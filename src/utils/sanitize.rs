// Identifier sanitization and message truncation

/// Longest agent identifier kept after sanitization
pub const MAX_AGENT_ID_LEN: usize = 64;

/// Keep ASCII alphanumerics and hyphens, then cap at 64 characters.
///
/// Used both when an invoice is created and when a payload is retrieved, so
/// the two sides always derive the same vault path.
pub fn sanitize_agent_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(MAX_AGENT_ID_LEN)
        .collect()
}

/// First `max_chars` characters of `s`.
pub fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
