//! Text normalization shared by the room index and the room resolver.

/// Collapse whitespace runs to a single space, trim, and lower-case.
///
/// Room names and descriptions arrive from the game with arbitrary wrapping,
/// so every key in the room index goes through this first.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out.to_lowercase()
}

/// Join already-normalized key parts with `|`.
pub fn join_key(parts: &[&str]) -> String {
    parts.join("|")
}
