//! Utility functions and helpers.

pub mod http;
pub mod log;

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove status phrases from a label, ignoring case, longest phrase first.
///
/// A phrase that ends inside a word takes the rest of that word with it, so a
/// stem such as "Свободн" removes "Свободно" whole.
pub fn strip_phrases<S: AsRef<str>>(text: &str, phrases: &[S]) -> String {
    let mut ordered: Vec<Vec<char>> = phrases
        .iter()
        .map(|p| p.as_ref().trim().chars().map(fold_char).collect::<Vec<_>>())
        .filter(|p| !p.is_empty())
        .collect();
    ordered.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut chars: Vec<char> = text.chars().collect();
    for phrase in &ordered {
        let mut i = 0;
        while i + phrase.len() <= chars.len() {
            let hit = chars[i..i + phrase.len()]
                .iter()
                .map(|c| fold_char(*c))
                .eq(phrase.iter().copied());
            if hit {
                let mut end = i + phrase.len();
                while end < chars.len() && chars[end].is_alphanumeric() {
                    end += 1;
                }
                chars.drain(i..end);
                chars.insert(i, ' ');
            }
            i += 1;
        }
    }
    normalize_whitespace(&chars.into_iter().collect::<String>())
}

/// Single-char lowercase, keeping char positions aligned with the input.
fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
