//! Text shaping for on-screen values: digit grouping, length clamping and
//! greedy word wrap.

use crate::extract::Value;

/// Render a fetched value for display.
///
/// Anything with an integer reading is grouped with thousands separators
/// (`1234567` → `"1,234,567"`); everything else is shown unchanged.
pub fn format_value(value: &Value) -> String {
    match value.as_integer() {
        Some(n) => group_thousands(n),
        None => value.to_string(),
    }
}

/// Format an integer with `,` between groups of three digits.
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Keep at most `max_chars` characters.
pub fn clamp_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Greedy line fill on whitespace.
///
/// A word joins the current line while `line + ' ' + word` fits in
/// `max_chars`; otherwise the line is flushed and the word starts the next
/// one. Words are never split, so a word longer than `max_chars` sits alone
/// on an overflowing line.
pub fn wrap_nicely(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if line.is_empty() {
            line.push_str(word);
            line_len = word_len;
        } else if line_len + 1 + word_len <= max_chars {
            line.push(' ');
            line.push_str(word);
            line_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
            line_len = word_len;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
