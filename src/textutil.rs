use once_cell::sync::Lazy;
use regex::Regex;

static DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digits"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws"));

/// Lines with something other than whitespace on them, trimmed.
pub fn non_empty_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty())
}

pub fn count_non_empty_lines(text: &str) -> usize {
    non_empty_lines(text).count()
}

/// First run of ASCII digits in `s`, if it fits in a u64.
pub fn first_number(s: &str) -> Option<u64> {
    DIGITS_RE.find(s).and_then(|m| m.as_str().parse().ok())
}

pub fn collapse_ws(s: &str) -> String {
    WS_RE.replace_all(s, " ").trim().to_string()
}

/// Char-boundary-safe prefix for log lines.
pub fn clip(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
