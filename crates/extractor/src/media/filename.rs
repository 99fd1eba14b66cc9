//! Title to filename conversion.
//!
//! Characters that are illegal in a filename on any major platform are
//! replaced by their full-width look-alikes instead of being dropped, so two
//! titles that differ only in punctuation still map to different files.

const ELLIPSIS: &str = "...";

/// Windows reserved filenames (case-insensitive)
const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

fn full_width(c: char) -> Option<char> {
    Some(match c {
        '/' => '／',
        '\\' => '＼',
        ':' => '：',
        '*' => '＊',
        '?' => '？',
        '"' => '＂',
        '<' => '＜',
        '>' => '＞',
        '|' => '｜',
        _ => return None,
    })
}

/// Makes `title` usable as a file name component.
///
/// `max_len` limits the result to that many characters (with a trailing
/// `...`); `0` disables the limit.
///
/// # Examples
///
/// ```
/// use reel_extractor::media::sanitize_title;
///
/// assert_eq!(sanitize_title("AC/DC: Live", 0), "AC／DC： Live");
/// assert_eq!(sanitize_title("", 0), "unnamed");
/// ```
pub fn sanitize_title(title: &str, max_len: usize) -> String {
    let mut result = String::with_capacity(title.len());
    for c in title.chars() {
        if let Some(wide) = full_width(c) {
            result.push(wide);
        } else if c.is_control() {
            result.push(' ');
        } else {
            result.push(c);
        }
    }

    let trimmed = result.trim_matches(|c: char| c == ' ' || c == '.');
    if trimmed.is_empty() {
        return "unnamed".to_string();
    }

    let upper = trimmed.to_uppercase();
    let name = if WINDOWS_RESERVED_NAMES
        .iter()
        .any(|reserved| upper == *reserved || upper.starts_with(&format!("{reserved}.")))
    {
        format!("_{trimmed}")
    } else {
        trimmed.to_string()
    };

    if max_len == 0 {
        name
    } else {
        limit_length(&name, max_len)
    }
}

/// Cuts `s` to at most `max_chars` characters, marking the cut with `...`.
pub fn limit_length(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut out: String = s.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}
