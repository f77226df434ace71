// src/ingest/mod.rs
pub mod http;
pub mod providers;
pub mod scheduler;
pub mod types;

use once_cell::sync::OnceCell;
use regex::Regex;

pub use types::{Mode, SourceAdapter};

/// Upper bound on a cleaned title, in chars.
pub const MAX_TITLE_CHARS: usize = 200;

/// Normalize a title: decode entities, strip tags, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Collapse whitespace (incl. NBSP left over from entity decoding)
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"[\s\u{00A0}\u{3000}]+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 4) Length cap
    if out.chars().count() > MAX_TITLE_CHARS {
        out = out.chars().take(MAX_TITLE_CHARS).collect();
    }

    out
}

/// Strip a leading rank marker such as `"3. "` or `"12、"` from a board title.
pub fn strip_rank_prefix(s: &str) -> &str {
    static RE_RANK: OnceCell<Regex> = OnceCell::new();
    let re = RE_RANK.get_or_init(|| Regex::new(r"^\s*\d{1,3}\s*[.、]\s*").expect("rank regex"));
    match re.find(s) {
        Some(m) if m.end() < s.len() => &s[m.end()..],
        _ => s,
    }
}

/// Truncate to `max` chars, appending `...` when something was cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let mut out: String = s.chars().take(max).collect();
        out.push_str("...");
        out
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_collapses_ws_and_strips_tags() {
        let s = "  <b>Hello,&nbsp;&nbsp;</b>\n world!  ";
        assert_eq!(normalize_text(s), "Hello, world!");
    }

    #[test]
    fn normalize_text_caps_length() {
        let long = "字".repeat(MAX_TITLE_CHARS + 20);
        assert_eq!(normalize_text(&long).chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn rank_prefix_is_removed_but_numbers_in_title_survive() {
        assert_eq!(strip_rank_prefix("3. 苹果发布会定档"), "苹果发布会定档");
        assert_eq!(strip_rank_prefix("12、华为Mate70"), "华为Mate70");
        assert_eq!(strip_rank_prefix("GPT-5.0 released"), "GPT-5.0 released");
        assert_eq!(strip_rank_prefix("2024. "), "2024. ");
    }

    #[test]
    fn truncate_chars_marks_cut() {
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }
}
