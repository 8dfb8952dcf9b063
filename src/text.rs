//! 本文テキストの正規化と、各ステージが共有する文字列述語。

use std::sync::LazyLock;

use regex::Regex;

/// 箇条書き・番号付きリストの行頭（"• ", "- ", "1. ", "2)" など）。
static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[•·\-–—]|[0-9]+[.)])").expect("valid list marker regex")
});

/// 1文字の大文字で始まる行（ドロップキャップの頭文字）。
static DROPCAP_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[A-ZÀ-ÖØ-ÝА-ЯЁ](?:$|\W)").expect("valid dropcap regex")
});

/// 空行（改行2つ以上、間の空白は問わない）。
static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[^\S\n]*\n\s*").expect("valid blank line regex"));

/// 行内の連続する水平空白。
static HORIZONTAL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("valid whitespace regex"));

/// Removes soft hyphens, turns NBSP into a plain space, collapses horizontal
/// whitespace runs and trims every line. Newlines, blank ones included, are kept.
pub fn clean_text(s: &str) -> String {
    let replaced: String = s
        .chars()
        .filter(|&c| c != '\u{00AD}')
        .map(|c| if c == '\u{00A0}' { ' ' } else { c })
        .collect();
    let normalized = replaced.replace("\r\n", "\n").replace('\r', "\n");

    normalized
        .split('\n')
        .map(|line| HORIZONTAL_WS.replace_all(line, " ").trim().to_string())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// 空白を除いて数字だけからなるか（空文字列は false）。
pub fn is_numeric(s: &str) -> bool {
    let t = s.trim();
    !t.is_empty() && t.chars().all(|c| c.is_ascii_digit())
}

pub fn starts_with_list_marker(s: &str) -> bool {
    LIST_MARKER.is_match(s)
}

pub fn starts_with_dropcap_head(s: &str) -> bool {
    DROPCAP_HEAD.is_match(s)
}

/// 末尾の空白を除いた最後の文字が `set` に含まれるか。
pub fn ends_with_any(s: &str, set: &str) -> bool {
    s.trim_end().chars().last().is_some_and(|c| set.contains(c))
}

/// 末尾がハイフン・ダッシュ類（単語の途中で折り返した行）か。
pub fn ends_with_hyphen(s: &str) -> bool {
    ends_with_any(s, "-‐‑‒–—")
}

/// Splits on blank lines. Parts are trimmed; empty parts are dropped.
pub fn split_paragraphs(s: &str) -> Vec<&str> {
    BLANK_LINE
        .split(s)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// `"Figure 1: ..."` のように、キャプション語で始まり直後が文字でないか。
pub fn starts_with_caption_keyword(s: &str, keywords: &[String]) -> bool {
    let lower = s.trim_start().to_lowercase();
    keywords.iter().any(|kw| {
        let kw = kw.to_lowercase();
        match lower.strip_prefix(kw.as_str()) {
            Some(rest) => rest.chars().next().is_none_or(|c| !c.is_alphabetic()),
            None => false,
        }
    })
}
