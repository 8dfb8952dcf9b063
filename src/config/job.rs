use std::collections::BTreeSet;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    /// レイアウト解析サービスのセグメントJSON
    pub input: String,
    /// 元のPDF（見開き自動判定・deglueに使う）
    pub pdf: Option<String>,
    /// 整形済みPageBatchの出力先JSON
    pub output: String,
    #[serde(default, deserialize_with = "deserialize_optional_pages")]
    pub pages: Option<Vec<u32>>,
    pub split_spreads: Option<bool>,
    pub force_split: Option<bool>,
    /// 強制分割しないページ（例: `"1,3-5,10"`）
    pub force_split_exceptions: Option<String>,
    pub deglue: Option<bool>,
}

/// ページ範囲文字列をパースしてページ番号のベクタに変換する。
///
/// 形式:
/// - 単一ページ: `"5"`
/// - 範囲: `"5-10"` (5, 6, 7, 8, 9, 10)
/// - 混合（カンマ区切り）: `"1, 3, 5-10, 15"`
///
/// 結果はソート済み・重複なし。
pub fn parse_page_range(s: &str) -> crate::error::Result<Vec<u32>> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(crate::error::RefineError::config(
            "Page range cannot be empty",
        ));
    }

    let mut pages = Vec::new();

    for part in trimmed.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start_str, end_str)) = part.split_once('-') {
            let start = parse_page_number(start_str)?;
            let end = parse_page_number(end_str)?;

            if start > end {
                return Err(crate::error::RefineError::config(format!(
                    "Invalid page range: start ({start}) > end ({end})"
                )));
            }

            pages.extend(start..=end);
        } else {
            pages.push(parse_page_number(part)?);
        }
    }

    if pages.is_empty() {
        return Err(crate::error::RefineError::config(
            "Page range resolved to empty set",
        ));
    }

    pages.sort();
    pages.dedup();
    Ok(pages)
}

/// 強制分割の例外ページ集合をパースする。
///
/// `parse_page_range` と同じ書式だが、空文字列は空集合、逆順の範囲は入れ替え、
/// `1..=total_pages` の外は黙って捨てる。数値でない要素だけはエラー。
pub fn parse_page_set(s: &str, total_pages: u32) -> crate::error::Result<BTreeSet<u32>> {
    let mut out = BTreeSet::new();

    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    for part in compact.split(',') {
        if part.is_empty() {
            continue;
        }

        let (lo, hi) = match part.split_once('-') {
            Some((a, b)) => {
                let a = parse_page_number(a)?;
                let b = parse_page_number(b)?;
                (a.min(b), a.max(b))
            }
            None => {
                let p = parse_page_number(part)?;
                (p, p)
            }
        };

        out.extend(lo.max(1)..=hi.min(total_pages));
    }

    Ok(out)
}

fn parse_page_number(s: &str) -> crate::error::Result<u32> {
    s.trim().parse().map_err(|_| {
        crate::error::RefineError::config(format!("Invalid page number: '{}'", s.trim()))
    })
}

/// serdeのdeserialize_withで使用するページ範囲デシリアライザ
fn deserialize_optional_pages<'de, D>(deserializer: D) -> Result<Option<Vec<u32>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) => parse_page_range(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
