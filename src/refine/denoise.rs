//! 折り返しによる改行（ソフト改行）を1行に戻す。

use crate::config::tuning::DenoiseParams;
use crate::text::{char_len, ends_with_any, is_numeric, starts_with_list_marker};

/// 結合の閾値: 非空行の長さの中央値 × 係数 と下限の大きい方（上書き指定があればそれ）。
pub fn merge_threshold(lines: &[&str], params: &DenoiseParams) -> usize {
    if let Some(t) = params.threshold_override.filter(|&t| t > 0) {
        return t;
    }

    let mut lens: Vec<usize> = lines
        .iter()
        .map(|l| char_len(l.trim()))
        .filter(|&n| n > 0)
        .collect();
    lens.sort_unstable();
    let median = lens.get(lens.len() / 2).copied().unwrap_or(params.empty_median);

    params
        .min_threshold
        .max((params.median_factor * median as f64) as usize)
}

pub fn denoise_soft_linebreaks(text: &str, params: &DenoiseParams) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    if lines.is_empty() {
        return text.to_string();
    }

    let threshold = merge_threshold(&lines, params);
    let mut out: Vec<String> = Vec::with_capacity(lines.len());

    for line in lines {
        if let Some(prev) = out.last_mut()
            && !line.is_empty()
            && !prev.is_empty()
            && char_len(prev) < threshold
            && !ends_with_any(prev, &params.sentence_end)
            && !starts_with_list_marker(line)
            && !is_numeric(prev)
            && !is_numeric(line)
            && char_len(line) > params.min_line_chars
        {
            let joined = format!("{} {}", prev.trim_end(), line.trim_start());
            *prev = joined;
            continue;
        }
        out.push(line.to_string());
    }

    out.join("\n")
}
