use crate::config::tuning::WhitespaceParams;
use crate::geometry::Rect;
use crate::model::Segment;
use crate::text::{char_len, split_paragraphs, word_count};

/// 空行で区切られた複数段落を含むセグメントを分割する。
///
/// 分割できない、または断片が短すぎる場合は元のセグメントを1つだけ返す。
/// 高さは各断片の行数に比例して上から積み、元の下端を越えない。
pub fn split_by_whitespace(seg: Segment, params: &WhitespaceParams) -> Vec<Segment> {
    let parts = split_paragraphs(&seg.text);
    if parts.len() < 2 {
        return vec![seg];
    }

    let acceptable =
        |p: &str| char_len(p) >= params.min_part_chars && word_count(p) >= params.min_part_words;
    if !parts.iter().all(|p| acceptable(p)) {
        return vec![seg];
    }

    let line_counts: Vec<usize> = parts.iter().map(|p| p.lines().count().max(1)).collect();
    let total: usize = line_counts.iter().sum::<usize>().max(1);

    // 各断片は最低1の高さで上から積み、元の下端で止める（最後の断片は下端まで）。
    let bottom = seg.bottom();
    let last = parts.len() - 1;
    let mut spans = Vec::with_capacity(parts.len());
    let mut y = seg.top;
    for (i, lines) in line_counts.iter().enumerate() {
        let h = (seg.height * (*lines as f64 / total as f64)).max(1.0);
        let y1 = if i == last { bottom } else { (y + h).min(bottom) };
        spans.push((y, y1));
        y = y1;
    }
    // 低すぎて全断片に高さを割り当てられない
    if spans.iter().any(|(y0, y1)| y1 <= y0) {
        return vec![seg];
    }

    parts
        .iter()
        .zip(spans)
        .map(|(part, (y0, y1))| seg.derive(Rect::new(seg.left, y0, seg.right(), y1), *part))
        .collect()
}
