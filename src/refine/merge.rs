//! 隣接セグメントの結合判定と結合処理。
//!
//! 判定は読み順で隣り合う2つ (`a` が先、`b` が後) だけを見る。先読みはしない。

use crate::config::tuning::{CaptionParams, HeadingParams, MergeParams, MergeTolerances, Tuning};
use crate::model::Segment;
use crate::text::{char_len, ends_with_any, starts_with_caption_keyword, word_count};

/// 図表キャプションらしいか。
///
/// 型タグに `caption` を含むもの、キャプション語で始まる短文、または
/// 短く（文字数・語数とも上限以下）かつ「行高の数倍より低い」か「ページ幅の
/// 一定割合より狭い」もの。行高が不明なら高さの条件は使わない。
pub fn looks_captionish(s: &Segment, params: &CaptionParams) -> bool {
    if s.kind.contains("caption") {
        return true;
    }

    let text = s.text.trim();
    let len = char_len(text);
    if len == 0 {
        return false;
    }

    if len <= params.keyword_max_chars && starts_with_caption_keyword(text, &params.keywords) {
        return true;
    }

    if len > params.max_chars || word_count(text) > params.max_words {
        return false;
    }

    let low = s
        .line_height
        .or(params.default_line_height)
        .is_some_and(|lh| s.height < params.line_height_factor * lh);
    let narrow = s.width < params.max_width_frac * s.page_width;
    low || narrow
}

/// 見出しらしいか（型タグ、または短い疑問文）。
pub fn looks_headerish(s: &Segment, params: &HeadingParams) -> bool {
    if params
        .type_markers
        .iter()
        .any(|m| s.kind.contains(m.as_str()))
    {
        return true;
    }
    let text = s.text.trim();
    text.ends_with('?') && char_len(text) < params.question_max_chars
}

/// 幾何条件に関係なく結合を拒否すべき境界か。
pub fn hard_break(a: &Segment, b: &Segment, params: &MergeParams) -> bool {
    if !a.has_text() || !b.has_text() {
        return true;
    }

    if a.kind != b.kind {
        let critical = |k: &str| params.critical_types.iter().any(|c| c == k);
        if critical(&a.kind) || critical(&b.kind) {
            return true;
        }
    }

    ends_with_any(&a.text, &params.end_punctuation)
}

/// `a` の直後に `b` を結合してよいか。
pub fn can_merge(
    a: &Segment,
    b: &Segment,
    page_width: f64,
    tol: &MergeTolerances,
    tuning: &Tuning,
) -> bool {
    if looks_captionish(a, &tuning.caption) || looks_captionish(b, &tuning.caption) {
        return false;
    }
    if looks_headerish(a, &tuning.heading) || looks_headerish(b, &tuning.heading) {
        return false;
    }

    let p = &tuning.merge;
    if hard_break(a, b, p) {
        return false;
    }

    // b が a より明らかに上から始まるなら別ブロック
    if b.top < a.top - p.vertical_tolerance {
        return false;
    }

    let left_close = (a.left - b.left).abs() <= tol.x_left.max(p.left_page_frac * page_width);
    if !left_close {
        return false;
    }

    let right_close =
        (a.right() - b.right()).abs() <= tol.x_right.max(p.right_page_frac * page_width);
    let min_width = a.width.min(b.width).max(1.0);
    let ragged_continuation = a.rect().x_overlap(&b.rect()) >= p.overlap_ratio * min_width
        && b.right() <= a.right() - p.right_shrink_frac * page_width;
    if !(right_close || ragged_continuation) {
        return false;
    }

    let gap = (b.top - a.bottom()).max(0.0);
    if gap > tol.gap.max(p.gap_page_frac * a.page_height) {
        return false;
    }

    (a.center_x() - b.center_x()).abs() <= p.max_center_dx_frac * page_width
}

/// 2つのセグメントを1つにする。矩形は和、本文は改行1つで連結。
/// 型・block_id・行高は `a` のものを引き継ぐ。
pub fn merge_segments(a: &Segment, b: &Segment) -> Segment {
    let rect = a.rect().union(&b.rect());
    let text = format!("{}\n{}", a.text.trim_end(), b.text.trim_start())
        .trim()
        .to_string();
    Segment {
        block_id: a.block_id,
        ..a.derive(rect, text)
    }
}

/// 読み順に並んだセグメント列を左畳み込みで結合する。戻り値の2つ目は結合回数。
pub fn merge_pass(
    segments: Vec<Segment>,
    page_width: f64,
    tol: &MergeTolerances,
    tuning: &Tuning,
) -> (Vec<Segment>, usize) {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    let mut count = 0;

    for s in segments {
        match merged.last_mut() {
            Some(acc) if can_merge(acc, &s, page_width, tol, tuning) => {
                *acc = merge_segments(acc, &s);
                count += 1;
            }
            _ => merged.push(s),
        }
    }

    (merged, count)
}
