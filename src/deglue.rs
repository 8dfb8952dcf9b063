//! 元PDFの行情報を使って、くっついた段落を切り直す（deglue）。
//!
//! 解析サービスが1つにまとめてしまった大きなセグメントについて、
//! 矩形内の実際の行の間隔・フォントサイズ・太字・字下げから段落境界を推定する。
//! 判断できない場合は常に元のセグメントをそのまま返す。

use std::ops::AddAssign;

use crate::config::tuning::DeglueParams;
use crate::geometry::Rect;
use crate::model::{PageBatch, Segment, finalize_page};
use crate::source::{SourceDocument, TextLine};
use crate::text::{char_len, ends_with_any, ends_with_hyphen, starts_with_dropcap_head};

/// 段落末とみなす句読点。
const PARAGRAPH_END: &str = ".!?…:;";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeglueStats {
    /// 2つ以上に切り分けたセグメント数
    pub segments_split: usize,
    /// 切り分けで増えたセグメント数
    pub parts_added: usize,
    /// ドロップキャップとして素通ししたセグメント数
    pub dropcaps: usize,
    /// 元文書に対応ページが無く素通ししたページ数
    pub pages_missing: usize,
}

impl AddAssign for DeglueStats {
    fn add_assign(&mut self, rhs: Self) {
        self.segments_split += rhs.segments_split;
        self.parts_added += rhs.parts_added;
        self.dropcaps += rhs.dropcaps;
        self.pages_missing += rhs.pages_missing;
    }
}

/// 切り直しを試みるほど大きいセグメントか。
pub fn is_deglue_candidate(s: &Segment, params: &DeglueParams) -> bool {
    let len = char_len(&s.text);
    let line_height = s.line_height.unwrap_or(params.fallback_line_height);
    let tall = s.height > params.min_height.max(params.line_height_factor * line_height);
    let very_wide = s.width > params.wide_frac * s.page_width && len > params.wide_min_chars;
    (len > params.min_chars && tall) || very_wide
}

/// 中心が `rect` 内にある行だけを残す。
pub fn lines_in_rect(lines: &[TextLine], rect: &Rect, tol: f64) -> Vec<TextLine> {
    lines
        .iter()
        .filter(|l| {
            let r = l.rect();
            rect.contains_point(r.center_x(), r.center_y(), tol)
        })
        .cloned()
        .collect()
}

/// 先頭行がドロップキャップ（大きな1文字の頭文字）か。
pub fn looks_like_dropcap(lines: &[TextLine], params: &DeglueParams) -> bool {
    let [first, second, ..] = lines else {
        return false;
    };

    let h1 = first.height().max(1.0);
    let h2 = second.height().max(1.0);
    let tall = h1 >= h2 * params.dropcap_height_ratio;
    let big_font = first.font_size > 0.0
        && second.font_size > 0.0
        && first.font_size >= second.font_size * params.dropcap_font_ratio;

    (tall || big_font) && starts_with_dropcap_head(first.text.trim())
}

/// 隣接行の間隔 (`gaps[i]` は行 `i` と `i + 1` の間)。負の値は 0。
pub fn line_gaps(lines: &[TextLine]) -> Vec<f64> {
    lines
        .windows(2)
        .map(|w| (w[1].y0 - w[0].y1).max(0.0))
        .collect()
}

/// `gaps[idx]` の前後 `k` 個を含む窓の中央値。偶数個なら中央2つの平均。
pub fn local_median_gap(gaps: &[f64], idx: usize, k: usize) -> f64 {
    if gaps.is_empty() {
        return 0.0;
    }
    let lo = idx.saturating_sub(k);
    let hi = (idx + k).min(gaps.len() - 1);
    if lo > hi {
        return 0.0;
    }

    let mut window = gaps[lo..=hi].to_vec();
    window.sort_by(f64::total_cmp);
    let n = window.len();
    if n % 2 == 1 {
        window[n / 2]
    } else {
        0.5 * (window[n / 2 - 1] + window[n / 2])
    }
}

/// `prev` と `curr` の間（`gaps[idx]`）で段落を切るか。
///
/// 局所中央値に対して大きな間隔があり、かつ構造上の合図（句読点での行末、
/// フォントサイズの変化、太字の切り替わり、字下げの変化）のどれかを伴うときだけ切る。
/// `prev` がハイフンで終わる場合は何があっても切らない。
pub fn should_break(
    prev: &TextLine,
    curr: &TextLine,
    gaps: &[f64],
    idx: usize,
    params: &DeglueParams,
) -> bool {
    if ends_with_hyphen(&prev.text) {
        return false;
    }

    let gap = (curr.y0 - prev.y1).max(0.0);
    let median = local_median_gap(gaps, idx, params.window);

    let big_gap = gap > (median * params.gap_factor).max(params.min_big_gap);
    if !big_gap {
        return false;
    }

    let punct_break = ends_with_any(&prev.text, PARAGRAPH_END)
        && gap >= (median * params.punct_gap_factor).max(params.min_punct_gap);
    let size_jump = prev.font_size > 0.0
        && curr.font_size > 0.0
        && (curr.font_size - prev.font_size).abs() / prev.font_size.max(curr.font_size)
            > params.size_change;
    let bold_flip = prev.bold != curr.bold;
    let indent_jump = (curr.x0 - prev.x0).abs() > params.indent_tolerance;

    punct_break || size_jump || bold_flip || indent_jump
}

/// セグメントを行の塊ごとに切り分ける。
///
/// `lines` はセグメント矩形内の行（セグメント座標系、`(y0, x0)` 順）。
/// 2行未満、ドロップキャップ、切れ目なしの場合は元のセグメント1つを返す。
/// 断片の矩形は `seg` の矩形からはみ出さない。
pub fn deglue_segment(seg: &Segment, lines: &[TextLine], params: &DeglueParams) -> Vec<Segment> {
    if lines.len() < 2 || looks_like_dropcap(lines, params) {
        return vec![seg.clone()];
    }

    let gaps = line_gaps(lines);
    let mut runs: Vec<&[TextLine]> = Vec::new();
    let mut start = 0;
    for i in 1..lines.len() {
        if should_break(&lines[i - 1], &lines[i], &gaps, i - 1, params) {
            runs.push(&lines[start..i]);
            start = i;
        }
    }
    runs.push(&lines[start..]);

    if runs.len() < 2 {
        return vec![seg.clone()];
    }

    // 各断片の矩形は元のセグメント内に切り詰める。潰れる断片があれば切らない。
    let bounds = seg.rect();
    let mut parts = Vec::with_capacity(runs.len());
    for run in runs {
        let text = run
            .iter()
            .map(|l| l.text.trim_end())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();
        if text.is_empty() {
            continue;
        }
        let union = run
            .iter()
            .skip(1)
            .fold(run[0].rect(), |acc, l| acc.union(&l.rect()));
        let Some(rect) = union.intersection(&bounds) else {
            return vec![seg.clone()];
        };
        parts.push(seg.derive(rect, text));
    }

    if parts.len() < 2 {
        vec![seg.clone()]
    } else {
        parts
    }
}

/// 1ページ分のdeglue。元文書に対応ページが無ければそのまま返す。
pub fn deglue_page(
    page: &PageBatch,
    doc: &dyn SourceDocument,
    params: &DeglueParams,
) -> (PageBatch, DeglueStats) {
    let mut stats = DeglueStats::default();

    let source = doc
        .page_size(page.page_number)
        .and_then(|size| Ok((size, doc.text_lines(page.page_number)?)));
    let ((pdf_width, _), pdf_lines) = match source {
        Ok(v) => v,
        Err(_) => {
            stats.pages_missing = 1;
            return (page.clone(), stats);
        }
    };

    let mut out = Vec::with_capacity(page.segments.len());
    for seg in crate::geometry::sort_reading_order(page.segments.clone()) {
        if pdf_width <= 0.0 || seg.page_width <= 0.0 {
            out.push(seg);
            continue;
        }

        let scale = seg.page_width / pdf_width;
        let lines: Vec<TextLine> = pdf_lines.iter().map(|l| l.scaled(scale)).collect();
        let clipped = lines_in_rect(&lines, &seg.rect(), params.clip_tolerance);

        if looks_like_dropcap(&clipped, params) {
            stats.dropcaps += 1;
            out.push(seg);
            continue;
        }
        if !is_deglue_candidate(&seg, params) {
            out.push(seg);
            continue;
        }

        let parts = deglue_segment(&seg, &clipped, params);
        if parts.len() > 1 {
            stats.segments_split += 1;
            stats.parts_added += parts.len() - 1;
        }
        out.extend(parts);
    }

    (finalize_page(page, out), stats)
}

pub fn deglue_pages(
    pages: Vec<PageBatch>,
    doc: &dyn SourceDocument,
    params: &DeglueParams,
) -> (Vec<PageBatch>, DeglueStats) {
    let mut total = DeglueStats::default();
    let out = pages
        .iter()
        .map(|pb| {
            let (refined, stats) = deglue_page(pb, doc, params);
            total += stats;
            refined
        })
        .collect();
    (out, total)
}
