//! 見開き（左右2ページを1枚にスキャンしたページ）の分割。
//!
//! 分割後のセグメントは元ページの座標系のまま（`page_width` も元の値）。
//! どちらの半分かは `PageBatch::logical_side` で区別する。

use std::collections::BTreeSet;
use std::ops::AddAssign;

use crate::config::tuning::SpreadParams;
use crate::model::{LogicalSide, PageBatch, Segment, finalize_page};
use crate::source::SourceDocument;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitStats {
    /// L/R に分割したページ数
    pub pages_split: usize,
    /// 縦長で見開きではないと判定したページ数
    pub not_spread: usize,
    /// 中央をまたぐ幅広ブロックがあり分割しなかったページ数
    pub kept_whole: usize,
    /// 元文書に対応ページが無い、高さ0、またはブロックを読めず素通ししたページ数
    pub skipped: usize,
}

impl AddAssign for SplitStats {
    fn add_assign(&mut self, rhs: Self) {
        self.pages_split += rhs.pages_split;
        self.not_spread += rhs.not_spread;
        self.kept_whole += rhs.kept_whole;
        self.skipped += rhs.skipped;
    }
}

/// 中心が `mid_x` 以下なら左、超えれば右に振り分け、それぞれ並べ替えて採番する。
pub fn bisect(page: &PageBatch, mid_x: f64) -> [PageBatch; 2] {
    let (left, right): (Vec<Segment>, Vec<Segment>) = page
        .segments
        .iter()
        .cloned()
        .partition(|s| s.center_x() <= mid_x);

    let mut l = finalize_page(page, left);
    l.logical_side = Some(LogicalSide::Left);
    let mut r = finalize_page(page, right);
    r.logical_side = Some(LogicalSide::Right);
    [l, r]
}

/// 元文書のページ形状から見開きを判定して分割する。
///
/// 横長（幅/高さが閾値以上）で、中央をまたぐ幅広のブロックが無いページだけを分割する。
/// すでに L/R が付いたページ、元文書に無いページ、高さ0のページ、
/// レイアウトブロックを取得できないページはそのまま通す。
pub fn split_spreads(
    pages: Vec<PageBatch>,
    doc: &dyn SourceDocument,
    params: &SpreadParams,
) -> (Vec<PageBatch>, SplitStats) {
    let mut stats = SplitStats::default();
    let mut out = Vec::with_capacity(pages.len());

    for pb in pages {
        if pb.logical_side.is_some() {
            out.push(pb);
            continue;
        }

        let (w, h) = match doc.page_size(pb.page_number) {
            Ok(size) => size,
            Err(_) => {
                stats.skipped += 1;
                out.push(pb);
                continue;
            }
        };
        if h <= 0.0 || w <= 0.0 {
            stats.skipped += 1;
            out.push(pb);
            continue;
        }

        if w / h < params.ratio_threshold {
            stats.not_spread += 1;
            out.push(pb);
            continue;
        }

        let pdf_mid = 0.5 * w;
        // ブロックが読めなければ判定できないので分割しない
        let Ok(blocks) = doc.layout_blocks(pb.page_number) else {
            stats.skipped += 1;
            out.push(pb);
            continue;
        };
        let central_wide = blocks.iter().any(|b| {
            b.width() >= params.central_width_frac * w && b.x0 < pdf_mid && pdf_mid < b.x1
        });
        if central_wide {
            stats.kept_whole += 1;
            out.push(pb);
            continue;
        }

        // セグメント座標系での中央（セグメントが無ければ元文書の値）
        let mid_x = pb.page_width().map_or(pdf_mid, |pw| 0.5 * pw);
        stats.pages_split += 1;
        out.extend(bisect(&pb, mid_x));
    }

    (out, stats)
}

/// 形状を見ずに全ページを中央で分割する。
///
/// `exceptions` に含まれるページとセグメントの無いページはそのまま通す。
/// 中央は先頭セグメントの `page_width` の半分。
pub fn split_spreads_force_half(
    pages: Vec<PageBatch>,
    exceptions: &BTreeSet<u32>,
) -> (Vec<PageBatch>, SplitStats) {
    let mut stats = SplitStats::default();
    let mut out = Vec::with_capacity(pages.len() * 2);

    for pb in pages {
        let mid_x = match pb.page_width() {
            Some(pw) if !exceptions.contains(&pb.page_number) && pb.logical_side.is_none() => {
                0.5 * pw
            }
            _ => {
                stats.skipped += 1;
                out.push(pb);
                continue;
            }
        };
        stats.pages_split += 1;
        out.extend(bisect(&pb, mid_x));
    }

    (out, stats)
}
