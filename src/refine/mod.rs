//! 1ページ分の整形パス: 正規化 → ソフト改行除去 → 結合 → 空行分割 → 並べ替え・採番。

pub mod denoise;
pub mod merge;
pub mod whitespace;

use std::ops::AddAssign;

use crate::config::tuning::{MergeTolerances, Tuning};
use crate::geometry::sort_reading_order;
use crate::model::{PageBatch, finalize_page};
use crate::text::clean_text;

/// 整形パスでの結合・分割の回数。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefineStats {
    pub merges: usize,
    pub splits: usize,
}

impl RefineStats {
    /// 回数のどちらかが `threshold` を超えたか。
    pub fn exceeds(&self, threshold: usize) -> bool {
        self.merges > threshold || self.splits > threshold
    }
}

impl AddAssign for RefineStats {
    fn add_assign(&mut self, rhs: Self) {
        self.merges += rhs.merges;
        self.splits += rhs.splits;
    }
}

/// ページを整形した新しい `PageBatch` と回数を返す。入力は変更しない。
pub fn refine_page(
    page: &PageBatch,
    tol: &MergeTolerances,
    tuning: &Tuning,
) -> (PageBatch, RefineStats) {
    let ordered = sort_reading_order(page.segments.clone());
    let Some(page_width) = ordered.first().map(|s| s.page_width) else {
        return (page.clone(), RefineStats::default());
    };

    let cleaned: Vec<_> = ordered
        .iter()
        .map(|s| {
            let text = denoise::denoise_soft_linebreaks(&clean_text(&s.text), &tuning.denoise);
            s.with_text(text)
        })
        .collect();

    let (merged, merges) = merge::merge_pass(cleaned, page_width, tol, tuning);

    let mut splits = 0;
    let mut refined = Vec::with_capacity(merged.len());
    for seg in merged {
        let parts = whitespace::split_by_whitespace(seg, &tuning.whitespace);
        splits += parts.len() - 1;
        refined.extend(parts);
    }

    (
        finalize_page(page, refined),
        RefineStats { merges, splits },
    )
}
