use tracing::{debug, warn};

use crate::config::tuning::InvariantParams;
use crate::error::RefineError;
use crate::model::PageBatch;

/// 各ステージ後の幾何条件を検査する。最初の違反で `InvariantError` を返す。
///
/// `context` はエラーメッセージに付けるステージ名。
pub fn assert_layout_invariants(
    pages: &[PageBatch],
    context: &str,
    params: &InvariantParams,
) -> crate::error::Result<()> {
    if pages.is_empty() {
        warn!(context, "layout check on empty page list");
        return Ok(());
    }

    let eps = params.epsilon;
    for pb in pages {
        if pb.page_number == 0 {
            return Err(RefineError::invariant(format!(
                "{context}: invalid page number 0"
            )));
        }

        for (i, s) in pb.segments.iter().enumerate() {
            let fail = |what: &str| {
                Err(RefineError::invariant(format!(
                    "{context}: p{} seg{} {what}",
                    pb.page_number, i
                )))
            };

            if s.page_number != pb.page_number {
                return fail(&format!("belongs to page {}", s.page_number));
            }
            if !positive(s.width) {
                return fail("has width <= 0");
            }
            if !positive(s.height) {
                return fail("has height <= 0");
            }
            if !positive(s.page_width) {
                return fail("has page_width <= 0");
            }
            if !positive(s.page_height) {
                return fail("has page_height <= 0");
            }
            if !non_negative(s.left) {
                return fail("has negative left");
            }
            if !non_negative(s.top) {
                return fail("has negative top");
            }
            if !within(s.right(), s.page_width + eps) {
                return fail("exceeds page width");
            }
            if !within(s.bottom(), s.page_height + eps) {
                return fail("exceeds page height");
            }
            if !s.has_text() {
                return fail("has blank text");
            }
        }
    }

    debug!(context, pages = pages.len(), "layout invariants OK");
    Ok(())
}

/// NaN も不正として扱う。
fn positive(v: f64) -> bool {
    v > 0.0
}

/// NaN も不正として扱う。
fn non_negative(v: f64) -> bool {
    v >= 0.0
}

fn within(v: f64, limit: f64) -> bool {
    v <= limit
}
