// 隣接セグメント結合判定テスト

use segment_refiner::config::tuning::{MergeTolerances, Tuning};
use segment_refiner::model::Segment;
use segment_refiner::refine::merge::{
    can_merge, hard_break, looks_captionish, looks_headerish, merge_pass, merge_segments,
};

fn seg(left: f64, top: f64, width: f64, height: f64, text: &str) -> Segment {
    Segment {
        page_number: 1,
        left,
        top,
        width,
        height,
        page_width: 600.0,
        page_height: 800.0,
        text: text.to_string(),
        kind: "text".to_string(),
        block_id: 0,
        line_height: None,
    }
}

fn seg_a() -> Segment {
    seg(50.0, 10.0, 500.0, 20.0, "Hello world")
}

fn seg_b() -> Segment {
    seg(52.0, 34.0, 480.0, 20.0, "continues here.")
}

// ============================================================
// 1. 基本シナリオ
// ============================================================

#[test]
fn test_continuation_merges_with_tight_tolerances() {
    let tuning = Tuning::default();
    let tol = MergeTolerances::tight();
    assert!(can_merge(&seg_a(), &seg_b(), 600.0, &tol, &tuning));

    let merged = merge_segments(&seg_a(), &seg_b());
    assert_eq!(merged.text, "Hello world\ncontinues here.");
    assert_eq!(merged.left, 50.0);
    assert_eq!(merged.top, 10.0);
    assert_eq!(merged.right(), 550.0);
    assert_eq!(merged.bottom(), 54.0);
}

#[test]
fn test_caption_refuses_merge() {
    let tuning = Tuning::default();
    let b = seg_b().with_text("Figure 1: caption");
    assert!(looks_captionish(&b, &tuning.caption));
    assert!(!can_merge(
        &seg_a(),
        &b,
        600.0,
        &MergeTolerances::tight(),
        &tuning
    ));
}

// ============================================================
// 2. キャプション・見出し判定
// ============================================================

#[test]
fn test_short_narrow_text_is_captionish() {
    let tuning = Tuning::default();
    let s = seg(50.0, 10.0, 100.0, 20.0, "Short label");
    assert!(looks_captionish(&s, &tuning.caption));
}

#[test]
fn test_short_wide_text_without_line_height_is_not_captionish() {
    let tuning = Tuning::default();
    assert!(!looks_captionish(&seg_a(), &tuning.caption));
}

#[test]
fn test_short_low_text_with_line_height_is_captionish() {
    let tuning = Tuning::default();
    let s = Segment {
        line_height: Some(12.0),
        ..seg_a()
    };
    // 20 < 2.8 * 12
    assert!(looks_captionish(&s, &tuning.caption));
}

#[test]
fn test_caption_type_tag_is_captionish() {
    let tuning = Tuning::default();
    let s = Segment {
        kind: "caption".to_string(),
        ..seg(50.0, 10.0, 500.0, 80.0, &"long caption text ".repeat(10))
    };
    assert!(looks_captionish(&s, &tuning.caption));
}

#[test]
fn test_keyword_must_be_followed_by_non_letter() {
    let tuning = Tuning::default();
    let s = seg(50.0, 10.0, 500.0, 20.0, "Tables are furniture and this sentence is long enough");
    assert!(!looks_captionish(&s, &tuning.caption));
}

#[test]
fn test_heading_by_type_and_question() {
    let tuning = Tuning::default();
    let title = Segment {
        kind: "section_header".to_string(),
        ..seg_a()
    };
    assert!(looks_headerish(&title, &tuning.heading));
    assert!(looks_headerish(
        &seg_a().with_text("What happens next?"),
        &tuning.heading
    ));
    assert!(!looks_headerish(&seg_a(), &tuning.heading));
}

// ============================================================
// 3. ハードブレーク・幾何条件
// ============================================================

#[test]
fn test_sentence_end_is_hard_break() {
    let tuning = Tuning::default();
    let a = seg_a().with_text("Hello world.");
    assert!(hard_break(&a, &seg_b(), &tuning.merge));
    assert!(!can_merge(&a, &seg_b(), 600.0, &MergeTolerances::tight(), &tuning));
}

#[test]
fn test_critical_type_mismatch_is_hard_break() {
    let tuning = Tuning::default();
    let b = Segment {
        kind: "footnote".to_string(),
        ..seg_b()
    };
    assert!(hard_break(&seg_a(), &b, &tuning.merge));
}

#[test]
fn test_non_critical_type_mismatch_is_not_hard_break() {
    let tuning = Tuning::default();
    let b = Segment {
        kind: "list_item".to_string(),
        ..seg_b()
    };
    assert!(!hard_break(&seg_a(), &b, &tuning.merge));
}

#[test]
fn test_empty_text_is_hard_break() {
    let tuning = Tuning::default();
    assert!(hard_break(&seg_a(), &seg_b().with_text("  "), &tuning.merge));
}

#[test]
fn test_segment_starting_above_is_refused() {
    let tuning = Tuning::default();
    let b = seg(52.0, 5.0, 480.0, 20.0, "continues here.");
    assert!(!can_merge(&seg_a(), &b, 600.0, &MergeTolerances::tight(), &tuning));
}

#[test]
fn test_misaligned_left_edge_is_refused() {
    let tuning = Tuning::default();
    let b = seg(70.0, 34.0, 480.0, 20.0, "continues here.");
    assert!(!can_merge(&seg_a(), &b, 600.0, &MergeTolerances::tight(), &tuning));
}

#[test]
fn test_large_vertical_gap_is_refused() {
    let tuning = Tuning::default();
    // gap 20 > max(6, 0.012 * 800)
    let b = seg(52.0, 50.0, 480.0, 20.0, "continues here.");
    assert!(!can_merge(&seg_a(), &b, 600.0, &MergeTolerances::tight(), &tuning));
}

#[test]
fn test_loose_tolerances_accept_wider_gap() {
    let tuning = Tuning::default();
    // gap 10: tight は gap 上限 9.6、loose は 10
    let b = seg(52.0, 40.0, 480.0, 20.0, "continues here.");
    assert!(!can_merge(&seg_a(), &b, 600.0, &MergeTolerances::tight(), &tuning));
    assert!(can_merge(&seg_a(), &b, 600.0, &MergeTolerances::loose(), &tuning));
}

#[test]
fn test_ragged_right_wider_b_is_refused() {
    let tuning = Tuning::default();
    // b の右端が a より外に出る場合は右端条件も ragged 条件も満たさない
    let a = seg(50.0, 10.0, 300.0, 20.0, "Hello world, this line");
    let b = seg(50.0, 34.0, 500.0, 20.0, "keeps going on the next line");
    assert!(!can_merge(&a, &b, 600.0, &MergeTolerances::tight(), &tuning));
}

// ============================================================
// 4. 結合処理・左畳み込み
// ============================================================

#[test]
fn test_merge_keeps_left_operand_attributes() {
    let a = Segment {
        block_id: 3,
        line_height: Some(11.0),
        kind: "paragraph".to_string(),
        ..seg_a()
    };
    let b = Segment {
        block_id: 4,
        line_height: Some(14.0),
        ..seg_b()
    };
    let merged = merge_segments(&a, &b);
    assert_eq!(merged.block_id, 3);
    assert_eq!(merged.line_height, Some(11.0));
    assert_eq!(merged.kind, "paragraph");
}

#[test]
fn test_merge_trims_joined_whitespace() {
    let merged = merge_segments(
        &seg_a().with_text("Hello world   "),
        &seg_b().with_text("   continues here."),
    );
    assert_eq!(merged.text, "Hello world\ncontinues here.");
}

#[test]
fn test_merge_pass_folds_left_to_right() {
    let tuning = Tuning::default();
    let far = seg(50.0, 400.0, 500.0, 20.0, "Another paragraph far below");
    let (merged, count) = merge_pass(
        vec![seg_a(), seg_b(), far],
        600.0,
        &MergeTolerances::tight(),
        &tuning,
    );
    assert_eq!(count, 1);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].text, "Hello world\ncontinues here.");
    assert_eq!(merged[1].text, "Another paragraph far below");
}

#[test]
fn test_merge_pass_is_idempotent() {
    let tuning = Tuning::default();
    let tol = MergeTolerances::tight();
    let far = seg(50.0, 400.0, 500.0, 20.0, "Another paragraph far below");
    let (once, _) = merge_pass(vec![seg_a(), seg_b(), far], 600.0, &tol, &tuning);
    let (twice, count) = merge_pass(once.clone(), 600.0, &tol, &tuning);
    assert_eq!(count, 0);
    assert_eq!(once, twice);
}
