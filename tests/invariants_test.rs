// レイアウト不変条件チェックテスト

use segment_refiner::config::tuning::InvariantParams;
use segment_refiner::error::RefineError;
use segment_refiner::invariants::assert_layout_invariants;
use segment_refiner::model::{PageBatch, Segment};

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
        block_id: 1,
        line_height: None,
    }
}

fn check(segments: Vec<Segment>) -> segment_refiner::error::Result<()> {
    assert_layout_invariants(
        &[PageBatch::new(1, segments)],
        "test_stage",
        &InvariantParams::default(),
    )
}

#[test]
fn test_valid_layout_passes() {
    assert!(check(vec![seg(10.0, 10.0, 500.0, 40.0, "ok")]).is_ok());
}

#[test]
fn test_empty_page_list_passes() {
    assert!(assert_layout_invariants(&[], "test_stage", &InvariantParams::default()).is_ok());
}

#[test]
fn test_zero_width_fails_with_context() {
    let err = check(vec![seg(10.0, 10.0, 0.0, 40.0, "zero")]).unwrap_err();
    assert!(matches!(err, RefineError::InvariantError(_)));
    let msg = err.to_string();
    assert!(msg.contains("test_stage"));
    assert!(msg.contains("p1 seg0"));
}

#[test]
fn test_right_edge_tolerance() {
    // page_width 600、許容 1.0
    assert!(check(vec![seg(100.0, 10.0, 500.5, 40.0, "edge")]).is_ok());
    assert!(check(vec![seg(100.0, 10.0, 501.5, 40.0, "over")]).is_err());
}

#[test]
fn test_bottom_edge_violation_fails() {
    assert!(check(vec![seg(10.0, 700.0, 100.0, 120.0, "low")]).is_err());
}

#[test]
fn test_negative_top_fails() {
    assert!(check(vec![seg(10.0, -2.0, 100.0, 20.0, "neg")]).is_err());
}

#[test]
fn test_blank_text_fails() {
    assert!(check(vec![seg(10.0, 10.0, 100.0, 20.0, "   ")]).is_err());
}

#[test]
fn test_nan_height_fails() {
    assert!(check(vec![seg(10.0, 10.0, 100.0, f64::NAN, "nan")]).is_err());
}

#[test]
fn test_nan_position_fails() {
    assert!(check(vec![seg(f64::NAN, 10.0, 100.0, 20.0, "nan left")]).is_err());
    assert!(check(vec![seg(10.0, f64::NAN, 100.0, 20.0, "nan top")]).is_err());
}

#[test]
fn test_page_zero_fails() {
    let err = assert_layout_invariants(
        &[PageBatch::new(0, Vec::new())],
        "test_stage",
        &InvariantParams::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RefineError::InvariantError(_)));
}

#[test]
fn test_segment_on_wrong_page_fails() {
    let s = Segment {
        page_number: 2,
        ..seg(10.0, 10.0, 100.0, 20.0, "moved")
    };
    assert!(check(vec![s]).is_err());
}
