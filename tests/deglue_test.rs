// 元PDFの行情報による段落の切り直し（deglue）テスト

use segment_refiner::config::tuning::DeglueParams;
use segment_refiner::deglue::{
    deglue_page, deglue_pages, deglue_segment, is_deglue_candidate, line_gaps, lines_in_rect,
    local_median_gap, looks_like_dropcap, should_break,
};
use segment_refiner::geometry::Rect;
use segment_refiner::model::{PageBatch, Segment};
use segment_refiner::source::{MemoryDocument, MemoryPage, TextLine};

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

fn line(x0: f64, y0: f64, x1: f64, y1: f64, text: &str, font_size: f64) -> TextLine {
    TextLine {
        x0,
        y0,
        x1,
        y1,
        text: text.to_string(),
        font_size,
        bold: false,
    }
}

/// 行間 [2, 12, 2]。2行目が句点で終わる。
fn two_paragraph_lines() -> Vec<TextLine> {
    vec![
        line(50.0, 100.0, 500.0, 110.0, "Opening line of text", 10.0),
        line(50.0, 112.0, 300.0, 122.0, "ends here.", 10.0),
        line(50.0, 134.0, 500.0, 144.0, "New paragraph begins", 10.0),
        line(50.0, 146.0, 400.0, 156.0, "and continues on", 10.0),
    ]
}

fn long_text() -> String {
    "glued paragraph text ".repeat(8)
}

// ============================================================
// 1. 候補判定・行の切り出し
// ============================================================

#[test]
fn test_long_tall_segment_is_candidate() {
    let params = DeglueParams::default();
    assert!(is_deglue_candidate(
        &seg(40.0, 90.0, 300.0, 80.0, &long_text()),
        &params
    ));
}

#[test]
fn test_short_segment_is_not_candidate() {
    let params = DeglueParams::default();
    assert!(!is_deglue_candidate(
        &seg(40.0, 90.0, 300.0, 80.0, "Just a few words"),
        &params
    ));
    // 長くても低いものは対象外
    assert!(!is_deglue_candidate(
        &seg(40.0, 90.0, 300.0, 20.0, &long_text()),
        &params
    ));
}

#[test]
fn test_very_wide_segment_is_candidate() {
    let params = DeglueParams::default();
    let text = "wide text ".repeat(9);
    assert!(is_deglue_candidate(
        &seg(40.0, 90.0, 500.0, 12.0, &text),
        &params
    ));
}

#[test]
fn test_lines_in_rect_uses_line_center() {
    let lines = vec![
        line(50.0, 100.0, 150.0, 110.0, "inside", 10.0),
        line(50.0, 195.0, 150.0, 215.0, "straddles bottom edge", 10.0),
        line(50.0, 300.0, 150.0, 310.0, "outside", 10.0),
    ];
    let rect = Rect::new(40.0, 90.0, 560.0, 200.0);
    let kept = lines_in_rect(&lines, &rect, 1.0);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].text, "inside");
}

// ============================================================
// 2. 区切り判定
// ============================================================

#[test]
fn test_local_median_even_window_averages_middle() {
    let gaps = [1.0, 2.0, 3.0, 4.0];
    assert_eq!(local_median_gap(&gaps, 0, 1), 1.5);
    assert_eq!(local_median_gap(&gaps, 1, 1), 2.0);
    assert_eq!(local_median_gap(&gaps, 2, 5), 2.5);
    assert_eq!(local_median_gap(&[], 0, 5), 0.0);
}

#[test]
fn test_line_gaps_clamps_overlap() {
    let lines = vec![
        line(0.0, 0.0, 10.0, 10.0, "a", 10.0),
        line(0.0, 8.0, 10.0, 18.0, "b", 10.0),
        line(0.0, 21.0, 10.0, 31.0, "c", 10.0),
    ];
    assert_eq!(line_gaps(&lines), vec![0.0, 3.0]);
}

#[test]
fn test_break_after_sentence_end_with_big_gap() {
    let params = DeglueParams::default();
    let lines = two_paragraph_lines();
    let gaps = line_gaps(&lines);
    assert_eq!(gaps, vec![2.0, 12.0, 2.0]);
    assert!(!should_break(&lines[0], &lines[1], &gaps, 0, &params));
    assert!(should_break(&lines[1], &lines[2], &gaps, 1, &params));
    assert!(!should_break(&lines[2], &lines[3], &gaps, 2, &params));
}

#[test]
fn test_hyphenated_line_never_breaks() {
    let params = DeglueParams::default();
    let mut lines = two_paragraph_lines();
    lines[1].text = "ends with hyph-".to_string();
    lines[2].bold = true;
    let gaps = line_gaps(&lines);
    assert!(!should_break(&lines[1], &lines[2], &gaps, 1, &params));
}

#[test]
fn test_big_gap_without_structural_signal_does_not_break() {
    let params = DeglueParams::default();
    let mut lines = two_paragraph_lines();
    lines[1].text = "ends here".to_string();
    let gaps = line_gaps(&lines);
    assert!(!should_break(&lines[1], &lines[2], &gaps, 1, &params));
}

#[test]
fn test_font_size_change_breaks() {
    let params = DeglueParams::default();
    let mut lines = two_paragraph_lines();
    lines[1].text = "ends here".to_string();
    lines[2].font_size = 14.0;
    let gaps = line_gaps(&lines);
    assert!(should_break(&lines[1], &lines[2], &gaps, 1, &params));
}

#[test]
fn test_indent_change_breaks() {
    let params = DeglueParams::default();
    let mut lines = two_paragraph_lines();
    lines[1].text = "ends here".to_string();
    lines[2].x0 = 70.0;
    let gaps = line_gaps(&lines);
    assert!(should_break(&lines[1], &lines[2], &gaps, 1, &params));
}

#[test]
fn test_bold_flip_breaks() {
    let params = DeglueParams::default();
    let mut lines = two_paragraph_lines();
    lines[1].text = "ends here".to_string();
    lines[2].bold = true;
    lines[3].bold = true;
    let gaps = line_gaps(&lines);
    assert!(should_break(&lines[1], &lines[2], &gaps, 1, &params));
    assert!(!should_break(&lines[2], &lines[3], &gaps, 2, &params));
}

/// 行間が `gaps` になるように10pt高の行を積む。各行は句点で終わる。
fn lines_with_gaps(gaps: &[f64]) -> Vec<TextLine> {
    let mut y = 100.0;
    let mut lines = vec![line(50.0, y, 500.0, y + 10.0, "Sentence ends.", 10.0)];
    for g in gaps {
        y += 10.0 + g;
        lines.push(line(50.0, y, 500.0, y + 10.0, "Sentence ends.", 10.0));
    }
    lines
}

#[test]
fn test_local_window_differs_from_page_median() {
    // 前半は行間 2 の詰まった領域、後半は行間 6 の広い領域。
    // 前半の 6 は周囲に比べて大きく、後半の 6 は普通。
    let mut gaps = vec![2.0; 8];
    gaps[3] = 6.0;
    gaps.extend(vec![6.0; 9]);
    let lines = lines_with_gaps(&gaps);
    assert_eq!(line_gaps(&lines), gaps);

    let params = DeglueParams::default();
    assert_eq!(local_median_gap(&gaps, 3, params.window), 2.0);
    assert_eq!(local_median_gap(&gaps, 13, params.window), 6.0);
    assert!(should_break(&lines[3], &lines[4], &gaps, 3, &params));
    assert!(!should_break(&lines[13], &lines[14], &gaps, 13, &params));

    // 窓をページ全体に広げると中央値は 6 になり、前半でも切れない
    let page_wide = DeglueParams {
        window: gaps.len(),
        ..DeglueParams::default()
    };
    assert_eq!(local_median_gap(&gaps, 3, page_wide.window), 6.0);
    assert!(!should_break(&lines[3], &lines[4], &gaps, 3, &page_wide));
}

// ============================================================
// 3. セグメントの切り直し
// ============================================================

#[test]
fn test_deglue_segment_splits_at_paragraph_boundary() {
    let params = DeglueParams::default();
    let s = Segment {
        block_id: 4,
        ..seg(40.0, 90.0, 520.0, 80.0, &long_text())
    };
    let parts = deglue_segment(&s, &two_paragraph_lines(), &params);
    assert_eq!(parts.len(), 2);

    assert_eq!(parts[0].text, "Opening line of text\nends here.");
    assert_eq!(parts[0].left, 50.0);
    assert_eq!(parts[0].top, 100.0);
    assert_eq!(parts[0].right(), 500.0);
    assert_eq!(parts[0].bottom(), 122.0);

    assert_eq!(parts[1].text, "New paragraph begins\nand continues on");
    assert_eq!(parts[1].top, 134.0);
    assert_eq!(parts[1].bottom(), 156.0);

    assert!(parts.iter().all(|p| p.kind == "text" && p.page_width == 600.0));
}

#[test]
fn test_deglued_parts_stay_inside_segment() {
    let params = DeglueParams::default();
    // 幅情報の無いフォントで行幅が過大に見積もられ、ページ右端 (600) を越える
    let mut lines = two_paragraph_lines();
    lines[0].x1 = 630.0;
    lines[2].x1 = 630.0;
    let s = seg(40.0, 90.0, 555.0, 80.0, &long_text());

    let parts = deglue_segment(&s, &lines, &params);
    assert_eq!(parts.len(), 2);
    for p in &parts {
        assert!(p.left >= s.left && p.right() <= s.right());
        assert!(p.top >= s.top && p.bottom() <= s.bottom());
        assert!(p.right() <= p.page_width);
    }
    assert_eq!(parts[0].right(), 595.0);
}

#[test]
fn test_dropcap_segment_is_unchanged() {
    let params = DeglueParams::default();
    let lines = vec![
        line(50.0, 100.0, 66.0, 120.0, "A", 24.0),
        line(70.0, 101.0, 500.0, 111.0, "long time ago the story began", 10.0),
        line(70.0, 124.0, 500.0, 134.0, "New paragraph begins", 10.0),
    ];
    assert!(looks_like_dropcap(&lines, &params));

    let s = seg(40.0, 90.0, 520.0, 80.0, &long_text());
    assert_eq!(deglue_segment(&s, &lines, &params), vec![s.clone()]);
}

#[test]
fn test_single_line_segment_is_unchanged() {
    let params = DeglueParams::default();
    let s = seg(40.0, 90.0, 520.0, 80.0, &long_text());
    let lines = vec![line(50.0, 100.0, 500.0, 110.0, "only line", 10.0)];
    assert_eq!(deglue_segment(&s, &lines, &params), vec![s.clone()]);
}

// ============================================================
// 4. ページ単位
// ============================================================

#[test]
fn test_deglue_page_with_same_scale() {
    let params = DeglueParams::default();
    let doc = MemoryDocument::new().with_page(
        1,
        MemoryPage {
            width: 600.0,
            height: 800.0,
            lines: two_paragraph_lines(),
            images: Vec::new(),
        },
    );
    let page = PageBatch::new(1, vec![seg(40.0, 90.0, 520.0, 80.0, &long_text())]);

    let (out, stats) = deglue_page(&page, &doc, &params);
    assert_eq!(out.segments.len(), 2);
    assert_eq!(out.segments[0].block_id, 1);
    assert_eq!(out.segments[1].block_id, 2);
    assert_eq!(stats.segments_split, 1);
    assert_eq!(stats.parts_added, 1);
    assert_eq!(stats.pages_missing, 0);
}

#[test]
fn test_deglue_page_scales_pdf_lines_to_segment_space() {
    let params = DeglueParams::default();
    // PDFは半分の大きさ。行を2倍すると two_paragraph_lines と一致する
    let half: Vec<TextLine> = two_paragraph_lines()
        .iter()
        .map(|l| l.scaled(0.5))
        .collect();
    let doc = MemoryDocument::new().with_page(
        1,
        MemoryPage {
            width: 300.0,
            height: 400.0,
            lines: half,
            images: Vec::new(),
        },
    );
    let page = PageBatch::new(1, vec![seg(40.0, 90.0, 520.0, 80.0, &long_text())]);

    let (out, stats) = deglue_page(&page, &doc, &params);
    assert_eq!(stats.segments_split, 1);
    assert_eq!(out.segments.len(), 2);
    assert_eq!(out.segments[1].top, 134.0);
}

#[test]
fn test_deglue_page_counts_dropcaps() {
    let params = DeglueParams::default();
    let doc = MemoryDocument::new().with_page(
        1,
        MemoryPage {
            width: 600.0,
            height: 800.0,
            lines: vec![
                line(50.0, 100.0, 66.0, 120.0, "A", 24.0),
                line(70.0, 101.0, 500.0, 111.0, "long time ago the story began", 10.0),
            ],
            images: Vec::new(),
        },
    );
    let page = PageBatch::new(1, vec![seg(40.0, 90.0, 520.0, 80.0, &long_text())]);

    let (out, stats) = deglue_page(&page, &doc, &params);
    assert_eq!(stats.dropcaps, 1);
    assert_eq!(out.segments.len(), 1);
    assert_eq!(out.segments[0].text, long_text());
}

#[test]
fn test_deglue_missing_page_passes_through() {
    let params = DeglueParams::default();
    let doc = MemoryDocument::new();
    let page = PageBatch::new(1, vec![seg(40.0, 90.0, 520.0, 80.0, &long_text())]);

    let (out, stats) = deglue_pages(vec![page.clone()], &doc, &params);
    assert_eq!(out, vec![page]);
    assert_eq!(stats.pages_missing, 1);
    assert_eq!(stats.segments_split, 0);
}
