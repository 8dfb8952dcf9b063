use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::RefineError;
use crate::geometry::{Rect, finalize_segments};

/// 1ページ上の矩形テキスト領域。
///
/// 座標はページ左上原点。`block_id` はステージ確定後に振り直される表示用の
/// 連番であり、変換をまたいだ同一性には使えない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub page_number: u32,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub page_width: f64,
    pub page_height: f64,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub block_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
}

impl Segment {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.left + 0.5 * self.width
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.right(), self.bottom())
    }

    /// 同じ属性で本文だけを差し替えた新しいセグメントを返す。
    pub fn with_text(&self, text: impl Into<String>) -> Segment {
        Segment {
            text: text.into(),
            ..self.clone()
        }
    }

    /// 属性を引き継ぎ、矩形と本文を差し替えた新しいセグメントを返す。
    /// `block_id` は 0 にリセットされる（確定時に振り直す）。
    pub fn derive(&self, rect: Rect, text: impl Into<String>) -> Segment {
        Segment {
            page_number: self.page_number,
            left: rect.x0,
            top: rect.y0,
            width: rect.width(),
            height: rect.height(),
            page_width: self.page_width,
            page_height: self.page_height,
            text: text.into(),
            kind: self.kind.clone(),
            block_id: 0,
            line_height: self.line_height,
        }
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Which half of a split spread a logical page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalSide {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
}

impl LogicalSide {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalSide::Left => "L",
            LogicalSide::Right => "R",
        }
    }
}

/// 1物理ページ（または見開き分割後の論理ページ）分のセグメント。
///
/// 分割後も座標系は元ページのまま（`page_width` は半分にしない）。
/// どちらの半分かは `logical_side` だけで区別する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageBatch {
    pub page_number: u32,
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub logical_side: Option<LogicalSide>,
}

impl PageBatch {
    pub fn new(page_number: u32, segments: Vec<Segment>) -> Self {
        PageBatch {
            page_number,
            segments,
            logical_side: None,
        }
    }

    /// Same page and side, new segment list.
    pub fn with_segments(&self, segments: Vec<Segment>) -> Self {
        PageBatch {
            page_number: self.page_number,
            segments,
            logical_side: self.logical_side,
        }
    }

    /// Page width recorded on the first segment, if any.
    pub fn page_width(&self) -> Option<f64> {
        self.segments.first().map(|s| s.page_width)
    }
}

/// レイアウト解析サービスが返す1レコード。
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentRecord {
    pub page_number: u32,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub page_width: f64,
    pub page_height: f64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl SegmentRecord {
    /// 矩形はページ内に切り詰める（ページ寸法が正のとき）。
    fn into_segment(self) -> Segment {
        let rect = Rect::new(
            self.left,
            self.top,
            self.left + self.width,
            self.top + self.height,
        )
        .clamped_to_page(self.page_width, self.page_height);
        Segment {
            page_number: self.page_number,
            left: rect.x0,
            top: rect.y0,
            width: rect.width(),
            height: rect.height(),
            page_width: self.page_width,
            page_height: self.page_height,
            text: self.text.unwrap_or_default().trim().to_string(),
            kind: normalize_type_tag(self.kind.as_deref().unwrap_or("")),
            block_id: 0,
            line_height: None,
        }
    }
}

/// 型タグを小文字スネークケースに正規化する（"Section header" -> "section_header"）。
/// 空のタグは `"text"` になる。
pub fn normalize_type_tag(tag: &str) -> String {
    let words: Vec<String> = tag
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    if words.is_empty() {
        "text".to_string()
    } else {
        words.join("_")
    }
}

/// Groups layout records by page number (ascending), sorts each page into
/// reading order and numbers its blocks 1..N. Boxes sticking out of the page
/// are clipped to it.
pub fn build_pages(records: Vec<SegmentRecord>) -> crate::error::Result<Vec<PageBatch>> {
    let mut by_page: BTreeMap<u32, Vec<Segment>> = BTreeMap::new();

    for record in records {
        if record.page_number == 0 {
            return Err(RefineError::input(
                "segment record has page_number 0 (page numbers are 1-based)",
            ));
        }
        let segment = record.into_segment();
        by_page.entry(segment.page_number).or_default().push(segment);
    }

    Ok(by_page
        .into_iter()
        .map(|(page_number, segments)| {
            let mut ordered = crate::geometry::sort_reading_order(segments);
            for (i, s) in ordered.iter_mut().enumerate() {
                s.block_id = i as u32 + 1;
            }
            PageBatch::new(page_number, ordered)
        })
        .collect())
}

/// Keeps only the listed physical pages, preserving order.
pub fn select_pages(pages: Vec<PageBatch>, keep: &[u32]) -> Vec<PageBatch> {
    pages
        .into_iter()
        .filter(|pb| keep.contains(&pb.page_number))
        .collect()
}

/// Sorts, filters out blank segments and renumbers a finished stage's output.
pub fn finalize_page(page: &PageBatch, segments: Vec<Segment>) -> PageBatch {
    page.with_segments(finalize_segments(segments))
}
