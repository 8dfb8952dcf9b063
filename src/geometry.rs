use crate::model::Segment;

/// Axis-aligned rectangle in top-left-origin page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Rect { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center_x(&self) -> f64 {
        0.5 * (self.x0 + self.x1)
    }

    pub fn center_y(&self) -> f64 {
        0.5 * (self.y0 + self.y1)
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// 共通部分。幅か高さが正にならなければ `None`。
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let r = Rect {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        };
        (r.width() > 0.0 && r.height() > 0.0).then_some(r)
    }

    /// ページ `[0, width] x [0, height]` に収める。寸法が正でない軸はそのまま。
    pub fn clamped_to_page(&self, width: f64, height: f64) -> Rect {
        let (x0, x1) = if width > 0.0 {
            (self.x0.clamp(0.0, width), self.x1.clamp(0.0, width))
        } else {
            (self.x0, self.x1)
        };
        let (y0, y1) = if height > 0.0 {
            (self.y0.clamp(0.0, height), self.y1.clamp(0.0, height))
        } else {
            (self.y0, self.y1)
        };
        Rect { x0, y0, x1, y1 }
    }

    pub fn x_overlap(&self, other: &Rect) -> f64 {
        (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0)
    }

    /// 点が矩形内（`tol` だけ外側に広げた範囲）にあるか。
    pub fn contains_point(&self, x: f64, y: f64, tol: f64) -> bool {
        x >= self.x0 - tol && x <= self.x1 + tol && y >= self.y0 - tol && y <= self.y1 + tol
    }

    pub fn scaled(&self, factor: f64) -> Rect {
        Rect {
            x0: self.x0 * factor,
            y0: self.y0 * factor,
            x1: self.x1 * factor,
            y1: self.y1 * factor,
        }
    }
}

/// 2つのセグメントの水平方向の重なり幅。
pub fn x_overlap(a: &Segment, b: &Segment) -> f64 {
    a.rect().x_overlap(&b.rect())
}

/// 読み順ソート: top 昇順、同値なら left 昇順の安定ソート。
///
/// 段組みの検出はしない。段ごとに分けたい場合は呼び出し側で事前に分割する。
pub fn sort_reading_order(mut segments: Vec<Segment>) -> Vec<Segment> {
    segments.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.left.total_cmp(&b.left)));
    segments
}

/// Drops blank segments, sorts into reading order and numbers blocks from 1.
pub fn finalize_segments(segments: Vec<Segment>) -> Vec<Segment> {
    let kept: Vec<Segment> = segments.into_iter().filter(Segment::has_text).collect();
    let mut ordered = sort_reading_order(kept);
    for (i, s) in ordered.iter_mut().enumerate() {
        s.block_id = i as u32 + 1;
    }
    ordered
}
