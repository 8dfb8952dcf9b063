//! 元文書（PDF）への読み取り専用アクセス。
//!
//! 見開き判定とdeglueはこのトレイト越しにだけ元文書を見る。テストでは
//! [`MemoryDocument`] で合成した行・ブロックを渡す。

use std::collections::BTreeMap;

use crate::error::RefineError;
use crate::geometry::Rect;

/// 元文書から取り出した1行。座標はページ左上原点（PDFのユーザー空間単位）。
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub text: String,
    /// 行内の文字数で重み付けした平均フォントサイズ
    pub font_size: f64,
    /// 行内の過半数の文字が太字か
    pub bold: bool,
}

impl TextLine {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x0, self.y0, self.x1, self.y1)
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// 座標を `factor` 倍した行を返す（PDF座標 → セグメント座標）。
    pub fn scaled(&self, factor: f64) -> TextLine {
        TextLine {
            x0: self.x0 * factor,
            y0: self.y0 * factor,
            x1: self.x1 * factor,
            y1: self.y1 * factor,
            font_size: self.font_size * factor,
            ..self.clone()
        }
    }
}

pub trait SourceDocument {
    fn page_count(&self) -> u32;

    /// ページ寸法 (width, height)。存在しないページは `PdfReadError`。
    fn page_size(&self, page_number: u32) -> crate::error::Result<(f64, f64)>;

    /// ページ上の行を `(y0, x0)` 順に返す。
    fn text_lines(&self, page_number: u32) -> crate::error::Result<Vec<TextLine>>;

    /// 生のレイアウトブロック（テキストの塊と配置された画像）の矩形。
    fn layout_blocks(&self, page_number: u32) -> crate::error::Result<Vec<Rect>>;
}

/// 行を `(y0, x0)` 順に並べる。
pub fn sort_lines(lines: &mut [TextLine]) {
    lines.sort_by(|a, b| a.y0.total_cmp(&b.y0).then(a.x0.total_cmp(&b.x0)));
}

/// 縦に近く横に重なる行を1つのブロックにまとめる。
///
/// 行間が行高の `gap_factor` 倍以下で、横方向に重なりがあれば同じブロック。
pub fn group_lines_into_blocks(lines: &[TextLine], gap_factor: f64) -> Vec<Rect> {
    let mut sorted = lines.to_vec();
    sort_lines(&mut sorted);

    let mut blocks: Vec<Rect> = Vec::new();
    for line in &sorted {
        let r = line.rect();
        let tol = gap_factor * line.height().max(1.0);
        let target = blocks
            .iter_mut()
            .rev()
            .find(|b| r.y0 - b.y1 <= tol && r.y1 >= b.y0 && b.x_overlap(&r) > 0.0);
        match target {
            Some(block) => *block = block.union(&r),
            None => blocks.push(r),
        }
    }
    blocks
}

/// ブロック化の既定の行間係数。
pub const BLOCK_LINE_GAP_FACTOR: f64 = 0.8;

/// メモリ上の合成ページ。
#[derive(Debug, Clone, Default)]
pub struct MemoryPage {
    pub width: f64,
    pub height: f64,
    pub lines: Vec<TextLine>,
    /// 行以外のブロック（画像など）
    pub images: Vec<Rect>,
}

/// テストや前処理済みデータ用の [`SourceDocument`] 実装。
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    pages: BTreeMap<u32, MemoryPage>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page_number: u32, page: MemoryPage) -> Self {
        self.pages.insert(page_number, page);
        self
    }

    fn page(&self, page_number: u32) -> crate::error::Result<&MemoryPage> {
        self.pages
            .get(&page_number)
            .ok_or_else(|| RefineError::pdf_read(format!("page {} not found", page_number)))
    }
}

impl SourceDocument for MemoryDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page_number: u32) -> crate::error::Result<(f64, f64)> {
        let p = self.page(page_number)?;
        Ok((p.width, p.height))
    }

    fn text_lines(&self, page_number: u32) -> crate::error::Result<Vec<TextLine>> {
        let mut lines = self.page(page_number)?.lines.clone();
        sort_lines(&mut lines);
        Ok(lines)
    }

    fn layout_blocks(&self, page_number: u32) -> crate::error::Result<Vec<Rect>> {
        let p = self.page(page_number)?;
        let mut blocks = group_lines_into_blocks(&p.lines, BLOCK_LINE_GAP_FACTOR);
        blocks.extend(p.images.iter().copied());
        Ok(blocks)
    }
}
