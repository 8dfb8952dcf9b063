//! コンテンツストリームのテキスト状態を追跡し、描画された文字列を行にまとめる。
//!
//! 1回の Tj/TJ/'/" を1つの [`TextRun`] として記録し、ベースラインが近く横に
//! 連なるランを1行に結合する。座標はPDFユーザー空間（左下原点）。

use std::collections::HashMap;

use lopdf::Object;
use lopdf::content::{Content, Operation};
use tracing::{debug, warn};

use crate::error::RefineError;
use crate::pdf::content_stream::{Matrix, operand_to_f64};
use crate::pdf::font::FontMetrics;

/// ベースラインから上端・下端までの高さ（フォントサイズ比）。
const ASCENT: f64 = 0.8;
const DESCENT: f64 = 0.2;

/// 1回のテキスト描画オペレータで描かれた文字列。
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x0: f64,
    pub x1: f64,
    pub baseline: f64,
    /// 実寸（CTM・テキスト行列適用後）のフォントサイズ
    pub font_size: f64,
    pub text: String,
    pub bold: bool,
}

impl TextRun {
    fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    fn char_width(&self) -> f64 {
        let n = self.char_count().max(1) as f64;
        (self.x1 - self.x0).abs() / n
    }
}

/// PDF座標の行（左下原点）。
#[derive(Debug, Clone, PartialEq)]
pub struct PdfLine {
    pub x0: f64,
    pub x1: f64,
    pub bottom: f64,
    pub top: f64,
    pub text: String,
    pub font_size: f64,
    pub bold: bool,
}

/// BT...ET内のテキスト状態
struct TextState {
    font_name: String,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scaling: f64,
    text_rise: f64,
    text_leading: f64,
    text_matrix: Matrix,
    text_line_matrix: Matrix,
}

impl TextState {
    fn new() -> Self {
        TextState {
            font_name: String::new(),
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 100.0,
            text_rise: 0.0,
            text_leading: 0.0,
            text_matrix: Matrix::identity(),
            text_line_matrix: Matrix::identity(),
        }
    }

    /// Td: 行行列を平行移動し、テキスト行列をそれに合わせる。
    fn move_line(&mut self, tx: f64, ty: f64) {
        self.text_line_matrix = Matrix::translate(tx, ty).multiply(&self.text_line_matrix);
        self.text_matrix = self.text_line_matrix;
    }

    /// T* オペレータ: 0 -TL Td と等価
    fn apply_t_star(&mut self) {
        self.move_line(0.0, -self.text_leading);
    }

    /// 文字列を描画し、テキスト行列を進める。描画結果のランを返す。
    fn show(&mut self, bytes: &[u8], font: &FontMetrics<'_>, ctm: &Matrix) -> Option<TextRun> {
        let th = self.horizontal_scaling / 100.0;
        let start = self.device_origin(ctm);
        let size = self.font_size * self.text_matrix.multiply(ctm).vertical_scale();

        let mut text = String::new();
        for code in font.char_codes(bytes) {
            text.push_str(&font.decode(code));
            let w0 = font.glyph_width(code) / 1000.0;
            let word = if !font.is_two_byte() && code == 32 {
                self.word_spacing
            } else {
                0.0
            };
            let tx = (w0 * self.font_size + self.char_spacing + word) * th;
            self.text_matrix = Matrix::translate(tx, 0.0).multiply(&self.text_matrix);
        }
        let end = self.device_origin(ctm);

        if text.trim().is_empty() {
            return None;
        }
        Some(TextRun {
            x0: start.0.min(end.0),
            x1: start.0.max(end.0),
            baseline: start.1,
            font_size: size.abs(),
            text,
            bold: font.is_bold(),
        })
    }

    /// TJ配列の数値: 字送りを千分率で戻す。
    fn adjust(&mut self, amount: f64) {
        let th = self.horizontal_scaling / 100.0;
        let tx = -amount / 1000.0 * self.font_size * th;
        self.text_matrix = Matrix::translate(tx, 0.0).multiply(&self.text_matrix);
    }

    /// 現在のテキスト原点（rise込み）のデバイス座標
    fn device_origin(&self, ctm: &Matrix) -> (f64, f64) {
        self.text_matrix
            .multiply(ctm)
            .transform_point(0.0, self.text_rise)
    }
}

/// コンテンツストリームを解析し、描画されたテキストランを列挙する。
///
/// `fonts` に無いフォント名は等幅のフォールバックで計測する。
/// オペランドが不正なオペレータは読み飛ばす（ページ全体は捨てない）。
pub fn extract_text_runs(
    content_bytes: &[u8],
    fonts: &HashMap<String, FontMetrics<'_>>,
) -> crate::error::Result<Vec<TextRun>> {
    if content_bytes.is_empty() {
        return Ok(Vec::new());
    }

    let content = Content::decode(content_bytes)
        .map_err(|e| RefineError::content_stream(e.to_string()))?;

    let fallback = FontMetrics::fallback();
    let mut scanner = TextScanner::new();
    let mut skipped = 0usize;

    for op in &content.operations {
        let font = fonts.get(&scanner.ts.font_name).unwrap_or(&fallback);
        if let Err(e) = scanner.apply(op, font) {
            skipped += 1;
            debug!(operator = %op.operator, error = %e, "skipping malformed operator");
        }
    }
    if skipped > 0 {
        warn!(skipped, "malformed text operators ignored");
    }

    Ok(scanner.runs)
}

/// グラフィックス状態とテキスト状態を追跡しながらランを集める。
struct TextScanner {
    ctm_stack: Vec<Matrix>,
    in_text: bool,
    ts: TextState,
    runs: Vec<TextRun>,
}

impl TextScanner {
    fn new() -> Self {
        TextScanner {
            ctm_stack: vec![Matrix::identity()],
            in_text: false,
            ts: TextState::new(),
            runs: Vec::new(),
        }
    }

    /// 1オペレータを適用する。オペランドが不正なら状態を変えずに `Err`。
    fn apply(&mut self, op: &Operation, font: &FontMetrics<'_>) -> crate::error::Result<()> {
        let ctm = self.ctm_stack.last().copied().unwrap_or_else(Matrix::identity);
        let num = |i: usize| op.operands.get(i).map(operand_to_f64).transpose();
        let ts = &mut self.ts;

        match op.operator.as_str() {
            "q" => self.ctm_stack.push(ctm),
            "Q" => {
                if self.ctm_stack.len() > 1 {
                    self.ctm_stack.pop();
                }
            }
            "cm" => {
                let cm = Matrix::from_operands(&op.operands)?;
                if let Some(current) = self.ctm_stack.last_mut() {
                    *current = cm.multiply(current);
                }
            }
            "BT" => {
                self.in_text = true;
                ts.text_matrix = Matrix::identity();
                ts.text_line_matrix = Matrix::identity();
            }
            "ET" => self.in_text = false,

            // テキスト状態はBT外でも有効（グラフィックス状態の一部）
            "Tf" => {
                let size = num(1)?;
                if let Some(Ok(name)) = op.operands.first().map(|o| o.as_name()) {
                    ts.font_name = String::from_utf8_lossy(name).into_owned();
                }
                if let Some(size) = size {
                    ts.font_size = size;
                }
            }
            "Tc" => ts.char_spacing = num(0)?.unwrap_or(ts.char_spacing),
            "Tw" => ts.word_spacing = num(0)?.unwrap_or(ts.word_spacing),
            "Tz" => ts.horizontal_scaling = num(0)?.unwrap_or(ts.horizontal_scaling),
            "Ts" => ts.text_rise = num(0)?.unwrap_or(ts.text_rise),
            "TL" => ts.text_leading = num(0)?.unwrap_or(ts.text_leading),

            "Tm" if self.in_text => {
                let m = Matrix::from_operands(&op.operands)?;
                ts.text_matrix = m;
                ts.text_line_matrix = m;
            }
            "Td" if self.in_text => {
                if let (Some(tx), Some(ty)) = (num(0)?, num(1)?) {
                    ts.move_line(tx, ty);
                }
            }
            "TD" if self.in_text => {
                // tx ty TD = -ty TL tx ty Td
                if let (Some(tx), Some(ty)) = (num(0)?, num(1)?) {
                    ts.text_leading = -ty;
                    ts.move_line(tx, ty);
                }
            }
            "T*" if self.in_text => ts.apply_t_star(),

            "Tj" if self.in_text => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.runs.extend(ts.show(bytes, font, &ctm));
                }
            }
            "'" if self.in_text => {
                ts.apply_t_star();
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.runs.extend(ts.show(bytes, font, &ctm));
                }
            }
            "\"" if self.in_text => {
                // aw ac string " = aw Tw ac Tc T* string Tj
                if let (Some(aw), Some(ac)) = (num(0)?, num(1)?) {
                    ts.word_spacing = aw;
                    ts.char_spacing = ac;
                }
                ts.apply_t_star();
                if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                    self.runs.extend(ts.show(bytes, font, &ctm));
                }
            }
            "TJ" if self.in_text => {
                let Some(Object::Array(items)) = op.operands.first() else {
                    return Ok(());
                };
                let mut merged: Option<TextRun> = None;
                for item in items {
                    match item {
                        Object::String(bytes, _) => {
                            if let Some(run) = ts.show(bytes, font, &ctm) {
                                merged = Some(match merged {
                                    Some(acc) => join_runs(acc, run),
                                    None => run,
                                });
                            }
                        }
                        other => {
                            if let Ok(adj) = operand_to_f64(other) {
                                ts.adjust(adj);
                            }
                        }
                    }
                }
                self.runs.extend(merged);
            }
            _ => {}
        }
        Ok(())
    }
}

/// 同じTJ配列内のランを連結する。間が文字幅の0.2倍より広ければ空白を挟む。
fn join_runs(a: TextRun, b: TextRun) -> TextRun {
    let gap = b.x0 - a.x1;
    let mut text = a.text.clone();
    if gap > 0.2 * a.char_width().max(b.char_width()) && !a.text.ends_with(' ') {
        text.push(' ');
    }
    text.push_str(&b.text);

    let na = a.char_count() as f64;
    let nb = b.char_count() as f64;
    TextRun {
        x0: a.x0.min(b.x0),
        x1: a.x1.max(b.x1),
        baseline: a.baseline,
        font_size: (a.font_size * na + b.font_size * nb) / (na + nb).max(1.0),
        text,
        bold: a.bold && b.bold,
    }
}

/// ベースラインが近く横に並ぶランを行にまとめる。上の行から順に返す。
///
/// ベースラインの差がフォントサイズの半分以内で、横方向の隙間が
/// 文字幅の数倍以内なら同じ行とする。
pub fn runs_to_lines(mut runs: Vec<TextRun>) -> Vec<PdfLine> {
    runs.sort_by(|a, b| {
        b.baseline
            .total_cmp(&a.baseline)
            .then(a.x0.total_cmp(&b.x0))
    });

    let mut lines: Vec<Vec<TextRun>> = Vec::new();
    for run in runs {
        let target = lines.iter_mut().rev().find(|line| {
            line.last().is_some_and(|last| {
                let tol = 0.5 * last.font_size.max(run.font_size).max(1.0);
                let gap = run.x0 - last.x1;
                (last.baseline - run.baseline).abs() <= tol
                    && gap <= 3.0 * last.char_width().max(run.char_width()).max(1.0)
                    && gap >= -last.char_width()
            })
        });
        match target {
            Some(line) => line.push(run),
            None => lines.push(vec![run]),
        }
    }

    lines.into_iter().map(assemble_line).collect()
}

fn assemble_line(runs: Vec<TextRun>) -> PdfLine {
    let mut text = String::new();
    let mut prev: Option<&TextRun> = None;
    let mut chars = 0usize;
    let mut bold_chars = 0usize;
    let mut size_sum = 0.0;
    let (mut bottom, mut top) = (f64::INFINITY, f64::NEG_INFINITY);

    for run in &runs {
        if let Some(p) = prev
            && run.x0 - p.x1 > 0.2 * p.char_width().max(run.char_width())
            && !text.ends_with(' ')
            && !run.text.starts_with(' ')
        {
            text.push(' ');
        }
        text.push_str(&run.text);

        let n = run.char_count();
        chars += n;
        if run.bold {
            bold_chars += n;
        }
        size_sum += run.font_size * n as f64;
        bottom = bottom.min(run.baseline - DESCENT * run.font_size);
        top = top.max(run.baseline + ASCENT * run.font_size);
        prev = Some(run);
    }

    let x0 = runs.iter().map(|r| r.x0).fold(f64::INFINITY, f64::min);
    let x1 = runs.iter().map(|r| r.x1).fold(f64::NEG_INFINITY, f64::max);
    PdfLine {
        x0,
        x1,
        bottom,
        top,
        text: text.trim().to_string(),
        font_size: if chars > 0 { size_sum / chars as f64 } else { 0.0 },
        bold: bold_chars * 2 > chars,
    }
}
