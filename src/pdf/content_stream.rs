use lopdf::content::Content;

use crate::error::RefineError;
use crate::geometry::Rect;

/// 6要素アフィン変換行列 [a, b, c, d, e, f]
/// PDF仕様: [ a b 0 ]
///          [ c d 0 ]
///          [ e f 1 ]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    /// 単位行列を返す。
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::identity()
        }
    }

    /// 6個の数値オペランド (cm, Tm) から行列を作る。
    pub fn from_operands(operands: &[lopdf::Object]) -> crate::error::Result<Self> {
        let [a, b, c, d, e, f] = operands else {
            return Err(RefineError::content_stream(format!(
                "expected 6 matrix operands, got {}",
                operands.len()
            )));
        };
        Ok(Self {
            a: operand_to_f64(a)?,
            b: operand_to_f64(b)?,
            c: operand_to_f64(c)?,
            d: operand_to_f64(d)?,
            e: operand_to_f64(e)?,
            f: operand_to_f64(f)?,
        })
    }

    /// self * other (行列の右乗算)
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// 行ベクトル (x, y, 1) に適用する。
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// 縦方向の拡大率（フォントサイズの実寸換算に使う）。
    pub fn vertical_scale(&self) -> f64 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// XObjectの配置情報。
#[derive(Debug, Clone)]
pub struct XObjectPlacement {
    /// XObjectの名前 (e.g. "Im1")
    pub name: String,
    /// 描画時のCTM
    pub ctm: Matrix,
    /// 単位正方形をCTMで写した矩形（PDF座標、左下原点）
    pub bbox: Rect,
}

/// コンテンツストリームを解析し、全XObjectの配置情報を抽出する。
///
/// CTMスタック(q/Q)を追跡し、cmオペレータでCTMを更新する。
/// DoオペレータでXObject名とその時点のCTM・BBoxを記録する。
/// オペランドが不正な cm / Do は無視する。
pub fn extract_xobject_placements(
    content_bytes: &[u8],
) -> crate::error::Result<Vec<XObjectPlacement>> {
    // 空バイト列の場合、lopdfのパーサがエラーを返す可能性があるため特別扱い
    if content_bytes.is_empty() {
        return Ok(Vec::new());
    }

    let content = Content::decode(content_bytes)
        .map_err(|e| RefineError::content_stream(e.to_string()))?;

    let mut ctm_stack: Vec<Matrix> = vec![Matrix::identity()];
    let mut placements = Vec::new();

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => {
                let current = ctm_stack.last().copied().unwrap_or_else(Matrix::identity);
                ctm_stack.push(current);
            }
            "Q" => {
                if ctm_stack.len() > 1 {
                    ctm_stack.pop();
                }
            }
            "cm" => {
                let Ok(cm) = Matrix::from_operands(&op.operands) else {
                    continue;
                };
                if let Some(current) = ctm_stack.last_mut() {
                    *current = cm.multiply(current);
                }
            }
            "Do" => {
                if let Some(Ok(name_bytes)) = op.operands.first().map(|o| o.as_name()) {
                    let ctm = ctm_stack.last().copied().unwrap_or_else(Matrix::identity);
                    placements.push(XObjectPlacement {
                        name: String::from_utf8_lossy(name_bytes).into_owned(),
                        ctm,
                        bbox: ctm_to_bbox(&ctm),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(placements)
}

/// lopdfのObjectから数値をf64として取得する。
pub(crate) fn operand_to_f64(obj: &lopdf::Object) -> crate::error::Result<f64> {
    match obj {
        lopdf::Object::Integer(i) => Ok(*i as f64),
        lopdf::Object::Real(r) => Ok(*r as f64),
        _ => Err(RefineError::content_stream(format!(
            "expected numeric operand, got {:?}",
            obj
        ))),
    }
}

/// 単位正方形 [0,0]-[1,1] の4頂点をCTMで変換し、min/maxを取る。
fn ctm_to_bbox(ctm: &Matrix) -> Rect {
    let corners = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
    let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
    let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for (x, y) in corners {
        let (px, py) = ctm.transform_point(x, y);
        x0 = x0.min(px);
        y0 = y0.min(py);
        x1 = x1.max(px);
        y1 = y1.max(py);
    }
    Rect::new(x0, y0, x1, y1)
}
