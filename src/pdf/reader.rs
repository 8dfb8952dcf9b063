use std::collections::BTreeSet;
use std::path::Path;

use lopdf::{Document, Object, ObjectId};

use crate::error::RefineError;
use crate::geometry::Rect;
use crate::pdf::content_stream::extract_xobject_placements;
use crate::pdf::font::page_fonts;
use crate::pdf::text_lines::{extract_text_runs, runs_to_lines};
use crate::source::{
    BLOCK_LINE_GAP_FACTOR, SourceDocument, TextLine, group_lines_into_blocks, sort_lines,
};

/// lopdf で読み込んだ元PDF。[`SourceDocument`] の実装。
pub struct PdfSource {
    doc: Document,
}

/// MediaBox（PDF座標、左下原点）
#[derive(Debug, Clone, Copy)]
struct PageBox {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl PageBox {
    fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// PDF座標の矩形をページ左上原点の矩形に変換する。
    fn to_top_left(&self, x0: f64, bottom: f64, x1: f64, top: f64) -> Rect {
        Rect::new(x0 - self.x0, self.y1 - top, x1 - self.x0, self.y1 - bottom)
    }
}

impl PdfSource {
    /// PDFファイルを開いてPdfSourceを作成する。
    pub fn open(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let doc = Document::load(path)?;
        Ok(Self { doc })
    }

    /// 読み込み済みの lopdf Document から作成する。
    pub fn from_document(doc: Document) -> Self {
        Self { doc }
    }

    /// 指定ページ辞書からMediaBoxを取得する（Parent経由の継承も考慮）。
    fn get_media_box(&self, dict: &lopdf::Dictionary) -> crate::error::Result<Object> {
        if let Ok(obj) = dict.get(b"MediaBox") {
            return Ok(self.doc.dereference(obj)?.1.clone());
        }

        if let Ok(Object::Reference(parent_id)) = dict.get(b"Parent") {
            let parent_dict = self.doc.get_dictionary(*parent_id)?;
            return self.get_media_box(parent_dict);
        }

        Err(RefineError::pdf_read("MediaBox not found"))
    }

    fn page_box(&self, page_num: u32) -> crate::error::Result<PageBox> {
        let page_id = self.get_page_id(page_num)?;
        let page_dict = self.doc.get_dictionary(page_id)?;
        let media_box = self.get_media_box(page_dict)?;

        let values = media_box.as_array()?;
        if values.len() < 4 {
            return Err(RefineError::pdf_read("Invalid MediaBox"));
        }

        // MediaBoxの値は整数または実数の可能性がある
        let to_f64 = |obj: &Object| -> crate::error::Result<f64> {
            match obj {
                Object::Integer(i) => Ok(*i as f64),
                Object::Real(f) => Ok(*f as f64),
                _ => Err(RefineError::pdf_read("Invalid MediaBox value")),
            }
        };

        let (ax, ay, bx, by) = (
            to_f64(&values[0])?,
            to_f64(&values[1])?,
            to_f64(&values[2])?,
            to_f64(&values[3])?,
        );
        let b = PageBox {
            x0: ax.min(bx),
            y0: ay.min(by),
            x1: ax.max(bx),
            y1: ay.max(by),
        };
        if b.width() <= 0.0 || b.height() <= 0.0 {
            return Err(RefineError::pdf_read(
                "Invalid MediaBox: non-positive page dimensions",
            ));
        }
        Ok(b)
    }

    /// 指定ページ(1-indexed)のコンテンツストリームをバイト列として返す。
    /// 複数のContentストリームがある場合は結合して返す。
    fn page_content_stream(&self, page_num: u32) -> crate::error::Result<Vec<u8>> {
        let page_id = self.get_page_id(page_num)?;
        Ok(self.doc.get_page_content(page_id)?)
    }

    /// 指定ページ(1-indexed)のXObjectリソースのうち、Subtype=ImageのXObject名一覧を返す。
    fn page_image_names(&self, page_num: u32) -> crate::error::Result<BTreeSet<String>> {
        let page_id = self.get_page_id(page_num)?;
        let (resource_dict, resource_ids) = self.doc.get_page_resources(page_id)?;

        let mut names = BTreeSet::new();
        if let Some(dict) = resource_dict {
            self.collect_image_names(dict, &mut names)?;
        }
        // 参照されているResources（親ページツリーから継承されたものも含む）
        for res_id in resource_ids {
            let dict = self.doc.get_dictionary(res_id)?;
            self.collect_image_names(dict, &mut names)?;
        }
        Ok(names)
    }

    /// リソース辞書のXObjectエントリからSubtype=Imageの名前を集める。
    fn collect_image_names(
        &self,
        dict: &lopdf::Dictionary,
        names: &mut BTreeSet<String>,
    ) -> crate::error::Result<()> {
        let Ok(entry) = dict.get(b"XObject") else {
            return Ok(());
        };
        let xobject_dict = self.doc.dereference(entry)?.1.as_dict()?;

        for (name_bytes, value) in xobject_dict.iter() {
            let Ok(stream) = self.doc.dereference(value)?.1.as_stream() else {
                continue;
            };
            if let Ok(subtype) = stream.dict.get(b"Subtype").and_then(Object::as_name)
                && subtype == b"Image"
            {
                names.insert(String::from_utf8_lossy(name_bytes).into_owned());
            }
        }
        Ok(())
    }

    /// ページ番号(1-indexed)からObjectIdを取得する。
    fn get_page_id(&self, page_num: u32) -> crate::error::Result<ObjectId> {
        let pages = self.doc.get_pages();
        pages
            .get(&page_num)
            .copied()
            .ok_or_else(|| RefineError::pdf_read(format!("page {} not found", page_num)))
    }
}

impl SourceDocument for PdfSource {
    fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    fn page_size(&self, page_number: u32) -> crate::error::Result<(f64, f64)> {
        let b = self.page_box(page_number)?;
        Ok((b.width(), b.height()))
    }

    fn text_lines(&self, page_number: u32) -> crate::error::Result<Vec<TextLine>> {
        let b = self.page_box(page_number)?;
        let page_id = self.get_page_id(page_number)?;
        let fonts = page_fonts(&self.doc, page_id)?;
        let content = self.page_content_stream(page_number)?;

        let runs = extract_text_runs(&content, &fonts)?;
        let mut lines: Vec<TextLine> = runs_to_lines(runs)
            .into_iter()
            .filter(|l| !l.text.is_empty())
            .map(|l| {
                let r = b.to_top_left(l.x0, l.bottom, l.x1, l.top);
                TextLine {
                    x0: r.x0,
                    y0: r.y0,
                    x1: r.x1,
                    y1: r.y1,
                    text: l.text,
                    font_size: l.font_size,
                    bold: l.bold,
                }
            })
            .collect();
        sort_lines(&mut lines);
        Ok(lines)
    }

    fn layout_blocks(&self, page_number: u32) -> crate::error::Result<Vec<Rect>> {
        let b = self.page_box(page_number)?;
        let lines = self.text_lines(page_number)?;
        let mut blocks = group_lines_into_blocks(&lines, BLOCK_LINE_GAP_FACTOR);

        let images = self.page_image_names(page_number)?;
        let content = self.page_content_stream(page_number)?;
        blocks.extend(
            extract_xobject_placements(&content)?
                .into_iter()
                .filter(|p| images.contains(&p.name))
                .map(|p| b.to_top_left(p.bbox.x0, p.bbox.y0, p.bbox.x1, p.bbox.y1)),
        );
        Ok(blocks)
    }
}
