use std::collections::HashMap;

use lopdf::{Document, Encoding, Object, ObjectId};

use crate::error::RefineError;

/// 行抽出に必要なフォント情報（グリフ幅・文字コード→Unicode・太字）。
///
/// ToUnicode CMap は lopdf の [`Encoding::UnicodeMapEncoding`] をそのまま保持する。
#[derive(Debug, Default)]
pub struct FontMetrics<'a> {
    widths: HashMap<u32, f64>,
    default_width: f64,
    two_byte: bool,
    to_unicode: Option<Encoding<'a>>,
    differences: HashMap<u8, char>,
    bold: bool,
}

impl FontMetrics<'_> {
    /// Simple font with a constant glyph width, used when a font resource is missing.
    pub fn fallback() -> Self {
        FontMetrics {
            default_width: 500.0,
            ..Default::default()
        }
    }

    pub fn is_two_byte(&self) -> bool {
        self.two_byte
    }

    pub fn is_bold(&self) -> bool {
        self.bold
    }

    /// 文字コードの幅（1/1000テキスト空間単位）。
    pub fn glyph_width(&self, code: u32) -> f64 {
        self.widths
            .get(&code)
            .copied()
            .unwrap_or(self.default_width)
    }

    /// 文字列オペランドのバイト列を文字コード列に変換する。
    pub fn char_codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks_exact(2)
                .map(|pair| ((pair[0] as u32) << 8) | pair[1] as u32)
                .collect()
        } else {
            bytes.iter().map(|&b| b as u32).collect()
        }
    }

    /// 文字コードをUnicode文字列にする。対応が無いコードは空文字列。
    pub fn decode(&self, code: u32) -> String {
        if let Some(s) = self.decode_with_cmap(code) {
            return s;
        }
        if self.two_byte {
            return char::from_u32(code)
                .filter(|c| !c.is_control())
                .map(String::from)
                .unwrap_or_default();
        }
        let byte = code as u8;
        self.differences
            .get(&byte)
            .copied()
            .or_else(|| win_ansi_to_unicode(byte))
            .map(String::from)
            .unwrap_or_default()
    }

    /// ToUnicode CMap で引く。未定義のコード（置換文字になる）は `None`。
    fn decode_with_cmap(&self, code: u32) -> Option<String> {
        let cmap = self.to_unicode.as_ref()?;
        let bytes = if self.two_byte {
            (code as u16).to_be_bytes().to_vec()
        } else {
            vec![code as u8]
        };
        let text = cmap.bytes_to_string(&bytes).ok()?;
        (!text.is_empty() && !text.contains(char::REPLACEMENT_CHARACTER)).then_some(text)
    }
}

/// ページのフォントリソース名 → [`FontMetrics`]。
///
/// 解析できないフォントはフォールバックの等幅メトリクスになる。
pub fn page_fonts(
    doc: &Document,
    page_id: ObjectId,
) -> crate::error::Result<HashMap<String, FontMetrics<'_>>> {
    let mut fonts = HashMap::new();
    let Some(font_dict) = get_font_dict(doc, page_id)? else {
        return Ok(fonts);
    };

    for (name_bytes, font_ref) in font_dict.iter() {
        let name = String::from_utf8_lossy(name_bytes).into_owned();
        let metrics = parse_single_font(doc, font_ref).unwrap_or_else(|_| FontMetrics::fallback());
        fonts.insert(name, metrics);
    }

    Ok(fonts)
}

/// ページのフォントリソース辞書を取得
fn get_font_dict(
    doc: &Document,
    page_id: ObjectId,
) -> crate::error::Result<Option<&lopdf::Dictionary>> {
    let page_dict = doc.get_dictionary(page_id)?;

    // Resources を取得（ページ直接 or 親からの継承）
    let resources = match get_resources(doc, page_dict) {
        Ok(res) => res,
        Err(_) => return Ok(None),
    };
    let resources_dict = resources.as_dict()?;

    let font_obj = match resources_dict.get(b"Font") {
        Ok(obj) => doc.dereference(obj)?.1,
        Err(_) => return Ok(None),
    };

    Ok(Some(font_obj.as_dict()?))
}

/// Resources辞書を取得（ページ直接またはPages親から継承）
fn get_resources<'a>(
    doc: &'a Document,
    page_dict: &'a lopdf::Dictionary,
) -> crate::error::Result<&'a Object> {
    if let Ok(res) = page_dict.get(b"Resources") {
        return Ok(doc.dereference(res)?.1);
    }

    if let Ok(Object::Reference(parent_id)) = page_dict.get(b"Parent")
        && let Ok(parent_dict) = doc.get_dictionary(*parent_id)
    {
        return get_resources(doc, parent_dict);
    }

    Err(RefineError::pdf_read("no Resources found"))
}

fn parse_single_font<'a>(
    doc: &'a Document,
    font_ref: &'a Object,
) -> crate::error::Result<FontMetrics<'a>> {
    let font_dict = doc.dereference(font_ref)?.1.as_dict()?;

    let subtype = font_dict
        .get(b"Subtype")
        .ok()
        .and_then(|o| o.as_name().ok())
        .unwrap_or_default();

    let mut metrics = if subtype == b"Type0" {
        parse_type0_font(doc, font_dict)?
    } else {
        parse_simple_font(doc, font_dict)?
    };

    metrics.bold = metrics.bold || base_font_is_bold(font_dict);
    // lopdf は Identity-H/V か名前でない /Encoding のときだけ ToUnicode を読む
    if let Ok(enc @ Encoding::UnicodeMapEncoding(_)) = font_dict.get_font_encoding(doc) {
        metrics.to_unicode = Some(enc);
    }
    Ok(metrics)
}

/// Type1 / TrueType / Type3 などの1バイトフォント
fn parse_simple_font<'a>(
    doc: &Document,
    font_dict: &lopdf::Dictionary,
) -> crate::error::Result<FontMetrics<'a>> {
    let descriptor = font_descriptor(doc, font_dict);
    let default_width = descriptor
        .and_then(|d| d.get(b"MissingWidth").ok())
        .and_then(number)
        .filter(|w| *w > 0.0)
        .unwrap_or(500.0);

    Ok(FontMetrics {
        widths: parse_simple_widths(doc, font_dict)?,
        default_width,
        two_byte: false,
        to_unicode: None,
        differences: parse_differences(doc, font_dict),
        bold: descriptor.is_some_and(descriptor_is_bold),
    })
}

/// Type0 (CIDFont) フォント
fn parse_type0_font<'a>(
    doc: &Document,
    font_dict: &lopdf::Dictionary,
) -> crate::error::Result<FontMetrics<'a>> {
    let descendants = font_dict
        .get(b"DescendantFonts")
        .map_err(|_| RefineError::pdf_read("Type0 font missing DescendantFonts"))?;
    let desc_array = doc.dereference(descendants)?.1.as_array()?;
    let first = desc_array
        .first()
        .ok_or_else(|| RefineError::pdf_read("DescendantFonts array is empty"))?;
    let cid_font_dict = doc.dereference(first)?.1.as_dict()?;

    let default_width = cid_font_dict
        .get(b"DW")
        .ok()
        .and_then(number)
        .unwrap_or(1000.0);
    let descriptor = font_descriptor(doc, cid_font_dict);

    Ok(FontMetrics {
        widths: parse_cid_widths(doc, cid_font_dict)?,
        default_width,
        two_byte: true,
        to_unicode: None,
        differences: HashMap::new(),
        bold: descriptor.is_some_and(descriptor_is_bold) || base_font_is_bold(cid_font_dict),
    })
}

fn font_descriptor<'a>(
    doc: &'a Document,
    font_dict: &'a lopdf::Dictionary,
) -> Option<&'a lopdf::Dictionary> {
    let obj = font_dict.get(b"FontDescriptor").ok()?;
    doc.dereference(obj).ok()?.1.as_dict().ok()
}

/// BaseFont 名に太字を示す語が含まれるか（"Helvetica-Bold", "Arial,Black" など）。
fn base_font_is_bold(font_dict: &lopdf::Dictionary) -> bool {
    font_dict
        .get(b"BaseFont")
        .ok()
        .and_then(|o| o.as_name().ok())
        .map(|n| String::from_utf8_lossy(n).to_lowercase())
        .is_some_and(|name| {
            ["bold", "black", "heavy", "semibold", "demi"]
                .iter()
                .any(|kw| name.contains(kw))
        })
}

/// FontWeight >= 600 または ForceBold フラグ (bit 19)。
fn descriptor_is_bold(descriptor: &lopdf::Dictionary) -> bool {
    const FORCE_BOLD: i64 = 1 << 18;
    let heavy = descriptor
        .get(b"FontWeight")
        .ok()
        .and_then(number)
        .is_some_and(|w| w >= 600.0);
    let forced = descriptor
        .get(b"Flags")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .is_some_and(|f| f & FORCE_BOLD != 0);
    heavy || forced
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// /FirstChar と /Widths 配列
fn parse_simple_widths(
    doc: &Document,
    font_dict: &lopdf::Dictionary,
) -> crate::error::Result<HashMap<u32, f64>> {
    let mut result = HashMap::new();

    let first_char = match font_dict.get(b"FirstChar").ok() {
        Some(Object::Integer(i)) if (0..=255).contains(i) => *i as u32,
        Some(Object::Integer(i)) => {
            return Err(RefineError::pdf_read(format!(
                "FirstChar out of range: {}",
                i
            )));
        }
        _ => 0,
    };

    let widths_obj = match font_dict.get(b"Widths") {
        Ok(obj) => doc.dereference(obj)?.1,
        Err(_) => return Ok(result),
    };

    if let Ok(arr) = widths_obj.as_array() {
        for (i, obj) in arr.iter().enumerate() {
            if let Some(w) = doc.dereference(obj).ok().and_then(|(_, o)| number(o)) {
                result.insert(first_char + i as u32, w);
            }
        }
    }

    Ok(result)
}

/// CIDFont の /W 配列: `[ cid [w1 w2 ...] ]` または `[ cid_first cid_last w ]`
fn parse_cid_widths(
    doc: &Document,
    cid_font_dict: &lopdf::Dictionary,
) -> crate::error::Result<HashMap<u32, f64>> {
    let mut result = HashMap::new();

    let w_obj = match cid_font_dict.get(b"W") {
        Ok(obj) => doc.dereference(obj)?.1,
        Err(_) => return Ok(result),
    };
    let Ok(arr) = w_obj.as_array() else {
        return Ok(result);
    };

    let mut i = 0;
    while i + 1 < arr.len() {
        let Object::Integer(cid_start) = arr[i] else {
            i += 1;
            continue;
        };
        let cid_start = cid_start.max(0) as u32;

        match &arr[i + 1] {
            Object::Array(widths) => {
                for (j, w) in widths.iter().filter_map(number).enumerate() {
                    result.insert(cid_start + j as u32, w);
                }
                i += 2;
            }
            Object::Integer(cid_end) if i + 2 < arr.len() => {
                if let Some(w) = number(&arr[i + 2]) {
                    for cid in cid_start..=(*cid_end).max(0) as u32 {
                        result.insert(cid, w);
                    }
                }
                i += 3;
            }
            _ => i += 1,
        }
    }

    Ok(result)
}

/// Encoding 辞書の /Differences 配列（グリフ名 → Unicode）
fn parse_differences(doc: &Document, font_dict: &lopdf::Dictionary) -> HashMap<u8, char> {
    let mut result = HashMap::new();

    let Some(enc) = font_dict
        .get(b"Encoding")
        .ok()
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| o.as_dict().ok())
    else {
        return result;
    };
    let Some(diffs) = enc
        .get(b"Differences")
        .ok()
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| o.as_array().ok())
    else {
        return result;
    };

    let mut code: i64 = 0;
    for item in diffs {
        match item {
            Object::Integer(n) => code = *n,
            Object::Name(name) => {
                if let (Ok(byte), Some(c)) = (
                    u8::try_from(code),
                    glyph_name_to_unicode(&String::from_utf8_lossy(name)),
                ) {
                    result.insert(byte, c);
                }
                code += 1;
            }
            _ => {}
        }
    }

    result
}

/// グリフ名→Unicode変換（Adobe Glyph Listの主要エントリ）
fn glyph_name_to_unicode(name: &str) -> Option<char> {
    match name {
        "space" | "nbspace" => Some(' '),
        "exclam" => Some('!'),
        "quotedbl" => Some('"'),
        "numbersign" => Some('#'),
        "dollar" => Some('$'),
        "percent" => Some('%'),
        "ampersand" => Some('&'),
        "quotesingle" => Some('\''),
        "parenleft" => Some('('),
        "parenright" => Some(')'),
        "asterisk" => Some('*'),
        "plus" => Some('+'),
        "comma" => Some(','),
        "hyphen" | "minus" => Some('-'),
        "period" => Some('.'),
        "slash" => Some('/'),
        "zero" => Some('0'),
        "one" => Some('1'),
        "two" => Some('2'),
        "three" => Some('3'),
        "four" => Some('4'),
        "five" => Some('5'),
        "six" => Some('6'),
        "seven" => Some('7'),
        "eight" => Some('8'),
        "nine" => Some('9'),
        "colon" => Some(':'),
        "semicolon" => Some(';'),
        "less" => Some('<'),
        "equal" => Some('='),
        "greater" => Some('>'),
        "question" => Some('?'),
        "at" => Some('@'),
        "quoteleft" => Some('\u{2018}'),
        "quoteright" => Some('\u{2019}'),
        "quotedblleft" => Some('\u{201C}'),
        "quotedblright" => Some('\u{201D}'),
        "endash" => Some('\u{2013}'),
        "emdash" => Some('\u{2014}'),
        "bullet" => Some('\u{2022}'),
        "ellipsis" => Some('\u{2026}'),
        "fi" => Some('\u{FB01}'),
        "fl" => Some('\u{FB02}'),
        _ if name.chars().count() == 1 => name.chars().next(),
        _ if name.starts_with("uni") && name.len() == 7 => u32::from_str_radix(&name[3..], 16)
            .ok()
            .and_then(char::from_u32),
        _ => None,
    }
}

/// WinAnsi文字コード→Unicode変換
fn win_ansi_to_unicode(code: u8) -> Option<char> {
    // 0x20-0x7E: ASCII直接対応
    if (0x20..=0x7E).contains(&code) {
        return Some(code as char);
    }

    // Windows-1252 の上位バイトマッピング
    match code {
        0x80 => Some('\u{20AC}'),
        0x82 => Some('\u{201A}'),
        0x83 => Some('\u{0192}'),
        0x84 => Some('\u{201E}'),
        0x85 => Some('\u{2026}'),
        0x86 => Some('\u{2020}'),
        0x87 => Some('\u{2021}'),
        0x88 => Some('\u{02C6}'),
        0x89 => Some('\u{2030}'),
        0x8A => Some('\u{0160}'),
        0x8B => Some('\u{2039}'),
        0x8C => Some('\u{0152}'),
        0x8E => Some('\u{017D}'),
        0x91 => Some('\u{2018}'),
        0x92 => Some('\u{2019}'),
        0x93 => Some('\u{201C}'),
        0x94 => Some('\u{201D}'),
        0x95 => Some('\u{2022}'),
        0x96 => Some('\u{2013}'),
        0x97 => Some('\u{2014}'),
        0x98 => Some('\u{02DC}'),
        0x99 => Some('\u{2122}'),
        0x9A => Some('\u{0161}'),
        0x9B => Some('\u{203A}'),
        0x9C => Some('\u{0153}'),
        0x9E => Some('\u{017E}'),
        0x9F => Some('\u{0178}'),
        0xA0..=0xFF => Some(code as char),
        _ => None,
    }
}
