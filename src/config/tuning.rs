//! Every heuristic threshold used by the refinement stages.
//!
//! Defaults reproduce the production values. All fields can be overridden from
//! the `tuning:` block of `settings.yaml`.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub tight: MergeTolerances,
    pub loose: MergeTolerances,
    pub merge: MergeParams,
    pub caption: CaptionParams,
    pub heading: HeadingParams,
    pub whitespace: WhitespaceParams,
    pub denoise: DenoiseParams,
    pub deglue: DeglueParams,
    pub spread: SpreadParams,
    pub invariants: InvariantParams,
    pub refine: RefineParams,
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning {
            tight: MergeTolerances::tight(),
            loose: MergeTolerances::loose(),
            merge: MergeParams::default(),
            caption: CaptionParams::default(),
            heading: HeadingParams::default(),
            whitespace: WhitespaceParams::default(),
            denoise: DenoiseParams::default(),
            deglue: DeglueParams::default(),
            spread: SpreadParams::default(),
            invariants: InvariantParams::default(),
            refine: RefineParams::default(),
        }
    }
}

/// 結合判定の絶対許容値（ページ幅比の下限と max を取る）。
///
/// YAML で上書きする場合は3項目すべてを指定する。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MergeTolerances {
    pub x_left: f64,
    pub x_right: f64,
    pub gap: f64,
}

impl MergeTolerances {
    /// 見開き分割前の厳しめの許容値。
    pub fn tight() -> Self {
        MergeTolerances {
            x_left: 4.0,
            x_right: 8.0,
            gap: 6.0,
        }
    }

    /// 分割後の座標ノイズを見込んだ緩めの許容値。
    pub fn loose() -> Self {
        MergeTolerances {
            x_left: 9.0,
            x_right: 9.0,
            gap: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MergeParams {
    pub left_page_frac: f64,
    pub right_page_frac: f64,
    pub gap_page_frac: f64,
    pub overlap_ratio: f64,
    pub right_shrink_frac: f64,
    pub max_center_dx_frac: f64,
    pub vertical_tolerance: f64,
    /// `a` の末尾がこれらの文字なら結合しない。
    pub end_punctuation: String,
    /// 型タグが異なり、片方がこの集合に入るなら結合しない。
    pub critical_types: Vec<String>,
}

impl Default for MergeParams {
    fn default() -> Self {
        MergeParams {
            left_page_frac: 0.01,
            right_page_frac: 0.02,
            gap_page_frac: 0.012,
            overlap_ratio: 0.85,
            right_shrink_frac: 0.02,
            max_center_dx_frac: 0.35,
            vertical_tolerance: 0.5,
            end_punctuation: ".!?…:;".to_string(),
            critical_types: [
                "title",
                "section_header",
                "caption",
                "footnote",
                "page_header",
                "page_footer",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptionParams {
    pub max_chars: usize,
    pub max_words: usize,
    pub line_height_factor: f64,
    pub max_width_frac: f64,
    /// Used for the height test when a segment carries no line-height hint.
    /// `None` disables the height test for such segments.
    pub default_line_height: Option<f64>,
    pub keywords: Vec<String>,
    pub keyword_max_chars: usize,
}

impl Default for CaptionParams {
    fn default() -> Self {
        CaptionParams {
            max_chars: 40,
            max_words: 6,
            line_height_factor: 2.8,
            max_width_frac: 0.35,
            default_line_height: None,
            keywords: ["figure", "fig.", "fig", "table", "рисунок", "рис.", "таблица", "схема"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            keyword_max_chars: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeadingParams {
    pub type_markers: Vec<String>,
    pub question_max_chars: usize,
}

impl Default for HeadingParams {
    fn default() -> Self {
        HeadingParams {
            type_markers: ["title", "section", "header"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            question_max_chars: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WhitespaceParams {
    pub min_part_chars: usize,
    pub min_part_words: usize,
}

impl Default for WhitespaceParams {
    fn default() -> Self {
        WhitespaceParams {
            min_part_chars: 15,
            min_part_words: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DenoiseParams {
    pub min_threshold: usize,
    pub median_factor: f64,
    pub threshold_override: Option<usize>,
    /// Median line length assumed when a text has no non-empty line.
    pub empty_median: usize,
    pub sentence_end: String,
    pub min_line_chars: usize,
}

impl Default for DenoiseParams {
    fn default() -> Self {
        DenoiseParams {
            min_threshold: 30,
            median_factor: 0.9,
            threshold_override: None,
            empty_median: 60,
            sentence_end: ".!?".to_string(),
            min_line_chars: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeglueParams {
    pub min_chars: usize,
    pub min_height: f64,
    pub line_height_factor: f64,
    pub fallback_line_height: f64,
    pub wide_frac: f64,
    pub wide_min_chars: usize,
    pub window: usize,
    pub gap_factor: f64,
    pub min_big_gap: f64,
    pub punct_gap_factor: f64,
    pub min_punct_gap: f64,
    pub size_change: f64,
    pub indent_tolerance: f64,
    pub dropcap_height_ratio: f64,
    pub dropcap_font_ratio: f64,
    /// Slack when deciding whether a line's center lies inside a segment.
    pub clip_tolerance: f64,
}

impl Default for DeglueParams {
    fn default() -> Self {
        DeglueParams {
            min_chars: 120,
            min_height: 24.0,
            line_height_factor: 2.2,
            fallback_line_height: 10.0,
            wide_frac: 0.8,
            wide_min_chars: 80,
            window: 5,
            gap_factor: 1.8,
            min_big_gap: 2.5,
            punct_gap_factor: 1.2,
            min_punct_gap: 2.0,
            size_change: 0.12,
            indent_tolerance: 10.0,
            dropcap_height_ratio: 1.5,
            dropcap_font_ratio: 1.6,
            clip_tolerance: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpreadParams {
    pub ratio_threshold: f64,
    pub central_width_frac: f64,
}

impl Default for SpreadParams {
    fn default() -> Self {
        SpreadParams {
            ratio_threshold: 1.25,
            central_width_frac: 0.33,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InvariantParams {
    pub epsilon: f64,
}

impl Default for InvariantParams {
    fn default() -> Self {
        InvariantParams { epsilon: 1.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefineParams {
    /// Merge/split counts above this are reported as a warning.
    pub warn_threshold: usize,
}

impl Default for RefineParams {
    fn default() -> Self {
        RefineParams { warn_threshold: 5 }
    }
}
