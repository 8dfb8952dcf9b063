// ジョブ単位: セグメントJSON読込 -> ページ整形 -> 出力JSON書き出し

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::merged::MergedConfig;
use crate::error::RefineError;
use crate::model::{PageBatch, SegmentRecord, build_pages, select_pages};
use crate::pdf::reader::PdfSource;
use crate::pipeline::page_stages::{PipelineStats, process_pages};
use crate::source::SourceDocument;

/// Configuration for a single job.
pub struct JobConfig {
    /// Layout service output (JSON records).
    pub input_path: PathBuf,
    /// Original PDF, used for spread detection and degluing.
    pub pdf_path: Option<PathBuf>,
    pub output_path: PathBuf,
    /// 1-based physical pages to keep (`None` = all).
    pub pages: Option<Vec<u32>>,
    pub config: MergedConfig,
}

/// Result of processing a single job.
#[derive(Debug)]
pub struct JobResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub pages_in: usize,
    pub pages_out: usize,
    pub stats: PipelineStats,
}

/// レイアウト解析サービスの出力。レコード配列そのもの、または `{"segments": [...]}`。
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LayoutInput {
    Records(Vec<SegmentRecord>),
    Wrapped { segments: Vec<SegmentRecord> },
}

impl LayoutInput {
    pub fn into_records(self) -> Vec<SegmentRecord> {
        match self {
            LayoutInput::Records(r) => r,
            LayoutInput::Wrapped { segments } => segments,
        }
    }
}

/// 出力JSONのトップレベル。
#[derive(Debug, Serialize, Deserialize)]
pub struct RefinedDocument {
    pub pages: Vec<PageBatch>,
}

/// Run a single job: read the layout records, refine every page and write
/// the resulting page batches as JSON.
pub fn run_job(job: &JobConfig) -> crate::error::Result<JobResult> {
    let raw = std::fs::read_to_string(&job.input_path).map_err(|e| {
        RefineError::input(format!("failed to read {}: {e}", job.input_path.display()))
    })?;
    let input: LayoutInput = serde_json::from_str(&raw)?;

    let mut pages = build_pages(input.into_records())?;
    if let Some(keep) = &job.pages {
        pages = select_pages(pages, keep);
    }
    let pages_in = pages.len();

    let source = match &job.pdf_path {
        Some(path) => Some(PdfSource::open(path)?),
        None => {
            warn!(
                input = %job.input_path.display(),
                "no pdf configured; spread detection and deglue need the source document"
            );
            None
        }
    };
    let doc = source.as_ref().map(|s| s as &dyn SourceDocument);

    let (pages, stats) = process_pages(pages, &job.config, doc)?;
    let pages_out = pages.len();

    let json = serde_json::to_string_pretty(&RefinedDocument { pages })
        .map_err(|e| RefineError::output(e.to_string()))?;
    std::fs::write(&job.output_path, json).map_err(|e| {
        RefineError::output(format!("failed to write {}: {e}", job.output_path.display()))
    })?;

    info!(
        input = %job.input_path.display(),
        output = %job.output_path.display(),
        pages_in,
        pages_out,
        "job finished"
    );

    Ok(JobResult {
        input_path: job.input_path.clone(),
        output_path: job.output_path.clone(),
        pages_in,
        pages_out,
        stats,
    })
}
