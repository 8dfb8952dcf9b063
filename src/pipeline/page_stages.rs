// ページ列に対する各ステージの実行と統計・ログ

use rayon::ThreadPool;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::job::parse_page_set;
use crate::config::merged::MergedConfig;
use crate::config::tuning::{MergeTolerances, Tuning};
use crate::deglue::{DeglueStats, deglue_pages};
use crate::error::RefineError;
use crate::invariants::assert_layout_invariants;
use crate::model::PageBatch;
use crate::refine::{RefineStats, refine_page};
use crate::source::SourceDocument;
use crate::spread::{SplitStats, split_spreads, split_spreads_force_half};

/// ジョブ全体の統計。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// 見開き分割前の整形
    pub tight: RefineStats,
    /// 見開き分割後の整形
    pub loose: RefineStats,
    pub split: SplitStats,
    pub deglue: DeglueStats,
}

/// `parallel_workers > 0` ならその数のスレッドプールを作る。0 は rayon の既定。
pub fn build_pool(parallel_workers: usize) -> crate::error::Result<Option<ThreadPool>> {
    if parallel_workers == 0 {
        return Ok(None);
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(parallel_workers)
        .build()
        .map(Some)
        .map_err(|e| RefineError::config(format!("failed to build thread pool: {e}")))
}

/// 全ページに整形パスを並列に適用する。ページ順は保たれる。
pub fn refine_pages(
    pages: &[PageBatch],
    tol: &MergeTolerances,
    tuning: &Tuning,
    pool: Option<&ThreadPool>,
    pass: &str,
) -> (Vec<PageBatch>, RefineStats) {
    let run = || -> Vec<(PageBatch, RefineStats)> {
        pages
            .par_iter()
            .map(|pb| refine_page(pb, tol, tuning))
            .collect()
    };
    let results = match pool {
        Some(p) => p.install(run),
        None => run(),
    };

    let mut total = RefineStats::default();
    let mut out = Vec::with_capacity(results.len());
    for (pb, stats) in results {
        if stats.exceeds(tuning.refine.warn_threshold) {
            warn!(
                pass,
                page = pb.page_number,
                side = pb.logical_side.map(|s| s.as_str()),
                merges = stats.merges,
                splits = stats.splits,
                "many merges/splits on one page"
            );
        }
        total += stats;
        out.push(pb);
    }
    debug!(pass, merges = total.merges, splits = total.splits, "refine pass done");
    (out, total)
}

/// 見開き分割。`force_split` なら強制二分割、そうでなければ `split_spreads` のとき元文書で判定する。
pub fn split_stage(
    pages: Vec<PageBatch>,
    config: &MergedConfig,
    doc: Option<&dyn SourceDocument>,
) -> crate::error::Result<(Vec<PageBatch>, SplitStats)> {
    if config.force_split {
        let total_pages = doc
            .map(|d| d.page_count())
            .or_else(|| pages.iter().map(|pb| pb.page_number).max())
            .unwrap_or(0);
        let exceptions = parse_page_set(&config.force_split_exceptions, total_pages)?;
        debug!(?exceptions, "forced spread split");
        return Ok(split_spreads_force_half(pages, &exceptions));
    }

    if !config.split_spreads {
        return Ok((pages, SplitStats::default()));
    }

    match doc {
        Some(doc) => {
            let (out, stats) = split_spreads(pages, doc, &config.tuning.spread);
            if stats.skipped > 0 {
                warn!(
                    skipped = stats.skipped,
                    "pages missing from source document or with zero height were not split"
                );
            }
            Ok((out, stats))
        }
        None => {
            warn!("no source PDF; automatic spread detection skipped");
            Ok((pages, SplitStats::default()))
        }
    }
}

pub fn deglue_stage(
    pages: Vec<PageBatch>,
    tuning: &Tuning,
    doc: Option<&dyn SourceDocument>,
) -> (Vec<PageBatch>, DeglueStats) {
    let Some(doc) = doc else {
        warn!("no source PDF; deglue skipped");
        return (pages, DeglueStats::default());
    };

    let (out, stats) = deglue_pages(pages, doc, &tuning.deglue);
    if stats.pages_missing > 0 {
        warn!(
            pages_missing = stats.pages_missing,
            "pages missing from source document were not deglued"
        );
    }
    if stats.parts_added > tuning.refine.warn_threshold {
        warn!(
            segments_split = stats.segments_split,
            parts_added = stats.parts_added,
            "deglue produced many new segments"
        );
    }
    (out, stats)
}

fn check(pages: &[PageBatch], context: &str, config: &MergedConfig) -> crate::error::Result<()> {
    if config.check_invariants {
        assert_layout_invariants(pages, context, &config.tuning.invariants)?;
    }
    Ok(())
}

/// 整形パイプライン本体。
///
/// 整形(tight) → [deglue] → 見開き分割 → 整形(loose) → [deglue] の順で進め、
/// 各ステージ後に幾何条件を検査する（`check_invariants` が有効な場合）。
/// 2回の deglue はそれぞれ `deglue_before_split` / `deglue_after_split` で有効になる。
pub fn process_pages(
    pages: Vec<PageBatch>,
    config: &MergedConfig,
    doc: Option<&dyn SourceDocument>,
) -> crate::error::Result<(Vec<PageBatch>, PipelineStats)> {
    let pool = build_pool(config.parallel_workers)?;
    let tuning = &config.tuning;
    let mut stats = PipelineStats::default();

    let (pages, tight) = refine_pages(&pages, &tuning.tight, tuning, pool.as_ref(), "tight");
    stats.tight = tight;
    check(&pages, "refine_tight", config)?;

    let pages = if config.deglue && config.deglue_before_split {
        let (pages, d) = deglue_stage(pages, tuning, doc);
        stats.deglue += d;
        check(&pages, "deglue", config)?;
        pages
    } else {
        pages
    };

    let (pages, split) = split_stage(pages, config, doc)?;
    stats.split = split;
    check(&pages, "split_spreads", config)?;

    let (pages, loose) = refine_pages(&pages, &tuning.loose, tuning, pool.as_ref(), "loose");
    stats.loose = loose;
    check(&pages, "refine_loose", config)?;

    let pages = if config.deglue && config.deglue_after_split {
        let (pages, d) = deglue_stage(pages, tuning, doc);
        stats.deglue += d;
        check(&pages, "deglue", config)?;
        pages
    } else {
        pages
    };

    info!(
        pages = pages.len(),
        merges = stats.tight.merges + stats.loose.merges,
        splits = stats.tight.splits + stats.loose.splits,
        spreads_split = stats.split.pages_split,
        deglued = stats.deglue.segments_split,
        "pipeline finished"
    );
    Ok((pages, stats))
}
