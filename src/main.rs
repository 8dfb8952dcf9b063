use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use segment_refiner::config::job::JobFile;
use segment_refiner::config::merged::MergedConfig;
use segment_refiner::config::{self};
use segment_refiner::pipeline::job_runner::JobConfig;
use segment_refiner::pipeline::orchestrator::run_all_jobs;

/// Refine layout-analysis segments into reading-ordered paragraphs.
#[derive(Parser, Debug)]
#[command(name = "segment_refiner")]
#[command(version)]
struct Cli {
    /// Job files (YAML). settings.yaml next to each file is picked up automatically.
    #[arg(value_name = "JOBS_YAML", required = true)]
    job_files: Vec<PathBuf>,

    /// Only log warnings and errors (RUST_LOG overrides this).
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let mut job_configs: Vec<JobConfig> = Vec::new();
    let mut has_error = false;

    for job_file_path in &cli.job_files {
        match load_job_file(job_file_path) {
            Ok(jobs) => job_configs.extend(jobs),
            Err(e) => {
                error!("failed to load job file {}: {e}", job_file_path.display());
                has_error = true;
            }
        }
    }

    let results = run_all_jobs(&job_configs);

    for result in &results {
        match result {
            Ok(job_result) => {
                info!(
                    "OK: {} -> {} ({} pages in, {} pages out)",
                    job_result.input_path.display(),
                    job_result.output_path.display(),
                    job_result.pages_in,
                    job_result.pages_out
                );
            }
            Err(_) => has_error = true,
        }
    }

    if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load settings and a job file, and turn every job into a [`JobConfig`].
fn load_job_file(job_file_path: &Path) -> segment_refiner::error::Result<Vec<JobConfig>> {
    // Load settings from the same directory as the job file.
    let settings = config::load_settings_for_job(job_file_path)?;

    let yaml_content = std::fs::read_to_string(job_file_path)?;
    let job_file: JobFile = serde_yml::from_str(&yaml_content)?;

    // Resolve job file directory for relative paths.
    let job_dir = job_file_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    Ok(job_file
        .jobs
        .iter()
        .map(|job| JobConfig {
            input_path: resolve_path(&job_dir, &job.input),
            pdf_path: job.pdf.as_deref().map(|p| resolve_path(&job_dir, p)),
            output_path: resolve_path(&job_dir, &job.output),
            pages: job.pages.clone(),
            config: MergedConfig::new(&settings, job),
        })
        .collect())
}

/// Resolve a potentially relative path against a base directory.
/// If the path is already absolute, return it as-is.
fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}
