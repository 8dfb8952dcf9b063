use super::job::Job;
use super::settings::Settings;
use super::tuning::Tuning;

#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub parallel_workers: usize,
    pub split_spreads: bool,
    pub force_split: bool,
    pub force_split_exceptions: String,
    pub deglue: bool,
    pub deglue_before_split: bool,
    pub deglue_after_split: bool,
    pub check_invariants: bool,
    pub tuning: Tuning,
}

impl MergedConfig {
    /// JobのOption値がSomeならJobの値を、NoneならSettingsの値を使用する。
    pub fn new(settings: &Settings, job: &Job) -> Self {
        MergedConfig {
            parallel_workers: settings.parallel_workers,
            split_spreads: job.split_spreads.unwrap_or(settings.split_spreads),
            force_split: job.force_split.unwrap_or(settings.force_split),
            force_split_exceptions: job.force_split_exceptions.clone().unwrap_or_default(),
            deglue: job.deglue.unwrap_or(settings.deglue),
            deglue_before_split: settings.deglue_before_split,
            deglue_after_split: settings.deglue_after_split,
            check_invariants: settings.check_invariants,
            tuning: settings.tuning.clone(),
        }
    }
}
