use std::path::Path;

use serde::Deserialize;

use super::tuning::Tuning;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub parallel_workers: usize,
    pub split_spreads: bool,
    pub force_split: bool,
    pub deglue: bool,
    pub deglue_before_split: bool,
    pub deglue_after_split: bool,
    pub check_invariants: bool,
    pub tuning: Tuning,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            parallel_workers: 0,
            split_spreads: true,
            force_split: false,
            deglue: true,
            deglue_before_split: false,
            deglue_after_split: true,
            check_invariants: true,
            tuning: Tuning::default(),
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| {
            crate::error::RefineError::config(format!("Failed to parse settings YAML: {e}"))
        })
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
