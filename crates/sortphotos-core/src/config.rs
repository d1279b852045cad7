use std::path::{Component, Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::plan::format_date;

pub const DEFAULT_SORT_FORMAT: &str = "%Y/%m-%b";

fn default_sort_format() -> String {
    DEFAULT_SORT_FORMAT.to_string()
}

fn default_ignore_groups() -> Vec<String> {
    vec!["File".to_string()]
}

fn default_true() -> bool {
    true
}

/// Everything one sorting run needs to know.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortOptions {
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    #[serde(default)]
    pub recursive: bool,
    /// Copy instead of move.
    #[serde(default)]
    pub copy_files: bool,
    #[serde(default)]
    pub dry_run: bool,
    /// Skip files whose bytes already exist at the destination.
    #[serde(default = "default_true")]
    pub remove_duplicates: bool,
    /// Hour (0-23) at which a new day begins for bucketing.
    #[serde(default)]
    pub day_begins: u32,
    /// strftime pattern for the directory tree; `/` separates levels.
    #[serde(default = "default_sort_format")]
    pub sort_format: String,
    /// strftime pattern for renaming files; original name when absent.
    #[serde(default)]
    pub rename_format: Option<String>,
    /// Include the original stem in collision suffixes.
    #[serde(default)]
    pub keep_filename: bool,
    #[serde(default = "default_ignore_groups")]
    pub ignore_groups: Vec<String>,
    #[serde(default)]
    pub ignore_tags: Vec<String>,
    #[serde(default)]
    pub use_only_groups: Vec<String>,
    #[serde(default)]
    pub use_only_tags: Vec<String>,
    /// Route files without a usable date into `<dest>/<unknown_dir>`
    /// instead of leaving them in place.
    #[serde(default)]
    pub unknown_dir: Option<String>,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::new(),
            dest_dir: PathBuf::new(),
            recursive: false,
            copy_files: false,
            dry_run: false,
            remove_duplicates: true,
            day_begins: 0,
            sort_format: default_sort_format(),
            rename_format: None,
            keep_filename: false,
            ignore_groups: default_ignore_groups(),
            ignore_tags: Vec::new(),
            use_only_groups: Vec::new(),
            use_only_tags: Vec::new(),
            unknown_dir: None,
        }
    }
}

impl SortOptions {
    pub fn new(source_dir: impl Into<PathBuf>, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            dest_dir: dest_dir.into(),
            ..Self::default()
        }
    }

    /// Reject settings that would otherwise fail halfway through a run.
    pub fn validate(&self) -> Result<()> {
        if self.day_begins > 23 {
            return Err(Error::Config(format!(
                "day_begins must be between 0 and 23, got {}",
                self.day_begins
            )));
        }

        let probe = NaiveDate::from_ymd_opt(2000, 1, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .ok_or_else(|| Error::Config("probe date out of range".to_string()))?;
        if self.sort_format.trim().is_empty() {
            return Err(Error::InvalidFormat {
                pattern: self.sort_format.clone(),
            });
        }
        format_date(&probe, &self.sort_format)?;
        // A rename must stay a single file name; directory levels belong
        // in the sort format.
        if let Some(rename) = &self.rename_format {
            let name = format_date(&probe, rename)?;
            if name.is_empty() || name.contains(|c: char| c == '/' || c == '\\') {
                return Err(Error::InvalidFormat {
                    pattern: rename.clone(),
                });
            }
        }

        if let Some(dir) = &self.unknown_dir {
            let escapes = Path::new(dir)
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
            if dir.is_empty() || escapes {
                return Err(Error::Config(format!(
                    "unknown_dir must be a relative path inside the destination, got {dir:?}"
                )));
            }
        }

        Ok(())
    }
}
