use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::{Error, Result};

/// Where a file should land before collisions are considered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationPlan {
    /// Directory levels below the destination root.
    pub segments: Vec<String>,
    /// Absolute target directory (destination root joined with `segments`).
    pub dir: PathBuf,
    pub filename: String,
    /// First suffix tried when the planned name is taken.
    pub counter: u32,
}

impl DestinationPlan {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }
}

/// Format `date` with a strftime pattern, reporting bad patterns
/// instead of panicking the way `to_string()` would.
pub fn format_date(date: &NaiveDateTime, pattern: &str) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", date.format(pattern)).map_err(|_| Error::InvalidFormat {
        pattern: pattern.to_string(),
    })?;
    Ok(out)
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Build the destination directory and filename for a dated file.
pub fn build_plan(
    dest_root: &Path,
    date: &NaiveDateTime,
    sort_format: &str,
    rename_format: Option<&str>,
    source: &Path,
) -> Result<DestinationPlan> {
    let structure = format_date(date, sort_format)?;
    let segments: Vec<String> = structure
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let original = file_name_of(source);
    let filename = match rename_format {
        Some(pattern) => {
            let ext = Path::new(&original)
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                .unwrap_or_default();
            format!("{}{}", format_date(date, pattern)?, ext)
        }
        None => original,
    };

    Ok(DestinationPlan {
        dir: segments.iter().fold(dest_root.to_path_buf(), |dir, s| dir.join(s)),
        segments,
        filename,
        counter: 1,
    })
}

/// Plan for a file without a usable date, kept under its original name.
pub fn unknown_plan(dest_root: &Path, unknown_dir: &str, source: &Path) -> DestinationPlan {
    let segments: Vec<String> = unknown_dir
        .split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    DestinationPlan {
        dir: segments.iter().fold(dest_root.to_path_buf(), |dir, s| dir.join(s)),
        segments,
        filename: file_name_of(source),
        counter: 1,
    }
}
