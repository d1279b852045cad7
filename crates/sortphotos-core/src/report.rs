use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::dedup::DuplicateStats;
use crate::namespace::Transfer;

/// Final classification of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Moved,
    Copied,
    DuplicateSkipped,
    UnknownDate,
    Unreadable,
    ExtensionSkipped,
    Failed,
}

impl Outcome {
    pub const ALL: [Outcome; 7] = [
        Outcome::Moved,
        Outcome::Copied,
        Outcome::DuplicateSkipped,
        Outcome::UnknownDate,
        Outcome::Unreadable,
        Outcome::ExtensionSkipped,
        Outcome::Failed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Moved => "moved",
            Outcome::Copied => "copied",
            Outcome::DuplicateSkipped => "duplicate skipped",
            Outcome::UnknownDate => "unknown date or hidden",
            Outcome::Unreadable => "bad or unreadable",
            Outcome::ExtensionSkipped => "unsupported extension",
            Outcome::Failed => "failed",
        }
    }

    /// Whether the file ended up in the dated tree.
    pub fn is_transferred(self) -> bool {
        matches!(self, Outcome::Moved | Outcome::Copied)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    pub outcome: Outcome,
    /// Where the file went, or the occupant it duplicates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    /// Oldest timestamp found, before early-morning reclassification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    pub fn new(source: impl Into<PathBuf>, outcome: Outcome) -> Self {
        Self {
            source: source.into(),
            outcome,
            destination: None,
            date: None,
            tags: Vec::new(),
            error: None,
        }
    }
}

/// Everything a run did (or would do, for a dry run).
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub dry_run: bool,
    pub transfer: Transfer,
    pub source_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub files_found: usize,
    pub files: Vec<FileReport>,
    pub warnings: Vec<String>,
    pub duplicate_stats: DuplicateStats,
}

impl RunReport {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.files.iter().filter(|f| f.outcome == outcome).count()
    }

    pub fn counts(&self) -> BTreeMap<Outcome, usize> {
        Outcome::ALL
            .iter()
            .map(|&o| (o, self.count(o)))
            .collect()
    }

    pub fn paths(&self, outcome: Outcome) -> Vec<&Path> {
        self.files
            .iter()
            .filter(|f| f.outcome == outcome)
            .map(|f| f.source.as_path())
            .collect()
    }

    /// Source → destination for every moved or copied file.
    pub fn assignments(&self) -> Vec<(&Path, &Path)> {
        self.files
            .iter()
            .filter(|f| f.outcome.is_transferred())
            .filter_map(|f| Some((f.source.as_path(), f.destination.as_deref()?)))
            .collect()
    }

    pub fn files_affected(&self) -> usize {
        self.files.iter().filter(|f| f.outcome.is_transferred()).count()
    }

    /// Files that land somewhere under the destination, including the
    /// unknown-date bucket.
    pub fn files_written(&self) -> usize {
        self.files
            .iter()
            .filter(|f| match f.outcome {
                Outcome::Moved | Outcome::Copied => true,
                Outcome::UnknownDate => f.destination.is_some(),
                _ => false,
            })
            .count()
    }

    pub fn files_untouched(&self) -> usize {
        self.files_found.saturating_sub(self.files_affected())
    }

    /// Files left in place for any reason other than a confirmed duplicate.
    pub fn skipped(&self) -> usize {
        self.count(Outcome::ExtensionSkipped) + self.count(Outcome::Unreadable) + self.count(Outcome::UnknownDate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(files: Vec<FileReport>) -> RunReport {
        RunReport {
            dry_run: true,
            transfer: Transfer::Move,
            source_dir: PathBuf::from("/in"),
            dest_dir: PathBuf::from("/out"),
            files_found: files.len(),
            files,
            warnings: vec![],
            duplicate_stats: DuplicateStats::default(),
        }
    }

    #[test]
    fn test_counts_and_paths() {
        let mut moved = FileReport::new("/in/a.jpg", Outcome::Moved);
        moved.destination = Some(PathBuf::from("/out/2021/a.jpg"));
        let r = report(vec![
            moved,
            FileReport::new("/in/b.jpg", Outcome::DuplicateSkipped),
            FileReport::new("/in/c.txt", Outcome::ExtensionSkipped),
            FileReport::new("/in/d.jpg", Outcome::UnknownDate),
        ]);

        assert_eq!(r.count(Outcome::Moved), 1);
        assert_eq!(r.counts()[&Outcome::Copied], 0);
        assert_eq!(r.counts().len(), Outcome::ALL.len());
        assert_eq!(r.paths(Outcome::UnknownDate), vec![Path::new("/in/d.jpg")]);
        assert_eq!(
            r.assignments(),
            vec![(Path::new("/in/a.jpg"), Path::new("/out/2021/a.jpg"))]
        );
        assert_eq!(r.files_affected(), 1);
        assert_eq!(r.files_written(), 1);
        assert_eq!(r.files_untouched(), 3);
        assert_eq!(r.skipped(), 2);
    }

    #[test]
    fn test_serializes_outcomes_kebab_case() {
        let r = report(vec![FileReport::new("/in/b.jpg", Outcome::DuplicateSkipped)]);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["files"][0]["outcome"], "duplicate-skipped");
        assert_eq!(json["transfer"], "move");
        assert!(json["files"][0].get("destination").is_none());
    }
}
