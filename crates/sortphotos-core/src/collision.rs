use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::dedup::DuplicateDetector;
use crate::namespace::Namespace;
use crate::plan::DestinationPlan;

#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionPolicy {
    /// Stop at an occupant with identical bytes instead of renaming.
    pub remove_duplicates: bool,
    /// Use `{stem}_{original stem}_{n}{ext}` instead of `{stem}_{n}{ext}`.
    pub keep_filename: bool,
}

/// Candidate destinations for one file: the planned path, then the
/// planned path with suffix `n`, `n + 1`, ... Each candidate is
/// produced once and the counter never goes back.
#[derive(Debug, Clone)]
pub struct CandidatePaths {
    planned: Option<PathBuf>,
    dir: PathBuf,
    stem: String,
    ext: String,
    original_stem: Option<String>,
    next: u64,
}

impl CandidatePaths {
    pub fn new(plan: &DestinationPlan, source: &Path, keep_filename: bool) -> Self {
        let name = Path::new(&plan.filename);
        let stem = name
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = name
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let original_stem = keep_filename.then(|| {
            source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        Self {
            planned: Some(plan.path()),
            dir: plan.dir.clone(),
            stem,
            ext,
            original_stem,
            next: u64::from(plan.counter),
        }
    }
}

impl Iterator for CandidatePaths {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        if let Some(planned) = self.planned.take() {
            return Some(planned);
        }
        let n = self.next;
        self.next = self.next.checked_add(1)?;
        let name = match &self.original_stem {
            Some(orig) => format!("{}_{}_{}{}", self.stem, orig, n, self.ext),
            None => format!("{}_{}{}", self.stem, n, self.ext),
        };
        Some(self.dir.join(name))
    }
}

/// Where the collision walk ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// `path` is free; the file may be written there.
    Free { path: PathBuf, probes: u32 },
    /// The occupant of `path` has identical bytes; nothing should be written.
    Duplicate { path: PathBuf, probes: u32 },
}

impl Resolution {
    pub fn path(&self) -> &Path {
        match self {
            Resolution::Free { path, .. } | Resolution::Duplicate { path, .. } => path,
        }
    }

    /// Number of candidate paths inspected, including the final one.
    pub fn probes(&self) -> u32 {
        match self {
            Resolution::Free { probes, .. } | Resolution::Duplicate { probes, .. } => *probes,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Resolution::Duplicate { .. })
    }
}

/// Walk the candidate paths for `src` until one is free or holds a
/// duplicate. Duplicate-check failures are pushed to `anomalies` and
/// the occupant is treated as different content.
pub fn resolve_path(
    src: &Path,
    plan: &DestinationPlan,
    policy: CollisionPolicy,
    namespace: &dyn Namespace,
    detector: &mut DuplicateDetector,
    anomalies: &mut Vec<String>,
) -> Resolution {
    let mut probes = 0u32;
    let candidates = CandidatePaths::new(plan, src, policy.keep_filename);

    for candidate in candidates {
        probes += 1;
        let Some(occupant) = namespace.occupant(&candidate) else {
            return Resolution::Free {
                path: candidate,
                probes,
            };
        };

        if policy.remove_duplicates {
            match detector.are_duplicates(src, &occupant) {
                Ok(true) => {
                    debug!(
                        "identical file already exists at {}, skipping {}",
                        candidate.display(),
                        src.display()
                    );
                    return Resolution::Duplicate {
                        path: candidate,
                        probes,
                    };
                }
                Ok(false) => {}
                Err(e) => {
                    let msg = format!(
                        "duplicate check failed for {} against {}: {}",
                        src.display(),
                        occupant.display(),
                        e
                    );
                    warn!("{}", msg);
                    anomalies.push(msg);
                }
            }
        }
        debug!("{} is taken, trying the next name", candidate.display());
    }

    // Only reachable once the u64 suffix space is used up. Report the
    // planned path as taken so nothing gets overwritten.
    Resolution::Duplicate {
        path: plan.path(),
        probes,
    }
}
