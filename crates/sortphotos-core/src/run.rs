use std::path::Path;

use tracing::{debug, error, info};

use crate::collision::{resolve_path, CollisionPolicy, Resolution};
use crate::config::SortOptions;
use crate::date::{reclassify_early_morning, resolve_oldest, ResolvedDate};
use crate::dedup::DuplicateDetector;
use crate::error::{Error, Result};
use crate::filter::FilterConfig;
use crate::metadata::MetadataRecord;
use crate::namespace::{LiveNamespace, Namespace, SimulatedNamespace, Transfer};
use crate::plan::{build_plan, unknown_plan, DestinationPlan};
use crate::report::{FileReport, Outcome, RunReport};
use crate::scan::{check_source_dir, is_hidden, Inventory};
use crate::{ProgressCallback, ThrottledProgress};

/// Drives the per-file pipeline: filter tags, resolve the date, plan
/// the destination, resolve collisions, then move or copy.
///
/// [`Sorter::plan`] runs everything against a simulated destination;
/// [`Sorter::apply`] does the same against the real one once confirmed.
pub struct Sorter {
    options: SortOptions,
    filter: FilterConfig,
}

/// Per-run mutable state.
struct RunState<'a> {
    namespace: &'a mut dyn Namespace,
    detector: DuplicateDetector,
    warnings: Vec<String>,
}

impl Sorter {
    pub fn new(options: SortOptions) -> Result<Self> {
        options.validate()?;
        let filter = FilterConfig::from_options(&options);
        Ok(Self { options, filter })
    }

    pub fn options(&self) -> &SortOptions {
        &self.options
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    pub fn transfer(&self) -> Transfer {
        if self.options.copy_files {
            Transfer::Copy
        } else {
            Transfer::Move
        }
    }

    /// Dry run: compute every outcome and destination, write nothing.
    pub fn plan(&self, inventory: &Inventory, progress: &ProgressCallback) -> RunReport {
        let mut namespace = SimulatedNamespace::new();
        self.run_with(inventory, &mut namespace, progress)
    }

    /// Live run. Refuses to touch anything unless `confirmed`.
    pub fn apply(
        &self,
        inventory: &Inventory,
        confirmed: bool,
        progress: &ProgressCallback,
    ) -> Result<RunReport> {
        if !confirmed {
            return Err(Error::NotConfirmed);
        }
        check_source_dir(&self.options.source_dir)?;
        let mut namespace = LiveNamespace::new();
        Ok(self.run_with(inventory, &mut namespace, progress))
    }

    /// Plan or apply depending on `options.dry_run`.
    pub fn run(
        &self,
        inventory: &Inventory,
        confirmed: bool,
        progress: &ProgressCallback,
    ) -> Result<RunReport> {
        if self.options.dry_run {
            Ok(self.plan(inventory, progress))
        } else {
            self.apply(inventory, confirmed, progress)
        }
    }

    /// Process every record of `inventory` against `namespace`.
    pub fn run_with(
        &self,
        inventory: &Inventory,
        namespace: &mut dyn Namespace,
        progress: &ProgressCallback,
    ) -> RunReport {
        let tp = ThrottledProgress::new(progress);
        let transfer = self.transfer();
        let dry_run = namespace.is_simulated();

        info!(
            "Sorting {} file(s) from {} into {} ({}, {})",
            inventory.records.len(),
            self.options.source_dir.display(),
            self.options.dest_dir.display(),
            if dry_run { "dry run" } else { "live" },
            if transfer == Transfer::Copy { "copy" } else { "move" },
        );

        let mut files: Vec<FileReport> = Vec::with_capacity(
            inventory.records.len() + inventory.unreadable.len() + inventory.extension_skipped.len(),
        );
        files.extend(
            inventory
                .extension_skipped
                .iter()
                .map(|p| FileReport::new(p, Outcome::ExtensionSkipped)),
        );
        files.extend(
            inventory
                .unreadable
                .iter()
                .map(|p| FileReport::new(p, Outcome::Unreadable)),
        );

        let mut state = RunState {
            namespace,
            detector: DuplicateDetector::new(),
            warnings: Vec::new(),
        };

        let total = inventory.records.len() as u64;
        for (idx, record) in inventory.records.iter().enumerate() {
            debug!("[{}/{}] {}", idx + 1, total, record.source().display());
            let report = self.process_record(record, transfer, &mut state);
            if report.outcome == Outcome::Failed {
                error!(
                    "{}: {}",
                    report.source.display(),
                    report.error.as_deref().unwrap_or("unknown error")
                );
            }
            files.push(report);
            tp.report("sort", idx as u64, total, "Sorting files");
        }

        let report = RunReport {
            dry_run,
            transfer,
            source_dir: self.options.source_dir.clone(),
            dest_dir: self.options.dest_dir.clone(),
            files_found: inventory.files_found.max(files.len()),
            files,
            warnings: state.warnings,
            duplicate_stats: state.detector.stats(),
        };
        info!(
            "Done: {} transferred, {} duplicates, {} skipped, {} failed",
            report.files_affected(),
            report.count(Outcome::DuplicateSkipped),
            report.skipped(),
            report.count(Outcome::Failed),
        );
        report
    }

    fn process_record(&self, record: &MetadataRecord, transfer: Transfer, state: &mut RunState<'_>) -> FileReport {
        let source = record.source();
        let resolved = resolve_oldest(record, &self.filter);

        let resolved = match resolved {
            Some(resolved) if !is_hidden(source) => resolved,
            _ => return self.process_unknown(source, transfer, state),
        };
        debug!("Date/Time: {}", resolved.date);
        debug!("Corresponding tags: {}", resolved.keys.join(", "));

        let bucket_date = reclassify_early_morning(resolved.date, self.options.day_begins);
        let plan = match build_plan(
            &self.options.dest_dir,
            &bucket_date,
            &self.options.sort_format,
            self.options.rename_format.as_deref(),
            source,
        ) {
            Ok(plan) => plan,
            Err(e) => return failed(source, Some(&resolved), e.to_string()),
        };

        let success = match transfer {
            Transfer::Move => Outcome::Moved,
            Transfer::Copy => Outcome::Copied,
        };
        self.place(source, &plan, transfer, success, Some(&resolved), state)
    }

    fn process_unknown(&self, source: &Path, transfer: Transfer, state: &mut RunState<'_>) -> FileReport {
        match &self.options.unknown_dir {
            Some(dir) => {
                let plan = unknown_plan(&self.options.dest_dir, dir, source);
                self.place(source, &plan, transfer, Outcome::UnknownDate, None, state)
            }
            None => {
                debug!("no usable date (or hidden), leaving {} in place", source.display());
                FileReport::new(source, Outcome::UnknownDate)
            }
        }
    }

    /// Create the target directory, walk collisions and transfer the file.
    fn place(
        &self,
        source: &Path,
        plan: &DestinationPlan,
        transfer: Transfer,
        success: Outcome,
        resolved: Option<&ResolvedDate>,
        state: &mut RunState<'_>,
    ) -> FileReport {
        if let Err(e) = state.namespace.create_dir_all(&plan.dir) {
            return failed(
                source,
                resolved,
                format!("cannot create {}: {}", plan.dir.display(), e),
            );
        }

        let policy = CollisionPolicy {
            remove_duplicates: self.options.remove_duplicates,
            keep_filename: self.options.keep_filename,
        };
        let resolution = resolve_path(
            source,
            plan,
            policy,
            &*state.namespace,
            &mut state.detector,
            &mut state.warnings,
        );

        let mut report = FileReport::new(source, success);
        if let Some(resolved) = resolved {
            report.date = Some(resolved.date);
            report.tags = resolved.keys.clone();
        }

        match resolution {
            Resolution::Duplicate { path, .. } => {
                debug!("identical file already exists: {}", path.display());
                report.outcome = Outcome::DuplicateSkipped;
                report.destination = Some(path);
            }
            Resolution::Free { path, probes } => {
                if probes > 1 {
                    debug!("same name already exists, renaming to {}", path.display());
                }
                debug!("Destination ({:?}): {}", transfer, path.display());
                if let Err(e) = state.namespace.transfer(source, &path, transfer) {
                    report.outcome = Outcome::Failed;
                    report.error = Some(format!("cannot write {}: {}", path.display(), e));
                }
                report.destination = Some(path);
            }
        }
        report
    }
}

fn failed(source: &Path, resolved: Option<&ResolvedDate>, error: String) -> FileReport {
    let mut report = FileReport::new(source, Outcome::Failed);
    if let Some(resolved) = resolved {
        report.date = Some(resolved.date);
        report.tags = resolved.keys.clone();
    }
    report.error = Some(error);
    report
}
