pub mod collision;
pub mod config;
pub mod date;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod namespace;
pub mod plan;
pub mod report;
pub mod run;
pub mod scan;
pub mod source;

use std::sync::Mutex;
use std::time::{Duration, Instant};

pub use config::SortOptions;
pub use error::{Error, Result};
pub use filter::FilterConfig;
pub use metadata::{MetadataRecord, TagValue};
pub use report::{FileReport, Outcome, RunReport};
pub use run::Sorter;
pub use scan::Inventory;
pub use source::{BuiltinExifSource, ExifTool, MetadataSource, PreloadedSource};

/// Receives `(stage, current, total, message)`; `current` is zero-based.
pub type ProgressCallback<'a> = dyn Fn(&str, u64, u64, &str) + Send + Sync + 'a;

/// Forwards at most one update per 200ms to the wrapped callback.
/// The last update of a stage always gets through.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback<'a>,
    last_emit: Mutex<Option<Instant>>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback<'a>) -> Self {
        Self {
            inner,
            last_emit: Mutex::new(None),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            let Ok(mut last) = self.last_emit.lock() else {
                return;
            };
            if last.is_some_and(|t| t.elapsed() < Duration::from_millis(200)) {
                return;
            }
            *last = Some(Instant::now());
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Enumerate the source directory, read metadata and run the sorter.
/// A live run only happens when `confirmed` is true.
pub fn process(
    options: &SortOptions,
    source: &mut dyn MetadataSource,
    confirmed: bool,
    progress_callback: &ProgressCallback,
) -> Result<RunReport> {
    let sorter = Sorter::new(options.clone())?;
    let tp = ThrottledProgress::new(progress_callback);
    let inventory = scan::collect_inventory(&options.source_dir, options.recursive, source, &tp)?;
    sorter.run(&inventory, confirmed, progress_callback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_throttled_progress_always_emits_last() {
        let calls = AtomicU64::new(0);
        let cb = |_: &str, _: u64, _: u64, _: &str| {
            calls.fetch_add(1, Ordering::Relaxed);
        };
        let tp = ThrottledProgress::new(&cb);
        for i in 0..100 {
            tp.report("sort", i, 100, "");
        }
        // First call and the final one, everything else lands inside the window.
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }
}
