mod logging;
mod progress;
mod prompt;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use progress::CliProgress;
use sortphotos_core::config::DEFAULT_SORT_FORMAT;
use sortphotos_core::namespace::Transfer;
use sortphotos_core::scan::collect_inventory;
use sortphotos_core::{
    BuiltinExifSource, ExifTool, FilterConfig, MetadataSource, Outcome, PreloadedSource,
    RunReport, SortOptions, Sorter, ThrottledProgress,
};

#[derive(Parser)]
#[command(
    name = "sortphotos",
    version,
    about = "Sort photos and videos into a dated directory tree using their embedded metadata"
)]
struct Cli {
    /// Source directory
    src_dir: PathBuf,

    /// Destination directory
    dest_dir: PathBuf,

    /// Search the source directory recursively
    #[arg(short, long)]
    recursive: bool,

    /// Copy files instead of moving them
    #[arg(short, long)]
    copy: bool,

    /// Dry run: show what would happen without changing anything
    #[arg(short, long)]
    test: bool,

    /// strftime pattern for the directory structure; `/` starts a new level
    #[arg(long, default_value = DEFAULT_SORT_FORMAT)]
    sort: String,

    /// strftime pattern for renaming files (extension is kept, lowercased)
    #[arg(long)]
    rename: Option<String>,

    /// On rename collisions, append the original file name before the counter
    #[arg(long)]
    keep_filename: bool,

    /// Keep byte-identical files instead of skipping them
    #[arg(long)]
    keep_duplicates: bool,

    /// Hour (0-23) at which a new day begins; earlier shots go to the previous day
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..24))]
    day_begins: u32,

    /// Tag groups never used for dating
    #[arg(long, num_args = 1.., default_value = "File")]
    ignore_groups: Vec<String>,

    /// Tags never used for dating, as full `Group:Tag` keys
    #[arg(long, num_args = 1..)]
    ignore_tags: Vec<String>,

    /// Only use tags from these groups (overrides the ignore lists)
    #[arg(long, num_args = 1..)]
    use_only_groups: Vec<String>,

    /// Only use these tags (overrides the ignore lists)
    #[arg(long, num_args = 1..)]
    use_only_tags: Vec<String>,

    /// Move or copy undated and hidden files into this directory under the destination
    #[arg(long)]
    unknown_dir: Option<String>,

    /// ExifTool executable
    #[arg(long, default_value = "exiftool")]
    exiftool: PathBuf,

    /// Read EXIF with the built-in reader instead of ExifTool (images only)
    #[arg(long, conflicts_with = "metadata_json")]
    builtin_exif: bool,

    /// Use a saved `exiftool -j -a -G` dump instead of reading files
    #[arg(long)]
    metadata_json: Option<PathBuf>,

    /// Do not ask for confirmation before a live run
    #[arg(short = 'y', long)]
    yes: bool,

    /// Write the run report as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Only print errors and the final summary
    #[arg(short, long)]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn sort_options(&self) -> SortOptions {
        let mut options = SortOptions::new(&self.src_dir, &self.dest_dir);
        options.recursive = self.recursive;
        options.copy_files = self.copy;
        options.dry_run = self.test;
        options.remove_duplicates = !self.keep_duplicates;
        options.day_begins = self.day_begins;
        options.sort_format = self.sort.clone();
        options.rename_format = self.rename.clone();
        options.keep_filename = self.keep_filename;
        options.ignore_groups = self.ignore_groups.clone();
        options.ignore_tags = self.ignore_tags.clone();
        options.use_only_groups = self.use_only_groups.clone();
        options.use_only_tags = self.use_only_tags.clone();
        options.unknown_dir = self.unknown_dir.clone();
        options
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init_logger(&cli.log_level, cli.quiet, cli.log_file.as_deref());
    let t_total = Instant::now();

    let options = cli.sort_options();
    let sorter = Sorter::new(options.clone()).context("invalid options")?;

    let progress = CliProgress::new(cli.quiet);
    let callback = |stage: &str, current: u64, total: u64, message: &str| {
        progress.update(stage, current, total, message);
    };

    // Stage 1: enumerate and read metadata
    progress.spinner("Reading metadata...");
    let t = Instant::now();
    let inventory = {
        let mut source = open_source(&cli, sorter.filter())?;
        let tp = ThrottledProgress::new(&callback);
        collect_inventory(&options.source_dir, options.recursive, source.as_mut(), &tp)
            .with_context(|| format!("cannot scan {}", options.source_dir.display()))?
    };
    progress.finish();
    info!(
        "Read metadata for {} of {} file(s) in {:.2}s",
        inventory.records.len(),
        inventory.files_found,
        t.elapsed().as_secs_f64()
    );

    // Stage 2: plan against a simulated destination
    let plan = sorter.plan(&inventory, &callback);
    progress.finish();
    print_summary(&plan);

    if cli.test {
        write_report(cli.report.as_deref(), &plan)?;
        return Ok(());
    }

    if plan.files_written() == 0 {
        println!("Nothing to {}.", verb(plan.transfer));
        write_report(cli.report.as_deref(), &plan)?;
        return Ok(());
    }

    let question = format!(
        "{} {} file(s) into {}?",
        capitalize(verb(plan.transfer)),
        plan.files_written(),
        options.dest_dir.display()
    );
    let confirmed = cli.yes || prompt::prompt_confirm(&question, false)?;
    if !confirmed {
        println!("Aborted, nothing was changed.");
        return Ok(());
    }

    // Stage 3: apply
    let report = sorter.apply(&inventory, confirmed, &callback)?;
    progress.finish();
    print_summary(&report);
    write_report(cli.report.as_deref(), &report)?;

    if report.count(Outcome::Failed) > 0 {
        warn!("{} file(s) could not be processed", report.count(Outcome::Failed));
    }
    eprintln!("Done in {:.2}s", t_total.elapsed().as_secs_f64());

    Ok(())
}

fn open_source(cli: &Cli, filter: &FilterConfig) -> anyhow::Result<Box<dyn MetadataSource>> {
    if let Some(dump) = &cli.metadata_json {
        let source = PreloadedSource::from_exiftool_json(dump)
            .with_context(|| format!("cannot load metadata from {}", dump.display()))?;
        info!("Loaded {} record(s) from {}", source.len(), dump.display());
        return Ok(Box::new(source));
    }
    if cli.builtin_exif {
        return Ok(Box::new(BuiltinExifSource::new()));
    }
    let exiftool = ExifTool::spawn(&cli.exiftool, filter).with_context(|| {
        format!(
            "cannot start {} (install ExifTool or use --builtin-exif)",
            cli.exiftool.display()
        )
    })?;
    Ok(Box::new(exiftool))
}

fn verb(transfer: Transfer) -> &'static str {
    match transfer {
        Transfer::Move => "move",
        Transfer::Copy => "copy",
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn print_summary(report: &RunReport) {
    println!();
    if report.dry_run {
        println!("Mode:        dry run (nothing was changed)");
    } else {
        println!("Mode:        live");
    }
    println!("Action:      {}", verb(report.transfer));
    println!("Source:      {}", report.source_dir.display());
    println!("Destination: {}", report.dest_dir.display());
    println!("Files found: {}", report.files_found);

    for outcome in Outcome::ALL {
        let count = report.count(outcome);
        if count > 0 {
            println!("  {:<24} {}", outcome.label(), count);
        }
    }

    if report.dry_run {
        let assignments = report.assignments();
        if !assignments.is_empty() {
            println!();
            println!("Planned:");
            for (src, dest) in assignments {
                println!("  {} -> {}", src.display(), dest.display());
            }
        }
    }

    for outcome in [
        Outcome::DuplicateSkipped,
        Outcome::UnknownDate,
        Outcome::Unreadable,
        Outcome::ExtensionSkipped,
    ] {
        let paths = report.paths(outcome);
        if paths.is_empty() {
            continue;
        }
        println!();
        println!("{} ({}):", capitalize(outcome.label()), paths.len());
        for path in paths {
            println!("  {}", path.display());
        }
    }

    let failures: Vec<_> = report
        .files
        .iter()
        .filter(|f| f.outcome == Outcome::Failed)
        .collect();
    if !failures.is_empty() {
        println!();
        println!("Failed ({}):", failures.len());
        for f in failures {
            println!(
                "  {}: {}",
                f.source.display(),
                f.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    if !report.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for w in &report.warnings {
            println!("  {}", w);
        }
    }
}

fn write_report(path: Option<&Path>, report: &RunReport) -> anyhow::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("cannot write report to {}", path.display()))?;
    info!("Report written to {}", path.display());
    Ok(())
}
