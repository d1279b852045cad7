use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;

use sortphotos_core::{
    process, Error, Inventory, MetadataRecord, Outcome, PreloadedSource, SortOptions, Sorter,
    TagValue,
};

fn quiet(_: &str, _: u64, _: u64, _: &str) {}

fn dated(path: &Path, date: &str) -> MetadataRecord {
    MetadataRecord::new(path).with_tag("EXIF:DateTimeOriginal", TagValue::Scalar(date.to_string()))
}

fn options(src: &Path, dest: &Path) -> SortOptions {
    let mut opts = SortOptions::new(src, dest);
    opts.sort_format = "%Y/%m".to_string();
    opts
}

fn write(path: &Path, bytes: &[u8]) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
    path.to_path_buf()
}

fn count_files_recursive(dir: &Path) -> usize {
    let mut count = 0;
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                count += count_files_recursive(&path);
            } else if path.is_file() {
                count += 1;
            }
        }
    }
    count
}

#[test]
fn test_early_morning_photo_lands_in_previous_day() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let photo = write(&src.path().join("IMG_0001.JPG"), b"sunrise");

    let mut opts = options(src.path(), dest.path());
    opts.day_begins = 8;
    opts.rename_format = Some("%Y-%m-%d".to_string());
    let sorter = Sorter::new(opts).unwrap();
    let inventory = Inventory::from_records(vec![dated(&photo, "2021:06:15 07:30:00")]);

    let report = sorter.apply(&inventory, true, &quiet).unwrap();

    let expected = dest.path().join("2021").join("06").join("2021-06-14.jpg");
    assert_eq!(report.count(Outcome::Moved), 1);
    assert_eq!(report.files[0].destination.as_deref(), Some(expected.as_path()));
    assert_eq!(report.files[0].tags, vec!["EXIF:DateTimeOriginal".to_string()]);
    assert_eq!(fs::read(&expected).unwrap(), b"sunrise");
    assert!(!photo.exists());
}

#[test]
fn test_identical_files_are_skipped_as_duplicates() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let first = write(&src.path().join("a").join("IMG_1.jpg"), b"same bytes");
    let second = write(&src.path().join("b").join("IMG_1.jpg"), b"same bytes");
    let records = vec![
        dated(&first, "2020:02:02 10:00:00"),
        dated(&second, "2020:02:02 10:00:00"),
    ];

    let sorter = Sorter::new(options(src.path(), dest.path())).unwrap();
    let report = sorter
        .apply(&Inventory::from_records(records), true, &quiet)
        .unwrap();

    assert_eq!(report.count(Outcome::Moved), 1);
    assert_eq!(report.count(Outcome::DuplicateSkipped), 1);
    assert_eq!(report.paths(Outcome::DuplicateSkipped), vec![second.as_path()]);
    assert!(second.exists(), "duplicates stay where they are");
    assert_eq!(count_files_recursive(dest.path()), 1);
    assert_eq!(report.duplicate_stats.full_digests, 2);
}

#[test]
fn test_identical_files_are_renamed_when_keeping_duplicates() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let first = write(&src.path().join("a").join("IMG_1.jpg"), b"same bytes");
    let second = write(&src.path().join("b").join("IMG_1.jpg"), b"same bytes");
    let records = vec![
        dated(&first, "2020:02:02 10:00:00"),
        dated(&second, "2020:02:02 10:00:00"),
    ];

    let mut opts = options(src.path(), dest.path());
    opts.remove_duplicates = false;
    let sorter = Sorter::new(opts).unwrap();
    let report = sorter
        .apply(&Inventory::from_records(records), true, &quiet)
        .unwrap();

    let month = dest.path().join("2020").join("02");
    assert_eq!(report.count(Outcome::Moved), 2);
    assert!(month.join("IMG_1.jpg").exists());
    assert!(month.join("IMG_1_1.jpg").exists());
    assert_eq!(report.duplicate_stats.comparisons, 0);
}

#[test]
fn test_keep_filename_suffix_on_collision() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let first = write(&src.path().join("DSC_1.JPG"), b"first");
    let second = write(&src.path().join("DSC_2.JPG"), b"second!");

    let mut opts = options(src.path(), dest.path());
    opts.rename_format = Some("%Y%m%d".to_string());
    opts.keep_filename = true;
    opts.copy_files = true;
    let sorter = Sorter::new(opts).unwrap();
    let records = vec![
        dated(&first, "2019:07:04 18:00:00"),
        dated(&second, "2019:07:04 19:00:00"),
    ];
    let report = sorter
        .apply(&Inventory::from_records(records), true, &quiet)
        .unwrap();

    let month = dest.path().join("2019").join("07");
    assert_eq!(report.count(Outcome::Copied), 2);
    assert!(month.join("20190704.jpg").exists());
    assert!(month.join("20190704_DSC_2_1.jpg").exists());
    assert!(first.exists() && second.exists(), "copies leave sources alone");
}

#[test]
fn test_undated_file_is_never_written() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let undated = write(&src.path().join("clip.mov"), b"video");
    let record = MetadataRecord::new(&undated)
        .with_tag("EXIF:DateTimeOriginal", TagValue::Scalar("0000:00:00 00:00:00".into()))
        .with_tag("File:FileModifyDate", TagValue::Scalar("2022:01:01 10:00:00".into()));

    let sorter = Sorter::new(options(src.path(), dest.path())).unwrap();
    let report = sorter
        .apply(&Inventory::from_records(vec![record]), true, &quiet)
        .unwrap();

    assert_eq!(report.count(Outcome::UnknownDate), 1);
    assert!(report.files[0].destination.is_none());
    assert!(undated.exists());
    assert_eq!(count_files_recursive(dest.path()), 0);
}

#[test]
fn test_hidden_file_is_unknown_even_with_a_date() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let hidden = write(&src.path().join(".thumb.jpg"), b"tiny");

    let sorter = Sorter::new(options(src.path(), dest.path())).unwrap();
    let report = sorter.plan(
        &Inventory::from_records(vec![dated(&hidden, "2020:01:01 10:00:00")]),
        &quiet,
    );
    assert_eq!(report.count(Outcome::UnknownDate), 1);
}

#[test]
fn test_unknown_bucket_policy() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let undated = write(&src.path().join("clip.mov"), b"video");

    let mut opts = options(src.path(), dest.path());
    opts.unknown_dir = Some("unknown".to_string());
    let sorter = Sorter::new(opts).unwrap();
    let report = sorter
        .apply(
            &Inventory::from_records(vec![MetadataRecord::new(&undated)]),
            true,
            &quiet,
        )
        .unwrap();

    let bucket = dest.path().join("unknown").join("clip.mov");
    assert_eq!(report.count(Outcome::UnknownDate), 1);
    assert_eq!(report.files[0].destination.as_deref(), Some(bucket.as_path()));
    assert!(bucket.exists());
}

#[test]
fn test_apply_requires_confirmation() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let photo = write(&src.path().join("a.jpg"), b"a");

    let sorter = Sorter::new(options(src.path(), dest.path())).unwrap();
    let inventory = Inventory::from_records(vec![dated(&photo, "2021:01:01 10:00:00")]);
    assert!(matches!(
        sorter.apply(&inventory, false, &quiet),
        Err(Error::NotConfirmed)
    ));
    assert!(photo.exists());
    assert_eq!(count_files_recursive(dest.path()), 0);
}

/// Layout:
///   src/
///     a/IMG_1.jpg   2021-03-01, "alpha"
///     b/IMG_1.jpg   2021-03-01, "alpha"      duplicate of a/IMG_1.jpg
///     c/IMG_1.jpg   2021-03-01, "gamma"      same size, different bytes
///     d/IMG_2.jpg   2021-03-02, "delta"      collides with an existing file
///     e/IMG_3.jpg   2021-03-03, "old"        identical to an existing file
///     f/notes.txt                            not media
///     g/broken.jpg                           no metadata
///     h/clip.mov                             no date
///   dest/2021/03/IMG_2.jpg  "existing"
///   dest/2021/03/IMG_3.jpg  "old"
fn build_tree(src: &Path, dest: &Path) -> Vec<MetadataRecord> {
    let a = write(&src.join("a/IMG_1.jpg"), b"alpha");
    let b = write(&src.join("b/IMG_1.jpg"), b"alpha");
    let c = write(&src.join("c/IMG_1.jpg"), b"gamma");
    let d = write(&src.join("d/IMG_2.jpg"), b"delta");
    let e = write(&src.join("e/IMG_3.jpg"), b"old");
    write(&src.join("f/notes.txt"), b"notes");
    write(&src.join("g/broken.jpg"), b"broken");
    let h = write(&src.join("h/clip.mov"), b"clip");
    write(&dest.join("2021/03/IMG_2.jpg"), b"existing");
    write(&dest.join("2021/03/IMG_3.jpg"), b"old");

    vec![
        dated(&a, "2021:03:01 10:00:00"),
        dated(&b, "2021:03:01 10:00:00"),
        dated(&c, "2021:03:01 10:00:00"),
        dated(&d, "2021:03:02 10:00:00"),
        dated(&e, "2021:03:03 10:00:00"),
        MetadataRecord::new(&h),
    ]
}

#[test]
fn test_dry_run_matches_live_run() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let records = build_tree(src.path(), dest.path());

    let mut opts = options(src.path(), dest.path());
    opts.recursive = true;
    let mut metadata = PreloadedSource::from_records(records);

    opts.dry_run = true;
    let planned = process(&opts, &mut metadata, false, &quiet).unwrap();
    assert!(planned.dry_run);
    assert_eq!(count_files_recursive(dest.path()), 2, "dry run writes nothing");
    assert!(!dest.path().join("2021/03/IMG_1.jpg").exists());

    opts.dry_run = false;
    let applied = process(&opts, &mut metadata, true, &quiet).unwrap();
    assert!(!applied.dry_run);

    assert_eq!(planned.counts(), applied.counts());
    assert_eq!(planned.assignments(), applied.assignments());
    assert_eq!(planned.files_found, 8);

    assert_eq!(applied.count(Outcome::Moved), 3);
    assert_eq!(applied.count(Outcome::DuplicateSkipped), 2);
    assert_eq!(applied.count(Outcome::UnknownDate), 1);
    assert_eq!(applied.count(Outcome::Unreadable), 1);
    assert_eq!(applied.count(Outcome::ExtensionSkipped), 1);

    let month = dest.path().join("2021/03");
    assert_eq!(fs::read(month.join("IMG_1.jpg")).unwrap(), b"alpha");
    assert_eq!(fs::read(month.join("IMG_1_1.jpg")).unwrap(), b"gamma");
    assert_eq!(fs::read(month.join("IMG_2.jpg")).unwrap(), b"existing");
    assert_eq!(fs::read(month.join("IMG_2_1.jpg")).unwrap(), b"delta");
    assert_eq!(count_files_recursive(dest.path()), 5);
}

#[test]
fn test_blocked_directory_fails_only_that_file() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let blocked = write(&src.path().join("a.jpg"), b"a");
    let fine = write(&src.path().join("b.jpg"), b"b");
    // A regular file where the 2018 directory would go.
    write(&dest.path().join("2018"), b"in the way");

    let sorter = Sorter::new(options(src.path(), dest.path())).unwrap();
    let inventory = Inventory::from_records(vec![
        dated(&blocked, "2018:05:05 10:00:00"),
        dated(&fine, "2019:05:05 10:00:00"),
    ]);
    let planned = sorter.plan(&inventory, &quiet);
    let report = sorter.apply(&inventory, true, &quiet).unwrap();

    assert_eq!(planned.counts(), report.counts());
    assert_eq!(report.count(Outcome::Failed), 1);
    assert_eq!(report.count(Outcome::Moved), 1);
    assert!(report.files[0].error.is_some());
    assert!(blocked.exists());
    assert!(dest.path().join("2019/05/b.jpg").exists());
}

#[test]
fn test_rename_with_directory_levels_is_refused_up_front() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    write(&src.path().join("a.jpg"), b"a");

    let mut opts = SortOptions::new(src.path(), dest.path());
    opts.sort_format = "%Y".to_string();
    opts.rename_format = Some("%m/%d".to_string());
    assert!(matches!(
        Sorter::new(opts.clone()),
        Err(Error::InvalidFormat { .. })
    ));

    let mut metadata = PreloadedSource::default();
    assert!(process(&opts, &mut metadata, true, &quiet).is_err());
    assert!(src.path().join("a.jpg").exists());
    assert_eq!(count_files_recursive(dest.path()), 0);
}

#[test]
fn test_missing_source_dir_aborts_before_anything() {
    let dest = tempdir().unwrap();
    let opts = options(&dest.path().join("missing"), dest.path());
    let mut metadata = PreloadedSource::default();
    assert!(matches!(
        process(&opts, &mut metadata, true, &quiet),
        Err(Error::SourceMissing(_))
    ));
}

#[test]
fn test_restricting_tags_changes_the_winner() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let photo = write(&src.path().join("a.jpg"), b"a");
    let record = MetadataRecord::new(&photo)
        .with_tag("EXIF:DateTimeOriginal", TagValue::Scalar("2015:05:05 10:00:00".into()))
        .with_tag("XMP:CreateDate", TagValue::Scalar("2010:01:01 10:00:00".into()));

    let mut opts = options(src.path(), dest.path());
    opts.use_only_tags = vec!["DateTimeOriginal".to_string()];
    let sorter = Sorter::new(opts).unwrap();
    let report = sorter.plan(&Inventory::from_records(vec![record]), &quiet);

    assert_eq!(
        report.files[0].destination.as_deref(),
        Some(dest.path().join("2015/05/a.jpg").as_path())
    );
}
