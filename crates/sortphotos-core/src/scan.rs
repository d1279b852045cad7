use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::metadata::MetadataRecord;
use crate::source::MetadataSource;
use crate::ThrottledProgress;

/// Lowercase extensions (without the dot) of still-image formats,
/// including camera RAW formats.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "jpe", "png", "gif", "bmp", "tiff", "tif", "webp", "heic", "heif",
    // RAW
    "cr2", "cr3", "nef", "nrw", "arw", "srf", "sr2", "dng", "orf", "rw2", "raf", "pef", "ptx",
    "3fr", "iiq", "erf", "kdc", "mef", "mos", "srw", "x3f",
    // other photographic formats
    "jp2", "jpf", "jpx", "j2k", "psd",
];

/// Lowercase extensions (without the dot) of video formats.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "avi", "mkv", "wmv", "flv", "webm", "3gp", "3g2", "mts", "m2ts", "tod",
    "mpg", "mpeg", "vob", "ogv", "asf", "rm", "rmvb", "insv", "lrv", "thm",
];

pub fn is_media_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()) || VIDEO_EXTENSIONS.contains(&ext.as_str())
}

/// Dot-files, plus files carrying the hidden attribute on Windows.
pub fn is_hidden(path: &Path) -> bool {
    let dot_file = path
        .file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false);
    dot_file || has_hidden_attribute(path)
}

#[cfg(windows)]
fn has_hidden_attribute(path: &Path) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    fs::metadata(path)
        .map(|m| m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn has_hidden_attribute(_path: &Path) -> bool {
    false
}

/// Files found under the source directory.
#[derive(Debug, Default)]
pub struct Enumeration {
    /// Regular files with a media extension, in walk order.
    pub media: Vec<PathBuf>,
    /// Regular files with any other extension.
    pub skipped: Vec<PathBuf>,
}

impl Enumeration {
    pub fn files_found(&self) -> usize {
        self.media.len() + self.skipped.len()
    }
}

/// Fail fast when the source directory cannot be read.
pub fn check_source_dir(source_dir: &Path) -> Result<()> {
    match fs::read_dir(source_dir) {
        Ok(_) => Ok(()),
        Err(e) => {
            warn!("cannot read source directory {}: {}", source_dir.display(), e);
            Err(Error::SourceMissing(source_dir.to_path_buf()))
        }
    }
}

/// List regular files below `source_dir`; only its direct children
/// unless `recursive`.
pub fn enumerate(source_dir: &Path, recursive: bool) -> Result<Enumeration> {
    check_source_dir(source_dir)?;

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut found = Enumeration::default();

    for entry in WalkDir::new(source_dir)
        .max_depth(max_depth)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        if is_media_file(&path) {
            found.media.push(path);
        } else {
            debug!("invalid file extension: {}", path.display());
            found.skipped.push(path);
        }
    }

    Ok(found)
}

/// Everything the sorter consumes: one record per readable media file,
/// plus the files that never produced one.
#[derive(Debug, Default)]
pub struct Inventory {
    pub files_found: usize,
    pub records: Vec<MetadataRecord>,
    pub unreadable: Vec<PathBuf>,
    pub extension_skipped: Vec<PathBuf>,
}

impl Inventory {
    /// Build an inventory from records extracted elsewhere.
    pub fn from_records(records: Vec<MetadataRecord>) -> Self {
        Self {
            files_found: records.len(),
            records,
            ..Self::default()
        }
    }
}

/// Enumerate `source_dir` and extract metadata for every media file.
pub fn collect_inventory(
    source_dir: &Path,
    recursive: bool,
    source: &mut dyn MetadataSource,
    progress: &ThrottledProgress,
) -> Result<Inventory> {
    let found = enumerate(source_dir, recursive)?;
    let files_found = found.files_found();

    let mut inventory = Inventory {
        files_found,
        extension_skipped: found.skipped,
        ..Inventory::default()
    };

    for (path, result) in source.extract_all(&found.media, progress) {
        match result {
            Ok(Some(record)) => inventory.records.push(record),
            Ok(None) => {
                warn!("no metadata returned for {}", path.display());
                inventory.unreadable.push(path);
            }
            Err(e) => {
                warn!("failed to read metadata for {}: {}", path.display(), e);
                inventory.unreadable.push(path);
            }
        }
    }

    Ok(inventory)
}
