use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use exif::{In, Reader, Value};
use rayon::prelude::*;
use tracing::debug;

use super::{Extraction, MetadataSource};
use crate::error::Result;
use crate::metadata::{MetadataRecord, TagValue};
use crate::ThrottledProgress;

/// Group name given to every tag read by [`BuiltinExifSource`].
pub const EXIF_GROUP: &str = "EXIF";

/// Reads EXIF directly from image containers, no external tool needed.
///
/// Only ASCII fields of the primary image are reported, as
/// `EXIF:<TagName>`. Files without EXIF (or in formats the reader does
/// not understand) yield an empty record rather than an error.
#[derive(Debug, Default)]
pub struct BuiltinExifSource;

impl BuiltinExifSource {
    pub fn new() -> Self {
        Self
    }
}

pub fn read_exif_record(path: &Path) -> Result<Option<MetadataRecord>> {
    let file = File::open(path)?;
    let mut record = MetadataRecord::new(path);

    let exif = match Reader::new().read_from_container(&mut BufReader::new(file)) {
        Ok(exif) => exif,
        Err(exif::Error::Io(e)) => return Err(e.into()),
        Err(e) => {
            debug!("no EXIF in {}: {}", path.display(), e);
            return Ok(Some(record));
        }
    };

    for field in exif.fields() {
        if field.ifd_num != In::PRIMARY {
            continue;
        }
        if let Value::Ascii(ref parts) = field.value {
            if let Some(first) = parts.first() {
                let text = String::from_utf8_lossy(first)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string();
                if !text.is_empty() {
                    record.insert(format!("{}:{}", EXIF_GROUP, field.tag), TagValue::Scalar(text));
                }
            }
        }
    }

    Ok(Some(record))
}

impl MetadataSource for BuiltinExifSource {
    fn extract(&mut self, path: &Path) -> Result<Option<MetadataRecord>> {
        read_exif_record(path)
    }

    fn extract_all(&mut self, paths: &[PathBuf], progress: &ThrottledProgress) -> Vec<Extraction> {
        let total = paths.len() as u64;
        let counter = AtomicU64::new(0);
        paths
            .par_iter()
            .map(|path| {
                let result = read_exif_record(path);
                let current = counter.fetch_add(1, Ordering::Relaxed);
                progress.report("metadata", current, total, "Reading EXIF");
                (path.clone(), result)
            })
            .collect()
    }
}
