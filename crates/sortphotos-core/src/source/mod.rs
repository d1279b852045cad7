pub mod builtin;
pub mod exiftool;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::metadata::MetadataRecord;
use crate::ThrottledProgress;

pub use builtin::BuiltinExifSource;
pub use exiftool::ExifTool;

/// Per-file result of a metadata extraction.
pub type Extraction = (PathBuf, Result<Option<MetadataRecord>>);

/// Something that can describe a media file as a metadata record.
///
/// `Ok(None)` and `Err` both mean the file is unreadable; neither stops
/// the run.
pub trait MetadataSource {
    fn extract(&mut self, path: &Path) -> Result<Option<MetadataRecord>>;

    fn extract_all(&mut self, paths: &[PathBuf], progress: &ThrottledProgress) -> Vec<Extraction> {
        let total = paths.len() as u64;
        paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                progress.report("metadata", i as u64, total, "Reading metadata");
                (path.clone(), self.extract(path))
            })
            .collect()
    }
}

/// Records that were extracted beforehand, e.g. a saved
/// `exiftool -j -a -G` dump.
#[derive(Debug, Default)]
pub struct PreloadedSource {
    records: HashMap<PathBuf, MetadataRecord>,
}

impl PreloadedSource {
    pub fn from_records(records: impl IntoIterator<Item = MetadataRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|r| (r.source().to_path_buf(), r))
                .collect(),
        }
    }

    pub fn from_exiftool_json(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(Self::from_records(MetadataRecord::parse_exiftool_output(&raw)?))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl MetadataSource for PreloadedSource {
    fn extract(&mut self, path: &Path) -> Result<Option<MetadataRecord>> {
        Ok(self.records.get(path).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::TagValue;
    use tempfile::tempdir;

    #[test]
    fn test_preloaded_lookup() {
        let record = MetadataRecord::new("/in/a.jpg")
            .with_tag("EXIF:DateTimeOriginal", TagValue::Scalar("2021:06:15 07:30:00".into()));
        let mut source = PreloadedSource::from_records(vec![record.clone()]);

        assert_eq!(source.extract(Path::new("/in/a.jpg")).unwrap(), Some(record));
        assert_eq!(source.extract(Path::new("/in/b.jpg")).unwrap(), None);
    }

    #[test]
    fn test_preloaded_from_dump() {
        let dir = tempdir().unwrap();
        let dump = dir.path().join("dump.json");
        fs::write(
            &dump,
            r#"[{"SourceFile": "/in/a.jpg", "EXIF:CreateDate": "2020:01:01 10:00:00"},
                {"SourceFile": "/in/b.jpg"}]"#,
        )
        .unwrap();

        let source = PreloadedSource::from_exiftool_json(&dump).unwrap();
        assert_eq!(source.len(), 2);
    }
}
