use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

/// Key under which metadata tools report the absolute path of the file.
pub const SOURCE_FILE_KEY: &str = "SourceFile";

/// A single metadata value: either one string or a list whose first
/// element is authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    Scalar(String),
    Sequence(Vec<String>),
}

impl TagValue {
    /// The value that date parsing should look at.
    pub fn primary(&self) -> Option<&str> {
        match self {
            TagValue::Scalar(s) => Some(s),
            TagValue::Sequence(items) => items.first().map(String::as_str),
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(TagValue::Sequence(
                items.iter().filter_map(json_scalar).collect(),
            )),
            other => json_scalar(other).map(TagValue::Scalar),
        }
    }
}

fn json_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Metadata extracted for one file, keyed by `"Group:TagName"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    source: PathBuf,
    tags: BTreeMap<String, TagValue>,
}

impl MetadataRecord {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            tags: BTreeMap::new(),
        }
    }

    /// Builder-style insert, mostly useful for sources and tests.
    pub fn with_tag(mut self, key: impl Into<String>, value: TagValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: TagValue) {
        let key = key.into();
        if key != SOURCE_FILE_KEY {
            self.tags.insert(key, value);
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.tags.get(key)
    }

    pub fn tags(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Decode one JSON object as emitted by `exiftool -j -G`.
    /// Returns `None` when the object has no usable `SourceFile`.
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let source = object.get(SOURCE_FILE_KEY)?.as_str()?;
        if source.is_empty() {
            return None;
        }
        let mut record = MetadataRecord::new(source);
        for (key, raw) in object {
            if let Some(tag) = TagValue::from_json(raw) {
                record.insert(key.as_str(), tag);
            }
        }
        Some(record)
    }

    /// Decode the JSON array printed by exiftool for one or more files.
    pub fn parse_exiftool_output(raw: &str) -> crate::Result<Vec<Self>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        let values: Vec<Value> = serde_json::from_str(trimmed)?;
        Ok(values.iter().filter_map(MetadataRecord::from_json).collect())
    }
}
