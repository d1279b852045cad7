use std::collections::HashSet;

use crate::config::SortOptions;
use crate::metadata::SOURCE_FILE_KEY;

/// Groups that never carry a capture date.
const ALWAYS_IGNORED_GROUPS: &[&str] = &["ICC_Profile"];
/// Keys that look like dates but describe edit history, not capture.
const ALWAYS_IGNORED_TAGS: &[&str] = &["XMP:HistoryWhen"];

/// Decides which `"Group:Tag"` keys may feed the date resolver.
///
/// Restrictions win over ignore lists: once `allowed_groups` or
/// `allowed_tags` is non-empty the ignore lists are cleared, and a tag
/// restriction makes the group restriction irrelevant.
///
/// Restrictions compare case-insensitively, and a tag restriction also
/// matches the bare tag name. Ignore lists are exact: an ignored tag
/// must be the full `Group:Tag` key as the metadata source spells it.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    ignored_groups: HashSet<String>,
    ignored_tags: HashSet<String>,
    allowed_groups: HashSet<String>,
    allowed_tags: HashSet<String>,
}

impl FilterConfig {
    pub fn new<I, S>(ignored_groups: I, ignored_tags: I, allowed_groups: I, allowed_tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let collect = |items: I| -> HashSet<String> {
            items
                .into_iter()
                .map(|s| -> String { s.into() })
                .filter(|s| !s.is_empty())
                .collect()
        };

        let mut config = Self {
            ignored_groups: collect(ignored_groups),
            ignored_tags: collect(ignored_tags),
            allowed_groups: collect(allowed_groups),
            allowed_tags: collect(allowed_tags),
        };
        if config.is_restricted() {
            config.ignored_groups.clear();
            config.ignored_tags.clear();
        }
        config
    }

    pub fn from_options(options: &SortOptions) -> Self {
        Self::new(
            options.ignore_groups.clone(),
            options.ignore_tags.clone(),
            options.use_only_groups.clone(),
            options.use_only_tags.clone(),
        )
    }

    pub fn is_restricted(&self) -> bool {
        !self.allowed_groups.is_empty() || !self.allowed_tags.is_empty()
    }

    pub fn allowed_groups(&self) -> impl Iterator<Item = &str> {
        self.allowed_groups.iter().map(String::as_str)
    }

    pub fn allowed_tags(&self) -> impl Iterator<Item = &str> {
        self.allowed_tags.iter().map(String::as_str)
    }

    /// Whether `key` is an eligible date source.
    pub fn is_eligible(&self, key: &str) -> bool {
        if key.contains("GPS") || key == SOURCE_FILE_KEY {
            return false;
        }

        let group = group_of(key);

        if !self.allowed_tags.is_empty() {
            let tag = tag_of(key);
            return self
                .allowed_tags
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(key) || allowed.eq_ignore_ascii_case(tag));
        }

        if !self.allowed_groups.is_empty() {
            return self
                .allowed_groups
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(group));
        }

        if ALWAYS_IGNORED_TAGS.contains(&key) || self.ignored_tags.contains(key) {
            return false;
        }
        !(ALWAYS_IGNORED_GROUPS.contains(&group) || self.ignored_groups.contains(group))
    }
}

/// Group prefix of a key; empty when the key has no group.
fn group_of(key: &str) -> &str {
    match key.split_once(':') {
        Some((group, _)) => group,
        None => "",
    }
}

/// Tag name of a key, after the last group separator.
fn tag_of(key: &str) -> &str {
    key.rsplit(':').next().unwrap_or(key)
}
