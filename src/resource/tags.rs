//! Resource tags and tag updates

use std::collections::BTreeMap;

/// Tag mapping; keys are unique and kept sorted for stable output
pub type Tags = BTreeMap<String, String>;

/// A merge-then-remove edit of a tag set.
///
/// `apply` inserts (or overwrites) every `merge` entry and then drops every
/// `remove` key, so a key present in both ends up removed. Applying the same
/// update twice gives the same tags as applying it once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagUpdate {
    pub merge: Tags,
    pub remove: Vec<String>,
}

impl TagUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(mut self, key: &str, value: &str) -> Self {
        self.merge.insert(key.to_string(), value.to_string());
        self
    }

    pub fn remove(mut self, key: &str) -> Self {
        self.remove.push(key.to_string());
        self
    }

    pub fn apply(&self, current: &Tags) -> Tags {
        let mut tags = current.clone();
        tags.extend(self.merge.iter().map(|(k, v)| (k.clone(), v.clone())));
        for key in &self.remove {
            tags.remove(key);
        }
        tags
    }
}

/// Build tags from literal pairs
pub fn tags_from<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Tags {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// `{k1=v1, k2=v2}`
pub fn format_tags(tags: &Tags) -> String {
    let inner = tags
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", inner)
}
