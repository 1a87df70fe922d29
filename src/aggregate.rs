//! Directory token rollups.
//!
//! [`DirectoryTotals`] is a flat map from slash-separated directory path to
//! the tokens of every counted file beneath it. The root is keyed by
//! [`ROOT_KEY`].

use std::collections::BTreeMap;
use std::path::{Component, Path};

use serde::Serialize;

/// Key of the repository root in [`DirectoryTotals`].
pub const ROOT_KEY: &str = ".";

/// Cumulative token counts per directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DirectoryTotals {
    totals: BTreeMap<String, usize>,
}

impl DirectoryTotals {
    /// Create a mapping holding only the root, at zero.
    pub fn new() -> Self {
        let mut totals = BTreeMap::new();
        totals.insert(ROOT_KEY.to_string(), 0);
        Self { totals }
    }

    /// Add `tokens` to every ancestor directory of `relative_file`, root included.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use tokcount::aggregate::DirectoryTotals;
    ///
    /// let mut totals = DirectoryTotals::new();
    /// totals.record(Path::new("src/util/mod.rs"), 10);
    /// totals.record(Path::new("README.md"), 5);
    ///
    /// assert_eq!(totals.get("src/util"), Some(10));
    /// assert_eq!(totals.get("src"), Some(10));
    /// assert_eq!(totals.root_total(), 15);
    /// ```
    pub fn record(&mut self, relative_file: &Path, tokens: usize) {
        let mut dir = relative_file.parent();
        while let Some(current) = dir {
            let key = directory_key(current);
            let is_root = key == ROOT_KEY;
            *self.totals.entry(key).or_insert(0) += tokens;
            if is_root {
                return;
            }
            dir = current.parent();
        }
        // Only an empty path has no parent at all.
        *self.totals.entry(ROOT_KEY.to_string()).or_insert(0) += tokens;
    }

    /// Force the root entry to `total`.
    pub fn set_root(&mut self, total: usize) {
        self.totals.insert(ROOT_KEY.to_string(), total);
    }

    /// Total for a directory key such as `src/util` or `.`.
    pub fn get(&self, dir: &str) -> Option<usize> {
        self.totals.get(dir).copied()
    }

    pub fn root_total(&self) -> usize {
        self.get(ROOT_KEY).unwrap_or(0)
    }

    /// Entries in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.totals.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

impl Default for DirectoryTotals {
    fn default() -> Self {
        Self::new()
    }
}

/// Slash-joined key for a relative directory; the empty path maps to the root.
pub fn directory_key(dir: &Path) -> String {
    let parts: Vec<String> = dir
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        ROOT_KEY.to_string()
    } else {
        parts.join("/")
    }
}
