//! Directory tree view of a scan.
//!
//! The tree is derived from the flat [`DirectoryTotals`](crate::aggregate::DirectoryTotals)
//! mapping for display only; totals always come from the mapping.

use std::cmp::Ordering;

use crate::aggregate::ROOT_KEY;
use crate::walker::ScanResult;

/// A directory and its cumulative token count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    /// Last path component (`.` for the root).
    pub name: String,
    /// Slash-separated path from the root.
    pub path: String,
    pub tokens: usize,
    children: Vec<DirectoryNode>,
}

impl DirectoryNode {
    /// Create a node with no children.
    pub fn new(name: impl Into<String>, path: impl Into<String>, tokens: usize) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            tokens,
            children: Vec::new(),
        }
    }

    /// Build the tree for a scan, skipping directories without tokens.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::{Path, PathBuf};
    /// use tokcount::aggregate::DirectoryTotals;
    /// use tokcount::tree::DirectoryNode;
    /// use tokcount::walker::ScanResult;
    ///
    /// let mut totals = DirectoryTotals::new();
    /// totals.record(Path::new("src/util/mod.rs"), 4);
    /// totals.set_root(4);
    ///
    /// let result = ScanResult {
    ///     repository: PathBuf::from("/repo"),
    ///     tokenizer: "estimate".into(),
    ///     tokenizer_detail: "estimate (chars / 3.5)".into(),
    ///     total_tokens: 4,
    ///     total_files: 1,
    ///     ignored_files: 0,
    ///     total_lines: 1,
    ///     directory_tokens: totals,
    /// };
    ///
    /// let tree = DirectoryNode::from_result(&result);
    /// assert_eq!(tree.children()[0].name, "src");
    /// assert_eq!(tree.children()[0].children()[0].path, "src/util");
    /// ```
    pub fn from_result(result: &ScanResult) -> Self {
        let mut root = Self::new(ROOT_KEY, ROOT_KEY, result.total_tokens);
        for (path, tokens) in result.directory_tokens.iter() {
            if path == ROOT_KEY || tokens == 0 {
                continue;
            }
            root.insert(path, tokens);
        }
        root.sort_children();
        root
    }

    fn insert(&mut self, path: &str, tokens: usize) {
        let mut current = self;
        let mut current_path = String::new();

        for part in path.split('/').filter(|p| !p.is_empty() && *p != ROOT_KEY) {
            if !current_path.is_empty() {
                current_path.push('/');
            }
            current_path.push_str(part);

            let index = match current.children.iter().position(|c| c.name == part) {
                Some(index) => index,
                None => {
                    current
                        .children
                        .push(DirectoryNode::new(part, current_path.clone(), 0));
                    current.children.len() - 1
                }
            };
            current = &mut current.children[index];
        }

        current.tokens = tokens;
    }

    /// Get child nodes.
    pub fn children(&self) -> &[DirectoryNode] {
        &self.children
    }

    /// Sort children by tokens descending, then path.
    pub fn sort_children(&mut self) {
        self.children.sort_by(|a, b| match b.tokens.cmp(&a.tokens) {
            Ordering::Equal => a.path.cmp(&b.path),
            other => other,
        });

        for child in &mut self.children {
            child.sort_children();
        }
    }
}

/// Box-drawing characters for tree rendering.
const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const VERTICAL: &str = "│   ";
const SPACE: &str = "    ";

/// Render the directory token breakdown of a scan.
pub fn render_tree(result: &ScanResult) -> String {
    let root = DirectoryNode::from_result(result);

    let mut output = String::with_capacity(4096);
    output.push_str("Directory tree:\n");
    output.push_str(&format!(
        ".  {} tokens (100.0%)\n",
        format_number(result.total_tokens)
    ));

    let child_count = root.children.len();
    for (i, child) in root.children.iter().enumerate() {
        render_node(&mut output, child, "", i == child_count - 1, result.total_tokens);
    }
    output
}

fn render_node(output: &mut String, node: &DirectoryNode, prefix: &str, is_last: bool, total: usize) {
    let branch = if is_last { LAST_BRANCH } else { BRANCH };
    output.push_str(&format!(
        "{}{}{}/ {} tokens ({:.1}%)\n",
        prefix,
        branch,
        node.name,
        format_number(node.tokens),
        percentage(node.tokens, total)
    ));

    let continuation = if is_last { SPACE } else { VERTICAL };
    let child_prefix = format!("{}{}", prefix, continuation);
    let child_count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        render_node(output, child, &child_prefix, i == child_count - 1, total);
    }
}

/// Share of `total`, in percent; zero when `total` is zero.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / total as f64
}

/// Format number with thousands separators.
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
