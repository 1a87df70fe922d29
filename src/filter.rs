//! Ignore matching and content classification.
//!
//! An [`IgnoreSpec`] merges built-in defaults, `.tokcountignore`, `.gitignore`
//! and an optional caller-supplied file into one ordered pattern list and
//! compiles it with the `ignore` crate's gitignore matcher, so the last
//! matching pattern across every source decides.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use thiserror::Error;
use tracing::{debug, warn};

/// Repository-local override file, read before `.gitignore`.
pub const TOKCOUNT_IGNORE_FILE: &str = ".tokcountignore";

/// Standard version-control ignore file.
pub const GIT_IGNORE_FILE: &str = ".gitignore";

/// Bytes inspected by [`is_likely_binary`] when looking for control bytes.
pub const BINARY_SNIFF_LEN: usize = 4096;

/// Share of control bytes above which content is treated as binary.
const BINARY_CONTROL_RATIO: f64 = 0.30;

/// Patterns applied before any ignore file.
pub const DEFAULT_PATTERNS: &[&str] = &[
    // VCS and tool state
    ".git",
    ".svn",
    ".hg",
    ".intent",
    ".tldr",
    ".DS_Store",
    // Dependency and build outputs
    "node_modules",
    "vendor",
    "dist",
    "build",
    ".next",
    "__pycache__",
    ".venv",
    "venv",
    "target",
    // Minified and bundled assets
    "*.min.js",
    "*.min.css",
    "*.bundle.js",
    // Language/tooling caches
    ".mypy_cache",
    ".pytest_cache",
    // Logs
    "*.log",
    // Lock files
    "*.lock",
    "uv.lock",
    "pnpm-lock.yaml",
    "package-lock.json",
    "yarn.lock",
    "bun.lockb",
    "poetry.lock",
    "Pipfile.lock",
    "composer.lock",
    "Gemfile.lock",
    "Cargo.lock",
    // Compiled artifacts
    "*.so",
    "*.dylib",
    "*.a",
    "*.o",
    "*.pyc",
    "*.class",
    "*.jar",
    "*.node",
    "*.exe",
    "*.dll",
    // Databases and blob-ish data
    "*.db",
    "*.db-wal",
    "*.db-shm",
    "*.db-journal",
    "*.sqlite",
    "*.sqlite3",
    "*.sqlite3-journal",
    "*.npz",
    "*.npy",
    "*.dat",
    "*.pkl",
    "*.sav",
    "*.csv",
    // Media and binary-rich assets
    "*.png",
    "*.jpg",
    "*.jpeg",
    "*.gif",
    "*.ico",
    "*.icns",
    "*.svg",
    "*.ttf",
    "*.woff",
    "*.woff2",
    "*.webp",
    "*.wav",
    "*.mp3",
    "*.mp4",
    "*.pdf",
    // Archives
    "*.gz",
    "*.bz2",
    "*.xz",
    "*.lzma",
    "*.zip",
    "*.tar",
    "*.tgz",
    "*.7z",
];

/// Errors loading ignore files.
#[derive(Debug, Error)]
pub enum IgnoreError {
    #[error("ignore file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read ignore file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Compiled, merged ignore patterns for one repository root.
#[derive(Debug, Clone)]
pub struct IgnoreSpec {
    root: PathBuf,
    patterns: Vec<String>,
    matcher: Gitignore,
}

impl IgnoreSpec {
    /// Load defaults, `.tokcountignore`, `.gitignore` and an optional custom file.
    ///
    /// A relative `custom_ignore_file` is resolved against `root`. Unlike the
    /// repository files, a named custom file must exist.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use tokcount::filter::IgnoreSpec;
    ///
    /// let spec = IgnoreSpec::load(Path::new("."), None).unwrap();
    /// assert!(spec.is_ignored(Path::new("node_modules"), true));
    /// ```
    pub fn load(root: &Path, custom_ignore_file: Option<&Path>) -> Result<Self, IgnoreError> {
        let root = std::path::absolute(root).map_err(|source| IgnoreError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let mut patterns: Vec<String> = DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect();

        patterns.extend(read_ignore_file_optional(&root.join(TOKCOUNT_IGNORE_FILE))?);
        patterns.extend(read_ignore_file_optional(&root.join(GIT_IGNORE_FILE))?);

        if let Some(custom) = custom_ignore_file {
            let custom = if custom.is_absolute() {
                custom.to_path_buf()
            } else {
                root.join(custom)
            };
            patterns.extend(read_ignore_file_required(&custom)?);
        }

        Ok(Self::from_patterns(root, patterns))
    }

    /// Compile an ordered pattern list as-is (no files are read).
    ///
    /// Duplicates are dropped, keeping the first occurrence. Patterns that fail
    /// to parse are skipped and never match.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use tokcount::filter::IgnoreSpec;
    ///
    /// let spec = IgnoreSpec::from_patterns(".", ["*.log", "!keep.log"]);
    /// assert!(spec.is_ignored(Path::new("debug.log"), false));
    /// assert!(!spec.is_ignored(Path::new("keep.log"), false));
    /// ```
    pub fn from_patterns<I, S>(root: impl Into<PathBuf>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        let patterns = dedupe_patterns(patterns);

        // Candidates are root-relative; a `.` root disables prefix stripping.
        let mut builder = GitignoreBuilder::new(".");
        for pattern in &patterns {
            if let Err(err) = builder.add_line(None, pattern) {
                warn!(pattern = %pattern, error = %err, "skipping invalid ignore pattern");
            }
        }

        let matcher = builder.build().unwrap_or_else(|err| {
            warn!(error = %err, "failed to compile ignore patterns, ignoring nothing");
            Gitignore::empty()
        });

        Self {
            root,
            patterns,
            matcher,
        }
    }

    /// Absolute root the patterns are relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The merged, deduplicated pattern list in precedence order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether a root-relative path is ignored.
    ///
    /// The root itself (empty path or `.`) is never ignored.
    pub fn is_ignored(&self, relative: &Path, is_dir: bool) -> bool {
        let relative = normalize_relative(relative);
        if relative.as_os_str().is_empty() {
            return false;
        }
        self.matcher.matched(&relative, is_dir).is_ignore()
    }

    /// Whether an absolute path under [`root`](Self::root) is ignored.
    pub fn matches_path(&self, path: &Path, is_dir: bool) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.is_ignored(relative, is_dir)
    }
}

/// Drop `.` components so `./src` and `src` match the same rules.
fn normalize_relative(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn dedupe_patterns<I, S>(patterns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref().trim();
        if pattern.is_empty() || !seen.insert(pattern.to_string()) {
            continue;
        }
        out.push(pattern.to_string());
    }
    out
}

fn read_ignore_file_optional(path: &Path) -> Result<Vec<String>, IgnoreError> {
    match fs::read(path) {
        Ok(content) => {
            debug!(path = %path.display(), "loaded ignore file");
            Ok(parse_ignore_lines(&String::from_utf8_lossy(&content)))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(IgnoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn read_ignore_file_required(path: &Path) -> Result<Vec<String>, IgnoreError> {
    match fs::read(path) {
        Ok(content) => Ok(parse_ignore_lines(&String::from_utf8_lossy(&content))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(IgnoreError::NotFound {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(IgnoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Split ignore-file content into patterns, skipping blanks and `#` comments.
pub fn parse_ignore_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Heuristic binary detection.
///
/// Content is binary if it contains a null byte, or if more than 30% of its
/// first 4096 bytes are control bytes other than `\t`..`\r`.
///
/// # Examples
///
/// ```
/// use tokcount::filter::is_likely_binary;
///
/// assert!(is_likely_binary(&[0x00, 0x01, 0x02, 0x03]));
/// assert!(!is_likely_binary(b"fn main() {}\n"));
/// assert!(!is_likely_binary(b""));
/// ```
pub fn is_likely_binary(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }
    if data.contains(&0) {
        return true;
    }

    let window = &data[..data.len().min(BINARY_SNIFF_LEN)];
    let control = window
        .iter()
        .filter(|&&b| b < 9 || (b > 13 && b < 32))
        .count();
    control as f64 / window.len() as f64 > BINARY_CONTROL_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn defaults() -> IgnoreSpec {
        IgnoreSpec::from_patterns("/project", DEFAULT_PATTERNS)
    }

    #[test]
    fn test_defaults_ignore_dependency_dirs() {
        let spec = defaults();
        assert!(spec.is_ignored(Path::new("node_modules"), true));
        assert!(spec.is_ignored(Path::new("web/node_modules"), true));
        assert!(spec.is_ignored(Path::new(".git"), true));
        assert!(spec.is_ignored(Path::new("target"), true));
    }

    #[test]
    fn test_defaults_ignore_binary_extensions() {
        let spec = defaults();
        assert!(spec.is_ignored(Path::new("assets/logo.png"), false));
        assert!(spec.is_ignored(Path::new("bundle.min.js"), false));
        assert!(spec.is_ignored(Path::new("Cargo.lock"), false));
        assert!(spec.is_ignored(Path::new("server.log"), false));
    }

    #[test]
    fn test_defaults_keep_sources() {
        let spec = defaults();
        assert!(!spec.is_ignored(Path::new("src/main.rs"), false));
        assert!(!spec.is_ignored(Path::new("src"), true));
        assert!(!spec.is_ignored(Path::new("lib/utils.py"), false));
    }

    #[test]
    fn test_root_never_ignored() {
        let spec = IgnoreSpec::from_patterns("/project", ["*", "."]);
        assert!(!spec.is_ignored(Path::new(""), true));
        assert!(!spec.is_ignored(Path::new("."), true));
        assert!(!spec.matches_path(Path::new("/project"), true));
    }

    #[test]
    fn test_last_match_wins() {
        let spec = IgnoreSpec::from_patterns("/project", ["*.txt", "!keep.txt"]);
        assert!(spec.is_ignored(Path::new("notes.txt"), false));
        assert!(!spec.is_ignored(Path::new("keep.txt"), false));

        let spec = IgnoreSpec::from_patterns("/project", ["!keep.txt", "*.txt"]);
        assert!(spec.is_ignored(Path::new("keep.txt"), false));
    }

    #[test]
    fn test_directory_only_pattern() {
        let spec = IgnoreSpec::from_patterns("/project", ["cache/"]);
        assert!(spec.is_ignored(Path::new("cache"), true));
        assert!(spec.is_ignored(Path::new("nested/cache"), true));
        assert!(!spec.is_ignored(Path::new("cache"), false));
    }

    #[test]
    fn test_anchored_pattern() {
        let spec = IgnoreSpec::from_patterns("/project", ["/docs"]);
        assert!(spec.is_ignored(Path::new("docs"), true));
        assert!(!spec.is_ignored(Path::new("src/docs"), true));
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        let spec = IgnoreSpec::from_patterns("/project", ["src/*.rs"]);
        assert!(spec.is_ignored(Path::new("src/main.rs"), false));
        assert!(!spec.is_ignored(Path::new("src/bin/main.rs"), false));

        let spec = IgnoreSpec::from_patterns("/project", ["src/**/*.rs"]);
        assert!(spec.is_ignored(Path::new("src/bin/main.rs"), false));
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        let spec = IgnoreSpec::from_patterns("/project", ["{unclosed", "*.tmp"]);
        assert!(!spec.is_ignored(Path::new("{unclosed"), false));
        assert!(spec.is_ignored(Path::new("scratch.tmp"), false));
    }

    #[test]
    fn test_relative_root_not_stripped_from_candidates() {
        let spec = IgnoreSpec::from_patterns("proj", ["/notes.md"]);
        assert!(spec.is_ignored(Path::new("notes.md"), false));
        assert!(!spec.is_ignored(Path::new("proj/notes.md"), false));
        assert!(spec.root().is_absolute());

        let spec = IgnoreSpec::from_patterns("proj", ["docs/*.md"]);
        assert!(spec.is_ignored(Path::new("docs/a.md"), false));
        assert!(!spec.is_ignored(Path::new("proj/docs/a.md"), false));
    }

    #[test]
    fn test_load_tolerates_non_utf8_ignore_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(GIT_IGNORE_FILE), b"# caf\xe9 build outputs\n*.tmp\n").unwrap();
        fs::write(dir.path().join("extra"), b"\xff\xfe\nscratch/\n").unwrap();

        let spec = IgnoreSpec::load(dir.path(), Some(Path::new("extra"))).unwrap();
        assert!(spec.is_ignored(Path::new("a.tmp"), false));
        assert!(spec.is_ignored(Path::new("scratch"), true));
        assert!(!spec.is_ignored(Path::new("a.rs"), false));
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let spec = IgnoreSpec::from_patterns("/project", ["a", "b", "a", " b ", "", "c"]);
        assert_eq!(spec.patterns(), ["a", "b", "c"]);
    }

    #[test]
    fn test_parse_ignore_lines() {
        let lines = parse_ignore_lines("# comment\n\n  *.tmp  \n!keep.tmp\n   # indented\nbuild/\n");
        assert_eq!(lines, ["*.tmp", "!keep.tmp", "build/"]);
    }

    #[test]
    fn test_load_merges_all_sources() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(GIT_IGNORE_FILE), "ignored.txt\n").unwrap();
        fs::write(dir.path().join(TOKCOUNT_IGNORE_FILE), "generated/\n").unwrap();
        fs::write(dir.path().join("custom.ignore"), "custom.txt\n").unwrap();

        let spec = IgnoreSpec::load(dir.path(), Some(Path::new("custom.ignore"))).unwrap();

        assert!(spec.matches_path(&dir.path().join("ignored.txt"), false));
        assert!(spec.matches_path(&dir.path().join("generated"), true));
        assert!(spec.matches_path(&dir.path().join("custom.txt"), false));
        assert!(!spec.matches_path(&dir.path().join("kept.txt"), false));
    }

    #[test]
    fn test_load_source_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(TOKCOUNT_IGNORE_FILE), "from-tokcount\n").unwrap();
        fs::write(dir.path().join(GIT_IGNORE_FILE), "from-git\n").unwrap();
        fs::write(dir.path().join("extra"), "from-custom\n").unwrap();

        let spec = IgnoreSpec::load(dir.path(), Some(&dir.path().join("extra"))).unwrap();
        let tail = &spec.patterns()[spec.patterns().len() - 3..];
        assert_eq!(tail, ["from-tokcount", "from-git", "from-custom"]);
    }

    #[test]
    fn test_gitignore_negation_overrides_default() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(GIT_IGNORE_FILE), "!important.log\n").unwrap();

        let spec = IgnoreSpec::load(dir.path(), None).unwrap();
        assert!(!spec.is_ignored(Path::new("important.log"), false));
        assert!(spec.is_ignored(Path::new("other.log"), false));
    }

    #[test]
    fn test_load_without_ignore_files_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let spec = IgnoreSpec::load(dir.path(), None).unwrap();
        assert_eq!(spec.patterns().len(), DEFAULT_PATTERNS.len());
    }

    #[test]
    fn test_load_missing_custom_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = IgnoreSpec::load(dir.path(), Some(Path::new("missing.ignore"))).unwrap_err();
        assert!(matches!(err, IgnoreError::NotFound { ref path } if path.ends_with("missing.ignore")));
    }

    #[test]
    fn test_binary_null_byte() {
        let mut text = vec![b'a'; 10_000];
        text.push(0);
        assert!(is_likely_binary(&text));
    }

    #[test]
    fn test_binary_control_ratio() {
        // 31 control bytes out of 100 is over the threshold, 30 is not.
        let mut data = vec![0x01u8; 31];
        data.extend(vec![b'x'; 69]);
        assert!(is_likely_binary(&data));

        let mut data = vec![0x1fu8; 30];
        data.extend(vec![b'x'; 70]);
        assert!(!is_likely_binary(&data));
    }

    #[test]
    fn test_binary_whitespace_is_text() {
        // \t \n \v \f \r are all allowed.
        let data: Vec<u8> = (9u8..=13).cycle().take(500).collect();
        assert!(!is_likely_binary(&data));
    }

    #[test]
    fn test_binary_only_first_window() {
        let mut data = vec![b'x'; BINARY_SNIFF_LEN];
        data.extend(vec![0x02u8; BINARY_SNIFF_LEN * 2]);
        assert!(!is_likely_binary(&data));
    }

    #[test]
    fn test_printable_text_never_binary() {
        let text = "The quick brown fox jumps over the lazy dog.\n".repeat(1000);
        assert!(!is_likely_binary(text.as_bytes()));
    }
}
