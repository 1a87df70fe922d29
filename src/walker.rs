//! Repository traversal and token counting.
//!
//! The walk itself is sequential: every entry is checked against the
//! [`IgnoreSpec`], ignored directories are pruned (after a separate recount of
//! the files they hide), and surviving files become candidates. Reading,
//! binary classification and token counting for candidates can then run on
//! the rayon pool; outcomes are folded back in walk order so the result does
//! not depend on scheduling.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::aggregate::DirectoryTotals;
use crate::filter::{is_likely_binary, IgnoreSpec};
use crate::tokens::TokenCounter;

/// Files larger than this are counted as ignored without being read.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Errors that abort a scan.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Options for a scan.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Byte ceiling above which a file is ignored unread (0 = default).
    pub max_file_bytes: u64,
    /// Read and count candidate files on the rayon pool.
    pub parallel: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            parallel: true,
        }
    }
}

impl ScanOptions {
    /// Options that read files on the calling thread only.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Default::default()
        }
    }

    /// Set the byte ceiling.
    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    fn effective_max_file_bytes(&self) -> u64 {
        if self.max_file_bytes == 0 {
            DEFAULT_MAX_FILE_BYTES
        } else {
            self.max_file_bytes
        }
    }
}

/// Totals produced by one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Absolute repository root.
    pub repository: PathBuf,
    /// Tokenizer identifier.
    pub tokenizer: String,
    /// Tokenizer description.
    pub tokenizer_detail: String,
    pub total_tokens: usize,
    /// Files whose tokens were counted.
    pub total_files: usize,
    /// Files skipped by ignore rules, the size ceiling or binary detection.
    pub ignored_files: usize,
    pub total_lines: usize,
    /// Cumulative tokens per directory; the root always equals `total_tokens`.
    pub directory_tokens: DirectoryTotals,
}

/// A non-ignored file found by the walk.
#[derive(Debug)]
struct Candidate {
    path: PathBuf,
    relative: PathBuf,
    size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    Oversized,
    Binary,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Oversized => write!(f, "oversized"),
            SkipReason::Binary => write!(f, "binary"),
        }
    }
}

#[derive(Debug)]
enum FileOutcome {
    Counted { tokens: usize, lines: usize },
    Skipped(SkipReason),
    /// Lost to a transient error; counts as neither scanned nor ignored.
    Vanished,
}

/// Scan a repository and count tokens per file and directory.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use tokcount::filter::IgnoreSpec;
/// use tokcount::tokens::Estimator;
/// use tokcount::walker::{scan, ScanOptions};
///
/// let root = Path::new("./my-project");
/// let spec = IgnoreSpec::load(root, None).unwrap();
/// let result = scan(root, &spec, &Estimator::default(), &ScanOptions::default()).unwrap();
/// println!("{} tokens in {} files", result.total_tokens, result.total_files);
/// ```
pub fn scan(
    root: &Path,
    spec: &IgnoreSpec,
    counter: &dyn TokenCounter,
    options: &ScanOptions,
) -> Result<ScanResult, WalkError> {
    let root = resolve_root(root)?;
    info!(root = %root.display(), tokenizer = counter.name(), "scanning repository");

    let mut result = ScanResult {
        repository: root.clone(),
        tokenizer: counter.name().to_string(),
        tokenizer_detail: counter.description().to_string(),
        total_tokens: 0,
        total_files: 0,
        ignored_files: 0,
        total_lines: 0,
        directory_tokens: DirectoryTotals::new(),
    };

    let candidates = collect_candidates(&root, spec, &mut result.ignored_files)?;
    let max_file_bytes = options.effective_max_file_bytes();

    let outcomes: Vec<FileOutcome> = if options.parallel {
        candidates
            .par_iter()
            .map(|candidate| inspect_file(candidate, counter, max_file_bytes))
            .collect::<Result<_, _>>()?
    } else {
        candidates
            .iter()
            .map(|candidate| inspect_file(candidate, counter, max_file_bytes))
            .collect::<Result<_, _>>()?
    };

    for (candidate, outcome) in candidates.iter().zip(outcomes) {
        match outcome {
            FileOutcome::Counted { tokens, lines } => {
                result.total_tokens += tokens;
                result.total_files += 1;
                result.total_lines += lines;
                result.directory_tokens.record(&candidate.relative, tokens);
            }
            FileOutcome::Skipped(reason) => {
                debug!(path = %candidate.relative.display(), %reason, "skipping file");
                result.ignored_files += 1;
            }
            FileOutcome::Vanished => {}
        }
    }

    result.directory_tokens.set_root(result.total_tokens);

    info!(
        files = result.total_files,
        ignored = result.ignored_files,
        tokens = result.total_tokens,
        "scan complete"
    );
    Ok(result)
}

/// Check that `root` is an existing directory and make it absolute.
pub fn resolve_root(root: &Path) -> Result<PathBuf, WalkError> {
    let metadata = fs::metadata(root).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            WalkError::NotFound {
                path: root.to_path_buf(),
            }
        } else {
            WalkError::Io {
                path: root.to_path_buf(),
                source,
            }
        }
    })?;

    if !metadata.is_dir() {
        return Err(WalkError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    std::path::absolute(root).map_err(|source| WalkError::Io {
        path: root.to_path_buf(),
        source,
    })
}

/// Entries that vanished or are unreadable are treated as if they never existed.
fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
    )
}

fn walkdir_error(err: walkdir::Error, root: &Path) -> Result<(), WalkError> {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());

    match err.io_error().map(io::Error::kind) {
        Some(kind) if is_transient(kind) => {
            debug!(path = %path.display(), error = %err, "skipping unreadable entry");
            Ok(())
        }
        _ => Err(WalkError::Io {
            path,
            source: err.into(),
        }),
    }
}

/// Walk the tree, applying ignore rules and collecting files to read.
fn collect_candidates(
    root: &Path,
    spec: &IgnoreSpec,
    ignored_files: &mut usize,
) -> Result<Vec<Candidate>, WalkError> {
    let mut candidates = Vec::new();
    let mut entries = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(next) = entries.next() {
        let entry = match next {
            Ok(entry) => entry,
            Err(err) => {
                walkdir_error(err, root)?;
                continue;
            }
        };

        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();
        let file_type = entry.file_type();
        let is_dir = file_type.is_dir();

        if spec.is_ignored(&relative, is_dir) {
            if is_dir {
                let hidden = count_files_under(entry.path());
                debug!(path = %relative.display(), files = hidden, "skipping ignored directory");
                *ignored_files += hidden;
                entries.skip_current_dir();
            } else {
                *ignored_files += 1;
            }
            continue;
        }

        if is_dir {
            continue;
        }

        let size = if file_type.is_symlink() {
            match fs::metadata(entry.path()) {
                Ok(target) if target.is_file() => target.len(),
                Ok(_) => {
                    debug!(path = %relative.display(), "not following symlink to non-file");
                    continue;
                }
                Err(err) if is_transient(err.kind()) => {
                    debug!(path = %relative.display(), error = %err, "skipping dangling symlink");
                    continue;
                }
                Err(source) => {
                    return Err(WalkError::Io {
                        path: entry.into_path(),
                        source,
                    })
                }
            }
        } else if file_type.is_file() {
            match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(err) => {
                    walkdir_error(err, root)?;
                    continue;
                }
            }
        } else {
            debug!(path = %relative.display(), "skipping special file");
            continue;
        };

        candidates.push(Candidate {
            path: entry.into_path(),
            relative,
            size,
        });
    }

    Ok(candidates)
}

fn inspect_file(
    candidate: &Candidate,
    counter: &dyn TokenCounter,
    max_file_bytes: u64,
) -> Result<FileOutcome, WalkError> {
    if candidate.size > max_file_bytes {
        return Ok(FileOutcome::Skipped(SkipReason::Oversized));
    }

    let data = match fs::read(&candidate.path) {
        Ok(data) => data,
        Err(err) if is_transient(err.kind()) => {
            debug!(path = %candidate.relative.display(), error = %err, "skipping unreadable file");
            return Ok(FileOutcome::Vanished);
        }
        Err(source) => {
            return Err(WalkError::Io {
                path: candidate.path.clone(),
                source,
            })
        }
    };

    if is_likely_binary(&data) {
        return Ok(FileOutcome::Skipped(SkipReason::Binary));
    }

    let text = String::from_utf8_lossy(&data);
    Ok(FileOutcome::Counted {
        tokens: counter.count(&text),
        lines: count_lines(&data),
    })
}

/// Count non-directory entries beneath `dir`, for ignored-directory totals.
///
/// Errors are skipped: the number only feeds the ignored-files statistic.
pub fn count_files_under(dir: &Path) -> usize {
    WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| !entry.file_type().is_dir())
        .count()
}

/// Newline count plus one for non-empty content; zero for empty content.
///
/// # Examples
///
/// ```
/// use tokcount::walker::count_lines;
///
/// assert_eq!(count_lines(b""), 0);
/// assert_eq!(count_lines(b"one line"), 1);
/// assert_eq!(count_lines(b"a\nb\n"), 3);
/// ```
pub fn count_lines(data: &[u8]) -> usize {
    if data.is_empty() {
        return 0;
    }
    bytecount::count(data, b'\n') + 1
}
