//! Tokcount - Estimate LLM token counts for a repository.
//!
//! Tokcount walks a repository, skips generated, vendored and binary files
//! using gitignore-style rules, counts tokens in everything else, and rolls
//! the counts up per directory.
//!
//! # Quick Start
//!
//! ```no_run
//! use tokcount::builder::Tokcount;
//!
//! let result = Tokcount::new("./my-project")
//!     .tokenizer("openai")
//!     .run()
//!     .unwrap();
//!
//! println!("{} tokens in {} files", result.total_tokens, result.total_files);
//! println!("src/: {:?}", result.directory_tokens.get("src"));
//! ```
//!
//! # Modules
//!
//! - [`tokens`] - Token counting strategies (estimate, tiktoken)
//! - [`filter`] - Ignore spec loading/matching and binary detection
//! - [`walker`] - Repository traversal and per-file counting
//! - [`aggregate`] - Per-directory token rollups
//! - [`tree`] - Directory tree view and rendering
//! - [`output`] - Summary and JSON output
//! - [`builder`] - Fluent API tying the pieces together
//!
//! # Ignore Precedence
//!
//! Patterns are merged in this order, and the last matching pattern wins:
//!
//! 1. Built-in defaults ([`filter::DEFAULT_PATTERNS`])
//! 2. `.tokcountignore` in the repository root
//! 3. `.gitignore` in the repository root
//! 4. An explicitly named ignore file (must exist)

pub mod tokens;
pub mod filter;
pub mod errors;
pub mod aggregate;
pub mod walker;
pub mod tree;
pub mod output;
pub mod builder;

// Re-export key types at crate root for convenience
pub use aggregate::{DirectoryTotals, ROOT_KEY};
pub use builder::{count_path, Tokcount};
pub use errors::TokcountError;
pub use filter::{is_likely_binary, IgnoreError, IgnoreSpec};
pub use output::{OutputError, OutputFormat};
pub use tokens::{Estimator, TiktokenCounter, TokenCounter, TokenizerError};
pub use tree::DirectoryNode;
pub use walker::{scan, ScanOptions, ScanResult, WalkError};
