//! Fluent builder API for tokcount.
//!
//! Resolves the tokenizer, loads the ignore spec and runs the scan in one call.

use std::path::{Path, PathBuf};

use crate::errors::TokcountError;
use crate::filter::IgnoreSpec;
use crate::tokens::{self, TokenCounter};
use crate::walker::{resolve_root, scan, ScanOptions, ScanResult, WalkError};

/// Builder for counting tokens in a repository.
///
/// # Examples
///
/// ```no_run
/// use tokcount::builder::Tokcount;
///
/// let result = Tokcount::new("./project")
///     .tokenizer("openai")
///     .ignore_file(".tokcountignore.extra")
///     .run()
///     .unwrap();
///
/// println!("{} tokens", result.total_tokens);
/// ```
pub struct Tokcount {
    root: PathBuf,
    tokenizer: String,
    counter: Option<Box<dyn TokenCounter>>,
    ignore_file: Option<PathBuf>,
    options: ScanOptions,
}

impl Tokcount {
    /// Create a new builder for the given root path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tokenizer: String::new(),
            counter: None,
            ignore_file: None,
            options: ScanOptions::default(),
        }
    }

    /// Select a tokenizer by name (see [`tokens::from_name`]).
    pub fn tokenizer(mut self, name: impl Into<String>) -> Self {
        self.tokenizer = name.into();
        self
    }

    /// Use a custom counter instead of a named tokenizer.
    pub fn counter(mut self, counter: impl TokenCounter + 'static) -> Self {
        self.counter = Some(Box::new(counter));
        self
    }

    /// Add a required ignore file, resolved against the root if relative.
    pub fn ignore_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ignore_file = Some(path.into());
        self
    }

    /// Set the byte ceiling above which files are ignored unread.
    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.options.max_file_bytes = bytes;
        self
    }

    /// Read files on the rayon pool (default: true).
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.options.parallel = parallel;
        self
    }

    /// Run the scan.
    ///
    /// The tokenizer and ignore files are resolved before any traversal, so
    /// configuration errors never leave a partial scan behind.
    pub fn run(self) -> Result<ScanResult, TokcountError> {
        let counter = match self.counter {
            Some(counter) => counter,
            None => tokens::from_name(&self.tokenizer)?,
        };

        let root = resolve_root(&self.root).map_err(walk_error)?;
        let spec = IgnoreSpec::load(&root, self.ignore_file.as_deref())?;
        scan(&root, &spec, counter.as_ref(), &self.options).map_err(walk_error)
    }
}

fn walk_error(err: WalkError) -> TokcountError {
    match err {
        WalkError::NotFound { path } => TokcountError::PathNotFound(path),
        other => TokcountError::Walk(other),
    }
}

/// Count tokens under `root` with the default tokenizer and options.
pub fn count_path(root: impl AsRef<Path>) -> Result<ScanResult, TokcountError> {
    Tokcount::new(root.as_ref()).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::Estimator;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {\n    println!(\"hi\");\n}\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "some notes\n").unwrap();
        dir
    }

    struct WordCounter;

    impl TokenCounter for WordCounter {
        fn count(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }

        fn name(&self) -> &str {
            "words"
        }

        fn description(&self) -> &str {
            "whitespace-separated words"
        }
    }

    #[test]
    fn test_builder_defaults() {
        let dir = create_test_project();
        let result = Tokcount::new(dir.path()).run().unwrap();

        assert_eq!(result.tokenizer, "estimate");
        assert_eq!(result.total_files, 2);
        assert_eq!(result.directory_tokens.root_total(), result.total_tokens);
    }

    #[test]
    fn test_builder_custom_counter() {
        let dir = create_test_project();
        let result = Tokcount::new(dir.path())
            .counter(WordCounter)
            .parallel(false)
            .run()
            .unwrap();

        assert_eq!(result.tokenizer, "words");
        // "fn main() {", "println!(\"hi\");", "}" -> 5 words; "some notes" -> 2
        assert_eq!(result.total_tokens, 7);
        assert_eq!(result.directory_tokens.get("src"), Some(5));
    }

    #[test]
    fn test_builder_ignore_file() {
        let dir = create_test_project();
        fs::write(dir.path().join("extra.ignore"), "notes.txt\n").unwrap();

        let result = Tokcount::new(dir.path())
            .counter(Estimator::default())
            .ignore_file("extra.ignore")
            .run()
            .unwrap();

        // extra.ignore itself is counted, notes.txt is not
        assert_eq!(result.total_files, 2);
        assert_eq!(result.ignored_files, 1);
    }

    #[test]
    fn test_builder_missing_ignore_file() {
        let dir = create_test_project();
        let err = Tokcount::new(dir.path())
            .ignore_file("missing.ignore")
            .run()
            .unwrap_err();
        assert!(matches!(err, TokcountError::Config(_)));
    }

    #[test]
    fn test_builder_unknown_tokenizer() {
        let dir = create_test_project();
        let err = Tokcount::new(dir.path()).tokenizer("bogus").run().unwrap_err();
        assert!(matches!(err, TokcountError::Tokenizer(_)));
    }

    #[test]
    fn test_builder_file_root_is_walk_error() {
        let dir = create_test_project();
        let err = Tokcount::new(dir.path().join("notes.txt"))
            .run()
            .unwrap_err();
        assert!(matches!(
            err,
            TokcountError::Walk(WalkError::NotADirectory { .. })
        ));
        assert_eq!(crate::errors::exit_code(&err), 4);
    }

    #[test]
    fn test_builder_non_utf8_gitignore() {
        let dir = create_test_project();
        fs::write(dir.path().join(".gitignore"), b"# caf\xe9 build outputs\n*.txt\n").unwrap();

        let result = Tokcount::new(dir.path()).run().unwrap();
        // src/main.rs and .gitignore; notes.txt is ignored
        assert_eq!(result.total_files, 2);
        assert_eq!(result.ignored_files, 1);
    }

    #[test]
    fn test_builder_missing_root() {
        let dir = TempDir::new().unwrap();
        let err = count_path(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, TokcountError::PathNotFound(_)));
    }
}
