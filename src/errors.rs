//! Error types for tokcount.

use std::path::PathBuf;

use crate::filter::IgnoreError;
use crate::output::OutputError;
use crate::tokens::TokenizerError;
use crate::walker::WalkError;

/// Top-level error type for tokcount operations.
#[derive(Debug, thiserror::Error)]
pub enum TokcountError {
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("load ignore spec: {0}")]
    Config(#[from] IgnoreError),

    #[error("walk repository: {0}")]
    Walk(#[from] WalkError),

    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Map an error to its exit code.
pub fn exit_code(error: &TokcountError) -> i32 {
    match error {
        TokcountError::PathNotFound(_) => 3,
        TokcountError::Config(_) => 2,
        TokcountError::Walk(_) => 4,
        TokcountError::Tokenizer(_) => 2,
        TokcountError::Output(_) => 1,
        TokcountError::Io(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let missing = TokcountError::PathNotFound(PathBuf::from("nope"));
        assert_eq!(exit_code(&missing), 3);

        let config = TokcountError::from(IgnoreError::NotFound {
            path: PathBuf::from(".custom"),
        });
        assert_eq!(exit_code(&config), 2);
        assert_eq!(config.to_string(), "load ignore spec: ignore file not found: .custom");

        let tokenizer = TokcountError::from(TokenizerError::Unsupported("x".into()));
        assert_eq!(exit_code(&tokenizer), 2);
        assert_eq!(tokenizer.to_string(), "unsupported tokenizer: x");

        let io = TokcountError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert_eq!(exit_code(&io), 1);
    }
}
