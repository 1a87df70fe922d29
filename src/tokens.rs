//! Token counting strategies.
//!
//! The scanner only needs "given text, return a token count", so counting is
//! expressed as the [`TokenCounter`] trait. Two strategies ship with the crate:
//! a characters-per-token [`Estimator`] and a BPE-exact [`TiktokenCounter`]
//! backed by tiktoken-rs.

use std::sync::OnceLock;

use thiserror::Error;
use tiktoken_rs::CoreBPE;

/// Default characters-per-token ratio for the estimator.
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 3.5;

/// Errors raised while selecting or initializing a tokenizer.
#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("unsupported tokenizer: {0}")]
    Unsupported(String),

    #[error("init tokenizer {name}: {message}")]
    Init { name: String, message: String },
}

/// A strategy turning text into a token count.
///
/// Implementations must be deterministic and return 0 for empty text.
pub trait TokenCounter: Send + Sync {
    /// Count tokens in `text`.
    fn count(&self, text: &str) -> usize;

    /// Short identifier, e.g. `estimate` or `openai`.
    fn name(&self) -> &str;

    /// Human-readable description shown in summaries.
    fn description(&self) -> &str;
}

/// Characters-per-token heuristic.
///
/// # Examples
///
/// ```
/// use tokcount::tokens::{Estimator, TokenCounter};
///
/// let estimator = Estimator::default();
/// assert_eq!(estimator.count("1234567"), 2);
/// assert_eq!(estimator.count(""), 0);
/// ```
#[derive(Debug, Clone)]
pub struct Estimator {
    chars_per_token: f64,
    description: String,
}

impl Estimator {
    /// Create an estimator. Non-positive ratios fall back to 3.5.
    pub fn new(chars_per_token: f64) -> Self {
        let chars_per_token = if chars_per_token > 0.0 {
            chars_per_token
        } else {
            DEFAULT_CHARS_PER_TOKEN
        };
        Self {
            chars_per_token,
            description: format!("estimate (chars / {})", chars_per_token),
        }
    }

    pub fn chars_per_token(&self) -> f64 {
        self.chars_per_token
    }
}

impl Default for Estimator {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_TOKEN)
    }
}

impl TokenCounter for Estimator {
    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        (text.len() as f64 / self.chars_per_token).round() as usize
    }

    fn name(&self) -> &str {
        "estimate"
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// BPE encoding used by [`TiktokenCounter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// cl100k_base: GPT-4, GPT-3.5-turbo, Claude approximation
    #[default]
    Cl100kBase,
    /// o200k_base: GPT-4o, o1
    O200kBase,
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoding::Cl100kBase => write!(f, "cl100k_base"),
            Encoding::O200kBase => write!(f, "o200k_base"),
        }
    }
}

// Cached tokenizers - initialized once per encoding
static CL100K: OnceLock<Option<CoreBPE>> = OnceLock::new();
static O200K: OnceLock<Option<CoreBPE>> = OnceLock::new();

fn get_bpe(encoding: Encoding) -> Option<&'static CoreBPE> {
    match encoding {
        Encoding::Cl100kBase => CL100K
            .get_or_init(|| tiktoken_rs::cl100k_base().ok())
            .as_ref(),
        Encoding::O200kBase => O200K
            .get_or_init(|| tiktoken_rs::o200k_base().ok())
            .as_ref(),
    }
}

/// Exact BPE counts via tiktoken-rs.
pub struct TiktokenCounter {
    name: String,
    description: String,
    encoding: Encoding,
    bpe: &'static CoreBPE,
}

impl TiktokenCounter {
    /// Create a counter for `encoding`, failing if the BPE cannot be loaded.
    pub fn new(
        name: impl Into<String>,
        encoding: Encoding,
        description: impl Into<String>,
    ) -> Result<Self, TokenizerError> {
        let name = name.into();
        let bpe = get_bpe(encoding).ok_or_else(|| TokenizerError::Init {
            name: name.clone(),
            message: format!("failed to load {} encoding", encoding),
        })?;
        Ok(Self {
            name,
            description: description.into(),
            encoding,
            bpe,
        })
    }
}

impl std::fmt::Debug for TiktokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenCounter")
            .field("name", &self.name)
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_ordinary(text).len()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Select a tokenizer by name.
///
/// Names are trimmed and case-insensitive. An empty name selects the estimator.
///
/// # Examples
///
/// ```
/// use tokcount::tokens::from_name;
///
/// let counter = from_name("").unwrap();
/// assert_eq!(counter.name(), "estimate");
/// assert!(from_name("nope").is_err());
/// ```
pub fn from_name(name: &str) -> Result<Box<dyn TokenCounter>, TokenizerError> {
    match name.trim().to_lowercase().as_str() {
        "" | "estimate" | "google" | "gemini" => Ok(Box::new(Estimator::default())),
        "anthropic" | "claude" => Ok(Box::new(TiktokenCounter::new(
            "anthropic",
            Encoding::Cl100kBase,
            "cl100k_base (Claude approximation)",
        )?)),
        "openai" => Ok(Box::new(TiktokenCounter::new(
            "openai",
            Encoding::Cl100kBase,
            "cl100k_base (GPT-4)",
        )?)),
        "openai-o200k" => Ok(Box::new(TiktokenCounter::new(
            "openai-o200k",
            Encoding::O200kBase,
            "o200k_base (GPT-4o/o1)",
        )?)),
        _ => Err(TokenizerError::Unsupported(name.to_string())),
    }
}
