//! Error types shared by every stage of a swap.

use std::fmt;
use thiserror::Error;

/// Failure of a single swap stage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SwapError {
    /// The identifier does not resolve to a pool.
    #[error("pool not found: {0}")]
    NotFound(String),

    /// A data source or the broadcaster was unreachable or answered with
    /// malformed data.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed request parameters.
    #[error("invalid intent: {0}")]
    InvalidIntent(String),

    /// The trade would drain or exceed the pool.
    #[error("insufficient liquidity: {0}")]
    InsufficientLiquidity(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("submission failed: {0}")]
    Submission(String),
}

impl SwapError {
    /// Tag this error with the stage that produced it.
    pub fn at(self, stage: Stage) -> StageError {
        StageError {
            stage,
            source: self,
        }
    }

    pub(crate) fn transport(err: impl fmt::Display) -> Self {
        SwapError::Transport(err.to_string())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SwapError::InvalidIntent(msg.into())
    }

    pub(crate) fn liquidity(msg: impl Into<String>) -> Self {
        SwapError::InsufficientLiquidity(msg.into())
    }
}

/// Pipeline stage of the client facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Validate,
    Balance,
    Resolve,
    Refresh,
    Quote,
    Build,
    Sign,
    Submit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validate => "validate",
            Stage::Balance => "balance",
            Stage::Resolve => "resolve",
            Stage::Refresh => "refresh",
            Stage::Quote => "quote",
            Stage::Build => "build",
            Stage::Sign => "sign",
            Stage::Submit => "submit",
        };
        f.write_str(name)
    }
}

/// A [`SwapError`] together with the stage it came from.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: SwapError,
}

impl StageError {
    /// Signer and broadcaster failures happen once the request has left
    /// this crate, so the trade may or may not have landed.
    pub fn is_delegated(&self) -> bool {
        matches!(
            self.source,
            SwapError::Signing(_) | SwapError::Submission(_)
        )
    }
}

pub type Result<T, E = SwapError> = std::result::Result<T, E>;
