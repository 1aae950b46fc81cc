use std::fmt;

use thiserror::Error;

/// Pipeline stage a failure happened in, carried for log context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Reading,
    Deduplicating,
    Aggregating,
    Writing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Reading => "reading",
            Stage::Deduplicating => "deduplicating",
            Stage::Aggregating => "aggregating",
            Stage::Writing => "writing",
        };
        f.write_str(name)
    }
}

/// Failure of a single snapshot. Every variant aborts that snapshot only;
/// the pipeline logs it and moves on to the next file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Malformed or incoercible snapshot content.
    #[error("format error: {0}")]
    Format(String),

    /// Query or write failure against the store. The snapshot's transaction
    /// is rolled back.
    #[error("store error while {stage}: {error:#}")]
    Store { stage: Stage, error: anyhow::Error },

    /// Domain-level impossibility, e.g. a zero-area listing.
    #[error("data error: {0}")]
    Data(String),

    /// Panic or task failure caught at the outer loop.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl LoadError {
    pub fn store(stage: Stage, error: anyhow::Error) -> Self {
        LoadError::Store { stage, error }
    }

    /// Short label used in log lines and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::Format(_) => "FormatError",
            LoadError::Store { .. } => "StoreError",
            LoadError::Data(_) => "DataError",
            LoadError::Unexpected(_) => "UnexpectedError",
        }
    }

    /// Stage the failure is attributed to, if it could be pinned down.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            LoadError::Format(_) => Some(Stage::Reading),
            LoadError::Store { stage, .. } => Some(*stage),
            LoadError::Data(_) => Some(Stage::Aggregating),
            LoadError::Unexpected(_) => None,
        }
    }
}
