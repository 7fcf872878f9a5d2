//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use drill_core::model::ItemError;
use drill_core::session::RoundError;
use drill_core::vocab::VocabParseError;
use storage::repository::StorageError;

/// Errors emitted by vocabulary sources.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VocabularyError {
    #[error("chapter number must be between 0 and {max}, got {requested}")]
    ChapterOutOfRange { requested: u32, max: u32 },
    #[error("vocabulary file is missing: {}", path.display())]
    Missing { path: PathBuf },
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: VocabParseError,
    },
}

/// Errors raised before the first round. None of these are recoverable.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SetupError {
    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),
    #[error("no vocabulary in scope {scope}")]
    EmptyScope { scope: String },
    #[error(transparent)]
    Item(#[from] ItemError),
    #[error(transparent)]
    Round(#[from] RoundError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while a session is running.
///
/// Store failures during a round are not errors: they are logged and the
/// session continues on its in-memory counters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Round(#[from] RoundError),
    #[error("failed to read answer: {0}")]
    Input(#[from] std::io::Error),
}

/// Errors emitted by transcript sinks.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TranscriptError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Encode(#[from] serde_json::Error),
}
