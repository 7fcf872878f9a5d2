#![forbid(unsafe_code)]

pub mod config;
pub mod drill;
pub mod error;
pub mod quiz_loop;
pub mod reconcile;
pub mod stats;
pub mod transcript;
pub mod vocabulary;

pub use drill_core::Clock;

pub use config::DrillConfig;
pub use drill::{DrillService, Persisted};
pub use error::{SessionError, SetupError, TranscriptError, VocabularyError};
pub use quiz_loop::{Prompter, QuizLoop};
pub use reconcile::{Reconciled, reconcile};
pub use stats::{ItemStats, STATS_BATCH_SIZE, StatsService, format_batch};
pub use transcript::{DailyFileTranscript, TranscriptSink};
pub use vocabulary::{ChapterVocabulary, DirectoryVocabulary, StaticVocabulary, VocabularySource};
