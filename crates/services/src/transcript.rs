use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;
use drill_core::model::SessionReport;

use crate::error::TranscriptError;

/// Destination for finished-session reports.
pub trait TranscriptSink: Send + Sync {
    /// Append one report.
    ///
    /// # Errors
    ///
    /// Returns `TranscriptError` if the report cannot be encoded or written.
    fn append(&self, report: &SessionReport) -> Result<(), TranscriptError>;
}

/// Appends one JSON line per session to `<dir>/<YYYY-MM-DD>.txt`, dated by
/// the local day the session ended.
#[derive(Debug, Clone)]
pub struct DailyFileTranscript {
    dir: PathBuf,
}

impl DailyFileTranscript {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn path_for(&self, report: &SessionReport) -> PathBuf {
        let day = report.ended_at.with_timezone(&Local).format("%Y-%m-%d");
        self.dir.join(format!("{day}.txt"))
    }
}

impl TranscriptSink for DailyFileTranscript {
    fn append(&self, report: &SessionReport) -> Result<(), TranscriptError> {
        fs::create_dir_all(&self.dir)?;
        let mut line = serde_json::to_string(report)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(report))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
