use std::collections::HashMap;

use thiserror::Error;

/// Separator between the source and target term on a vocabulary line.
pub const PAIR_SEPARATOR: char = '\\';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum VocabParseError {
    #[error("line {line}: expected `source\\target`, got {raw:?}")]
    MalformedLine { line: usize, raw: String },
}

/// One `source\target` vocabulary pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TermPair {
    pub source: String,
    pub target: String,
}

impl TermPair {
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Parse a chapter's vocabulary text.
///
/// Blank lines are skipped. A later line with the same source term replaces
/// the earlier pair in place, so each source term appears once.
///
/// # Errors
///
/// Returns `VocabParseError::MalformedLine` for a line without exactly one
/// separator or with an empty side.
pub fn parse_pairs(text: &str) -> Result<Vec<TermPair>, VocabParseError> {
    let mut pairs: Vec<TermPair> = Vec::new();
    let mut by_source: HashMap<String, usize> = HashMap::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let malformed = || VocabParseError::MalformedLine {
            line: idx + 1,
            raw: raw.to_owned(),
        };

        let mut parts = line.split(PAIR_SEPARATOR);
        let (Some(source), Some(target), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed());
        };
        let (source, target) = (source.trim(), target.trim());
        if source.is_empty() || target.is_empty() {
            return Err(malformed());
        }

        let pair = TermPair::new(source, target);
        match by_source.get(source) {
            Some(&existing) => pairs[existing] = pair,
            None => {
                by_source.insert(source.to_owned(), pairs.len());
                pairs.push(pair);
            }
        }
    }

    Ok(pairs)
}
