use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use drill_core::model::{Chapter, Scope};
use drill_core::vocab::{TermPair, parse_pairs};
use tracing::debug;

use crate::error::VocabularyError;

/// Vocabulary pairs of one chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterVocabulary {
    pub chapter: Chapter,
    pub pairs: Vec<TermPair>,
}

/// Read-only ground truth of which pairs exist in which chapter.
pub trait VocabularySource: Send + Sync {
    /// Number of chapters; valid chapters are `1..=chapter_count()`.
    fn chapter_count(&self) -> u32;

    /// Load the pairs of every chapter in `scope`.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyError` if a chapter's resource is missing or malformed.
    fn load(&self, scope: Scope) -> Result<Vec<ChapterVocabulary>, VocabularyError>;

    /// Map a requested chapter number (`0` = all) to a scope.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyError::ChapterOutOfRange` above `chapter_count()`.
    fn resolve_scope(&self, requested: u32) -> Result<Scope, VocabularyError> {
        let max = self.chapter_count();
        if requested > max {
            return Err(VocabularyError::ChapterOutOfRange { requested, max });
        }
        Ok(Scope::from_number(requested))
    }
}

fn chapters_in(scope: Scope, count: u32) -> Vec<Chapter> {
    match scope {
        Scope::All => (1..=count).filter_map(Chapter::new).collect(),
        Scope::Chapter(chapter) => vec![chapter],
    }
}

//
// ─── DIRECTORY SOURCE ──────────────────────────────────────────────────────────
//

/// Text files `chapter_<n>.txt` in one directory, one `source\target` pair per line.
///
/// The chapter count is the number of `.txt` files in the directory.
#[derive(Debug, Clone)]
pub struct DirectoryVocabulary {
    dir: PathBuf,
    chapter_count: u32,
}

impl DirectoryVocabulary {
    /// Open `dir` and count its chapter files.
    ///
    /// # Errors
    ///
    /// Returns `VocabularyError::Missing` if the directory does not exist and
    /// `VocabularyError::Io` if it cannot be listed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, VocabularyError> {
        let dir = dir.into();
        let entries = fs::read_dir(&dir).map_err(|source| match source.kind() {
            ErrorKind::NotFound => VocabularyError::Missing { path: dir.clone() },
            _ => VocabularyError::Io {
                path: dir.clone(),
                source,
            },
        })?;

        let mut count = 0_u32;
        for entry in entries {
            let entry = entry.map_err(|source| VocabularyError::Io {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
                count = count.saturating_add(1);
            }
        }

        debug!(dir = %dir.display(), chapters = count, "opened vocabulary directory");
        Ok(Self {
            dir,
            chapter_count: count,
        })
    }

    #[must_use]
    pub fn chapter_path(&self, chapter: Chapter) -> PathBuf {
        self.dir.join(format!("chapter_{chapter}.txt"))
    }

    fn read_chapter(&self, chapter: Chapter) -> Result<ChapterVocabulary, VocabularyError> {
        let path = self.chapter_path(chapter);
        let text = fs::read_to_string(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => VocabularyError::Missing { path: path.clone() },
            _ => VocabularyError::Io {
                path: path.clone(),
                source,
            },
        })?;
        let pairs = parse_pairs(&text).map_err(|source| VocabularyError::Parse { path, source })?;
        Ok(ChapterVocabulary { chapter, pairs })
    }
}

impl VocabularySource for DirectoryVocabulary {
    fn chapter_count(&self) -> u32 {
        self.chapter_count
    }

    fn load(&self, scope: Scope) -> Result<Vec<ChapterVocabulary>, VocabularyError> {
        chapters_in(scope, self.chapter_count)
            .into_iter()
            .map(|chapter| self.read_chapter(chapter))
            .collect()
    }
}

//
// ─── STATIC SOURCE ─────────────────────────────────────────────────────────────
//

/// Vocabulary held in memory, for tests and embedding.
///
/// Chapters are numbered consecutively from 1 in insertion order.
#[derive(Debug, Clone, Default)]
pub struct StaticVocabulary {
    chapters: BTreeMap<Chapter, Vec<TermPair>>,
}

impl StaticVocabulary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next chapter with `pairs` given as `(source, target)`.
    #[must_use]
    pub fn with_chapter(mut self, pairs: &[(&str, &str)]) -> Self {
        let next = u32::try_from(self.chapters.len())
            .unwrap_or(u32::MAX - 1)
            .saturating_add(1);
        if let Some(chapter) = Chapter::new(next) {
            self.chapters.insert(
                chapter,
                pairs
                    .iter()
                    .map(|(source, target)| TermPair::new(*source, *target))
                    .collect(),
            );
        }
        self
    }
}

impl VocabularySource for StaticVocabulary {
    fn chapter_count(&self) -> u32 {
        u32::try_from(self.chapters.len()).unwrap_or(u32::MAX)
    }

    fn load(&self, scope: Scope) -> Result<Vec<ChapterVocabulary>, VocabularyError> {
        Ok(self
            .chapters
            .iter()
            .filter(|(chapter, _)| scope.includes(**chapter))
            .map(|(chapter, pairs)| ChapterVocabulary {
                chapter: *chapter,
                pairs: pairs.clone(),
            })
            .collect())
    }
}
