use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

use crate::model::ids::Chapter;
use crate::model::item::ItemRecord;

/// Which chapters participate in a session or query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    All,
    Chapter(Chapter),
}

impl Scope {
    /// Map the CLI convention (`0` = all chapters) onto a scope.
    #[must_use]
    pub fn from_number(number: u32) -> Self {
        Chapter::new(number).map_or(Self::All, Self::Chapter)
    }

    #[must_use]
    pub fn includes(&self, chapter: Chapter) -> bool {
        match self {
            Scope::All => true,
            Scope::Chapter(c) => *c == chapter,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str("all"),
            Scope::Chapter(c) => write!(f, "{c}"),
        }
    }
}

/// Chapter reported for a finished session.
///
/// Derived from the records that were loaded for the session, never from
/// the items that happened to be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterAttribution {
    Single(Chapter),
    All,
}

impl ChapterAttribution {
    /// One distinct chapter across `items` gives that chapter; anything else
    /// is reported as "all".
    #[must_use]
    pub fn from_items(items: &[ItemRecord]) -> Self {
        let chapters: BTreeSet<Chapter> = items.iter().map(ItemRecord::chapter).collect();
        let mut iter = chapters.into_iter();
        match (iter.next(), iter.next()) {
            (Some(only), None) => Self::Single(only),
            _ => Self::All,
        }
    }
}

impl fmt::Display for ChapterAttribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChapterAttribution::Single(c) => write!(f, "{c}"),
            ChapterAttribution::All => f.write_str("all"),
        }
    }
}

impl Serialize for ChapterAttribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ChapterAttribution::Single(c) => serializer.serialize_u32(c.number()),
            ChapterAttribution::All => serializer.serialize_str("all"),
        }
    }
}
