mod ids;
mod item;
mod outcome;
mod report;
mod scope;

pub use ids::{Chapter, ItemId};
pub use item::{ItemError, ItemKey, ItemRecord};
pub use outcome::Outcome;
pub use report::{EndReason, SessionReport};
pub use scope::{ChapterAttribution, Scope};
