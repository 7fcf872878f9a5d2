use std::sync::Arc;

use drill_core::Clock;
use drill_core::model::Scope;
use drill_core::session::{GradedRound, Session};
use drill_core::time::Deadline;
use storage::repository::{IncrementResult, PerformanceStore};
use tracing::{info, warn};

use crate::config::DrillConfig;
use crate::error::SetupError;
use crate::reconcile::reconcile;
use crate::vocabulary::VocabularySource;

/// What happened to a round's outcome in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
    Applied,
    /// No stored record matched; the in-memory counter still moved.
    Missing,
    /// The store write failed; the in-memory counter still moved.
    Failed,
}

/// Builds sessions from the store and vocabulary, and writes outcomes back.
///
/// The store handle is passed in; this service never opens connections.
#[derive(Clone)]
pub struct DrillService {
    clock: Clock,
    config: DrillConfig,
    store: Arc<dyn PerformanceStore>,
    vocabulary: Arc<dyn VocabularySource>,
}

impl DrillService {
    #[must_use]
    pub fn new(store: Arc<dyn PerformanceStore>, vocabulary: Arc<dyn VocabularySource>) -> Self {
        Self {
            clock: Clock::default(),
            config: DrillConfig::default(),
            store,
            vocabulary,
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: DrillConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    #[must_use]
    pub fn config(&self) -> &DrillConfig {
        &self.config
    }

    /// Validate a requested chapter number (`0` = all).
    ///
    /// # Errors
    ///
    /// Returns `SetupError::Vocabulary` for a chapter out of range.
    pub fn resolve_scope(&self, requested: u32) -> Result<Scope, SetupError> {
        Ok(self.vocabulary.resolve_scope(requested)?)
    }

    /// Prepare the store, register new vocabulary and start a session over `scope`.
    ///
    /// # Errors
    ///
    /// Returns `SetupError` if the schema, vocabulary or store reads fail,
    /// or if the scope holds no items.
    pub async fn start_session(&self, scope: Scope) -> Result<Session, SetupError> {
        self.store.ensure_schema().await?;

        let vocabulary = self.vocabulary.load(scope)?;
        let reconciled = reconcile(self.store.as_ref(), scope, &vocabulary).await?;
        if reconciled.items.is_empty() {
            return Err(SetupError::EmptyScope {
                scope: scope.to_string(),
            });
        }

        let started_at = self.clock.now();
        let session = Session::new(
            scope,
            reconciled.items,
            self.config.direction,
            Deadline::new(started_at, self.config.time_limit),
        )?;

        info!(
            %scope,
            items = session.items().len(),
            time_limit_secs = self.config.time_limit.as_secs(),
            "session started"
        );
        Ok(session)
    }

    /// Write a graded round to the store before the next round begins.
    ///
    /// Failures are logged and tolerated: the session keeps its in-memory
    /// counters, so weighting stays correct even if this write is lost.
    pub async fn apply(&self, round: &GradedRound) -> Persisted {
        match self.store.increment(&round.key, round.outcome).await {
            Ok(IncrementResult::Applied) => Persisted::Applied,
            Ok(IncrementResult::Missing) => {
                warn!(
                    chapter = %round.key.chapter,
                    source = %round.key.source_term,
                    target = %round.key.target_term,
                    "increment matched no stored record; scope and store have diverged"
                );
                Persisted::Missing
            }
            Err(e) => {
                warn!(error = %e, source = %round.key.source_term, "failed to persist outcome");
                Persisted::Failed
            }
        }
    }
}
