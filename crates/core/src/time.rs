use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, PoisonError};

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
    /// Shared, manually advanced time. Clones observe the same instant.
    Manual(ManualClock),
}

impl Clock {
    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns a clock driven by `manual`.
    #[must_use]
    pub fn manual(manual: ManualClock) -> Self {
        Self::Manual(manual)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
            Clock::Manual(m) => m.now(),
        }
    }

    /// Advance a fixed or manual clock by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        match self {
            Clock::Default => {}
            Clock::Fixed(t) => *t += delta,
            Clock::Manual(m) => m.advance(delta),
        }
    }
}

/// Handle to a manually advanced instant, shared between clones.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    #[must_use]
    pub fn starting_at(at: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(at)),
        }
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn advance(&self, delta: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *guard += delta;
    }
}

//
// ─── TIME LIMITS ───────────────────────────────────────────────────────────────
//

/// Default length of a timed session.
pub const DEFAULT_TIME_LIMIT_SECS: u64 = 60;

/// Ceiling applied in unlimited mode so a session always terminates.
pub const UNLIMITED_CEILING_SECS: u64 = 3_600;

/// How long a session may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLimit {
    Seconds(u64),
    Unlimited,
}

impl TimeLimit {
    /// Effective limit in seconds; unlimited maps to the finite ceiling.
    #[must_use]
    pub fn as_secs(self) -> u64 {
        match self {
            TimeLimit::Seconds(secs) => secs,
            TimeLimit::Unlimited => UNLIMITED_CEILING_SECS,
        }
    }

    #[must_use]
    pub fn as_duration(self) -> Duration {
        i64::try_from(self.as_secs())
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }
}

impl Default for TimeLimit {
    fn default() -> Self {
        Self::Seconds(DEFAULT_TIME_LIMIT_SECS)
    }
}

/// Wall-clock deadline of a session, checked between rounds only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    started_at: DateTime<Utc>,
    limit: TimeLimit,
}

impl Deadline {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>, limit: TimeLimit) -> Self {
        Self { started_at, limit }
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn limit(&self) -> TimeLimit {
        self.limit
    }

    /// True once `now - started_at >= limit`.
    #[must_use]
    pub fn has_passed(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.started_at) >= self.limit.as_duration()
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
