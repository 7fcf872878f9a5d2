use drill_core::session::Direction;
use drill_core::time::TimeLimit;

/// Session-wide settings chosen at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrillConfig {
    pub time_limit: TimeLimit,
    pub direction: Direction,
    pub show_weights: bool,
}

impl DrillConfig {
    /// Build from the CLI flags. `unlimited` wins over `time_limit_secs`.
    #[must_use]
    pub fn from_flags(
        time_limit_secs: u64,
        unlimited: bool,
        english: bool,
        show_weights: bool,
    ) -> Self {
        let time_limit = if unlimited {
            TimeLimit::Unlimited
        } else {
            TimeLimit::Seconds(time_limit_secs)
        };
        let direction = if english {
            Direction::SourceToTarget
        } else {
            Direction::TargetToSource
        };
        Self {
            time_limit,
            direction,
            show_weights,
        }
    }

    #[must_use]
    pub fn with_time_limit(mut self, time_limit: TimeLimit) -> Self {
        self.time_limit = time_limit;
        self
    }

    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn with_show_weights(mut self, show_weights: bool) -> Self {
        self.show_weights = show_weights;
        self
    }
}
