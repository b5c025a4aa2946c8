//! Fix-acceptance policy for one acquisition attempt.

use std::time::{Duration, Instant};

use crate::config::LocationConfig;
use crate::point::LocationPoint;

/// Consecutive fixes required before a position is declared stable.
pub const REQUIRED_SETTLING_COUNT: u32 = 2;

/// Per-attempt quality tally.
///
/// The consecutive-fix counter is monotonic within an attempt: a poll
/// without a fix does not reset it, so a transient bad poll between good
/// ones still counts toward acceptance on the next good poll (see
/// DESIGN.md).
#[derive(Debug)]
pub struct FixGate {
    started: Instant,
    fix_count: u32,
    first_fix: Option<Instant>,
}

impl FixGate {
    /// Start the tally for a new attempt.
    pub fn begin(now: Instant) -> Self {
        Self {
            started: now,
            fix_count: 0,
            first_fix: None,
        }
    }

    /// Record a poll that produced fix telemetry with `fix != 0`.
    ///
    /// Returns true on the first fix of the attempt.
    pub fn observe_fix(&mut self, now: Instant) -> bool {
        self.fix_count += 1;
        if self.first_fix.is_none() {
            self.first_fix = Some(now);
            return true;
        }
        false
    }

    pub fn fix_count(&self) -> u32 {
        self.fix_count
    }

    /// Whether the attempt may conclude with a stable fix.
    ///
    /// Evaluated against the most recent poll only: the current poll must
    /// have carried a fix, the settling count must be reached, and the
    /// latest HDOP and horizontal-accuracy readings must sit inside the
    /// configured thresholds. Once all conditions hold simultaneously the
    /// gate accepts immediately.
    pub fn accepts(
        &self,
        fixed_this_poll: bool,
        point: &LocationPoint,
        config: &LocationConfig,
    ) -> bool {
        fixed_this_poll
            && self.fix_count >= REQUIRED_SETTLING_COUNT
            && point.horizontal_dop <= config.hdop_threshold()
            && point.horizontal_accuracy <= config.hacc_threshold()
    }

    /// Time elapsed since the attempt started.
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.duration_since(self.started)
    }

    /// Seconds from attempt start to the first fix, if one was seen.
    pub fn time_to_first_fix(&self) -> Option<f32> {
        self.first_fix
            .map(|at| at.duration_since(self.started).as_secs_f32())
    }
}
