use chrono::{DateTime, Duration, Utc};

use crate::indicators::AnnotatedCandle;
use crate::models::Direction;

/// A breakout seen on a closed candle, waiting for the next candle to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSignal {
    pub direction: Direction,
    pub armed_at: DateTime<Utc>,
}

/// Outcome of one detection pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Nothing to do this candle
    Idle,
    /// Breakout found; will fire on the next candle
    Armed(PendingSignal),
    /// Pending signal is due now
    Fire(Direction),
    /// Pending signal is not due yet
    Waiting(PendingSignal),
    /// Execution window was missed; the signal is dropped
    Expired(PendingSignal),
}

impl Detection {
    /// Direction to trade, if this pass fired
    pub fn fired(&self) -> Option<Direction> {
        match self {
            Detection::Fire(direction) => Some(*direction),
            _ => None,
        }
    }
}

/// Deferred breakout detector.
///
/// A close outside the band on the second-to-last candle arms a signal;
/// the signal fires only when the latest candle is exactly one interval
/// after the breakout candle, and is discarded if that candle was skipped.
/// Arming and firing never happen on the same call.
#[derive(Debug, Clone)]
pub struct SignalDetector {
    candle_interval: Duration,
    pending: Option<PendingSignal>,
}

impl SignalDetector {
    pub fn new(candle_interval: Duration) -> Self {
        Self {
            candle_interval,
            pending: None,
        }
    }

    pub fn pending(&self) -> Option<&PendingSignal> {
        self.pending.as_ref()
    }

    /// Evaluate the latest annotated series. Call once per closed candle.
    pub fn detect(&mut self, series: &[AnnotatedCandle]) -> Detection {
        if series.len() < 2 {
            return Detection::Idle;
        }

        let current = &series[series.len() - 1];
        let prev = &series[series.len() - 2];

        tracing::debug!(
            prev_time = %prev.candle.timestamp,
            prev_close = prev.candle.close,
            upper = prev.bands.upper,
            lower = prev.bands.lower,
            dist_upper = prev.bands.upper - prev.candle.close,
            dist_lower = prev.candle.close - prev.bands.lower,
            current_time = %current.candle.timestamp,
            pending = self.pending.is_some(),
            "Signal analysis"
        );

        // A pending signal blocks new breakout detection for this call
        if let Some(pending) = self.pending {
            return self.resolve_pending(pending, current.candle.timestamp);
        }

        let direction = if prev.candle.close > prev.bands.upper {
            Direction::Long
        } else if prev.candle.close < prev.bands.lower {
            Direction::Short
        } else {
            return Detection::Idle;
        };

        let pending = PendingSignal {
            direction,
            armed_at: prev.candle.timestamp,
        };
        self.pending = Some(pending);

        tracing::info!(
            direction = %direction,
            armed_at = %pending.armed_at,
            price = prev.candle.close,
            band_width = prev.bands.width(),
            execute_at = %(pending.armed_at + self.candle_interval),
            "New signal armed"
        );

        Detection::Armed(pending)
    }

    fn resolve_pending(&mut self, pending: PendingSignal, current: DateTime<Utc>) -> Detection {
        let expected = pending.armed_at + self.candle_interval;

        if current == expected {
            self.pending = None;
            tracing::info!(direction = %pending.direction, "Executing pending signal now");
            Detection::Fire(pending.direction)
        } else if current > expected {
            self.pending = None;
            tracing::warn!(
                direction = %pending.direction,
                armed_at = %pending.armed_at,
                expected = %expected,
                current = %current,
                "Missed execution window, discarding signal"
            );
            Detection::Expired(pending)
        } else {
            Detection::Waiting(pending)
        }
    }
}
