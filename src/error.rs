use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::api::ExchangeError;
use crate::models::Direction;

/// Failure kinds surfaced by the signal and execution pipeline
#[derive(Debug, Error)]
pub enum BotError {
    /// Fewer candles than the indicator warm-up needs. Retried next cycle.
    #[error("Insufficient data: {have} candles, need {need}")]
    InsufficientData { have: usize, need: usize },

    /// A pending signal's execution window passed before it could fire
    #[error("Stale {direction} signal armed at {armed_at} discarded at {current}")]
    StaleSignal {
        direction: Direction,
        armed_at: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    /// Bands too narrow to place distinct TP/SL levels
    #[error("Degenerate band: upper {upper:.8}, lower {lower:.8}")]
    DegenerateBand { upper: f64, lower: f64 },

    #[error("Exchange failure: {0}")]
    Collaborator(#[from] ExchangeError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BotError {
    /// Only configuration problems stop the bot; everything else is absorbed by the loop
    pub fn is_fatal(&self) -> bool {
        matches!(self, BotError::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_configuration_is_fatal() {
        assert!(BotError::Configuration("leverage must be at least 1".into()).is_fatal());
        assert!(!BotError::InsufficientData { have: 3, need: 21 }.is_fatal());
        assert!(!BotError::DegenerateBand { upper: 1.0, lower: 1.0 }.is_fatal());
        assert!(!BotError::Collaborator(ExchangeError::RateLimited).is_fatal());
    }

    #[test]
    fn test_insufficient_data_message() {
        let err = BotError::InsufficientData { have: 3, need: 21 };
        assert_eq!(err.to_string(), "Insufficient data: 3 candles, need 21");
    }
}
