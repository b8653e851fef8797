use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::BotError;

/// Validated strategy parameters. Construct with [`StrategyConfig::new`]
/// so invalid values are rejected before the trading loop starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub position_size_usd: f64,
    pub leverage: u32,
    pub tp_multiplier: f64,
    pub sl_multiplier: f64,
    pub candle_interval_minutes: u32,
}

impl StrategyConfig {
    pub fn new(
        position_size_usd: f64,
        leverage: u32,
        tp_multiplier: f64,
        sl_multiplier: f64,
        candle_interval_minutes: u32,
    ) -> Result<Self, BotError> {
        let config = Self {
            position_size_usd,
            leverage,
            tp_multiplier,
            sl_multiplier,
            candle_interval_minutes,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BotError> {
        // `!(x > 0.0)` also rejects NaN
        if !(self.position_size_usd > 0.0) {
            return Err(BotError::Configuration(format!(
                "position size must be positive, got {}",
                self.position_size_usd
            )));
        }
        if self.leverage < 1 {
            return Err(BotError::Configuration(
                "leverage must be at least 1".to_string(),
            ));
        }
        if !(self.tp_multiplier > 0.0) || !(self.sl_multiplier > 0.0) {
            return Err(BotError::Configuration(format!(
                "TP and SL multipliers must be positive, got {} / {}",
                self.tp_multiplier, self.sl_multiplier
            )));
        }
        if self.candle_interval_minutes == 0 {
            return Err(BotError::Configuration(
                "candle interval must be at least 1 minute".to_string(),
            ));
        }
        Ok(())
    }

    pub fn candle_interval(&self) -> Duration {
        Duration::minutes(self.candle_interval_minutes as i64)
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            position_size_usd: 100.0,
            leverage: 3,
            tp_multiplier: 2.0,
            sl_multiplier: 1.0,
            candle_interval_minutes: 5,
        }
    }
}
