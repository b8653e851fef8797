use config::{Config, Environment, File};
use serde::Deserialize;

use crate::api::{bar_for_minutes, BlofinCredentials, BLOFIN_DEMO_API};
use crate::error::BotError;
use crate::execution::orchestrator::DEFAULT_CANDLE_LIMIT;
use crate::indicators::SLOW_WINDOW;
use crate::models::MarginMode;
use crate::strategy::StrategyConfig;

const DEFAULT_CONFIG_FILE: &str = "bandbot";
const ENV_PREFIX: &str = "BANDBOT";

/// Values given on the command line; `None` leaves the lower layers in effect
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<String>,
    pub symbol: Option<String>,
    pub position_size_usd: Option<f64>,
    pub leverage: Option<u32>,
    pub tp_multiplier: Option<f64>,
    pub sl_multiplier: Option<f64>,
    pub candle_interval_minutes: Option<u32>,
    pub margin_mode: Option<MarginMode>,
}

/// Runtime settings: defaults < config file < BANDBOT_* env < CLI flags
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub symbol: String,
    pub position_size_usd: f64,
    pub leverage: u32,
    pub tp_multiplier: f64,
    pub sl_multiplier: f64,
    pub candle_interval_minutes: u32,
    pub margin_mode: MarginMode,
    pub candle_limit: usize,
    pub base_url: String,
}

fn config_error(e: config::ConfigError) -> BotError {
    BotError::Configuration(e.to_string())
}

impl AppConfig {
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, BotError> {
        let defaults = StrategyConfig::default();
        let config_path = overrides
            .config_path
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let settings = Config::builder()
            .set_default("symbol", "BTC-USDT")
            .and_then(|b| b.set_default("position_size_usd", defaults.position_size_usd))
            .and_then(|b| b.set_default("leverage", defaults.leverage as i64))
            .and_then(|b| b.set_default("tp_multiplier", defaults.tp_multiplier))
            .and_then(|b| b.set_default("sl_multiplier", defaults.sl_multiplier))
            .and_then(|b| {
                b.set_default(
                    "candle_interval_minutes",
                    defaults.candle_interval_minutes as i64,
                )
            })
            .and_then(|b| b.set_default("margin_mode", MarginMode::default().as_str()))
            .and_then(|b| b.set_default("candle_limit", DEFAULT_CANDLE_LIMIT as i64))
            .and_then(|b| b.set_default("base_url", BLOFIN_DEMO_API))
            .map_err(config_error)?
            // An explicit --config must exist; the default file is optional
            .add_source(File::with_name(&config_path).required(overrides.config_path.is_some()))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("base_url", std::env::var("BLOFIN_BASE_URL").ok())
            .and_then(|b| b.set_override_option("symbol", overrides.symbol.clone()))
            .and_then(|b| b.set_override_option("position_size_usd", overrides.position_size_usd))
            .and_then(|b| b.set_override_option("leverage", overrides.leverage.map(i64::from)))
            .and_then(|b| b.set_override_option("tp_multiplier", overrides.tp_multiplier))
            .and_then(|b| b.set_override_option("sl_multiplier", overrides.sl_multiplier))
            .and_then(|b| {
                b.set_override_option(
                    "candle_interval_minutes",
                    overrides.candle_interval_minutes.map(i64::from),
                )
            })
            .and_then(|b| {
                b.set_override_option("margin_mode", overrides.margin_mode.map(|m| m.as_str()))
            })
            .map_err(config_error)?
            .build()
            .map_err(config_error)?;

        let app: AppConfig = settings.try_deserialize().map_err(config_error)?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<(), BotError> {
        self.strategy_config()?;

        if !self.symbol.ends_with("-USDT") || self.symbol.len() <= "-USDT".len() {
            return Err(BotError::Configuration(format!(
                "symbol must be in format XXX-USDT, got '{}'",
                self.symbol
            )));
        }
        if bar_for_minutes(self.candle_interval_minutes).is_none() {
            return Err(BotError::Configuration(format!(
                "no exchange candle bar for a {} minute interval",
                self.candle_interval_minutes
            )));
        }
        if self.candle_limit <= SLOW_WINDOW {
            return Err(BotError::Configuration(format!(
                "candle limit must exceed the {} candle warm-up, got {}",
                SLOW_WINDOW, self.candle_limit
            )));
        }
        Ok(())
    }

    pub fn strategy_config(&self) -> Result<StrategyConfig, BotError> {
        StrategyConfig::new(
            self.position_size_usd,
            self.leverage,
            self.tp_multiplier,
            self.sl_multiplier,
            self.candle_interval_minutes,
        )
    }
}

/// Exchange credentials from BLOFIN_API_KEY / BLOFIN_SECRET_KEY / BLOFIN_API_PASSPHRASE
pub fn credentials_from_env() -> Result<BlofinCredentials, BotError> {
    let var = |name: &str| {
        std::env::var(name)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| BotError::Configuration(format!("{} not found in environment", name)))
    };

    Ok(BlofinCredentials {
        api_key: var("BLOFIN_API_KEY")?,
        api_secret: var("BLOFIN_SECRET_KEY")?,
        passphrase: var("BLOFIN_API_PASSPHRASE")?,
    })
}
