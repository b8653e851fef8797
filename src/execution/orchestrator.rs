use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::api::Exchange;
use crate::error::BotError;
use crate::execution::schedule::time_until_next_boundary;
use crate::indicators::{annotate, AnnotatedCandle, SLOW_WINDOW};
use crate::models::{Direction, MarginMode, OrderResult, TradeIntent};
use crate::notify::{signal_message, Notifier};
use crate::strategy::{
    compute_levels, compute_position_size, minimum_amount, Detection, SignalDetector,
    StrategyConfig,
};

pub const DEFAULT_CANDLE_LIMIT: usize = 300;
const NOTIFY_TIMEOUT_SECS: u64 = 10;

/// Result of one fetch-detect-execute cycle that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No order this cycle (idle, armed or waiting)
    NoTrade(Detection),
    Executed {
        intent: TradeIntent,
        order: OrderResult,
    },
}

/// Drives one symbol: waits for each candle boundary, runs the detector on
/// fresh candles and places a market order with TP/SL when a signal fires.
///
/// Owns the detector state; one orchestrator per symbol.
pub struct ExecutionOrchestrator<E: Exchange> {
    exchange: E,
    config: StrategyConfig,
    symbol: String,
    margin_mode: MarginMode,
    candle_limit: usize,
    detector: SignalDetector,
    notifier: Option<Arc<dyn Notifier>>,
    notify_timeout: Duration,
}

impl<E: Exchange> ExecutionOrchestrator<E> {
    pub fn new(exchange: E, config: StrategyConfig, symbol: &str) -> Result<Self, BotError> {
        config.validate()?;

        Ok(Self {
            detector: SignalDetector::new(config.candle_interval()),
            exchange,
            config,
            symbol: symbol.to_string(),
            margin_mode: MarginMode::default(),
            candle_limit: DEFAULT_CANDLE_LIMIT,
            notifier: None,
            notify_timeout: Duration::from_secs(NOTIFY_TIMEOUT_SECS),
        })
    }

    pub fn with_margin_mode(mut self, margin_mode: MarginMode) -> Self {
        self.margin_mode = margin_mode;
        self
    }

    pub fn with_candle_limit(mut self, candle_limit: usize) -> Self {
        self.candle_limit = candle_limit;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    pub fn detector(&self) -> &SignalDetector {
        &self.detector
    }

    /// Loop until `shutdown` flips to true (or its sender is dropped).
    ///
    /// Shutdown interrupts the sleep between cycles; a cycle that has
    /// started is always allowed to finish.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            symbol = %self.symbol,
            exchange = self.exchange.name(),
            "Starting trading loop"
        );
        tracing::info!("  Position size: ${}", self.config.position_size_usd);
        tracing::info!("  Leverage: {}x ({})", self.config.leverage, self.margin_mode.as_str());
        tracing::info!("  TP multiplier: {}", self.config.tp_multiplier);
        tracing::info!("  SL multiplier: {}", self.config.sl_multiplier);
        tracing::info!("  Candle interval: {} min", self.config.candle_interval_minutes);

        loop {
            if *shutdown.borrow() {
                break;
            }

            let wait = time_until_next_boundary(Utc::now(), self.config.candle_interval_minutes);
            tracing::info!("Waiting {:.1} seconds for next candle", wait.as_secs_f64());

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    // Sender gone counts as shutdown; otherwise re-check the flag at the top
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            match self.run_cycle().await {
                Ok(CycleOutcome::Executed { intent, order }) => {
                    tracing::info!(
                        order_id = %order.order_id,
                        direction = %intent.direction,
                        "Trade executed successfully at ${:.4}",
                        intent.entry_price
                    );
                }
                Ok(CycleOutcome::NoTrade(_)) => {}
                Err(e) => log_cycle_error(&e),
            }
        }

        tracing::info!(symbol = %self.symbol, "Trading loop stopped");
    }

    /// One fetch → detect → (maybe) execute pass
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, BotError> {
        let series = self.fetch_series().await?;
        let current_price = series.last().map(|row| row.candle.close).unwrap_or_default();

        if let Some(latest) = series.last() {
            tracing::info!(
                time = %latest.candle.timestamp,
                "Current price: ${:.4}",
                current_price
            );
        }

        match self.detector.detect(&series) {
            Detection::Fire(direction) => {
                let (intent, order) = self.execute(direction, current_price).await?;
                Ok(CycleOutcome::Executed { intent, order })
            }
            Detection::Expired(pending) => Err(BotError::StaleSignal {
                direction: pending.direction,
                armed_at: pending.armed_at,
                current: series
                    .last()
                    .map(|c| c.candle.timestamp)
                    .unwrap_or(pending.armed_at),
            }),
            other => Ok(CycleOutcome::NoTrade(other)),
        }
    }

    async fn fetch_series(&self) -> Result<Vec<AnnotatedCandle>, BotError> {
        let candles = self
            .exchange
            .fetch_recent_candles(
                &self.symbol,
                self.config.candle_interval_minutes,
                self.candle_limit,
            )
            .await?;

        let series = annotate(&candles);
        if series.is_empty() {
            return Err(BotError::InsufficientData {
                have: candles.len(),
                need: SLOW_WINDOW,
            });
        }

        tracing::debug!("Last 3 candles:");
        for row in series.iter().rev().take(3).rev() {
            tracing::debug!(
                "Time: {}, Close: ${:.4}, Upper: ${:.4}, Lower: ${:.4}",
                row.candle.timestamp.format("%Y-%m-%d %H:%M:%S"),
                row.candle.close,
                row.bands.upper,
                row.bands.lower
            );
        }

        Ok(series)
    }

    /// Re-read the latest bands, size the trade at the detection-time price and submit it
    async fn execute(
        &self,
        direction: Direction,
        entry_price: f64,
    ) -> Result<(TradeIntent, OrderResult), BotError> {
        let series = self.fetch_series().await?;
        let latest = series.last().ok_or(BotError::InsufficientData {
            have: 0,
            need: SLOW_WINDOW,
        })?;

        let levels = compute_levels(
            entry_price,
            &latest.bands,
            direction,
            self.config.tp_multiplier,
            self.config.sl_multiplier,
        );

        if levels.is_degenerate() {
            return Err(BotError::DegenerateBand {
                upper: latest.bands.upper,
                lower: latest.bands.lower,
            });
        }

        let size = compute_position_size(
            self.config.position_size_usd,
            self.config.leverage,
            entry_price,
            minimum_amount(&self.symbol),
        );

        let intent = TradeIntent {
            direction,
            entry_price,
            take_profit_price: levels.take_profit,
            stop_loss_price: levels.stop_loss,
            size,
            leverage: self.config.leverage,
        };

        tracing::info!("Placing {} order:", direction.side());
        tracing::info!("  Entry Price: ${:.4}", entry_price);
        tracing::info!("  Band Distance: ${:.4}", levels.band_width);
        tracing::info!("  Size: {}", size);
        tracing::info!("  Take Profit: ${:.4}", levels.take_profit);
        tracing::info!("  Stop Loss: ${:.4}", levels.stop_loss);

        // Leverage has to be in place before the order is accepted at that leverage
        self.exchange
            .set_leverage(&self.symbol, self.config.leverage, self.margin_mode)
            .await?;

        let order = self
            .exchange
            .place_market_order_with_tp_sl(&self.symbol, &intent, self.margin_mode)
            .await?;

        self.notify(&intent).await;

        Ok((intent, order))
    }

    async fn notify(&self, intent: &TradeIntent) {
        let Some(notifier) = &self.notifier else {
            return;
        };

        let message = signal_message(
            &self.symbol,
            intent.direction,
            intent.entry_price,
            Some(intent.take_profit_price),
            Some(intent.stop_loss_price),
        );

        match tokio::time::timeout(self.notify_timeout, notifier.send(&message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Failed to send notification: {:#}", e),
            Err(_) => tracing::warn!(
                "Notification timed out after {:?}, continuing",
                self.notify_timeout
            ),
        }
    }
}

/// One log entry per failure kind; none of these stop the loop
pub fn log_cycle_error(error: &BotError) {
    match error {
        BotError::InsufficientData { have, need } => {
            tracing::info!("Collecting data... ({}/{} candles needed)", have, need);
        }
        BotError::StaleSignal { .. } | BotError::DegenerateBand { .. } => {
            tracing::warn!("Signal not executed: {}", error);
        }
        BotError::Collaborator(e) => {
            tracing::error!("Exchange call failed, skipping cycle: {}", e);
        }
        BotError::Configuration(msg) => {
            tracing::error!("Configuration error: {}", msg);
        }
    }
}
