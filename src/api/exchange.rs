use async_trait::async_trait;

use super::ExchangeError;
use crate::models::{Candle, MarginMode, OrderResult, TradeIntent};

pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// The exchange operations the trading loop depends on
#[async_trait]
pub trait Exchange: Send + Sync {
    fn name(&self) -> &str;

    /// Most recent candles, ascending by timestamp
    async fn fetch_recent_candles(
        &self,
        symbol: &str,
        interval_minutes: u32,
        limit: usize,
    ) -> ExchangeResult<Vec<Candle>>;

    async fn set_leverage(
        &self,
        symbol: &str,
        leverage: u32,
        margin_mode: MarginMode,
    ) -> ExchangeResult<()>;

    /// Single market order with TP/SL trigger prices attached
    async fn place_market_order_with_tp_sl(
        &self,
        symbol: &str,
        intent: &TradeIntent,
        margin_mode: MarginMode,
    ) -> ExchangeResult<OrderResult>;
}
