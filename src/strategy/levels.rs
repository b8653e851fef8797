use crate::indicators::BandSnapshot;
use crate::models::Direction;

/// Decimal places submitted to the exchange for prices and sizes
pub const PRICE_PRECISION: i32 = 8;
/// Decimal places a position size is truncated to before the minimum check
pub const SIZE_PRECISION: i32 = 4;

/// Minimum order size per symbol, in base units
const MIN_AMOUNTS: &[(&str, f64)] = &[("BTC-USDT", 0.1), ("ETH-USDT", 1.0)];
/// Fallback minimum for symbols not listed above
pub const DEFAULT_MIN_AMOUNT: f64 = 1.0;

/// Take-profit / stop-loss pair for one trade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    pub take_profit: f64,
    pub stop_loss: f64,
    pub band_width: f64,
}

impl Levels {
    /// TP and SL collapsed onto the entry price; such a trade must not be placed
    pub fn is_degenerate(&self) -> bool {
        self.take_profit == self.stop_loss
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// TP/SL at multiples of the band width away from the entry price
pub fn compute_levels(
    entry_price: f64,
    bands: &BandSnapshot,
    direction: Direction,
    tp_multiplier: f64,
    sl_multiplier: f64,
) -> Levels {
    let band_width = bands.width();
    let tp_distance = band_width * tp_multiplier;
    let sl_distance = band_width * sl_multiplier;

    let (take_profit, stop_loss) = match direction {
        Direction::Long => (entry_price + tp_distance, entry_price - sl_distance),
        Direction::Short => (entry_price - tp_distance, entry_price + sl_distance),
    };

    Levels {
        take_profit: round_to(take_profit, PRICE_PRECISION),
        stop_loss: round_to(stop_loss, PRICE_PRECISION),
        band_width,
    }
}

pub fn minimum_amount(symbol: &str) -> f64 {
    MIN_AMOUNTS
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, min)| *min)
        .unwrap_or(DEFAULT_MIN_AMOUNT)
}

/// Leveraged notional converted to base units, never below `min_units`
pub fn compute_position_size(usd_notional: f64, leverage: u32, price: f64, min_units: f64) -> f64 {
    let raw = (usd_notional * leverage as f64) / price;
    let size = round_to(raw, SIZE_PRECISION);

    if size < min_units {
        tracing::warn!(
            requested = size,
            minimum = min_units,
            "Adjusted position size to minimum required amount"
        );
        return round_to(min_units, PRICE_PRECISION);
    }

    round_to(size, PRICE_PRECISION)
}
