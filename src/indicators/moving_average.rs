/// Calculate Simple Moving Average (SMA) of the last `period` prices
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: f64 = prices.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// SMA at every index; `None` until `period` prices are available
pub fn sma_series(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    (0..prices.len())
        .map(|i| calculate_sma(&prices[..=i], period))
        .collect()
}

/// Exponential Moving Average (EMA) at every index.
///
/// Seeded with the first price (no SMA warm-up), so every index has a value:
/// `ema[i] = price[i] * k + ema[i-1] * (1 - k)` with `k = 2 / (span + 1)`.
pub fn ema_series(prices: &[f64], span: usize) -> Vec<f64> {
    let k = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(prices.len());

    let mut ema = match prices.first() {
        Some(&first) => first,
        None => return out,
    };

    for &price in prices {
        if !out.is_empty() {
            ema = price * k + ema * (1.0 - k);
        }
        out.push(ema);
    }

    out
}
