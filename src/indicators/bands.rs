use super::moving_average::{ema_series, sma_series};
use crate::models::Candle;

/// EMA span for the fast line
pub const FAST_SPAN: usize = 34;
/// SMA window for the slow line; also the warm-up length of the series
pub const SLOW_WINDOW: usize = 21;

/// Two moving averages and the band they form at one candle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandSnapshot {
    pub fast_avg: f64, // EMA 34
    pub slow_avg: f64, // SMA 21
    pub upper: f64,
    pub lower: f64,
}

impl BandSnapshot {
    pub fn new(fast_avg: f64, slow_avg: f64) -> Self {
        Self {
            fast_avg,
            slow_avg,
            upper: fast_avg.max(slow_avg),
            lower: fast_avg.min(slow_avg),
        }
    }

    /// Distance between the band edges, never negative
    pub fn width(&self) -> f64 {
        (self.upper - self.lower).max(0.0)
    }
}

/// A candle paired with the band computed at that candle
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedCandle {
    pub candle: Candle,
    pub bands: BandSnapshot,
}

/// Annotate a candle series with EMA34/SMA21 bands.
///
/// The EMA runs over the full series; candles before the SMA warm-up
/// (the first `SLOW_WINDOW - 1`) are dropped afterwards. A series shorter
/// than `SLOW_WINDOW` yields an empty result, which callers treat as
/// "not enough data yet".
pub fn annotate(candles: &[Candle]) -> Vec<AnnotatedCandle> {
    if candles.len() < SLOW_WINDOW {
        return Vec::new();
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let fast = ema_series(&closes, FAST_SPAN);
    let slow = sma_series(&closes, SLOW_WINDOW);

    candles
        .iter()
        .zip(fast)
        .zip(slow)
        .filter_map(|((candle, fast_avg), slow_avg)| {
            slow_avg.map(|slow_avg| AnnotatedCandle {
                candle: candle.clone(),
                bands: BandSnapshot::new(fast_avg, slow_avg),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: start + Duration::minutes(5 * i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn test_short_series_is_empty() {
        for n in 0..SLOW_WINDOW {
            let candles = candles_from_closes(&vec![100.0; n]);
            assert!(annotate(&candles).is_empty(), "n = {}", n);
        }
    }

    #[test]
    fn test_drops_warm_up_and_keeps_alignment() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let candles = candles_from_closes(&closes);
        let annotated = annotate(&candles);

        assert_eq!(annotated.len(), 30 - (SLOW_WINDOW - 1));
        assert_eq!(annotated[0].candle, candles[SLOW_WINDOW - 1]);
        assert_eq!(annotated.last().unwrap().candle, candles[29]);

        // SMA of closes 100..=120
        assert!((annotated[0].bands.slow_avg - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_close_converges() {
        let candles = candles_from_closes(&vec![250.0; 60]);
        for row in annotate(&candles) {
            assert!((row.bands.fast_avg - 250.0).abs() < 1e-9);
            assert!((row.bands.slow_avg - 250.0).abs() < 1e-9);
            assert!(row.bands.width() < 1e-9);
        }
    }

    #[test]
    fn test_band_edges_ordered() {
        let closes: Vec<f64> = (0..50)
            .map(|i| 100.0 + ((i as f64) * 0.7).sin() * 5.0)
            .collect();
        for row in annotate(&candles_from_closes(&closes)) {
            assert!(row.bands.upper >= row.bands.lower);
            assert_eq!(row.bands.upper, row.bands.fast_avg.max(row.bands.slow_avg));
            assert_eq!(row.bands.lower, row.bands.fast_avg.min(row.bands.slow_avg));
        }
    }

    #[test]
    fn test_rising_series_fast_above_slow() {
        // EMA34 lags more than SMA21 on a steady climb
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let last = annotate(&candles_from_closes(&closes)).pop().unwrap();
        assert!(last.bands.slow_avg > last.bands.fast_avg);
        assert_eq!(last.bands.upper, last.bands.slow_avg);
    }
}
