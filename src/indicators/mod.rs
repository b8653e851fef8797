// Technical indicators module
// Moving averages and the EMA34/SMA21 band built from them

pub mod bands;
pub mod moving_average;

pub use bands::{annotate, AnnotatedCandle, BandSnapshot, FAST_SPAN, SLOW_WINDOW};
pub use moving_average::{calculate_sma, ema_series, sma_series};
