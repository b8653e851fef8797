// Band breakout strategy: parameters, signal state machine, TP/SL and sizing
pub mod config;
pub mod levels;
pub mod signals;

pub use config::StrategyConfig;
pub use levels::{compute_levels, compute_position_size, minimum_amount, Levels};
pub use signals::{Detection, PendingSignal, SignalDetector};
