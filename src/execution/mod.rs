// Trading loop: candle-boundary scheduling and order execution
pub mod orchestrator;
pub mod schedule;

pub use orchestrator::{log_cycle_error, CycleOutcome, ExecutionOrchestrator};
pub use schedule::{next_boundary, time_until_next_boundary};
