pub mod blofin;
pub mod error;
pub mod exchange;

pub use blofin::{bar_for_minutes, BlofinClient, BlofinCredentials, BLOFIN_DEMO_API};
pub use error::ExchangeError;
pub use exchange::{Exchange, ExchangeResult};
