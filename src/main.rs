use anyhow::Context;
use bandbot::api::BlofinClient;
use bandbot::config::{credentials_from_env, AppConfig, ConfigOverrides};
use bandbot::execution::ExecutionOrchestrator;
use bandbot::models::MarginMode;
use bandbot::notify::TwilioNotifier;
use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Band breakout futures trading bot (EMA34 / SMA21)
#[derive(Debug, Parser)]
#[command(name = "bandbot", version, about)]
struct Cli {
    /// Config file (TOML/JSON); defaults to ./bandbot.* if present
    #[arg(long)]
    config: Option<String>,

    /// Trading pair symbol [default: BTC-USDT]
    #[arg(long)]
    symbol: Option<String>,

    /// Position size in USD [default: 100]
    #[arg(long)]
    size: Option<f64>,

    /// Trading leverage [default: 3]
    #[arg(long)]
    leverage: Option<u32>,

    /// Take profit multiplier of the band width [default: 2.0]
    #[arg(long = "tp-mult")]
    tp_mult: Option<f64>,

    /// Stop loss multiplier of the band width [default: 1.0]
    #[arg(long = "sl-mult")]
    sl_mult: Option<f64>,

    /// Candle interval in minutes [default: 5]
    #[arg(long)]
    interval: Option<u32>,

    /// Margin mode: isolated or cross [default: isolated]
    #[arg(long = "margin-mode")]
    margin_mode: Option<MarginMode>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            symbol: self.symbol.clone(),
            position_size_usd: self.size,
            leverage: self.leverage,
            tp_multiplier: self.tp_mult,
            sl_multiplier: self.sl_mult,
            candle_interval_minutes: self.interval,
            margin_mode: self.margin_mode,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();

    let app = AppConfig::load(&cli.overrides()).map_err(|e| {
        tracing::error!("{}", e);
        e
    })?;
    let strategy = app.strategy_config()?;
    let credentials = credentials_from_env().map_err(|e| {
        tracing::error!("{}", e);
        e
    })?;

    tracing::info!("Initializing trading bot for {}", app.symbol);

    let client = BlofinClient::new(&app.base_url, Some(credentials))
        .context("Failed to build Blofin client")?;

    let mut orchestrator = ExecutionOrchestrator::new(client, strategy, &app.symbol)?
        .with_margin_mode(app.margin_mode)
        .with_candle_limit(app.candle_limit);

    if let Some(notifier) = TwilioNotifier::from_env() {
        orchestrator = orchestrator.with_notifier(Arc::new(notifier));
    }

    tracing::info!("Trading bot initialized successfully");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut trading_task = tokio::spawn(orchestrator.run(shutdown_rx));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, stopping trading bot...");
        }
        result = &mut trading_task => {
            tracing::error!("Trading loop exited: {:?}", result);
            return Ok(());
        }
    }

    // Lets an in-flight cycle finish before the loop observes the flag
    shutdown_tx.send_replace(true);
    trading_task.await.context("Trading loop panicked")?;

    tracing::info!("Trading bot stopped");
    Ok(())
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bandbot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
