use bandbot::api::{BlofinClient, BlofinCredentials};
use bandbot::execution::{CycleOutcome, ExecutionOrchestrator};
use bandbot::indicators::annotate;
use bandbot::models::{Candle, Direction, MarginMode};
use bandbot::strategy::{Detection, StrategyConfig};
use bandbot::BotError;
use chrono::{Duration, TimeZone, Utc};
use mockito::Matcher;

const START_MS: i64 = 1_700_000_100_000;
const INTERVAL_MS: i64 = 5 * 60 * 1000;

/// Flat closes at 100 with one breakout close, as exchange rows (newest first)
fn candle_rows(count: usize, breakout_at: usize, breakout_close: f64) -> String {
    let rows: Vec<String> = (0..count)
        .rev()
        .map(|i| {
            let close = if i == breakout_at { breakout_close } else { 100.0 };
            format!(
                r#"["{}","{}","{}","{}","{}","500","1","1","1"]"#,
                START_MS + i as i64 * INTERVAL_MS,
                close,
                close,
                close,
                close
            )
        })
        .collect();

    format!(r#"{{"code":"0","msg":"success","data":[{}]}}"#, rows.join(","))
}

fn client(server: &mockito::ServerGuard) -> BlofinClient {
    BlofinClient::new(
        &server.url(),
        Some(BlofinCredentials {
            api_key: "k".to_string(),
            api_secret: "s".to_string(),
            passphrase: "p".to_string(),
        }),
    )
    .unwrap()
}

#[tokio::test]
async fn test_breakout_to_order() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut server = mockito::Server::new_async().await;
    let candles = server
        .mock("GET", "/api/v1/market/candles")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(candle_rows(42, 40, 110.0))
        .expect(3)
        .create_async()
        .await;
    let leverage = server
        .mock("POST", "/api/v1/account/set-leverage")
        .match_body(Matcher::PartialJsonString(
            r#"{"instId":"BTC-USDT","leverage":"5","marginMode":"cross"}"#.into(),
        ))
        .with_status(200)
        .with_body(r#"{"code":"0","msg":"","data":{}}"#)
        .expect(1)
        .create_async()
        .await;
    let order = server
        .mock("POST", "/api/v1/trade/order")
        .match_body(Matcher::PartialJsonString(
            r#"{"instId":"BTC-USDT","side":"buy","orderType":"market","size":"5"}"#.into(),
        ))
        .with_status(200)
        .with_body(r#"{"code":"0","msg":"","data":[{"orderId":"777","clientOrderId":"c1","code":"0","msg":""}]}"#)
        .expect(1)
        .create_async()
        .await;

    let config = StrategyConfig::new(100.0, 5, 2.0, 1.0, 5).unwrap();
    let mut orchestrator = ExecutionOrchestrator::new(client(&server), config, "BTC-USDT")
        .unwrap()
        .with_margin_mode(MarginMode::Cross);

    // Breakout candle closed: signal armed, nothing submitted
    let first = orchestrator.run_cycle().await.unwrap();
    let CycleOutcome::NoTrade(Detection::Armed(pending)) = first else {
        panic!("expected armed signal, got {:?}", first);
    };
    assert_eq!(pending.direction, Direction::Long);
    assert_eq!(
        pending.armed_at,
        Utc.timestamp_millis_opt(START_MS + 40 * INTERVAL_MS).unwrap()
    );

    // Latest candle is the one right after the breakout: execute
    let second = orchestrator.run_cycle().await.unwrap();
    let CycleOutcome::Executed { intent, order: result } = second else {
        panic!("expected execution, got {:?}", second);
    };

    assert_eq!(result.order_id, "777");
    assert_eq!(intent.entry_price, 100.0);
    // 100 USD * 5x / 100 = 5 BTC, above the 0.1 minimum
    assert_eq!(intent.size, 5.0);
    assert!(intent.take_profit_price > 100.0);
    assert!(intent.stop_loss_price < 100.0);
    assert!(
        ((intent.take_profit_price - 100.0) - 2.0 * (100.0 - intent.stop_loss_price)).abs() < 1e-7
    );

    candles.assert_async().await;
    leverage.assert_async().await;
    order.assert_async().await;
}

#[tokio::test]
async fn test_missed_window_places_nothing() {
    let mut server = mockito::Server::new_async().await;
    let order = server
        .mock("POST", "/api/v1/trade/order")
        .expect(0)
        .create_async()
        .await;

    let armed_body = candle_rows(42, 40, 90.0);
    let late_body = candle_rows(43, 40, 90.0);

    let first_fetch = server
        .mock("GET", "/api/v1/market/candles")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(armed_body)
        .create_async()
        .await;

    let mut orchestrator =
        ExecutionOrchestrator::new(client(&server), StrategyConfig::default(), "BTC-USDT").unwrap();

    let first = orchestrator.run_cycle().await.unwrap();
    assert!(matches!(first, CycleOutcome::NoTrade(Detection::Armed(_))));
    first_fetch.remove_async().await;

    server
        .mock("GET", "/api/v1/market/candles")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(late_body)
        .create_async()
        .await;

    let err = orchestrator.run_cycle().await.unwrap_err();
    assert!(matches!(
        err,
        BotError::StaleSignal { direction: Direction::Short, .. }
    ));
    assert!(orchestrator.detector().pending().is_none());
    order.assert_async().await;
}

#[test]
fn test_band_scenario_from_raw_candles() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let raw: Vec<Candle> = (0..30)
        .map(|i| Candle {
            timestamp: start + Duration::minutes(5 * i),
            open: 100.0,
            high: 100.0,
            low: 100.0,
            close: 100.0,
            volume: 1.0,
        })
        .collect();

    let series = annotate(&raw);
    assert_eq!(series.len(), 10);
    for row in &series {
        assert!((row.bands.upper - 100.0).abs() < 1e-9);
        assert!((row.bands.lower - 100.0).abs() < 1e-9);
    }
    assert!(annotate(&raw[..20]).is_empty());
}
