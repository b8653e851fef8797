use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use super::exchange::{Exchange, ExchangeResult};
use super::ExchangeError;
use crate::models::{Candle, MarginMode, OrderResult, TradeIntent};

// Blofin futures REST API
// Docs: https://docs.blofin.com/index.html
pub const BLOFIN_DEMO_API: &str = "https://demo-trading-openapi.blofin.com";
const RATE_LIMIT_RPS: u32 = 10;
const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 30;

type HmacSha256 = Hmac<Sha256>;

type BlofinRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Exchange bar name for a candle interval in minutes
pub fn bar_for_minutes(minutes: u32) -> Option<&'static str> {
    match minutes {
        1 => Some("1m"),
        3 => Some("3m"),
        5 => Some("5m"),
        15 => Some("15m"),
        30 => Some("30m"),
        60 => Some("1H"),
        120 => Some("2H"),
        240 => Some("4H"),
        360 => Some("6H"),
        480 => Some("8H"),
        720 => Some("12H"),
        1440 => Some("1D"),
        _ => None,
    }
}

#[derive(Clone)]
pub struct BlofinCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
}

impl std::fmt::Debug for BlofinCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlofinCredentials")
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

// ============== Response Types ==============

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: Value, // "0" on success; some endpoints send a number
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderAck {
    order_id: Option<String>,
    client_order_id: Option<String>,
    code: Option<String>,
    msg: Option<String>,
}

fn code_str(code: &Value) -> String {
    match code {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============== Implementation ==============

/// Blofin REST client with request signing, rate limiting and retries
#[derive(Clone)]
pub struct BlofinClient {
    client: Client,
    base_url: String,
    credentials: Option<BlofinCredentials>,
    rate_limiter: Arc<BlofinRateLimiter>,
    retry_backoff: Duration,
}

impl BlofinClient {
    pub fn new(base_url: &str, credentials: Option<BlofinCredentials>) -> ExchangeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let quota = Quota::per_second(NonZeroU32::new(RATE_LIMIT_RPS).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            retry_backoff: Duration::from_secs(1),
        })
    }

    /// Base delay before the first retry; doubles on each further attempt
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    fn timestamp_ms() -> String {
        Utc::now().timestamp_millis().to_string()
    }

    /// base64(hex(HMAC-SHA256(path + METHOD + timestamp + nonce + body)))
    fn sign(
        secret: &str,
        request_path: &str,
        method: &Method,
        timestamp: &str,
        nonce: &str,
        body: &str,
    ) -> ExchangeResult<String> {
        let prehash = format!("{}{}{}{}{}", request_path, method.as_str(), timestamp, nonce, body);
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ExchangeError::Auth(e.to_string()))?;
        mac.update(prehash.as_bytes());
        let hex_signature = hex::encode(mac.finalize().into_bytes());
        Ok(BASE64.encode(hex_signature))
    }

    fn build_request(
        &self,
        method: &Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        signed: bool,
    ) -> ExchangeResult<reqwest::RequestBuilder> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method.clone(), &url);

        if !query.is_empty() {
            request = request.query(query);
        }

        let body_str = match body {
            Some(body) => serde_json::to_string(body)?,
            None => String::new(),
        };

        if signed {
            let creds = self
                .credentials
                .as_ref()
                .ok_or_else(|| ExchangeError::Auth("API credentials not configured".into()))?;

            let request_path = if query.is_empty() {
                path.to_string()
            } else {
                let qs = query
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("&");
                format!("{}?{}", path, qs)
            };

            let timestamp = Self::timestamp_ms();
            let nonce = uuid::Uuid::new_v4().to_string();
            let signature = Self::sign(
                &creds.api_secret,
                &request_path,
                method,
                &timestamp,
                &nonce,
                &body_str,
            )?;

            request = request
                .header("ACCESS-KEY", &creds.api_key)
                .header("ACCESS-SIGN", signature)
                .header("ACCESS-TIMESTAMP", timestamp)
                .header("ACCESS-NONCE", nonce)
                .header("ACCESS-PASSPHRASE", &creds.passphrase);
        }

        if body.is_some() {
            request = request
                .header("Content-Type", "application/json")
                .body(body_str);
        }

        Ok(request)
    }

    /// Rate-limited request with retry on 429, 5xx and transport errors.
    ///
    /// Non-idempotent requests (order placement) are only retried on 429,
    /// where the exchange is known not to have acted on them.
    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        signed: bool,
        idempotent: bool,
    ) -> ExchangeResult<T> {
        let mut last_error = ExchangeError::Network("no attempt made".to_string());

        for attempt in 1..=MAX_RETRIES {
            self.rate_limiter.until_ready().await;

            tracing::debug!("{} {} (attempt {}/{})", method, path, attempt, MAX_RETRIES);
            let request = self.build_request(&method, path, query, body, signed)?;

            let error = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let text = response.text().await?;
                        return Self::parse_envelope(&text);
                    }

                    let text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    if status.as_u16() == 429 {
                        ExchangeError::RateLimited
                    } else {
                        ExchangeError::Http {
                            status: status.as_u16(),
                            body: text,
                        }
                    }
                }
                Err(e) => ExchangeError::from(e),
            };

            let retry = matches!(error, ExchangeError::RateLimited)
                || (idempotent && error.is_retryable());
            if !retry || attempt == MAX_RETRIES {
                return Err(error);
            }

            let backoff = self.retry_backoff * 2u32.pow(attempt - 1);
            tracing::warn!(
                "Blofin request {} failed: {}, retrying in {:?} (attempt {}/{})",
                path,
                error,
                backoff,
                attempt,
                MAX_RETRIES
            );
            tokio::time::sleep(backoff).await;
            last_error = error;
        }

        Err(last_error)
    }

    fn parse_envelope<T: DeserializeOwned>(text: &str) -> ExchangeResult<T> {
        let envelope: Envelope<T> = serde_json::from_str(text)?;
        let code = code_str(&envelope.code);

        if code != "0" {
            return Err(ExchangeError::Api {
                code,
                message: envelope.msg,
            });
        }

        envelope
            .data
            .ok_or_else(|| ExchangeError::Parse("response has no data field".to_string()))
    }

    fn parse_candle(row: &[String]) -> ExchangeResult<Candle> {
        if row.len() < 6 {
            return Err(ExchangeError::Parse(format!(
                "candle row has {} fields, expected at least 6",
                row.len()
            )));
        }

        let field = |i: usize| -> ExchangeResult<f64> {
            row[i]
                .parse::<f64>()
                .map_err(|e| ExchangeError::Parse(format!("candle field {} '{}': {}", i, row[i], e)))
        };

        let ts_ms: i64 = row[0]
            .parse()
            .map_err(|e| ExchangeError::Parse(format!("candle timestamp '{}': {}", row[0], e)))?;
        let timestamp: DateTime<Utc> = DateTime::from_timestamp_millis(ts_ms)
            .ok_or_else(|| ExchangeError::Parse(format!("candle timestamp {} out of range", ts_ms)))?;

        Ok(Candle {
            timestamp,
            open: field(1)?,
            high: field(2)?,
            low: field(3)?,
            close: field(4)?,
            volume: field(5)?,
        })
    }
}

#[async_trait]
impl Exchange for BlofinClient {
    fn name(&self) -> &str {
        "blofin"
    }

    /// Endpoint: GET /api/v1/market/candles?instId={symbol}&bar={bar}&limit={limit}
    async fn fetch_recent_candles(
        &self,
        symbol: &str,
        interval_minutes: u32,
        limit: usize,
    ) -> ExchangeResult<Vec<Candle>> {
        let bar = bar_for_minutes(interval_minutes).ok_or_else(|| {
            ExchangeError::Unsupported(format!("no candle bar for {} minutes", interval_minutes))
        })?;

        let rows: Vec<Vec<String>> = self
            .send(
                Method::GET,
                "/api/v1/market/candles",
                &[
                    ("instId", symbol.to_string()),
                    ("bar", bar.to_string()),
                    ("limit", limit.to_string()),
                ],
                None,
                false,
                true,
            )
            .await?;

        // Exchange returns newest first
        let mut candles = rows
            .iter()
            .map(|row| Self::parse_candle(row))
            .collect::<ExchangeResult<Vec<_>>>()?;
        candles.sort_by_key(|c| c.timestamp);

        tracing::debug!("Retrieved {} candles for {}", candles.len(), symbol);
        Ok(candles)
    }

    /// Endpoint: POST /api/v1/account/set-leverage
    async fn set_leverage(
        &self,
        symbol: &str,
        leverage: u32,
        margin_mode: MarginMode,
    ) -> ExchangeResult<()> {
        let body = json!({
            "instId": symbol,
            "leverage": leverage.to_string(),
            "marginMode": margin_mode.as_str(),
        });

        // Repeating it with the same value is a no-op, so it retries like a read
        let _: Value = self
            .send(
                Method::POST,
                "/api/v1/account/set-leverage",
                &[],
                Some(&body),
                true,
                true,
            )
            .await?;

        tracing::info!(symbol = %symbol, leverage, margin_mode = margin_mode.as_str(), "Leverage set");
        Ok(())
    }

    /// Endpoint: POST /api/v1/trade/order
    ///
    /// TP/SL order prices of -1 execute at market once triggered.
    async fn place_market_order_with_tp_sl(
        &self,
        symbol: &str,
        intent: &TradeIntent,
        margin_mode: MarginMode,
    ) -> ExchangeResult<OrderResult> {
        let client_order_id = uuid::Uuid::new_v4().simple().to_string();
        let body = json!({
            "instId": symbol,
            "marginMode": margin_mode.as_str(),
            "side": intent.direction.side(),
            "orderType": "market",
            "size": intent.size.to_string(),
            "tpTriggerPrice": intent.take_profit_price.to_string(),
            "tpOrderPrice": "-1",
            "slTriggerPrice": intent.stop_loss_price.to_string(),
            "slOrderPrice": "-1",
            "clientOrderId": client_order_id,
        });

        tracing::info!("Placing order with data: {}", body);

        let acks: Vec<OrderAck> = self
            .send(
                Method::POST,
                "/api/v1/trade/order",
                &[],
                Some(&body),
                true,
                false,
            )
            .await?;

        let ack = acks
            .into_iter()
            .next()
            .ok_or_else(|| ExchangeError::Parse("order response has no entries".to_string()))?;

        if let Some(code) = ack.code.as_deref() {
            if code != "0" {
                return Err(ExchangeError::Api {
                    code: code.to_string(),
                    message: ack.msg.unwrap_or_default(),
                });
            }
        }

        let order_id = ack
            .order_id
            .ok_or_else(|| ExchangeError::Parse("order response has no orderId".to_string()))?;

        Ok(OrderResult {
            order_id,
            client_order_id: ack.client_order_id.or(Some(client_order_id)),
        })
    }
}
