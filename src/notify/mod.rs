// Optional SMS side channel for trade alerts
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::models::Direction;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Best-effort message delivery. Failures are reported, never retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
}

/// Alert text for an executed signal
pub fn signal_message(
    symbol: &str,
    direction: Direction,
    price: f64,
    take_profit: Option<f64>,
    stop_loss: Option<f64>,
) -> String {
    let mut message = format!("Trading Signal: {} {} @ ${:.2}", direction, symbol, price);
    if let Some(tp) = take_profit {
        message.push_str(&format!("\nTake Profit: ${:.2}", tp));
    }
    if let Some(sl) = stop_loss {
        message.push_str(&format!("\nStop Loss: ${:.2}", sl));
    }
    message
}

/// SMS through the Twilio Messages API
#[derive(Clone)]
pub struct TwilioNotifier {
    client: Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
    to_number: String,
}

impl TwilioNotifier {
    pub fn new(
        account_sid: String,
        auth_token: String,
        from_number: String,
        to_number: String,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: TWILIO_API_BASE.to_string(),
            account_sid,
            auth_token,
            from_number,
            to_number,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Build from TWILIO_* / NOTIFICATION_PHONE_NUMBER; `None` if any is missing
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        match (
            var("TWILIO_ACCOUNT_SID"),
            var("TWILIO_AUTH_TOKEN"),
            var("TWILIO_PHONE_NUMBER"),
            var("NOTIFICATION_PHONE_NUMBER"),
        ) {
            (Some(sid), Some(token), Some(from), Some(to)) => {
                tracing::info!("SMS notifications enabled");
                Some(Self::new(sid, token, from, to))
            }
            _ => {
                tracing::warn!("SMS notifications disabled: missing configuration");
                None
            }
        }
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        let url = format!(
            "{}/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", self.to_number.as_str()),
                ("From", self.from_number.as_str()),
                ("Body", message),
            ])
            .send()
            .await
            .context("Failed to reach Twilio")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Twilio API error ({}): {}", status, body);
        }

        tracing::info!("SMS notification sent: {}", message);
        Ok(())
    }
}
