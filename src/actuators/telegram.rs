//! Telegram Bot API notifications

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use crate::config::Config;

const API_BASE: &str = "https://api.telegram.org";

/// Upper bound for one `sendMessage` call, connect included. Alarms are sent
/// while the watch list is locked, so a silent endpoint must not stall it.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client shared by all notifications
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
}

/// Delivers a message to every configured recipient, best effort
pub trait Notifier: Send + Sync {
    fn notify_recipients(&self, message: &str) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
    recipients: Vec<i64>,
}

impl TelegramNotifier {
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        token: Option<String>,
        recipients: Vec<i64>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            token,
            recipients,
        }
    }

    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        Self::new(
            client,
            API_BASE,
            config.telegram_token.clone(),
            config.recipients.clone(),
        )
    }

    async fn send(&self, token: &str, chat_id: i64, text: &str) -> Result<(), String> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let response = self
            .client
            .post(&url)
            .json(&SendMessage {
                chat_id,
                text,
                parse_mode: "HTML",
            })
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {}", e.without_url()))?;

        if !response.status().is_success() {
            return Err(format!("Telegram API returned status: {}", response.status()));
        }
        Ok(())
    }
}

impl Notifier for TelegramNotifier {
    async fn notify_recipients(&self, message: &str) {
        let Some(token) = self.token.as_deref() else {
            tracing::debug!("No telegram token configured, dropping notification");
            return;
        };
        if self.recipients.is_empty() {
            tracing::debug!("No recipients configured, dropping notification");
            return;
        }

        for &chat_id in &self.recipients {
            if let Err(e) = self.send(token, chat_id, message).await {
                tracing::warn!("Failed to notify {}: {}", chat_id, e);
            }
        }
    }
}
