//! Alert delivery through the Telegram Bot API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::core::http::classify_send_error;
use crate::core::models::QuotaSnapshot;
use crate::error::{DqaError, Result};
use crate::storage::TelegramSettings;
use crate::util::{format_bytes, format_percent};

/// Destination for alert messages.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver `message` once. No retry.
    async fn dispatch(&self, message: &str) -> Result<()>;

    /// Where messages end up, for the console line.
    fn destination(&self) -> &str;
}

/// `None` means notifications are switched off; dispatching is an error.
#[async_trait]
impl<T: AlertSink> AlertSink for Option<T> {
    async fn dispatch(&self, message: &str) -> Result<()> {
        match self {
            Some(sink) => sink.dispatch(message).await,
            None => Err(DqaError::DispatchFailed(
                "no alert destination configured".to_string(),
            )),
        }
    }

    fn destination(&self) -> &str {
        self.as_ref().map_or("none", AlertSink::destination)
    }
}

/// Alert text for a snapshot.
#[must_use]
pub fn format_alert(snapshot: &QuotaSnapshot) -> String {
    format!(
        "\u{26a0}\u{fe0f} Google Drive storage is filling up!\nUsed: {}\n{} of {} ({} free)",
        format_percent(snapshot.used_percent()),
        format_bytes(snapshot.usage_bytes),
        format_bytes(snapshot.limit_bytes),
        format_bytes(snapshot.remaining_bytes()),
    )
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends `sendMessage` requests for one bot and chat.
#[derive(Debug, Clone)]
pub struct TelegramDispatcher {
    http: Client,
    api_base: Url,
    settings: TelegramSettings,
    timeout: Duration,
}

impl TelegramDispatcher {
    /// # Errors
    /// [`DqaError::ConfigInvalid`] if `api_base` is not a URL.
    pub fn new(
        http: Client,
        api_base: &str,
        settings: TelegramSettings,
        timeout: Duration,
    ) -> Result<Self> {
        let api_base = Url::parse(api_base).map_err(|e| DqaError::ConfigInvalid {
            key: "telegram.api_base".to_string(),
            value: api_base.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            http,
            api_base,
            settings,
            timeout,
        })
    }

    #[must_use]
    pub fn chat_id(&self) -> &str {
        &self.settings.chat_id
    }

    fn send_message_url(&self, text: &str) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| DqaError::Config("telegram.api_base cannot be a base URL".to_string()))?
            .pop_if_empty()
            .push(&format!("bot{}", self.settings.bot_token))
            .push("sendMessage");
        url.query_pairs_mut()
            .append_pair("chat_id", &self.settings.chat_id)
            .append_pair("text", text);
        Ok(url)
    }

    /// Strip the bot token from anything that ends up in an error or log.
    fn redact(&self, text: &str) -> String {
        text.replace(&self.settings.bot_token, "<redacted>")
    }
}

#[async_trait]
impl AlertSink for TelegramDispatcher {
    async fn dispatch(&self, message: &str) -> Result<()> {
        let url = self.send_message_url(message)?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| match classify_send_error(e, self.timeout) {
                DqaError::Timeout(secs) => {
                    DqaError::DispatchFailed(format!("request timed out after {secs}s"))
                }
                other => DqaError::DispatchFailed(self.redact(&other.to_string())),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DqaError::DispatchFailed(self.redact(&e.without_url().to_string())))?;
        let parsed = serde_json::from_str::<SendMessageResponse>(&body).ok();

        if !status.is_success() || parsed.as_ref().is_some_and(|r| !r.ok) {
            let reason = parsed
                .and_then(|r| r.description)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(DqaError::DispatchFailed(format!(
                "Telegram rejected the message: {}",
                self.redact(&reason)
            )));
        }

        tracing::debug!(chat_id = %self.settings.chat_id, "Telegram message delivered");
        Ok(())
    }

    fn destination(&self) -> &str {
        self.chat_id()
    }
}
