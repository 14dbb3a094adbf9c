//! Telegram Bot API adapter.
//!
//! A thin, raw HTTP client over `reqwest`: the relay needs direct control of
//! the `getUpdates` cursor and of the retry schedule, so the Bot API is
//! spoken directly instead of through a bot framework. Implements the
//! `ideabot-core` ports.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use ideabot_core::{
    config::ApiConfig,
    domain::{ChatId, MessageId, UpdateId},
    errors::Error,
    ports::{MessagingPort, UpdateSource},
    update::{Update, UpdateBatch},
    Result,
};

/// Timeout for ordinary (non long-poll) calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra headroom on the HTTP timeout over the server-side long-poll wait.
const LONG_POLL_SLACK: Duration = Duration::from_secs(10);

/// 0-indexed attempt number, attached to every request.
const ATTEMPT_HEADER: &str = "x-relay-attempt";

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BotIdentity {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: String,
}

#[derive(Clone)]
pub struct TelegramApi {
    http: reqwest::Client,
    base: String,
    cfg: ApiConfig,
}

impl TelegramApi {
    pub fn new(token: &str, cfg: ApiConfig) -> Self {
        let http = reqwest::Client::builder()
            .build()
            .expect("reqwest client build");
        let base = format!("{}/bot{token}", cfg.base_url.trim_end_matches('/'));
        Self { http, base, cfg }
    }

    /// One Bot API method call with retry.
    ///
    /// A non-2xx status, a transport error, or an `ok: false` envelope all
    /// count as a failed attempt. Waits `backoff_base * 2^i` before retry
    /// `i`; the final failure is returned without sleeping first.
    pub async fn call(
        &self,
        method: &str,
        payload: &serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        let url = format!("{}/{method}", self.base);
        let retries = self.cfg.retries.max(1);
        let mut last_err: Option<Error> = None;

        for attempt in 0..retries {
            match self.attempt(method, &url, payload, timeout, attempt).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    eprintln!(
                        "[telegram] {method} attempt {}/{retries} error: {e}",
                        attempt + 1
                    );
                    last_err = Some(e);
                    if attempt + 1 < retries {
                        tokio::time::sleep(self.cfg.backoff_base * 2u32.saturating_pow(attempt)).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::api(method, "no attempts made")))
    }

    async fn attempt(
        &self,
        method: &str,
        url: &str,
        payload: &serde_json::Value,
        timeout: Duration,
        attempt: u32,
    ) -> Result<serde_json::Value> {
        let resp = self
            .http
            .post(url)
            .timeout(timeout)
            .header(ATTEMPT_HEADER, attempt.to_string())
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::api(method, format!("request error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::api(
                method,
                format!("HTTP {status}: {}", body.chars().take(200).collect::<String>()),
            ));
        }

        let envelope: ApiEnvelope = resp
            .json()
            .await
            .map_err(|e| Error::api(method, format!("bad response body: {e}")))?;

        if !envelope.ok {
            let code = envelope.error_code.unwrap_or_default();
            let desc = envelope
                .description
                .unwrap_or_else(|| "no description".to_string());
            return Err(Error::api(method, format!("not ok ({code}): {desc}")));
        }

        Ok(envelope.result)
    }

    /// Long-poll for the next batch of message updates.
    pub async fn get_updates(&self, offset: Option<UpdateId>) -> Result<UpdateBatch> {
        let mut payload = json!({
          "timeout": self.cfg.long_poll_timeout.as_secs(),
          "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            payload["offset"] = json!(offset.0);
        }
        let result = self
            .call(
                "getUpdates",
                &payload,
                self.cfg.long_poll_timeout + LONG_POLL_SLACK,
            )
            .await?;
        parse_update_batch(result)
    }

    /// Non-blocking page fetch, used by the issue bridge.
    pub async fn get_updates_page(
        &self,
        offset: Option<UpdateId>,
        limit: u32,
    ) -> Result<UpdateBatch> {
        let mut payload = json!({ "limit": limit });
        if let Some(offset) = offset {
            payload["offset"] = json!(offset.0);
        }
        let result = self.call("getUpdates", &payload, DEFAULT_TIMEOUT).await?;
        parse_update_batch(result)
    }

    pub async fn get_me(&self) -> Result<BotIdentity> {
        let result = self.call("getMe", &json!({}), DEFAULT_TIMEOUT).await?;
        serde_json::from_value(result).map_err(Error::from)
    }
}

/// Deserialize a `getUpdates` result and derive the follow-up cursor:
/// one past the highest `update_id`, or `None` for an empty batch.
fn parse_update_batch(result: serde_json::Value) -> Result<UpdateBatch> {
    let updates: Vec<Update> = serde_json::from_value(result)?;
    let next_offset = updates
        .iter()
        .map(|u| u.update_id)
        .max()
        .map(UpdateId::next);
    Ok(UpdateBatch {
        updates,
        next_offset,
    })
}

#[async_trait]
impl MessagingPort for TelegramApi {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.call(
            "sendMessage",
            &json!({
              "chat_id": chat_id.0,
              "text": text,
              "disable_web_page_preview": true,
            }),
            DEFAULT_TIMEOUT,
        )
        .await?;
        Ok(())
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<()> {
        self.call(
            "sendMessage",
            &json!({
              "chat_id": chat_id.0,
              "text": html,
              "parse_mode": "HTML",
              "disable_web_page_preview": true,
            }),
            DEFAULT_TIMEOUT,
        )
        .await?;
        Ok(())
    }

    async fn forward_message(
        &self,
        to: ChatId,
        from: ChatId,
        message_id: MessageId,
    ) -> Result<()> {
        self.call(
            "forwardMessage",
            &json!({
              "chat_id": to.0,
              "from_chat_id": from.0,
              "message_id": message_id.0,
            }),
            DEFAULT_TIMEOUT,
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl UpdateSource for TelegramApi {
    async fn fetch(&self, offset: Option<UpdateId>) -> Result<UpdateBatch> {
        self.get_updates(offset).await
    }
}
