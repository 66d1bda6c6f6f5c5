//! Slack Web API transport.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Outbound message transport. `deliver` abstracts over this so delivery
/// routing can be tested without a network.
#[async_trait::async_trait]
pub trait Poster: Send + Sync {
    /// Post `text` to `channel`. `Ok(false)` means the remote side rejected
    /// the message (already logged); `Err` is reserved for request plumbing.
    async fn post(&self, text: &str, channel: &str) -> Result<bool>;
}

pub struct SlackClient {
    client: Client,
    token: String,
}

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

impl SlackClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
        }
    }
}

#[async_trait::async_trait]
impl Poster for SlackClient {
    async fn post(&self, text: &str, channel: &str) -> Result<bool> {
        let response = self
            .client
            .post("https://slack.com/api/chat.postMessage")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json; charset=utf-8")
            .json(&PostMessageRequest { channel, text })
            .send()
            .await
            .context("Failed to call Slack chat.postMessage")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Slack API HTTP error ({status}): {body}");
            return Ok(false);
        }

        let body: PostMessageResponse = response
            .json()
            .await
            .context("Failed to parse Slack response")?;

        if body.ok {
            tracing::info!("Message posted successfully to channel {channel}");
            if let Some(ts) = body.ts {
                tracing::info!("Message timestamp: {ts}");
            }
            return Ok(true);
        }

        match body.error.as_deref() {
            Some("channel_not_found") => {
                tracing::error!(
                    "Slack API error: channel_not_found — check that the bot is added \
                     to the channel and the channel ID is correct"
                );
            }
            Some("not_authed") => {
                tracing::error!("Slack API error: not_authed — check that SLACK_BOT_TOKEN is valid");
            }
            Some(other) => {
                tracing::error!("Slack API error: {other}");
            }
            None => {
                tracing::error!("Slack API returned ok=false without an error code");
            }
        }
        Ok(false)
    }
}
