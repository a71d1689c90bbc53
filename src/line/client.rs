use crate::config::LineConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::log::debug;

/// The single reply a handled event produces: either plain fallback text or
/// a Flex carousel of cards.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyMessage {
    Text(String),
    Flex { alt_text: String, contents: Value },
}
impl ReplyMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    fn to_message_json(&self) -> Value {
        match self {
            Self::Text(text) => json!({ "type": "text", "text": text }),
            Self::Flex { alt_text, contents } => json!({
                "type": "flex",
                "altText": alt_text,
                "contents": contents,
            }),
        }
    }

    pub fn reply_payload(&self, reply_token: &str) -> Value {
        json!({
            "replyToken": reply_token,
            "messages": [self.to_message_json()],
        })
    }
}

/// Client for the LINE Messaging API reply endpoint.
#[derive(Clone)]
pub struct LineClient {
    http: Client,
    access_token: String,
    api_base: String,
}
impl LineClient {
    pub fn new(config: &LineConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            access_token: config.channel_access_token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Sends exactly one reply message. Reply tokens are one-time handles,
    /// so calling this twice for the same token is a caller error that the
    /// platform rejects.
    pub async fn reply(&self, reply_token: &str, message: ReplyMessage) -> Result<()> {
        debug!("Replying to token {reply_token}");

        self.http
            .post(format!("{}/v2/bot/message/reply", self.api_base))
            .bearer_auth(&self.access_token)
            .json(&message.reply_payload(reply_token))
            .send()
            .await
            .context("LINE reply request failed")?
            .error_for_status()
            .context("LINE reply was rejected")?;

        Ok(())
    }
}
