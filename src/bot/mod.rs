pub mod command;

use crate::bot::command::{parse_command, ParsedCommand};
use crate::gemini::{GeminiClient, Recommendation, RecommendError};
use crate::line::flex::{recommendation_carousel, CAROUSEL_ALT_TEXT};
use crate::line::{LineClient, ReplyMessage, WebhookEvent};
use anyhow::Result;
use std::sync::Arc;
use tracing::log::{debug, error, info, warn};

/// Guidance sent when the command has fewer than two tokens.
pub const GUIDANCE_TEXT: &str = "請輸入：地點 種類 價位\n例如：新竹 拉麵 300";

/// The model call succeeded but produced an empty list.
pub const NO_RESULTS_TEXT: &str = "AI 找不到相關資料，請換個關鍵字試試。";

/// The fetch itself failed (network, API error, malformed JSON).
pub const BUSY_TEXT: &str = "系統忙碌中，請稍後再試。";

/// No Gemini API key is configured, the recommendation path is disabled.
pub const UNAVAILABLE_TEXT: &str = "推薦功能目前未開放，請稍後再試。";

/// Per-event orchestration: parse the command, fetch recommendations,
/// render cards and dispatch exactly one reply. Stateless across events.
#[derive(Clone)]
pub struct BotManager {
    line: LineClient,
    gemini: Option<Arc<GeminiClient>>,
}
impl BotManager {
    pub fn new(line: LineClient, gemini: Option<GeminiClient>) -> Self {
        Self {
            line,
            gemini: gemini.map(Arc::new),
        }
    }

    /// Handles one webhook event through to its reply. Non-text and
    /// non-message events are acknowledged with a log line only.
    pub async fn handle_event(&self, event: WebhookEvent) -> Result<()> {
        let Some(text) = event.message_text() else {
            match event.event_type.as_str() {
                "follow" => info!("User {} followed the bot", event.user_id()),
                "unfollow" => info!("User {} blocked/unfollowed the bot", event.user_id()),
                "postback" => debug!("Ignoring postback event from {}", event.user_id()),
                other => debug!("Ignoring {other} event"),
            }
            return Ok(());
        };

        let Some(reply_token) = event.reply_token.as_deref() else {
            warn!("Text message event without a reply token, cannot respond");
            return Ok(());
        };

        info!("Message from {}: {text}", event.user_id());
        let reply = self.plan_reply(text).await;
        self.line.reply(reply_token, reply).await
    }

    async fn plan_reply(&self, text: &str) -> ReplyMessage {
        let query = match parse_command(text) {
            ParsedCommand::GuidanceNeeded => return ReplyMessage::text(GUIDANCE_TEXT),
            ParsedCommand::Query(query) => query,
        };

        // Fail closed: without an API key the query path stays disabled.
        let Some(gemini) = &self.gemini else {
            warn!("Recommendation query received but no Gemini API key is configured");
            return ReplyMessage::text(UNAVAILABLE_TEXT);
        };

        reply_for_outcome(gemini.recommend(&query).await)
    }
}

/// Maps the explicit fetch outcome onto the reply, keeping the empty-result
/// and failure cases distinct.
fn reply_for_outcome(
    outcome: Result<Vec<Recommendation>, RecommendError>,
) -> ReplyMessage {
    match outcome {
        Err(error) => {
            error!("Gemini fetch failed: {error}");
            ReplyMessage::text(BUSY_TEXT)
        }
        Ok(stores) if stores.is_empty() => ReplyMessage::text(NO_RESULTS_TEXT),
        Ok(stores) => ReplyMessage::Flex {
            alt_text: CAROUSEL_ALT_TEXT.to_string(),
            contents: recommendation_carousel(&stores),
        },
    }
}
