use serde::Deserialize;

/// Webhook delivery body. LINE batches events, though in practice a
/// delivery usually carries one.
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub destination: Option<String>,

    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub message: Option<MessageContent>,

    /// One-time handle authorizing exactly one reply to this event.
    #[serde(default, rename = "replyToken")]
    pub reply_token: Option<String>,

    #[serde(default)]
    pub source: Option<EventSource>,
}
impl WebhookEvent {
    /// The message text, present only for `message` events of kind `text`.
    pub fn message_text(&self) -> Option<&str> {
        if self.event_type != "message" {
            return None;
        }
        let message = self.message.as_ref()?;
        if message.kind != "text" {
            return None;
        }
        message.text.as_deref()
    }

    pub fn user_id(&self) -> &str {
        self.source
            .as_ref()
            .and_then(|source| source.user_id.as_deref())
            .unwrap_or("unknown")
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageContent {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventSource {
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
}
