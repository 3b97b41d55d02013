use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How an inbound message was entered on the user's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Button,
    List,
}

/// A normalized inbound conversational event.
///
/// `provider_message_id` is the deduplication key: the provider may
/// redeliver the same logical event under the same id.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub sender_id: String,
    pub provider_message_id: String,
    pub kind: MessageKind,
    pub raw_text: String,
    pub selected_option_id: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(
        sender_id: impl Into<String>,
        provider_message_id: impl Into<String>,
        kind: MessageKind,
        raw_text: impl Into<String>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            provider_message_id: provider_message_id.into(),
            kind,
            raw_text: raw_text.into(),
            selected_option_id: None,
            received_at: Utc::now(),
        }
    }

    pub fn with_option_id(mut self, option_id: impl Into<String>) -> Self {
        self.selected_option_id = Some(option_id.into());
        self
    }
}

/// Payload shape of an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundKind {
    Text,
    Buttons,
    Template,
}

/// A single quick-reply option attached to a buttons message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonOption {
    pub id: String,
    pub label: String,
}

impl ButtonOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Message to send back through the provider.
///
/// For `Template` messages, `content` carries the template name.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub recipient_id: String,
    pub kind: OutboundKind,
    pub content: String,
    pub options: Vec<ButtonOption>,
}

impl OutboundMessage {
    pub fn text(recipient_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            kind: OutboundKind::Text,
            content: content.into(),
            options: Vec::new(),
        }
    }

    pub fn buttons(
        recipient_id: impl Into<String>,
        content: impl Into<String>,
        options: Vec<ButtonOption>,
    ) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            kind: OutboundKind::Buttons,
            content: content.into(),
            options,
        }
    }

    pub fn template(recipient_id: impl Into<String>, template_name: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            kind: OutboundKind::Template,
            content: template_name.into(),
            options: Vec::new(),
        }
    }
}

/// Account state as reported by the external account service.
///
/// Externally owned; the gateway caches it with a short TTL and
/// invalidates after every mutating call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub registered: bool,
    pub kyc_basic_completed: bool,
    pub funding_completed: bool,
    pub balance: f64,
    pub daily_limit: f64,
    pub daily_limit_used: f64,
    pub card_issued: bool,
}
