use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, warn};

use crate::config::{SenderConfig, WhatsAppConfig};
use crate::error::SendError;
use crate::outbound::{validate, MessageSender};
use crate::types::{InboundMessage, MessageKind, OutboundKind, OutboundMessage};
use crate::util::http::client;

// ====== WhatsApp Cloud API Webhook Types ======

/// Webhook event envelope.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    pub id: Option<String>,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    pub field: Option<String>,
    #[serde(default)]
    pub value: ChangeValue,
}

/// Payload of one change: at most one message per delivery in practice,
/// or a list of delivery-status updates we do not act on.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChangeValue {
    pub messages: Vec<WaMessage>,
    pub statuses: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct WaMessage {
    pub from: String,
    pub id: String,
    #[serde(rename = "type")]
    pub msg_type: Option<String>,
    pub text: Option<TextBody>,
    pub interactive: Option<Interactive>,
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct Interactive {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub button_reply: Option<InteractiveReply>,
    pub list_reply: Option<InteractiveReply>,
}

#[derive(Debug, Deserialize)]
pub struct InteractiveReply {
    pub id: String,
    pub title: String,
}

/// Parse a webhook event from the raw request body.
pub fn parse_webhook_event(body: &str) -> Result<WebhookEvent, serde_json::Error> {
    serde_json::from_str(body)
}

/// Extract the canonical inbound record from a webhook event.
///
/// Precedence: free-text body, then button reply, then list reply. Text
/// is trimmed and lowercased. Events carrying no message (delivery
/// status callbacks) normalize to `None`.
pub fn normalize(event: &WebhookEvent) -> Option<InboundMessage> {
    let message = event
        .entry
        .first()?
        .changes
        .first()?
        .value
        .messages
        .first()?;

    let fold = |s: &str| s.trim().to_lowercase();

    if let Some(text) = &message.text {
        return Some(InboundMessage::new(
            &message.from,
            &message.id,
            MessageKind::Text,
            fold(&text.body),
        ));
    }

    if let Some(interactive) = &message.interactive {
        if let Some(reply) = &interactive.button_reply {
            return Some(
                InboundMessage::new(&message.from, &message.id, MessageKind::Button, fold(&reply.title))
                    .with_option_id(&reply.id),
            );
        }
        if let Some(reply) = &interactive.list_reply {
            return Some(
                InboundMessage::new(&message.from, &message.id, MessageKind::List, fold(&reply.title))
                    .with_option_id(&reply.id),
            );
        }
    }

    debug!(
        "Ignoring inbound message of type {:?}",
        message.msg_type.as_deref()
    );
    None
}

// ====== Outbound Sender ======

/// Sends messages through the Cloud API `/messages` endpoint.
pub struct WhatsAppSender {
    config: WhatsAppConfig,
    retry: SenderConfig,
}

impl WhatsAppSender {
    pub fn new(config: WhatsAppConfig, retry: SenderConfig) -> Self {
        Self { config, retry }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}/messages",
            self.config.api_base, self.config.phone_number_id
        )
    }

    /// Build the Cloud API payload, discriminated by message kind.
    fn payload(msg: &OutboundMessage) -> serde_json::Value {
        match msg.kind {
            OutboundKind::Text => json!({
                "messaging_product": "whatsapp",
                "to": msg.recipient_id,
                "type": "text",
                "text": { "body": msg.content },
            }),
            OutboundKind::Buttons => {
                let buttons: Vec<serde_json::Value> = msg
                    .options
                    .iter()
                    .map(|o| {
                        json!({
                            "type": "reply",
                            "reply": { "id": o.id, "title": o.label },
                        })
                    })
                    .collect();
                json!({
                    "messaging_product": "whatsapp",
                    "to": msg.recipient_id,
                    "type": "interactive",
                    "interactive": {
                        "type": "button",
                        "body": { "text": msg.content },
                        "action": { "buttons": buttons },
                    },
                })
            }
            OutboundKind::Template => json!({
                "messaging_product": "whatsapp",
                "to": msg.recipient_id,
                "type": "template",
                "template": {
                    "name": msg.content,
                    "language": { "code": "en" },
                },
            }),
        }
    }
}

#[async_trait]
impl MessageSender for WhatsAppSender {
    async fn send(&self, msg: &OutboundMessage) -> Result<(), SendError> {
        let msg = validate(msg)?;

        if self.retry.typing_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.retry.typing_delay_ms))
                .await;
        }

        let url = self.endpoint();
        let payload = Self::payload(&msg);
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 0..max_attempts {
            let result = client()
                .post(&url)
                .header(
                    "Authorization",
                    format!("Bearer {}", self.config.access_token),
                )
                .json(&payload)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    debug!("Message sent to {}", msg.recipient_id);
                    return Ok(());
                }
                Ok(response)
                    if response.status().as_u16() == 429
                        || response.status().is_server_error() =>
                {
                    let status = response.status();
                    warn!(
                        "Send API returned {}, attempt {}/{}",
                        status,
                        attempt + 1,
                        max_attempts
                    );
                }
                Ok(response) => {
                    // Client-side rejection: retrying cannot help.
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    error!("Send API rejected message ({}): {}", status, body);
                    return Err(SendError::Validation(format!("{status}: {body}")));
                }
                Err(e) => {
                    warn!(
                        "Send attempt {}/{} failed: {}",
                        attempt + 1,
                        max_attempts,
                        e
                    );
                    if attempt + 1 == max_attempts {
                        return Err(SendError::Http(e));
                    }
                }
            }

            if attempt + 1 < max_attempts {
                let backoff = self.retry.backoff_ms << attempt;
                tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
            }
        }

        Err(SendError::Exhausted(max_attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ButtonOption;

    #[test]
    fn test_normalize_text_message() {
        let body = r#"{
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "100",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messages": [{
                            "from": "2348000000000",
                            "id": "wamid.abc",
                            "type": "text",
                            "text": { "body": "  Hello There " }
                        }]
                    }
                }]
            }]
        }"#;
        let event = parse_webhook_event(body).unwrap();
        let msg = normalize(&event).unwrap();
        assert_eq!(msg.sender_id, "2348000000000");
        assert_eq!(msg.provider_message_id, "wamid.abc");
        assert_eq!(msg.kind, MessageKind::Text);
        assert_eq!(msg.raw_text, "hello there");
        assert!(msg.selected_option_id.is_none());
    }

    #[test]
    fn test_normalize_button_reply() {
        let body = r#"{
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{
                            "from": "234800",
                            "id": "wamid.btn",
                            "type": "interactive",
                            "interactive": {
                                "type": "button_reply",
                                "button_reply": { "id": "help", "title": "Help" }
                            }
                        }]
                    }
                }]
            }]
        }"#;
        let event = parse_webhook_event(body).unwrap();
        let msg = normalize(&event).unwrap();
        assert_eq!(msg.kind, MessageKind::Button);
        assert_eq!(msg.raw_text, "help");
        assert_eq!(msg.selected_option_id.as_deref(), Some("help"));
    }

    #[test]
    fn test_normalize_list_reply() {
        let body = r#"{
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{
                            "from": "234800",
                            "id": "wamid.list",
                            "type": "interactive",
                            "interactive": {
                                "type": "list_reply",
                                "list_reply": { "id": "usdt", "title": "USDT" }
                            }
                        }]
                    }
                }]
            }]
        }"#;
        let event = parse_webhook_event(body).unwrap();
        let msg = normalize(&event).unwrap();
        assert_eq!(msg.kind, MessageKind::List);
        assert_eq!(msg.raw_text, "usdt");
    }

    #[test]
    fn test_normalize_text_beats_interactive() {
        let body = r#"{
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{
                            "from": "234800",
                            "id": "wamid.both",
                            "text": { "body": "typed text" },
                            "interactive": {
                                "button_reply": { "id": "x", "title": "Clicked" }
                            }
                        }]
                    }
                }]
            }]
        }"#;
        let event = parse_webhook_event(body).unwrap();
        let msg = normalize(&event).unwrap();
        assert_eq!(msg.raw_text, "typed text");
        assert_eq!(msg.kind, MessageKind::Text);
    }

    #[test]
    fn test_normalize_status_callback_is_none() {
        let body = r#"{
            "entry": [{
                "changes": [{
                    "value": {
                        "statuses": [{ "id": "wamid.abc", "status": "delivered" }]
                    }
                }]
            }]
        }"#;
        let event = parse_webhook_event(body).unwrap();
        assert!(normalize(&event).is_none());
    }

    #[test]
    fn test_normalize_empty_event_is_none() {
        let event = parse_webhook_event(r#"{"object": "whatsapp_business_account"}"#).unwrap();
        assert!(normalize(&event).is_none());
    }

    #[test]
    fn test_text_payload_shape() {
        let msg = OutboundMessage::text("234800", "hello");
        let payload = WhatsAppSender::payload(&msg);
        assert_eq!(payload["messaging_product"], "whatsapp");
        assert_eq!(payload["to"], "234800");
        assert_eq!(payload["type"], "text");
        assert_eq!(payload["text"]["body"], "hello");
    }

    #[test]
    fn test_buttons_payload_shape() {
        let msg = OutboundMessage::buttons(
            "234800",
            "pick one",
            vec![
                ButtonOption::new("sell", "Sell"),
                ButtonOption::new("rates", "Rates"),
            ],
        );
        let payload = WhatsAppSender::payload(&msg);
        assert_eq!(payload["type"], "interactive");
        assert_eq!(payload["interactive"]["type"], "button");
        let buttons = payload["interactive"]["action"]["buttons"]
            .as_array()
            .unwrap();
        assert_eq!(buttons.len(), 2);
        assert_eq!(buttons[0]["reply"]["id"], "sell");
    }

    #[test]
    fn test_template_payload_shape() {
        let msg = OutboundMessage::template("234800", "kyc_approved");
        let payload = WhatsAppSender::payload(&msg);
        assert_eq!(payload["type"], "template");
        assert_eq!(payload["template"]["name"], "kyc_approved");
    }

    #[test]
    fn test_endpoint_building() {
        let sender = WhatsAppSender::new(
            WhatsAppConfig {
                api_base: "https://graph.facebook.com/v21.0".into(),
                phone_number_id: "1098765".into(),
                access_token: "EAAB".into(),
            },
            SenderConfig::default(),
        );
        assert_eq!(
            sender.endpoint(),
            "https://graph.facebook.com/v21.0/1098765/messages"
        );
    }
}
