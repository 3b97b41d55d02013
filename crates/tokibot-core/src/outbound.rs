use async_trait::async_trait;

use crate::error::SendError;
use crate::types::{OutboundKind, OutboundMessage};
use crate::util::truncate_string;

/// Provider limit on quick-reply options per message.
pub const MAX_OPTIONS: usize = 3;

/// Provider limit on a quick-reply label, in bytes.
pub const MAX_LABEL_LEN: usize = 20;

/// Trait for outbound message transports.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Deliver one message. Transient failures are retried internally;
    /// a returned error is terminal for this message.
    async fn send(&self, msg: &OutboundMessage) -> Result<(), SendError>;
}

/// Enforce provider constraints on a message before it goes out.
///
/// Over-long labels are truncated; a button message with no options or
/// more than the provider allows is a validation error and is never
/// retried.
pub fn validate(msg: &OutboundMessage) -> Result<OutboundMessage, SendError> {
    let mut msg = msg.clone();
    if msg.kind == OutboundKind::Buttons {
        if msg.options.is_empty() {
            return Err(SendError::Validation(
                "buttons message with no options".to_string(),
            ));
        }
        if msg.options.len() > MAX_OPTIONS {
            return Err(SendError::Validation(format!(
                "{} options exceeds the provider limit of {}",
                msg.options.len(),
                MAX_OPTIONS
            )));
        }
        for option in &mut msg.options {
            option.label = truncate_string(&option.label, MAX_LABEL_LEN, "");
        }
    }
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ButtonOption;

    #[test]
    fn test_validate_truncates_long_labels() {
        let msg = OutboundMessage::buttons(
            "u1",
            "pick",
            vec![ButtonOption::new(
                "a",
                "this label is far too long for a button",
            )],
        );
        let out = validate(&msg).unwrap();
        assert!(out.options[0].label.len() <= MAX_LABEL_LEN);
    }

    #[test]
    fn test_validate_rejects_too_many_options() {
        let options = (0..4)
            .map(|i| ButtonOption::new(format!("o{i}"), format!("Option {i}")))
            .collect();
        let msg = OutboundMessage::buttons("u1", "pick", options);
        assert!(matches!(validate(&msg), Err(SendError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_empty_options() {
        let msg = OutboundMessage::buttons("u1", "pick", Vec::new());
        assert!(matches!(validate(&msg), Err(SendError::Validation(_))));
    }

    #[test]
    fn test_validate_passes_text_through() {
        let msg = OutboundMessage::text("u1", "hello");
        let out = validate(&msg).unwrap();
        assert_eq!(out, msg);
    }
}
