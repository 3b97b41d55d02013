use std::path::PathBuf;

/// Core error types for tokibot.
#[derive(Debug, thiserror::Error)]
pub enum TokibotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    #[error("Account service error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Send error: {0}")]
    Send(#[from] SendError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures on the webhook verification path. Mapped to HTTP statuses
/// by the receiver: `MalformedRequest` -> 400, `Auth` -> 403.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Missing hub.mode or hub.verify_token")]
    MalformedRequest,

    #[error("Verify token mismatch")]
    Auth,
}

/// Failures when talking to the external account service. `NotFound`
/// means the user has no account; `Unreachable` means the service could
/// not answer. Callers must never treat one as the other.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Account not found")]
    NotFound,

    #[error("Account service unreachable: {0}")]
    Unreachable(String),

    #[error("Account service error ({status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Invalid outbound message: {0}")]
    Validation(String),

    #[error("Send attempts exhausted after {0} tries")]
    Exhausted(u32),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, TokibotError>;
