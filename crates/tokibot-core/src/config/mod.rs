use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Root configuration for tokibot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[derive(Default)]
pub struct Config {
    pub server: ServerConfig,
    pub webhook: WebhookConfig,
    pub whatsapp: WhatsAppConfig,
    pub profile: ProfileServiceConfig,
    pub session: SessionConfig,
    pub dedup: DedupConfig,
    pub sender: SenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Webhook verification settings (the GET challenge handshake).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[derive(Default)]
pub struct WebhookConfig {
    pub verify_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WhatsAppConfig {
    pub api_base: String,
    pub phone_number_id: String,
    pub access_token: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_base: "https://graph.facebook.com/v21.0".to_string(),
            phone_number_id: String::new(),
            access_token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileServiceConfig {
    pub base_url: String,
    pub cache_ttl_secs: u64,
    pub registration_url: String,
}

impl Default for ProfileServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            cache_ttl_secs: 60,
            registration_url: "https://app.tokicard.example/register".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    pub idle_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: 1800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DedupConfig {
    pub retention_secs: u64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            retention_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SenderConfig {
    pub max_attempts: u32,
    pub backoff_ms: u64,
    /// Optional delay before every send, replacing the typing indicator.
    /// Zero disables it.
    pub typing_delay_ms: u64,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 500,
            typing_delay_ms: 0,
        }
    }
}

/// Get the default configuration file path.
pub fn get_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tokibot")
        .join("config.json")
}

/// Get the tokibot data directory.
pub fn get_data_dir() -> PathBuf {
    let path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tokibot");
    std::fs::create_dir_all(&path).ok();
    path
}

/// Load configuration from file or create default.
pub fn load_config(config_path: Option<&Path>) -> Config {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(get_config_path);

    if path.exists() {
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Config>(&content) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to parse config from {}: {}", path.display(), e);
                    tracing::warn!("Using default configuration.");
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config from {}: {}", path.display(), e);
                tracing::warn!("Using default configuration.");
            }
        }
    }

    Config::default()
}

/// Load configuration from file, then apply environment overrides.
///
/// `TOKIBOT_CONFIG` may carry a full JSON config; individual variables
/// override single fields on top of whatever was loaded.
pub fn load_config_from_env(config_path: Option<&Path>) -> Config {
    let mut cfg = if let Ok(json) = std::env::var("TOKIBOT_CONFIG") {
        match serde_json::from_str::<Config>(&json) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Failed to parse TOKIBOT_CONFIG: {}", e);
                load_config(config_path)
            }
        }
    } else {
        load_config(config_path)
    };

    if let Ok(v) = std::env::var("PORT") {
        if let Ok(port) = v.parse() {
            cfg.server.port = port;
        }
    }
    if let Ok(v) = std::env::var("WHATSAPP_VERIFY_TOKEN") {
        cfg.webhook.verify_token = v;
    }
    if let Ok(v) = std::env::var("WHATSAPP_ACCESS_TOKEN") {
        cfg.whatsapp.access_token = v;
    }
    if let Ok(v) = std::env::var("WHATSAPP_PHONE_ID") {
        cfg.whatsapp.phone_number_id = v;
    }
    if let Ok(v) = std::env::var("WHATSAPP_API_BASE") {
        cfg.whatsapp.api_base = v;
    }
    if let Ok(v) = std::env::var("PROFILE_SERVICE_URL") {
        cfg.profile.base_url = v;
    }

    cfg
}

/// Save configuration to file.
pub fn save_config(config: &Config, config_path: Option<&Path>) -> std::result::Result<(), ConfigError> {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(get_config_path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    }

    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    Ok(())
}
