use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::Config;
use crate::dedup::IdempotencyGuard;
use crate::outbound::MessageSender;
use crate::profile::http_service::HttpAccountService;
use crate::profile::{AccountService, ProfileGateway};
use crate::service::http::{self, AppState};
use crate::session::memory::MemorySessionStore;
use crate::session::store::SessionStore;
use crate::session::SenderLocks;
use crate::whatsapp::WhatsAppSender;

/// Build the application state from config and run the webhook service
/// until shutdown.
pub async fn run_gateway(config: Config) -> anyhow::Result<()> {
    if config.webhook.verify_token.is_empty() {
        warn!("No verify token configured; GET /webhook will reject all challenges");
    }
    if config.whatsapp.access_token.is_empty() {
        warn!("No WhatsApp access token configured; outbound sends will fail");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(
        Duration::from_secs(config.session.idle_ttl_secs),
    ));
    let account_service: Arc<dyn AccountService> =
        Arc::new(HttpAccountService::new(config.profile.base_url.clone()));
    let profiles = Arc::new(ProfileGateway::new(
        account_service,
        Duration::from_secs(config.profile.cache_ttl_secs),
    ));
    let sender: Arc<dyn MessageSender> = Arc::new(WhatsAppSender::new(
        config.whatsapp.clone(),
        config.sender.clone(),
    ));
    let guard = IdempotencyGuard::new(Duration::from_secs(config.dedup.retention_secs));

    let state = Arc::new(AppState {
        config,
        sessions,
        locks: SenderLocks::new(),
        guard,
        profiles,
        sender,
    });

    info!("tokibot gateway started");
    http::serve(&addr, state).await
}
