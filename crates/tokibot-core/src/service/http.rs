use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{self, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::dedup::IdempotencyGuard;
use crate::dialog::{self, reply, Action};
use crate::error::{ProfileError, Result, WebhookError};
use crate::intent;
use crate::outbound::MessageSender;
use crate::profile::{ProfileGateway, ProfileOp};
use crate::session::store::SessionStore;
use crate::session::SenderLocks;
use crate::types::InboundMessage;
use crate::whatsapp;

/// Shared application state for the webhook service.
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<dyn SessionStore>,
    pub locks: SenderLocks,
    pub guard: IdempotencyGuard,
    pub profiles: Arc<ProfileGateway>,
    pub sender: Arc<dyn MessageSender>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Validate the provider's subscription handshake.
///
/// Returns the challenge to echo back, or the error class the receiver
/// maps to 400/403. Pure and stateless.
pub fn verify_challenge(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    expected_token: &str,
) -> std::result::Result<String, WebhookError> {
    let (Some(mode), Some(token)) = (mode, token) else {
        return Err(WebhookError::MalformedRequest);
    };
    if mode == "subscribe" && token == expected_token {
        Ok(challenge.unwrap_or_default().to_string())
    } else {
        Err(WebhookError::Auth)
    }
}

/// Create the axum Router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/webhook", get(handle_verify))
        .route("/webhook", post(handle_event))
        .route("/webhooks/kyc", post(handle_kyc_callback))
        .route("/webhooks/payment", post(handle_payment_callback))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([http::Method::GET, http::Method::POST])
                .allow_headers([http::header::CONTENT_TYPE]),
        )
        .with_state(state)
}

/// GET / — health check
async fn handle_root() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        timestamp: crate::util::timestamp(),
    })
}

/// GET /webhook — provider subscription handshake
async fn handle_verify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match verify_challenge(
        params.get("hub.mode").map(String::as_str),
        params.get("hub.verify_token").map(String::as_str),
        params.get("hub.challenge").map(String::as_str),
        &state.config.webhook.verify_token,
    ) {
        Ok(challenge) => {
            info!("Webhook verified successfully");
            (StatusCode::OK, challenge).into_response()
        }
        Err(WebhookError::Auth) => {
            warn!("Webhook verification failed: token mismatch");
            StatusCode::FORBIDDEN.into_response()
        }
        Err(WebhookError::MalformedRequest) => StatusCode::BAD_REQUEST.into_response(),
    }
}

/// POST /webhook — event ingestion
///
/// Acks the provider as soon as the event is claimed; the dispatch
/// pipeline runs in the background and its failures are confined to
/// logs. Malformed or message-less events ack as no-ops so the provider
/// does not retry them.
async fn handle_event(State(state): State<Arc<AppState>>, body: String) -> StatusCode {
    let event = match whatsapp::parse_webhook_event(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("Discarding unparseable webhook body: {}", e);
            return StatusCode::OK;
        }
    };

    let Some(inbound) = whatsapp::normalize(&event) else {
        debug!("Webhook event carries no message");
        return StatusCode::OK;
    };

    if !state.guard.claim(&inbound.provider_message_id) {
        info!(
            "Duplicate delivery of {}, ignoring",
            inbound.provider_message_id
        );
        return StatusCode::OK;
    }

    info!(
        "Message from {}: {:?}",
        inbound.sender_id, inbound.raw_text
    );

    tokio::spawn(async move {
        if let Err(e) = process_event(&state, inbound).await {
            // The ack is already out; all that remains is the log.
            error!("Dispatch pipeline failed: {}", e);
        }
    });

    StatusCode::OK
}

/// Run one claimed inbound message through the dispatch pipeline:
/// profile load, classification, transition, mutation (if asked for),
/// session save, reply.
pub async fn process_event(state: &AppState, msg: InboundMessage) -> Result<()> {
    let lock = state.locks.for_sender(&msg.sender_id);
    let _guard = lock.lock().await;

    let profile = match state.profiles.get_profile(&msg.sender_id).await {
        Ok(profile) => Some(profile),
        Err(ProfileError::NotFound) => None,
        Err(e) => {
            // Infrastructure failure, not an unregistered user.
            warn!("Account service unavailable for {}: {}", msg.sender_id, e);
            let fallback = reply::render(
                &Action::TryAgainLater,
                None,
                &msg.sender_id,
                &state.config.profile.registration_url,
            );
            state.sender.send(&fallback).await?;
            return Ok(());
        }
    };

    let session = state.sessions.load(&msg.sender_id);
    let intent = intent::classify(&msg.raw_text);
    let (next, action) =
        dialog::transition(&session, intent, &msg.raw_text, profile.as_ref());

    debug!(
        "Dispatch for {}: intent={:?} {:?} -> {:?}, action={:?}",
        msg.sender_id, intent, session.state, next.state, action
    );

    let (action, profile) = if action == Action::Activate {
        match state
            .profiles
            .mutate(&msg.sender_id, &ProfileOp::Activate)
            .await
        {
            Ok(updated) => (Action::Activated, Some(updated)),
            Err(e) => {
                warn!("Activation failed for {}: {}", msg.sender_id, e);
                (Action::TryAgainLater, profile)
            }
        }
    } else {
        (action, profile)
    };

    let outbound = reply::render(
        &action,
        profile.as_ref(),
        &msg.sender_id,
        &state.config.profile.registration_url,
    );

    state.sessions.save(&msg.sender_id, next);
    state.sender.send(&outbound).await?;
    Ok(())
}

// ====== Status Callbacks ======

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KycCallback {
    user_id: String,
    status: String,
}

/// POST /webhooks/kyc — KYC review callback
async fn handle_kyc_callback(
    State(state): State<Arc<AppState>>,
    Json(callback): Json<KycCallback>,
) -> StatusCode {
    info!(
        "KYC callback for {}: {}",
        callback.user_id, callback.status
    );

    if callback.status == "approved" {
        // The account service owns the flag; drop our stale copy.
        state.profiles.invalidate(&callback.user_id);
        let note = reply::kyc_approved(&callback.user_id);
        if let Err(e) = state.sender.send(&note).await {
            error!("Failed to notify {} of KYC approval: {}", callback.user_id, e);
        }
    }

    StatusCode::OK
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentCallback {
    user_id: String,
    #[allow(dead_code)]
    amount: Option<f64>,
    status: String,
}

/// POST /webhooks/payment — payment confirmation callback
async fn handle_payment_callback(
    State(state): State<Arc<AppState>>,
    Json(callback): Json<PaymentCallback>,
) -> StatusCode {
    info!(
        "Payment callback for {}: {}",
        callback.user_id, callback.status
    );

    if callback.status == "confirmed" {
        state.profiles.invalidate(&callback.user_id);
        let note = reply::payment_confirmed(&callback.user_id);
        if let Err(e) = state.sender.send(&note).await {
            error!(
                "Failed to notify {} of payment confirmation: {}",
                callback.user_id, e
            );
        }
    }

    StatusCode::OK
}

/// Serve the router until the process receives a shutdown signal.
pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received, draining...");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_challenge_ok() {
        let result = verify_challenge(Some("subscribe"), Some("secret"), Some("123"), "secret");
        assert_eq!(result.unwrap(), "123");
    }

    #[test]
    fn test_verify_challenge_token_mismatch() {
        let result = verify_challenge(Some("subscribe"), Some("wrong"), Some("123"), "secret");
        assert!(matches!(result, Err(WebhookError::Auth)));
    }

    #[test]
    fn test_verify_challenge_bad_mode() {
        let result = verify_challenge(Some("unsubscribe"), Some("secret"), Some("123"), "secret");
        assert!(matches!(result, Err(WebhookError::Auth)));
    }

    #[test]
    fn test_verify_challenge_missing_params() {
        assert!(matches!(
            verify_challenge(None, Some("secret"), Some("123"), "secret"),
            Err(WebhookError::MalformedRequest)
        ));
        assert!(matches!(
            verify_challenge(Some("subscribe"), None, Some("123"), "secret"),
            Err(WebhookError::MalformedRequest)
        ));
    }

    #[test]
    fn test_verify_challenge_missing_challenge_is_empty() {
        let result = verify_challenge(Some("subscribe"), Some("secret"), None, "secret");
        assert_eq!(result.unwrap(), "");
    }
}
