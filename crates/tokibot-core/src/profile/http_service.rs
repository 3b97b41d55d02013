use async_trait::async_trait;
use tracing::debug;

use super::{AccountService, ProfileOp};
use crate::error::ProfileError;
use crate::types::UserProfile;
use crate::util::http::client;

/// Account service client over HTTP.
///
/// `GET {base}/accounts/{id}` reads state; `POST {base}/accounts/{id}/{op}`
/// applies a mutation. 404 means the user has no account; transport
/// failures and 5xx are `Unreachable`, never conflated with `NotFound`.
pub struct HttpAccountService {
    base_url: String,
}

impl HttpAccountService {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    fn account_url(&self, sender_id: &str) -> String {
        format!("{}/accounts/{}", self.base_url, sender_id)
    }

    async fn classify_response(
        response: reqwest::Response,
    ) -> Result<UserProfile, ProfileError> {
        let status = response.status();
        if status.as_u16() == 404 {
            return Err(ProfileError::NotFound);
        }
        if status.is_server_error() {
            return Err(ProfileError::Unreachable(format!(
                "account service returned {status}"
            )));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProfileError::Api {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<UserProfile>()
            .await
            .map_err(|e| ProfileError::Api {
                status: status.as_u16(),
                message: format!("invalid profile body: {e}"),
            })
    }
}

#[async_trait]
impl AccountService for HttpAccountService {
    async fn fetch(&self, sender_id: &str) -> Result<UserProfile, ProfileError> {
        let url = self.account_url(sender_id);
        debug!("Fetching profile from {}", url);

        let response = client()
            .get(&url)
            .send()
            .await
            .map_err(|e| ProfileError::Unreachable(e.to_string()))?;
        Self::classify_response(response).await
    }

    async fn mutate(&self, sender_id: &str, op: &ProfileOp) -> Result<UserProfile, ProfileError> {
        let url = format!("{}/{}", self.account_url(sender_id), op.endpoint());
        debug!("Mutating profile via {}", url);

        let response = client()
            .post(&url)
            .json(op)
            .send()
            .await
            .map_err(|e| ProfileError::Unreachable(e.to_string()))?;
        Self::classify_response(response).await
    }
}
