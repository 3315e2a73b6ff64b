//! Refresh-on-401 stage
//!
//! A 401 on a first attempt triggers one call to the refresh endpoint. On
//! success the new token is persisted, the captured request is resent once
//! with it, and whatever comes back is final. On failure the stored token is
//! cleared, the navigator sends the user to login, and the call fails with
//! [`ClientError::Auth`].

use async_trait::async_trait;
use http::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::attempt::{Attempt, Method, PendingRequest};
use super::error::ClientError;
use super::navigate::Navigator;
use super::store::{AccessToken, CredentialStore};
use super::transport::{ApiResponse, RequestHandler};

/// Body returned by the refresh endpoint
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(rename = "accessToken", default)]
    access_token: Option<String>,
}

/// Retries a request once after refreshing the access token
pub struct WithRefresh<H> {
    inner: H,
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    refresh_path: String,
    /// Present when concurrent refreshes are collapsed into one
    refresh_gate: Option<Mutex<()>>,
}

/// Wrap `inner` with the retry-once refresh policy.
///
/// `inner` also carries the refresh call, so it should not itself be a
/// [`WithRefresh`].
pub fn with_refresh<H: RequestHandler>(
    inner: H,
    store: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    refresh_path: impl Into<String>,
    share_refresh: bool,
) -> WithRefresh<H> {
    WithRefresh {
        inner,
        store,
        navigator,
        refresh_path: refresh_path.into(),
        refresh_gate: share_refresh.then(|| Mutex::new(())),
    }
}

impl<H: RequestHandler> WithRefresh<H> {
    pub const fn inner(&self) -> &H {
        &self.inner
    }

    /// Exchange the session for a new access token
    async fn refresh(&self) -> Result<AccessToken, ClientError> {
        let request = PendingRequest::new(Method::Post, self.refresh_path.clone())
            .with_json(&serde_json::json!({}))?;

        let response = self
            .inner
            .call(Attempt::refresh(request))
            .await
            .map_err(|e| ClientError::Auth(format!("refresh request failed: {e}")))?;

        if !response.is_success() {
            return Err(ClientError::Auth(format!(
                "refresh rejected with status {}",
                response.status().as_u16()
            )));
        }

        let body: RefreshResponse = response
            .json()
            .map_err(|e| ClientError::Auth(format!("invalid refresh response: {e}")))?;

        body.access_token
            .filter(|token| !token.is_empty())
            .map(AccessToken::new)
            .ok_or_else(|| ClientError::Auth("refresh response carried no access token".into()))
    }

    /// Refresh, then persist the token or tear the session down.
    ///
    /// A token that cannot be persisted counts as a failed refresh.
    async fn refresh_and_persist(&self) -> Result<AccessToken, ClientError> {
        match self.refresh_then_store().await {
            Ok(token) => {
                info!("Access token refreshed");
                Ok(token)
            }
            Err(err) => {
                warn!(error = %err, "Token refresh failed, clearing credential");
                if let Err(store_err) = self.store.clear().await {
                    warn!(error = %store_err, "Failed to clear credential");
                }
                self.navigator.redirect_to_login();
                Err(err)
            }
        }
    }

    async fn refresh_then_store(&self) -> Result<AccessToken, ClientError> {
        let token = self.refresh().await?;
        // Persist before the retry goes out
        self.store
            .set(token.clone())
            .await
            .map_err(|e| ClientError::Auth(format!("failed to persist refreshed token: {e}")))?;
        Ok(token)
    }

    /// Obtain a fresh token for a call that got 401 while holding `sent`
    async fn recover(&self, sent: Option<AccessToken>) -> Result<AccessToken, ClientError> {
        let Some(gate) = &self.refresh_gate else {
            return self.refresh_and_persist().await;
        };

        let _guard = gate.lock().await;

        // Double-check: another request may have refreshed while we waited
        match (self.store.get().await?, sent) {
            (Some(current), sent) if sent.as_ref() != Some(&current) => {
                debug!("Reusing token refreshed by a concurrent request");
                Ok(current)
            }
            (None, Some(_)) => Err(ClientError::Auth(
                "session ended while waiting for token refresh".into(),
            )),
            _ => self.refresh_and_persist().await,
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl<H: RequestHandler> RequestHandler for WithRefresh<H> {
    async fn call(&self, attempt: Attempt) -> Result<ApiResponse, ClientError> {
        if !attempt.refresh_eligible() {
            return self.inner.call(attempt).await;
        }

        // With a shared refresh, pin the bearer here so the double-check
        // compares against the token that was actually sent
        let (attempt, sent) = if self.refresh_gate.is_some() {
            match self.store.get().await? {
                Some(token) => (attempt.with_bearer(&token)?, Some(token)),
                None => (attempt, None),
            }
        } else {
            (attempt, None)
        };

        // Keep the captured description for the single retry
        let retry = attempt.clone().into_retry();

        let response = self.inner.call(attempt).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(path = %retry.request().path(), "Got 401, refreshing access token");
        let token = self.recover(sent).await?;

        self.inner.call(retry.with_bearer(&token)?).await
    }
}
