//! Bearer injection stage

use async_trait::async_trait;
use std::sync::Arc;

use super::attempt::Attempt;
use super::config::RefreshAuth;
use super::error::ClientError;
use super::store::CredentialStore;
use super::transport::{ApiResponse, RequestHandler};

/// Adds `Authorization: Bearer <token>` from the credential store.
///
/// A stored token replaces any caller-supplied `Authorization` header. An
/// attempt whose bearer is pinned (a retry, or a call the refresh stage has
/// already authorized) is sent as-is. The refresh call only gets the bearer
/// when [`RefreshAuth::Bearer`] is configured.
pub struct WithAuth<H> {
    inner: H,
    store: Arc<dyn CredentialStore>,
    refresh_auth: RefreshAuth,
}

/// Wrap `inner` so every attempt carries the stored credential
pub fn with_auth<H: RequestHandler>(
    inner: H,
    store: Arc<dyn CredentialStore>,
    refresh_auth: RefreshAuth,
) -> WithAuth<H> {
    WithAuth {
        inner,
        store,
        refresh_auth,
    }
}

impl<H> WithAuth<H> {
    pub const fn inner(&self) -> &H {
        &self.inner
    }

    fn wants_bearer(&self, attempt: &Attempt) -> bool {
        if attempt.is_bearer_pinned() {
            return false;
        }
        !attempt.is_refresh_call() || self.refresh_auth == RefreshAuth::Bearer
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl<H: RequestHandler> RequestHandler for WithAuth<H> {
    async fn call(&self, attempt: Attempt) -> Result<ApiResponse, ClientError> {
        let attempt = if self.wants_bearer(&attempt) {
            match self.store.get().await? {
                Some(token) => attempt.with_bearer(&token)?,
                None => attempt,
            }
        } else {
            attempt
        };

        self.inner.call(attempt).await
    }
}
