//! Authentication API client methods

use tracing::info;

use super::{AccessToken, CatalogClient, ClientError, Method};
use crate::types::{LoginRequest, LoginResponse, MessageResponse, SignupRequest};

const LOGIN_PATH: &str = "/api/auth/login";
const REGISTER_PATH: &str = "/api/auth/register";

impl CatalogClient {
    /// Log in with email and password.
    ///
    /// Sent without the refresh policy, so bad credentials come back as a
    /// 401 [`ClientError::Server`] rather than a redirect. The returned access
    /// token, if any, is stored.
    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<LoginResponse, ClientError> {
        let request = LoginRequest {
            email: email.into(),
            password: password.into(),
        };
        let response: LoginResponse = self
            .execute_public(Method::Post, LOGIN_PATH, &request)
            .await?;

        if let Some(token) = response.access_token.as_deref().filter(|t| !t.is_empty()) {
            self.store.set(AccessToken::new(token)).await?;
            info!("Logged in");
        }

        Ok(response)
    }

    /// Register a new account
    pub async fn signup(
        &self,
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<MessageResponse, ClientError> {
        let request = SignupRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        };
        self.execute_public(Method::Post, REGISTER_PATH, &request)
            .await
    }

    /// Forget the stored access token
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.store.clear().await?;
        info!("Logged out");
        Ok(())
    }

    /// Whether an access token is stored
    pub async fn is_logged_in(&self) -> Result<bool, ClientError> {
        Ok(self.store.get().await?.is_some())
    }
}
