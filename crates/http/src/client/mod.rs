//! Catalog HTTP client
//!
//! [`CatalogClient::request`] sends a call through a pipeline built once at
//! construction:
//!
//! ```text
//! with_refresh(with_auth(transport))
//! ```
//!
//! `with_auth` attaches the stored bearer token; `with_refresh` turns a single
//! 401 into one refresh call plus one retry. Public calls (login, signup) go
//! straight to the transport.

pub mod attempt;
pub mod auth;
pub mod bearer;
pub mod config;
#[cfg(not(target_arch = "wasm32"))]
pub mod cookies;
pub mod error;
pub mod navigate;
pub mod products;
pub mod refresh;
pub mod store;
pub mod transport;

pub use attempt::{Attempt, Method, PendingRequest, RequestOptions};
pub use bearer::{WithAuth, with_auth};
pub use config::{ClientConfig, RefreshAuth};
pub use error::ClientError;
pub use navigate::{CallbackNavigator, Navigator, NoopNavigator};
pub use refresh::{WithRefresh, with_refresh};
pub use store::{AccessToken, CredentialStore, MemoryCredentialStore};
pub use transport::{ApiResponse, ReqwestTransport, RequestHandler};

#[cfg(not(target_arch = "wasm32"))]
pub use cookies::FileCookieJar;
#[cfg(not(target_arch = "wasm32"))]
pub use store::FileCredentialStore;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use navigate::LocationNavigator;
#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use store::LocalStorageCredentialStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Handler chain used for authenticated calls
type AuthenticatedChain = WithRefresh<WithAuth<ReqwestTransport>>;

/// Catalog API client
#[derive(Clone)]
pub struct CatalogClient {
    handler: Arc<AuthenticatedChain>,
    public: ReqwestTransport,
    store: Arc<dyn CredentialStore>,
    base_url: String,
}

impl CatalogClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> CatalogClientBuilder {
        CatalogClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The credential store this client reads and writes
    pub fn credential_store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Send an authenticated call.
    ///
    /// The stored token is attached as a bearer header. A 401 is recovered
    /// once through the refresh endpoint; any other non-2xx becomes
    /// [`ClientError::Server`] and a missing response [`ClientError::Network`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        options: Option<RequestOptions>,
    ) -> Result<ApiResponse, ClientError> {
        let attempt = Attempt::new(build_request(method, path, body, options)?);
        let response = self.handler.call(attempt).await?;
        log_failure(method, path, &response);
        response.error_for_status()
    }

    /// Send a call without credentials or refresh handling
    pub async fn public_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        options: Option<RequestOptions>,
    ) -> Result<ApiResponse, ClientError> {
        let attempt = Attempt::new(build_request(method, path, body, options)?);
        let response = self.public.call(attempt).await?;
        log_failure(method, path, &response);
        response.error_for_status()
    }

    /// Authenticated call with a typed body and response
    pub(crate) async fn execute<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = body.map(serde_json::to_value).transpose()?;
        self.request(method, path, body.as_ref(), None)
            .await?
            .json()
    }

    /// Public call with a typed body and response
    pub(crate) async fn execute_public<T, B>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        self.public_request(method, path, Some(&body), None)
            .await?
            .json()
    }
}

fn build_request(
    method: Method,
    path: &str,
    body: Option<&serde_json::Value>,
    options: Option<RequestOptions>,
) -> Result<PendingRequest, ClientError> {
    let mut request = PendingRequest::new(method, path);
    if let Some(body) = body {
        request = request.with_json(body)?;
    }
    if let Some(options) = options {
        request = request.with_options(options);
    }
    Ok(request)
}

fn log_failure(method: Method, path: &str, response: &ApiResponse) {
    if !response.is_success() {
        debug!(
            %method,
            path,
            status = response.status().as_u16(),
            "Request failed"
        );
    }
}

/// Builder for [`CatalogClient`]
#[derive(Default)]
pub struct CatalogClientBuilder {
    config: ClientConfig,
    store: Option<Arc<dyn CredentialStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    #[cfg(not(target_arch = "wasm32"))]
    cookie_jar: Option<Arc<FileCookieJar>>,
}

impl CatalogClientBuilder {
    /// Start from a full configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the refresh endpoint path
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.config.refresh_path = path.into();
        self
    }

    /// Set how the refresh call authenticates
    pub const fn refresh_auth(mut self, refresh_auth: RefreshAuth) -> Self {
        self.config.refresh_auth = refresh_auth;
        self
    }

    /// Collapse concurrent refreshes into one
    pub const fn share_refresh(mut self, share: bool) -> Self {
        self.config.share_refresh = share;
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.set_timeout(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set the credential store (defaults to in-memory)
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the login redirect (defaults to doing nothing)
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Keep session cookies in `jar` instead of an in-memory jar
    #[cfg(not(target_arch = "wasm32"))]
    pub fn cookie_jar(mut self, jar: Arc<FileCookieJar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<CatalogClient, ClientError> {
        let config = self.config.validate()?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new()));
        let navigator = self.navigator.unwrap_or_else(|| Arc::new(NoopNavigator));

        #[cfg(not(target_arch = "wasm32"))]
        let transport = match self.cookie_jar {
            Some(jar) => ReqwestTransport::with_cookie_jar(&config, jar)?,
            None => ReqwestTransport::new(&config)?,
        };
        #[cfg(target_arch = "wasm32")]
        let transport = ReqwestTransport::new(&config)?;
        let handler = with_refresh(
            with_auth(transport.clone(), store.clone(), config.refresh_auth),
            store.clone(),
            navigator,
            config.refresh_path.clone(),
            config.share_refresh,
        );

        Ok(CatalogClient {
            handler: Arc::new(handler),
            public: transport,
            store,
            base_url: config.base_url,
        })
    }
}
