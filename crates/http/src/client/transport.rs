//! Request handlers and the reqwest transport at the bottom of the chain

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::attempt::Attempt;
use super::config::ClientConfig;
#[cfg(not(target_arch = "wasm32"))]
use super::cookies::FileCookieJar;
#[cfg(not(target_arch = "wasm32"))]
use std::sync::Arc;
use super::error::ClientError;

/// A received HTTP response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse {
    pub const fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Turn a non-2xx response into a [`ClientError::Server`]
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::from_status(self.status, &self.body))
        }
    }
}

/// One stage of the request pipeline.
///
/// Every status code comes back as `Ok`; only a missing response (or a
/// stage's own failure) is an `Err`. Stages wrap each other, so the client is
/// built by composing functions from handler to handler.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait RequestHandler: Send + Sync {
    async fn call(&self, attempt: Attempt) -> Result<ApiResponse, ClientError>;
}

/// Sends attempts over HTTP with reqwest
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    /// Build the underlying reqwest client from `config`.
    ///
    /// The client keeps an in-memory cookie jar so the session cookie set at
    /// login is presented to the refresh endpoint.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let builder = client_builder(config);

        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.cookie_store(true);

        Self::finish(builder, config)
    }

    /// Like [`ReqwestTransport::new`], with cookies kept in `jar`
    #[cfg(not(target_arch = "wasm32"))]
    pub fn with_cookie_jar(
        config: &ClientConfig,
        jar: Arc<FileCookieJar>,
    ) -> Result<Self, ClientError> {
        Self::finish(client_builder(config).cookie_provider(jar), config)
    }

    fn finish(builder: reqwest::ClientBuilder, config: &ClientConfig) -> Result<Self, ClientError> {
        let client = builder
            .build()
            .map_err(|e| ClientError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, &config.base_url))
    }

    /// Use an existing reqwest client
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn client_builder(config: &ClientConfig) -> reqwest::ClientBuilder {
    let builder = reqwest::Client::builder().user_agent(config.user_agent.clone());

    #[cfg(not(target_arch = "wasm32"))]
    let builder = match config.timeout() {
        Some(timeout) => builder.timeout(timeout),
        None => builder,
    };

    builder
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl RequestHandler for ReqwestTransport {
    async fn call(&self, attempt: Attempt) -> Result<ApiResponse, ClientError> {
        let request = attempt.request();
        let url = format!("{}{}", self.base_url, request.path());

        let mut builder = self
            .client
            .request(request.method().to_reqwest(), url)
            .headers(request.headers().clone());

        if let Some(body) = request.body() {
            builder = builder.body(body.clone());
        }

        // Browsers only send the session cookie when asked to
        #[cfg(target_arch = "wasm32")]
        {
            builder = builder.fetch_credentials_include();
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        debug!(
            method = %request.method(),
            path = %request.path(),
            status = status.as_u16(),
            retry = attempt.is_retry(),
            refresh = attempt.is_refresh_call(),
            "Request completed"
        );

        Ok(ApiResponse::new(status, headers, body))
    }
}
