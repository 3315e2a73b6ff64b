//! Outbound request descriptions and per-call attempt records

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, header};
use serde::Serialize;

use super::error::ClientError;
use super::store::AccessToken;

/// HTTP verbs the client issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    headers: HeaderMap,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an extra header to the request
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// A captured outbound HTTP call.
///
/// Holds everything needed to send the same call again: the body is
/// serialized once, up front.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Attach a JSON body
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        let bytes = serde_json::to_vec(body)?;
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }

    /// Merge per-call options into the request
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.headers.extend(options.headers);
        self
    }

    pub const fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

/// One attempt at sending a [`PendingRequest`].
///
/// Never mutated after construction: retrying produces a new record via
/// [`Attempt::into_retry`]. A record that is a refresh call or already a
/// retry is not eligible for another refresh cycle. Once a bearer has been
/// pinned with [`Attempt::with_bearer`], later stages leave it alone.
#[derive(Debug, Clone)]
pub struct Attempt {
    request: PendingRequest,
    retried: bool,
    refresh_call: bool,
    bearer_pinned: bool,
}

impl Attempt {
    /// First attempt of an ordinary call
    pub const fn new(request: PendingRequest) -> Self {
        Self {
            request,
            retried: false,
            refresh_call: false,
            bearer_pinned: false,
        }
    }

    /// Attempt for the token refresh call itself
    pub const fn refresh(request: PendingRequest) -> Self {
        Self {
            request,
            retried: false,
            refresh_call: true,
            bearer_pinned: false,
        }
    }

    /// The single retry of this call
    pub fn into_retry(self) -> Self {
        Self {
            retried: true,
            ..self
        }
    }

    /// Same attempt carrying `token` as its bearer credential.
    ///
    /// Replaces any `Authorization` header already present and pins it.
    pub fn with_bearer(mut self, token: &AccessToken) -> Result<Self, ClientError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
            .map_err(|_| ClientError::Auth("access token is not a valid header value".into()))?;
        value.set_sensitive(true);
        self.request.headers.insert(header::AUTHORIZATION, value);
        self.bearer_pinned = true;
        Ok(self)
    }

    pub const fn request(&self) -> &PendingRequest {
        &self.request
    }

    pub const fn is_retry(&self) -> bool {
        self.retried
    }

    pub const fn is_refresh_call(&self) -> bool {
        self.refresh_call
    }

    /// Whether a 401 on this attempt may trigger a refresh
    pub const fn refresh_eligible(&self) -> bool {
        !self.retried && !self.refresh_call
    }

    /// Whether the bearer was set by [`Attempt::with_bearer`]
    pub const fn is_bearer_pinned(&self) -> bool {
        self.bearer_pinned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_is_not_eligible() {
        let attempt = Attempt::new(PendingRequest::new(Method::Get, "/api/products"));
        assert!(attempt.refresh_eligible());

        let retry = attempt.into_retry();
        assert!(retry.is_retry());
        assert!(!retry.refresh_eligible());
    }

    #[test]
    fn test_refresh_call_is_not_eligible() {
        let attempt = Attempt::refresh(PendingRequest::new(Method::Post, "/auth/refresh"));
        assert!(attempt.is_refresh_call());
        assert!(!attempt.refresh_eligible());
        assert!(!attempt.into_retry().refresh_eligible());
    }

    #[test]
    fn test_with_bearer_replaces_header() {
        let attempt = Attempt::new(PendingRequest::new(Method::Get, "/api/products"))
            .with_bearer(&AccessToken::new("T1"))
            .unwrap()
            .with_bearer(&AccessToken::new("T2"))
            .unwrap();

        let values: Vec<_> = attempt
            .request()
            .headers()
            .get_all(header::AUTHORIZATION)
            .iter()
            .collect();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0], "Bearer T2");
        assert!(values[0].is_sensitive());
        assert!(attempt.is_bearer_pinned());
    }

    #[test]
    fn test_caller_authorization_is_not_pinned() {
        let request = PendingRequest::new(Method::Get, "/api/products").with_options(
            RequestOptions::new().header(
                header::AUTHORIZATION,
                HeaderValue::from_static("Bearer caller"),
            ),
        );
        let attempt = Attempt::new(request);
        assert!(!attempt.is_bearer_pinned());
    }

    #[test]
    fn test_json_body_and_options() {
        let request = PendingRequest::new(Method::Post, "/api/products")
            .with_json(&serde_json::json!({ "title": "Lamp" }))
            .unwrap()
            .with_options(RequestOptions::new().header(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("abc"),
            ));

        assert_eq!(request.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(request.headers()["x-request-id"], "abc");
        assert_eq!(request.body().unwrap().as_ref(), br#"{"title":"Lamp"}"#);
    }

    #[test]
    fn test_invalid_token_rejected() {
        let attempt = Attempt::new(PendingRequest::new(Method::Get, "/"));
        let result = attempt.with_bearer(&AccessToken::new("bad\ntoken"));
        assert!(matches!(result, Err(ClientError::Auth(_))));
    }
}
