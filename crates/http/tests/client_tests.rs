//! Integration tests for the catalog HTTP client

use catalog_http::client::{
    AccessToken, CatalogClient, ClientError, CredentialStore, FileCookieJar, FileCredentialStore,
    MemoryCredentialStore, Method, Navigator, RefreshAuth, RequestOptions,
};
use catalog_http::types::ProductInput;
use http::{HeaderName, HeaderValue};
use mockall::mock;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mock! {
    pub Nav {}

    impl Navigator for Nav {
        fn redirect_to_login(&self);
    }
}

fn navigator(redirects: usize) -> Arc<MockNav> {
    let mut nav = MockNav::new();
    nav.expect_redirect_to_login()
        .times(redirects)
        .return_const(());
    Arc::new(nav)
}

fn client_with(
    server: &MockServer,
    store: &MemoryCredentialStore,
    nav: Arc<MockNav>,
) -> CatalogClient {
    CatalogClient::builder()
        .base_url(server.uri())
        .credential_store(Arc::new(store.clone()))
        .navigator(nav)
        .build()
        .unwrap()
}

async fn mount_refresh(server: &MockServer, status: u16, body: serde_json::Value, times: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_client_builder() {
    let client = CatalogClient::builder()
        .base_url("http://localhost:5000/")
        .build();

    assert!(client.is_ok());
    let client = client.unwrap();
    assert_eq!(client.base_url(), "http://localhost:5000");
}

#[tokio::test]
async fn test_client_builder_requires_base_url() {
    let result = CatalogClient::builder().build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_bearer_attached_to_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = MemoryCredentialStore::with_token("T1");
    let client = client_with(&mock_server, &store, navigator(0));

    let products = client.list_products().await.unwrap();
    assert!(products.is_empty());
}

#[tokio::test]
async fn test_no_credential_no_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let store = MemoryCredentialStore::new();
    let client = client_with(&mock_server, &store, navigator(0));
    client
        .request(Method::Get, "/products", None, None)
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_refresh_and_retry_with_new_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .and(header("authorization", "Bearer T2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_refresh(&mock_server, 200, json!({ "accessToken": "T2" }), 1).await;

    let store = MemoryCredentialStore::with_token("T1");
    let client = client_with(&mock_server, &store, navigator(0));

    let response = client
        .request(Method::Get, "/products", None, None)
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(store.get().await.unwrap(), Some(AccessToken::new("T2")));
}

#[tokio::test]
async fn test_retry_replays_body_and_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/products"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/products"))
        .and(header("authorization", "Bearer T2"))
        .and(header("x-request-id", "req-7"))
        .and(body_json(json!({ "title": "Lamp" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_refresh(&mock_server, 200, json!({ "accessToken": "T2" }), 1).await;

    let store = MemoryCredentialStore::with_token("T1");
    let client = client_with(&mock_server, &store, navigator(0));

    let options = RequestOptions::new().header(
        HeaderName::from_static("x-request-id"),
        HeaderValue::from_static("req-7"),
    );
    let response = client
        .request(
            Method::Post,
            "/api/products",
            Some(&json!({ "title": "Lamp" })),
            Some(options),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn test_failed_refresh_clears_credential_and_redirects() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_refresh(&mock_server, 403, json!({ "message": "Forbidden" }), 1).await;

    let store = MemoryCredentialStore::with_token("T1");
    let client = client_with(&mock_server, &store, navigator(1));

    let result = client.request(Method::Get, "/products", None, None).await;
    assert!(matches!(result, Err(ClientError::Auth(_))));
    assert!(store.get().await.unwrap().is_none());
}

#[tokio::test]
async fn test_second_401_does_not_refresh_again() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Token revoked" })))
        .expect(2)
        .mount(&mock_server)
        .await;
    mount_refresh(&mock_server, 200, json!({ "accessToken": "T2" }), 1).await;

    let store = MemoryCredentialStore::with_token("T1");
    let client = client_with(&mock_server, &store, navigator(0));

    let err = client
        .request(Method::Get, "/products", None, None)
        .await
        .unwrap_err();
    match err {
        ClientError::Server {
            status, message, ..
        } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Token revoked");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // The refreshed token stays; only a failed refresh clears it
    assert_eq!(store.get().await.unwrap(), Some(AccessToken::new("T2")));
}

#[tokio::test]
async fn test_refresh_401_is_not_refreshed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_refresh(&mock_server, 401, json!({}), 1).await;

    let store = MemoryCredentialStore::with_token("T1");
    let client = client_with(&mock_server, &store, navigator(1));

    let result = client.request(Method::Get, "/products", None, None).await;
    assert!(matches!(result, Err(ClientError::Auth(_))));
    assert!(store.get().await.unwrap().is_none());
}

#[tokio::test]
async fn test_refresh_uses_session_cookie_not_bearer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "refreshToken=r1; Path=/; HttpOnly")
                .set_body_json(json!({ "message": "Login Successful", "accessToken": "T1" })),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(header("authorization", "Bearer T2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "products": [] })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(header("cookie", "refreshToken=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "T2" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = MemoryCredentialStore::new();
    let client = client_with(&mock_server, &store, navigator(0));

    let login = client.login("ada@example.com", "secret").await.unwrap();
    assert_eq!(login.message.as_deref(), Some("Login Successful"));
    assert_eq!(store.get().await.unwrap(), Some(AccessToken::new("T1")));

    client.list_products().await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let refresh = requests
        .iter()
        .find(|r| r.url.path() == "/auth/refresh")
        .unwrap();
    assert!(!refresh.headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_refresh_with_bearer_mode_and_custom_path() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .and(header("authorization", "Bearer T2"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh-token"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "T2" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = MemoryCredentialStore::with_token("T1");
    let client = CatalogClient::builder()
        .base_url(mock_server.uri())
        .refresh_path("/api/auth/refresh-token")
        .refresh_auth(RefreshAuth::Bearer)
        .credential_store(Arc::new(store.clone()))
        .navigator(navigator(0))
        .build()
        .unwrap();

    client
        .request(Method::Get, "/products", None, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_server_error_is_propagated_without_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/products/p1"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Product not found" })),
        )
        .mount(&mock_server)
        .await;
    mount_refresh(&mock_server, 200, json!({ "accessToken": "T2" }), 0).await;

    let store = MemoryCredentialStore::with_token("T1");
    let client = client_with(&mock_server, &store, navigator(0));

    let err = client.delete_product("p1").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.user_message(), "Product not found");
    assert_eq!(store.get().await.unwrap(), Some(AccessToken::new("T1")));
}

#[tokio::test]
async fn test_network_error() {
    // Nothing listens on port 1
    let client = CatalogClient::builder()
        .base_url("http://127.0.0.1:1")
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let result = client.request(Method::Get, "/products", None, None).await;
    assert!(matches!(result, Err(ClientError::Network(_))));
}

#[tokio::test]
async fn test_login_failure_does_not_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "email": "ada@example.com", "password": "wrong" })))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "message": "Invalid email or password" })),
        )
        .mount(&mock_server)
        .await;
    mount_refresh(&mock_server, 200, json!({ "accessToken": "T2" }), 0).await;

    let store = MemoryCredentialStore::new();
    let client = client_with(&mock_server, &store, navigator(0));

    let err = client.login("ada@example.com", "wrong").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.user_message(), "Invalid email or password");
    assert!(!client.is_logged_in().await.unwrap());
}

#[tokio::test]
async fn test_signup_reports_field_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "Validation failed",
            "errors": [{ "msg": "Name is required" }, { "msg": "Password too short" }]
        })))
        .mount(&mock_server)
        .await;

    let client = CatalogClient::new(mock_server.uri()).unwrap();

    let err = client
        .signup("", "ada@example.com", "x")
        .await
        .unwrap_err();
    match err {
        ClientError::Server {
            status,
            message,
            errors,
        } => {
            assert_eq!(status, 422);
            assert_eq!(message, "Validation failed");
            assert_eq!(errors, vec!["Name is required", "Password too short"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_product_crud() {
    let mock_server = MockServer::start().await;

    let lamp = json!({
        "title": "Lamp",
        "price": 19.5,
        "description": "Desk lamp",
        "category": "home",
        "images": [{ "url": "https://img.example.com/lamp.png", "public_id": "" }]
    });

    Mock::given(method("POST"))
        .and(path("/api/products"))
        .and(header("authorization", "Bearer T1"))
        .and(body_json(&lamp))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "_id": "p1" })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/products/p1"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/products/p1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Product Deleted" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = MemoryCredentialStore::with_token("T1");
    let client = client_with(&mock_server, &store, navigator(0));

    let input = ProductInput {
        title: "Lamp".into(),
        price: 19.5,
        description: "Desk lamp".into(),
        category: "home".into(),
        images: vec![],
    }
    .with_image_urls("https://img.example.com/lamp.png");

    client.create_product(&input).await.unwrap();
    client.update_product("p1", &input).await.unwrap();
    let message = client.delete_product("p1").await.unwrap();
    assert_eq!(message.as_deref(), Some("Product Deleted"));
}

#[tokio::test]
async fn test_logout_clears_credential() {
    let store = MemoryCredentialStore::with_token("T1");
    let client = CatalogClient::builder()
        .base_url("http://localhost:5000")
        .credential_store(Arc::new(store.clone()))
        .build()
        .unwrap();

    assert!(client.is_logged_in().await.unwrap());
    client.logout().await.unwrap();
    assert!(!client.is_logged_in().await.unwrap());
    assert!(store.get().await.unwrap().is_none());
}

async fn mount_expiring_products(server: &MockServer, refresh_delay: Duration, refreshes: u64) {
    Mock::given(method("GET"))
        .and(path("/products"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .and(header("authorization", "Bearer T2"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "accessToken": "T2" }))
                .set_delay(refresh_delay),
        )
        .expect(refreshes)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_concurrent_401s_refresh_independently_by_default() {
    let mock_server = MockServer::start().await;
    mount_expiring_products(&mock_server, Duration::from_millis(300), 2).await;

    let store = MemoryCredentialStore::with_token("T1");
    let client = client_with(&mock_server, &store, navigator(0));

    let (a, b) = futures::join!(
        client.request(Method::Get, "/products", None, None),
        client.request(Method::Get, "/products", None, None),
    );
    assert!(a.is_ok());
    assert!(b.is_ok());
}

#[tokio::test]
async fn test_shared_refresh_collapses_concurrent_401s() {
    let mock_server = MockServer::start().await;
    mount_expiring_products(&mock_server, Duration::from_millis(300), 1).await;

    let store = MemoryCredentialStore::with_token("T1");
    let client = CatalogClient::builder()
        .base_url(mock_server.uri())
        .share_refresh(true)
        .credential_store(Arc::new(store.clone()))
        .navigator(navigator(0))
        .build()
        .unwrap();

    let (a, b) = futures::join!(
        client.request(Method::Get, "/products", None, None),
        client.request(Method::Get, "/products", None, None),
    );
    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(store.get().await.unwrap(), Some(AccessToken::new("T2")));
}

#[tokio::test]
async fn test_session_cookie_survives_into_a_new_client() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "refreshToken=r1; Path=/; HttpOnly")
                .set_body_json(json!({ "message": "Login Successful", "accessToken": "T1" })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(header("cookie", "refreshToken=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "T2" })))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(header("authorization", "Bearer T2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let data_dir = tempfile::tempdir().unwrap();
    let open_client = || {
        CatalogClient::builder()
            .base_url(mock_server.uri())
            .credential_store(Arc::new(FileCredentialStore::in_dir(data_dir.path())))
            .cookie_jar(Arc::new(FileCookieJar::in_dir(data_dir.path()).unwrap()))
            .navigator(navigator(0))
            .build()
            .unwrap()
    };

    let first = open_client();
    first.login("ada@example.com", "secret").await.unwrap();
    drop(first);

    let second = open_client();
    second.list_products().await.unwrap();

    let stored = FileCredentialStore::in_dir(data_dir.path()).get().await.unwrap();
    assert_eq!(stored, Some(AccessToken::new("T2")));
}

#[tokio::test]
async fn test_sub_second_timeout_applies() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1500)))
        .mount(&mock_server)
        .await;

    let client = CatalogClient::builder()
        .base_url(mock_server.uri())
        .timeout(Duration::from_millis(200))
        .navigator(navigator(0))
        .build()
        .unwrap();

    let result = client.request(Method::Get, "/products", None, None).await;
    assert!(matches!(result, Err(ClientError::Network(_))));
}

#[tokio::test]
async fn test_stored_token_replaces_caller_authorization() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = MemoryCredentialStore::with_token("T1");
    let client = client_with(&mock_server, &store, navigator(0));

    let options = RequestOptions::new().header(
        HeaderName::from_static("authorization"),
        HeaderValue::from_static("Bearer caller"),
    );
    client
        .request(Method::Get, "/products", None, Some(options))
        .await
        .unwrap();
}
