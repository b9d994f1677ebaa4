//! Integration tests for registration, login, and token lifecycle

use std::net::TcpListener;
use std::sync::Arc;

use chrono::{Duration, Utc};
use chirpy::configuration::JwtSettings;
use chirpy::startup::run;
use chirpy::store::InMemoryStore;
use serde_json::{json, Value};

const JWT_SECRET: &str = "integration-test-secret-at-least-32-chars";

pub struct TestApp {
    pub address: String,
    pub store: InMemoryStore,
    pub client: reqwest::Client,
}

impl TestApp {
    async fn register(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/api/users", self.address))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/api/login", self.address))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn login_json(&self, email: &str, password: &str) -> Value {
        let response = self.login(email, password).await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    async fn post_with_bearer(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = InMemoryStore::new();
    let server = run(listener, Arc::new(store.clone()), JwtSettings::new(JWT_SECRET))
        .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        client: reqwest::Client::new(),
    }
}

#[tokio::test]
async fn register_returns_201_without_credential() {
    let app = spawn_app();

    let response = app.register("a@b.com", "secret123").await;
    assert_eq!(201, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["email"], "a@b.com");
    assert!(body.get("id").is_some());
    assert!(body.get("created_at").is_some());
    assert!(body.get("updated_at").is_some());
    assert!(body.get("hashed_password").is_none());
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn register_duplicate_email_returns_409() {
    let app = spawn_app();

    assert_eq!(201, app.register("a@b.com", "secret123").await.status().as_u16());
    assert_eq!(409, app.register("a@b.com", "another1").await.status().as_u16());
}

#[tokio::test]
async fn register_returns_400_for_invalid_input() {
    let app = spawn_app();

    let test_cases = vec![
        (json!({ "email": "not-an-email", "password": "secret123" }), "invalid email"),
        (json!({ "email": "a@b.com", "password": "" }), "empty password"),
        (json!({ "email": "a@b.com" }), "missing password"),
    ];

    for (body, description) in test_cases {
        let response = app
            .client
            .post(&format!("{}/api/users", app.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 when the payload was {}.",
            description
        );
    }
}

#[tokio::test]
async fn login_returns_user_and_tokens() {
    let app = spawn_app();
    app.register("a@b.com", "secret123").await;

    let body = app.login_json("a@b.com", "secret123").await;

    assert_eq!(body["email"], "a@b.com");
    assert!(body["token"].as_str().map_or(false, |t| !t.is_empty()));
    assert_eq!(body["refresh_token"].as_str().map(str::len), Some(64));
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app();
    app.register("a@b.com", "secret123").await;
    app.store
        .insert_user_without_credential("nopass@b.com")
        .expect("Failed to seed user");

    let mut bodies = Vec::new();
    for (email, password) in [
        ("a@b.com", "wrong-password"),
        ("nobody@b.com", "secret123"),
        ("nopass@b.com", "secret123"),
    ] {
        let response = app.login(email, password).await;
        assert_eq!(401, response.status().as_u16());

        let body: Value = response.json().await.expect("Failed to parse response");
        bodies.push((body["code"].clone(), body["message"].clone()));
    }

    assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn refresh_issues_working_access_token() {
    let app = spawn_app();
    app.register("a@b.com", "secret123").await;
    let session = app.login_json("a@b.com", "secret123").await;
    let refresh_token = session["refresh_token"].as_str().unwrap();

    let response = app.post_with_bearer("/api/refresh", refresh_token).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    let access_token = body["token"].as_str().unwrap().to_string();

    // The new access token authenticates a protected route.
    let response = app
        .client
        .put(&format!("{}/api/users", app.address))
        .bearer_auth(&access_token)
        .json(&json!({ "email": "a@b.com", "password": "secret123" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    // Non-rotating: the same refresh token works again.
    let response = app.post_with_bearer("/api/refresh", refresh_token).await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn refresh_rejects_access_token_and_missing_header() {
    let app = spawn_app();
    app.register("a@b.com", "secret123").await;
    let session = app.login_json("a@b.com", "secret123").await;

    let response = app
        .post_with_bearer("/api/refresh", session["token"].as_str().unwrap())
        .await;
    assert_eq!(401, response.status().as_u16());

    let response = app
        .client
        .post(&format!("{}/api/refresh", app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());

    let response = app
        .client
        .post(&format!("{}/api/refresh", app.address))
        .header("Authorization", "Token abc")
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn revoked_refresh_token_is_rejected() {
    let app = spawn_app();
    app.register("a@b.com", "secret123").await;
    let session = app.login_json("a@b.com", "secret123").await;
    let refresh_token = session["refresh_token"].as_str().unwrap();

    let response = app.post_with_bearer("/api/revoke", refresh_token).await;
    assert_eq!(204, response.status().as_u16());

    let response = app.post_with_bearer("/api/refresh", refresh_token).await;
    assert_eq!(401, response.status().as_u16());

    // Revoking again still succeeds
    let response = app.post_with_bearer("/api/revoke", refresh_token).await;
    assert_eq!(204, response.status().as_u16());
}

#[tokio::test]
async fn revoke_unknown_token_returns_401() {
    let app = spawn_app();

    let response = app.post_with_bearer("/api/revoke", "does-not-exist").await;
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn expired_refresh_token_is_rejected() {
    let app = spawn_app();
    app.register("a@b.com", "secret123").await;
    let session = app.login_json("a@b.com", "secret123").await;
    let refresh_token = session["refresh_token"].as_str().unwrap();

    app.store
        .set_refresh_token_expiry(refresh_token, Utc::now() - Duration::seconds(1))
        .expect("Failed to backdate token");

    let response = app.post_with_bearer("/api/refresh", refresh_token).await;
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn update_user_requires_access_token() {
    let app = spawn_app();
    app.register("a@b.com", "secret123").await;

    let response = app
        .client
        .put(&format!("{}/api/users", app.address))
        .json(&json!({ "email": "new@b.com", "password": "newsecret" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());

    let response = app
        .client
        .put(&format!("{}/api/users", app.address))
        .bearer_auth("not.a.jwt")
        .json(&json!({ "email": "new@b.com", "password": "newsecret" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn update_user_changes_own_credentials() {
    let app = spawn_app();
    app.register("a@b.com", "secret123").await;
    let session = app.login_json("a@b.com", "secret123").await;

    let response = app
        .client
        .put(&format!("{}/api/users", app.address))
        .bearer_auth(session["token"].as_str().unwrap())
        .json(&json!({ "email": "new@b.com", "password": "newsecret" }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["id"], session["id"]);
    assert_eq!(body["email"], "new@b.com");

    assert_eq!(401, app.login("a@b.com", "secret123").await.status().as_u16());
    assert_eq!(200, app.login("new@b.com", "newsecret").await.status().as_u16());
}

#[tokio::test]
async fn full_session_lifecycle() {
    let app = spawn_app();

    assert_eq!(201, app.register("a@b.com", "secret123").await.status().as_u16());
    let session = app.login_json("a@b.com", "secret123").await;
    let refresh_token = session["refresh_token"].as_str().unwrap();

    let response = app.post_with_bearer("/api/refresh", refresh_token).await;
    assert_eq!(200, response.status().as_u16());

    let response = app.post_with_bearer("/api/revoke", refresh_token).await;
    assert_eq!(204, response.status().as_u16());

    let response = app.post_with_bearer("/api/refresh", refresh_token).await;
    assert_eq!(401, response.status().as_u16());
}
