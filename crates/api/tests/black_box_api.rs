use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

use adminhub_auth::{AccessClaims, Role};
use adminhub_infra::AppConfig;

const JWT_SECRET: &str = "test-secret";
const SUPERADMIN_PASSWORD: &str = "superadmin123!";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over in-memory storage, bound to an ephemeral port.
        let config = AppConfig {
            jwt_secret: Some(JWT_SECRET.to_string()),
            superadmin_password: Some(SUPERADMIN_PASSWORD.to_string()),
            ..AppConfig::default()
        };
        let app = adminhub_api::app::build_app(&config)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(id: i64, role: Role, ttl: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = AccessClaims {
        id,
        username: format!("user{id}"),
        email: format!("user{id}@example.com"),
        role,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn login(client: &reqwest::Client, srv: &TestServer) -> serde_json::Value {
    let res = client
        .post(srv.url("/login"))
        .json(&json!({ "username": "superadmin", "password": SUPERADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/v1/users/me")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let expired = mint_jwt(1, Role::SuperAdmin, ChronoDuration::minutes(-5));
    let res = client
        .get(srv.url("/v1/users/me"))
        .bearer_auth(expired)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_then_me_returns_caller_without_secrets() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let token = login(&client, &srv).await;
    assert_eq!(token["token_type"], "bearer");
    assert!(token["expires_in"].as_i64().unwrap() > 0);

    let res = client
        .get(srv.url("/v1/users/me"))
        .bearer_auth(token["access_token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let me: serde_json::Value = res.json().await.unwrap();
    assert_eq!(me["username"], "superadmin");
    assert_eq!(me["role"], "superadmin");
    assert!(me.get("password").is_none());
    assert!(me.get("refresh_token").is_none());
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() {
    let srv = TestServer::spawn().await;
    let res = reqwest::Client::new()
        .post(srv.url("/login"))
        .json(&json!({ "username": "superadmin", "password": "nope-nope" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn refresh_token_rotates() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let first = login(&client, &srv).await;
    let old = first["refresh_token"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url("/refresh-token"))
        .json(&json!({ "refresh_token": old }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let second: serde_json::Value = res.json().await.unwrap();
    assert_ne!(second["refresh_token"].as_str().unwrap(), old);

    let res = client
        .post(srv.url("/refresh-token"))
        .json(&json!({ "refresh_token": old }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "INVALID_REFRESH_TOKEN");
}

#[tokio::test]
async fn plain_user_is_forbidden_from_writes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt(42, Role::User, ChronoDuration::minutes(10));

    let res = client
        .post(srv.url("/v1/countries"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Vietnam", "code": "vn", "phone_code": "+84" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "FORBIDDEN");

    let res = client
        .get(srv.url("/v1/countries"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page: serde_json::Value = res.json().await.unwrap();
    assert_eq!(page["total_count"], 0);
    assert_eq!(page["data"], json!([]));
}

#[tokio::test]
async fn country_lifecycle() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt(7, Role::Admin, ChronoDuration::minutes(10));

    // Create
    let res = client
        .post(srv.url("/v1/countries"))
        .bearer_auth(&token)
        .json(&json!({ "name": " Vietnam ", "code": "vn", "phone_code": "+ 84" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let vn: serde_json::Value = res.json().await.unwrap();
    assert_eq!(vn["name"], "Vietnam");
    assert_eq!(vn["code"], "VN");
    assert_eq!(vn["phone_code"], "+84");
    let id = vn["id"].as_i64().unwrap();

    // Duplicate name
    let res = client
        .post(srv.url("/v1/countries"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Vietnam", "code": "vn", "phone_code": "+84" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Keeping its own name is not a duplicate
    let res = client
        .patch(srv.url(&format!("/v1/countries/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "name": "Vietnam", "code": "vnm" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["code"], "VNM");
    assert_eq!(updated["phone_code"], "+84");

    // Filtered list
    let res = client
        .get(srv.url("/v1/countries?name__icontains=viet&limit=5"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page: serde_json::Value = res.json().await.unwrap();
    assert_eq!(page["total_count"], 1);

    // Delete twice
    let res = client
        .delete(srv.url(&format!("/v1/countries/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = client
        .delete(srv.url(&format!("/v1/countries/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_filter_field_is_a_validation_error() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(7, Role::Admin, ChronoDuration::minutes(10));

    let res = reqwest::Client::new()
        .get(srv.url("/v1/users?password=secret"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["field"], "password");
}

#[tokio::test]
async fn superadmin_manages_users() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = login(&client, &srv).await;
    let access = token["access_token"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url("/v1/users"))
        .bearer_auth(&access)
        .json(&json!({
            "username": "alice",
            "password": "password123",
            "first_name": "Alice",
            "last_name": "Liddell",
            "email": "alice@example.com",
            "mobile": "+84 912 345 678",
            "role": "user"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let alice: serde_json::Value = res.json().await.unwrap();
    assert_eq!(alice["mobile"], "+84912345678");
    let id = alice["id"].as_i64().unwrap();

    let res = client
        .patch(srv.url(&format!("/v1/users/{id}")))
        .bearer_auth(&access)
        .json(&json!({ "blocked": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(srv.url("/login"))
        .json(&json!({ "username": "alice", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "USER_BLOCKED");

    let res = client
        .get(srv.url("/v1/users?sort=-username&limit=1"))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    let page: serde_json::Value = res.json().await.unwrap();
    assert_eq!(page["total_count"], 2);
    assert_eq!(page["data"][0]["username"], "superadmin");
}

#[tokio::test]
async fn explain_reports_the_callers_role() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(7, Role::Admin, ChronoDuration::minutes(10));

    let res = reqwest::Client::new()
        .get(srv.url("/v1/permissions/explain?object=user&action=delete_all"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["role"], "admin");
    assert_eq!(body["granted"], false);
}
