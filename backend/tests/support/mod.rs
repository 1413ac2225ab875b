#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use valyanmed::auth::{JwtKeys, PasswordHasher};
use valyanmed::db::repository::FullRepository;
use valyanmed::db::LocalRepository;
use valyanmed::http::{create_router, AppState};
use valyanmed::models::{NewUser, UserRole};
use valyanmed::services::auth::AuthService;
use valyanmed::services::users;

static ENV_LOCK: Mutex<()> = Mutex::new(());

pub const ADMIN_PASSWORD: &str = "admin-pass-1";

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Router over a fresh in-memory repository with a seeded `admin` account.
pub struct TestApp {
    pub router: Router,
    pub repo: Arc<LocalRepository>,
    pub auth: AuthService,
}

impl TestApp {
    pub async fn new() -> Self {
        let repo = Arc::new(LocalRepository::new());
        let auth = AuthService::new(
            JwtKeys::new(b"integration-secret", "valyanmed", chrono::Duration::minutes(30)),
            PasswordHasher::new(1_000),
        );
        auth.ensure_admin_user(repo.as_ref(), Some(ADMIN_PASSWORD))
            .await
            .unwrap();

        let state = AppState::new(repo.clone() as Arc<dyn FullRepository>, auth.clone());
        Self {
            router: create_router(state),
            repo,
            auth,
        }
    }

    pub async fn admin_token(&self) -> String {
        self.login("admin", ADMIN_PASSWORD).await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(serde_json::json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["value"]["token"].as_str().unwrap().to_string()
    }

    /// Create a non-admin account and return its token.
    pub async fn user_token(&self, username: &str, role: UserRole) -> String {
        let request = NewUser {
            username: username.to_string(),
            email: format!("{}@valyanmed.ro", username),
            display_name: username.to_string(),
            role,
            password: "parola-lunga".to_string(),
            staff_id: None,
        };
        users::create_user(self.repo.as_ref(), self.auth.hasher(), &request)
            .await
            .unwrap();
        self.login(username, "parola-lunga").await
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }
}

pub fn patient_body(cnp: &str, last_name: &str, city: &str) -> Value {
    serde_json::json!({
        "cnp": cnp,
        "firstName": "Ion",
        "lastName": last_name,
        "dateOfBirth": "1985-03-12",
        "gender": "male",
        "city": city,
        "phone": "0722 123 456"
    })
}
