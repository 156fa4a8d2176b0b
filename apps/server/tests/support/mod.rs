pub mod assertions;
pub mod fixtures;

use anyhow::Context as _;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use school_health::{
    api::create_router,
    auth::{Claims, Role},
    config::StorageBackend,
    AppState, Config,
};
use serde_json::Value;
use tower::ServiceExt as _;

// Re-export commonly used items
pub use assertions::*;
pub use fixtures::*;

pub const TEST_SECRET: &str = "integration-test-secret";

/// Identity a test request is signed as.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: &'static str,
    pub name: &'static str,
    pub role: Role,
}

pub const DOCTOR: TestUser = TestUser {
    id: "doctor-1",
    name: "Dr. Jose Rizal",
    role: Role::Doctor,
};
pub const OTHER_DOCTOR: TestUser = TestUser {
    id: "doctor-2",
    name: "Dr. Gregoria de Jesus",
    role: Role::Doctor,
};
pub const NURSE: TestUser = TestUser {
    id: "nurse-1",
    name: "Nurse Melchora Aquino",
    role: Role::Nurse,
};
pub const STAFF: TestUser = TestUser {
    id: "staff-1",
    name: "Andres Bonifacio",
    role: Role::Staff,
};

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> anyhow::Result<Value> {
        serde_json::from_slice(&self.body).context("response body is JSON")
    }

    /// `data` member of the response envelope.
    pub fn data(&self) -> anyhow::Result<Value> {
        Ok(self.json()?["data"].clone())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::new_with_config(|_| {})
    }

    /// Router over the in-memory backend with maintenance jobs disabled.
    pub fn new_with_config(configure: impl FnOnce(&mut Config)) -> Self {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Memory;
        config.auth.jwt_secret = TEST_SECRET.to_string();
        config.maintenance.enabled = false;
        configure(&mut config);

        let state = AppState::in_memory(config);
        let router = create_router(state.clone());
        Self { router, state }
    }

    pub fn token(&self, user: &TestUser) -> anyhow::Result<String> {
        let claims = Claims {
            sub: user.id.to_string(),
            name: Some(user.name.to_string()),
            role: user.role,
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
            iss: None,
            aud: None,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .context("sign test token")
    }

    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        user: Option<&TestUser>,
        body: Option<&Value>,
    ) -> anyhow::Result<TestResponse> {
        let mut builder = Request::builder()
            .method(method)
            .uri(path_and_query)
            .header("host", "clinic.example.org");
        if let Some(user) = user {
            builder = builder.header("authorization", format!("Bearer {}", self.token(user)?));
        }
        let request = match body {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(value)?)),
            None => builder.body(Body::empty()),
        }
        .context("build request")?;

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> anyhow::Result<TestResponse> {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("dispatch request")?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("read response body")?;

        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }

    pub async fn get(&self, path: &str, user: &TestUser) -> anyhow::Result<TestResponse> {
        self.request(Method::GET, path, Some(user), None).await
    }

    pub async fn post(
        &self,
        path: &str,
        user: &TestUser,
        body: &Value,
    ) -> anyhow::Result<TestResponse> {
        self.request(Method::POST, path, Some(user), Some(body))
            .await
    }

    /// Create a record and return its formatted id.
    pub async fn create(&self, collection: &str, user: &TestUser, body: &Value) -> anyhow::Result<String> {
        let response = self.post(&format!("/api/{collection}"), user, body).await?;
        assert_status(response.status, StatusCode::CREATED, "create");
        let data = response.data()?;
        data["id"]
            .as_str()
            .map(str::to_string)
            .context("created record has id")
    }

    /// Number of notifications in the user's inbox.
    pub async fn inbox_total(&self, user: &TestUser) -> anyhow::Result<usize> {
        let inbox = self.get("/api/notifications", user).await?.json()?;
        Ok(list_items(&inbox)?.len())
    }
}

pub async fn with_test_app<F>(f: F) -> anyhow::Result<()>
where
    F: for<'a> FnOnce(
        &'a TestApp,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + 'a>,
    >,
{
    with_test_app_with_config(|_| {}, f).await
}

pub async fn with_test_app_with_config<C, F>(configure: C, f: F) -> anyhow::Result<()>
where
    C: FnOnce(&mut Config),
    F: for<'a> FnOnce(
        &'a TestApp,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + 'a>,
    >,
{
    let app = TestApp::new_with_config(configure);
    f(&app).await
}
