#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use form_builder_backend::config::SecurityConfig;
use form_builder_backend::entities::sea_orm_active_enums::Role;
use form_builder_backend::infrastructure::database;
use form_builder_backend::services::storage::{LocalStorageService, StorageService};
use form_builder_backend::services::user_service::UserService;
use form_builder_backend::{AppState, create_app};
use http_body_util::BodyExt;
use sea_orm::{Database, DatabaseConnection};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const PASSWORD: &str = "s3cret-passw0rd";

pub struct TestApp {
    pub app: Router,
    pub db: DatabaseConnection,
    pub state: AppState,
    pub storage: Arc<LocalStorageService>,
    // Keeps the upload directory alive for the duration of the test.
    pub _upload_dir: TempDir,
}

pub fn test_config() -> SecurityConfig {
    SecurityConfig {
        jwt_secret: "test-access-secret".to_string(),
        jwt_refresh_secret: "test-refresh-secret".to_string(),
        max_file_size: 1024 * 1024,
        ..SecurityConfig::default()
    }
}

pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    database::run_migrations(&db).await.unwrap();
    db
}

pub async fn spawn_app() -> TestApp {
    let db = setup_test_db().await;
    let upload_dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalStorageService::new(upload_dir.path()).await.unwrap());
    let state = AppState::new(
        db.clone(),
        storage.clone() as Arc<dyn StorageService>,
        test_config(),
    );
    let app = create_app(state.clone());

    TestApp {
        app,
        db,
        state,
        storage,
        _upload_dir: upload_dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
        };
        (status, json)
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn register(&self, email: &str) -> Value {
        let (status, body) = self
            .request(
                "POST",
                "/auth/register",
                None,
                Some(json!({ "email": email, "password": PASSWORD, "name": "Tester" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body
    }

    /// Logs in and returns `(access_token, refresh_token)`.
    pub async fn login(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .request(
                "POST",
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        (
            body["accessToken"].as_str().unwrap().to_string(),
            body["refreshToken"].as_str().unwrap().to_string(),
        )
    }

    pub async fn set_role(&self, email: &str, role: Role) {
        UserService::new(self.db.clone())
            .set_role(email, role)
            .await
            .unwrap();
    }

    /// Registers a user and returns a fresh access token for them.
    pub async fn user_token(&self, email: &str) -> String {
        self.register(email).await;
        self.login(email).await.0
    }

    /// Registers a user with the given role and logs them in after the
    /// promotion so the token carries the new role.
    pub async fn token_with_role(&self, email: &str, role: Role) -> String {
        self.register(email).await;
        self.set_role(email, role).await;
        self.login(email).await.0
    }

    /// Creates a template as `token` and attaches `fields`, returning its id.
    pub async fn template_with_fields(&self, token: &str, code: &str, fields: Value) -> i64 {
        let (status, body) = self
            .request(
                "POST",
                "/form-templates",
                Some(token),
                Some(json!({ "uniqueCode": code, "name": format!("Template {}", code) })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "template create failed: {}", body);
        let id = body["id"].as_i64().unwrap();

        let (status, body) = self
            .request(
                "PATCH",
                &format!("/form-templates/{}/structure", id),
                Some(token),
                Some(json!({ "structureDefinition": fields })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "structure update failed: {}", body);
        id
    }
}

pub fn title_field() -> Value {
    json!({
        "id": "f1",
        "order": 0,
        "name": "title",
        "label": "Title",
        "type": "text",
        "required": true
    })
}

pub fn attachment_field() -> Value {
    json!({
        "id": "f2",
        "order": 1,
        "name": "attachment",
        "label": "Attachment",
        "type": "file",
        "required": false
    })
}

pub fn multipart_body(boundary: &str, filename: &str, content_type: &str, content: &str) -> String {
    format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
        Content-Type: {content_type}\r\n\r\n\
        {content}\r\n\
        --{boundary}--\r\n"
    )
}
