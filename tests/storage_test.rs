mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{attachment_field, multipart_body, spawn_app, title_field};
use form_builder_backend::entities::{prelude::*, sea_orm_active_enums::Role};
use form_builder_backend::services::storage::StorageService;
use http_body_util::BodyExt;
use sea_orm::EntityTrait;
use serde_json::{Value, json};
use tower::ServiceExt;

const BOUNDARY: &str = "---------------------------123456789012345678901234567";

fn upload_request(token: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/storage/upload")
        .header("Authorization", format!("Bearer {}", token))
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_upload_then_download_through_form_instance() {
    let app = spawn_app().await;
    let builder = app
        .token_with_role("sb@example.com", Role::DocBuilder)
        .await;
    let template_id = app
        .template_with_fields(&builder, "UPLOAD", json!([title_field(), attachment_field()]))
        .await;
    let user = app.user_token("uploader@example.com").await;

    // 1. Upload
    let (status, reference) = app
        .send(upload_request(
            &user,
            multipart_body(BOUNDARY, "../Quarterly Report.txt", "text/plain", "Integration test content"),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", reference);
    let storage_key = reference["storageKey"].as_str().unwrap().to_string();
    assert!(storage_key.starts_with("user_"));
    assert!(storage_key.contains("/Quarterly_Report_"));
    assert!(storage_key.ends_with(".txt"));
    assert_eq!(reference["filename"], "Quarterly Report.txt");
    assert_eq!(reference["mimeType"], "text/plain");
    assert_eq!(reference["size"], 24);
    assert!(app.storage.file_exists(&storage_key).await.unwrap());

    // 2. Attach to an instance
    let (status, instance) = app
        .request(
            "POST",
            "/form-instances",
            Some(&user),
            Some(json!({
                "templateId": template_id,
                "data": { "title": "report", "attachment": reference }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", instance);
    let file_id = instance["uploadedFiles"][0]["id"].as_i64().unwrap();

    // 3. Download as owner
    let response = app
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/storage/download/file/{}", file_id))
                .header("Authorization", format!("Bearer {}", user))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename*=UTF-8''Quarterly%20Report%2Etxt"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"Integration test content");

    // 4. Someone else is refused
    let stranger = app.user_token("stranger@example.com").await;
    let (status, _) = app
        .request(
            "GET",
            &format!("/storage/download/file/{}", file_id),
            Some(&stranger),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // 5. Missing object is reported as not found
    app.storage.delete_file(&storage_key).await.unwrap();
    let (status, _) = app
        .request(
            "GET",
            &format!("/storage/download/file/{}", file_id),
            Some(&user),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request("GET", "/storage/download/file/777", Some(&user), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_sniffs_generic_content_type() {
    let app = spawn_app().await;
    let user = app.user_token("sniff@example.com").await;

    let body = format!(
        "--{BOUNDARY}\r\n\
        Content-Disposition: form-data; name=\"file\"; filename=\"scan\"\r\n\
        Content-Type: application/octet-stream\r\n\r\n\
        %PDF-1.4 minimal\r\n\
        --{BOUNDARY}--\r\n"
    );
    let (status, reference) = app.send(upload_request(&user, body)).await;
    assert_eq!(status, StatusCode::OK, "{}", reference);
    assert_eq!(reference["mimeType"], "application/pdf");
}

#[tokio::test]
async fn test_upload_rejections() {
    let app = spawn_app().await;
    let user = app.user_token("reject@example.com").await;

    // Empty file
    let (status, body) = app
        .send(upload_request(
            &user,
            multipart_body(BOUNDARY, "empty.txt", "text/plain", ""),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    // No `file` part
    let body = format!(
        "--{BOUNDARY}\r\n\
        Content-Disposition: form-data; name=\"other\"\r\n\r\n\
        value\r\n\
        --{BOUNDARY}--\r\n"
    );
    let (status, _) = app.send(upload_request(&user, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Over the configured limit (1 MB in tests)
    let big = "a".repeat(app.state.config.max_file_size + 1);
    let (status, _) = app
        .send(upload_request(
            &user,
            multipart_body(BOUNDARY, "big.txt", "text/plain", &big),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Anonymous
    let request = Request::builder()
        .method("POST")
        .uri("/storage/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(BOUNDARY, "a.txt", "text/plain", "x")))
        .unwrap();
    let (status, _): (StatusCode, Value) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cannot_claim_another_users_upload() {
    let app = spawn_app().await;
    let builder = app
        .token_with_role("claims@example.com", Role::DocBuilder)
        .await;
    let template_id = app
        .template_with_fields(&builder, "CLAIM", json!([title_field(), attachment_field()]))
        .await;
    let alice = app.user_token("alice@example.com").await;
    let mallory = app.user_token("mallory@example.com").await;

    let (status, reference) = app
        .send(upload_request(
            &alice,
            multipart_body(BOUNDARY, "secret.txt", "text/plain", "alice-private"),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", reference);

    let (status, body) = app
        .request(
            "POST",
            "/form-instances",
            Some(&mallory),
            Some(json!({
                "templateId": template_id,
                "data": { "title": "mine now", "attachment": reference }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{}", body);

    // Keys that try to leave the storage root are rejected outright
    let (status, _) = app
        .request(
            "POST",
            "/form-instances",
            Some(&mallory),
            Some(json!({
                "templateId": template_id,
                "data": {
                    "title": "escape",
                    "attachment": { "storageKey": "user_3/../user_2/x.txt", "filename": "x.txt" }
                }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(UploadedFiles::find().all(&app.db).await.unwrap().is_empty());
    assert!(FormInstances::find().all(&app.db).await.unwrap().is_empty());

    // Nothing was recorded, so mallory has no file id to download
    let (status, _) = app
        .request("GET", "/storage/download/file/1", Some(&mallory), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The rightful owner can still attach it
    let (status, instance) = app
        .request(
            "POST",
            "/form-instances",
            Some(&alice),
            Some(json!({
                "templateId": template_id,
                "data": { "title": "mine", "attachment": reference }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", instance);
    let file_id = instance["uploadedFiles"][0]["id"].as_i64().unwrap();

    let (status, _) = app
        .request(
            "GET",
            &format!("/storage/download/file/{}", file_id),
            Some(&mallory),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
