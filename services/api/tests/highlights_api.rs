//! End-to-end tests of the HTTP API over the in-memory storage adapter.

use api_lib::{
    adapters::MemoryAdapter,
    config::Config,
    web::{router, state::AppState},
};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const ADMIN_SECRET: &str = "letmein";
const PARAGRAPH: &str = "The quick brown fox";

fn app() -> Router {
    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://unused".to_string()),
        "ADMIN_SECRET" => Some(ADMIN_SECRET.to_string()),
        _ => None,
    })
    .expect("test config");
    let state = AppState::with_storage(Arc::new(MemoryAdapter::new()), Arc::new(config));
    router(Arc::new(state))
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn signup(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "username": username, "password": "hunter2" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["token"].as_str().unwrap().to_string()
}

async fn admin_token(app: &Router) -> String {
    let (status, _) = send(
        app,
        Method::POST,
        "/auth/admin",
        None,
        Some(json!({ "username": "root", "password": "toor", "secret": ADMIN_SECRET })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "root", "password": "toor" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");
    body["token"].as_str().unwrap().to_string()
}

async fn create_course(app: &Router, admin: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/courses",
        Some(admin),
        Some(json!({
            "title": "Foxes",
            "chapters": [{
                "heading": "Intro",
                "subheadings": [{
                    "title": "Speed",
                    "points": ["fast", "brown"],
                    "paragraph": PARAGRAPH
                }]
            }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

async fn highlight(app: &Router, token: &str, course_id: &str, text: &str, start: usize, end: usize) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/highlights",
        Some(token),
        Some(json!({
            "course_id": course_id,
            "field": "ch0_sub0_para",
            "text": text,
            "start_offset": start,
            "end_offset": end
        })),
    )
    .await
}

#[tokio::test]
async fn highlight_lifecycle() {
    let app = app();
    let admin = admin_token(&app).await;
    let reader = signup(&app, "ada").await;
    let course_id = create_course(&app, &admin).await;

    let (status, created) = highlight(&app, &reader, &course_id, "uick", 5, 9).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["color"], "#ffeb3b");
    assert_eq!(created["field"], "ch0_sub0_para");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, rendered) = send(
        &app,
        Method::GET,
        &format!("/courses/{}/fields/ch0_sub0_para/segments", course_id),
        Some(reader.as_str()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        rendered["segments"],
        json!([
            { "kind": "plain", "text": "The q" },
            { "kind": "highlighted", "text": "uick", "color": "#ffeb3b", "id": id },
            { "kind": "plain", "text": " brown fox" }
        ])
    );

    let (status, listed) = send(&app, Method::GET, &format!("/highlights/{}", course_id), Some(reader.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    for _ in 0..2 {
        let (status, _) = send(&app, Method::DELETE, &format!("/highlights/{}", id), Some(reader.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, listed) = send(&app, Method::GET, &format!("/highlights/{}", course_id), Some(reader.as_str()), None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn highlights_are_private_to_their_owner() {
    let app = app();
    let admin = admin_token(&app).await;
    let owner = signup(&app, "ada").await;
    let stranger = signup(&app, "grace").await;
    let course_id = create_course(&app, &admin).await;

    let (_, created) = highlight(&app, &owner, &course_id, "brown", 10, 15).await;
    let id = created["id"].as_str().unwrap();

    let (_, seen) = send(&app, Method::GET, &format!("/highlights/{}", course_id), Some(stranger.as_str()), None).await;
    assert_eq!(seen, json!([]));

    let (status, _) = send(&app, Method::DELETE, &format!("/highlights/{}", id), Some(stranger.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, kept) = send(&app, Method::GET, &format!("/highlights/{}", course_id), Some(owner.as_str()), None).await;
    assert_eq!(kept.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn overlapping_highlights_render_without_merging() {
    let app = app();
    let admin = admin_token(&app).await;
    let reader = signup(&app, "ada").await;
    let course_id = create_course(&app, &admin).await;

    highlight(&app, &reader, &course_id, "quick brown", 4, 15).await;
    highlight(&app, &reader, &course_id, "The quick", 0, 9).await;

    let (_, rendered) = send(
        &app,
        Method::GET,
        &format!("/courses/{}/fields/ch0_sub0_para/segments", course_id),
        Some(reader.as_str()),
        None,
    )
    .await;
    let texts: Vec<&str> = rendered["segments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["The quick", "quick brown", " fox"]);
}

#[tokio::test]
async fn rejects_malformed_highlights() {
    let app = app();
    let admin = admin_token(&app).await;
    let reader = signup(&app, "ada").await;
    let course_id = create_course(&app, &admin).await;

    let (status, _) = highlight(&app, &reader, &course_id, "uick", 9, 5).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = highlight(&app, &reader, &course_id, "   ", 5, 9).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let past_column = i32::MAX as usize + 1;
    let (status, _) = highlight(&app, &reader, &course_id, "uick", 5, past_column).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/highlights",
        Some(reader.as_str()),
        Some(json!({
            "course_id": course_id,
            "field": "paragraph-one",
            "text": "uick",
            "start_offset": 5,
            "end_offset": 9
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = highlight(&app, &reader, &uuid::Uuid::new_v4().to_string(), "uick", 5, 9).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_field_has_no_segments() {
    let app = app();
    let admin = admin_token(&app).await;
    let reader = signup(&app, "ada").await;
    let course_id = create_course(&app, &admin).await;

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/courses/{}/fields/ch4_sub0_para/segments", course_id),
        Some(reader.as_str()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/courses/{}/fields/ch0_sub0_pt1/segments", course_id),
        Some(reader.as_str()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["segments"], json!([{ "kind": "plain", "text": "brown" }]));
}

#[tokio::test]
async fn deleting_a_course_removes_its_highlights() {
    let app = app();
    let admin = admin_token(&app).await;
    let reader = signup(&app, "ada").await;
    let course_id = create_course(&app, &admin).await;
    highlight(&app, &reader, &course_id, "uick", 5, 9).await;

    let (status, _) = send(&app, Method::DELETE, &format!("/courses/{}", course_id), Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, listed) = send(&app, Method::GET, &format!("/highlights/{}", course_id), Some(reader.as_str()), None).await;
    assert_eq!(listed, json!([]));
    let (status, _) = send(&app, Method::GET, &format!("/courses/{}", course_id), Some(reader.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn course_writes_are_admin_only() {
    let app = app();
    let admin = admin_token(&app).await;
    let reader = signup(&app, "ada").await;
    let course_id = create_course(&app, &admin).await;

    let (status, _) = send(&app, Method::POST, "/courses", Some(reader.as_str()), Some(json!({ "title": "Mine" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::DELETE, &format!("/courses/{}", course_id), Some(reader.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/courses/{}", course_id),
        Some(admin.as_str()),
        Some(json!({ "title": "Foxes, revised" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Foxes, revised");
    assert_eq!(updated["chapters"], json!([]));

    let (status, courses) = send(&app, Method::GET, "/courses", Some(reader.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(courses.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn admins_manage_reader_accounts() {
    let app = app();
    let admin = admin_token(&app).await;
    let ada = signup(&app, "ada").await;
    let bob = signup(&app, "bob").await;
    let course_id = create_course(&app, &admin).await;
    highlight(&app, &bob, &course_id, "uick", 5, 9).await;

    let (status, _) = send(&app, Method::GET, "/users", Some(ada.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = send(&app, Method::GET, "/users", Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["ada", "bob"]);
    assert!(users[0].get("hashed_password").is_none());
    let bob_id = users[1]["user_id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, Method::DELETE, &format!("/users/{}", bob_id), Some(ada.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::DELETE, &format!("/users/{}", bob_id), Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted");

    let (status, _) = send(&app, Method::GET, "/courses", Some(bob.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (_, users) = send(&app, Method::GET, "/users", Some(admin.as_str()), None).await;
    assert_eq!(users.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::DELETE, &format!("/users/{}", bob_id), Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let app = app();
    let admin = admin_token(&app).await;
    let title = "x".repeat(5 * 1024 * 1024);

    let (status, _) = send(&app, Method::POST, "/courses", Some(admin.as_str()), Some(json!({ "title": title }))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn auth_flow() {
    let app = app();

    let (status, _) = send(&app, Method::GET, "/courses", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, Method::GET, "/courses", Some("not-a-session"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = signup(&app, "ada").await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "username": "ada", "password": "again" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "ada", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/admin",
        None,
        Some(json!({ "username": "eve", "password": "x", "secret": "guess" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, "/courses", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::POST, "/auth/logout", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, "/courses", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
