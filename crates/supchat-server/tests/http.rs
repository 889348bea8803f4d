//! Router-level tests: real JWTs, real routing, in-memory database.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use tower::ServiceExt;

use supchat_api::{AppStateInner, routes};
use supchat_core::ChatService;
use supchat_db::Database;
use supchat_types::api::{Claims, Role};
use supchat_types::models::TagKind;

const SECRET: &str = "test-secret";

fn app() -> (Router, Arc<Database>) {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let state = Arc::new(AppStateInner {
        service: ChatService::with_sqlite_stores(db.clone()),
        jwt_secret: SECRET.to_string(),
    });
    (routes::router(state), db)
}

fn token(sub: &str, role: Role) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(1)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn request(method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn open_channel(app: &Router, bearer: &str) -> Value {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/channels",
            Some(bearer),
            Some(json!({ "student_ref": "S1", "supervisor_ref": "P1" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

#[tokio::test]
async fn everything_requires_a_token() {
    let (app, _db) = app();
    let (status, _) = send(&app, request("GET", "/channels", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request("GET", "/channels", Some("not-a-jwt"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn channel_creation_is_idempotent_over_http() {
    let (app, _db) = app();
    let student = token("S1", Role::Student);
    let supervisor = token("P1", Role::Supervisor);

    let first = open_channel(&app, &student).await;
    let second = open_channel(&app, &supervisor).await;
    assert_eq!(first["id"], second["id"]);
}

#[tokio::test]
async fn opening_someone_elses_channel_is_forbidden() {
    let (app, _db) = app();
    let outsider = token("S2", Role::Student);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/channels",
            Some(&outsider),
            Some(json!({ "student_ref": "S1", "supervisor_ref": "P1" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn send_page_and_mark_read_flow() {
    let (app, _db) = app();
    let student = token("S1", Role::Student);
    let supervisor = token("P1", Role::Supervisor);

    let channel = open_channel(&app, &student).await;
    let channel_id = channel["id"].as_str().unwrap().to_string();

    for body in ["a", "b", "c"] {
        let (status, _) = send(
            &app,
            request(
                "POST",
                &format!("/channels/{channel_id}/messages"),
                Some(&student),
                Some(json!({ "body": body, "kind": "plain" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // First page of 2, then the rest through the cursor.
    let (status, page) = send(
        &app,
        request(
            "GET",
            &format!("/channels/{channel_id}/messages?limit=2"),
            Some(&supervisor),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let bodies: Vec<&str> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["body"].as_str().unwrap())
        .collect();
    assert_eq!(bodies, ["a", "b"]);
    let cursor = page["next_cursor"].as_str().unwrap().to_string();

    let (status, page) = send(
        &app,
        request(
            "GET",
            &format!("/channels/{channel_id}/messages?limit=2&cursor={cursor}"),
            Some(&supervisor),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["items"][0]["body"], "c");
    assert!(page.get("next_cursor").is_none());

    // Read badge: three unread for the supervisor, then zero.
    let (status, read) = send(
        &app,
        request(
            "POST",
            &format!("/channels/{channel_id}/read"),
            Some(&supervisor),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["count"], 3);

    let (_, read) = send(
        &app,
        request(
            "POST",
            &format!("/channels/{channel_id}/read"),
            Some(&supervisor),
            None,
        ),
    )
    .await;
    assert_eq!(read["count"], 0);
}

#[tokio::test]
async fn empty_body_is_rejected_with_400() {
    let (app, _db) = app();
    let student = token("S1", Role::Student);
    let channel = open_channel(&app, &student).await;
    let channel_id = channel["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        request(
            "POST",
            &format!("/channels/{channel_id}/messages"),
            Some(&student),
            Some(json!({ "body": "   ", "kind": "plain" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unknown_channel_is_404() {
    let (app, _db) = app();
    let student = token("S1", Role::Student);
    let missing = uuid::Uuid::new_v4();

    let (status, _) = send(
        &app,
        request(
            "GET",
            &format!("/channels/{missing}/messages"),
            Some(&student),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_party_cannot_read_a_channel() {
    let (app, _db) = app();
    let student = token("S1", Role::Student);
    let outsider = token("P9", Role::Supervisor);

    let channel = open_channel(&app, &student).await;
    let channel_id = channel["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        request(
            "GET",
            &format!("/channels/{channel_id}/messages"),
            Some(&outsider),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn tagged_message_keeps_its_snapshot_and_search_finds_it() {
    let (app, db) = app();
    let student = token("S1", Role::Student);

    let channel = open_channel(&app, &student).await;
    let channel_id = channel["id"].as_str().unwrap().to_string();

    db.upsert_task("T1", "S1", "Write intro", "Chapter one", "open")
        .unwrap();

    let (status, sent) = send(
        &app,
        request(
            "POST",
            &format!("/channels/{channel_id}/messages"),
            Some(&student),
            Some(json!({
                "body": "please review this task",
                "kind": "task_tag",
                "tag": { "kind": "task", "target_id": "T1" }
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["tag"]["snapshot"]["title"], "Write intro");

    // The target disappears; the stored message does not change.
    db.delete_artifact(TagKind::Task, "T1").unwrap();

    let (_, page) = send(
        &app,
        request(
            "GET",
            &format!("/channels/{channel_id}/messages"),
            Some(&student),
            None,
        ),
    )
    .await;
    assert_eq!(page["items"][0]["tag"]["snapshot"]["title"], "Write intro");

    let (status, hits) = send(
        &app,
        request(
            "GET",
            &format!("/channels/{channel_id}/search?q=REVIEW&kind=task_tag"),
            Some(&student),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits["items"].as_array().unwrap().len(), 1);

    // And the taggable catalog is live, so T1 is gone from it.
    let (status, catalog) = send(
        &app,
        request("GET", "/students/S1/taggable", Some(&student), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(catalog["tasks"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn conversation_list_shows_unread_badges() {
    let (app, _db) = app();
    let student = token("S1", Role::Student);
    let supervisor = token("P1", Role::Supervisor);

    let channel = open_channel(&app, &student).await;
    let channel_id = channel["id"].as_str().unwrap();

    send(
        &app,
        request(
            "POST",
            &format!("/channels/{channel_id}/messages"),
            Some(&student),
            Some(json!({ "body": "hello", "kind": "plain" })),
        ),
    )
    .await;

    let (status, list) = send(&app, request("GET", "/channels", Some(&supervisor), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["items"][0]["unread_count"], 1);
    assert_eq!(list["items"][0]["student_ref"], "S1");
}
