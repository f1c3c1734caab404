//! End-to-end tests through the router.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use broadsheet::{AppState, router};
use broadsheet_core::{Database, MailTransport, OutgoingMail, TransportError, UserRepository};
use serde_json::{Value, json};
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "admin-token";

/// Delivers everything except mail to addresses starting with `bounce`.
#[derive(Default)]
struct ScriptedTransport {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl MailTransport for ScriptedTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError> {
        let to = mail.to.join(",");
        if to.starts_with("bounce") {
            return Err(TransportError::Other("550 mailbox unavailable".into()));
        }
        self.sent.lock().unwrap().push(to);
        Ok(())
    }
}

struct Harness {
    app: Router,
    transport: Arc<ScriptedTransport>,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }
}

impl Harness {
    async fn new() -> Self {
        let db = Database::in_memory().await.unwrap();
        UserRepository::new(&db)
            .ensure_superuser("admin@example.com", ADMIN_TOKEN)
            .await
            .unwrap();
        let transport = Arc::new(ScriptedTransport::default());
        let state = AppState::new(
            &db,
            transport.clone(),
            "news@example.com",
            Duration::from_secs(60),
        );
        Self {
            app: router(state),
            transport,
        }
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
        Reply {
            status,
            headers,
            body,
        }
    }

    /// Register a user and return `(id, token)`.
    async fn register(&self, name: &str) -> (i64, String) {
        let reply = self
            .call(
                Method::POST,
                "/users",
                None,
                Some(json!({ "email": format!("{name}@example.com"), "username": name })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        let body = reply.json();
        (
            body["user"]["id"].as_i64().unwrap(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    async fn recipient(&self, token: &str, email: &str, name: &str) -> i64 {
        let reply = self
            .call(
                Method::POST,
                "/recipients",
                Some(token),
                Some(json!({ "email": email, "full_name": name, "comment": "list" })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        reply.json()["id"].as_i64().unwrap()
    }

    async fn message(&self, token: &str, subject: &str) -> i64 {
        let reply = self
            .call(
                Method::POST,
                "/messages",
                Some(token),
                Some(json!({ "subject": subject, "body": "Hello there" })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        reply.json()["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn test_health_and_registration() {
    let h = Harness::new().await;

    let reply = h.call(Method::GET, "/healthz", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);

    let (id, token) = h.register("ann").await;
    let me = h.call(Method::GET, "/users/me", Some(&token), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json()["id"], json!(id));
    assert!(me.json().get("token").is_none());

    let duplicate = h
        .call(
            Method::POST,
            "/users",
            None,
            Some(json!({ "email": "ANN@example.com", "username": "ann2" })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(duplicate.json()["errors"]["email"].is_array());
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let h = Harness::new().await;

    let reply = h.call(Method::GET, "/recipients", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.headers[header::WWW_AUTHENTICATE], "Bearer");

    let reply = h.call(Method::GET, "/recipients", Some("nope"), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_recipient_ownership() {
    let h = Harness::new().await;
    let (_, ann) = h.register("ann").await;
    let (_, bob) = h.register("bob").await;

    let id = h.recipient(&ann, "Reader@Example.com", "Reader").await;

    let duplicate = h
        .call(
            Method::POST,
            "/recipients",
            Some(&bob),
            Some(json!({ "email": "reader@example.com", "full_name": "Other", "comment": "x" })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::UNPROCESSABLE_ENTITY);

    // Bob only sees his own recipients, and cannot delete Ann's.
    let listing = h.call(Method::GET, "/recipients", Some(&bob), None).await;
    assert_eq!(listing.json(), json!([]));

    let denied = h
        .call(Method::DELETE, &format!("/recipients/{id}"), Some(&bob), None)
        .await;
    assert_eq!(denied.status, StatusCode::SEE_OTHER);
    assert_eq!(denied.headers[header::LOCATION], "/recipients");

    let still_there = h
        .call(Method::GET, &format!("/recipients/{id}"), Some(&ann), None)
        .await;
    assert_eq!(still_there.status, StatusCode::OK);
    assert_eq!(still_there.json()["email"], "reader@example.com");

    let deleted = h
        .call(Method::DELETE, &format!("/recipients/{id}"), Some(&ann), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = h
        .call(Method::GET, &format!("/recipients/{id}"), Some(&ann), None)
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_message_denylist_flags_both_fields() {
    let h = Harness::new().await;
    let (_, ann) = h.register("ann").await;

    let reply = h
        .call(
            Method::POST,
            "/messages",
            Some(&ann),
            Some(json!({ "subject": "Offer", "body": "Казино" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    let errors = &reply.json()["errors"];
    assert_eq!(errors["subject"], json!(["forbidden word"]));
    assert_eq!(errors["body"], json!(["forbidden word"]));

    // Without a subject the same body is accepted.
    let reply = h
        .call(
            Method::POST,
            "/messages",
            Some(&ann),
            Some(json!({ "body": "казино" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_send_block_and_statistics() {
    let h = Harness::new().await;
    let (_, ann) = h.register("ann").await;
    let (bob_id, bob) = h.register("bob").await;

    let good = h.recipient(&ann, "reader@example.com", "Reader").await;
    let bad = h.recipient(&ann, "bounce@example.com", "Bounce").await;
    let message = h.message(&ann, "Weekly").await;

    let created = h
        .call(
            Method::POST,
            "/newsletters",
            Some(&ann),
            Some(json!({ "message_id": message, "recipient_ids": [good, bad] })),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.json()["status"], "created");
    let newsletter = created.json()["id"].as_i64().unwrap();

    // Bob may not send Ann's newsletter.
    let denied = h
        .call(Method::POST, &format!("/newsletters/{newsletter}/send"), Some(&bob), None)
        .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.text(), "You do not have permission to change this newsletter.");

    let sent = h
        .call(Method::POST, &format!("/newsletters/{newsletter}/send"), Some(&ann), None)
        .await;
    assert_eq!(sent.status, StatusCode::OK);
    let summary = sent.text();
    assert!(summary.starts_with("Newsletter sent! Succeeded: 1, Failed: 1\nReports:\n"));
    assert!(summary.contains("Success: reader@example.com"));
    assert!(summary.contains("Failure: bounce@example.com - "));
    assert_eq!(*h.transport.sent.lock().unwrap(), vec!["reader@example.com"]);

    let detail = h
        .call(Method::GET, &format!("/newsletters/{newsletter}"), Some(&ann), None)
        .await;
    assert_eq!(detail.json()["status"], "completed");
    assert_eq!(detail.json()["success"], false);

    let attempts = h.call(Method::GET, "/attempts", Some(&ann), None).await;
    assert_eq!(attempts.json().as_array().unwrap().len(), 1);
    assert_eq!(attempts.json()[0]["recipient_ids"], json!([good]));

    // Blocking needs the permission; the superuser grants it to Bob.
    let refused = h
        .call(
            Method::POST,
            &format!("/newsletters/{newsletter}/block"),
            Some(&bob),
            Some(json!({ "is_blocked": true })),
        )
        .await;
    assert_eq!(refused.status, StatusCode::FORBIDDEN);
    assert_eq!(refused.text(), "You do not have permission to block newsletters.");

    let granted = h
        .call(
            Method::PUT,
            &format!("/users/{bob_id}/permissions"),
            Some(ADMIN_TOKEN),
            Some(json!({ "permissions": ["disable_newsletters"] })),
        )
        .await;
    assert_eq!(granted.status, StatusCode::OK);

    let blocked = h
        .call(
            Method::POST,
            &format!("/newsletters/{newsletter}/block"),
            Some(&bob),
            Some(json!({ "is_blocked": true })),
        )
        .await;
    assert_eq!(blocked.status, StatusCode::OK);
    assert_eq!(blocked.json()["is_blocked"], true);

    let conflict = h
        .call(Method::POST, &format!("/newsletters/{newsletter}/send"), Some(&ann), None)
        .await;
    assert_eq!(conflict.status, StatusCode::CONFLICT);
    let attempts = h.call(Method::GET, "/attempts", Some(&ann), None).await;
    assert_eq!(attempts.json().as_array().unwrap().len(), 1);

    let stats = h.call(Method::GET, "/stats", Some(&ann), None).await;
    assert_eq!(stats.status, StatusCode::OK);
    let stats = stats.json();
    assert_eq!(stats["total_mailings"], 1);
    assert_eq!(stats["successful_mailings"], 0);
    assert_eq!(stats["failed_mailings"], 1);

    let dashboard = h.call(Method::GET, "/", None, None).await;
    assert_eq!(
        dashboard.json(),
        json!({ "total_campaigns": 1, "active_campaigns": 0, "unique_recipients": 2 })
    );
}

#[tokio::test]
async fn test_clearing_attempts_is_staff_only() {
    let h = Harness::new().await;
    let (ann_id, ann) = h.register("ann").await;

    let reply = h.call(Method::POST, "/attempts/clear", Some(&ann), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.text(), "You do not have permission to clear attempts.");

    let staffed = h
        .call(
            Method::PATCH,
            &format!("/users/{ann_id}/staff"),
            Some(ADMIN_TOKEN),
            Some(json!({ "is_staff": true })),
        )
        .await;
    assert_eq!(staffed.status, StatusCode::OK);
    assert_eq!(staffed.json()["is_staff"], true);

    let reply = h.call(Method::POST, "/attempts/clear", Some(&ann), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({ "deleted": 0 }));
}

#[tokio::test]
async fn test_user_administration_needs_superuser() {
    let h = Harness::new().await;
    let (ann_id, ann) = h.register("ann").await;
    let (bob_id, _) = h.register("bob").await;

    let reply = h
        .call(Method::DELETE, &format!("/users/{bob_id}"), Some(&ann), None)
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.text(), "You do not have permission to manage users.");

    let reply = h
        .call(
            Method::PATCH,
            &format!("/users/{ann_id}/staff"),
            Some(&ann),
            Some(json!({ "is_staff": true })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = h
        .call(Method::DELETE, &format!("/users/{bob_id}"), Some(ADMIN_TOKEN), None)
        .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_form_descriptors() {
    let h = Harness::new().await;
    let (_, ann) = h.register("ann").await;

    let reply = h.call(Method::GET, "/users/form", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()[0]["name"], "email");

    let reply = h.call(Method::GET, "/messages/form", Some(&ann), None).await;
    let fields = reply.json();
    assert_eq!(fields[0]["name"], "subject");
    assert_eq!(fields[0]["required"], false);
    assert_eq!(fields[1]["class"], "form-control");

    let reply = h.call(Method::GET, "/newsletters/form", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}
