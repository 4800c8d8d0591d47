//! Wire-level behavior of the async operations.
//!
//! Uses wiremock for the reqwest transport and an in-memory recording
//! transport where the test needs to inspect every outgoing request.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lighterbase_core::{
    ApiError, DeletePayload, HttpRequest, HttpResponse, InsertPayload, Row, SearchPayload,
    StaticCookies, TableClient, TokenProvider, Transport, UpdatePayload,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Answers every request with a fixed response and keeps what it was sent.
#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<HttpRequest>>,
}

#[async_trait]
impl Transport for Recorder {
    async fn send(&self, request: HttpRequest) -> lighterbase_core::Result<HttpResponse> {
        self.sent.lock().unwrap().push(request);
        Ok(HttpResponse {
            status: 204,
            headers: Vec::new(),
            body: String::new(),
        })
    }
}

fn row(value: serde_json::Value) -> InsertPayload {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn search_table_posts_paging_query_and_returns_body() {
    let server = MockServer::start().await;
    let page = json!({
        "items": [{"id": 1, "name": "a"}, {"id": 2, "name": "b"}],
        "page": 2,
        "perPage": 10,
        "totalPages": 5,
        "totalItems": 42
    });

    Mock::given(method("POST"))
        .and(path("/api/auto/view/items"))
        .and(query_param("page", "2"))
        .and(query_param("perpage", "10"))
        .and(header("content-type", "application/json"))
        .and(header("authorization", "Bearer tok"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(page.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let client = TableClient::new(&server.uri(), Some(TokenProvider::fixed("tok"))).unwrap();
    let result = client
        .search_table::<Row>(&SearchPayload::default(), "items", 2, 10)
        .await
        .unwrap();

    assert_eq!(serde_json::to_value(&result).unwrap(), page);
}

#[tokio::test]
async fn delete_table_sends_where_and_accepts_no_content() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/auto/delete/items"))
        .and(body_json(json!({"WHERE": {"id": 1}})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = TableClient::new(&server.uri(), Some(TokenProvider::fixed("tok"))).unwrap();
    client
        .delete_table(&DeletePayload { where_: json!({"id": 1}) }, "items")
        .await
        .unwrap();
}

#[tokio::test]
async fn insert_table_returns_creation_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auto/create/items"))
        .and(header("authorization", "Bearer tok"))
        .and(body_json(json!({"name": "widget"})))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"id": "abc", "status": 201, "message": "created"})),
        )
        .mount(&server)
        .await;

    let client = TableClient::new(&server.uri(), Some(TokenProvider::fixed("tok"))).unwrap();
    let created = client
        .insert_table(&row(json!({"name": "widget"})), "items")
        .await
        .unwrap();
    assert_eq!(created.id, "abc");
    assert_eq!(created.base.message.as_deref(), Some("created"));
}

#[tokio::test]
async fn users_insert_omits_authorization() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auto/create/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "u1"})))
        .mount(&server)
        .await;

    let client = TableClient::new(&server.uri(), Some(TokenProvider::fixed("tok"))).unwrap();
    client
        .insert_table(&row(json!({"email": "a@b.c"})), "users")
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn backend_message_is_the_error_message() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/auto/update/items"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "not found"})))
        .mount(&server)
        .await;

    let client = TableClient::new(&server.uri(), Some(TokenProvider::fixed("tok"))).unwrap();
    let payload = UpdatePayload {
        set: row(json!({"name": "x"})),
        where_: json!({"id": 9}),
    };
    let err = client.update_table(&payload, "items").await.unwrap_err();
    assert_eq!(err.to_string(), "not found");
}

#[tokio::test]
async fn unparseable_error_body_reports_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/auto/view/items"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let client = TableClient::new(&server.uri(), Some(TokenProvider::fixed("tok"))).unwrap();
    let err = client
        .search_table::<Row>(&SearchPayload::default(), "items", 1, 10)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Http { status: 503, .. }));
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn token_absent_from_authorization_when_no_cookie_store() {
    let recorder = Arc::new(Recorder::default());
    let client = TableClient::builder("http://db.local")
        .shared_transport(recorder.clone())
        .build()
        .unwrap();

    client
        .delete_table(&DeletePayload { where_: json!({}) }, "items")
        .await
        .unwrap();

    let sent = recorder.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].header("Authorization"), None);
}

#[tokio::test]
async fn cookie_token_is_sent_when_available() {
    let recorder = Arc::new(Recorder::default());
    let client = TableClient::builder("http://db.local")
        .token_provider(TokenProvider::cookies(StaticCookies(
            "authToken=from-cookie".to_string(),
        )))
        .shared_transport(recorder.clone())
        .build()
        .unwrap();

    client
        .delete_table(&DeletePayload { where_: json!({}) }, "items")
        .await
        .unwrap();

    let sent = recorder.sent.lock().unwrap();
    assert_eq!(sent[0].header("Authorization"), Some("Bearer from-cookie"));
}

#[tokio::test]
async fn dynamic_provider_is_invoked_per_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let recorder = Arc::new(Recorder::default());
    let client = TableClient::builder("http://db.local")
        .token_provider(TokenProvider::dynamic(move || {
            format!("rotated-{}", counter.fetch_add(1, Ordering::SeqCst) + 1)
        }))
        .shared_transport(recorder.clone())
        .build()
        .unwrap();

    let delete = DeletePayload { where_: json!({"id": 1}) };
    let update = UpdatePayload {
        set: row(json!({"a": 1})),
        where_: json!({"id": 1}),
    };
    client.delete_table(&delete, "items").await.unwrap();
    client.update_table(&update, "items").await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let sent = recorder.sent.lock().unwrap();
    assert_eq!(sent[0].header("Authorization"), Some("Bearer rotated-1"));
    assert_eq!(sent[1].header("Authorization"), Some("Bearer rotated-2"));
}

#[tokio::test]
async fn dynamic_provider_not_invoked_for_signup() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let recorder = Arc::new(Recorder::default());
    let client = TableClient::builder("http://db.local")
        .token_provider(TokenProvider::dynamic(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            "tok".to_string()
        }))
        .shared_transport(recorder.clone())
        .build()
        .unwrap();

    // The recorder answers 204, which a create call cannot decode.
    let err = client
        .insert_table(&row(json!({"email": "a@b.c"})), "users")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Deserialization(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.sent.lock().unwrap()[0].header("Authorization"), None);
}
