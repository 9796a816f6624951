use std::time::Duration;

use gns_core::notify::{Attachment, NotificationClient, Submission};
use gns_core::ApiError;
use mockito::{Matcher, Server};
use serde_json::{json, Map};
use tokio::net::TcpListener;

#[tokio::test]
async fn test_missing_task_id_never_hits_network() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/notify")
        .expect(0)
        .create_async()
        .await;

    let client = NotificationClient::new(&server.url(), "tok").expect("build client");
    let err = client
        .send_notification(&Submission::new("").data(Map::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Validation(ref reason) if reason.contains("taskId")));

    let err = client
        .send_notification(&Submission::new("T1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(ref reason) if reason.contains("data")));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_success_body_is_returned_verbatim() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/notify")
        .match_header("authorization", "Bearer tok")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"taskId": "T1", "data": {"name": "x"}})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"queued"}"#)
        .create_async()
        .await;

    let client = NotificationClient::new(&format!("{}/", server.url()), "tok").expect("build client");
    let response = client
        .send_notification(&Submission::new("T1").var("name", "x"))
        .await
        .expect("send succeeds");

    mock.assert_async().await;
    assert_eq!(response, json!({"status": "queued"}));
}

#[tokio::test]
async fn test_attachments_and_priority_on_the_wire() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v1/notify")
        .match_body(Matcher::Json(json!({
            "taskId": "T1",
            "data": {},
            "attachments": [{"filename": "a.txt", "content": "aGVsbG8="}],
            "priority": "High"
        })))
        .with_status(200)
        .with_body(r#"{"id":42,"status":"PENDING"}"#)
        .create_async()
        .await;

    let client = NotificationClient::new(&server.url(), "tok").expect("build client");
    let submission = Submission::new("T1")
        .data(Map::new())
        .attachment(Attachment::bytes("a.txt", b"hello".to_vec()))
        .priority("High");
    let response = client.send_notification(&submission).await.expect("send succeeds");

    mock.assert_async().await;
    assert_eq!(response["id"], 42);
}

#[tokio::test]
async fn test_server_error_carries_status_message_and_body() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/v1/notify")
        .with_status(500)
        .with_body(r#"{"error":"overloaded"}"#)
        .create_async()
        .await;

    let client = NotificationClient::new(&server.url(), "tok").expect("build client");
    let err = client
        .send_notification(&Submission::new("T1").var("name", "x"))
        .await
        .unwrap_err();

    match err {
        ApiError::Http {
            status,
            message,
            body,
        } => {
            assert_eq!(status, 500);
            assert_eq!(message, "overloaded");
            assert_eq!(body, r#"{"error":"overloaded"}"#);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_unauthorized_is_plain_api_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/v1/notify")
        .with_status(401)
        .with_body(r#"{"error":"Invalid API token"}"#)
        .create_async()
        .await;

    let client = NotificationClient::new(&server.url(), "bad").expect("build client");
    let err = client
        .send_notification(&Submission::new("T1").var("name", "x"))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Invalid API token");
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    // Accepts connections and never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let client = NotificationClient::builder(&format!("http://{}", addr), "tok")
        .timeout(Duration::from_millis(200))
        .build()
        .expect("build client");
    let err = client
        .send_notification(&Submission::new("T1").var("name", "x"))
        .await
        .unwrap_err();

    match err {
        ApiError::Transport(ref source) => assert!(source.is_timeout()),
        ref other => panic!("expected transport error, got {:?}", other),
    }
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("listener address");
    drop(listener);

    let client = NotificationClient::new(&format!("http://{}", addr), "tok").expect("build client");
    let err = client
        .send_notification(&Submission::new("T1").var("name", "x"))
        .await
        .unwrap_err();

    assert!(err.is_transport());
}
