use orion_persist::{ConversationRepository, PersistError, RemoteRepository};
use orion_types::{ClientConfig, Role, SessionContext, UserProfile};

fn profile() -> UserProfile {
    UserProfile {
        user_id: "u-1".to_string(),
        email: "ada@example.com".to_string(),
        name: "Ada".to_string(),
    }
}

fn repository(server: &mockito::Server, session: SessionContext) -> RemoteRepository {
    RemoteRepository::new(ClientConfig::new().with_base_url(server.url()), session)
}

#[tokio::test]
async fn test_list_threads_returns_unloaded_shells() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/threads")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("limit".into(), "20".into()),
            mockito::Matcher::UrlEncoded("offset".into(), "0".into()),
        ]))
        .match_header("authorization", "Bearer tok")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"threads":[
                {"id":"t-2","title":"Rust lifetimes","createdAt":"2026-01-02T10:00:00Z","updatedAt":"2026-01-02T11:00:00Z"},
                {"id":"t-1","title":"Hello","createdAt":"2026-01-01T10:00:00Z"}
            ],"hasMore":true}"#,
        )
        .create_async()
        .await;

    let repo = repository(&server, SessionContext::authenticated("tok", profile()));
    let page = repo.list_threads(20, 0).await.unwrap();

    mock.assert_async().await;
    assert!(page.has_more);
    assert_eq!(page.threads.len(), 2);
    assert_eq!(page.threads[0].id, "t-2");
    assert!(!page.threads[0].is_loaded);
    assert!(page.threads[1].updated_at.is_none());
}

#[tokio::test]
async fn test_get_messages() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/threads/t-1/messages")
        .with_status(200)
        .with_body(
            r#"{"messages":[
                {"id":"m-1","role":"user","content":"hi","timestamp":"2026-01-01T10:00:00Z"},
                {"id":"m-2","role":"assistant","content":"hello","timestamp":"2026-01-01T10:00:01Z","rating":"up"}
            ]}"#,
        )
        .create_async()
        .await;

    let repo = repository(&server, SessionContext::authenticated("tok", profile()));
    let messages = repo.get_messages("t-1").await.unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "hello");
}

#[tokio::test]
async fn test_unauthorized_maps_to_auth_expired() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/threads")
        .match_query(mockito::Matcher::Any)
        .with_status(401)
        .create_async()
        .await;

    let repo = repository(&server, SessionContext::authenticated("stale", profile()));
    let err = repo.list_threads(20, 0).await.unwrap_err();

    assert!(matches!(err, PersistError::AuthExpired));
}

#[tokio::test]
async fn test_anonymous_session_never_calls_server() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("DELETE", "/threads/t-1")
        .expect(0)
        .create_async()
        .await;

    let repo = repository(&server, SessionContext::anonymous("anon-1"));
    let err = repo.delete_thread("t-1").await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, PersistError::Unauthenticated));
}

#[tokio::test]
async fn test_expired_session_is_rejected_locally() {
    let server = mockito::Server::new_async().await;
    let session = SessionContext::authenticated("tok", profile());
    session.expire("anon-1");

    let repo = repository(&server, session);
    let err = repo.get_messages("t-1").await.unwrap_err();

    assert!(matches!(err, PersistError::AuthExpired));
}

#[tokio::test]
async fn test_rename_sends_title() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", "/threads/t-1")
        .match_body(mockito::Matcher::Json(serde_json::json!({"title": "Renamed"})))
        .with_status(204)
        .create_async()
        .await;

    let repo = repository(&server, SessionContext::authenticated("tok", profile()));
    repo.rename_thread("t-1", "Renamed").await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_keeps_status_and_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("DELETE", "/threads/t-1")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let repo = repository(&server, SessionContext::authenticated("tok", profile()));
    let err = repo.delete_thread("t-1").await.unwrap_err();

    match err {
        PersistError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
}
