use mockito::Matcher;
use orion_client::{AuthClient, ClientError, ConversationSync};
use orion_persist::{
    ConversationStore, KeyValueStore, LocalSnapshot, MemoryStore, PersistError, RemoteRepository,
    SnapshotWriter, StoreHandle,
};
use orion_types::{ClientConfig, Delta, SessionContext, Thread, UserProfile, WELCOME_TITLE};
use std::sync::Arc;
use std::time::Duration;

fn profile() -> UserProfile {
    UserProfile {
        user_id: "u-1".to_string(),
        email: "ada@example.com".to_string(),
        name: "Ada".to_string(),
    }
}

struct Fixture {
    store: StoreHandle,
    session: SessionContext,
    snapshot: LocalSnapshot,
    kv: Arc<MemoryStore>,
    sync: ConversationSync,
}

fn fixture(server: &mockito::Server, session: SessionContext) -> Fixture {
    let config = ClientConfig::new().with_base_url(server.url()).with_page_size(2);
    let kv = Arc::new(MemoryStore::new());
    let snapshot = LocalSnapshot::new(kv.clone());
    let store = StoreHandle::new(ConversationStore::with_welcome());
    let repository = Arc::new(RemoteRepository::new(config.clone(), session.clone()));
    let sync = ConversationSync::new(
        store.clone(),
        session.clone(),
        snapshot.clone(),
        repository,
        config.page_size,
    );
    Fixture {
        store,
        session,
        snapshot,
        kv,
        sync,
    }
}

const PAGE_ONE: &str = r#"{"threads":[
    {"id":"t-1","title":"First","createdAt":"2026-01-02T10:00:00Z"},
    {"id":"t-2","title":"Second","createdAt":"2026-01-01T10:00:00Z"}
],"hasMore":true}"#;

const T1_MESSAGES: &str = r#"{"messages":[
    {"id":"m-1","role":"user","content":"hi","timestamp":"2026-01-02T10:00:00Z"},
    {"id":"m-2","role":"assistant","content":"hello","timestamp":"2026-01-02T10:00:01Z"}
]}"#;

#[tokio::test]
async fn test_anonymous_session_loads_local_snapshot_only() {
    let mut server = mockito::Server::new_async().await;
    let remote = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let f = fixture(&server, SessionContext::anonymous("anon-1"));
    let mut saved = Thread::new();
    saved.title = "Saved locally".to_string();
    f.snapshot.save_threads(&[saved.clone()]).await.unwrap();

    f.sync.load_initial().await.unwrap();

    remote.assert_async().await;
    let threads = f.store.snapshot();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].id, saved.id);
    assert_eq!(f.store.read(|s| s.active_thread_id().map(str::to_owned)), Some(saved.id));
}

#[tokio::test]
async fn test_anonymous_first_launch_shows_welcome() {
    let server = mockito::Server::new_async().await;
    let f = fixture(&server, SessionContext::anonymous("anon-1"));

    f.sync.load_initial().await.unwrap();

    assert_eq!(f.store.snapshot()[0].title, WELCOME_TITLE);
}

#[tokio::test]
async fn test_authenticated_session_lists_remote_and_loads_lazily() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/threads")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("limit".into(), "2".into()),
            Matcher::UrlEncoded("offset".into(), "0".into()),
        ]))
        .with_status(200)
        .with_body(PAGE_ONE)
        .create_async()
        .await;
    let t1 = server
        .mock("GET", "/threads/t-1/messages")
        .with_status(200)
        .with_body(T1_MESSAGES)
        .expect(1)
        .create_async()
        .await;
    let t2 = server
        .mock("GET", "/threads/t-2/messages")
        .with_status(200)
        .with_body(r#"{"messages":[]}"#)
        .expect(1)
        .create_async()
        .await;

    let f = fixture(&server, SessionContext::authenticated("tok", profile()));
    f.sync.load_initial().await.unwrap();

    assert!(f.sync.has_more());
    let first = f.store.read(|s| s.thread("t-1").cloned()).unwrap();
    assert!(first.is_loaded);
    assert_eq!(first.messages.len(), 2);
    assert!(!f.store.read(|s| s.thread("t-2").unwrap().is_loaded));

    f.sync.select_thread("t-2").await.unwrap();
    f.sync.select_thread("t-1").await.unwrap();
    f.sync.select_thread("t-2").await.unwrap();

    t1.assert_async().await;
    t2.assert_async().await;
    assert_eq!(f.kv.get("threads").await.unwrap(), None);
}

#[tokio::test]
async fn test_turn_sent_before_lazy_load_survives_the_load() {
    let mut server = mockito::Server::new_async().await;
    let failing = server
        .mock("GET", "/threads/r-1/messages")
        .with_status(500)
        .create_async()
        .await;

    let f = fixture(&server, SessionContext::authenticated("tok", profile()));
    f.store.update(|s| {
        s.replace_threads(vec![Thread::shell("r-1", "Remote", chrono::Utc::now(), None)])
    });

    assert!(f.sync.select_thread("r-1").await.is_err());
    let question = f
        .store
        .update(|s| s.append_user_message("r-1", "asked before load"))
        .unwrap();
    f.store
        .update(|s| s.apply_delta("r-1", "a-local", &Delta::token("streamed reply")));

    failing.remove_async().await;
    server
        .mock("GET", "/threads/r-1/messages")
        .with_status(200)
        .with_body(T1_MESSAGES)
        .create_async()
        .await;

    f.sync.select_thread("r-1").await.unwrap();

    let thread = f.store.read(|s| s.thread("r-1").cloned()).unwrap();
    let ids: Vec<&str> = thread.messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m-1", "m-2", question.id.as_str(), "a-local"]);
    assert!(thread.is_loaded);
}

#[tokio::test]
async fn test_load_more_appends_next_page() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/threads")
        .match_query(Matcher::UrlEncoded("offset".into(), "0".into()))
        .with_status(200)
        .with_body(PAGE_ONE)
        .create_async()
        .await;
    server
        .mock("GET", "/threads")
        .match_query(Matcher::UrlEncoded("offset".into(), "2".into()))
        .with_status(200)
        .with_body(
            r#"{"threads":[{"id":"t-3","title":"Third","createdAt":"2025-12-31T10:00:00Z"}],"hasMore":false}"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", "/threads/t-1/messages")
        .with_status(200)
        .with_body(T1_MESSAGES)
        .create_async()
        .await;

    let f = fixture(&server, SessionContext::authenticated("tok", profile()));
    f.sync.load_initial().await.unwrap();

    assert!(f.sync.load_more().await.unwrap());
    assert!(!f.sync.has_more());
    assert!(!f.sync.load_more().await.unwrap());

    let ids: Vec<String> = f.store.snapshot().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec!["t-1", "t-2", "t-3"]);
}

#[tokio::test]
async fn test_unauthorized_listing_expires_session() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/threads")
        .match_query(Matcher::Any)
        .with_status(401)
        .create_async()
        .await;

    let f = fixture(&server, SessionContext::authenticated("stale", profile()));
    f.snapshot.save_credentials("stale", &profile()).await.unwrap();

    let err = f.sync.load_initial().await.unwrap_err();

    assert!(err.is_auth_expired());
    assert!(f.session.needs_reauth());
    assert!(f.session.credentials().is_none());
    assert!(f.snapshot.load_credentials().await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_removes_remote_then_local() {
    let mut server = mockito::Server::new_async().await;
    let delete = server
        .mock("DELETE", "/threads/t-9")
        .with_status(204)
        .create_async()
        .await;

    let f = fixture(&server, SessionContext::authenticated("tok", profile()));
    f.store.update(|s| {
        s.replace_threads(vec![Thread::shell("t-9", "Old", chrono::Utc::now(), None)])
    });

    f.sync.delete_thread("t-9").await.unwrap();

    delete.assert_async().await;
    assert!(f.store.snapshot().is_empty());
    assert!(f.store.read(|s| s.active_thread_id().is_none()));
}

#[tokio::test]
async fn test_failed_remote_delete_keeps_local_thread() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("DELETE", "/threads/t-9")
        .with_status(500)
        .create_async()
        .await;

    let f = fixture(&server, SessionContext::authenticated("tok", profile()));
    f.store.update(|s| {
        s.replace_threads(vec![Thread::shell("t-9", "Old", chrono::Utc::now(), None)])
    });

    let err = f.sync.delete_thread("t-9").await.unwrap_err();

    assert!(matches!(
        err,
        ClientError::Persist(PersistError::Status { status: 500, .. })
    ));
    assert_eq!(f.store.snapshot().len(), 1);
}

#[tokio::test]
async fn test_login_and_logout() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/auth/login")
        .match_body(Matcher::Json(serde_json::json!({
            "email": "ada@example.com",
            "password": "pw",
        })))
        .with_status(200)
        .with_body(
            r#"{"access_token":"tok-1","token_type":"bearer","user":{"user_id":"u-1","email":"ada@example.com","name":"Ada"}}"#,
        )
        .create_async()
        .await;

    let f = fixture(&server, SessionContext::anonymous("anon-1"));
    f.kv.set("userId", "anon-1".to_string()).await.unwrap();
    let auth = AuthClient::new(
        ClientConfig::new().with_base_url(server.url()),
        f.session.clone(),
        f.snapshot.clone(),
    );

    let user = auth.login("ada@example.com", "pw").await.unwrap();

    assert_eq!(user, profile());
    assert!(f.session.is_authenticated());
    let (token, stored) = f.snapshot.load_credentials().await.unwrap().unwrap();
    assert_eq!(token, "tok-1");
    assert_eq!(stored, profile());

    auth.logout().await.unwrap();

    assert!(f.session.is_anonymous());
    assert_eq!(f.session.anonymous_id(), Some("anon-1".to_string()));
    assert!(f.snapshot.load_credentials().await.unwrap().is_none());
}

#[tokio::test]
async fn test_rejected_login_surfaces_detail() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/auth/login")
        .with_status(401)
        .with_body(r#"{"detail":"Invalid email or password"}"#)
        .create_async()
        .await;

    let f = fixture(&server, SessionContext::anonymous("anon-1"));
    let auth = AuthClient::new(
        ClientConfig::new().with_base_url(server.url()),
        f.session.clone(),
        f.snapshot.clone(),
    );

    let err = auth.login("ada@example.com", "wrong").await.unwrap_err();

    match err {
        ClientError::Auth(detail) => assert_eq!(detail, "Invalid email or password"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(f.session.is_anonymous());
}

#[tokio::test]
async fn test_logout_keeps_remote_threads_out_of_local_snapshot() {
    let server = mockito::Server::new_async().await;
    let f = fixture(&server, SessionContext::authenticated("tok", profile()));
    f.kv.set("userId", "anon-1".to_string()).await.unwrap();
    f.snapshot.save_credentials("tok", &profile()).await.unwrap();
    f.store.update(|s| {
        s.replace_threads(vec![Thread::shell("t-1", "Remote", chrono::Utc::now(), None)])
    });

    let writer = SnapshotWriter::spawn(f.store.clone(), f.snapshot.clone(), f.session.clone());
    let auth = AuthClient::new(
        ClientConfig::new().with_base_url(server.url()),
        f.session.clone(),
        f.snapshot.clone(),
    );

    f.sync.logout(&auth).await.unwrap();
    // Late delta from a turn still streaming on the remote thread
    f.store
        .update(|s| s.apply_delta("t-1", "a-1", &Delta::token("late")));

    let mut saved = None;
    for _ in 0..50 {
        saved = f.snapshot.load_threads().await.unwrap();
        if saved.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    writer.abort();

    let saved = saved.expect("snapshot never written");
    assert!(f.session.is_anonymous());
    assert!(saved.iter().all(|t| t.id != "t-1"));
    assert_eq!(saved[0].title, WELCOME_TITLE);
    assert!(f.store.read(|s| s.thread("t-1").is_none()));
}
