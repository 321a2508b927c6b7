use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use smartfarm_dash::auth::KakaoAuth;
use smartfarm_dash::config::AppConfig;
use smartfarm_dash::session::{Credentials, SessionState, SessionStore, UserName};
use smartfarm_dash::storage::{DurableStore, FileStore, IDENTITY_KEYS, NAME_KEY};
use smartfarm_dash::{AppContext, Error};

#[derive(Clone)]
struct KakaoMock {
    status: StatusCode,
    calls: Arc<AtomicUsize>,
    last_auth: Arc<std::sync::Mutex<Option<String>>>,
}

async fn logout_handler(State(mock): State<KakaoMock>, headers: HeaderMap) -> StatusCode {
    mock.calls.fetch_add(1, Ordering::SeqCst);
    *mock.last_auth.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    mock.status
}

async fn spawn_kakao(status: StatusCode) -> (String, KakaoMock) {
    let mock = KakaoMock {
        status,
        calls: Arc::new(AtomicUsize::new(0)),
        last_auth: Arc::new(std::sync::Mutex::new(None)),
    };
    let app = Router::new()
        .route("/v1/user/logout", post(logout_handler))
        .with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), mock)
}

async fn logged_in_storage(dir: &tempfile::TempDir) -> Arc<FileStore> {
    let storage = Arc::new(FileStore::new(dir.path().join("storage.json")));
    Credentials::new(UserName::new("kim").unwrap(), "kakao-token", 6 * 3600)
        .unwrap()
        .persist(storage.as_ref())
        .await
        .unwrap();
    storage
}

#[tokio::test]
async fn test_restart_restores_session_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let storage = logged_in_storage(&dir).await;
    let (kakao_url, _mock) = spawn_kakao(StatusCode::OK).await;
    let kakao = Arc::new(KakaoAuth::new(&kakao_url, storage.clone()).unwrap());

    let store = SessionStore::initialize(storage, kakao).await;

    assert_eq!(
        store.state(),
        SessionState::authenticated(UserName::new("kim").unwrap())
    );
}

#[tokio::test]
async fn test_logout_revokes_kakao_token() {
    let dir = tempfile::tempdir().unwrap();
    let storage = logged_in_storage(&dir).await;
    let (kakao_url, mock) = spawn_kakao(StatusCode::OK).await;
    let kakao = Arc::new(KakaoAuth::new(&kakao_url, storage.clone()).unwrap());
    let store = SessionStore::initialize(storage.clone(), kakao).await;

    store.logout().await;

    assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        mock.last_auth.lock().unwrap().as_deref(),
        Some("Bearer kakao-token")
    );
    for key in IDENTITY_KEYS {
        assert!(storage.get(key).await.unwrap().is_none(), "{key} left behind");
    }
    assert_eq!(store.state(), SessionState::anonymous());
}

#[tokio::test]
async fn test_logout_completes_when_kakao_fails() {
    let dir = tempfile::tempdir().unwrap();
    let storage = logged_in_storage(&dir).await;
    let (kakao_url, mock) = spawn_kakao(StatusCode::INTERNAL_SERVER_ERROR).await;
    let kakao = Arc::new(KakaoAuth::new(&kakao_url, storage.clone()).unwrap());
    let store = SessionStore::initialize(storage.clone(), kakao).await;

    store.logout().await;

    assert_eq!(mock.calls.load(Ordering::SeqCst), 1);
    for key in IDENTITY_KEYS {
        assert!(storage.get(key).await.unwrap().is_none());
    }
    assert!(!store.state().is_authenticated());
}

#[tokio::test]
async fn test_logout_completes_when_kakao_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    let storage = logged_in_storage(&dir).await;

    // Reserve a port, then free it so nothing is listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let kakao = Arc::new(KakaoAuth::new(format!("http://{addr}"), storage.clone()).unwrap());
    let store = SessionStore::initialize(storage.clone(), kakao).await;

    store.logout().await;

    assert!(storage.get(NAME_KEY).await.unwrap().is_none());
    assert_eq!(store.state(), SessionState::anonymous());
}

#[tokio::test]
async fn test_context_without_store_fails_loudly() {
    let config = AppConfig::load_from_args(["smartfarm-dash", "whoami"]).unwrap();
    let ctx = AppContext::new(config, Arc::new(smartfarm_dash::storage::MemoryStore::new()));

    assert!(matches!(ctx.session(), Err(Error::SessionStoreMissing)));
}

#[tokio::test]
async fn test_bootstrap_provides_store() {
    let dir = tempfile::tempdir().unwrap();
    let storage_path = dir.path().join("storage.json");
    let _ = logged_in_storage(&dir).await;

    let config = AppConfig::load_from_args([
        "smartfarm-dash",
        "--storage",
        storage_path.to_str().unwrap(),
        "whoami",
    ])
    .unwrap();
    let ctx = AppContext::bootstrap(config).await.unwrap();

    let session = ctx.session().unwrap();
    assert_eq!(session.state().user_name(), Some("kim"));
}
