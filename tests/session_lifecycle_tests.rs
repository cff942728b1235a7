//! Session lifecycle integration tests: persistence round-trips, idempotent
//! logout, refresh failure handling, timer re-arming and supersession.
//! Backend behavior is played by a small axum stub on an ephemeral port.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use fundgate::config::Config;
use fundgate::error::{AppError, AppResult};
use fundgate::identity::{
    AuthManager, AuthMethod, FileKv, KvStore, MemoryKv, SessionPhase, SimulatedWallet,
};

#[derive(Default)]
struct StubState {
    refresh_hits: AtomicUsize,
    refresh_fail: AtomicBool,
    refresh_delay_ms: AtomicUsize,
    refresh_role: parking_lot::Mutex<String>,
}

fn auth_payload(role: &str, token: &str) -> Value {
    json!({
        "access_token": token,
        "token_type": "bearer",
        "principal_id": format!("srv-principal-{}", role),
        "role": role,
        "user_info": {
            "name": "Server User",
            "permissions": Value::Null,
            "authenticated_at": "2026-01-01T00:00:00Z"
        },
        "expires_in": 3600
    })
}

async fn demo_login(Path(role): Path<String>) -> Json<Value> {
    Json(auth_payload(&role, &format!("srv_tok_{}", role)))
}

async fn refresh(State(stub): State<Arc<StubState>>) -> (StatusCode, Json<Value>) {
    stub.refresh_hits.fetch_add(1, Ordering::SeqCst);
    let delay = stub.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay as u64)).await;
    }
    if stub.refresh_fail.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "detail": "refresh exploded" })));
    }
    let role = stub.refresh_role.lock().clone();
    (StatusCode::OK, Json(auth_payload(&role, "srv_tok_refreshed")))
}

async fn logout() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn profile() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "no profile" })))
}

/// Serve the stub backend on an ephemeral port; returns its API base.
async fn spawn_stub(stub: Arc<StubState>) -> String {
    *stub.refresh_role.lock() = "vendor".to_string();
    let app = Router::new()
        .route("/api/v1/auth/demo-login/{role}", post(demo_login))
        .route("/api/v1/auth/refresh", post(refresh))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/profile", get(profile))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/v1", addr)
}

fn manager_with(base: &str, kv: Arc<dyn KvStore>, refresh: Duration) -> AuthManager {
    let cfg = Config {
        api_base: base.to_string(),
        refresh_interval: refresh,
        storage_dir: std::path::PathBuf::from("unused"),
    };
    AuthManager::new(cfg, kv, Box::new(SimulatedWallet::new("lifecycle-principal")))
}

#[tokio::test]
async fn session_round_trips_through_durable_storage() {
    let tmp = tempfile::tempdir().unwrap();
    let kv: Arc<dyn KvStore> = Arc::new(FileKv::new(tmp.path()).unwrap());

    let mgr = manager_with("http://192.0.2.1:1/api/v1", kv.clone(), Duration::from_secs(3600));
    let id = mgr.login(AuthMethod::Demo { role: "deputy".into() }).await.unwrap();
    let token = mgr.current_token().unwrap();
    // Drop without logout: the persisted session must survive the process.
    drop(mgr);

    let restored = manager_with("http://192.0.2.1:1/api/v1", kv, Duration::from_secs(3600));
    restored.init().await;
    assert!(restored.is_authenticated());
    assert_eq!(restored.current_token().as_deref(), Some(token.as_str()));
    let restored_id = restored.current_identity().unwrap();
    assert_eq!(restored_id, id);
    assert!(restored.timer_armed(), "init over a persisted session arms the timer");
    restored.logout().await;
}

#[tokio::test]
async fn logout_is_idempotent() {
    let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
    let mgr = manager_with("http://192.0.2.1:1/api/v1", kv.clone(), Duration::from_secs(3600));
    mgr.login(AuthMethod::Demo { role: "citizen".into() }).await.unwrap();
    assert!(mgr.is_authenticated());

    mgr.logout().await;
    assert!(!mgr.is_authenticated());
    assert!(!mgr.timer_armed());

    // Second logout: no panic, no error surface, same end state.
    mgr.logout().await;
    assert!(!mgr.is_authenticated());
    assert!(mgr.current_token().is_none());

    let other = manager_with("http://192.0.2.1:1/api/v1", kv, Duration::from_secs(3600));
    other.init().await;
    assert!(!other.is_authenticated(), "storage must be cleared by logout");
}

#[tokio::test]
async fn failed_refresh_forces_logout_and_clears_storage() {
    let stub = Arc::new(StubState::default());
    stub.refresh_fail.store(true, Ordering::SeqCst);
    let base = spawn_stub(stub).await;

    let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
    let mgr = manager_with(&base, kv.clone(), Duration::from_secs(3600));
    mgr.login(AuthMethod::Demo { role: "vendor".into() }).await.unwrap();
    assert!(mgr.is_authenticated());

    let err = mgr.refresh().await.expect_err("HTTP 500 must fail the refresh");
    assert!(err.message().contains("refresh exploded"));
    assert!(!mgr.is_authenticated(), "failed refresh must not leave a stale session");
    assert!(!mgr.timer_armed());

    let other = manager_with(&base, kv, Duration::from_secs(3600));
    other.init().await;
    assert!(!other.is_authenticated(), "persisted storage must be cleared too");
}

#[tokio::test]
async fn repeated_logins_keep_exactly_one_timer() {
    let stub = Arc::new(StubState::default());
    let base = spawn_stub(stub.clone()).await;

    let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
    let mgr = manager_with(&base, kv, Duration::from_millis(200));
    mgr.login(AuthMethod::Demo { role: "citizen".into() }).await.unwrap();
    mgr.login(AuthMethod::Demo { role: "citizen".into() }).await.unwrap();
    assert!(mgr.timer_armed());

    // One interval elapses: a doubled timer would hit the stub twice.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(stub.refresh_hits.load(Ordering::SeqCst), 1, "exactly one timer may fire");

    mgr.logout().await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(stub.refresh_hits.load(Ordering::SeqCst), 1, "logout cancels the timer");
}

#[tokio::test]
async fn logout_supersedes_an_in_flight_refresh() {
    let stub = Arc::new(StubState::default());
    stub.refresh_delay_ms.store(300, Ordering::SeqCst);
    let base = spawn_stub(stub).await;

    let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
    let mgr = manager_with(&base, kv.clone(), Duration::from_secs(3600));
    mgr.login(AuthMethod::Demo { role: "vendor".into() }).await.unwrap();

    let refreshing = mgr.clone();
    let task = tokio::spawn(async move { refreshing.refresh().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    mgr.logout().await;

    let outcome = task.await.unwrap().expect("superseded refresh resolves cleanly");
    assert!(!outcome.applied, "a superseded refresh must not apply its result");
    assert!(!mgr.is_authenticated(), "logout wins regardless of the refresh outcome");
    assert!(mgr.current_token().is_none());

    let other = manager_with(&base, kv, Duration::from_secs(3600));
    other.init().await;
    assert!(!other.is_authenticated());
}

/// In-memory store whose writes can be made to fail, for exercising the
/// persistence-failure path.
struct FlakyKv {
    inner: MemoryKv,
    fail_writes: AtomicBool,
}

impl KvStore for FlakyKv {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::storage("kv_write", "disk full"));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) {
        self.inner.remove(key)
    }
}

#[tokio::test]
async fn refresh_that_cannot_persist_forces_logout() {
    let stub = Arc::new(StubState::default());
    let base = spawn_stub(stub).await;

    let kv = Arc::new(FlakyKv { inner: MemoryKv::new(), fail_writes: AtomicBool::new(false) });
    let mgr = manager_with(&base, kv.clone(), Duration::from_secs(3600));
    mgr.login(AuthMethod::Demo { role: "vendor".into() }).await.unwrap();

    kv.fail_writes.store(true, Ordering::SeqCst);
    let err = mgr.refresh().await.expect_err("an unpersistable session must not stay active");
    assert_eq!(err.code_str(), "kv_write");
    assert!(!mgr.is_authenticated(), "failed persistence ends the session like any other refresh failure");
    assert_eq!(mgr.phase(), SessionPhase::Unauthenticated);
    assert!(!mgr.timer_armed());
    assert!(mgr.current_token().is_none());
}

#[tokio::test]
async fn timer_survives_collision_with_manual_refresh() {
    let stub = Arc::new(StubState::default());
    stub.refresh_delay_ms.store(400, Ordering::SeqCst);
    let base = spawn_stub(stub).await;

    let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
    let mgr = manager_with(&base, kv, Duration::from_millis(150));
    mgr.login(AuthMethod::Demo { role: "vendor".into() }).await.unwrap();

    let manual = mgr.clone();
    let task = tokio::spawn(async move { manual.refresh().await });
    // At least one timer tick lands while the manual refresh holds the
    // in-flight slot.
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(mgr.timer_armed(), "a tick colliding with a manual refresh must not kill the timer");

    let outcome = task.await.unwrap().unwrap();
    assert!(outcome.applied);
    assert!(mgr.is_authenticated());
    assert!(mgr.timer_armed());
    mgr.logout().await;
}

#[tokio::test]
async fn login_supersedes_an_in_flight_refresh() {
    let stub = Arc::new(StubState::default());
    stub.refresh_delay_ms.store(300, Ordering::SeqCst);
    let base = spawn_stub(stub).await;

    let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
    let mgr = manager_with(&base, kv, Duration::from_secs(3600));
    mgr.login(AuthMethod::Demo { role: "vendor".into() }).await.unwrap();

    let refreshing = mgr.clone();
    let task = tokio::spawn(async move { refreshing.refresh().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    mgr.login(AuthMethod::Demo { role: "citizen".into() }).await.unwrap();

    let outcome = task.await.unwrap().expect("superseded refresh resolves cleanly");
    assert!(!outcome.applied, "the newer login owns the session");
    assert_eq!(mgr.current_identity().unwrap().role, "citizen");
    assert_eq!(mgr.current_token().as_deref(), Some("srv_tok_citizen"));
    mgr.logout().await;
}

#[tokio::test]
async fn refresh_reports_role_changes() {
    let stub = Arc::new(StubState::default());
    let base = spawn_stub(stub.clone()).await;

    let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
    let mgr = manager_with(&base, kv, Duration::from_secs(3600));
    mgr.login(AuthMethod::Demo { role: "vendor".into() }).await.unwrap();

    *stub.refresh_role.lock() = "state_head".to_string();
    let outcome = mgr.refresh().await.unwrap();
    assert!(outcome.applied);
    assert!(outcome.role_changed, "consumer must be told to reload authorization state");
    assert_eq!(outcome.previous_role, "vendor");
    assert_eq!(outcome.current_role, "state_head");
    assert_eq!(mgr.current_identity().unwrap().role, "state_head");
    assert!(mgr.can_allocate_budgets(), "permissions follow the refreshed role");
    mgr.logout().await;
}
