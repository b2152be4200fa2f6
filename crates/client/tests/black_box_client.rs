use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use portal_auth::{
    DurableStorage, FileStorage, GuardNotice, MemoryStorage, Navigator, Role, RouteGuardDecision,
    UserProfile, keys,
};
use portal_client::{ClientConfig, ClientError, LoginRequest, Portal};
use portal_core::MenuId;
use portal_navigation::render_menu;

type Seen = Arc<Mutex<Vec<Option<String>>>>;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}/api", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Default)]
struct RecordingNavigator {
    redirects: Mutex<Vec<(String, Option<GuardNotice>)>>,
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, to: &str, notice: Option<&GuardNotice>) {
        self.redirects
            .lock()
            .unwrap()
            .push((to.to_string(), notice.copied()));
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn remote_menu() -> Value {
    json!([
        { "id": "remote-home", "name": "Remote Home", "path": "/", "roles": ["USER"], "order": 2 },
        {
            "id": "remote-tools", "name": "Tools", "roles": ["USER"], "order": 1,
            "isDropdown": true,
            "subItems": [{ "id": "lint", "name": "Lint", "path": "/tools/lint", "roles": ["USER"] }]
        },
        { "id": "broken", "name": "Broken", "roles": ["USER"] }
    ])
}

/// Snapshot a previous run left behind for an authenticated USER.
fn user_snapshot(username: &str, token: &str) -> String {
    json!({
        "state": {
            "user": { "username": username, "role": "USER" },
            "token": token,
            "isAuthenticated": true
        },
        "version": 0
    })
    .to_string()
}

async fn role_menus(
    State(seen): State<Seen>,
    Path(role): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    seen.lock().unwrap().push(bearer(&headers));
    if role == "USER" {
        Json(remote_menu())
    } else {
        Json(json!([]))
    }
}

fn healthy_api(seen: Seen) -> Router {
    Router::new()
        .route(
            "/api/echo",
            get(|State(seen): State<Seen>, headers: HeaderMap| async move {
                let auth = bearer(&headers);
                seen.lock().unwrap().push(auth.clone());
                Json(json!({ "authorization": auth }))
            }),
        )
        .route("/api/secure", get(|| async { StatusCode::UNAUTHORIZED }))
        .route("/api/menus/role/:role", get(role_menus))
        .route("/api/menus", get(|| async { Json(remote_menu()) }))
        .route("/api/menus/tree", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route(
            "/api/menus/:id",
            get(|Path(id): Path<String>| async move {
                Json(json!({ "id": id, "name": "Single", "path": "/single", "roles": ["GUEST"] }))
            }),
        )
        .route(
            "/api/auth/login",
            post(|Json(body): Json<Value>| async move {
                if body["password"] == "secret" {
                    Json(json!({
                        "token": "tok-login",
                        "user": { "id": 7, "username": body["username"], "role": "MANAGER" }
                    }))
                    .into_response()
                } else {
                    StatusCode::UNAUTHORIZED.into_response()
                }
            }),
        )
        .route(
            "/api/users/me",
            get(|headers: HeaderMap| async move {
                if bearer(&headers).as_deref() == Some("Bearer tok-login") {
                    Json(json!({
                        "id": 7,
                        "username": "mallory",
                        "email": "m@example.com",
                        "role": "MANAGER"
                    }))
                    .into_response()
                } else {
                    StatusCode::UNAUTHORIZED.into_response()
                }
            }),
        )
        .route("/api/auth/logout", post(|| async { Json(json!({ "logout": true })) }))
        .with_state(seen)
}

fn failing_api() -> Router {
    Router::new().route(
        "/api/menus/role/:role",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    )
}

/// Rejects every menu request, like a backend that no longer accepts the
/// stored token.
fn expired_token_api() -> Router {
    Router::new().route(
        "/api/menus/role/:role",
        get(|| async { StatusCode::UNAUTHORIZED }),
    )
}

fn config(base_url: &str) -> ClientConfig {
    ClientConfig {
        base_url: base_url.to_string(),
        menu_timeout: Duration::from_secs(2),
        ..ClientConfig::default()
    }
}

fn connect(base_url: &str, storage: Arc<MemoryStorage>) -> (Portal, Arc<RecordingNavigator>) {
    let navigator = Arc::new(RecordingNavigator::default());
    let portal = Portal::connect(config(base_url), storage, navigator.clone()).unwrap();
    (portal, navigator)
}

#[tokio::test]
async fn token_is_recovered_from_snapshot_and_cached() {
    let seen = Seen::default();
    let srv = TestServer::spawn(healthy_api(seen.clone())).await;

    let storage = MemoryStorage::arc();
    storage.set(keys::SNAPSHOT, &user_snapshot("ann", "abc")).unwrap();
    let (portal, _) = connect(&srv.base_url, storage.clone());

    let body: Value = portal.client().get_json("/echo").await.unwrap();
    assert_eq!(body["authorization"], "Bearer abc");
    assert_eq!(storage.get(keys::TOKEN).unwrap().as_deref(), Some("abc"));
    assert!(portal.session().is_authenticated());
}

#[tokio::test]
async fn request_without_token_has_no_authorization_header() {
    let seen = Seen::default();
    let srv = TestServer::spawn(healthy_api(seen.clone())).await;
    let (portal, _) = connect(&srv.base_url, MemoryStorage::arc());

    let body: Value = portal.client().get_json("/echo").await.unwrap();
    assert_eq!(body["authorization"], Value::Null);
    assert_eq!(*seen.lock().unwrap(), vec![None]);
}

#[tokio::test]
async fn unauthorized_response_tears_down_session() {
    let srv = TestServer::spawn(healthy_api(Seen::default())).await;
    let storage = MemoryStorage::arc();
    let (portal, navigator) = connect(&srv.base_url, storage.clone());
    portal
        .session()
        .set_session(UserProfile::new("bob", Role::User), "tok-stale")
        .unwrap();

    let err = portal.client().get_json::<Value>("/secure").await.unwrap_err();

    assert!(matches!(err, ClientError::Unauthorized));
    assert!(!portal.session().is_authenticated());
    assert_eq!(storage.get(keys::TOKEN).unwrap(), None);
    assert_eq!(storage.get(keys::SNAPSHOT).unwrap(), None);
    assert_eq!(
        *navigator.redirects.lock().unwrap(),
        vec![("/login".to_string(), Some(GuardNotice::SessionExpired))]
    );
}

#[tokio::test]
async fn concurrent_unauthorized_responses_each_reject() {
    let srv = TestServer::spawn(healthy_api(Seen::default())).await;
    let storage = MemoryStorage::arc();
    let (portal, navigator) = connect(&srv.base_url, storage.clone());
    portal
        .session()
        .set_session(UserProfile::new("carol", Role::Admin), "tok-stale")
        .unwrap();

    let client = portal.client();
    let (a, b) = tokio::join!(
        client.get_json::<Value>("/secure"),
        client.get_json::<Value>("/secure")
    );

    assert!(a.unwrap_err().is_unauthorized());
    assert!(b.unwrap_err().is_unauthorized());
    assert!(!portal.session().is_authenticated());
    assert!(storage.keys().is_empty());
    assert_eq!(navigator.redirects.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn remote_menu_wins_when_reachable() {
    let seen = Seen::default();
    let srv = TestServer::spawn(healthy_api(seen.clone())).await;
    let (portal, _) = connect(&srv.base_url, MemoryStorage::arc());
    portal
        .session()
        .set_session(UserProfile::new("dave", Role::User), "tok-dave")
        .unwrap();

    let resolved = portal.resolve_menu().await;
    assert!(!resolved.resolution.is_fallback());
    let ids: Vec<&str> = resolved
        .resolution
        .entries()
        .iter()
        .map(|e| e.id.as_str())
        .collect();
    // Invalid entries are dropped; remote order is kept as sent.
    assert_eq!(ids, vec!["remote-home", "remote-tools"]);
    assert_eq!(*seen.lock().unwrap(), vec![Some("Bearer tok-dave".to_string())]);

    let rendered = portal.render_menu().await.unwrap();
    assert_eq!(rendered.len(), 2);
}

#[tokio::test]
async fn server_error_falls_back_to_static_catalog() {
    let srv = TestServer::spawn(failing_api()).await;
    let (portal, navigator) = connect(&srv.base_url, MemoryStorage::arc());
    portal
        .session()
        .set_session(UserProfile::new("erin", Role::User), "tok-erin")
        .unwrap();

    let resolved = portal.resolve_menu().await;
    assert!(resolved.resolution.is_fallback());
    assert_eq!(
        resolved.resolution.entries(),
        portal.resolver().filter_static(Role::User, true).as_slice()
    );
    assert!(resolved.resolution.entries().iter().all(|e| !e.id.as_str().starts_with("remote")));
    assert!(navigator.redirects.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_server_falls_back_to_static_catalog() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (portal, _) = connect(&format!("http://{}/api", addr), MemoryStorage::arc());
    let resolved = portal.resolve_menu().await;

    assert!(resolved.resolution.is_fallback());
    assert_eq!(resolved.role, Role::Guest);
    assert!(resolved.resolution.entries().iter().all(|e| !e.requires_auth));
}

#[tokio::test]
async fn login_starts_session_and_profile_refresh_updates_user() {
    let srv = TestServer::spawn(healthy_api(Seen::default())).await;
    let storage = MemoryStorage::arc();
    let (portal, _) = connect(&srv.base_url, storage.clone());

    let user = portal
        .auth()
        .login(&LoginRequest::new("mallory", "secret"))
        .await
        .unwrap();
    assert_eq!(user.role, Role::Manager);
    assert_eq!(portal.session().token().as_deref(), Some("tok-login"));
    assert_eq!(storage.get(keys::TOKEN).unwrap().as_deref(), Some("tok-login"));
    assert_eq!(portal.enter(Role::Manager), RouteGuardDecision::Allow);
    assert_eq!(portal.enter(Role::Admin), RouteGuardDecision::RedirectForbidden);

    let refreshed = portal.auth().current_user().await.unwrap();
    assert_eq!(refreshed.email.as_deref(), Some("m@example.com"));
    assert_eq!(
        portal.session().user().and_then(|u| u.email),
        Some("m@example.com".to_string())
    );

    portal.auth().logout().await;
    assert!(!portal.session().is_authenticated());
    assert!(storage.keys().is_empty());
}

#[tokio::test]
async fn rejected_login_leaves_session_empty() {
    let srv = TestServer::spawn(healthy_api(Seen::default())).await;
    let (portal, _) = connect(&srv.base_url, MemoryStorage::arc());

    let err = portal
        .auth()
        .login(&LoginRequest::new("mallory", "wrong"))
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!portal.session().is_authenticated());
}

#[tokio::test]
async fn menu_reads_by_id_and_tree() {
    let srv = TestServer::spawn(healthy_api(Seen::default())).await;
    let (portal, _) = connect(&srv.base_url, MemoryStorage::arc());

    let entry = portal
        .menus()
        .get_menu_by_id(&MenuId::new("single").unwrap())
        .await
        .unwrap();
    assert_eq!(entry.path(), Some("/single"));

    // Tree endpoint answers 500; callers get an empty tree.
    assert!(portal.menus().get_menu_tree().await.unwrap().is_empty());
}

#[tokio::test]
async fn all_menus_are_decoded_without_invalid_entries() {
    let srv = TestServer::spawn(healthy_api(Seen::default())).await;
    let (portal, _) = connect(&srv.base_url, MemoryStorage::arc());

    let menus = portal.menus().get_all_menus().await.unwrap();
    let ids: Vec<&str> = menus.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["remote-home", "remote-tools"]);
    assert!(menus[1].is_dropdown());
}

#[tokio::test]
async fn menu_id_with_separators_stays_on_the_menu_resource() {
    let srv = TestServer::spawn(healthy_api(Seen::default())).await;
    let (portal, navigator) = connect(&srv.base_url, MemoryStorage::arc());
    portal
        .session()
        .set_session(UserProfile::new("olivia", Role::User), "tok-olivia")
        .unwrap();

    let id = MenuId::new("x/../../users/me").unwrap();
    let entry = portal.menus().get_menu_by_id(&id).await.unwrap();

    // Served by the menu route, which echoes the decoded id back.
    assert_eq!(entry.id, id);
    assert_eq!(entry.path(), Some("/single"));
    assert!(portal.session().is_authenticated());
    assert!(navigator.redirects.lock().unwrap().is_empty());
}

#[tokio::test]
async fn expired_token_renders_guest_menu_after_forced_logout() {
    let srv = TestServer::spawn(expired_token_api()).await;
    let storage = MemoryStorage::arc();
    storage.set(keys::SNAPSHOT, &user_snapshot("pat", "expired")).unwrap();
    let (portal, navigator) = connect(&srv.base_url, storage.clone());
    assert_eq!(portal.session().current_role(), Role::User);

    let rendered = portal
        .render_menu()
        .await
        .expect("menu re-resolved for the signed-out session");

    let guest_fallback = portal.resolver().filter_static(Role::Guest, false);
    assert_eq!(rendered, render_menu(&guest_fallback, Role::Guest, false, None));
    assert!(!portal.session().is_authenticated());
    assert!(storage.keys().is_empty());
    assert_eq!(
        navigator.redirects.lock().unwrap().first().cloned(),
        Some(("/login".to_string(), Some(GuardNotice::SessionExpired)))
    );
}

#[tokio::test]
async fn session_survives_restart_with_file_storage() {
    let srv = TestServer::spawn(healthy_api(Seen::default())).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("portal-storage.json");
    let navigator = Arc::new(RecordingNavigator::default());

    {
        let storage = Arc::new(FileStorage::new(path.clone()));
        let portal = Portal::connect(config(&srv.base_url), storage, navigator.clone()).unwrap();
        portal
            .auth()
            .login(&LoginRequest::new("mallory", "secret"))
            .await
            .unwrap();
    }

    let storage = Arc::new(FileStorage::new(path));
    let portal = Portal::connect(config(&srv.base_url), storage, navigator).unwrap();
    assert!(portal.session().is_authenticated());
    assert_eq!(portal.session().current_role(), Role::Manager);
    assert_eq!(portal.enter(Role::User), RouteGuardDecision::Allow);

    let body: Value = portal.client().get_json("/echo").await.unwrap();
    assert_eq!(body["authorization"], "Bearer tok-login");
}
