use super::*;
use std::sync::Mutex;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode as AxStatus};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::session::MemoryTokenStore;

// =============================================================================
// Fixture API server. Accepts exactly the token "tok123"; the organization
// save/upload routes always fail so both outcome paths are reachable.
// =============================================================================

type Saved = Arc<Mutex<Vec<Value>>>;

fn identity_json() -> Value {
    json!({"id": 1, "email": "a@b.com", "is_superuser": true, "is_active": true})
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers.get("authorization")?.to_str().ok()?.strip_prefix("Bearer ")
}

fn authorized(headers: &HeaderMap) -> bool {
    bearer(headers) == Some("tok123")
}

async fn login_handler(Json(body): Json<Value>) -> (AxStatus, Json<Value>) {
    if body["email"] == json!("a@b.com") && body["password"] == json!("x") {
        (
            AxStatus::OK,
            Json(json!({
                "access_token": "tok123",
                "token_type": "bearer",
                "user": identity_json(),
            })),
        )
    } else {
        (AxStatus::UNAUTHORIZED, Json(json!({"detail": "Incorrect email or password"})))
    }
}

async fn me_handler(headers: HeaderMap) -> (AxStatus, Json<Value>) {
    if authorized(&headers) {
        (AxStatus::OK, Json(identity_json()))
    } else {
        (AxStatus::UNAUTHORIZED, Json(json!({"detail": "Not authenticated"})))
    }
}

#[derive(serde::Deserialize)]
struct PageParams {
    page: u32,
    page_size: u32,
}

/// 45-row synthetic collection, paginated server-side.
async fn transactions_handler(
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> (AxStatus, Json<Value>) {
    if !authorized(&headers) {
        return (AxStatus::UNAUTHORIZED, Json(json!({"detail": "Not authenticated"})));
    }
    let total = 45u64;
    let start = u64::from((params.page - 1) * params.page_size);
    let count = total.saturating_sub(start).min(u64::from(params.page_size));
    let items: Vec<Value> = (0..count)
        .map(|i| json!({"id": start + i + 1, "amount": "10.00", "description": "txn"}))
        .collect();
    (AxStatus::OK, Json(json!({"items": items, "total": total})))
}

async fn save_handler(
    State(saved): State<Saved>,
    headers: HeaderMap,
    Json(batch): Json<Vec<Value>>,
) -> AxStatus {
    if !authorized(&headers) {
        return AxStatus::UNAUTHORIZED;
    }
    saved.lock().expect("fixture mutex should lock").extend(batch);
    AxStatus::OK
}

async fn summary_handler(headers: HeaderMap) -> (AxStatus, Json<Value>) {
    if !authorized(&headers) {
        return (AxStatus::UNAUTHORIZED, Json(json!({"detail": "Not authenticated"})));
    }
    (
        AxStatus::OK,
        Json(json!({
            "total_credit": 120.5,
            "total_debit": 30.0,
            "total_fees_collected": 150.5,
            "transaction_count": 4,
            "largest_payment": 100.0,
            "average_payment": 37.625,
            "latest_balance": 12.0,
        })),
    )
}

async fn pie_handler(headers: HeaderMap) -> (AxStatus, Json<Value>) {
    if !authorized(&headers) {
        return (AxStatus::UNAUTHORIZED, Json(json!({"detail": "Not authenticated"})));
    }
    (AxStatus::OK, Json(json!({"credit": 3.0, "debit": 1.0})))
}

async fn bar_handler(headers: HeaderMap) -> (AxStatus, Json<Value>) {
    if !authorized(&headers) {
        return (AxStatus::UNAUTHORIZED, Json(json!({"detail": "Not authenticated"})));
    }
    (AxStatus::OK, Json(json!({"jan.csv": 120.5})))
}

async fn upload_handler(headers: HeaderMap) -> AxStatus {
    if authorized(&headers) { AxStatus::OK } else { AxStatus::UNAUTHORIZED }
}

async fn register_handler(headers: HeaderMap, Json(body): Json<Value>) -> (AxStatus, Json<Value>) {
    if !authorized(&headers) {
        return (AxStatus::UNAUTHORIZED, Json(json!({"detail": "Not authenticated"})));
    }
    (
        AxStatus::OK,
        Json(json!({
            "id": 2,
            "email": body["email"],
            "is_superuser": false,
            "is_active": true,
            "password": "generated-secret",
        })),
    )
}

async fn users_handler(headers: HeaderMap) -> (AxStatus, Json<Value>) {
    if !authorized(&headers) {
        return (AxStatus::UNAUTHORIZED, Json(json!({"detail": "Not authenticated"})));
    }
    (AxStatus::OK, Json(json!([identity_json()])))
}

async fn ok_handler() -> AxStatus {
    AxStatus::OK
}

async fn error_500_handler() -> AxStatus {
    AxStatus::INTERNAL_SERVER_ERROR
}

async fn error_400_handler() -> AxStatus {
    AxStatus::BAD_REQUEST
}

/// Route client/interceptor log output through the test harness.
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn spawn_fixture() -> (String, Saved) {
    init_tracing();
    let saved: Saved = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/auth/login", post(login_handler))
        .route("/auth/me", get(me_handler))
        .route("/auth/users", get(users_handler))
        .route("/auth/register", post(register_handler))
        .route("/auth/users/{user_id}/activate", post(ok_handler))
        .route("/auth/users/{user_id}/deactivate", post(ok_handler))
        .route("/unified_transactions", get(transactions_handler))
        .route("/unified_transactions/save", post(save_handler))
        .route("/unified_summary", get(summary_handler))
        .route("/unified_pie_type", get(pie_handler))
        .route("/unified_bar_source", get(bar_handler))
        .route("/unified_upload", post(upload_handler))
        .route("/org_transactions", get(transactions_handler))
        .route("/org_transactions/save", post(error_500_handler))
        .route("/org_upload", post(error_400_handler))
        .with_state(Arc::clone(&saved));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("fixture listener should bind");
    let addr = listener.local_addr().expect("fixture addr should resolve");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fixture server should run");
    });
    (format!("http://{addr}"), saved)
}

/// Client wired to the fixture with an in-memory token store.
fn fixture_client(base_url: String) -> (ApiClient, SessionHandle, Arc<MemoryTokenStore>) {
    let session = SessionHandle::new();
    let store = Arc::new(MemoryTokenStore::new());
    let client = ApiClient::with_store(
        base_url,
        session.clone(),
        Arc::clone(&store) as Arc<dyn TokenStore>,
    );
    (client, session, store)
}

fn authenticate(session: &SessionHandle, store: &MemoryTokenStore, token: &str) {
    store.save(token);
    session.set_authenticated(
        token.to_owned(),
        Identity { id: 1, email: "a@b.com".into(), is_superuser: true, is_active: true },
    );
}

// =============================================================================
// AuthApi
// =============================================================================

#[tokio::test]
async fn login_returns_token_and_identity() {
    let (base, _saved) = spawn_fixture().await;
    let (client, _session, _store) = fixture_client(base);

    let resp = client.login("a@b.com", "x").await.expect("login should succeed");
    assert_eq!(resp.access_token, "tok123");
    assert_eq!(resp.user.email, "a@b.com");
}

#[tokio::test]
async fn rejected_login_carries_server_detail() {
    let (base, _saved) = spawn_fixture().await;
    let (client, session, _store) = fixture_client(base);

    let err = client.login("a@b.com", "wrong").await.expect_err("login should fail");
    assert_eq!(err.to_string(), "Incorrect email or password");
    // A rejected login is not an ambient 401: no forced-logout redirect.
    assert!(!session.take_login_redirect());
}

#[tokio::test]
async fn me_verifies_and_rejects_tokens() {
    let (base, _saved) = spawn_fixture().await;
    let (client, _session, _store) = fixture_client(base);

    let user = client.me("tok123").await.expect("valid token should verify");
    assert_eq!(user.email, "a@b.com");

    let err = client.me("stale").await.expect_err("stale token should be rejected");
    assert!(matches!(err, AuthError::InvalidToken));
}

// =============================================================================
// RecordApi: bearer attachment, pagination, interceptor
// =============================================================================

#[tokio::test]
async fn fetch_page_attaches_bearer_and_paginates() {
    let (base, _saved) = spawn_fixture().await;
    let (client, session, store) = fixture_client(base);
    authenticate(&session, &store, "tok123");

    let page1 = client
        .fetch_page(Dataset::Unified, 1, 20)
        .await
        .expect("page 1 should fetch");
    assert_eq!(page1.total, 45);
    assert_eq!(page1.items.len(), 20);

    let page3 = client
        .fetch_page(Dataset::Unified, 3, 20)
        .await
        .expect("page 3 should fetch");
    assert_eq!(page3.items.len(), 5);
}

#[tokio::test]
async fn ambient_401_forces_logout_and_clears_token() {
    let (base, _saved) = spawn_fixture().await;
    let (client, session, store) = fixture_client(base);
    // Authenticated locally, but the server no longer accepts the token.
    authenticate(&session, &store, "expired");

    let err = client.fetch_page(Dataset::Unified, 1, 20).await;
    assert!(matches!(err, Err(FetchError::Unauthorized)));

    // The interceptor, not the call site, ended the session: durable token
    // gone, status reset, login redirect queued.
    assert!(store.load().is_none());
    assert!(session.bearer_token().is_none());
    assert!(session.take_login_redirect());
}

#[tokio::test]
async fn save_batch_posts_partial_records() {
    let (base, saved) = spawn_fixture().await;
    let (client, session, store) = fixture_client(base);
    authenticate(&session, &store, "tok123");

    let mut record = Record::new();
    record.insert("id".to_owned(), json!(7));
    record.insert("amount".to_owned(), json!("12.50"));
    client
        .save_batch(Dataset::Unified, &[record])
        .await
        .expect("save should succeed");

    let received = saved.lock().expect("fixture mutex should lock").clone();
    assert_eq!(received, vec![json!({"id": 7, "amount": "12.50"})]);
}

#[tokio::test]
async fn save_batch_surfaces_non_2xx() {
    let (base, _saved) = spawn_fixture().await;
    let (client, session, store) = fixture_client(base);
    authenticate(&session, &store, "tok123");

    let mut record = Record::new();
    record.insert("id".to_owned(), json!(1));
    let err = client.save_batch(Dataset::Organization, &[record]).await;
    assert!(matches!(err, Err(SaveError::Status(500))));
}

// =============================================================================
// AnalyticsApi
// =============================================================================

#[tokio::test]
async fn analytics_endpoints_decode_typed_payloads() {
    let (base, _saved) = spawn_fixture().await;
    let (client, session, store) = fixture_client(base);
    authenticate(&session, &store, "tok123");

    let summary = client.summary(Dataset::Unified).await.expect("summary should fetch");
    assert_eq!(summary.transaction_count, 4);

    let pie = client.pie_data(Dataset::Unified).await.expect("pie should fetch");
    assert_eq!(pie.get("credit"), Some(&3.0));

    let bar = client.bar_data(Dataset::Unified).await.expect("bar should fetch");
    assert_eq!(bar.get("jan.csv"), Some(&120.5));
}

// =============================================================================
// Uploads
// =============================================================================

#[tokio::test]
async fn upload_reports_success_only() {
    let (base, _saved) = spawn_fixture().await;
    let (client, session, store) = fixture_client(base);
    authenticate(&session, &store, "tok123");

    let parts = vec![UploadPart { file_name: "jan.csv".into(), bytes: b"id,amount\n".to_vec() }];
    client
        .upload_files(Dataset::Unified, parts)
        .await
        .expect("upload should succeed");
}

#[tokio::test]
async fn upload_failure_is_surfaced_for_retry() {
    let (base, _saved) = spawn_fixture().await;
    let (client, session, store) = fixture_client(base);
    authenticate(&session, &store, "tok123");

    let parts = vec![UploadPart { file_name: "bad.csv".into(), bytes: Vec::new() }];
    let err = client.upload_files(Dataset::Organization, parts).await;
    assert!(matches!(err, Err(UploadError::Status(400))));
}

// =============================================================================
// User management
// =============================================================================

#[tokio::test]
async fn user_management_round_trip() {
    let (base, _saved) = spawn_fixture().await;
    let (client, session, store) = fixture_client(base);
    authenticate(&session, &store, "tok123");

    let users = client.list_users().await.expect("user list should fetch");
    assert_eq!(users.len(), 1);

    let created = client.register_user("new@b.com").await.expect("register should succeed");
    assert_eq!(created.email, "new@b.com");
    assert_eq!(created.password, "generated-secret");

    client.set_user_active(2, false).await.expect("deactivate should succeed");
    client.set_user_active(2, true).await.expect("activate should succeed");
}
