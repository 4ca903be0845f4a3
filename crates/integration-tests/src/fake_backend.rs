//! In-memory stand-in for the hosted backend.
//!
//! Speaks just enough of the table API (`/rest/v1/{table}`) and the auth API
//! (`/auth/v1/*`) for the web app to run end to end: PostgREST-style `eq`,
//! `is.null` and `or` filters, `limit`, `Content-Range` counts, and
//! password/refresh grants. Rows are plain JSON. Seller tables only show a
//! caller its own rows, mirroring row-level security.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

/// Project key the fake backend accepts.
pub const ANON_KEY: &str = "fake-anon-key";

/// Tables whose rows belong to one seller.
const OWNED_TABLES: &[&str] = &["stores", "products", "templates"];

#[derive(Debug, Clone)]
struct FakeUser {
    id: Uuid,
    email: String,
    password: String,
    full_name: Option<String>,
    confirmed: bool,
}

impl FakeUser {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "email": self.email,
            "user_metadata": { "full_name": self.full_name },
        })
    }
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, FakeUser>,
    /// Access token to user email.
    access: HashMap<String, String>,
    /// Refresh token to user email.
    refresh: HashMap<String, String>,
    tables: HashMap<String, Vec<Value>>,
}

#[derive(Default)]
struct FakeState {
    inner: Mutex<Inner>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    unhealthy: AtomicBool,
    auto_confirm: AtomicBool,
    /// Every seller may read and write every alert.
    open_alerts: AtomicBool,
    /// `expires_in` for issued access tokens.
    token_lifetime: AtomicI64,
    refresh_grants: AtomicUsize,
}

impl FakeState {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// A running fake backend.
#[derive(Clone)]
pub struct FakeBackend {
    state: Arc<FakeState>,
    url: String,
}

impl FakeBackend {
    /// Start the fake backend on a random loopback port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        state.auto_confirm.store(true, Ordering::SeqCst);
        state.token_lifetime.store(3600, Ordering::SeqCst);

        let app = Router::new()
            .route("/auth/v1/health", get(health))
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/signup", post(signup))
            .route("/auth/v1/logout", post(logout))
            .route("/auth/v1/recover", post(recover))
            .route("/auth/v1/user", get(get_user).put(update_user))
            .route("/rest/v1/{table}", any(rest))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            state,
            url: format!("http://{addr}"),
        }
    }

    /// Base URL to configure the app with.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Register a confirmed user and return their ID.
    pub fn add_user(&self, email: &str, password: &str, full_name: Option<&str>) -> Uuid {
        let user = FakeUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.map(ToString::to_string),
            confirmed: true,
        };
        let id = user.id;
        self.state.lock().users.insert(email.to_string(), user);
        id
    }

    /// Look up a user's display name.
    #[must_use]
    pub fn full_name(&self, email: &str) -> Option<String> {
        self.state
            .lock()
            .users
            .get(email)
            .and_then(|u| u.full_name.clone())
    }

    /// Insert a row directly, filling `id` and timestamps when absent.
    pub fn insert_row(&self, table: &str, row: Value) -> Value {
        let row = with_defaults(row);
        self.state
            .lock()
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        row
    }

    /// All rows in a table.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.state
            .lock()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Make every table read fail with 503.
    pub fn set_fail_reads(&self, fail: bool) {
        self.state.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every table write fail with 503.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make the health endpoint report an outage.
    pub fn set_unhealthy(&self, down: bool) {
        self.state.unhealthy.store(down, Ordering::SeqCst);
    }

    /// Whether sign-up signs the user straight in.
    pub fn set_auto_confirm(&self, on: bool) {
        self.state.auto_confirm.store(on, Ordering::SeqCst);
    }

    /// Let every seller see and change every alert, as a misconfigured
    /// row-level policy would.
    pub fn set_open_alerts(&self, open: bool) {
        self.state.open_alerts.store(open, Ordering::SeqCst);
    }

    /// Lifetime in seconds reported for access tokens issued from now on.
    pub fn set_token_lifetime(&self, secs: i64) {
        self.state.token_lifetime.store(secs, Ordering::SeqCst);
    }

    /// Successful refresh-token grants so far.
    #[must_use]
    pub fn refresh_grants(&self) -> usize {
        self.state.refresh_grants.load(Ordering::SeqCst)
    }

    /// Revoke every refresh token held by `email`.
    pub fn revoke_refresh_tokens(&self, email: &str) {
        self.state.lock().refresh.retain(|_, e| e != email);
    }
}

// =============================================================================
// Auth API
// =============================================================================

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn has_project_key(headers: &HeaderMap) -> bool {
    headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(ANON_KEY)
}

/// Issue a fresh token pair for `user`.
fn issue_tokens(inner: &mut Inner, user: &FakeUser, expires_in: i64) -> Value {
    let access_token = Uuid::new_v4().to_string();
    let refresh_token = Uuid::new_v4().to_string();
    inner
        .access
        .insert(access_token.clone(), user.email.clone());
    inner
        .refresh
        .insert(refresh_token.clone(), user.email.clone());
    json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": expires_in,
        "refresh_token": refresh_token,
        "user": user.to_json(),
    })
}

async fn health(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    if !has_project_key(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Invalid API key");
    }
    if state.unhealthy.load(Ordering::SeqCst) {
        return error(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable");
    }
    Json(json!({ "name": "fake-auth" })).into_response()
}

#[derive(Deserialize)]
struct GrantQuery {
    grant_type: String,
}

#[derive(Deserialize)]
struct GrantBody {
    email: Option<String>,
    password: Option<String>,
    refresh_token: Option<String>,
}

async fn token(
    State(state): State<Arc<FakeState>>,
    Query(query): Query<GrantQuery>,
    Json(body): Json<GrantBody>,
) -> Response {
    let mut inner = state.lock();
    let user = match query.grant_type.as_str() {
        "password" => {
            let email = body.email.unwrap_or_default().to_lowercase();
            let Some(user) = inner.users.get(&email).cloned() else {
                return invalid_grant("Invalid login credentials");
            };
            if Some(user.password.as_str()) != body.password.as_deref() {
                return invalid_grant("Invalid login credentials");
            }
            if !user.confirmed {
                return invalid_grant("Email not confirmed");
            }
            user
        }
        "refresh_token" => {
            let token = body.refresh_token.unwrap_or_default();
            let Some(email) = inner.refresh.remove(&token) else {
                return invalid_grant("Invalid Refresh Token");
            };
            let Some(user) = inner.users.get(&email).cloned() else {
                return invalid_grant("User not found");
            };
            state.refresh_grants.fetch_add(1, Ordering::SeqCst);
            user
        }
        _ => return error(StatusCode::BAD_REQUEST, "unsupported grant type"),
    };
    let expires_in = state.token_lifetime.load(Ordering::SeqCst);
    Json(issue_tokens(&mut inner, &user, expires_in)).into_response()
}

fn invalid_grant(description: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "invalid_grant", "error_description": description })),
    )
        .into_response()
}

#[derive(Deserialize)]
struct SignupBody {
    email: String,
    password: String,
    #[serde(default)]
    data: Value,
}

async fn signup(State(state): State<Arc<FakeState>>, Json(body): Json<SignupBody>) -> Response {
    let email = body.email.to_lowercase();
    let auto_confirm = state.auto_confirm.load(Ordering::SeqCst);
    let mut inner = state.lock();
    if inner.users.contains_key(&email) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "code": 422, "msg": "User already registered" })),
        )
            .into_response();
    }

    let user = FakeUser {
        id: Uuid::new_v4(),
        email: email.clone(),
        password: body.password,
        full_name: body
            .data
            .get("full_name")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        confirmed: auto_confirm,
    };
    inner.users.insert(email, user.clone());

    if auto_confirm {
        let expires_in = state.token_lifetime.load(Ordering::SeqCst);
        Json(issue_tokens(&mut inner, &user, expires_in)).into_response()
    } else {
        Json(user.to_json()).into_response()
    }
}

async fn logout(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    let mut inner = state.lock();
    if let Some(token) = bearer(&headers) {
        if let Some(email) = inner.access.remove(token) {
            inner.refresh.retain(|_, e| *e != email);
        }
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn recover(headers: HeaderMap) -> Response {
    if !has_project_key(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Invalid API key");
    }
    Json(json!({})).into_response()
}

fn caller(inner: &Inner, headers: &HeaderMap) -> Option<FakeUser> {
    let email = inner.access.get(bearer(headers)?)?;
    inner.users.get(email).cloned()
}

async fn get_user(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> Response {
    let inner = state.lock();
    match caller(&inner, &headers) {
        Some(user) => Json(user.to_json()).into_response(),
        None => error(StatusCode::UNAUTHORIZED, "invalid JWT"),
    }
}

async fn update_user(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut inner = state.lock();
    let Some(user) = caller(&inner, &headers) else {
        return error(StatusCode::UNAUTHORIZED, "invalid JWT");
    };
    let full_name = body
        .pointer("/data/full_name")
        .and_then(Value::as_str)
        .map(ToString::to_string);
    let Some(stored) = inner.users.get_mut(&user.email) else {
        return error(StatusCode::NOT_FOUND, "User not found");
    };
    stored.full_name = full_name;
    Json(stored.to_json()).into_response()
}

// =============================================================================
// Table API
// =============================================================================

/// Who a table request runs as.
enum Role {
    Anon,
    User(Uuid),
}

async fn rest(
    State(state): State<Arc<FakeState>>,
    Path(table): Path<String>,
    method: Method,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response {
    if !has_project_key(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Invalid API key");
    }

    let is_read = method == Method::GET || method == Method::HEAD;
    let flag = if is_read {
        &state.fail_reads
    } else {
        &state.fail_writes
    };
    if flag.load(Ordering::SeqCst) {
        return error(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable");
    }

    let mut inner = state.lock();
    let role = match bearer(&headers) {
        Some(ANON_KEY) => Role::Anon,
        _ => match caller(&inner, &headers) {
            Some(user) => Role::User(user.id),
            None => return error(StatusCode::UNAUTHORIZED, "JWT expired"),
        },
    };

    if matches!(role, Role::Anon) && (OWNED_TABLES.contains(&table.as_str()) || is_read) {
        return error(StatusCode::UNAUTHORIZED, "permission denied");
    }

    let filters = Filters::parse(&params);
    let open_alerts = table == "system_alerts" && state.open_alerts.load(Ordering::SeqCst);
    let rows = inner.tables.entry(table.clone()).or_default();
    let visible =
        |row: &Value| (open_alerts || visible_to(&table, &role, row)) && filters.matches(row);

    match method {
        Method::GET => {
            let found: Vec<Value> = rows
                .iter()
                .filter(|r| visible(r))
                .take(filters.limit.unwrap_or(usize::MAX))
                .cloned()
                .collect();
            Json(found).into_response()
        }
        Method::HEAD => {
            let total = rows.iter().filter(|r| visible(r)).count();
            let range = if total == 0 {
                "*/0".to_string()
            } else {
                format!("0-{}/{total}", total - 1)
            };
            (StatusCode::OK, [("content-range", range)]).into_response()
        }
        Method::POST => {
            let Ok(parsed) = serde_json::from_slice::<Value>(&body) else {
                return error(StatusCode::BAD_REQUEST, "invalid JSON");
            };
            let new_rows: Vec<Value> = match parsed {
                Value::Array(items) => items.into_iter().map(with_defaults).collect(),
                other => vec![with_defaults(other)],
            };
            if let Role::User(id) = role {
                if new_rows
                    .iter()
                    .any(|r| r.get("user_id").and_then(Value::as_str) != Some(&id.to_string()))
                {
                    return error(StatusCode::FORBIDDEN, "row-level security violation");
                }
            }
            if table == "stores" && new_rows.iter().any(|r| duplicate_shop(rows, r)) {
                return error(
                    StatusCode::CONFLICT,
                    "duplicate key value violates unique constraint \"stores_user_shop_key\"",
                );
            }
            rows.extend(new_rows.iter().cloned());
            (StatusCode::CREATED, Json(new_rows)).into_response()
        }
        Method::PATCH => {
            let Ok(Value::Object(changes)) = serde_json::from_slice::<Value>(&body) else {
                return error(StatusCode::BAD_REQUEST, "invalid JSON");
            };
            let mut updated = Vec::new();
            for row in rows.iter_mut().filter(|r| visible(r)) {
                if let Value::Object(fields) = row {
                    for (key, value) in &changes {
                        fields.insert(key.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
            Json(updated).into_response()
        }
        Method::DELETE => {
            let (removed, kept): (Vec<Value>, Vec<Value>) =
                rows.drain(..).partition(|r| visible(r));
            *rows = kept;
            Json(removed).into_response()
        }
        _ => error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"),
    }
}

fn visible_to(table: &str, role: &Role, row: &Value) -> bool {
    let owner = row.get("user_id").and_then(Value::as_str);
    match (table, role) {
        (_, Role::Anon) => false,
        ("system_alerts", Role::User(id)) => owner.is_none() || owner == Some(&id.to_string()),
        (t, Role::User(id)) if OWNED_TABLES.contains(&t) => owner == Some(&id.to_string()),
        _ => true,
    }
}

fn duplicate_shop(rows: &[Value], new: &Value) -> bool {
    let key = |r: &Value| {
        (
            r.get("user_id").cloned(),
            r.get("etsy_shop_name")
                .and_then(Value::as_str)
                .map(str::to_lowercase),
        )
    };
    rows.iter().any(|r| key(r) == key(new))
}

fn with_defaults(mut row: Value) -> Value {
    if let Value::Object(fields) = &mut row {
        let now = Utc::now().to_rfc3339();
        fields
            .entry("id")
            .or_insert_with(|| json!(Uuid::new_v4()));
        fields
            .entry("created_at")
            .or_insert_with(|| json!(now.clone()));
        fields.entry("updated_at").or_insert_with(|| json!(now));
    }
    row
}

/// Text form of a JSON scalar as it appears in a filter.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// One `column.op.value` condition.
struct Condition {
    column: String,
    op: String,
    value: String,
}

impl Condition {
    fn matches(&self, row: &Value) -> bool {
        let field = row.get(&self.column).unwrap_or(&Value::Null);
        match self.op.as_str() {
            "eq" => scalar_text(field).as_deref() == Some(self.value.as_str()),
            "neq" => scalar_text(field).as_deref() != Some(self.value.as_str()),
            "is" if self.value == "null" => field.is_null(),
            _ => false,
        }
    }
}

/// Parsed query-string filters.
struct Filters {
    all: Vec<Condition>,
    any: Vec<Condition>,
    limit: Option<usize>,
}

impl Filters {
    fn parse(params: &[(String, String)]) -> Self {
        let mut filters = Self {
            all: Vec::new(),
            any: Vec::new(),
            limit: None,
        };
        for (key, value) in params {
            match key.as_str() {
                "order" | "select" => {}
                "limit" => filters.limit = value.parse().ok(),
                "or" => {
                    let inner = value.trim_start_matches('(').trim_end_matches(')');
                    filters.any = inner
                        .split(',')
                        .filter_map(|part| {
                            let mut pieces = part.splitn(3, '.');
                            Some(Condition {
                                column: pieces.next()?.to_string(),
                                op: pieces.next()?.to_string(),
                                value: pieces.next()?.to_string(),
                            })
                        })
                        .collect();
                }
                column => {
                    if let Some((op, v)) = value.split_once('.') {
                        filters.all.push(Condition {
                            column: column.to_string(),
                            op: op.to_string(),
                            value: v.to_string(),
                        });
                    }
                }
            }
        }
        filters
    }

    fn matches(&self, row: &Value) -> bool {
        self.all.iter().all(|c| c.matches(row))
            && (self.any.is_empty() || self.any.iter().any(|c| c.matches(row)))
    }
}
