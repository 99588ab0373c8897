//! Stub Satoru backend for integration tests.
//!
//! Serves the slice of the REST API the client consumes, with per-route hit
//! counters and switches to force auth expiry and failures. Part of the
//! surface responds with the `{ success, data }` envelope and part with raw
//! bodies, mirroring the real backend's mixed convention.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use uuid::Uuid;

use satoru_admin::app::App;
use satoru_admin::config::Config;
use satoru_admin::credentials::MemoryCredentialStore;
use satoru_admin::models::{ApiEnvelope, LoginRequest};

pub const ADMIN_EMAIL: &str = "admin@satoru.io";
pub const SUPER_ADMIN_EMAIL: &str = "super@satoru.io";
pub const INVESTOR_EMAIL: &str = "maria@satoru.io";
pub const PASSWORD: &str = "sup3r-secret";

pub struct BackendState {
    users: HashMap<String, (String, Value)>,
    pub current_user: Mutex<Value>,
    pub valid_access: Mutex<String>,
    pub valid_refresh: Mutex<String>,
    serial: Mutex<u32>,
    pub projects: Mutex<Vec<Value>>,
    pub investors: Mutex<Vec<Value>>,
    hits: Mutex<HashMap<&'static str, usize>>,
    pub refresh_fails: Mutex<bool>,
    pub logout_fails: Mutex<bool>,
    pub stats_fail: Mutex<bool>,
    pub projects_always_unauthorized: Mutex<bool>,
}

impl BackendState {
    fn new() -> Self {
        let admin = user_json(ADMIN_EMAIL, "ADMIN", "Alice", "Admin");
        let mut users = HashMap::new();
        users.insert(ADMIN_EMAIL.to_string(), (PASSWORD.to_string(), admin.clone()));
        users.insert(
            SUPER_ADMIN_EMAIL.to_string(),
            (
                PASSWORD.to_string(),
                user_json(SUPER_ADMIN_EMAIL, "SUPER_ADMIN", "Sofia", "Root"),
            ),
        );
        users.insert(
            INVESTOR_EMAIL.to_string(),
            (
                PASSWORD.to_string(),
                user_json(INVESTOR_EMAIL, "INVESTOR", "Maria", "Lopez"),
            ),
        );

        Self {
            users,
            current_user: Mutex::new(admin),
            valid_access: Mutex::new("access-0".to_string()),
            valid_refresh: Mutex::new("refresh-0".to_string()),
            serial: Mutex::new(0),
            projects: Mutex::new(Vec::new()),
            investors: Mutex::new(Vec::new()),
            hits: Mutex::new(HashMap::new()),
            refresh_fails: Mutex::new(false),
            logout_fails: Mutex::new(false),
            stats_fail: Mutex::new(false),
            projects_always_unauthorized: Mutex::new(false),
        }
    }

    fn hit(&self, key: &'static str) {
        *self.hits.lock().unwrap().entry(key).or_insert(0) += 1;
    }

    pub fn hit_count(&self, key: &'static str) -> usize {
        self.hits.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    fn rotate_tokens(&self) -> (String, String) {
        let mut serial = self.serial.lock().unwrap();
        *serial += 1;
        let access = format!("access-{serial}");
        let refresh = format!("refresh-{serial}");
        *self.valid_access.lock().unwrap() = access.clone();
        *self.valid_refresh.lock().unwrap() = refresh.clone();
        (access, refresh)
    }

    /// Invalidates the access token the client is holding without touching
    /// the refresh token, simulating access-token expiry.
    pub fn expire_access_token(&self) {
        *self.valid_access.lock().unwrap() = "expired-on-server".to_string();
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.valid_access.lock().unwrap());
        headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(|value| value == expected)
            .unwrap_or(false)
    }
}

pub fn user_json(email: &str, role: &str, first: &str, last: &str) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "email": email,
        "firstName": first,
        "lastName": last,
        "role": role,
        "isActive": true,
        "createdAt": "2026-01-01T00:00:00Z",
        "updatedAt": "2026-01-01T00:00:00Z"
    })
}

pub fn project_json(
    name: &str,
    status: &str,
    token_price: f64,
    total_tokens: i64,
    tokens_sold: i64,
) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "name": name,
        "slug": name.to_lowercase().replace(' ', "-"),
        "description": "",
        "location": "San Salvador",
        "images": [],
        "documents": [],
        "tokenPrice": token_price,
        "totalTokens": total_tokens,
        "tokensSold": tokens_sold,
        "minInvestment": 100.0,
        "maxInvestment": null,
        "expectedReturn": 8.5,
        "expectedReturnMax": null,
        "projectValue": token_price * total_tokens as f64,
        "status": status,
        "startDate": null,
        "endDate": null,
        "metadata": null,
        "createdAt": "2026-01-01T00:00:00Z",
        "updatedAt": "2026-01-01T00:00:00Z"
    })
}

pub fn investor_json(first: &str, last: &str, email: &str, kyc_status: &str) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "email": email,
        "firstName": first,
        "lastName": last,
        "phone": null,
        "documentType": "DUI",
        "documentNumber": "01234567-8",
        "walletAddress": null,
        "kycStatus": kyc_status,
        "kycData": null,
        "createdAt": "2026-01-01T00:00:00Z",
        "updatedAt": "2026-01-01T00:00:00Z"
    })
}

fn envelope(data: Value) -> Json<ApiEnvelope<Value>> {
    Json(ApiEnvelope {
        success: true,
        data: Some(data),
        error: None,
    })
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

pub async fn spawn_backend() -> (String, Arc<BackendState>) {
    let state = Arc::new(BackendState::new());
    let router = router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub backend");
    let addr = listener.local_addr().expect("stub backend address");

    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub backend");
    });

    (format!("http://{addr}"), state)
}

/// Client app wired to the stub backend, with an inspectable in-memory
/// credential store.
pub fn test_app(base_url: &str) -> (App, Arc<MemoryCredentialStore>) {
    let store = Arc::new(MemoryCredentialStore::new());
    let app = App::with_credential_store(Config::with_base_url(base_url), store.clone());
    (app, store)
}

pub async fn login_as_admin(app: &App) {
    let logged_in = app
        .auth
        .login(LoginRequest {
            email: ADMIN_EMAIL.to_string(),
            password: PASSWORD.to_string(),
        })
        .await;
    assert!(logged_in, "admin login against the stub backend failed");
}

fn router(state: Arc<BackendState>) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/users/me", get(users_me))
        .route("/projects", get(projects_list).post(project_create))
        .route(
            "/projects/:id",
            get(project_get).patch(project_update).delete(project_delete),
        )
        .route("/projects/:id/status/:status", patch(project_status))
        .route("/projects/:id/images/upload", post(image_upload))
        .route("/projects/:id/images/:filename", delete(image_delete))
        .route("/investors", get(investors_list))
        .route("/investors/:id", get(investor_get))
        .route("/investors/:id/kyc", patch(investor_kyc))
        .route("/dashboard/stats", get(dashboard_stats))
        .with_state(state)
}

async fn login(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    state.hit("login");
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    match state.users.get(email) {
        Some((expected, user)) if expected == password => {
            *state.current_user.lock().unwrap() = user.clone();
            let (access, refresh) = state.rotate_tokens();
            Json(json!({
                "accessToken": access,
                "refreshToken": refresh,
                "user": user,
            }))
            .into_response()
        }
        _ => error_response(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    }
}

async fn register(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    state.hit("register");
    let email = body["email"].as_str().unwrap_or_default();
    if state.users.contains_key(email) {
        return error_response(StatusCode::CONFLICT, "Email already registered");
    }
    let full_name = body["fullName"].as_str().unwrap_or_default();
    let (first, last) = full_name.split_once(' ').unwrap_or((full_name, ""));
    let role = body["role"].as_str().unwrap_or("INVESTOR");
    Json(user_json(email, role, first, last)).into_response()
}

async fn refresh(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    state.hit("refresh");
    if *state.refresh_fails.lock().unwrap() {
        return error_response(StatusCode::UNAUTHORIZED, "Refresh token revoked");
    }
    let presented = body["refreshToken"].as_str().unwrap_or_default();
    if presented != *state.valid_refresh.lock().unwrap() {
        return error_response(StatusCode::UNAUTHORIZED, "Invalid refresh token");
    }
    let (access, refresh) = state.rotate_tokens();
    Json(json!({ "accessToken": access, "refreshToken": refresh })).into_response()
}

async fn logout(State(state): State<Arc<BackendState>>) -> Response {
    state.hit("logout");
    if *state.logout_fails.lock().unwrap() {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Logout failed");
    }
    StatusCode::OK.into_response()
}

async fn users_me(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    state.hit("me");
    if !state.authorized(&headers) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    envelope(state.current_user.lock().unwrap().clone()).into_response()
}

async fn projects_list(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.hit("projects_list");
    if *state.projects_always_unauthorized.lock().unwrap() || !state.authorized(&headers) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let projects = state.projects.lock().unwrap();
    let filtered: Vec<Value> = projects
        .iter()
        .filter(|project| match params.get("status") {
            Some(status) => project["status"].as_str() == Some(status),
            None => true,
        })
        .cloned()
        .collect();
    Json(Value::Array(filtered)).into_response()
}

async fn project_get(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response {
    state.hit("project_get");
    if !state.authorized(&headers) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let projects = state.projects.lock().unwrap();
    match find_by_id(&projects, id) {
        Some(project) => Json(project.clone()).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Project not found"),
    }
}

async fn project_create(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.hit("project_create");
    if !state.authorized(&headers) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let mut project = project_json(
        body["name"].as_str().unwrap_or_default(),
        body["status"].as_str().unwrap_or("DRAFT"),
        body["tokenPrice"].as_f64().unwrap_or_default(),
        body["totalTokens"].as_i64().unwrap_or_default(),
        0,
    );
    merge_fields(&mut project, &body, &["slug", "description", "location", "minInvestment"]);
    state.projects.lock().unwrap().push(project.clone());
    Json(project).into_response()
}

async fn project_update(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Response {
    state.hit("project_update");
    if !state.authorized(&headers) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let mut projects = state.projects.lock().unwrap();
    match find_by_id_mut(&mut projects, id) {
        Some(project) => {
            if let (Some(target), Some(patch)) = (project.as_object_mut(), body.as_object()) {
                for (key, value) in patch {
                    target.insert(key.clone(), value.clone());
                }
            }
            Json(project.clone()).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "Project not found"),
    }
}

async fn project_status(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path((id, status)): Path<(Uuid, String)>,
) -> Response {
    state.hit("project_status");
    if !state.authorized(&headers) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let mut projects = state.projects.lock().unwrap();
    match find_by_id_mut(&mut projects, id) {
        Some(project) => {
            let current = project["status"].as_str().unwrap_or_default();
            if current == "COMPLETED" || current == "CANCELLED" {
                return error_response(StatusCode::BAD_REQUEST, "Illegal status transition");
            }
            project["status"] = json!(status);
            Json(project.clone()).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "Project not found"),
    }
}

async fn project_delete(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response {
    state.hit("project_delete");
    if !state.authorized(&headers) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let mut projects = state.projects.lock().unwrap();
    let before = projects.len();
    projects.retain(|project| project["id"].as_str() != Some(id.to_string().as_str()));
    if projects.len() == before {
        return error_response(StatusCode::NOT_FOUND, "Project not found");
    }
    envelope(Value::Null).into_response()
}

async fn image_upload(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Response {
    state.hit("image_upload");
    if !state.authorized(&headers) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let mut file_name = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            file_name = field.file_name().map(str::to_string);
            let _ = field.bytes().await;
        }
    }
    let Some(file_name) = file_name else {
        return error_response(StatusCode::BAD_REQUEST, "Missing file");
    };

    let mut projects = state.projects.lock().unwrap();
    match find_by_id_mut(&mut projects, id) {
        Some(project) => {
            let url = format!("/uploads/{file_name}");
            project["images"]
                .as_array_mut()
                .expect("images array")
                .push(json!(url));
            Json(project.clone()).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "Project not found"),
    }
}

async fn image_delete(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path((id, file_name)): Path<(Uuid, String)>,
) -> Response {
    state.hit("image_delete");
    if !state.authorized(&headers) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let mut projects = state.projects.lock().unwrap();
    match find_by_id_mut(&mut projects, id) {
        Some(project) => {
            let images = project["images"].as_array_mut().expect("images array");
            images.retain(|url| {
                url.as_str()
                    .map(|url| !url.ends_with(&file_name))
                    .unwrap_or(true)
            });
            Json(project.clone()).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "Project not found"),
    }
}

async fn investors_list(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.hit("investors_list");
    if !state.authorized(&headers) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let investors = state.investors.lock().unwrap();
    let needle = params.get("search").map(|s| s.to_lowercase());
    let filtered: Vec<Value> = investors
        .iter()
        .filter(|investor| match params.get("kycStatus") {
            Some(status) => investor["kycStatus"].as_str() == Some(status),
            None => true,
        })
        .filter(|investor| match &needle {
            Some(needle) => ["email", "firstName", "lastName"].iter().any(|field| {
                investor[field]
                    .as_str()
                    .map(|value| value.to_lowercase().contains(needle))
                    .unwrap_or(false)
            }),
            None => true,
        })
        .cloned()
        .collect();
    envelope(Value::Array(filtered)).into_response()
}

async fn investor_get(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response {
    state.hit("investor_get");
    if !state.authorized(&headers) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let investors = state.investors.lock().unwrap();
    match find_by_id(&investors, id) {
        Some(investor) => envelope(investor.clone()).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Investor not found"),
    }
}

async fn investor_kyc(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> Response {
    state.hit("investor_kyc");
    if !state.authorized(&headers) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    let mut investors = state.investors.lock().unwrap();
    match find_by_id_mut(&mut investors, id) {
        Some(investor) => {
            investor["kycStatus"] = body["status"].clone();
            if !body["kycData"].is_null() {
                investor["kycData"] = body["kycData"].clone();
            }
            envelope(investor.clone()).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "Investor not found"),
    }
}

async fn dashboard_stats(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    state.hit("stats");
    if *state.stats_fail.lock().unwrap() {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Statistics unavailable");
    }
    if !state.authorized(&headers) {
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let projects = state.projects.lock().unwrap();
    let investors = state.investors.lock().unwrap();
    let active_projects = projects
        .iter()
        .filter(|p| p["status"].as_str() == Some("ACTIVE"))
        .count() as i64;
    let pending_kyc = investors
        .iter()
        .filter(|i| i["kycStatus"].as_str() == Some("PENDING"))
        .count() as i64;

    Json(json!({
        "totalInvestors": investors.len() as i64,
        "activeInvestors": investors.len() as i64,
        "totalProjects": projects.len() as i64,
        "activeProjects": active_projects,
        "pendingKyc": pending_kyc,
        "totalInvested": 125_000.0,
        "totalRaised": 250_000.0,
    }))
    .into_response()
}

fn find_by_id(items: &[Value], id: Uuid) -> Option<&Value> {
    items
        .iter()
        .find(|item| item["id"].as_str() == Some(id.to_string().as_str()))
}

fn find_by_id_mut(items: &mut [Value], id: Uuid) -> Option<&mut Value> {
    items
        .iter_mut()
        .find(|item| item["id"].as_str() == Some(id.to_string().as_str()))
}

fn merge_fields(target: &mut Value, source: &Value, keys: &[&str]) {
    if let (Some(target), Some(source)) = (target.as_object_mut(), source.as_object()) {
        for key in keys {
            if let Some(value) = source.get(*key) {
                target.insert((*key).to_string(), value.clone());
            }
        }
    }
}
