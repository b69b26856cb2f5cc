//!
//! groupgate HTTP server
//! ---------------------
//! Axum-based HTTP surface for the authorization gateway.
//!
//! Responsibilities:
//! - Signup/login endpoints backed by the credential store.
//! - Session issuance: opaque `sid` cookie keyed to a session-store record.
//! - The `/check` endpoint evaluating the `group-expression` header through
//!   the decision service, shaped by the configured response policy.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use anyhow::Context;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::decide::DecisionService;
use crate::error::AppError;
use crate::groups;
use crate::session::{generate_token, SessionRecord};
use crate::store::{MemoryStore, SessionStore};
use crate::users::{PublicUser, UserStore};

const SESSION_COOKIE: &str = "sid";

/// How a deny decision is surfaced: `Hard` rejects with a 403 status, `Soft`
/// always answers 204 and reports the decision in headers only. One engine,
/// one configuration switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePolicy {
    Hard,
    Soft,
}

impl ResponsePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hard" => Some(Self::Hard),
            "soft" => Some(Self::Soft),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
        }
    }
}

/// Shared server state injected into all handlers.
///
/// Holds the credential store, the session store handle and the decision
/// service built over it, plus the configured response policy. Everything is
/// passed in at construction; there is no process-global state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub decisions: DecisionService,
    pub policy: ResponsePolicy,
}

impl AppState {
    pub fn new(users: Arc<UserStore>, sessions: Arc<dyn SessionStore>, policy: ResponsePolicy) -> Self {
        let decisions = DecisionService::new(sessions.clone());
        Self { users, sessions, decisions, policy }
    }
}

fn log_startup(data_root: &str, policy: ResponsePolicy) {
    let cwd = std::env::current_dir().ok();
    let root = std::path::Path::new(data_root);
    info!(
        target: "startup",
        "groupgate starting. cwd={:?}, data_root={} (exists={}), policy={}",
        cwd, data_root, root.exists(), policy.as_str()
    );
}

/// Start the groupgate HTTP server bound to the given port.
///
/// Opens the credential and session stores under `data_root` and mounts all
/// routes. Sessions are restored from the last snapshot when one exists.
pub async fn run_with_config(http_port: u16, data_root: &str, policy: ResponsePolicy) -> anyhow::Result<()> {
    log_startup(data_root, policy);

    std::fs::create_dir_all(data_root)
        .with_context(|| format!("Failed to create or access data root: {}", data_root))?;
    let root = std::path::Path::new(data_root);
    let users = Arc::new(
        UserStore::open(root.join("users.json"))
            .with_context(|| format!("While opening user store under: {}", data_root))?,
    );
    let sessions: Arc<dyn SessionStore> = Arc::new(MemoryStore::open(root.join("sessions")));
    let state = AppState::new(users, sessions, policy);

    let app = router(state);
    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Mount all routes over the given state. Separated from `run_with_config`
/// so tests can drive the router with injected stores.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "groupgate ok" }))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/check", any(check))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SignupPayload {
    username: String,
    password: String,
    #[serde(default)]
    groups: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name { return Some(v[1..].to_string()); }
        }
    }
    None
}

fn set_session_cookie(token: &str) -> HeaderValue {
    // HttpOnly cookie scoped to path / with SameSite=Strict; TLS termination
    // happens in front of the gateway
    HeaderValue::from_str(&format!("{}={}; HttpOnly; SameSite=Strict; Path=/", SESSION_COOKIE, token)).unwrap()
}

fn error_body(app: &AppError) -> Json<serde_json::Value> {
    Json(json!({"status":"error","code": app.code_str(), "message": app.message()}))
}

fn app_status(app: &AppError) -> StatusCode {
    StatusCode::from_u16(app.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn signup(State(state): State<AppState>, Json(payload): Json<SignupPayload>) -> Response {
    match state.users.signup(&payload.username, &payload.password, &payload.groups) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            let app = AppError::from(e);
            if matches!(app, AppError::Unavailable { .. } | AppError::Internal { .. }) {
                error!("signup failed: {app}");
            }
            (app_status(&app), error_body(&app)).into_response()
        }
    }
}

async fn login(State(state): State<AppState>, Json(payload): Json<LoginPayload>) -> Response {
    let Some(user) = state.users.find_by_username(&payload.username) else {
        return (StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized"}))).into_response();
    };
    if !crate::users::verify_password(&user.password_hash, &payload.password) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"status":"unauthorized"}))).into_response();
    }

    let token = generate_token();
    let group_set: HashSet<String> = user.groups.iter().cloned().collect();
    let record = SessionRecord { user_id: user.id.clone(), groups: groups::encode(&group_set) };
    if let Err(e) = state.sessions.put(&token, record) {
        // Login must fail visibly when the session cannot be recorded
        error!("session write failed: {e}");
        let app = AppError::Unavailable { code: "store_unavailable".into(), message: e.to_string() };
        return (app_status(&app), error_body(&app)).into_response();
    }

    let mut headers = HeaderMap::new();
    headers.insert("Set-Cookie", set_session_cookie(&token));
    (StatusCode::OK, headers, Json(PublicUser::from(&user))).into_response()
}

async fn check(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let expression = headers
        .get("group-expression")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let token = parse_cookie(&headers, SESSION_COOKIE);

    let decision = match state.decisions.authorize(token.as_deref(), expression.as_deref()) {
        Ok(d) => d,
        Err(e) => {
            let app = AppError::from(e);
            if matches!(app, AppError::Unavailable { .. }) {
                error!("check failed: {app}");
            }
            // No `allowed` header on failures: callers must not mistake an
            // error for a deny decision
            return (app_status(&app), error_body(&app)).into_response();
        }
    };

    match state.policy {
        ResponsePolicy::Hard => {
            if decision.allowed {
                let mut h = HeaderMap::new();
                h.insert("allowed", HeaderValue::from_static("1"));
                (StatusCode::NO_CONTENT, h).into_response()
            } else {
                StatusCode::FORBIDDEN.into_response()
            }
        }
        ResponsePolicy::Soft => {
            let mut h = HeaderMap::new();
            h.insert("allowed", HeaderValue::from_static(if decision.allowed { "1" } else { "0" }));
            let uid = decision.user_id.unwrap_or_default();
            h.insert("user-id", HeaderValue::from_str(&uid).unwrap_or(HeaderValue::from_static("")));
            (StatusCode::NO_CONTENT, h).into_response()
        }
    }
}
