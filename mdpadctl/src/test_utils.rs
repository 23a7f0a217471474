//! Test utilities for CLI testing
//!
//! Provides a mock pad server and test helpers for integration testing.

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Form, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

const SESSION_COOKIE: &str = "connect.sid";

/// Mock server state
#[derive(Debug, Clone)]
pub struct MockServerState {
    /// Stored notes, keyed by private id
    pub notes: Arc<Mutex<HashMap<String, String>>>,
    /// Published notes: private id to public id
    pub published: Arc<Mutex<HashMap<String, String>>>,
    /// Active session tokens
    pub sessions: Arc<Mutex<Vec<String>>>,
    /// Note ids listed in the account history, oldest first
    pub history: Arc<Mutex<Vec<String>>>,
    /// Credentials the login endpoints accept, as (user, password)
    pub credentials: Arc<Mutex<(String, String)>>,
    /// Whether unauthenticated note creation is allowed
    pub guest_posting: Arc<Mutex<bool>>,
    /// Total requests handled, for asserting "no network call" paths
    pub hits: Arc<AtomicUsize>,
    counter: Arc<AtomicUsize>,
}

impl Default for MockServerState {
    fn default() -> Self {
        Self {
            notes: Arc::new(Mutex::new(HashMap::new())),
            published: Arc::new(Mutex::new(HashMap::new())),
            sessions: Arc::new(Mutex::new(Vec::new())),
            history: Arc::new(Mutex::new(Vec::new())),
            credentials: Arc::new(Mutex::new((
                "user@example.com".to_string(),
                "hunter2".to_string(),
            ))),
            guest_posting: Arc::new(Mutex::new(true)),
            hits: Arc::new(AtomicUsize::new(0)),
            counter: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockServerState {
    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}{}", prefix, n)
    }

    fn session_is_valid(&self, headers: &HeaderMap) -> bool {
        let Some(cookie) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) else {
            return false;
        };
        let token = cookie.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE).then(|| value.to_string())
        });
        match token {
            Some(token) => self.sessions.lock().unwrap().contains(&token),
            None => false,
        }
    }

    fn store_note(&self, id: &str, body: String) {
        self.notes.lock().unwrap().insert(id.to_string(), body);
        let mut history = self.history.lock().unwrap();
        if !history.iter().any(|h| h == id) {
            history.push(id.to_string());
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EmailLoginForm {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct LdapLoginForm {
    username: String,
    password: String,
}

/// Mock pad server
#[derive(Debug, Default)]
pub struct MockServer {
    state: MockServerState,
    port: u16,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the mock server and return the base URL.
    pub async fn start(mut self) -> Result<(Self, String)> {
        let app = self.create_router();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        self.port = addr.port();

        let server_url = format!("http://127.0.0.1:{}", self.port);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Mock server error: {}", e);
            }
        });

        // Give the server a moment to start and verify it's running
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                break;
            }
        }

        Ok((self, server_url))
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &MockServerState {
        &self.state
    }

    fn create_router(&self) -> Router {
        let state = self.state.clone();
        Router::new()
            .route("/new", post(create_note))
            .route("/new/:note_id", post(create_note_with_id))
            .route("/login", post(login_email))
            .route("/auth/ldap", post(login_ldap))
            .route("/logout", get(logout))
            .route("/me", get(me))
            .route("/history", get(history))
            .route("/history/:note_id", delete(delete_note))
            .route("/s/:public_id", get(public_page))
            .route("/build/slide.css", get(slide_css))
            .route("/js/slide.js", get(slide_js))
            .route("/:note_id/download", get(download))
            .route("/:note_id/pdf", get(pdf))
            .route("/:note_id/publish", get(publish))
            .route("/:note_id/slide", get(slide_page))
            .layer(middleware::from_fn_with_state(state.clone(), count_hits))
            .with_state(state)
    }
}

async fn count_hits(State(state): State<MockServerState>, req: Request, next: Next) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    next.run(req).await
}

fn redirect_to(location: &str) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, location.to_string())],
    )
        .into_response()
}

fn login_response(state: &MockServerState, ok: bool) -> Response {
    if ok {
        let token = state.next_id("sess-");
        state.sessions.lock().unwrap().push(token.clone());
        (
            StatusCode::FOUND,
            [
                (header::LOCATION, "/".to_string()),
                (
                    header::SET_COOKIE,
                    format!("{}={}; Path=/; HttpOnly", SESSION_COOKIE, token),
                ),
            ],
        )
            .into_response()
    } else {
        redirect_to("/")
    }
}

async fn login_email(
    State(state): State<MockServerState>,
    Form(form): Form<EmailLoginForm>,
) -> Response {
    let ok = {
        let creds = state.credentials.lock().unwrap();
        form.email == creds.0 && form.password == creds.1
    };
    login_response(&state, ok)
}

async fn login_ldap(
    State(state): State<MockServerState>,
    Form(form): Form<LdapLoginForm>,
) -> Response {
    let ok = {
        let creds = state.credentials.lock().unwrap();
        form.username == creds.0 && form.password == creds.1
    };
    login_response(&state, ok)
}

async fn logout(State(state): State<MockServerState>, headers: HeaderMap) -> Response {
    if state.session_is_valid(&headers) {
        state.sessions.lock().unwrap().clear();
    }
    redirect_to("/")
}

async fn me(State(state): State<MockServerState>, headers: HeaderMap) -> Response {
    if state.session_is_valid(&headers) {
        Json(json!({
            "status": "ok",
            "name": "Test User",
            "id": "user-1",
            "photo": "https://pad.test/avatar.png",
        }))
        .into_response()
    } else {
        Json(json!({ "status": "forbidden" })).into_response()
    }
}

async fn create_note(
    State(state): State<MockServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let guests_allowed = *state.guest_posting.lock().unwrap();
    if !guests_allowed && !state.session_is_valid(&headers) {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }

    let id = state.next_id("note-");
    state.store_note(&id, String::from_utf8_lossy(&body).into_owned());
    redirect_to(&format!("/{}", id))
}

async fn create_note_with_id(
    State(state): State<MockServerState>,
    Path(note_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let guests_allowed = *state.guest_posting.lock().unwrap();
    if !guests_allowed && !state.session_is_valid(&headers) {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }
    if state.notes.lock().unwrap().contains_key(&note_id) {
        return (StatusCode::CONFLICT, "Note already exists").into_response();
    }

    state.store_note(&note_id, String::from_utf8_lossy(&body).into_owned());
    redirect_to(&format!("/{}", note_id))
}

async fn download(State(state): State<MockServerState>, Path(note_id): Path<String>) -> Response {
    match state.notes.lock().unwrap().get(&note_id) {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            body.clone(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Note not found").into_response(),
    }
}

async fn pdf(State(state): State<MockServerState>, Path(note_id): Path<String>) -> Response {
    match state.notes.lock().unwrap().get(&note_id) {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/pdf")],
            format!("%PDF-1.4 mock render of {} bytes", body.len()),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Note not found").into_response(),
    }
}

async fn publish(State(state): State<MockServerState>, Path(note_id): Path<String>) -> Response {
    if !state.notes.lock().unwrap().contains_key(&note_id) {
        return (StatusCode::NOT_FOUND, "Note not found").into_response();
    }

    // Publishing twice must hand back the same public id.
    let public_id = {
        let mut published = state.published.lock().unwrap();
        match published.get(&note_id) {
            Some(existing) => existing.clone(),
            None => {
                let fresh = state.next_id("pub-");
                published.insert(note_id.clone(), fresh.clone());
                fresh
            }
        }
    };
    redirect_to(&format!("/s/{}", public_id))
}

async fn public_page(
    State(state): State<MockServerState>,
    Path(public_id): Path<String>,
) -> Response {
    let note = {
        let published = state.published.lock().unwrap();
        published
            .iter()
            .find(|(_, pubid)| **pubid == public_id)
            .map(|(note_id, _)| note_id.clone())
    };
    let Some(note_id) = note else {
        return (StatusCode::NOT_FOUND, "Not published").into_response();
    };

    let body = state
        .notes
        .lock()
        .unwrap()
        .get(&note_id)
        .cloned()
        .unwrap_or_default();
    let html = format!(
        "<html><head><link rel=\"stylesheet\" href=\"/build/slide.css\"></head>\
         <body><pre>{}</pre></body></html>",
        body
    );
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
        .into_response()
}

async fn slide_page(State(state): State<MockServerState>, Path(note_id): Path<String>) -> Response {
    let body = match state.notes.lock().unwrap().get(&note_id) {
        Some(body) => body.clone(),
        None => return (StatusCode::NOT_FOUND, "Note not found").into_response(),
    };

    let html = format!(
        "<html><head><link rel=\"stylesheet\" href=\"/build/slide.css\"></head>\
         <body><section>{}</section><script src=\"/js/slide.js\"></script></body></html>",
        body
    );
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
        .into_response()
}

async fn slide_css() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/css")],
        ".reveal { color: black; }",
    )
        .into_response()
}

async fn slide_js() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/javascript")],
        "window.slides = true;",
    )
        .into_response()
}

async fn history(State(state): State<MockServerState>, headers: HeaderMap) -> Response {
    if !state.session_is_valid(&headers) {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }

    let entries: Vec<serde_json::Value> = {
        let history = state.history.lock().unwrap();
        let notes = state.notes.lock().unwrap();
        history
            .iter()
            .map(|id| {
                let title = notes
                    .get(id)
                    .and_then(|body| body.lines().next())
                    .map(|line| line.trim_start_matches('#').trim().to_string())
                    .unwrap_or_else(|| "Untitled".to_string());
                json!({ "id": id, "text": title, "time": 1_700_000_000_i64, "tags": [] })
            })
            .collect()
    };
    Json(json!({ "history": entries })).into_response()
}

async fn delete_note(
    State(state): State<MockServerState>,
    Path(note_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !state.session_is_valid(&headers) {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }

    let mut history = state.history.lock().unwrap();
    match history.iter().position(|id| *id == note_id) {
        Some(pos) => {
            history.remove(pos);
            (StatusCode::OK, format!("Deleted {}", note_id)).into_response()
        }
        None => (StatusCode::NOT_FOUND, "Note not found in history").into_response(),
    }
}
