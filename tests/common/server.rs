use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tokio::sync::oneshot;

use queue_rename_fixer::arr::{ArrClient, ServerFlavor};

use super::constants::API_KEY;

/// What the fake server knows and what it has been asked.
#[derive(Debug, Default)]
pub struct ArrState {
    pub queue: Vec<Value>,
    /// Newest first, served in pages of the requested size.
    pub history: Vec<Value>,
    /// Library file the server looks for to report an episode as present.
    pub episode_files: HashMap<i64, PathBuf>,
    pub movie_files: HashMap<i64, PathBuf>,
    /// Number of polls a command stays "started" before completing.
    pub polls_before_completion: usize,

    pub history_pages: Vec<u32>,
    pub commands: Vec<Value>,
    pub deleted: Vec<i64>,
    pub command_polls: HashMap<i64, usize>,
}

type SharedState = Arc<Mutex<ArrState>>;

/// Fake media server listening on a local port.
pub struct TestArrServer {
    pub base_url: String,
    pub state: SharedState,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl TestArrServer {
    pub fn spawn(state: ArrState) -> Self {
        let state = Arc::new(Mutex::new(state));
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let app = router(state.clone());
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let thread = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
                    .unwrap();
            });
        });

        Self {
            base_url,
            state,
            shutdown: Some(shutdown),
            thread: Some(thread),
        }
    }

    pub fn client(&self, flavor: ServerFlavor) -> ArrClient {
        self.client_with_key(flavor, API_KEY)
    }

    pub fn client_with_key(&self, flavor: ServerFlavor, api_key: &str) -> ArrClient {
        ArrClient::new(&self.base_url, api_key.to_string(), flavor, 5).unwrap()
    }

    pub fn command_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .commands
            .iter()
            .map(|c| c["name"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

impl Drop for TestArrServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/queue", get(get_queue))
        .route("/api/queue/{id}", delete(delete_queue_item))
        .route("/api/history", get(get_history))
        .route("/api/command", post(post_command))
        .route("/api/command/{id}", get(get_command))
        .route("/api/episode/{id}", get(get_episode))
        .route("/api/movie/{id}", get(get_movie))
        .layer(middleware::from_fn(require_api_key))
        .with_state(state)
}

async fn require_api_key(
    Query(params): Query<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Response {
    if params.get("apikey").map(String::as_str) != Some(API_KEY) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    next.run(request).await
}

async fn get_queue(State(state): State<SharedState>) -> Json<Value> {
    Json(Value::Array(state.lock().unwrap().queue.clone()))
}

async fn delete_queue_item(State(state): State<SharedState>, Path(id): Path<i64>) -> StatusCode {
    let mut state = state.lock().unwrap();
    let before = state.queue.len();
    state.queue.retain(|entry| entry["id"].as_i64() != Some(id));
    if state.queue.len() == before {
        return StatusCode::NOT_FOUND;
    }
    state.deleted.push(id);
    StatusCode::OK
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryQuery {
    page: u32,
    page_size: u32,
}

async fn get_history(
    State(state): State<SharedState>,
    Query(query): Query<HistoryQuery>,
) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.history_pages.push(query.page);
    let start = (query.page.saturating_sub(1) * query.page_size) as usize;
    let records: Vec<Value> = state
        .history
        .iter()
        .skip(start)
        .take(query.page_size as usize)
        .cloned()
        .collect();
    Json(json!({
        "page": query.page,
        "pageSize": query.page_size,
        "sortKey": "date",
        "sortDirection": "descending",
        "totalRecords": state.history.len(),
        "records": records,
    }))
}

async fn post_command(State(state): State<SharedState>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.commands.push(body.clone());
    let id = state.commands.len() as i64;
    state.command_polls.insert(id, 0);
    Json(json!({
        "id": id,
        "name": body["name"],
        "state": "queued",
    }))
}

async fn get_command(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    let mut state = state.lock().unwrap();
    let threshold = state.polls_before_completion;
    let name = state
        .commands
        .get((id - 1) as usize)
        .map(|c| c["name"].clone())
        .ok_or(StatusCode::NOT_FOUND)?;
    let polls = state.command_polls.entry(id).or_insert(0);
    *polls += 1;
    let command_state = if *polls > threshold {
        "completed"
    } else {
        "started"
    };
    Ok(Json(json!({
        "id": id,
        "name": name,
        "state": command_state,
    })))
}

async fn get_episode(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    let state = state.lock().unwrap();
    let file = state.episode_files.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({
        "id": id,
        "hasFile": file.exists(),
    })))
}

async fn get_movie(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    let state = state.lock().unwrap();
    let file = state.movie_files.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({
        "id": id,
        "title": "Film",
        "hasFile": file.exists(),
    })))
}
