//! HTTP server used to exercise the client end to end.
//!
//! Routes:
//! - `ANY /echo` and `ANY /echo/{*rest}` answer with a JSON description of
//!   the request they received.
//! - `ANY /status/{code}` answers with `code` and the `message` query
//!   parameter as a plain-text body.
//! - `GET /delay/{ms}` sleeps `ms` milliseconds, then answers `{"x":1}`.
//! - `GET /secure` requires Basic credentials `username:0123`.
//! - `/tasks` and `/tasks/{id}` are an in-memory resource whose failures
//!   (404, 409, 422) answer with an `ApiError` JSON body.

use std::{
    collections::BTreeMap,
    sync::Arc,
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Basic credentials accepted by `/secure` (`username:0123`).
pub const SECURE_AUTHORIZATION: &str = "Basic dXNlcm5hbWU6MDEyMw==";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub done: bool,
}

#[derive(Deserialize)]
pub struct NewTask {
    pub name: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Deserialize)]
pub struct TaskChanges {
    pub name: Option<String>,
    pub done: Option<bool>,
}

/// Body of every failed `/tasks` answer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiError {
    pub error: String,
}

struct Rejection(StatusCode, String);

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (self.0, Json(ApiError { error: self.1 })).into_response()
    }
}

/// What `/echo` saw.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub message: Option<String>,
}

/// Tasks in creation order. Names are unique.
pub type Db = Arc<RwLock<Vec<Task>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Vec::new()));
    Router::new()
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .route("/status/{code}", any(status))
        .route("/delay/{ms}", get(delay))
        .route("/secure", get(secure))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        seen.entry(name.to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: seen,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn status(Path(code): Path<u16>, Query(query): Query<StatusQuery>) -> (StatusCode, String) {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = query
        .message
        .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());
    (status, message)
}

async fn delay(Path(ms): Path<u64>) -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(serde_json::json!({ "x": 1 }))
}

async fn secure(headers: HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, &'static str)> {
    match headers.get(AUTHORIZATION) {
        Some(value) if value == SECURE_AUTHORIZATION => {
            Ok(Json(serde_json::json!({ "status_code": 200, "data": "testSuccess - GET" })))
        }
        _ => Err((StatusCode::UNAUTHORIZED, "\"bad creds\"")),
    }
}

async fn list_tasks(State(db): State<Db>) -> Json<Vec<Task>> {
    Json(db.read().await.clone())
}

fn check_name(tasks: &[Task], name: &str, renamed: Option<Uuid>) -> Result<(), Rejection> {
    if name.trim().is_empty() {
        return Err(Rejection(
            StatusCode::UNPROCESSABLE_ENTITY,
            "task name must not be empty".to_string(),
        ));
    }
    if tasks.iter().any(|t| t.name == name && Some(t.id) != renamed) {
        return Err(Rejection(
            StatusCode::CONFLICT,
            format!("task {name:?} already exists"),
        ));
    }
    Ok(())
}

fn not_found(id: Uuid) -> Rejection {
    Rejection(StatusCode::NOT_FOUND, format!("task {id} not found"))
}

async fn create_task(
    State(db): State<Db>,
    Json(input): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), Rejection> {
    let mut tasks = db.write().await;
    check_name(&tasks, &input.name, None)?;
    let task = Task {
        id: Uuid::new_v4(),
        name: input.name,
        done: input.done,
    };
    tasks.push(task.clone());
    Ok((StatusCode::CREATED, Json(task)))
}

async fn get_task(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Task>, Rejection> {
    let tasks = db.read().await;
    tasks
        .iter()
        .find(|t| t.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(id))
}

async fn update_task(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(changes): Json<TaskChanges>,
) -> Result<Json<Task>, Rejection> {
    let mut tasks = db.write().await;
    let index = tasks
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| not_found(id))?;
    if let Some(name) = &changes.name {
        check_name(&tasks, name, Some(id))?;
    }
    let task = &mut tasks[index];
    if let Some(name) = changes.name {
        task.name = name;
    }
    if let Some(done) = changes.done {
        task.done = done;
    }
    Ok(Json(task.clone()))
}

async fn delete_task(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<StatusCode, Rejection> {
    let mut tasks = db.write().await;
    let index = tasks
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| not_found(id))?;
    tasks.remove(index);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(name: &str) -> Task {
        Task {
            id: Uuid::new_v4(),
            name: name.to_string(),
            done: false,
        }
    }

    #[test]
    fn new_task_defaults_done_to_false() {
        let input: NewTask = serde_json::from_str(r#"{"name":"No done field"}"#).unwrap();
        assert_eq!(input.name, "No done field");
        assert!(!input.done);
    }

    #[test]
    fn blank_name_is_unprocessable() {
        let Rejection(status, message) = check_name(&[], "  ", None).unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(message, "task name must not be empty");
    }

    #[test]
    fn duplicate_name_conflicts_unless_it_is_the_same_task() {
        let existing = task("Write docs");
        let Rejection(status, message) =
            check_name(std::slice::from_ref(&existing), "Write docs", None).unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(message, r#"task "Write docs" already exists"#);

        assert!(check_name(std::slice::from_ref(&existing), "Write docs", Some(existing.id)).is_ok());
    }

    #[test]
    fn api_error_serializes_as_error_field() {
        let json = serde_json::to_value(ApiError { error: "nope".to_string() }).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "nope" }));
    }

    #[test]
    fn echo_roundtrips_through_json() {
        let echo = Echo {
            method: "GET".to_string(),
            path: "/echo".to_string(),
            query: Some("a=1".to_string()),
            headers: BTreeMap::from([("accept".to_string(), vec!["application/json".to_string()])]),
            body: String::new(),
        };
        let json = serde_json::to_string(&echo).unwrap();
        let back: Echo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, echo);
    }
}
