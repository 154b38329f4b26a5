//! `taskgen serve`: the JSON HTTP API over the backlog service.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use taskgen_core::backlog::service::{self, clamp_list_limit};
use taskgen_core::backlog::validate::parse_uuid;
use taskgen_core::backlog::{
    BacklogError, FieldError, GroupRequest, ReorderRequest, RuleTables, SpecInput, TaskUpdate,
    ValidationErrors,
};
use taskgen_core::export::ExportFormat;
use taskgen_db::pool;

use crate::config::ServerSection;

/// Maximum accepted request body size.
pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub rules: Arc<RuleTables>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(pool: PgPool, rules: RuleTables) -> Self {
        Self {
            pool,
            rules: Arc::new(rules),
            started_at: Instant::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    details: Option<Vec<FieldError>>,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
            details: None,
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
            details: None,
        }
    }

    pub fn invalid_id(kind: &str) -> Self {
        Self::bad_request(format!("Invalid {kind} ID format"))
    }

    pub fn validation(errors: ValidationErrors) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "Validation failed".to_string(),
            details: Some(errors.details),
        }
    }

    /// A persistence failure. The cause is logged; the client only sees
    /// `public_message`.
    pub fn internal(public_message: &str, err: &anyhow::Error) -> Self {
        tracing::error!(error = %format!("{err:#}"), "{public_message}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: public_message.to_string(),
            details: None,
        }
    }

    /// Map a service error. `failure` is the message used for storage errors.
    fn from_backlog(err: BacklogError, failure: &str) -> Self {
        match err {
            BacklogError::NotFound { kind, .. } => Self::not_found(not_found_message(kind)),
            BacklogError::Validation(errors) => Self::validation(errors),
            BacklogError::Reorder(e) => Self::task_ids_rejected(e.to_string()),
            BacklogError::Group(e) => Self::task_ids_rejected(e.to_string()),
            BacklogError::NoFieldsToUpdate => Self::bad_request("No fields to update"),
            BacklogError::Storage(e) => Self::internal(failure, &e),
        }
    }

    fn task_ids_rejected(message: String) -> Self {
        tracing::warn!(%message, "rejected task id list");
        Self::validation(ValidationErrors {
            details: vec![FieldError {
                field: "taskIds".to_string(),
                message,
            }],
        })
    }
}

fn not_found_message(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => format!("{}{} not found", first.to_uppercase(), chars.as_str()),
        None => "Not found".to_string(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.message, "details": details }),
            None => json!({ "error": self.message }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
            details: None,
        }
    }
}

fn parse_id(raw: &str, kind: &str) -> Result<Uuid, AppError> {
    parse_uuid(raw).ok_or_else(|| AppError::invalid_id(kind))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// CORS policy: any origin unless a single origin is configured.
pub fn cors_layer(origin: Option<&str>) -> Result<CorsLayer> {
    let Some(origin) = origin else {
        return Ok(CorsLayer::permissive());
    };
    let origin: HeaderValue = origin
        .parse()
        .with_context(|| format!("invalid CORS origin: {origin:?}"))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]))
}

pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/specs", get(list_specs).post(create_spec))
        .route("/api/specs/{id}", get(get_spec).delete(delete_spec))
        .route("/api/specs/{id}/export", get(export_spec))
        .route("/api/specs/{id}/tasks/reorder", put(reorder_tasks))
        .route("/api/specs/{id}/tasks/group", put(group_tasks))
        .route("/api/tasks/{id}", put(update_task))
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(pool: PgPool, rules: RuleTables, server: &ServerSection) -> Result<()> {
    let cors = cors_layer(server.cors_origin.as_deref())?;
    let app = build_router(AppState::new(pool, rules), cors);
    let addr: SocketAddr = format!("{}:{}", server.bind, server.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", server.bind, server.port))?;
    tracing::info!("taskgen serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("taskgen serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Response {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
    .into_response()
}

async fn status(State(state): State<AppState>) -> Response {
    let uptime = state.started_at.elapsed().as_secs();
    let database = match pool::ping(&state.pool).await {
        Ok(latency) => json!({
            "status": "connected",
            "latency_ms": latency.as_millis() as u64,
        }),
        Err(e) => json!({
            "status": "disconnected",
            "error": format!("{e:#}"),
        }),
    };
    Json(json!({
        "backend": { "status": "healthy", "uptime": uptime },
        "database": database,
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<String>,
}

async fn list_specs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Response, AppError> {
    let limit = clamp_list_limit(params.limit.as_deref());
    let specs = service::list_spec_summaries(&state.pool, limit)
        .await
        .map_err(|e| AppError::from_backlog(e, "Failed to list specs"))?;
    Ok(Json(json!({ "specs": specs })).into_response())
}

async fn create_spec(
    State(state): State<AppState>,
    payload: Result<Json<SpecInput>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(input) = payload?;
    let created = service::create_spec_with_backlog(&state.pool, &state.rules, &input)
        .await
        .map_err(|e| AppError::from_backlog(e, "Failed to create spec. Please try again."))?;
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

async fn get_spec(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "spec")?;
    let spec = service::get_spec_with_tasks(&state.pool, id)
        .await
        .map_err(|e| AppError::from_backlog(e, "Failed to retrieve spec"))?;
    Ok(Json(spec).into_response())
}

async fn delete_spec(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "spec")?;
    service::delete_spec(&state.pool, id)
        .await
        .map_err(|e| AppError::from_backlog(e, "Failed to delete spec"))?;
    Ok(Json(json!({ "message": "Spec deleted successfully" })).into_response())
}

#[derive(Debug, Deserialize)]
struct ExportParams {
    format: Option<String>,
}

async fn export_spec(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ExportParams>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "spec")?;
    let format = match params.format.as_deref() {
        None | Some("") => ExportFormat::default(),
        Some(raw) => raw
            .parse::<ExportFormat>()
            .map_err(|e| AppError::bad_request(e.to_string()))?,
    };

    let doc = service::export_spec(&state.pool, id, format)
        .await
        .map_err(|e| AppError::from_backlog(e, "Failed to export spec"))?;

    let disposition = format!("attachment; filename=\"{}\"", doc.filename);
    Ok((
        [
            (header::CONTENT_TYPE, doc.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        doc.body,
    )
        .into_response())
}

async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TaskUpdate>, JsonRejection>,
) -> Result<Response, AppError> {
    let id = parse_id(&id, "task")?;
    let Json(update) = payload?;
    let task = service::update_task(&state.pool, id, &update)
        .await
        .map_err(|e| AppError::from_backlog(e, "Failed to update task"))?;
    Ok(Json(task).into_response())
}

async fn reorder_tasks(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ReorderRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let spec_id = parse_id(&id, "spec")?;
    let Json(request) = payload?;
    let task_ids = request.validate().map_err(AppError::validation)?;
    let tasks = service::reorder_backlog(&state.pool, spec_id, &task_ids)
        .await
        .map_err(|e| AppError::from_backlog(e, "Failed to reorder tasks"))?;
    Ok(Json(json!({ "message": "Tasks reordered successfully", "tasks": tasks })).into_response())
}

async fn group_tasks(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<GroupRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let spec_id = parse_id(&id, "spec")?;
    let Json(request) = payload?;
    let group = request.validate().map_err(AppError::validation)?;
    let tasks = service::group_backlog_items(&state.pool, spec_id, &group)
        .await
        .map_err(|e| AppError::from_backlog(e, "Failed to group tasks"))?;
    Ok(Json(json!({ "message": "Tasks grouped successfully", "tasks": tasks })).into_response())
}

async fn not_found(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found", "path": uri.path() })),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use taskgen_core::backlog::RuleTables;
    use taskgen_test_utils::TestDb;

    use super::{AppState, BODY_LIMIT_BYTES, build_router, cors_layer};

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    fn app(db: &TestDb) -> axum::Router {
        let state = AppState::new(db.pool.clone(), RuleTables::builtin().unwrap());
        build_router(state, cors_layer(None).unwrap())
    }

    async fn send(db: &TestDb, request: Request<Body>) -> axum::response::Response {
        app(db).oneshot(request).await.unwrap()
    }

    async fn get(db: &TestDb, uri: &str) -> axum::response::Response {
        send(db, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn send_json(
        db: &TestDb,
        method: &str,
        uri: &str,
        body: Value,
    ) -> axum::response::Response {
        send(
            db,
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), BODY_LIMIT_BYTES)
            .await
            .unwrap()
            .to_vec()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    async fn create(db: &TestDb, template: &str) -> Value {
        let resp = send_json(
            db,
            "POST",
            "/api/specs",
            json!({
                "goal": "Build a homework tracker",
                "users": "students, teachers",
                "constraints": "GDPR",
                "templateType": template,
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await
    }

    fn task_ids(spec: &Value) -> Vec<String> {
        spec["tasks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap().to_string())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_health_and_status() {
        let db = TestDb::create().await;

        let resp = get(&db, "/health").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));

        let resp = get(&db, "/api/status").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["backend"]["status"], "healthy");
        assert_eq!(json["database"]["status"], "connected");
        assert!(json["database"].get("latency_ms").is_some());

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_create_spec_returns_backlog() {
        let db = TestDb::create().await;

        let spec = create(&db, "web").await;
        assert_eq!(spec["templateType"], "web");
        assert_eq!(spec["constraints"], "GDPR");
        let tasks = spec["tasks"].as_array().unwrap();
        // 2 roles x 4 stories, 12 engineering, 3 base + compliance + platform risk.
        assert_eq!(tasks.len(), 8 + 12 + 5);
        assert_eq!(tasks[0]["sortOrder"], 0);
        assert_eq!(tasks[0]["groupName"], "ungrouped");
        assert_eq!(tasks[0]["specId"], spec["id"]);

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_create_spec_validation_failure() {
        let db = TestDb::create().await;

        let resp = send_json(
            &db,
            "POST",
            "/api/specs",
            json!({ "goal": "ab", "users": "students", "templateType": "desktop" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Validation failed");
        let details = json["details"].as_array().unwrap();
        assert!(details.iter().any(|d| d["field"] == "goal"));
        assert!(details.iter().any(|d| {
            d["field"] == "templateType"
                && d["message"] == "Template type must be web, mobile, or internal"
        }));

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_create_spec_rejects_malformed_json() {
        let db = TestDb::create().await;

        let resp = send(
            &db,
            Request::builder()
                .method("POST")
                .uri("/api/specs")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(json["error"].is_string());

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let db = TestDb::create().await;

        let big = "x".repeat(BODY_LIMIT_BYTES + 1);
        let resp = send_json(
            &db,
            "POST",
            "/api/specs",
            json!({ "goal": big, "users": "students", "templateType": "web" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_list_specs_with_limit() {
        let db = TestDb::create().await;

        create(&db, "web").await;
        let newest = create(&db, "mobile").await;

        let resp = get(&db, "/api/specs?limit=1").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let specs = json["specs"].as_array().unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0]["id"], newest["id"]);
        assert_eq!(specs[0]["taskCount"], 25);

        let json = body_json(get(&db, "/api/specs?limit=bogus").await).await;
        assert_eq!(json["specs"].as_array().unwrap().len(), 2);

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_get_and_delete_spec() {
        let db = TestDb::create().await;

        let spec = create(&db, "internal").await;
        let id = spec["id"].as_str().unwrap();

        let resp = get(&db, &format!("/api/specs/{id}")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["tasks"], spec["tasks"]);

        let resp = send(
            &db,
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/specs/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["message"], "Spec deleted successfully");

        let resp = get(&db, &format!("/api/specs/{id}")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["error"], "Spec not found");

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_invalid_ids_rejected() {
        let db = TestDb::create().await;

        let resp = get(&db, "/api/specs/not-a-uuid").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "Invalid spec ID format");

        let resp = send_json(&db, "PUT", "/api/tasks/123", json!({ "title": "New title" })).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "Invalid task ID format");

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_update_task() {
        let db = TestDb::create().await;

        let spec = create(&db, "web").await;
        let task_id = &task_ids(&spec)[0];

        let resp = send_json(
            &db,
            "PUT",
            &format!("/api/tasks/{task_id}"),
            json!({ "title": "  Edited title ", "groupName": "MVP" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["title"], "Edited title");
        assert_eq!(json["groupName"], "MVP");

        let resp = send_json(&db, "PUT", &format!("/api/tasks/{task_id}"), json!({})).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "No fields to update");

        let missing = uuid::Uuid::new_v4();
        let resp = send_json(
            &db,
            "PUT",
            &format!("/api/tasks/{missing}"),
            json!({ "title": "Edited title" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["error"], "Task not found");

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_reorder_tasks() {
        let db = TestDb::create().await;

        let spec = create(&db, "mobile").await;
        let id = spec["id"].as_str().unwrap();
        let mut ids = task_ids(&spec);
        ids.rotate_left(3);

        let resp = send_json(
            &db,
            "PUT",
            &format!("/api/specs/{id}/tasks/reorder"),
            json!({ "taskIds": ids }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["message"], "Tasks reordered successfully");
        assert_eq!(task_ids(&json), ids);

        // Incomplete order is rejected.
        let resp = send_json(
            &db,
            "PUT",
            &format!("/api/specs/{id}/tasks/reorder"),
            json!({ "taskIds": &ids[..2] }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Validation failed");
        assert_eq!(json["details"][0]["field"], "taskIds");

        // Malformed ids are reported per index.
        let resp = send_json(
            &db,
            "PUT",
            &format!("/api/specs/{id}/tasks/reorder"),
            json!({ "taskIds": ["nope"] }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["details"][0]["field"], "taskIds.0");

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_group_tasks() {
        let db = TestDb::create().await;

        let spec = create(&db, "web").await;
        let id = spec["id"].as_str().unwrap();
        let ids = task_ids(&spec);

        let resp = send_json(
            &db,
            "PUT",
            &format!("/api/specs/{id}/tasks/group"),
            json!({ "taskIds": [ids[0], ids[1]], "groupName": "Sprint 1" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["message"], "Tasks grouped successfully");
        let tasks = json["tasks"].as_array().unwrap();
        assert_eq!(tasks[0]["groupName"], "Sprint 1");
        assert_eq!(tasks[1]["groupName"], "Sprint 1");
        assert_eq!(tasks[2]["groupName"], "ungrouped");

        let resp = send_json(
            &db,
            "PUT",
            &format!("/api/specs/{id}/tasks/group"),
            json!({ "taskIds": [uuid::Uuid::new_v4().to_string()], "groupName": "X" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_export_spec() {
        let db = TestDb::create().await;

        let spec = create(&db, "web").await;
        let id = spec["id"].as_str().unwrap();

        let resp = get(&db, &format!("/api/specs/{id}/export?format=text")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let headers = resp.headers().clone();
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            format!("attachment; filename=\"spec-{id}.txt\"").as_str()
        );
        let body = String::from_utf8(body_bytes(resp).await).unwrap();
        assert!(body.starts_with("SPEC: Build a homework tracker\n"));

        let resp = get(&db, &format!("/api/specs/{id}/export")).await;
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/markdown");

        let resp = get(&db, &format!("/api/specs/{id}/export?format=pdf")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(resp).await["error"],
            "Format must be 'markdown' or 'text'"
        );

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_fallback_not_found() {
        let db = TestDb::create().await;

        let resp = get(&db, "/api/nothing/here").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json, json!({ "error": "Not found", "path": "/api/nothing/here" }));

        db.cleanup().await;
    }

    #[tokio::test]
    async fn test_configured_cors_origin() {
        let db = TestDb::create().await;

        let state = AppState::new(db.pool.clone(), RuleTables::builtin().unwrap());
        let app = build_router(state, cors_layer(Some("http://localhost:5173")).unwrap());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );

        assert!(cors_layer(Some("bad\norigin")).is_err());

        db.cleanup().await;
    }
}
