use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use uuid::Uuid;

use crate::handlers::render::{markdown_to_html, meal_list_line, MealMetrics};
use crate::handlers::{MealHandler, SessionStore, SummaryOutcome, UploadOutcome};

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub struct AppState {
    pub meal_handler: Arc<MealHandler>,
    pub sessions: SessionStore,
}

pub fn create_router(meal_handler: Arc<MealHandler>, sessions: SessionStore) -> Router {
    let state = Arc::new(AppState {
        meal_handler,
        sessions,
    });

    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health_check))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", axum::routing::delete(reset_session))
        .route("/api/sessions/:id/meals", get(list_meals).post(upload_meal))
        .route("/api/sessions/:id/summary", post(generate_summary))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

async fn index_page() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn create_session(State(state): State<Arc<AppState>>) -> Response {
    let (id, created_at, _) = state.sessions.create();
    (
        StatusCode::CREATED,
        Json(json!({ "id": id, "created_at": created_at })),
    )
        .into_response()
}

async fn reset_session(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>) -> StatusCode {
    if state.sessions.reset(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn list_meals(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>) -> Response {
    let Some(session) = state.sessions.get(&id) else {
        return session_not_found(id);
    };

    let session = session.lock().await;
    let meals: Vec<_> = session
        .meals
        .meals()
        .iter()
        .enumerate()
        .map(|(i, meal)| {
            json!({
                "position": i + 1,
                "line": meal_list_line(i + 1, meal),
                "meal": meal,
                "metrics": MealMetrics::from(meal),
            })
        })
        .collect();

    Json(json!({
        "session_id": session.id,
        "created_at": session.created_at,
        "count": meals.len(),
        "meals": meals,
    }))
    .into_response()
}

async fn upload_meal(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    if state.sessions.get(&id).is_none() {
        return session_not_found(id);
    }

    let mut image = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("image") => match field.bytes().await {
                Ok(bytes) => {
                    image = Some(bytes);
                    break;
                }
                Err(e) => return bad_request(format!("failed to read upload: {}", e)),
            },
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => return bad_request(format!("invalid multipart body: {}", e)),
        }
    }

    let Some(image) = image else {
        return bad_request("multipart field 'image' is required".to_string());
    };
    log::info!("📨 Upload for session {}: {} bytes", id, image.len());

    match state.meal_handler.handle_upload(&state.sessions, id, &image).await {
        UploadOutcome::Logged {
            meal,
            metrics,
            position,
            persistence,
        } => Json(json!({
            "status": "logged",
            "position": position,
            "meal": meal,
            "metrics": metrics,
            "persistence": persistence,
        }))
        .into_response(),
        UploadOutcome::Failed(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "status": "error",
                "kind": e.tag(),
                "error": e.to_string(),
                "details": e.details(),
            })),
        )
            .into_response(),
        UploadOutcome::InvalidImage(message) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "invalid_image", "error": message })),
        )
            .into_response(),
        UploadOutcome::SessionNotFound => session_not_found(id),
    }
}

async fn generate_summary(Path(id): Path<Uuid>, State(state): State<Arc<AppState>>) -> Response {
    let Some(session) = state.sessions.get(&id) else {
        return session_not_found(id);
    };

    match state.meal_handler.handle_summary(&session).await {
        SummaryOutcome::Report(markdown) => Json(json!({
            "status": "report",
            "html": markdown_to_html(&markdown),
            "markdown": markdown,
        }))
        .into_response(),
        SummaryOutcome::Error(message) => Json(json!({
            "status": "error",
            "message": message,
        }))
        .into_response(),
    }
}

fn session_not_found(id: Uuid) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("session {} not found", id) })),
    )
        .into_response()
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}
