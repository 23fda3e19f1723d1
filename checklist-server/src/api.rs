use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use checklist_core::{
    seed, AuthResponse, BoardView, GuideStepView, InitializeResponse, LoginRequest,
    ReconciliationResponse, RegisterRequest, SessionResponse, ToggleResponse,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::controller::ChecklistController;
use crate::errors::ServerResult;
use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", delete(close_session))
        .route("/api/sessions/:id/board", get(get_board))
        .route(
            "/api/sessions/:id/tasks/:section_id/:task_id/toggle",
            post(toggle_task),
        )
        .route("/api/sessions/:id/connection/test", post(test_connection))
        .route("/api/sessions/:id/connection/initialize", post(initialize))
        .route("/api/sessions/:id/setup/complete", post(complete_setup))
        .route("/api/sessions/:id/reconciliation", get(get_reconciliation))
        .route("/api/sessions/:id/reconciliation/retry", post(retry_writes))
        .route("/api/setup/script", get(setup_script))
        .route("/api/setup/guide", get(setup_guide))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve `app` until the listener fails.
pub async fn serve(addr: &str, app: Router) -> ServerResult<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ServerResult<Json<AuthResponse>> {
    let username = req.validate()?;
    let user = state.credentials.register(&username, &req.password).await?;

    let (session_id, session) = state.sessions.open(state.store.clone(), Some(user.clone())).await;
    let board = session.controller.lock().await.view();

    Ok(Json(AuthResponse {
        user,
        session_id,
        board,
    }))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ServerResult<Json<AuthResponse>> {
    let username = req.validate()?;
    let user = state.credentials.login(&username, &req.password).await?;
    tracing::info!(user_id = user.id, "User logged in");

    let (session_id, session) = state.sessions.open(state.store.clone(), Some(user.clone())).await;
    let board = session.controller.lock().await.view();

    Ok(Json(AuthResponse {
        user,
        session_id,
        board,
    }))
}

/// Anonymous session over the shared checklist.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> ServerResult<Json<SessionResponse>> {
    let (session_id, session) = state.sessions.open(state.store.clone(), None).await;
    let board = session.controller.lock().await.view();
    Ok(Json(SessionResponse { session_id, board }))
}

pub async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ServerResult<StatusCode> {
    state.sessions.close(&session_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_board(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ServerResult<Json<BoardView>> {
    let session = state.sessions.get(&session_id)?;
    let controller = session.controller.lock().await;
    Ok(Json(controller.view()))
}

/// Responds as soon as the local flip is done; the store write continues in
/// the background.
pub async fn toggle_task(
    State(state): State<Arc<AppState>>,
    Path((session_id, section_id, task_id)): Path<(Uuid, String, String)>,
) -> ServerResult<Json<ToggleResponse>> {
    let session = state.sessions.get(&session_id)?;
    let mut controller = session.controller.lock().await;

    let toggled = controller.toggle(&section_id, &task_id).await?;

    Ok(Json(ToggleResponse {
        task_id: toggled.task_id,
        completed: toggled.completed,
        board: controller.view(),
    }))
}

pub async fn test_connection(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ServerResult<Json<BoardView>> {
    let session = state.sessions.get(&session_id)?;
    let mut controller = session.controller.lock().await;

    controller.test_connection().await?;
    Ok(Json(controller.view()))
}

pub async fn initialize(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ServerResult<Json<InitializeResponse>> {
    let session = state.sessions.get(&session_id)?;
    let mut controller = session.controller.lock().await;

    let outcome = controller.initialize().await?;
    Ok(Json(InitializeResponse {
        outcome,
        message: outcome.message().to_string(),
        board: controller.view(),
    }))
}

pub async fn complete_setup(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ServerResult<Json<BoardView>> {
    let session = state.sessions.get(&session_id)?;
    let mut controller = session.controller.lock().await;

    controller.complete_manual_setup().await;
    Ok(Json(controller.view()))
}

pub async fn get_reconciliation(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ServerResult<Json<ReconciliationResponse>> {
    let session = state.sessions.get(&session_id)?;
    let controller = session.controller.lock().await;
    Ok(Json(reconciliation_response(&controller).await))
}

/// Unlike a toggle, a retry waits for its writes so the response shows
/// whether they landed.
pub async fn retry_writes(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> ServerResult<Json<ReconciliationResponse>> {
    let session = state.sessions.get(&session_id)?;
    let mut controller = session.controller.lock().await;

    for write in controller.retry_failed_writes().await? {
        if let Err(e) = write.await {
            tracing::error!(%e, "Retry write task panicked");
        }
    }

    Ok(Json(reconciliation_response(&controller).await))
}

async fn reconciliation_response(controller: &ChecklistController) -> ReconciliationResponse {
    ReconciliationResponse {
        entries: controller.reconciliation().await,
        divergent: controller.has_divergence().await,
    }
}

pub async fn setup_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        seed::SETUP_SCRIPT,
    )
}

pub async fn setup_guide() -> Json<Vec<GuideStepView>> {
    Json(seed::SETUP_GUIDE.iter().map(GuideStepView::from).collect())
}
