use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::{actions, Actor},
    entities::execution,
    errors::ServiceError,
    handlers::authorize,
    services::executions::CompleteExecution,
    AppState,
};

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct CompleteExecutionRequest {
    #[serde(default)]
    pub safety_briefing_done: bool,
    #[serde(default)]
    pub quality_check_done: bool,
    #[serde(default)]
    pub tools_returned: bool,
    #[serde(default)]
    pub area_cleaned: bool,
    pub work_summary: Option<String>,
    pub actual_cost: Option<Decimal>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelExecutionRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnswerChecklistItemRequest {
    pub answer: Option<String>,
}

/// Execution row plus its derived projections, as one payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct ExecutionView {
    #[serde(flatten)]
    pub execution: execution::Model,
    pub actual_duration_minutes: i64,
    pub completion_percentage: u8,
}

/// Routes nested under `/api/v1/work-orders`.
pub fn order_router() -> Router<AppState> {
    Router::new()
        .route("/:id/execution", get(get_execution))
        .route("/:id/execution/start", post(start_execution))
        .route("/:id/execution/pause", post(pause_execution))
        .route("/:id/execution/resume", post(resume_execution))
        .route("/:id/execution/complete", post(complete_execution))
        .route("/:id/execution/cancel", post(cancel_execution))
}

/// Routes nested under `/api/v1/checklist-items`.
pub fn checklist_router() -> Router<AppState> {
    Router::new().route("/:id/answer", post(answer_checklist_item))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-orders/{id}/execution/start",
    responses(
        (status = 201, description = "Execution started", body = execution::Model),
        (status = 422, description = "Work order not startable")
    )
)]
async fn start_execution(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::EXECUTION_TRACK)?;
    let created = state.services.executions.start(id, &actor).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-orders/{id}/execution/pause",
    responses((status = 200, description = "Execution paused (idempotent)", body = execution::Model))
)]
async fn pause_execution(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::EXECUTION_TRACK)?;
    Ok(Json(state.services.executions.pause(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-orders/{id}/execution/resume",
    responses((status = 200, description = "Execution resumed (idempotent)", body = execution::Model))
)]
async fn resume_execution(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::EXECUTION_TRACK)?;
    Ok(Json(state.services.executions.resume(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-orders/{id}/execution/complete",
    request_body = CompleteExecutionRequest,
    responses(
        (status = 200, description = "Execution completed", body = execution::Model),
        (status = 422, description = "Required checklist items unanswered")
    )
)]
async fn complete_execution(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<CompleteExecutionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::EXECUTION_TRACK)?;
    let completed = state
        .services
        .executions
        .complete(
            id,
            &actor,
            CompleteExecution {
                safety_briefing_done: req.safety_briefing_done,
                quality_check_done: req.quality_check_done,
                tools_returned: req.tools_returned,
                area_cleaned: req.area_cleaned,
                work_summary: req.work_summary,
                actual_cost: req.actual_cost,
            },
        )
        .await?;
    Ok(Json(completed))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-orders/{id}/execution/cancel",
    request_body = CancelExecutionRequest,
    responses((status = 200, description = "Execution cancelled, work order reverted"))
)]
async fn cancel_execution(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelExecutionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::EXECUTION_TRACK)?;
    let order = state
        .services
        .executions
        .cancel_execution(id, &actor, req.reason)
        .await?;
    Ok(Json(order))
}

#[utoipa::path(
    get,
    path = "/api/v1/work-orders/{id}/execution",
    responses(
        (status = 200, description = "Execution state with derived timing", body = ExecutionView),
        (status = 404, description = "No execution for this work order")
    )
)]
async fn get_execution(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::WORK_ORDERS_READ)?;
    let execution = state
        .services
        .executions
        .get_execution(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("No execution for work order {id}")))?;
    let actual_duration_minutes = state.services.executions.actual_duration_minutes(id).await?;
    let completion_percentage = state.services.executions.completion_percentage(id).await?;
    Ok(Json(ExecutionView {
        execution,
        actual_duration_minutes,
        completion_percentage,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/checklist-items/{id}/answer",
    request_body = AnswerChecklistItemRequest,
    responses((status = 200, description = "Checklist item answered"))
)]
async fn answer_checklist_item(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<AnswerChecklistItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::EXECUTION_TRACK)?;
    let item = state
        .services
        .executions
        .answer_checklist_item(id, req.answer)
        .await?;
    Ok(Json(item))
}
