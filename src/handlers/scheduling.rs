use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    auth::{actions, Actor},
    errors::ServiceError,
    handlers::authorize,
    models::WorkOrderCategory,
    services::scheduling::{CalendarFilters, ScheduleAssignment},
    AppState,
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    pub technician_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ScheduleRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub technician_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchScheduleRequest {
    pub assignments: Vec<ScheduleAssignment>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CalendarQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub technician_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub category: Option<WorkOrderCategory>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WorkloadQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OptimizeRequest {
    pub order_ids: Vec<Uuid>,
    pub technician_ids: Vec<Uuid>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/availability", get(availability))
        .route("/work-orders/:id", post(schedule_one))
        .route("/batch", post(schedule_batch))
        .route("/calendar", get(calendar))
        .route("/workload/:technician_id", get(workload))
        .route("/optimize", post(optimize))
}

#[utoipa::path(
    get,
    path = "/api/v1/scheduling/availability",
    params(AvailabilityQuery),
    responses((status = 200, description = "Whether the technician is free in the window"))
)]
async fn availability(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<AvailabilityQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::SCHEDULING_READ)?;
    Ok(Json(
        state
            .services
            .scheduling
            .availability(query.technician_id, query.start, query.end)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/scheduling/work-orders/{id}",
    request_body = ScheduleRequest,
    responses(
        (status = 200, description = "Scheduled work order"),
        (status = 409, description = "Window conflicts with an existing assignment")
    )
)]
async fn schedule_one(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<ScheduleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::SCHEDULING_MANAGE)?;
    let updated = state
        .services
        .scheduling
        .schedule_one(id, req.start, req.end, req.technician_id, req.team_id, &actor)
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    post,
    path = "/api/v1/scheduling/batch",
    request_body = BatchScheduleRequest,
    responses((status = 200, description = "Per-item outcomes; sibling failures do not abort"))
)]
async fn schedule_batch(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<BatchScheduleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::SCHEDULING_MANAGE)?;
    Ok(Json(
        state
            .services
            .scheduling
            .schedule_batch(req.assignments, &actor)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/scheduling/calendar",
    params(CalendarQuery),
    responses((status = 200, description = "Scheduled orders in the window, grouped per assignee"))
)]
async fn calendar(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<CalendarQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::SCHEDULING_READ)?;
    Ok(Json(
        state
            .services
            .scheduling
            .calendar(
                query.start,
                query.end,
                CalendarFilters {
                    technician_id: query.technician_id,
                    team_id: query.team_id,
                    category: query.category,
                },
            )
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/scheduling/workload/{technician_id}",
    params(WorkloadQuery),
    responses((status = 200, description = "Scheduled hours against capacity for the window"))
)]
async fn workload(
    State(state): State<AppState>,
    actor: Actor,
    Path(technician_id): Path<Uuid>,
    Query(query): Query<WorkloadQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::SCHEDULING_READ)?;
    Ok(Json(
        state
            .services
            .scheduling
            .workload(technician_id, query.start, query.end)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/scheduling/optimize",
    request_body = OptimizeRequest,
    responses((status = 200, description = "Proposed assignments; nothing persisted"))
)]
async fn optimize(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<OptimizeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::SCHEDULING_MANAGE)?;
    Ok(Json(
        state
            .services
            .scheduling
            .optimize(req.order_ids, req.technician_ids, req.start, req.end)
            .await?,
    ))
}
