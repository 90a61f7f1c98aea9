use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::{actions, Actor},
    errors::ServiceError,
    handlers::authorize,
    services::parts::PlannedLine,
    AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlannedLineRequest {
    pub part_id: Uuid,
    pub part_name: String,
    pub estimated_quantity: Decimal,
    pub unit_cost: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReplacePlannedLinesRequest {
    pub lines: Vec<PlannedLineRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuantityRequest {
    pub quantity: Decimal,
}

/// Routes nested under `/api/v1/work-orders`.
pub fn order_router() -> Router<AppState> {
    Router::new().route("/:id/parts", get(list_lines).put(replace_planned_lines))
}

/// Routes nested under `/api/v1/part-lines`.
pub fn line_router() -> Router<AppState> {
    Router::new()
        .route("/:id/reserve", post(reserve))
        .route("/:id/issue", post(issue))
        .route("/:id/use", post(use_parts))
        .route("/:id/return", post(return_parts))
}

#[utoipa::path(
    put,
    path = "/api/v1/work-orders/{id}/parts",
    request_body = ReplacePlannedLinesRequest,
    responses((status = 200, description = "Resulting line set, in-flight lines untouched"))
)]
async fn replace_planned_lines(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<ReplacePlannedLinesRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::PARTS_MANAGE)?;
    let lines = req
        .lines
        .into_iter()
        .map(|l| PlannedLine {
            part_id: l.part_id,
            part_name: l.part_name,
            estimated_quantity: l.estimated_quantity,
            unit_cost: l.unit_cost,
        })
        .collect();
    Ok(Json(
        state.services.parts.replace_planned_lines(id, lines).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/work-orders/{id}/parts",
    responses((status = 200, description = "All part lines of the work order"))
)]
async fn list_lines(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::WORK_ORDERS_READ)?;
    Ok(Json(state.services.parts.lines(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/part-lines/{id}/reserve",
    request_body = QuantityRequest,
    responses(
        (status = 200, description = "Line reserved"),
        (status = 422, description = "Line not in planned state")
    )
)]
async fn reserve(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<QuantityRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::PARTS_MANAGE)?;
    Ok(Json(
        state.services.parts.reserve(id, req.quantity, &actor).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/part-lines/{id}/issue",
    responses((status = 200, description = "Line issued"))
)]
async fn issue(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::PARTS_MANAGE)?;
    Ok(Json(state.services.parts.issue(id, &actor).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/part-lines/{id}/use",
    request_body = QuantityRequest,
    responses((status = 200, description = "Consumption recorded, cost rebased"))
)]
async fn use_parts(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<QuantityRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::PARTS_MANAGE)?;
    Ok(Json(
        state
            .services
            .parts
            .use_parts(id, req.quantity, &actor)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/part-lines/{id}/return",
    responses((status = 200, description = "Line returned to stock"))
)]
async fn return_parts(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::PARTS_MANAGE)?;
    Ok(Json(state.services.parts.return_parts(id, &actor).await?))
}
