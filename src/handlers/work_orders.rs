use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{actions, Actor},
    entities::work_order,
    errors::ServiceError,
    handlers::authorize,
    models::{
        PriorityLabel, WorkOrderCategory, WorkOrderRelationship, WorkOrderSource, WorkOrderStatus,
    },
    services::work_orders::{CreateWorkOrder, WorkOrderFilters},
    AppState,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateWorkOrderRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    pub category: WorkOrderCategory,
    pub type_id: Option<Uuid>,
    pub priority: Option<PriorityLabel>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<Decimal>,
    pub estimated_parts_cost: Option<Decimal>,
    pub estimated_labor_cost: Option<Decimal>,
    #[serde(default)]
    pub source: WorkOrderSource,
    pub related_work_order_id: Option<Uuid>,
    pub relationship: Option<WorkOrderRelationship>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionRequest {
    pub target: WorkOrderStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEstimatesRequest {
    pub estimated_hours: Option<Decimal>,
    pub estimated_parts_cost: Option<Decimal>,
    pub estimated_labor_cost: Option<Decimal>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    pub status: Option<WorkOrderStatus>,
    pub category: Option<WorkOrderCategory>,
    pub assigned_technician: Option<Uuid>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    50
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WorkOrderListResponse {
    pub items: Vec<work_order::Model>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_work_orders).post(create_work_order))
        .route("/:id", get(get_work_order))
        .route("/:id/transition", post(transition_work_order))
        .route("/:id/estimates", put(update_estimates))
        .route("/:id/history", get(status_history))
        .route("/:id/score", get(score))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-orders",
    request_body = CreateWorkOrderRequest,
    responses(
        (status = 201, description = "Work order created", body = work_order::Model),
        (status = 400, description = "Validation failure")
    )
)]
async fn create_work_order(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateWorkOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::WORK_ORDERS_CREATE)?;
    req.validate()?;

    let created = state
        .services
        .work_orders
        .create_work_order(
            CreateWorkOrder {
                title: req.title,
                description: req.description,
                category: req.category,
                type_id: req.type_id,
                priority: req.priority,
                due_date: req.due_date,
                estimated_hours: req.estimated_hours,
                estimated_parts_cost: req.estimated_parts_cost,
                estimated_labor_cost: req.estimated_labor_cost,
                source: req.source,
                related_work_order_id: req.related_work_order_id,
                relationship: req.relationship,
            },
            &actor,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/work-orders",
    params(ListQuery),
    responses((status = 200, description = "Work order page", body = WorkOrderListResponse))
)]
async fn list_work_orders(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::WORK_ORDERS_READ)?;
    let (items, total) = state
        .services
        .work_orders
        .list_work_orders(
            WorkOrderFilters {
                status: query.status,
                category: query.category,
                assigned_technician: query.assigned_technician,
            },
            query.page,
            query.page_size,
        )
        .await?;
    Ok(Json(WorkOrderListResponse {
        items,
        total,
        page: query.page,
        page_size: query.page_size,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/work-orders/{id}",
    responses(
        (status = 200, description = "Work order", body = work_order::Model),
        (status = 404, description = "Unknown work order")
    )
)]
async fn get_work_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::WORK_ORDERS_READ)?;
    let order = state
        .services
        .work_orders
        .get_work_order(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Work order {id} not found")))?;
    Ok(Json(order))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-orders/{id}/transition",
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Transitioned work order", body = work_order::Model),
        (status = 422, description = "Transition not allowed")
    )
)]
async fn transition_work_order(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<TransitionRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::WORK_ORDERS_TRANSITION)?;
    let updated = state
        .services
        .work_orders
        .transition(id, req.target, &actor, req.reason)
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    put,
    path = "/api/v1/work-orders/{id}/estimates",
    request_body = UpdateEstimatesRequest,
    responses((status = 200, description = "Updated work order", body = work_order::Model))
)]
async fn update_estimates(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEstimatesRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::WORK_ORDERS_PLAN)?;
    let updated = state
        .services
        .work_orders
        .update_estimates(
            id,
            req.estimated_hours,
            req.estimated_parts_cost,
            req.estimated_labor_cost,
        )
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    get,
    path = "/api/v1/work-orders/{id}/history",
    responses((status = 200, description = "Transition log, oldest first"))
)]
async fn status_history(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::WORK_ORDERS_READ)?;
    let history = state.services.work_orders.status_history(id).await?;
    Ok(Json(history))
}

#[utoipa::path(
    get,
    path = "/api/v1/work-orders/{id}/score",
    responses((status = 200, description = "Current urgency score"))
)]
async fn score(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&actor, actions::WORK_ORDERS_READ)?;
    let score = state.services.work_orders.score(id).await?;
    Ok(Json(json!({ "work_order_id": id, "score": score })))
}
