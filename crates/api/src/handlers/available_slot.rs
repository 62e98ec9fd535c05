use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tutorlink_core::models::pagination::{Page, PageParams};
use tutorlink_core::models::slot::{
    CreateSlotRequest, SlotDetailsResponse, SlotResponse, UpdateSlotRequest,
};
use uuid::Uuid;

use crate::{
    middleware::{auth::AuthenticatedActor, error_handling::AppError},
    services::scheduling::SchedulingService,
    ApiState,
};

#[axum::debug_handler]
pub async fn create_slot(
    State(state): State<Arc<ApiState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<CreateSlotRequest>,
) -> Result<(StatusCode, Json<SlotResponse>), AppError> {
    let slot = SchedulingService::new(&state.db_pool)
        .create_slot(&actor, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(slot)))
}

#[axum::debug_handler]
pub async fn update_slot(
    State(state): State<Arc<ApiState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSlotRequest>,
) -> Result<Json<SlotResponse>, AppError> {
    let slot = SchedulingService::new(&state.db_pool)
        .update_slot(&actor, id, payload)
        .await?;

    Ok(Json(slot))
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(state): State<Arc<ApiState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    SchedulingService::new(&state.db_pool)
        .delete_slot(&actor, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// Upcoming slots for the calling teacher, each with its active booking so
// pending requests are visible at a glance
#[axum::debug_handler]
pub async fn my_current_slots(
    State(state): State<Arc<ApiState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<SlotDetailsResponse>>, AppError> {
    let page = SchedulingService::new(&state.db_pool)
        .current_slots(&actor, params)
        .await?;

    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn my_past_slots(
    State(state): State<Arc<ApiState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<SlotResponse>>, AppError> {
    let page = SchedulingService::new(&state.db_pool)
        .past_slots(&actor, params)
        .await?;

    Ok(Json(page))
}

// Public browse view: no actor required
#[axum::debug_handler]
pub async fn teacher_free_slots(
    State(state): State<Arc<ApiState>>,
    Path(teacher_id): Path<Uuid>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<SlotResponse>>, AppError> {
    let page = SchedulingService::new(&state.db_pool)
        .teacher_free_slots(teacher_id, params)
        .await?;

    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn slot_details(
    State(state): State<Arc<ApiState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<i64>,
) -> Result<Json<SlotDetailsResponse>, AppError> {
    let details = SchedulingService::new(&state.db_pool)
        .slot_details(&actor, id)
        .await?;

    Ok(Json(details))
}
