use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tutorlink_core::models::booking::{
    BookingResponse, CreateBookingRequest, DecideBookingRequest,
};

use crate::{
    middleware::{auth::AuthenticatedActor, error_handling::AppError},
    services::scheduling::SchedulingService,
    ApiState,
};

#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<Arc<ApiState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let booking = SchedulingService::new(&state.db_pool)
        .create_booking(&actor, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

// Bookings the calling actor made as a student
#[axum::debug_handler]
pub async fn my_bookings(
    State(state): State<Arc<ApiState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = SchedulingService::new(&state.db_pool)
        .bookings_as_student(&actor)
        .await?;

    Ok(Json(bookings))
}

// Bookings received on the calling actor's published slots
#[axum::debug_handler]
pub async fn received_bookings(
    State(state): State<Arc<ApiState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = SchedulingService::new(&state.db_pool)
        .bookings_as_teacher(&actor)
        .await?;

    Ok(Json(bookings))
}

#[axum::debug_handler]
pub async fn decide_booking(
    State(state): State<Arc<ApiState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<i64>,
    Json(payload): Json<DecideBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = SchedulingService::new(&state.db_pool)
        .decide_booking(&actor, id, payload)
        .await?;

    Ok(Json(booking))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<Arc<ApiState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    SchedulingService::new(&state.db_pool)
        .cancel_booking(&actor, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
