use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/available-slots",
            post(handlers::available_slot::create_slot),
        )
        .route(
            "/api/available-slots/:id",
            put(handlers::available_slot::update_slot),
        )
        .route(
            "/api/available-slots/:id",
            delete(handlers::available_slot::delete_slot),
        )
        .route(
            "/api/available-slots/:id/details",
            get(handlers::available_slot::slot_details),
        )
        .route(
            "/api/available-slots/my-slots/current",
            get(handlers::available_slot::my_current_slots),
        )
        .route(
            "/api/available-slots/my-slots/past",
            get(handlers::available_slot::my_past_slots),
        )
        .route(
            "/api/available-slots/teacher/:teacher_id",
            get(handlers::available_slot::teacher_free_slots),
        )
}
