use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/bookings", post(handlers::booking::create_booking))
        .route("/api/bookings/my", get(handlers::booking::my_bookings))
        .route(
            "/api/bookings/received",
            get(handlers::booking::received_bookings),
        )
        .route(
            "/api/bookings/:id/status",
            put(handlers::booking::decide_booking),
        )
        .route("/api/bookings/:id", delete(handlers::booking::cancel_booking))
}
