// libs/appointment-cell/src/router.rs
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AppointmentState};

/// Routes nested under `/doctors`.
pub fn appointment_routes(state: AppointmentState) -> Router {
    let public_routes = Router::new()
        .route("/{doctor_id}/slots", get(handlers::get_available_slots))
        .route("/{doctor_id}/booked", get(handlers::get_booked_slots));

    let protected_routes = Router::new()
        .route("/{doctor_id}/bookings", post(handlers::book_slot))
        .route(
            "/{doctor_id}/bookings/{slot_date}/{slot_time}",
            delete(handlers::cancel_booking),
        )
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
