// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use shared_config::{AppConfig, BookingStoreKind};
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{BookSlotRequest, Booking, BookingWindow, DateKey};
use crate::services::{
    BookingStore, Clock, InMemoryBookingStore, SlotBookingService, SupabaseBookingStore, SystemClock,
};

#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub booking_service: Arc<SlotBookingService>,
    pub clock: Arc<dyn Clock>,
}

impl AppointmentState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn BookingStore>, clock: Arc<dyn Clock>) -> Self {
        let window = BookingWindow::from_config(&config);
        Self {
            booking_service: Arc::new(SlotBookingService::new(store, window)),
            config,
            clock,
        }
    }

    /// Wires the store and clock the config asks for.
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        let store: Arc<dyn BookingStore> = match config.booking_store {
            BookingStoreKind::Memory => Arc::new(InMemoryBookingStore::new()),
            BookingStoreKind::Supabase => Arc::new(SupabaseBookingStore::new(&config)),
        };
        let clock = Arc::new(SystemClock::new(config.clinic_utc_offset_minutes));

        info!("Using {} booking store", config.booking_store);
        Self::new(config, store, clock)
    }
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<AppointmentState>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let now = state.clock.now();
    let days = state.booking_service.available_slots(&doctor_id, now).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "generated_at": now,
        "window": state.booking_service.planner().window(),
        "days": days,
    })))
}

#[axum::debug_handler]
pub async fn get_booked_slots(
    State(state): State<AppointmentState>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let booked = state.booking_service.booked_slots(&doctor_id).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "slots_booked": booked,
    })))
}

// ==============================================================================
// AUTHENTICATED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<AppointmentState>,
    Path(doctor_id): Path<String>,
    Extension(user): Extension<User>,
    Json(request): Json<BookSlotRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let now = state.clock.now();
    let booking = state
        .booking_service
        .book_slot(&user.id, &doctor_id, &request, now)
        .await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<AppointmentState>,
    Path((doctor_id, slot_date, slot_time)): Path<(String, DateKey, String)>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    state
        .booking_service
        .cancel_booking(&user, &doctor_id, slot_date, &slot_time)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
