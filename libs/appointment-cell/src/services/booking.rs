// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::auth::User;

use crate::error::BookingError;
use crate::models::{parse_slot_time, BookSlotRequest, BookedSet, Booking, BookingWindow, DateKey, DaySlots};
use crate::services::planner::SlotPlanner;
use crate::services::store::BookingStore;

pub struct SlotBookingService {
    store: Arc<dyn BookingStore>,
    planner: SlotPlanner,
}

impl SlotBookingService {
    pub fn new(store: Arc<dyn BookingStore>, window: BookingWindow) -> Self {
        Self {
            store,
            planner: SlotPlanner::new(window),
        }
    }

    pub fn planner(&self) -> &SlotPlanner {
        &self.planner
    }

    pub async fn booked_slots(&self, doctor_id: &str) -> Result<BookedSet, BookingError> {
        self.store.booked_slots(doctor_id).await
    }

    /// Fresh availability for a doctor. Nothing is cached between calls.
    pub async fn available_slots(
        &self,
        doctor_id: &str,
        now: NaiveDateTime,
    ) -> Result<Vec<DaySlots>, BookingError> {
        debug!("Planning slots for doctor {} at {}", doctor_id, now);
        let booked = self.store.booked_slots_on(doctor_id, &self.planner.horizon(now)).await?;
        Ok(self.planner.compute_available_slots(&booked, now))
    }

    /// Validates the requested slot against the planner and then reserves it.
    /// The store re-checks availability at write time, so a slot taken since
    /// the caller last planned comes back as `SlotUnavailable`.
    pub async fn book_slot(
        &self,
        patient_id: &str,
        doctor_id: &str,
        request: &BookSlotRequest,
        now: NaiveDateTime,
    ) -> Result<Booking, BookingError> {
        let time = parse_slot_time(&request.slot_time).ok_or_else(|| {
            BookingError::InvalidSlot(format!(
                "'{}' is not a slot time like '02:30 PM'",
                request.slot_time
            ))
        })?;
        let date = request.slot_date.to_date().ok_or_else(|| {
            BookingError::InvalidSlot(format!("{} is not a calendar date", request.slot_date))
        })?;

        if !self.planner.is_offered(date, time, now) {
            return Err(BookingError::InvalidSlot(format!(
                "{} {} is not an open slot",
                request.slot_date, request.slot_time
            )));
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            doctor_id: doctor_id.to_string(),
            patient_id: patient_id.to_string(),
            slot_date: request.slot_date,
            slot_time: request.slot_time.clone(),
            scheduled_at: date.and_time(time),
            created_at: Utc::now(),
        };

        match self.store.reserve(&booking).await {
            Ok(()) => {
                info!(
                    "Booked {} {} with doctor {} for patient {}",
                    booking.slot_date, booking.slot_time, doctor_id, patient_id
                );
                Ok(booking)
            }
            Err(e @ BookingError::SlotUnavailable { .. }) => {
                warn!(
                    "Lost booking race for {} {} with doctor {}",
                    request.slot_date, request.slot_time, doctor_id
                );
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Frees a booked slot. Allowed for the patient who holds it, the doctor
    /// it belongs to, and admins.
    pub async fn cancel_booking(
        &self,
        user: &User,
        doctor_id: &str,
        date: DateKey,
        time: &str,
    ) -> Result<Booking, BookingError> {
        let booking = self
            .store
            .find(doctor_id, date, time)
            .await?
            .ok_or(BookingError::BookingNotFound)?;

        if booking.patient_id != user.id && !user.can_manage_schedule(doctor_id) {
            return Err(BookingError::Forbidden(
                "only the patient, the doctor, or an admin can cancel this booking".to_string(),
            ));
        }

        // Released by id: a slot rebooked since `find` stays with its new holder.
        let released = self.store.release(&booking).await?;
        info!("Cancelled booking {} ({} {}) with doctor {}", released.id, date, time, doctor_id);
        Ok(released)
    }
}
