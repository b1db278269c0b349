use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::BookingError;
use crate::models::{BookedSet, Booking, DateKey};

/// Persistence boundary for confirmed bookings.
///
/// `reserve` must be atomic: of any number of concurrent calls for the same
/// (doctor, date, time), at most one returns `Ok`. The rest get
/// `BookingError::SlotUnavailable`.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn booked_slots(&self, doctor_id: &str) -> Result<BookedSet, BookingError>;

    /// Booked slots restricted to `dates`. Stores that can filter at the source
    /// should override this.
    async fn booked_slots_on(&self, doctor_id: &str, dates: &[DateKey]) -> Result<BookedSet, BookingError> {
        let booked = self.booked_slots(doctor_id).await?;
        Ok(booked
            .iter()
            .filter(|(date, _)| dates.contains(date))
            .map(|(date, time)| (*date, time.clone()))
            .collect())
    }

    async fn reserve(&self, booking: &Booking) -> Result<(), BookingError>;

    async fn find(&self, doctor_id: &str, date: DateKey, time: &str) -> Result<Option<Booking>, BookingError>;

    /// Frees the slot held by exactly this booking. If the slot is now held by
    /// a different booking, or by none, returns `BookingNotFound` and leaves it
    /// untouched.
    async fn release(&self, booking: &Booking) -> Result<Booking, BookingError>;
}

type DoctorBookings = BTreeMap<(DateKey, String), Booking>;

/// Process-local store. The write lock covers both the availability check and
/// the insert.
#[derive(Default)]
pub struct InMemoryBookingStore {
    bookings: RwLock<HashMap<String, DoctorBookings>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn booked_slots(&self, doctor_id: &str) -> Result<BookedSet, BookingError> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .get(doctor_id)
            .map(|slots| slots.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn reserve(&self, booking: &Booking) -> Result<(), BookingError> {
        let mut bookings = self.bookings.write().await;
        let slots = bookings.entry(booking.doctor_id.clone()).or_default();

        let slot_key = (booking.slot_date, booking.slot_time.clone());
        if slots.contains_key(&slot_key) {
            return Err(BookingError::SlotUnavailable {
                date: booking.slot_date,
                time: booking.slot_time.clone(),
            });
        }

        slots.insert(slot_key, booking.clone());
        debug!(
            "Reserved {} {} for doctor {}",
            booking.slot_date, booking.slot_time, booking.doctor_id
        );
        Ok(())
    }

    async fn find(&self, doctor_id: &str, date: DateKey, time: &str) -> Result<Option<Booking>, BookingError> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .get(doctor_id)
            .and_then(|slots| slots.get(&(date, time.to_string())))
            .cloned())
    }

    async fn release(&self, booking: &Booking) -> Result<Booking, BookingError> {
        let mut bookings = self.bookings.write().await;
        let slots = bookings
            .get_mut(&booking.doctor_id)
            .ok_or(BookingError::BookingNotFound)?;

        let slot_key = (booking.slot_date, booking.slot_time.clone());
        let still_held = slots.get(&slot_key).is_some_and(|held| held.id == booking.id);
        if !still_held {
            return Err(BookingError::BookingNotFound);
        }

        let released = slots.remove(&slot_key).ok_or(BookingError::BookingNotFound)?;
        debug!(
            "Released {} {} for doctor {}",
            released.slot_date, released.slot_time, released.doctor_id
        );
        Ok(released)
    }
}
