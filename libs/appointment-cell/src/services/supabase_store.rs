// libs/appointment-cell/src/services/supabase_store.rs
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};

use crate::error::BookingError;
use crate::models::{parse_slot_time, BookedSet, Booking, DateKey};
use crate::services::store::BookingStore;

const APPOINTMENTS_PATH: &str = "/rest/v1/appointments";

/// Booking store over the PostgREST `appointments` table.
///
/// Relies on a unique index on `(doctor_id, slot_date, slot_time) WHERE NOT
/// cancelled`; a losing concurrent insert comes back as HTTP 409.
pub struct SupabaseBookingStore {
    supabase: Arc<SupabaseClient>,
    service_token: String,
}

impl SupabaseBookingStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            service_token: config.supabase_service_role_key.clone(),
        }
    }

    fn slot_filter(doctor_id: &str, date: DateKey, time: &str) -> String {
        format!(
            "doctor_id=eq.{}&slot_date=eq.{}&slot_time=eq.{}&cancelled=is.false",
            urlencoding::encode(doctor_id),
            date,
            urlencoding::encode(time)
        )
    }

    fn parse_booking(row: Value) -> Result<Booking, BookingError> {
        serde_json::from_value(row).map_err(|e| BookingError::MalformedRecord(e.to_string()))
    }

    fn booked_set_from_rows(rows: &[Value]) -> BookedSet {
        let mut booked = BookedSet::new();

        for row in rows {
            let date = row["slot_date"].as_str().map(str::parse::<DateKey>);
            let time = row["slot_time"].as_str();

            match (date, time) {
                (Some(Ok(date)), Some(time)) if parse_slot_time(time).is_some() => {
                    booked.insert(date, time);
                }
                _ => warn!("Skipping unreadable appointment row: {}", row),
            }
        }

        booked
    }
}

#[async_trait]
impl BookingStore for SupabaseBookingStore {
    async fn booked_slots(&self, doctor_id: &str) -> Result<BookedSet, BookingError> {
        let path = format!(
            "{}?doctor_id=eq.{}&cancelled=is.false&select=slot_date,slot_time",
            APPOINTMENTS_PATH,
            urlencoding::encode(doctor_id)
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(&self.service_token), None)
            .await?;

        debug!("Loaded {} booked rows for doctor {}", rows.len(), doctor_id);
        Ok(Self::booked_set_from_rows(&rows))
    }

    async fn booked_slots_on(&self, doctor_id: &str, dates: &[DateKey]) -> Result<BookedSet, BookingError> {
        if dates.is_empty() {
            return Ok(BookedSet::new());
        }

        let keys: Vec<String> = dates.iter().map(DateKey::to_string).collect();
        let path = format!(
            "{}?doctor_id=eq.{}&slot_date=in.({})&cancelled=is.false&select=slot_date,slot_time",
            APPOINTMENTS_PATH,
            urlencoding::encode(doctor_id),
            keys.join(",")
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(&self.service_token), None)
            .await?;

        debug!(
            "Loaded {} booked rows for doctor {} across {} dates",
            rows.len(),
            doctor_id,
            dates.len()
        );
        Ok(Self::booked_set_from_rows(&rows))
    }

    async fn reserve(&self, booking: &Booking) -> Result<(), BookingError> {
        let mut row = serde_json::to_value(booking)
            .map_err(|e| BookingError::MalformedRecord(e.to_string()))?;
        row["cancelled"] = json!(false);

        let result: Result<Vec<Value>, SupabaseError> = self
            .supabase
            .request_with_headers(
                Method::POST,
                APPOINTMENTS_PATH,
                Some(&self.service_token),
                Some(row),
                Some(SupabaseClient::return_representation()),
            )
            .await;

        match result {
            Ok(rows) if rows.is_empty() => Err(BookingError::MalformedRecord(
                "insert returned no rows".to_string(),
            )),
            Ok(_) => Ok(()),
            Err(SupabaseError::Conflict(_)) => Err(BookingError::SlotUnavailable {
                date: booking.slot_date,
                time: booking.slot_time.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn find(&self, doctor_id: &str, date: DateKey, time: &str) -> Result<Option<Booking>, BookingError> {
        let path = format!("{}?{}", APPOINTMENTS_PATH, Self::slot_filter(doctor_id, date, time));

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(&self.service_token), None)
            .await?;

        rows.into_iter().next().map(Self::parse_booking).transpose()
    }

    async fn release(&self, booking: &Booking) -> Result<Booking, BookingError> {
        let path = format!(
            "{}?id=eq.{}&{}",
            APPOINTMENTS_PATH,
            booking.id,
            Self::slot_filter(&booking.doctor_id, booking.slot_date, &booking.slot_time)
        );

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(&self.service_token),
                Some(json!({ "cancelled": true })),
                Some(SupabaseClient::return_representation()),
            )
            .await?;

        let row = rows.into_iter().next().ok_or(BookingError::BookingNotFound)?;
        Self::parse_booking(row)
    }
}
