use thiserror::Error;

use shared_database::SupabaseError;
use shared_models::error::AppError;

use crate::models::{DateKey, DateKeyError};

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("This slot was just taken, please choose another")]
    SlotUnavailable { date: DateKey, time: String },

    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    #[error(transparent)]
    InvalidDateKey(#[from] DateKeyError),

    #[error("Booking not found")]
    BookingNotFound,

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(#[from] SupabaseError),

    #[error("Unexpected record from booking store: {0}")]
    MalformedRecord(String),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        match err {
            BookingError::SlotUnavailable { .. } => AppError::Conflict(message),
            BookingError::InvalidSlot(_) | BookingError::InvalidDateKey(_) => AppError::BadRequest(message),
            BookingError::BookingNotFound => AppError::NotFound(message),
            BookingError::Forbidden(_) => AppError::Forbidden(message),
            BookingError::Database(_) | BookingError::MalformedRecord(_) => AppError::ExternalService(message),
        }
    }
}
