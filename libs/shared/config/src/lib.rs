use std::env;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_OPEN_TIME: &str = "10:00";
pub const DEFAULT_CLOSE_TIME: &str = "21:00";
pub const DEFAULT_SLOT_DURATION_MINUTES: u32 = 30;
pub const DEFAULT_SERVER_PORT: u16 = 3000;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Clinic opening time {open} must be before closing time {close}")]
    InvalidWindow { open: NaiveTime, close: NaiveTime },

    #[error("Slot duration of {0} minutes must be between 1 and 60 and divide an hour evenly")]
    InvalidSlotDuration(u32),

    #[error("Supabase booking store selected but {0} is not set")]
    MissingSupabaseSetting(&'static str),

    #[error("Unknown booking store: {0}")]
    UnknownBookingStore(String),
}

/// Backend used to persist confirmed bookings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStoreKind {
    Memory,
    Supabase,
}

impl FromStr for BookingStoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in_memory" => Ok(BookingStoreKind::Memory),
            "supabase" => Ok(BookingStoreKind::Supabase),
            other => Err(ConfigError::UnknownBookingStore(other.to_string())),
        }
    }
}

impl fmt::Display for BookingStoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStoreKind::Memory => write!(f, "memory"),
            BookingStoreKind::Supabase => write!(f, "supabase"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub booking_store: BookingStoreKind,
    pub server_port: u16,
    pub clinic_utc_offset_minutes: i32,
    pub clinic_open_time: NaiveTime,
    pub clinic_close_time: NaiveTime,
    pub slot_duration_minutes: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Missing or unparseable
    /// values fall back to defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let string_var = |key: &str| {
            lookup(key).unwrap_or_else(|| {
                warn!("{} not set, using empty value", key);
                String::new()
            })
        };

        let config = Self {
            supabase_url: string_var("SUPABASE_URL"),
            supabase_anon_key: string_var("SUPABASE_ANON_PUBLIC_KEY"),
            supabase_service_role_key: string_var("SUPABASE_SERVICE_ROLE_KEY"),
            supabase_jwt_secret: string_var("SUPABASE_JWT_SECRET"),
            booking_store: parse_or_default(&lookup, "BOOKING_STORE", BookingStoreKind::Memory),
            server_port: parse_or_default(&lookup, "SERVER_PORT", DEFAULT_SERVER_PORT),
            clinic_utc_offset_minutes: parse_or_default(&lookup, "CLINIC_UTC_OFFSET_MINUTES", 0),
            clinic_open_time: time_or_default(&lookup, "CLINIC_OPEN_TIME", DEFAULT_OPEN_TIME),
            clinic_close_time: time_or_default(&lookup, "CLINIC_CLOSE_TIME", DEFAULT_CLOSE_TIME),
            slot_duration_minutes: parse_or_default(
                &lookup,
                "SLOT_DURATION_MINUTES",
                DEFAULT_SLOT_DURATION_MINUTES,
            ),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_jwt_secret.is_empty()
            && (self.booking_store == BookingStoreKind::Memory || self.is_supabase_configured())
    }

    pub fn is_supabase_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_service_role_key.is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_window(
            self.clinic_open_time,
            self.clinic_close_time,
            self.slot_duration_minutes,
        )?;

        if self.booking_store == BookingStoreKind::Supabase {
            if self.supabase_url.is_empty() {
                return Err(ConfigError::MissingSupabaseSetting("SUPABASE_URL"));
            }
            if self.supabase_service_role_key.is_empty() {
                return Err(ConfigError::MissingSupabaseSetting("SUPABASE_SERVICE_ROLE_KEY"));
            }
        }

        Ok(())
    }
}

pub fn validate_window(open: NaiveTime, close: NaiveTime, slot_minutes: u32) -> Result<(), ConfigError> {
    if open >= close {
        return Err(ConfigError::InvalidWindow { open, close });
    }
    if slot_minutes == 0 || slot_minutes > 60 || 60 % slot_minutes != 0 {
        return Err(ConfigError::InvalidSlotDuration(slot_minutes));
    }
    Ok(())
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        None => default,
    }
}

fn time_or_default<F>(lookup: &F, key: &str, default: &str) -> NaiveTime
where
    F: Fn(&str) -> Option<String>,
{
    let fallback = || NaiveTime::parse_from_str(default, "%H:%M").unwrap_or(NaiveTime::MIN);

    match lookup(key) {
        Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").unwrap_or_else(|_| {
            warn!("{} has invalid time '{}', using default {}", key, raw, default);
            fallback()
        }),
        None => fallback(),
    }
}
