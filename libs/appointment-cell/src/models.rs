// libs/appointment-cell/src/models.rs
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use shared_config::{validate_window, AppConfig, ConfigError};

/// chrono pattern for the slot time strings shared with booking records,
/// e.g. `"02:30 PM"`.
pub const SLOT_TIME_FORMAT: &str = "%I:%M %p";

const WEEKDAY_LABELS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

pub fn format_slot_time(time: NaiveTime) -> String {
    time.format(SLOT_TIME_FORMAT).to_string()
}

/// Parses a slot time string, accepting only the canonical form that
/// `format_slot_time` produces. Anything else could never match a booking.
pub fn parse_slot_time(raw: &str) -> Option<NaiveTime> {
    let time = NaiveTime::parse_from_str(raw, SLOT_TIME_FORMAT).ok()?;
    (format_slot_time(time) == raw).then_some(time)
}

// ==============================================================================
// DATE KEY
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
#[error("'{0}' is not a valid day_month_year date key")]
pub struct DateKeyError(pub String);

/// Calendar date in the `{day}_{month}_{year}` form booking records are
/// keyed by. Ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateKey {
    pub day: u32,
    pub month: u32,
    pub year: i32,
}

impl DateKey {
    pub fn to_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self {
            day: date.day(),
            month: date.month(),
            year: date.year(),
        }
    }
}

impl Ord for DateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.year, self.month, self.day).cmp(&(other.year, other.month, other.day))
    }
}

impl PartialOrd for DateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.day, self.month, self.year)
    }
}

impl FromStr for DateKey {
    type Err = DateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DateKeyError(s.to_string());

        let mut parts = s.split('_');
        let (day, month, year) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(d), Some(m), Some(y), None) => (d, m, y),
            _ => return Err(invalid()),
        };

        let key = DateKey {
            day: day.parse().map_err(|_| invalid())?,
            month: month.parse().map_err(|_| invalid())?,
            year: year.parse().map_err(|_| invalid())?,
        };

        key.to_date().map(DateKey::from).ok_or_else(invalid)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

// ==============================================================================
// BOOKING WINDOW
// ==============================================================================

/// Daily operating hours for one doctor. Future days open at `open`; every
/// day closes at `close`; slots sit `slot_minutes` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BookingWindow {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub slot_minutes: u32,
}

impl Default for BookingWindow {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(21, 0, 0).unwrap_or(NaiveTime::MIN),
            slot_minutes: 30,
        }
    }
}

impl BookingWindow {
    pub fn new(open: NaiveTime, close: NaiveTime, slot_minutes: u32) -> Result<Self, ConfigError> {
        validate_window(open, close, slot_minutes)?;
        Ok(Self { open, close, slot_minutes })
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.clinic_open_time,
            config.clinic_close_time,
            config.slot_duration_minutes,
        )
        .unwrap_or_else(|e| {
            warn!("{}; falling back to the default booking window", e);
            Self::default()
        })
    }

    pub fn slot_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.slot_minutes))
    }
}

// ==============================================================================
// SLOTS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub date: DateKey,
    pub time: String,
    pub datetime: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySlots {
    pub date: NaiveDate,
    pub date_key: DateKey,
    pub weekday: String,
    pub day_of_month: u32,
    pub slots: Vec<Slot>,
}

impl DaySlots {
    pub fn new(date: NaiveDate, slots: Vec<Slot>) -> Self {
        Self {
            date,
            date_key: DateKey::from(date),
            weekday: weekday_label(date.weekday()).to_string(),
            day_of_month: date.day(),
            slots,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

pub fn weekday_label(weekday: Weekday) -> &'static str {
    WEEKDAY_LABELS[weekday.num_days_from_sunday() as usize]
}

// ==============================================================================
// BOOKED SET
// ==============================================================================

/// Slots already reserved for one doctor, keyed by date. Serializes to the
/// legacy `{"5_7_2025": ["02:00 PM"]}` map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookedSet {
    entries: BTreeMap<DateKey, BTreeSet<String>>,
}

impl BookedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the slot was already present.
    pub fn insert(&mut self, date: DateKey, time: impl Into<String>) -> bool {
        self.entries.entry(date).or_default().insert(time.into())
    }

    pub fn remove(&mut self, date: &DateKey, time: &str) -> bool {
        let Some(times) = self.entries.get_mut(date) else {
            return false;
        };
        let removed = times.remove(time);
        if times.is_empty() {
            self.entries.remove(date);
        }
        removed
    }

    pub fn contains(&self, date: &DateKey, time: &str) -> bool {
        self.entries
            .get(date)
            .is_some_and(|times| times.contains(time))
    }

    pub fn times_for(&self, date: &DateKey) -> Option<&BTreeSet<String>> {
        self.entries.get(date)
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DateKey, &String)> {
        self.entries
            .iter()
            .flat_map(|(date, times)| times.iter().map(move |time| (date, time)))
    }

    /// Reads the legacy map form. Entries with an unparseable key, a non-array
    /// value, or a time not in `SLOT_TIME_FORMAT` are dropped with a warning.
    pub fn from_legacy_value(value: &Value) -> Self {
        let mut booked = Self::new();

        let Some(map) = value.as_object() else {
            if !value.is_null() {
                warn!("Ignoring booked slots that are not an object: {}", value);
            }
            return booked;
        };

        for (raw_key, times) in map {
            let date = match raw_key.parse::<DateKey>() {
                Ok(date) => date,
                Err(e) => {
                    warn!("Ignoring booked slots under bad key: {}", e);
                    continue;
                }
            };

            let Some(times) = times.as_array() else {
                warn!("Ignoring booked slots for {}: expected an array, got {}", date, times);
                continue;
            };

            for time in times {
                match time.as_str() {
                    Some(text) if parse_slot_time(text).is_some() => {
                        booked.insert(date, text);
                    }
                    Some(text) => warn!("Ignoring booked time for {} in unknown format: {:?}", date, text),
                    None => warn!("Ignoring non-string booked time for {}: {}", date, time),
                }
            }
        }

        booked
    }
}

impl FromIterator<(DateKey, String)> for BookedSet {
    fn from_iter<I: IntoIterator<Item = (DateKey, String)>>(iter: I) -> Self {
        let mut booked = Self::new();
        for (date, time) in iter {
            booked.insert(date, time);
        }
        booked
    }
}

impl Serialize for BookedSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.entries
                .iter()
                .map(|(date, times)| (date.to_string(), times)),
        )
    }
}

impl<'de> Deserialize<'de> for BookedSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_legacy_value(&value))
    }
}

// ==============================================================================
// BOOKINGS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub doctor_id: String,
    pub patient_id: String,
    pub slot_date: DateKey,
    pub slot_time: String,
    pub scheduled_at: NaiveDateTime,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSlotRequest {
    pub slot_date: DateKey,
    pub slot_time: String,
}
