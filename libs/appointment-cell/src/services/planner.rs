// libs/appointment-cell/src/services/planner.rs
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tracing::debug;

use crate::models::{format_slot_time, BookedSet, BookingWindow, DateKey, DaySlots, Slot};

/// Number of consecutive days, starting today, that are offered for booking.
pub const PLANNING_DAYS: i64 = 7;

/// Computes bookable slots from a booked-set snapshot and an injected `now`.
/// Holds no state besides the window, so the same inputs always give the same
/// plan.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotPlanner {
    window: BookingWindow,
}

impl SlotPlanner {
    pub fn new(window: BookingWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &BookingWindow {
        &self.window
    }

    /// One `DaySlots` per day for the next `PLANNING_DAYS` days, today first.
    pub fn compute_available_slots(&self, booked: &BookedSet, now: NaiveDateTime) -> Vec<DaySlots> {
        let step = self.window.slot_duration();

        let days: Vec<DaySlots> = (0..PLANNING_DAYS)
            .map(|offset| {
                let date = now.date() + Duration::days(offset);
                let key = DateKey::from(date);
                let (start, end) = self.day_bounds(date, offset, now);

                let mut slots = Vec::new();
                let mut candidate = start;
                while candidate < end {
                    let time = format_slot_time(candidate.time());
                    if !booked.contains(&key, &time) {
                        slots.push(Slot {
                            date: key,
                            time,
                            datetime: candidate,
                        });
                    }
                    candidate += step;
                }

                DaySlots::new(date, slots)
            })
            .collect();

        debug!(
            "Planned {} open slots across {} days from {}",
            days.iter().map(|d| d.slots.len()).sum::<usize>(),
            days.len(),
            now
        );
        days
    }

    /// Date keys covered by a plan made at `now`, today first.
    pub fn horizon(&self, now: NaiveDateTime) -> Vec<DateKey> {
        (0..PLANNING_DAYS)
            .map(|offset| DateKey::from(now.date() + Duration::days(offset)))
            .collect()
    }

    /// Whether `date` at `time` is a slot the planner would offer at `now`,
    /// ignoring existing bookings.
    pub fn is_offered(&self, date: NaiveDate, time: NaiveTime, now: NaiveDateTime) -> bool {
        let offset = (date - now.date()).num_days();
        if !(0..PLANNING_DAYS).contains(&offset) {
            return false;
        }

        let (start, end) = self.day_bounds(date, offset, now);
        let at = date.and_time(time);
        if at < start || at >= end {
            return false;
        }

        let since_start = at - start;
        since_start.num_seconds() % self.window.slot_duration().num_seconds() == 0
    }

    /// First bookable instant today: `now` rounded up to the next slot
    /// boundary on the hour's grid, never at or before `now`. Opening time
    /// only bounds the days after today.
    pub fn first_start_today(&self, now: NaiveDateTime) -> NaiveDateTime {
        let step = i64::from(self.window.slot_minutes);
        let hour_start = now.date().and_hms_opt(now.hour(), 0, 0).unwrap_or(now);

        let minute = i64::from(now.minute());
        let steps = ((minute + step - 1) / step).max(1);
        let mut start = hour_start + Duration::minutes(steps * step);

        if start <= now {
            start += self.window.slot_duration();
        }
        start
    }

    fn day_bounds(&self, date: NaiveDate, offset: i64, now: NaiveDateTime) -> (NaiveDateTime, NaiveDateTime) {
        let end = date.and_time(self.window.close);
        let start = if offset == 0 {
            self.first_start_today(now)
        } else {
            date.and_time(self.window.open)
        };
        (start, end)
    }
}

/// Plans with the default 10:00–21:00 window on a 30-minute grid.
pub fn compute_available_slots(booked: &BookedSet, now: NaiveDateTime) -> Vec<DaySlots> {
    SlotPlanner::default().compute_available_slots(booked, now)
}
