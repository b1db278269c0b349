// libs/appointment-cell/tests/planner_test.rs
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use appointment_cell::{
    compute_available_slots, format_slot_time, BookedSet, BookingWindow, DateKey, SlotPlanner,
    PLANNING_DAYS,
};

fn at(year: i32, month: u32, day: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn key(day: u32, month: u32, year: i32) -> DateKey {
    DateKey { day, month, year }
}

fn times(day: &appointment_cell::DaySlots) -> Vec<String> {
    day.slots.iter().map(|s| s.time.clone()).collect()
}

fn every_half_hour(from: u32, to: u32) -> Vec<String> {
    let mut out = Vec::new();
    let mut t = NaiveTime::from_hms_opt(from, 0, 0).unwrap();
    let end = NaiveTime::from_hms_opt(to, 0, 0).unwrap();
    while t < end {
        out.push(format_slot_time(t));
        t += Duration::minutes(30);
    }
    out
}

fn sample_instants() -> Vec<NaiveDateTime> {
    vec![
        at(2025, 7, 5, 0, 0),
        at(2025, 7, 5, 9, 47),
        at(2025, 7, 5, 10, 0),
        at(2025, 7, 5, 13, 30),
        at(2025, 7, 5, 20, 29),
        at(2025, 7, 5, 20, 45),
        at(2025, 7, 5, 21, 5),
        at(2025, 7, 5, 23, 59),
        at(2025, 12, 28, 15, 12),
        at(2024, 2, 27, 11, 31),
    ]
}

fn sample_booked() -> BookedSet {
    let mut booked = BookedSet::new();
    booked.insert(key(5, 7, 2025), "02:00 PM");
    booked.insert(key(5, 7, 2025), "10:00 AM");
    booked.insert(key(6, 7, 2025), "08:30 PM");
    booked.insert(key(1, 1, 2026), "10:30 AM");
    booked.insert(key(29, 2, 2024), "12:00 PM");
    booked
}

#[test]
fn test_concrete_scenario_morning_of_july_fifth() {
    let booked = sample_booked();
    let days = compute_available_slots(&booked, at(2025, 7, 5, 9, 47));

    let today = &days[0];
    assert_eq!(today.date_key, key(5, 7, 2025));
    let mut expected: Vec<String> = every_half_hour(10, 21);
    assert_eq!(expected.len(), 22);
    expected.retain(|t| t != "02:00 PM" && t != "10:00 AM");
    assert_eq!(times(today), expected);
    assert_eq!(today.slots.first().unwrap().time, "10:30 AM");

    let tomorrow = &days[1];
    assert_eq!(tomorrow.date_key, key(6, 7, 2025));
    assert_eq!(tomorrow.weekday, "SUN");
    assert_eq!(tomorrow.slots.len(), 21);
    assert!(!times(tomorrow).contains(&"08:30 PM".to_string()));
    assert_eq!(tomorrow.slots.last().unwrap().time, "08:00 PM");
}

#[test]
fn test_unbooked_morning_starts_at_ten() {
    let days = compute_available_slots(&BookedSet::new(), at(2025, 7, 5, 9, 47));
    assert_eq!(days[0].slots.len(), 22);
    assert_eq!(days[0].slots[0].datetime, at(2025, 7, 5, 10, 0));
    assert_eq!(days[0].slots[21].time, "08:30 PM");
}

#[test]
fn test_early_morning_today_is_not_held_to_opening() {
    let days = compute_available_slots(&BookedSet::new(), at(2025, 7, 5, 7, 5));
    assert_eq!(days[0].slots.len(), 27);
    assert_eq!(days[0].slots[0].time, "07:30 AM");
    assert_eq!(times(&days[0]), {
        let mut expected = vec!["07:30 AM".to_string()];
        expected.extend(every_half_hour(8, 21));
        expected
    });
    assert_eq!(times(&days[1]), every_half_hour(10, 21));
}

#[test]
fn test_always_seven_days_in_order() {
    for now in sample_instants() {
        let days = compute_available_slots(&sample_booked(), now);
        assert_eq!(days.len(), PLANNING_DAYS as usize);

        for (offset, day) in days.iter().enumerate() {
            assert_eq!(day.date, now.date() + Duration::days(offset as i64));
            assert_eq!(day.date_key, DateKey::from(day.date));
        }
    }
}

#[test]
fn test_no_slot_at_or_before_now() {
    for now in sample_instants() {
        for day in compute_available_slots(&sample_booked(), now) {
            for slot in &day.slots {
                assert!(slot.datetime > now, "{} offered at {}", slot.datetime, now);
            }
        }
    }
}

#[test]
fn test_no_booked_slot_is_offered() {
    let booked = sample_booked();
    for now in sample_instants() {
        for day in compute_available_slots(&booked, now) {
            for slot in &day.slots {
                assert!(!booked.contains(&slot.date, &slot.time));
                assert_eq!(slot.time, format_slot_time(slot.datetime.time()));
                assert_eq!(slot.date, DateKey::from(slot.datetime.date()));
            }
        }
    }
}

#[test]
fn test_slots_stay_inside_operating_window() {
    let open = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
    let close = NaiveTime::from_hms_opt(21, 0, 0).unwrap();

    for now in sample_instants() {
        for day in compute_available_slots(&BookedSet::new(), now) {
            for pair in day.slots.windows(2) {
                assert_eq!(pair[1].datetime - pair[0].datetime, Duration::minutes(30));
            }
            let is_today = day.date == now.date();
            for slot in &day.slots {
                let time = slot.datetime.time();
                assert!(time < close, "{} after closing", time);
                assert!(is_today || time >= open, "{} before opening", time);
                assert_eq!(slot.datetime.date(), day.date);
            }
        }
    }
}

#[test]
fn test_same_inputs_same_plan() {
    let booked = sample_booked();
    let now = at(2025, 7, 5, 13, 12);
    assert_eq!(
        compute_available_slots(&booked, now),
        compute_available_slots(&booked.clone(), now)
    );
}

#[test]
fn test_closing_time_edge_cases() {
    let late = compute_available_slots(&BookedSet::new(), at(2025, 7, 5, 20, 45));
    assert!(late[0].slots.len() <= 1);
    assert!(late[0].is_empty());
    assert_eq!(late[1].slots.len(), 22);

    let closed = compute_available_slots(&BookedSet::new(), at(2025, 7, 5, 21, 5));
    assert!(closed[0].is_empty());
    assert_eq!(closed.len(), 7);

    let last_call = compute_available_slots(&BookedSet::new(), at(2025, 7, 5, 20, 29));
    assert_eq!(times(&last_call[0]), vec!["08:30 PM".to_string()]);
}

#[test]
fn test_fully_booked_day_is_empty_and_isolated() {
    let mut booked = BookedSet::new();
    for time in every_half_hour(10, 21) {
        booked.insert(key(7, 7, 2025), time);
    }

    let days = compute_available_slots(&booked, at(2025, 7, 5, 9, 47));
    assert!(days[2].is_empty());
    assert_eq!(days[0].slots.len(), 22);
    assert_eq!(days[1].slots.len(), 22);
    for day in &days[3..] {
        assert_eq!(day.slots.len(), 22);
    }
}

#[test]
fn test_booking_on_other_date_does_not_leak() {
    let mut booked = BookedSet::new();
    booked.insert(key(6, 7, 2025), "10:00 AM");

    let days = compute_available_slots(&booked, at(2025, 7, 5, 9, 47));
    assert_eq!(days[0].slots[0].time, "10:00 AM");
    assert_eq!(days[1].slots[0].time, "10:30 AM");
}

#[test]
fn test_window_spans_month_and_year_boundaries() {
    let days = compute_available_slots(&sample_booked(), at(2025, 12, 28, 15, 12));
    let keys: Vec<String> = days.iter().map(|d| d.date_key.to_string()).collect();
    assert_eq!(
        keys,
        vec!["28_12_2025", "29_12_2025", "30_12_2025", "31_12_2025", "1_1_2026", "2_1_2026", "3_1_2026"]
    );
    assert_eq!(days[4].slots.len(), 21);

    let leap = compute_available_slots(&sample_booked(), at(2024, 2, 27, 11, 31));
    assert_eq!(leap[2].date_key, key(29, 2, 2024));
    assert_eq!(leap[2].slots.len(), 21);
    assert_eq!(leap[3].date_key, key(1, 3, 2024));
}

#[test]
fn test_custom_window_is_respected() {
    let window = BookingWindow::new(
        NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        60,
    )
    .unwrap();
    let planner = SlotPlanner::new(window);

    let days = planner.compute_available_slots(&BookedSet::new(), at(2025, 7, 5, 9, 10));
    assert_eq!(times(&days[0]), vec!["10:00 AM", "11:00 AM"]);

    let early = planner.compute_available_slots(&BookedSet::new(), at(2025, 7, 5, 6, 20));
    assert_eq!(times(&early[0]), vec!["07:00 AM", "08:00 AM", "09:00 AM", "10:00 AM", "11:00 AM"]);
    assert_eq!(times(&days[1]), vec!["08:00 AM", "09:00 AM", "10:00 AM", "11:00 AM"]);
}

#[test]
fn test_malformed_legacy_entries_count_as_unbooked() {
    let booked = BookedSet::from_legacy_value(&serde_json::json!({
        "6_7_2025": {"time": "10:00 AM"},
        "6-7-2025": ["10:30 AM"],
        "7_7_2025": ["10:00 AM", null]
    }));

    let days = compute_available_slots(&booked, at(2025, 7, 5, 9, 47));
    assert_eq!(days[1].slots.len(), 22);
    assert_eq!(days[2].slots.len(), 21);
}
