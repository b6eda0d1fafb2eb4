//! Tests for recurrence expansion.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use occurrence_engine::expander::{expand, occurs_on};
use occurrence_engine::Recurrence;

fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn weekdays(days: &[u8]) -> BTreeSet<u8> {
    days.iter().copied().collect()
}

fn collect(rule: &Recurrence, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    expand(rule, from, to).collect()
}

// ---------------------------------------------------------------------------
// Single events
// ---------------------------------------------------------------------------

#[test]
fn single_event_outside_window_yields_nothing() {
    let rule = Recurrence::None {
        date: d(2025, 6, 10),
    };
    assert!(collect(&rule, d(2025, 6, 1), d(2025, 6, 9)).is_empty());
    assert!(collect(&rule, d(2025, 6, 11), d(2025, 6, 30)).is_empty());
}

#[test]
fn single_event_on_one_day_window_yields_it_once() {
    let rule = Recurrence::None {
        date: d(2025, 6, 10),
    };
    assert_eq!(
        collect(&rule, d(2025, 6, 10), d(2025, 6, 10)),
        vec![d(2025, 6, 10)]
    );
}

// ---------------------------------------------------------------------------
// Daily
// ---------------------------------------------------------------------------

#[test]
fn daily_starts_at_the_later_of_start_and_window() {
    let rule = Recurrence::Daily {
        start_date: d(2025, 6, 5),
        end_date: None,
    };
    let dates = collect(&rule, d(2025, 6, 1), d(2025, 6, 8));
    assert_eq!(
        dates,
        vec![d(2025, 6, 5), d(2025, 6, 6), d(2025, 6, 7), d(2025, 6, 8)]
    );
}

#[test]
fn daily_stops_at_end_date() {
    let rule = Recurrence::Daily {
        start_date: d(2025, 6, 1),
        end_date: Some(d(2025, 6, 3)),
    };
    let dates = collect(&rule, d(2025, 5, 1), d(2025, 7, 1));
    assert_eq!(dates, vec![d(2025, 6, 1), d(2025, 6, 2), d(2025, 6, 3)]);
}

#[test]
fn daily_crosses_month_and_year_boundaries() {
    let rule = Recurrence::Daily {
        start_date: d(2024, 12, 30),
        end_date: None,
    };
    let dates = collect(&rule, d(2024, 12, 30), d(2025, 1, 2));
    assert_eq!(
        dates,
        vec![d(2024, 12, 30), d(2024, 12, 31), d(2025, 1, 1), d(2025, 1, 2)]
    );
}

#[test]
fn series_ended_before_window_yields_nothing() {
    let rule = Recurrence::Daily {
        start_date: d(2025, 1, 1),
        end_date: Some(d(2025, 1, 31)),
    };
    assert!(collect(&rule, d(2025, 6, 1), d(2025, 6, 30)).is_empty());
}

// ---------------------------------------------------------------------------
// Weekly
// ---------------------------------------------------------------------------

#[test]
fn weekly_monday_wednesday_two_weeks() {
    // 2025-06-02 is a Monday; 1 = Monday, 3 = Wednesday.
    let rule = Recurrence::Weekly {
        start_date: d(2025, 6, 2),
        end_date: None,
        days_of_week: weekdays(&[1, 3]),
    };
    let dates = collect(&rule, d(2025, 6, 2), d(2025, 6, 15));
    assert_eq!(
        dates,
        vec![d(2025, 6, 2), d(2025, 6, 4), d(2025, 6, 9), d(2025, 6, 11)]
    );
}

#[test]
fn weekly_weekend_only() {
    let rule = Recurrence::Weekly {
        start_date: d(2025, 6, 1),
        end_date: None,
        days_of_week: weekdays(&[0, 6]),
    };
    let dates = collect(&rule, d(2025, 6, 1), d(2025, 6, 14));
    assert_eq!(
        dates,
        vec![d(2025, 6, 1), d(2025, 6, 7), d(2025, 6, 8), d(2025, 6, 14)]
    );
}

#[test]
fn weekly_with_empty_weekday_set_yields_nothing() {
    let rule = Recurrence::Weekly {
        start_date: d(2025, 6, 2),
        end_date: None,
        days_of_week: BTreeSet::new(),
    };
    assert!(collect(&rule, d(2025, 6, 1), d(2025, 12, 31)).is_empty());
}

#[test]
fn weekly_ignores_days_outside_the_bounds() {
    let rule = Recurrence::Weekly {
        start_date: d(2025, 6, 4),
        end_date: Some(d(2025, 6, 9)),
        days_of_week: weekdays(&[1, 3]),
    };
    let dates = collect(&rule, d(2025, 6, 1), d(2025, 6, 30));
    assert_eq!(dates, vec![d(2025, 6, 4), d(2025, 6, 9)]);
}

// ---------------------------------------------------------------------------
// Monthly
// ---------------------------------------------------------------------------

#[test]
fn monthly_clamps_to_month_end_without_drifting() {
    let rule = Recurrence::Monthly {
        start_date: d(2025, 1, 31),
        end_date: None,
    };
    let dates = collect(&rule, d(2025, 1, 1), d(2025, 5, 31));
    assert_eq!(
        dates,
        vec![
            d(2025, 1, 31),
            d(2025, 2, 28),
            d(2025, 3, 31),
            d(2025, 4, 30),
            d(2025, 5, 31),
        ]
    );
}

#[test]
fn monthly_leap_february() {
    let rule = Recurrence::Monthly {
        start_date: d(2024, 1, 30),
        end_date: None,
    };
    let dates = collect(&rule, d(2024, 2, 1), d(2024, 3, 31));
    assert_eq!(dates, vec![d(2024, 2, 29), d(2024, 3, 30)]);
}

#[test]
fn monthly_window_starting_after_the_day_of_month() {
    let rule = Recurrence::Monthly {
        start_date: d(2025, 1, 15),
        end_date: None,
    };
    let dates = collect(&rule, d(2025, 3, 20), d(2025, 6, 10));
    assert_eq!(dates, vec![d(2025, 4, 15), d(2025, 5, 15)]);
}

#[test]
fn monthly_respects_end_date() {
    let rule = Recurrence::Monthly {
        start_date: d(2025, 1, 10),
        end_date: Some(d(2025, 3, 9)),
    };
    let dates = collect(&rule, d(2025, 1, 1), d(2025, 12, 31));
    assert_eq!(dates, vec![d(2025, 1, 10), d(2025, 2, 10)]);
}

// ---------------------------------------------------------------------------
// Defensive behaviour and sequence properties
// ---------------------------------------------------------------------------

#[test]
fn inverted_window_yields_nothing() {
    let rule = Recurrence::Daily {
        start_date: d(2025, 1, 1),
        end_date: None,
    };
    assert!(collect(&rule, d(2025, 6, 10), d(2025, 6, 1)).is_empty());
}

#[test]
fn expansion_is_restartable() {
    let rule = Recurrence::Weekly {
        start_date: d(2025, 6, 2),
        end_date: None,
        days_of_week: weekdays(&[2, 4]),
    };
    let fresh = expand(&rule, d(2025, 6, 1), d(2025, 6, 30));
    let replay = fresh.clone();

    let first: Vec<_> = fresh.collect();
    let second: Vec<_> = replay.collect();
    let third = collect(&rule, d(2025, 6, 1), d(2025, 6, 30));

    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(first.len(), 8);
}

#[test]
fn exhausted_iterator_stays_exhausted() {
    let rule = Recurrence::None {
        date: d(2025, 6, 10),
    };
    let mut dates = expand(&rule, d(2025, 6, 1), d(2025, 6, 30));
    assert_eq!(dates.next(), Some(d(2025, 6, 10)));
    assert_eq!(dates.next(), None);
    assert_eq!(dates.next(), None);
}

#[test]
fn occurs_on_checks_membership() {
    let rule = Recurrence::Weekly {
        start_date: d(2025, 6, 2),
        end_date: None,
        days_of_week: weekdays(&[1, 3]),
    };
    assert!(occurs_on(&rule, d(2025, 6, 11)));
    assert!(!occurs_on(&rule, d(2025, 6, 12)));
    assert!(!occurs_on(&rule, d(2025, 5, 28)), "before the series starts");
}
