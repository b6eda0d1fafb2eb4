//! Recurrence expansion -- turns a recurrence rule into the calendar dates it
//! produces inside a window.
//!
//! Expansion is lazy and bounded on both ends: the first candidate is never
//! before `max(start_date, window_start)` and the last never after
//! `min(end_date, window_end)`. An inverted window, or a rule that cannot
//! produce anything, yields an empty sequence rather than an error.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::dates::{add_months_clamped, months_between, weekday_index};
use crate::model::Recurrence;

/// Lazy, ordered, finite sequence of occurrence dates.
///
/// A clone taken before iterating replays the whole sequence; calling
/// [`expand`] again with the same arguments does the same.
#[derive(Debug, Clone)]
pub struct ExpandedDates<'a> {
    step: Step<'a>,
    lower: NaiveDate,
    upper: NaiveDate,
}

#[derive(Debug, Clone)]
enum Step<'a> {
    Single(Option<NaiveDate>),
    Daily(NaiveDate),
    Weekly {
        next: NaiveDate,
        days: &'a BTreeSet<u8>,
    },
    Monthly {
        anchor: NaiveDate,
        index: u32,
    },
    Done,
}

/// Expand `rule` into the dates it produces within `[window_start, window_end]`
/// (both inclusive).
///
/// - `none` yields its single date when the window contains it.
/// - `daily` yields every day in the bounded range.
/// - `weekly` yields the days of the bounded range whose weekday index
///   (0 = Sunday) is in `days_of_week`; an empty set yields nothing.
/// - `monthly` yields the start date's day-of-month in each month of the
///   bounded range, clamped to the last day of shorter months.
pub fn expand(
    rule: &Recurrence,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> ExpandedDates<'_> {
    let lower = window_start.max(rule.start_date());
    let upper = rule.end_date().map_or(window_end, |end| end.min(window_end));

    let step = if window_start > window_end || lower > upper {
        Step::Done
    } else {
        match rule {
            Recurrence::None { date } => Step::Single(Some(*date)),
            Recurrence::Daily { .. } => Step::Daily(lower),
            Recurrence::Weekly { days_of_week, .. } if days_of_week.is_empty() => Step::Done,
            Recurrence::Weekly { days_of_week, .. } => Step::Weekly {
                next: lower,
                days: days_of_week,
            },
            Recurrence::Monthly { start_date, .. } => Step::Monthly {
                anchor: *start_date,
                // Earlier months all land before `lower`.
                index: months_between(*start_date, lower).max(0) as u32,
            },
        }
    };

    ExpandedDates { step, lower, upper }
}

/// Whether `rule` produces an occurrence on exactly `date`.
pub fn occurs_on(rule: &Recurrence, date: NaiveDate) -> bool {
    expand(rule, date, date).next().is_some()
}

impl Iterator for ExpandedDates<'_> {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        loop {
            let mut exhausted = false;
            let candidate = match &mut self.step {
                Step::Done => return None,
                Step::Single(date) => date.take(),
                Step::Daily(cursor) | Step::Weekly { next: cursor, .. } => {
                    let date = *cursor;
                    match date.succ_opt() {
                        Some(following) => *cursor = following,
                        None => exhausted = true,
                    }
                    Some(date)
                }
                Step::Monthly { anchor, index } => {
                    let date = add_months_clamped(*anchor, *index);
                    *index += 1;
                    date
                }
            };

            let Some(candidate) = candidate.filter(|date| *date <= self.upper) else {
                self.step = Step::Done;
                return None;
            };
            let wanted = candidate >= self.lower
                && match &self.step {
                    Step::Weekly { days, .. } => days.contains(&weekday_index(candidate)),
                    _ => true,
                };
            if exhausted {
                self.step = Step::Done;
            }
            if wanted {
                return Some(candidate);
            }
        }
    }
}
