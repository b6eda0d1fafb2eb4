//! Tests for occurrence materialization: windowing, overlay, suppression,
//! ordering, and identity.

use chrono::NaiveDate;
use occurrence_engine::{
    group_by_day, materialize, EventDefinition, Exception, Recurrence, Status,
};

fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn single(id: &str, date: NaiveDate, time: &str) -> EventDefinition {
    let mut def = EventDefinition::new(id, id, Recurrence::None { date });
    def.time = Some(time.parse().unwrap());
    def
}

/// Weekly Monday + Wednesday from Monday 2025-06-02, unbounded.
fn swim_practice() -> EventDefinition {
    let mut def = EventDefinition::new(
        "swim",
        "Swim practice",
        Recurrence::Weekly {
            start_date: d(2025, 6, 2),
            end_date: None,
            days_of_week: [1, 3].into_iter().collect(),
        },
    );
    def.time = Some("16:00".parse().unwrap());
    def
}

fn dates_of(occurrences: &[occurrence_engine::Occurrence]) -> Vec<NaiveDate> {
    occurrences.iter().map(|o| o.occurrence_date).collect()
}

// ---------------------------------------------------------------------------
// Windowing
// ---------------------------------------------------------------------------

#[test]
fn single_event_outside_window_is_absent() {
    let defs = vec![single("dentist", d(2025, 6, 10), "09:00")];
    assert!(materialize(&defs, d(2025, 6, 1), d(2025, 6, 9)).is_empty());
}

#[test]
fn single_event_inside_one_day_window_appears_once() {
    let defs = vec![single("dentist", d(2025, 6, 10), "09:00")];
    let occurrences = materialize(&defs, d(2025, 6, 10), d(2025, 6, 10));

    assert_eq!(occurrences.len(), 1);
    let occurrence = &occurrences[0];
    assert_eq!(occurrence.id, "dentist");
    assert_eq!(occurrence.definition_id, "dentist");
    assert!(!occurrence.is_recurring_occurrence);
}

#[test]
fn weekly_definition_yields_weekdays_only() {
    let defs = vec![swim_practice()];
    let occurrences = materialize(&defs, d(2025, 6, 2), d(2025, 6, 15));

    assert_eq!(
        dates_of(&occurrences),
        vec![d(2025, 6, 2), d(2025, 6, 4), d(2025, 6, 9), d(2025, 6, 11)]
    );
    for occurrence in &occurrences {
        assert!(occurrence.is_recurring_occurrence);
        assert_eq!(occurrence.status, Status::Active);
    }
    assert_eq!(occurrences[1].id, "swim-2025-06-04");
}

#[test]
fn inverted_window_is_empty() {
    let defs = vec![swim_practice()];
    assert!(materialize(&defs, d(2025, 6, 15), d(2025, 6, 2)).is_empty());
}

// ---------------------------------------------------------------------------
// Exceptions
// ---------------------------------------------------------------------------

#[test]
fn cancelled_exception_flags_only_its_date() {
    let mut def = swim_practice();
    let mut exception = Exception::new(d(2025, 6, 4));
    exception.status = Some(Status::Cancelled);
    exception.overrides.cancellation_reason = Some("sick".into());
    def.upsert_exception(exception);

    let occurrences = materialize([&def], d(2025, 6, 2), d(2025, 6, 15));
    assert_eq!(occurrences.len(), 4);

    for occurrence in &occurrences {
        if occurrence.occurrence_date == d(2025, 6, 4) {
            assert_eq!(occurrence.status, Status::Cancelled);
            assert_eq!(occurrence.fields.cancellation_reason.as_deref(), Some("sick"));
            assert!(occurrence.has_exception);
        } else {
            assert_eq!(occurrence.status, Status::Active);
            assert!(occurrence.fields.cancellation_reason.is_none());
            assert!(!occurrence.has_exception);
        }
    }
}

#[test]
fn tombstone_removes_the_occurrence_but_not_the_rest() {
    let mut def = swim_practice();
    let mut cancelled = Exception::new(d(2025, 6, 4));
    cancelled.status = Some(Status::Cancelled);
    cancelled.overrides.cancellation_reason = Some("sick".into());
    def.upsert_exception(cancelled);
    def.upsert_exception(Exception::tombstone(d(2025, 6, 9)));

    let occurrences = materialize([&def], d(2025, 6, 2), d(2025, 6, 15));
    assert_eq!(
        dates_of(&occurrences),
        vec![d(2025, 6, 2), d(2025, 6, 4), d(2025, 6, 11)]
    );
    assert_eq!(occurrences[1].status, Status::Cancelled);
}

#[test]
fn completed_occurrences_stay_visible() {
    let mut def = swim_practice();
    let mut exception = Exception::new(d(2025, 6, 2));
    exception.status = Some(Status::Completed);
    def.upsert_exception(exception);

    let occurrences = materialize([&def], d(2025, 6, 2), d(2025, 6, 2));
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].status, Status::Completed);
}

#[test]
fn deleted_definition_status_suppresses_every_occurrence() {
    let mut def = swim_practice();
    def.status = Some(Status::Deleted);
    assert!(materialize([&def], d(2025, 6, 1), d(2025, 6, 30)).is_empty());
}

#[test]
fn exception_time_override_moves_the_occurrence_in_the_day() {
    let mut swim = swim_practice();
    let mut moved = Exception::new(d(2025, 6, 4));
    moved.overrides.time = Some("07:00".parse().unwrap());
    swim.upsert_exception(moved);
    let breakfast = single("breakfast", d(2025, 6, 4), "08:00");

    let occurrences = materialize([&breakfast, &swim], d(2025, 6, 4), d(2025, 6, 4));
    let ids: Vec<_> = occurrences.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["swim-2025-06-04", "breakfast"]);
}

// ---------------------------------------------------------------------------
// Ordering and determinism
// ---------------------------------------------------------------------------

#[test]
fn ordered_by_date_then_time_then_input_order() {
    let defs = vec![
        single("late", d(2025, 6, 3), "18:00"),
        single("tie-a", d(2025, 6, 3), "09:00"),
        single("tomorrow", d(2025, 6, 4), "06:00"),
        single("tie-b", d(2025, 6, 3), "09:00"),
        single("early", d(2025, 6, 3), "07:15"),
    ];
    let occurrences = materialize(&defs, d(2025, 6, 1), d(2025, 6, 30));
    let ids: Vec<_> = occurrences.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["early", "tie-a", "tie-b", "late", "tomorrow"]);
}

#[test]
fn untimed_occurrences_sort_after_timed_ones() {
    let mut untimed = single("untimed", d(2025, 6, 3), "09:00");
    untimed.time = None;
    let defs = vec![untimed, single("timed", d(2025, 6, 3), "23:59")];

    let occurrences = materialize(&defs, d(2025, 6, 3), d(2025, 6, 3));
    let ids: Vec<_> = occurrences.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["timed", "untimed"]);
}

#[test]
fn materialize_is_idempotent() {
    let mut swim = swim_practice();
    swim.upsert_exception(Exception::tombstone(d(2025, 6, 9)));
    let defs = vec![swim, single("dentist", d(2025, 6, 4), "16:00")];

    let first = materialize(&defs, d(2025, 6, 1), d(2025, 6, 30));
    let second = materialize(&defs, d(2025, 6, 1), d(2025, 6, 30));

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn accepts_any_iterable_of_definitions() {
    let defs: std::collections::BTreeMap<String, EventDefinition> = [swim_practice()]
        .into_iter()
        .map(|def| (def.id.clone(), def))
        .collect();
    let occurrences = materialize(defs.values(), d(2025, 6, 2), d(2025, 6, 4));
    assert_eq!(occurrences.len(), 2);
}

// ---------------------------------------------------------------------------
// Serialization and grouping
// ---------------------------------------------------------------------------

#[test]
fn occurrence_serializes_with_flattened_fields() {
    let defs = vec![swim_practice()];
    let occurrences = materialize(&defs, d(2025, 6, 2), d(2025, 6, 2));
    let json = serde_json::to_value(&occurrences[0]).unwrap();

    assert_eq!(json["id"], "swim-2025-06-02");
    assert_eq!(json["definitionId"], "swim");
    assert_eq!(json["occurrenceDate"], "2025-06-02");
    assert_eq!(json["isRecurringOccurrence"], true);
    assert_eq!(json["status"], "active");
    assert_eq!(json["name"], "Swim practice");
    assert_eq!(json["time"], "16:00");
}

#[test]
fn group_by_day_keeps_order_within_days() {
    let defs = vec![
        swim_practice(),
        single("dentist", d(2025, 6, 4), "09:00"),
    ];
    let occurrences = materialize(&defs, d(2025, 6, 2), d(2025, 6, 8));
    let days = group_by_day(&occurrences);

    assert_eq!(days.len(), 2);
    let wednesday: Vec<_> = days[&d(2025, 6, 4)].iter().map(|o| o.id.as_str()).collect();
    assert_eq!(wednesday, vec!["dentist", "swim-2025-06-04"]);
    assert_eq!(days[&d(2025, 6, 2)].len(), 1);
}
