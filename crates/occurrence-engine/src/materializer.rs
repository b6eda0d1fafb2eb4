//! Occurrence materialization -- definitions plus a window in, a sorted list
//! of displayable occurrences out.
//!
//! Every call recomputes from the definitions it is handed. There is no cache
//! and no hidden state, so identical input always yields identical output.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::ClockTime;
use crate::expander::expand;
use crate::model::{EventDefinition, Status, Visibility};
use crate::planner::OccurrenceRef;
use crate::resolver::{resolve, EffectiveFields};

/// One concrete, displayable instance of a definition. Computed, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    /// `definition_id` for single events, `definition_id-YYYY-MM-DD` otherwise.
    pub id: String,
    pub definition_id: String,
    pub occurrence_date: NaiveDate,
    pub is_recurring_occurrence: bool,
    pub status: Status,
    pub has_exception: bool,
    #[serde(flatten)]
    pub fields: EffectiveFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
    pub visibility: Visibility,
    pub show_avatar: bool,
}

impl Occurrence {
    /// The reference a mutation intent uses to target this occurrence.
    pub fn reference(&self) -> OccurrenceRef {
        OccurrenceRef {
            definition_id: self.definition_id.clone(),
            occurrence_date: Some(self.occurrence_date),
            is_recurring_occurrence: self.is_recurring_occurrence,
        }
    }
}

/// Stable identity of an occurrence across recomputations.
pub fn synthetic_id(definition_id: &str, occurrence_date: Option<NaiveDate>) -> String {
    match occurrence_date {
        Some(date) => format!("{}-{}", definition_id, date.format("%Y-%m-%d")),
        None => definition_id.to_string(),
    }
}

/// Materialize every occurrence of `definitions` inside
/// `[window_start, window_end]` (inclusive).
///
/// Occurrences resolved to `deleted` are dropped. The result is ordered by
/// date, then start time (untimed last), then input order.
pub fn materialize<'a, I>(
    definitions: I,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<Occurrence>
where
    I: IntoIterator<Item = &'a EventDefinition>,
{
    let mut occurrences = Vec::new();
    let mut definition_count = 0usize;
    let mut suppressed = 0usize;

    for definition in definitions {
        definition_count += 1;
        let recurring = definition.is_recurring();

        for date in expand(&definition.recurrence, window_start, window_end) {
            let resolution = resolve(definition, date);
            if resolution.status.is_suppressed() {
                suppressed += 1;
                continue;
            }

            occurrences.push(Occurrence {
                id: synthetic_id(&definition.id, recurring.then_some(date)),
                definition_id: definition.id.clone(),
                occurrence_date: date,
                is_recurring_occurrence: recurring,
                status: resolution.status,
                has_exception: resolution.has_exception,
                fields: resolution.fields,
                icon: definition.icon.clone(),
                color: definition.color.clone(),
                points: definition.points,
                visibility: definition.visibility,
                show_avatar: definition.show_avatar,
            });
        }
    }

    // Stable sort keeps input order for equal keys.
    occurrences.sort_by_key(|occurrence| {
        (
            occurrence.occurrence_date,
            occurrence
                .fields
                .time
                .map_or(u32::MAX, ClockTime::minutes_since_midnight),
        )
    });

    tracing::debug!(
        definitions = definition_count,
        occurrences = occurrences.len(),
        suppressed,
        %window_start,
        %window_end,
        "materialized window"
    );

    occurrences
}

/// Group an ordered occurrence list by calendar day, keeping order within each day.
pub fn group_by_day(occurrences: &[Occurrence]) -> BTreeMap<NaiveDate, Vec<&Occurrence>> {
    let mut days: BTreeMap<NaiveDate, Vec<&Occurrence>> = BTreeMap::new();
    for occurrence in occurrences {
        days.entry(occurrence.occurrence_date)
            .or_default()
            .push(occurrence);
    }
    days
}
