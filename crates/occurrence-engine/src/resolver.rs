//! Exception overlay -- computes what one occurrence of a definition looks like.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::ClockTime;
use crate::model::{Assignee, EventDefinition, FieldOverrides, Status};

/// The overridable fields of one occurrence after any exception is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveFields {
    pub name: String,
    pub time: Option<ClockTime>,
    pub end_time: Option<ClockTime>,
    pub location: Option<String>,
    pub assigned_to: Assignee,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
}

impl EffectiveFields {
    /// The definition's own values, before any exception.
    pub fn base(definition: &EventDefinition) -> Self {
        Self {
            name: definition.name.clone(),
            time: definition.time,
            end_time: definition.end_time,
            location: definition.location.clone(),
            assigned_to: definition.assigned_to.clone(),
            notes: definition.notes.clone(),
            cancellation_reason: definition.cancellation_reason.clone(),
        }
    }

    /// Shallow merge: only the fields the overrides carry are replaced.
    pub fn overlay(&mut self, overrides: &FieldOverrides) {
        if let Some(name) = &overrides.name {
            self.name.clone_from(name);
        }
        if overrides.time.is_some() {
            self.time = overrides.time;
        }
        if overrides.end_time.is_some() {
            self.end_time = overrides.end_time;
        }
        if overrides.location.is_some() {
            self.location.clone_from(&overrides.location);
        }
        if let Some(assignee) = &overrides.assigned_to {
            self.assigned_to = assignee.clone();
        }
        if overrides.notes.is_some() {
            self.notes.clone_from(&overrides.notes);
        }
        if overrides.cancellation_reason.is_some() {
            self.cancellation_reason
                .clone_from(&overrides.cancellation_reason);
        }
    }
}

/// The resolved view of a definition on one date.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub fields: EffectiveFields,
    pub status: Status,
    /// Whether an exception record exists for this date.
    pub has_exception: bool,
}

/// Resolve the effective fields and status of `definition` on `occurrence_date`.
///
/// Looks up an exception by exact date only. Without one, the result is the
/// definition's own fields and status (active when unset). With one, its
/// allow-listed fields are laid over the base and its status, if any, wins.
/// The cancellation reason is only reported for cancelled occurrences.
/// Single events never consult exceptions.
pub fn resolve(definition: &EventDefinition, occurrence_date: NaiveDate) -> Resolution {
    let mut fields = EffectiveFields::base(definition);
    let mut status = definition.base_status();

    let exception = if definition.is_recurring() {
        definition.exception(occurrence_date)
    } else {
        None
    };

    if let Some(exception) = exception {
        fields.overlay(&exception.overrides);
        if let Some(overridden) = exception.status {
            status = overridden;
        }
    }
    // A reason only describes a cancelled occurrence.
    if status != Status::Cancelled {
        fields.cancellation_reason = None;
    }

    Resolution {
        fields,
        status,
        has_exception: exception.is_some(),
    }
}
