//! Event definitions, per-date exceptions, and the value types they carry.
//!
//! A definition is either a single event or a recurring series. Recurring
//! definitions embed their exceptions keyed by date; on the wire the
//! exceptions are an array of records that each carry their own `date`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::ClockTime;
use crate::error::{EngineError, Result};

/// Lifecycle status of a definition or a single occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Cancelled,
    Completed,
    /// Suppresses the occurrence entirely. On an exception this is a tombstone.
    Deleted,
    Inactive,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Cancelled => "cancelled",
            Status::Completed => "completed",
            Status::Deleted => "deleted",
            Status::Inactive => "inactive",
        }
    }

    /// Whether an occurrence in this state is hidden from materialized output.
    pub fn is_suppressed(self) -> bool {
        self == Status::Deleted
    }

    /// Per-occurrence state machine.
    ///
    /// `active <-> cancelled`, `active <-> completed` (the way back is the
    /// explicit undo), and anything `-> deleted`. Nothing leaves `deleted`.
    /// `inactive` moves like `active`. Re-entering the current state is a no-op
    /// and always allowed.
    pub fn can_transition_to(self, next: Status) -> bool {
        if self == next {
            return true;
        }
        let from = if self == Status::Inactive {
            Status::Active
        } else {
            self
        };
        match (from, next) {
            (Status::Deleted, _) => false,
            (_, Status::Deleted) => true,
            (Status::Active, Status::Cancelled)
            | (Status::Cancelled, Status::Active)
            | (Status::Active, Status::Completed)
            | (Status::Completed, Status::Active) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who can see an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    OnlyMe,
    #[default]
    Family,
    KnownFamilies,
}

/// Reminder settings. Delivery is handled elsewhere; the engine only carries them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reminders {
    pub enabled: bool,
    /// Minutes before the occurrence start.
    pub times: Vec<u32>,
    pub sound: Option<String>,
    pub vibration: bool,
}

/// Prefix marking a raw assignee string as an account user rather than a
/// family member record.
pub const ACCOUNT_USER_PREFIX: &str = "account-user:";

/// The person an event is assigned to.
///
/// Serialized as `{"kind": ..., "id": ...}`. A bare string (or `null`) is
/// also accepted on input and resolved through [`Assignee::from_raw`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Assignee {
    /// A family member record.
    Member(String),
    /// The account holder, who has no member record of their own.
    AccountUser(String),
    #[default]
    Unassigned,
}

impl Assignee {
    /// Resolve a legacy raw assignee string once, at ingestion.
    ///
    /// `account-user:<id>` is an account user, a blank or missing value is
    /// unassigned, anything else is a member id.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Assignee::Unassigned,
            Some(s) => match s.strip_prefix(ACCOUNT_USER_PREFIX) {
                Some("") => Assignee::Unassigned,
                Some(id) => Assignee::AccountUser(id.to_string()),
                None => Assignee::Member(s.to_string()),
            },
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Assignee::Member(id) | Assignee::AccountUser(id) => Some(id),
            Assignee::Unassigned => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
enum TaggedAssignee {
    Member(String),
    AccountUser(String),
    Unassigned,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AssigneeRepr {
    Tagged(TaggedAssignee),
    Raw(Option<String>),
}

impl<'de> Deserialize<'de> for Assignee {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(match AssigneeRepr::deserialize(deserializer)? {
            AssigneeRepr::Tagged(TaggedAssignee::Member(id)) => Assignee::Member(id),
            AssigneeRepr::Tagged(TaggedAssignee::AccountUser(id)) => Assignee::AccountUser(id),
            AssigneeRepr::Tagged(TaggedAssignee::Unassigned) => Assignee::Unassigned,
            AssigneeRepr::Raw(raw) => Assignee::from_raw(raw.as_deref()),
        })
    }
}

/// How a definition repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Recurrence {
    /// A single event on one day.
    None { date: NaiveDate },
    Daily {
        start_date: NaiveDate,
        #[serde(default)]
        end_date: Option<NaiveDate>,
    },
    Weekly {
        start_date: NaiveDate,
        #[serde(default)]
        end_date: Option<NaiveDate>,
        /// 0 = Sunday ... 6 = Saturday.
        #[serde(default)]
        days_of_week: BTreeSet<u8>,
    },
    /// Same day-of-month as `start_date`, clamped to the end of shorter months.
    Monthly {
        start_date: NaiveDate,
        #[serde(default)]
        end_date: Option<NaiveDate>,
    },
}

impl Recurrence {
    pub fn is_recurring(&self) -> bool {
        !matches!(self, Recurrence::None { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Recurrence::None { .. } => "none",
            Recurrence::Daily { .. } => "daily",
            Recurrence::Weekly { .. } => "weekly",
            Recurrence::Monthly { .. } => "monthly",
        }
    }

    /// First day the definition can occur on.
    pub fn start_date(&self) -> NaiveDate {
        match self {
            Recurrence::None { date } => *date,
            Recurrence::Daily { start_date, .. }
            | Recurrence::Weekly { start_date, .. }
            | Recurrence::Monthly { start_date, .. } => *start_date,
        }
    }

    /// Last day the definition can occur on, `None` when unbounded.
    pub fn end_date(&self) -> Option<NaiveDate> {
        match self {
            Recurrence::None { date } => Some(*date),
            Recurrence::Daily { end_date, .. }
            | Recurrence::Weekly { end_date, .. }
            | Recurrence::Monthly { end_date, .. } => *end_date,
        }
    }
}

/// The per-occurrence overridable fields. Anything not listed here can only
/// be changed on the whole definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<ClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<ClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Assignee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
}

impl FieldOverrides {
    pub fn is_empty(&self) -> bool {
        *self == FieldOverrides::default()
    }

    /// Copy every field `newer` carries over `self`; fields it omits are kept.
    pub fn merge_from(&mut self, newer: &FieldOverrides) {
        fn take<T: Clone>(slot: &mut Option<T>, newer: &Option<T>) {
            if let Some(value) = newer {
                *slot = Some(value.clone());
            }
        }
        take(&mut self.name, &newer.name);
        take(&mut self.time, &newer.time);
        take(&mut self.end_time, &newer.end_time);
        take(&mut self.location, &newer.location);
        take(&mut self.assigned_to, &newer.assigned_to);
        take(&mut self.notes, &newer.notes);
        take(&mut self.cancellation_reason, &newer.cancellation_reason);
    }
}

/// A per-date override on a recurring definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exception {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(flatten)]
    pub overrides: FieldOverrides,
}

impl Exception {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            status: None,
            overrides: FieldOverrides::default(),
        }
    }

    pub fn tombstone(date: NaiveDate) -> Self {
        Self {
            status: Some(Status::Deleted),
            ..Self::new(date)
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.status == Some(Status::Deleted)
    }

    /// Merge a newer record for the same date into this one.
    ///
    /// A newer status other than `cancelled` drops a stored cancellation
    /// reason unless the newer record supplies its own.
    pub fn merge(&mut self, newer: &Exception) {
        debug_assert_eq!(self.date, newer.date);
        if let Some(status) = newer.status {
            self.status = Some(status);
            if status != Status::Cancelled {
                self.overrides.cancellation_reason = None;
            }
        }
        self.overrides.merge_from(&newer.overrides);
    }
}

/// A stored event: single or recurring, with embedded exceptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub assigned_to: Assignee,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub show_avatar: bool,
    #[serde(default)]
    pub reminders: Reminders,
    /// Account ids to notify.
    #[serde(default)]
    pub notification_recipients: BTreeSet<String>,
    /// Definition-level default; unset means active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    pub recurrence: Recurrence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<ClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<ClockTime>,
    #[serde(
        default,
        with = "exception_list",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub exceptions: BTreeMap<NaiveDate, Exception>,
}

impl EventDefinition {
    /// A definition with every optional field at its default.
    pub fn new(id: impl Into<String>, name: impl Into<String>, recurrence: Recurrence) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: None,
            notes: None,
            assigned_to: Assignee::Unassigned,
            icon: None,
            color: None,
            points: None,
            visibility: Visibility::default(),
            show_avatar: false,
            reminders: Reminders::default(),
            notification_recipients: BTreeSet::new(),
            status: None,
            cancellation_reason: None,
            recurrence,
            time: None,
            end_time: None,
            exceptions: BTreeMap::new(),
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_recurring()
    }

    pub fn base_status(&self) -> Status {
        self.status.unwrap_or_default()
    }

    pub fn exception(&self, date: NaiveDate) -> Option<&Exception> {
        self.exceptions.get(&date)
    }

    /// Insert an exception, or merge it into the one already on its date.
    pub fn upsert_exception(&mut self, exception: Exception) -> &Exception {
        self.exceptions
            .entry(exception.date)
            .and_modify(|existing| existing.merge(&exception))
            .or_insert(exception)
    }

    /// Check the definition is well-formed enough to store.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(EngineError::Validation(format!(
                "definition '{}': {}",
                self.id, message
            )))
        };

        if self.name.trim().is_empty() {
            return invalid("name is required");
        }
        let Some(time) = self.time else {
            return invalid("time is required");
        };
        if self.end_time.is_some_and(|end| end <= time) {
            return invalid("end time must be after start time");
        }

        match &self.recurrence {
            Recurrence::None { .. } => {
                if !self.exceptions.is_empty() {
                    return invalid("single events cannot carry exceptions");
                }
            }
            Recurrence::Weekly { days_of_week, .. } if days_of_week.is_empty() => {
                return invalid("weekly recurrence requires at least one weekday");
            }
            Recurrence::Weekly { days_of_week, .. } if days_of_week.iter().any(|d| *d > 6) => {
                return invalid("weekday index must be between 0 (Sunday) and 6 (Saturday)");
            }
            _ => {}
        }

        if let Some(end) = self.recurrence.end_date() {
            if self.recurrence.start_date() > end {
                return invalid("start date must not be after end date");
            }
        }

        for exception in self.exceptions.values() {
            if exception
                .overrides
                .name
                .as_deref()
                .is_some_and(|name| name.trim().is_empty())
            {
                return Err(EngineError::Validation(format!(
                    "definition '{}': exception on {} has a blank name",
                    self.id, exception.date
                )));
            }
            let start = exception.overrides.time.unwrap_or(time);
            if let Some(end) = exception.overrides.end_time.or(self.end_time) {
                if end <= start {
                    return Err(EngineError::Validation(format!(
                        "definition '{}': exception on {} ends before it starts",
                        self.id, exception.date
                    )));
                }
            }
        }

        Ok(())
    }
}

/// A whole-definition change. Omitted fields stay as they are; exceptions
/// are never touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Assignee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_avatar: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminders: Option<Reminders>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_recipients: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<ClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<ClockTime>,
}

impl DefinitionPatch {
    /// The same allow-listed fields, aimed at the whole definition.
    pub fn from_overrides(overrides: &FieldOverrides) -> Self {
        Self {
            name: overrides.name.clone(),
            time: overrides.time,
            end_time: overrides.end_time,
            location: overrides.location.clone(),
            assigned_to: overrides.assigned_to.clone(),
            notes: overrides.notes.clone(),
            cancellation_reason: overrides.cancellation_reason.clone(),
            ..Self::default()
        }
    }

    pub fn with_status(status: Status, cancellation_reason: Option<String>) -> Self {
        Self {
            status: Some(status),
            cancellation_reason,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == DefinitionPatch::default()
    }

    pub fn apply_to(&self, definition: &mut EventDefinition) {
        fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }
        fn set_opt<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        set(&mut definition.name, &self.name);
        set_opt(&mut definition.location, &self.location);
        set_opt(&mut definition.notes, &self.notes);
        set(&mut definition.assigned_to, &self.assigned_to);
        set_opt(&mut definition.icon, &self.icon);
        set_opt(&mut definition.color, &self.color);
        set_opt(&mut definition.points, &self.points);
        set(&mut definition.visibility, &self.visibility);
        set(&mut definition.show_avatar, &self.show_avatar);
        set(&mut definition.reminders, &self.reminders);
        set(
            &mut definition.notification_recipients,
            &self.notification_recipients,
        );
        set_opt(&mut definition.status, &self.status);
        set_opt(&mut definition.cancellation_reason, &self.cancellation_reason);
        set(&mut definition.recurrence, &self.recurrence);
        set_opt(&mut definition.time, &self.time);
        set_opt(&mut definition.end_time, &self.end_time);
    }
}

/// Exceptions travel as a JSON array; in memory they are keyed by date.
/// Duplicate dates in the input are merged in array order.
mod exception_list {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Exception;

    pub fn serialize<S: Serializer>(
        exceptions: &BTreeMap<NaiveDate, Exception>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(exceptions.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<NaiveDate, Exception>, D::Error> {
        let records = Vec::<Exception>::deserialize(deserializer)?;
        let mut exceptions: BTreeMap<NaiveDate, Exception> = BTreeMap::new();
        for record in records {
            exceptions
                .entry(record.date)
                .and_modify(|existing| existing.merge(&record))
                .or_insert(record);
        }
        Ok(exceptions)
    }
}
