//! Mutation planning -- decides whether a user action rewrites the whole
//! definition or a single dated exception.
//!
//! Planning is a pure function of the current definition snapshot and the
//! intent. It performs no write: the returned [`WritePlan`] is handed to the
//! persistence collaborator (see [`crate::store`] for the in-memory one).
//!
//! Routing:
//!
//! | target | edit | delete | set status |
//! |---|---|---|---|
//! | single event, or series-level ref | definition patch | definition delete | definition patch |
//! | recurring occurrence | exception upsert | tombstone upsert | exception upsert |

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::parse_date;
use crate::error::{EngineError, Result};
use crate::expander::occurs_on;
use crate::model::{DefinitionPatch, EventDefinition, Exception, FieldOverrides, Status};
use crate::resolver::resolve;

/// Points an intent at an occurrence (or, without a date, at the definition).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceRef {
    pub definition_id: String,
    #[serde(default, alias = "date", skip_serializing_if = "Option::is_none")]
    pub occurrence_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_recurring_occurrence: bool,
}

impl OccurrenceRef {
    /// A reference to a single event, or to a whole series.
    pub fn definition(definition_id: impl Into<String>) -> Self {
        Self {
            definition_id: definition_id.into(),
            occurrence_date: None,
            is_recurring_occurrence: false,
        }
    }

    /// A reference to one dated occurrence of a recurring definition.
    pub fn recurring(definition_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            definition_id: definition_id.into(),
            occurrence_date: Some(date),
            is_recurring_occurrence: true,
        }
    }

    /// Recover a reference from a materialized occurrence id.
    ///
    /// `<definition>-YYYY-MM-DD` is read as a recurring occurrence; anything
    /// else is taken to be a single event's definition id.
    pub fn from_synthetic_id(id: &str) -> Self {
        const DATE_LEN: usize = "YYYY-MM-DD".len();

        if id.len() > DATE_LEN + 1 && id.is_char_boundary(id.len() - DATE_LEN - 1) {
            let (definition_id, suffix) = id.split_at(id.len() - DATE_LEN - 1);
            if let Some(Ok(date)) = suffix.strip_prefix('-').map(parse_date) {
                return Self::recurring(definition_id, date);
            }
        }
        Self::definition(id)
    }
}

/// How far an occurrence-level edit reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditScope {
    /// Only the referenced occurrence (an exception on recurring definitions).
    #[default]
    ThisOccurrence,
    /// The same fields, applied to the definition itself.
    WholeSeries,
}

/// A user action against the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "intent",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Intent {
    EditOccurrence {
        target: OccurrenceRef,
        fields: FieldOverrides,
        #[serde(default)]
        scope: EditScope,
    },
    DeleteOccurrence {
        target: OccurrenceRef,
    },
    SetOccurrenceStatus {
        target: OccurrenceRef,
        status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cancellation_reason: Option<String>,
    },
    /// Whole-definition edit. Existing exceptions survive it.
    EditSeries {
        definition_id: String,
        patch: DefinitionPatch,
    },
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::EditOccurrence { .. } => "editOccurrence",
            Intent::DeleteOccurrence { .. } => "deleteOccurrence",
            Intent::SetOccurrenceStatus { .. } => "setOccurrenceStatus",
            Intent::EditSeries { .. } => "editSeries",
        }
    }

    pub fn definition_id(&self) -> &str {
        match self {
            Intent::EditOccurrence { target, .. }
            | Intent::DeleteOccurrence { target }
            | Intent::SetOccurrenceStatus { target, .. } => &target.definition_id,
            Intent::EditSeries { definition_id, .. } => definition_id,
        }
    }
}

/// The single write the persistence collaborator must perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WritePlan {
    /// Apply the patch to the definition; exceptions stay as they are.
    PatchDefinition {
        definition_id: String,
        patch: DefinitionPatch,
    },
    DeleteDefinition { definition_id: String },
    /// Merge `exception` into the record on its date, or add it if there is none.
    UpsertException {
        definition_id: String,
        exception: Exception,
    },
}

impl WritePlan {
    pub fn definition_id(&self) -> &str {
        match self {
            WritePlan::PatchDefinition { definition_id, .. }
            | WritePlan::DeleteDefinition { definition_id }
            | WritePlan::UpsertException { definition_id, .. } => definition_id,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, WritePlan::UpsertException { exception, .. } if exception.is_tombstone())
    }
}

/// Read access to a snapshot of definitions.
pub trait DefinitionSource {
    fn definition(&self, id: &str) -> Option<&EventDefinition>;
}

impl DefinitionSource for BTreeMap<String, EventDefinition> {
    fn definition(&self, id: &str) -> Option<&EventDefinition> {
        self.get(id)
    }
}

impl<S: BuildHasher> DefinitionSource for HashMap<String, EventDefinition, S> {
    fn definition(&self, id: &str) -> Option<&EventDefinition> {
        self.get(id)
    }
}

impl DefinitionSource for [EventDefinition] {
    fn definition(&self, id: &str) -> Option<&EventDefinition> {
        self.iter().find(|definition| definition.id == id)
    }
}

impl DefinitionSource for Vec<EventDefinition> {
    fn definition(&self, id: &str) -> Option<&EventDefinition> {
        self.as_slice().definition(id)
    }
}

/// Translate `intent` into a [`WritePlan`] against the `source` snapshot.
///
/// # Errors
/// - `DefinitionNotFound` if the target definition is not in the snapshot.
/// - `Validation` if the payload is empty or would produce an invalid
///   definition, or the date is not an occurrence of the series.
/// - `InvalidTransition` if the status change is not allowed from the
///   occurrence's current status.
pub fn plan_mutation<S>(source: &S, intent: &Intent) -> Result<WritePlan>
where
    S: DefinitionSource + ?Sized,
{
    let definition_id = intent.definition_id();
    let Some(definition) = source.definition(definition_id) else {
        tracing::warn!(definition_id, intent = intent.name(), "mutation target not found");
        return Err(EngineError::DefinitionNotFound(definition_id.to_string()));
    };

    let plan = match intent {
        Intent::EditSeries { patch, .. } => plan_patch(definition, patch.clone())?,
        Intent::EditOccurrence {
            target,
            fields,
            scope,
        } => {
            if fields.is_empty() {
                return Err(EngineError::Validation(
                    "edit carries no fields to change".to_string(),
                ));
            }
            let date = match scope {
                EditScope::ThisOccurrence => occurrence_date(definition, target)?,
                EditScope::WholeSeries => None,
            };
            match date {
                Some(date) => plan_upsert(
                    definition,
                    Exception {
                        date,
                        status: None,
                        overrides: fields.clone(),
                    },
                )?,
                None => plan_patch(definition, DefinitionPatch::from_overrides(fields))?,
            }
        }
        Intent::DeleteOccurrence { target } => match occurrence_date(definition, target)? {
            Some(date) => plan_upsert(definition, Exception::tombstone(date))?,
            None => WritePlan::DeleteDefinition {
                definition_id: definition.id.clone(),
            },
        },
        Intent::SetOccurrenceStatus {
            target,
            status,
            cancellation_reason,
        } => {
            let date = occurrence_date(definition, target)?;
            let current = match date {
                Some(date) => resolve(definition, date).status,
                None => definition.base_status(),
            };
            if !current.can_transition_to(*status) {
                return Err(EngineError::InvalidTransition {
                    from: current,
                    to: *status,
                });
            }
            match date {
                Some(date) => {
                    let mut exception = Exception::new(date);
                    exception.status = Some(*status);
                    exception
                        .overrides
                        .cancellation_reason
                        .clone_from(cancellation_reason);
                    plan_upsert(definition, exception)?
                }
                None => plan_patch(
                    definition,
                    DefinitionPatch::with_status(*status, cancellation_reason.clone()),
                )?,
            }
        }
    };

    tracing::debug!(
        definition_id,
        intent = intent.name(),
        tombstone = plan.is_tombstone(),
        "planned mutation"
    );
    Ok(plan)
}

/// The occurrence date an intent addresses, or `None` when it addresses the
/// definition as a whole.
///
/// Only a reference flagged recurring, to a definition that really recurs,
/// takes the exception path.
fn occurrence_date(
    definition: &EventDefinition,
    target: &OccurrenceRef,
) -> Result<Option<NaiveDate>> {
    if !target.is_recurring_occurrence || !definition.is_recurring() {
        return Ok(None);
    }
    let date = target.occurrence_date.ok_or_else(|| {
        EngineError::Validation(format!(
            "occurrence of '{}' is missing its date",
            definition.id
        ))
    })?;
    if !occurs_on(&definition.recurrence, date) {
        return Err(EngineError::Validation(format!(
            "{} is not an occurrence of '{}'",
            date, definition.id
        )));
    }
    Ok(Some(date))
}

fn plan_patch(definition: &EventDefinition, patch: DefinitionPatch) -> Result<WritePlan> {
    if patch.is_empty() {
        return Err(EngineError::Validation(
            "patch carries no fields to change".to_string(),
        ));
    }
    let mut candidate = definition.clone();
    patch.apply_to(&mut candidate);
    candidate.validate()?;

    Ok(WritePlan::PatchDefinition {
        definition_id: definition.id.clone(),
        patch,
    })
}

fn plan_upsert(definition: &EventDefinition, exception: Exception) -> Result<WritePlan> {
    let mut candidate = definition.clone();
    candidate.upsert_exception(exception.clone());
    candidate.validate()?;

    Ok(WritePlan::UpsertException {
        definition_id: definition.id.clone(),
        exception,
    })
}
