//! Applying write plans to a definition snapshot.
//!
//! [`apply_plan`] is the reference behaviour for whatever persistence layer
//! receives a [`WritePlan`]: every write is built on a copy of the target
//! definition and swapped in whole, so a reader never sees half a merge.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::{EngineError, Result};
use crate::materializer::{materialize, Occurrence};
use crate::model::EventDefinition;
use crate::planner::{plan_mutation, DefinitionSource, Intent, WritePlan};

/// Mutable access to stored definitions.
pub trait DefinitionStore: DefinitionSource {
    fn definition_mut(&mut self, id: &str) -> Option<&mut EventDefinition>;

    fn remove_definition(&mut self, id: &str) -> Option<EventDefinition>;
}

impl DefinitionStore for BTreeMap<String, EventDefinition> {
    fn definition_mut(&mut self, id: &str) -> Option<&mut EventDefinition> {
        self.get_mut(id)
    }

    fn remove_definition(&mut self, id: &str) -> Option<EventDefinition> {
        self.remove(id)
    }
}

impl DefinitionStore for Vec<EventDefinition> {
    fn definition_mut(&mut self, id: &str) -> Option<&mut EventDefinition> {
        self.iter_mut().find(|definition| definition.id == id)
    }

    fn remove_definition(&mut self, id: &str) -> Option<EventDefinition> {
        let index = self.iter().position(|definition| definition.id == id)?;
        Some(self.remove(index))
    }
}

/// Apply one write plan to `store`.
///
/// # Errors
/// - `DefinitionNotFound` if the target is gone.
/// - `Validation` for an exception aimed at a single event, or a write that
///   would leave the definition invalid. The store is unchanged on error.
pub fn apply_plan<S>(store: &mut S, plan: &WritePlan) -> Result<()>
where
    S: DefinitionStore + ?Sized,
{
    let definition_id = plan.definition_id();
    let not_found = || EngineError::DefinitionNotFound(definition_id.to_string());

    match plan {
        WritePlan::DeleteDefinition { .. } => {
            store.remove_definition(definition_id).ok_or_else(not_found)?;
        }
        WritePlan::PatchDefinition { patch, .. } => {
            let current = store.definition_mut(definition_id).ok_or_else(not_found)?;
            let mut next = current.clone();
            patch.apply_to(&mut next);
            next.validate()?;
            *current = next;
        }
        WritePlan::UpsertException { exception, .. } => {
            let current = store.definition_mut(definition_id).ok_or_else(not_found)?;
            if !current.is_recurring() {
                return Err(EngineError::Validation(format!(
                    "definition '{}' is a single event and cannot carry exceptions",
                    definition_id
                )));
            }
            let mut next = current.clone();
            next.upsert_exception(exception.clone());
            next.validate()?;
            *current = next;
        }
    }

    tracing::info!(definition_id, "applied write plan");
    Ok(())
}

/// An in-memory definition store that keeps insertion order, so materialized
/// ties fall back to the order definitions were added in.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    definitions: Vec<EventDefinition>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add a definition, replacing any with the same id in place.
    pub fn insert(&mut self, definition: EventDefinition) -> Result<()> {
        definition.validate()?;
        match self.definitions.definition_mut(&definition.id) {
            Some(existing) => *existing = definition,
            None => self.definitions.push(definition),
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&EventDefinition> {
        self.definitions.definition(id)
    }

    pub fn definitions(&self) -> &[EventDefinition] {
        &self.definitions
    }

    pub fn into_definitions(self) -> Vec<EventDefinition> {
        self.definitions
    }

    pub fn materialize(&self, window_start: NaiveDate, window_end: NaiveDate) -> Vec<Occurrence> {
        materialize(&self.definitions, window_start, window_end)
    }

    /// Plan `intent` against the current contents and apply the result.
    pub fn submit(&mut self, intent: &Intent) -> Result<WritePlan> {
        let plan = plan_mutation(&self.definitions, intent)?;
        apply_plan(&mut self.definitions, &plan)?;
        Ok(plan)
    }
}

impl From<Vec<EventDefinition>> for MemoryStore {
    fn from(definitions: Vec<EventDefinition>) -> Self {
        Self { definitions }
    }
}

impl DefinitionSource for MemoryStore {
    fn definition(&self, id: &str) -> Option<&EventDefinition> {
        self.definitions.definition(id)
    }
}

impl DefinitionStore for MemoryStore {
    fn definition_mut(&mut self, id: &str) -> Option<&mut EventDefinition> {
        self.definitions.definition_mut(id)
    }

    fn remove_definition(&mut self, id: &str) -> Option<EventDefinition> {
        self.definitions.remove_definition(id)
    }
}
