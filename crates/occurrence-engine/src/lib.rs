//! # occurrence-engine
//!
//! Deterministic occurrence materialization and exception overlay for family
//! calendars.
//!
//! Given a snapshot of event definitions (single or recurring) and a date
//! window, the engine computes the ordered list of occurrences to display,
//! with per-date exceptions applied. Given a user action on one of those
//! occurrences, it decides whether to patch the whole definition or write a
//! single dated exception. It holds no state and performs no I/O: callers pass
//! the current definitions on every call and persist the returned write plan
//! themselves.
//!
//! ## Modules
//!
//! - [`dates`] -- `HH:MM` clock times, `YYYY-MM-DD` parsing, month arithmetic
//! - [`model`] -- Event definitions, exceptions, status state machine
//! - [`expander`] -- Recurrence rule + window → candidate dates
//! - [`resolver`] -- Candidate date → effective fields and status
//! - [`materializer`] -- Definitions + window → sorted occurrences
//! - [`planner`] -- User intent → write plan
//! - [`store`] -- Applying write plans to an in-memory snapshot
//! - [`error`] -- Error types

pub mod dates;
pub mod error;
pub mod expander;
pub mod materializer;
pub mod model;
pub mod planner;
pub mod resolver;
pub mod store;

pub use dates::ClockTime;
pub use error::EngineError;
pub use expander::expand;
pub use materializer::{group_by_day, materialize, Occurrence};
pub use model::{
    Assignee, DefinitionPatch, EventDefinition, Exception, FieldOverrides, Recurrence, Status,
};
pub use planner::{plan_mutation, EditScope, Intent, OccurrenceRef, WritePlan};
pub use resolver::resolve;
pub use store::{apply_plan, MemoryStore};
