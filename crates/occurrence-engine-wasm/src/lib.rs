//! WASM bindings for occurrence-engine.
//!
//! Exposes materialization, mutation planning, and plan application to
//! JavaScript via `wasm-bindgen`. Definitions, intents, and plans cross the
//! boundary as JSON strings in the same camelCase shape the engine serializes.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p occurrence-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target nodejs --out-dir packages/occurrence-engine-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/occurrence_engine_wasm.wasm
//! ```

use chrono::NaiveDate;
use occurrence_engine::dates::parse_date;
use occurrence_engine::{EventDefinition, Intent, MemoryStore, Occurrence, WritePlan};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Result of `submitIntent`: the plan that was applied and the definitions after it.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResultDto {
    plan: WritePlan,
    definitions: Vec<EventDefinition>,
}

// ---------------------------------------------------------------------------
// Helpers (plain `String` errors so they can be tested off-wasm)
// ---------------------------------------------------------------------------

fn parse_definitions_json(json: &str) -> Result<Vec<EventDefinition>, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid definitions JSON: {}", e))
}

fn parse_window(start: &str, end: &str) -> Result<(NaiveDate, NaiveDate), String> {
    let start = parse_date(start).map_err(|e| e.to_string())?;
    let end = parse_date(end).map_err(|e| e.to_string())?;
    Ok((start, end))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

fn materialize_json(
    definitions_json: &str,
    window_start: &str,
    window_end: &str,
) -> Result<String, String> {
    let definitions = parse_definitions_json(definitions_json)?;
    let (start, end) = parse_window(window_start, window_end)?;
    let occurrences: Vec<Occurrence> = occurrence_engine::materialize(&definitions, start, end);
    to_json(&occurrences)
}

fn plan_json(definitions_json: &str, intent_json: &str) -> Result<String, String> {
    let definitions = parse_definitions_json(definitions_json)?;
    let intent: Intent =
        serde_json::from_str(intent_json).map_err(|e| format!("Invalid intent JSON: {}", e))?;
    let plan =
        occurrence_engine::plan_mutation(&definitions, &intent).map_err(|e| e.to_string())?;
    to_json(&plan)
}

fn apply_json(definitions_json: &str, plan_json: &str) -> Result<String, String> {
    let mut definitions = parse_definitions_json(definitions_json)?;
    let plan: WritePlan =
        serde_json::from_str(plan_json).map_err(|e| format!("Invalid plan JSON: {}", e))?;
    occurrence_engine::apply_plan(&mut definitions, &plan).map_err(|e| e.to_string())?;
    to_json(&definitions)
}

fn submit_json(definitions_json: &str, intent_json: &str) -> Result<String, String> {
    let definitions = parse_definitions_json(definitions_json)?;
    let intent: Intent =
        serde_json::from_str(intent_json).map_err(|e| format!("Invalid intent JSON: {}", e))?;

    let mut store = MemoryStore::from(definitions);
    let plan = store.submit(&intent).map_err(|e| e.to_string())?;
    to_json(&SubmitResultDto {
        plan,
        definitions: store.into_definitions(),
    })
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Materialize the occurrences of a definition set inside an inclusive window.
///
/// Returns a JSON array of occurrences ordered by date, then start time.
///
/// # Arguments
/// - `definitions_json` -- JSON array of event definitions
/// - `window_start` -- first day of the window (e.g., "2025-06-02")
/// - `window_end` -- last day of the window, inclusive
#[wasm_bindgen(js_name = "materialize")]
pub fn materialize(
    definitions_json: &str,
    window_start: &str,
    window_end: &str,
) -> Result<String, JsValue> {
    materialize_json(definitions_json, window_start, window_end).map_err(|e| JsValue::from_str(&e))
}

/// Turn a user intent into the single write plan it requires.
///
/// Returns the plan as JSON, tagged by `op`. Stale references and invalid
/// edits are reported as errors.
#[wasm_bindgen(js_name = "planMutation")]
pub fn plan_mutation(definitions_json: &str, intent_json: &str) -> Result<String, JsValue> {
    plan_json(definitions_json, intent_json).map_err(|e| JsValue::from_str(&e))
}

/// Apply a write plan and return the updated definitions as JSON.
#[wasm_bindgen(js_name = "applyPlan")]
pub fn apply_plan(definitions_json: &str, plan_json: &str) -> Result<String, JsValue> {
    apply_json(definitions_json, plan_json).map_err(|e| JsValue::from_str(&e))
}

/// Plan and apply an intent in one call.
///
/// Returns `{plan, definitions}` as JSON.
#[wasm_bindgen(js_name = "submitIntent")]
pub fn submit_intent(definitions_json: &str, intent_json: &str) -> Result<String, JsValue> {
    submit_json(definitions_json, intent_json).map_err(|e| JsValue::from_str(&e))
}
