//! PyO3 bindings for the host service.
//!
//! Aggregates cross the boundary as JSON strings; results come back as
//! dicts the host can serialize directly.

use lazy_static::lazy_static;
use pyo3::exceptions::{PyKeyError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::config::CoreConfig;
use crate::editing::{apply_edit, MappingEdit};
use crate::error::CoreError;
use crate::logging::init_logger;
use crate::model::{generate_domain_key, DomainKey, PayloadMapping, ReturnMethodDraft, TrackingRule};
use crate::pipeline::{process_signal_json, BatchContext};
use crate::registry::{get_registry, get_registry_mut};
use crate::storage::queries;
use crate::validation::{validate_return_method, validate_rule, ValidationMode};

lazy_static! {
    static ref CONFIG: CoreConfig = CoreConfig::from_env();
}

fn to_py_err(err: CoreError) -> PyErr {
    match err.status() {
        404 => PyKeyError::new_err(err.to_string()),
        409 => PyRuntimeError::new_err(err.to_string()),
        _ => PyValueError::new_err(err.to_string()),
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(raw: &str) -> PyResult<T> {
    serde_json::from_str(raw).map_err(|e| to_py_err(CoreError::from(e)))
}

fn validation_dict<'py>(py: Python<'py>, outcome: Result<(), CoreError>) -> PyResult<&'py PyDict> {
    let dict = PyDict::new(py);
    match outcome {
        Ok(()) => {
            dict.set_item("valid", true)?;
        }
        Err(e) => {
            dict.set_item("valid", false)?;
            dict.set_item("status", e.status())?;
            dict.set_item("key", e.offending_key())?;
            dict.set_item("message", e.to_string())?;
        }
    }
    Ok(dict)
}

/// Evaluate a batch of captured signals against a domain's rules.
///
/// # Arguments
/// * `domain_key` - Domain the signals came from
/// * `rules_json` - JSON array of tracking rules for the domain
/// * `signals` - Captured signals (JSON serialized)
///
/// # Returns
/// Dict with batch counters and the emitted events as JSON strings
#[pyfunction]
fn process_signal_batch(
    py: Python<'_>,
    domain_key: String,
    rules_json: String,
    signals: Vec<String>,
) -> PyResult<Py<PyAny>> {
    init_logger();

    let rules: Vec<TrackingRule> = parse_json(&rules_json)?;
    let ctx = BatchContext::new(&domain_key, CONFIG.clone());

    log::info!(
        "BATCH_RECEIVED batch_id={} signals={} rules={}",
        ctx.batch_id,
        signals.len(),
        rules.len()
    );

    let result = process_signal_json(&ctx, &rules, &signals);

    let py_result = PyDict::new(py);
    py_result.set_item("batch_id", &ctx.batch_id)?;
    py_result.set_item("received_count", result.received_count)?;
    py_result.set_item("fired_count", result.fired_count)?;
    py_result.set_item("skipped_count", result.skipped_count)?;
    py_result.set_item("malformed_count", result.malformed_count)?;

    let events = PyList::empty(py);
    for event in &result.events {
        let raw = serde_json::to_string(event).map_err(|e| to_py_err(CoreError::from(e)))?;
        events.append(raw)?;
    }
    py_result.set_item("events", events)?;

    Ok(py_result.into())
}

/// Replace the registry with rows from the operators, patterns and
/// event_types tables.
#[pyfunction]
fn load_registry_from_db(
    operators: Vec<(i64, String)>,
    patterns: Vec<(i64, String)>,
    event_types: Vec<(i64, String)>,
) -> PyResult<()> {
    init_logger();
    get_registry_mut().load_from_db_rows(operators, patterns, event_types);
    Ok(())
}

/// (id, name) pairs of the loaded operators.
#[pyfunction]
fn get_registry_operators() -> PyResult<Vec<(i64, String)>> {
    Ok(get_registry()
        .operators()
        .into_iter()
        .map(|(id, op)| (id, op.as_str().to_string()))
        .collect())
}

/// (id, name, kind) triples of the loaded patterns.
#[pyfunction]
fn get_registry_patterns() -> PyResult<Vec<(i64, String, String)>> {
    Ok(get_registry()
        .patterns()
        .into_iter()
        .map(|p| (p.id, p.name.clone(), p.kind.as_str().to_string()))
        .collect())
}

#[pyfunction]
fn validate_rule_json(py: Python<'_>, rule_json: String) -> PyResult<Py<PyAny>> {
    init_logger();
    let rule: TrackingRule = parse_json(&rule_json)?;
    let outcome = validate_rule(&rule, &get_registry(), &CONFIG.anon_id_storage_key);
    Ok(validation_dict(py, outcome)?.into())
}

/// Validate a return method draft. `mode` is "create" or "update".
#[pyfunction]
#[pyo3(signature = (draft_json, mode="create".to_string()))]
fn validate_return_method_json(
    py: Python<'_>,
    draft_json: String,
    mode: String,
) -> PyResult<Py<PyAny>> {
    init_logger();
    let mode = match mode.as_str() {
        "create" => ValidationMode::Create,
        "update" => ValidationMode::Update,
        other => return Err(PyValueError::new_err(format!("unknown mode {}", other))),
    };
    let draft: ReturnMethodDraft = parse_json(&draft_json)?;
    let outcome = validate_return_method(&draft, &get_registry(), mode).map(|_| ());
    Ok(validation_dict(py, outcome)?.into())
}

/// Apply one edit to a mapping and return the new mapping as JSON.
#[pyfunction]
fn apply_mapping_edit(mapping_json: String, edit_json: String) -> PyResult<String> {
    let mapping: PayloadMapping = parse_json(&mapping_json)?;
    let edit: MappingEdit = parse_json(&edit_json)?;
    let next = apply_edit(&mapping, &edit, &CONFIG.anon_id_storage_key);
    serde_json::to_string(&next).map_err(|e| to_py_err(CoreError::from(e)))
}

/// Generate a domain key not present in `existing`.
#[pyfunction]
fn generate_domain_key_for(existing: Vec<String>) -> PyResult<String> {
    init_logger();
    let key = generate_domain_key(&CONFIG, |candidate: &DomainKey| {
        existing.iter().any(|k| k == candidate.as_str())
    })
    .map_err(to_py_err)?;
    Ok(key.to_string())
}

/// Named SQL statements for the persisted shape.
#[pyfunction]
fn get_sql_statements(py: Python<'_>) -> PyResult<Py<PyAny>> {
    let dict = PyDict::new(py);
    dict.set_item("rule_insert", queries::build_rule_insert())?;
    dict.set_item("rule_update", queries::build_rule_update())?;
    dict.set_item("rule_delete", queries::build_rule_delete())?;
    dict.set_item("rule_children_delete", queries::build_rule_children_delete().to_vec())?;
    dict.set_item("condition_insert", queries::build_condition_insert())?;
    dict.set_item("mapping_insert", queries::build_mapping_insert())?;
    dict.set_item("rules_by_domain", queries::build_rules_by_domain_select())?;
    dict.set_item("return_method_insert", queries::build_return_method_insert())?;
    dict.set_item("return_method_update", queries::build_return_method_update())?;
    dict.set_item("return_method_delete", queries::build_return_method_delete())?;
    dict.set_item("event_insert", queries::build_event_insert())?;
    dict.set_item("domain_insert", queries::build_domain_insert())?;
    dict.set_item("domain_key_exists", queries::build_domain_key_exists())?;
    Ok(dict.into())
}

/// Python module definition
#[pymodule]
fn recsys_tracker_core(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(process_signal_batch, m)?)?;
    m.add_function(wrap_pyfunction!(load_registry_from_db, m)?)?;
    m.add_function(wrap_pyfunction!(get_registry_operators, m)?)?;
    m.add_function(wrap_pyfunction!(get_registry_patterns, m)?)?;
    m.add_function(wrap_pyfunction!(validate_rule_json, m)?)?;
    m.add_function(wrap_pyfunction!(validate_return_method_json, m)?)?;
    m.add_function(wrap_pyfunction!(apply_mapping_edit, m)?)?;
    m.add_function(wrap_pyfunction!(generate_domain_key_for, m)?)?;
    m.add_function(wrap_pyfunction!(get_sql_statements, m)?)?;
    Ok(())
}
