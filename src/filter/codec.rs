//! # Filter JSON Codec
//!
//! Serializes [`HistoricProcessFilter`] trees to and from the generic JSON
//! document persisted inside a batch configuration snapshot.
//!
//! The document is a closed, versioned schema, not an open property bag:
//! decoding rejects any property name outside the known set with
//! [`SweeperError::UnsupportedPredicate`]. Variable values carry an explicit
//! `type` tag resolved through a pluggable [`VariableTypeRegistry`].

use crate::error::{Result, SweeperError};
use crate::filter::{HistoricProcessFilter, VariableOperator, VariablePredicate, VariableValue};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

const PROCESS_DEFINITION_ID: &str = "processDefinitionId";
const PROCESS_DEFINITION_KEY: &str = "processDefinitionKey";
const BUSINESS_KEY: &str = "businessKey";
const DEPLOYMENT_ID: &str = "deploymentId";
const TENANT_ID: &str = "tenantId";
const FINISHED: &str = "finished";
const STARTED_BEFORE: &str = "startedBefore";
const STARTED_AFTER: &str = "startedAfter";
const FINISHED_BEFORE: &str = "finishedBefore";
const FINISHED_AFTER: &str = "finishedAfter";
const OR_GROUPS: &str = "orGroups";
const VARIABLES: &str = "variables";

const VARIABLE_NAME: &str = "name";
const VARIABLE_OPERATOR: &str = "operator";
const VARIABLE_TYPE: &str = "type";
const VARIABLE_VALUE: &str = "value";

/// Resolves variable `type` tags to typed values during decoding.
///
/// The default registry covers the engine's built-in variable types; an
/// embedding application can supply its own to add custom types.
pub trait VariableTypeRegistry: Send + Sync {
    /// Decode a raw JSON value according to its type tag
    fn decode_value(&self, type_tag: &str, raw: &Value) -> Result<VariableValue>;
}

/// Built-in variable types: string, long, double, boolean, date, null
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultVariableTypeRegistry;

impl VariableTypeRegistry for DefaultVariableTypeRegistry {
    fn decode_value(&self, type_tag: &str, raw: &Value) -> Result<VariableValue> {
        match type_tag {
            "string" => raw
                .as_str()
                .map(|s| VariableValue::String(s.to_string()))
                .ok_or_else(|| type_mismatch(type_tag, raw)),
            "long" => raw
                .as_i64()
                .map(VariableValue::Long)
                .ok_or_else(|| type_mismatch(type_tag, raw)),
            "double" => raw
                .as_f64()
                .map(VariableValue::Double)
                .ok_or_else(|| type_mismatch(type_tag, raw)),
            "boolean" => raw
                .as_bool()
                .map(VariableValue::Boolean)
                .ok_or_else(|| type_mismatch(type_tag, raw)),
            "date" => parse_datetime(raw).map(VariableValue::Date),
            "null" => match raw {
                Value::Null => Ok(VariableValue::Null),
                other => Err(type_mismatch(type_tag, other)),
            },
            other => Err(SweeperError::configuration(format!(
                "unknown variable type tag '{other}'"
            ))),
        }
    }
}

fn type_mismatch(type_tag: &str, raw: &Value) -> SweeperError {
    SweeperError::configuration(format!(
        "variable value {raw} does not match declared type '{type_tag}'"
    ))
}

/// Encode a filter tree into its JSON document
pub fn encode(filter: &HistoricProcessFilter) -> Value {
    let mut doc = Map::new();

    put_string(&mut doc, PROCESS_DEFINITION_ID, &filter.process_definition_id);
    put_string(&mut doc, PROCESS_DEFINITION_KEY, &filter.process_definition_key);
    put_string(&mut doc, BUSINESS_KEY, &filter.business_key);
    put_string(&mut doc, DEPLOYMENT_ID, &filter.deployment_id);
    put_string(&mut doc, TENANT_ID, &filter.tenant_id);

    if let Some(finished) = filter.finished {
        doc.insert(FINISHED.to_string(), Value::Bool(finished));
    }

    put_datetime(&mut doc, STARTED_BEFORE, &filter.started_before);
    put_datetime(&mut doc, STARTED_AFTER, &filter.started_after);
    put_datetime(&mut doc, FINISHED_BEFORE, &filter.finished_before);
    put_datetime(&mut doc, FINISHED_AFTER, &filter.finished_after);

    if !filter.or_groups.is_empty() {
        let groups: Vec<Value> = filter.or_groups.iter().map(encode).collect();
        doc.insert(OR_GROUPS.to_string(), Value::Array(groups));
    }

    if !filter.variables.is_empty() {
        let variables: Vec<Value> = filter.variables.iter().map(encode_variable).collect();
        doc.insert(VARIABLES.to_string(), Value::Array(variables));
    }

    Value::Object(doc)
}

fn encode_variable(predicate: &VariablePredicate) -> Value {
    let mut doc = Map::new();
    if let Some(name) = &predicate.name {
        doc.insert(VARIABLE_NAME.to_string(), json!(name));
    }
    doc.insert(
        VARIABLE_OPERATOR.to_string(),
        json!(predicate.operator.as_str()),
    );
    if let Some(value) = &predicate.value {
        doc.insert(VARIABLE_TYPE.to_string(), json!(value.type_tag()));
        doc.insert(VARIABLE_VALUE.to_string(), encode_variable_value(value));
    }
    Value::Object(doc)
}

fn encode_variable_value(value: &VariableValue) -> Value {
    match value {
        VariableValue::String(s) => json!(s),
        VariableValue::Long(n) => json!(n),
        VariableValue::Double(d) => json!(d),
        VariableValue::Boolean(b) => json!(b),
        VariableValue::Date(dt) => json!(dt.to_rfc3339()),
        VariableValue::Null => Value::Null,
    }
}

/// Decode a filter document using the built-in variable types
pub fn decode(doc: &Value) -> Result<HistoricProcessFilter> {
    decode_with_registry(doc, &DefaultVariableTypeRegistry)
}

/// Decode a filter document resolving variable types through `registry`
pub fn decode_with_registry(
    doc: &Value,
    registry: &dyn VariableTypeRegistry,
) -> Result<HistoricProcessFilter> {
    let object = doc
        .as_object()
        .ok_or_else(|| SweeperError::configuration("filter document must be a JSON object"))?;

    let mut filter = HistoricProcessFilter::new();

    for (key, value) in object {
        match key.as_str() {
            PROCESS_DEFINITION_ID => filter.process_definition_id = Some(expect_string(key, value)?),
            PROCESS_DEFINITION_KEY => {
                filter.process_definition_key = Some(expect_string(key, value)?)
            }
            BUSINESS_KEY => filter.business_key = Some(expect_string(key, value)?),
            DEPLOYMENT_ID => filter.deployment_id = Some(expect_string(key, value)?),
            TENANT_ID => filter.tenant_id = Some(expect_string(key, value)?),
            FINISHED => {
                filter.finished = Some(value.as_bool().ok_or_else(|| {
                    SweeperError::configuration(format!("property '{key}' must be a boolean"))
                })?)
            }
            STARTED_BEFORE => filter.started_before = Some(parse_datetime(value)?),
            STARTED_AFTER => filter.started_after = Some(parse_datetime(value)?),
            FINISHED_BEFORE => filter.finished_before = Some(parse_datetime(value)?),
            FINISHED_AFTER => filter.finished_after = Some(parse_datetime(value)?),
            OR_GROUPS => {
                let groups = expect_array(key, value)?;
                filter.or_groups = groups
                    .iter()
                    .map(|group| decode_with_registry(group, registry))
                    .collect::<Result<Vec<_>>>()?;
            }
            VARIABLES => {
                let variables = expect_array(key, value)?;
                filter.variables = variables
                    .iter()
                    .map(|variable| decode_variable(variable, registry))
                    .collect::<Result<Vec<_>>>()?;
            }
            unknown => return Err(SweeperError::unsupported_predicate(unknown)),
        }
    }

    Ok(filter)
}

fn decode_variable(
    doc: &Value,
    registry: &dyn VariableTypeRegistry,
) -> Result<VariablePredicate> {
    let object = doc
        .as_object()
        .ok_or_else(|| SweeperError::configuration("variable predicate must be a JSON object"))?;

    let mut name = None;
    let mut operator = None;
    let mut type_tag = None;
    let mut raw_value = None;

    for (key, value) in object {
        match key.as_str() {
            VARIABLE_NAME => name = Some(expect_string(key, value)?),
            VARIABLE_OPERATOR => {
                let raw = expect_string(key, value)?;
                operator = Some(VariableOperator::parse(&raw).ok_or_else(|| {
                    SweeperError::configuration(format!("unknown variable operator '{raw}'"))
                })?);
            }
            VARIABLE_TYPE => type_tag = Some(expect_string(key, value)?),
            VARIABLE_VALUE => raw_value = Some(value),
            unknown => return Err(SweeperError::unsupported_predicate(unknown)),
        }
    }

    let operator = operator
        .ok_or_else(|| SweeperError::configuration("variable predicate is missing an operator"))?;

    let value = if operator.requires_value() {
        let type_tag = type_tag.ok_or_else(|| {
            SweeperError::configuration(format!(
                "variable predicate with operator {} is missing a value type",
                operator.as_str()
            ))
        })?;
        let raw = raw_value.ok_or_else(|| {
            SweeperError::configuration(format!(
                "variable predicate with operator {} is missing a value",
                operator.as_str()
            ))
        })?;
        Some(registry.decode_value(&type_tag, raw)?)
    } else {
        None
    };

    Ok(VariablePredicate {
        name,
        operator,
        value,
    })
}

fn put_string(doc: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        doc.insert(key.to_string(), json!(value));
    }
}

fn put_datetime(doc: &mut Map<String, Value>, key: &str, value: &Option<DateTime<Utc>>) {
    if let Some(value) = value {
        doc.insert(key.to_string(), json!(value.to_rfc3339()));
    }
}

fn expect_string(key: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SweeperError::configuration(format!("property '{key}' must be a string")))
}

fn expect_array<'a>(key: &str, value: &'a Value) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| SweeperError::configuration(format!("property '{key}' must be an array")))
}

fn parse_datetime(value: &Value) -> Result<DateTime<Utc>> {
    let raw = value.as_str().ok_or_else(|| {
        SweeperError::configuration(format!("expected an RFC 3339 timestamp, got {value}"))
    })?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SweeperError::configuration(format!("invalid timestamp '{raw}': {e}")))
}
