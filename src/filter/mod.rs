//! # Historic Process Filter
//!
//! The immutable query-predicate tree describing which historic process
//! records a batch operates on: a closed set of simple field predicates,
//! nested OR-groups, and typed variable-value predicates.
//!
//! The tree itself carries no evaluation logic; the record-matching query
//! engine is a collaborator behind [`crate::process::HistoricProcessQueries`].
//! This module owns the shape and the JSON codec ([`codec`]).

pub mod codec;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use codec::{DefaultVariableTypeRegistry, VariableTypeRegistry};

/// Comparison operators accepted by variable-value predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableOperator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    LikeIgnoreCase,
    EqualsIgnoreCase,
    Exists,
    NotExists,
}

impl VariableOperator {
    /// Wire name of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableOperator::Equals => "EQUALS",
            VariableOperator::NotEquals => "NOT_EQUALS",
            VariableOperator::GreaterThan => "GREATER_THAN",
            VariableOperator::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            VariableOperator::LessThan => "LESS_THAN",
            VariableOperator::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            VariableOperator::Like => "LIKE",
            VariableOperator::LikeIgnoreCase => "LIKE_IGNORE_CASE",
            VariableOperator::EqualsIgnoreCase => "EQUALS_IGNORE_CASE",
            VariableOperator::Exists => "EXISTS",
            VariableOperator::NotExists => "NOT_EXISTS",
        }
    }

    /// Parse a wire operator name
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "EQUALS" => Some(VariableOperator::Equals),
            "NOT_EQUALS" => Some(VariableOperator::NotEquals),
            "GREATER_THAN" => Some(VariableOperator::GreaterThan),
            "GREATER_THAN_OR_EQUAL" => Some(VariableOperator::GreaterThanOrEqual),
            "LESS_THAN" => Some(VariableOperator::LessThan),
            "LESS_THAN_OR_EQUAL" => Some(VariableOperator::LessThanOrEqual),
            "LIKE" => Some(VariableOperator::Like),
            "LIKE_IGNORE_CASE" => Some(VariableOperator::LikeIgnoreCase),
            "EQUALS_IGNORE_CASE" => Some(VariableOperator::EqualsIgnoreCase),
            "EXISTS" => Some(VariableOperator::Exists),
            "NOT_EXISTS" => Some(VariableOperator::NotExists),
            _ => None,
        }
    }

    /// EXISTS/NOT_EXISTS test presence only and carry no typed value
    pub fn requires_value(&self) -> bool {
        !matches!(self, VariableOperator::Exists | VariableOperator::NotExists)
    }
}

/// A typed variable value, tagged for the codec's type registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum VariableValue {
    String(String),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Null,
}

impl VariableValue {
    /// Type tag the codec writes next to the raw value
    pub fn type_tag(&self) -> &'static str {
        match self {
            VariableValue::String(_) => "string",
            VariableValue::Long(_) => "long",
            VariableValue::Double(_) => "double",
            VariableValue::Boolean(_) => "boolean",
            VariableValue::Date(_) => "date",
            VariableValue::Null => "null",
        }
    }
}

/// One variable-value predicate. A `None` name matches any variable with
/// the given value and operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariablePredicate {
    pub name: Option<String>,
    pub operator: VariableOperator,
    pub value: Option<VariableValue>,
}

impl VariablePredicate {
    /// Named predicate with a typed value
    pub fn named(name: impl Into<String>, operator: VariableOperator, value: VariableValue) -> Self {
        Self {
            name: Some(name.into()),
            operator,
            value: Some(value),
        }
    }

    /// Presence test for a named variable
    pub fn exists(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            operator: VariableOperator::Exists,
            value: None,
        }
    }
}

/// Immutable predicate tree over historic process records.
///
/// All simple predicates are conjunctive; each entry of `or_groups` is a
/// nested filter whose own predicates are disjunctive with each other and
/// conjunctive with the outer tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricProcessFilter {
    pub process_definition_id: Option<String>,
    pub process_definition_key: Option<String>,
    pub business_key: Option<String>,
    pub deployment_id: Option<String>,
    pub tenant_id: Option<String>,
    pub finished: Option<bool>,
    pub started_before: Option<DateTime<Utc>>,
    pub started_after: Option<DateTime<Utc>>,
    pub finished_before: Option<DateTime<Utc>>,
    pub finished_after: Option<DateTime<Utc>>,
    pub or_groups: Vec<HistoricProcessFilter>,
    pub variables: Vec<VariablePredicate>,
}

impl HistoricProcessFilter {
    /// Empty filter matching every record
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process_definition_key(mut self, key: impl Into<String>) -> Self {
        self.process_definition_key = Some(key.into());
        self
    }

    pub fn with_business_key(mut self, key: impl Into<String>) -> Self {
        self.business_key = Some(key.into());
        self
    }

    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_finished(mut self, finished: bool) -> Self {
        self.finished = Some(finished);
        self
    }

    pub fn with_started_before(mut self, cutoff: DateTime<Utc>) -> Self {
        self.started_before = Some(cutoff);
        self
    }

    pub fn with_or_group(mut self, group: HistoricProcessFilter) -> Self {
        self.or_groups.push(group);
        self
    }

    pub fn with_variable(mut self, predicate: VariablePredicate) -> Self {
        self.variables.push(predicate);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_wire_names_round_trip() {
        for op in [
            VariableOperator::Equals,
            VariableOperator::NotEquals,
            VariableOperator::GreaterThan,
            VariableOperator::GreaterThanOrEqual,
            VariableOperator::LessThan,
            VariableOperator::LessThanOrEqual,
            VariableOperator::Like,
            VariableOperator::LikeIgnoreCase,
            VariableOperator::EqualsIgnoreCase,
            VariableOperator::Exists,
            VariableOperator::NotExists,
        ] {
            assert_eq!(VariableOperator::parse(op.as_str()), Some(op));
        }
        assert_eq!(VariableOperator::parse("BETWEEN"), None);
    }

    #[test]
    fn test_exists_operators_carry_no_value() {
        assert!(!VariableOperator::Exists.requires_value());
        assert!(!VariableOperator::NotExists.requires_value());
        assert!(VariableOperator::Like.requires_value());
    }

    #[test]
    fn test_builder_accumulates_predicates() {
        let filter = HistoricProcessFilter::new()
            .with_process_definition_key("invoice")
            .with_finished(true)
            .with_or_group(HistoricProcessFilter::new().with_business_key("ORD-1"))
            .with_variable(VariablePredicate::exists("approved"));

        assert_eq!(filter.process_definition_key.as_deref(), Some("invoice"));
        assert_eq!(filter.or_groups.len(), 1);
        assert_eq!(filter.variables.len(), 1);
    }
}
