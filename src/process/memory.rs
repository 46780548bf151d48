//! # In-Memory Historic Process Store
//!
//! Embedded implementation of both process collaborators over an in-memory
//! record set, including a filter evaluator. Backs the integration tests
//! (notably the codec round-trip selection property) and single-process
//! deployments without an external query engine.

use crate::error::{Result, SweeperError};
use crate::filter::{
    HistoricProcessFilter, VariableOperator, VariablePredicate, VariableValue,
};
use crate::process::{HistoricProcessDeleter, HistoricProcessQueries, HistoricProcessRecord};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Default)]
struct ProcessState {
    /// Insertion order doubles as the stable query order
    records: Vec<HistoricProcessRecord>,
    /// Ids whose deletion is forced to fail (test fault injection)
    failing_deletions: HashSet<String>,
    /// When set, every query fails with this message (test fault injection)
    query_failure: Option<String>,
}

/// Thread-safe in-memory record store implementing both collaborator seams
#[derive(Clone, Default)]
pub struct InMemoryProcessStore {
    state: Arc<Mutex<ProcessState>>,
}

impl InMemoryProcessStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: HistoricProcessRecord) {
        self.state.lock().records.push(record);
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    pub fn contains(&self, process_id: &str) -> bool {
        self.state.lock().records.iter().any(|r| r.id == process_id)
    }

    /// Ids of all remaining records, in storage order
    pub fn remaining_ids(&self) -> Vec<String> {
        self.state.lock().records.iter().map(|r| r.id.clone()).collect()
    }

    /// Force deletion of `process_id` to fail
    pub fn fail_deletion_of(&self, process_id: impl Into<String>) {
        self.state.lock().failing_deletions.insert(process_id.into());
    }

    /// Force all queries to fail with `message` until cleared with `None`
    pub fn set_query_failure(&self, message: Option<String>) {
        self.state.lock().query_failure = message;
    }

    /// Ids matching `filter`, unpaginated, in storage order
    pub fn matching_ids(&self, filter: &HistoricProcessFilter) -> Vec<String> {
        self.state
            .lock()
            .records
            .iter()
            .filter(|record| matches(record, filter))
            .map(|record| record.id.clone())
            .collect()
    }
}

#[async_trait]
impl HistoricProcessQueries for InMemoryProcessStore {
    async fn count_matching(&self, filter: &HistoricProcessFilter) -> Result<u64> {
        let state = self.state.lock();
        if let Some(message) = &state.query_failure {
            return Err(SweeperError::query_execution(message.clone()));
        }
        Ok(state.records.iter().filter(|r| matches(r, filter)).count() as u64)
    }

    async fn page_of_ids(
        &self,
        filter: &HistoricProcessFilter,
        first_result: u64,
        max_results: u64,
    ) -> Result<Vec<String>> {
        let state = self.state.lock();
        if let Some(message) = &state.query_failure {
            return Err(SweeperError::query_execution(message.clone()));
        }
        Ok(state
            .records
            .iter()
            .filter(|r| matches(r, filter))
            .skip(first_result as usize)
            .take(max_results as usize)
            .map(|r| r.id.clone())
            .collect())
    }
}

#[async_trait]
impl HistoricProcessDeleter for InMemoryProcessStore {
    async fn delete_by_id(&self, process_id: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.failing_deletions.contains(process_id) {
            return Err(SweeperError::store(
                "delete_by_id",
                format!("deletion of {process_id} rejected"),
            ));
        }
        let before = state.records.len();
        state.records.retain(|r| r.id != process_id);
        if state.records.len() == before {
            return Err(SweeperError::store(
                "delete_by_id",
                format!("record {process_id} not found"),
            ));
        }
        Ok(())
    }

    async fn delete_all(&self, process_ids: &[String]) -> Result<()> {
        let mut state = self.state.lock();
        // Bulk semantics: reject the whole operation before touching anything
        for process_id in process_ids {
            if state.failing_deletions.contains(process_id) {
                return Err(SweeperError::store(
                    "delete_all",
                    format!("deletion of {process_id} rejected"),
                ));
            }
        }
        let wanted: HashSet<&String> = process_ids.iter().collect();
        state.records.retain(|r| !wanted.contains(&r.id));
        Ok(())
    }
}

/// Conjunctive evaluation of a filter tree against one record. Each
/// or-group holds disjunctively over its own predicates and conjunctively
/// with the rest of the tree.
fn matches(record: &HistoricProcessRecord, filter: &HistoricProcessFilter) -> bool {
    if let Some(expected) = &filter.process_definition_id {
        if &record.process_definition_id != expected {
            return false;
        }
    }
    if let Some(expected) = &filter.process_definition_key {
        if &record.process_definition_key != expected {
            return false;
        }
    }
    if let Some(expected) = &filter.business_key {
        if record.business_key.as_ref() != Some(expected) {
            return false;
        }
    }
    if let Some(expected) = &filter.deployment_id {
        if record.deployment_id.as_ref() != Some(expected) {
            return false;
        }
    }
    if let Some(expected) = &filter.tenant_id {
        if record.tenant_id.as_ref() != Some(expected) {
            return false;
        }
    }
    if let Some(finished) = filter.finished {
        if record.finished() != finished {
            return false;
        }
    }
    if let Some(cutoff) = filter.started_before {
        if record.start_time >= cutoff {
            return false;
        }
    }
    if let Some(cutoff) = filter.started_after {
        if record.start_time <= cutoff {
            return false;
        }
    }
    if let Some(cutoff) = filter.finished_before {
        match record.end_time {
            Some(end) if end < cutoff => {}
            _ => return false,
        }
    }
    if let Some(cutoff) = filter.finished_after {
        match record.end_time {
            Some(end) if end > cutoff => {}
            _ => return false,
        }
    }
    if !filter
        .variables
        .iter()
        .all(|predicate| variable_matches(record, predicate))
    {
        return false;
    }
    filter
        .or_groups
        .iter()
        .all(|group| or_group_matches(record, group))
}

/// True if any single predicate of the group holds. A nested group inside
/// an or-group counts as one disjunct that must hold as a whole.
fn or_group_matches(record: &HistoricProcessRecord, group: &HistoricProcessFilter) -> bool {
    let singles = [
        group
            .process_definition_id
            .as_ref()
            .map(|v| &record.process_definition_id == v),
        group
            .process_definition_key
            .as_ref()
            .map(|v| &record.process_definition_key == v),
        group
            .business_key
            .as_ref()
            .map(|v| record.business_key.as_ref() == Some(v)),
        group
            .deployment_id
            .as_ref()
            .map(|v| record.deployment_id.as_ref() == Some(v)),
        group
            .tenant_id
            .as_ref()
            .map(|v| record.tenant_id.as_ref() == Some(v)),
        group.finished.map(|v| record.finished() == v),
        group.started_before.map(|v| record.start_time < v),
        group.started_after.map(|v| record.start_time > v),
        group
            .finished_before
            .map(|v| matches!(record.end_time, Some(end) if end < v)),
        group
            .finished_after
            .map(|v| matches!(record.end_time, Some(end) if end > v)),
    ];

    if singles.iter().flatten().any(|satisfied| *satisfied) {
        return true;
    }
    if group
        .variables
        .iter()
        .any(|predicate| variable_matches(record, predicate))
    {
        return true;
    }
    group.or_groups.iter().any(|nested| matches(record, nested))
}

fn variable_matches(record: &HistoricProcessRecord, predicate: &VariablePredicate) -> bool {
    match predicate.operator {
        VariableOperator::Exists => match &predicate.name {
            Some(name) => record.variables.contains_key(name),
            None => !record.variables.is_empty(),
        },
        VariableOperator::NotExists => match &predicate.name {
            Some(name) => !record.variables.contains_key(name),
            None => record.variables.is_empty(),
        },
        operator => {
            let Some(expected) = &predicate.value else {
                return false;
            };
            match &predicate.name {
                Some(name) => record
                    .variables
                    .get(name)
                    .is_some_and(|actual| value_matches(actual, operator, expected)),
                None => record
                    .variables
                    .values()
                    .any(|actual| value_matches(actual, operator, expected)),
            }
        }
    }
}

fn value_matches(actual: &VariableValue, operator: VariableOperator, expected: &VariableValue) -> bool {
    use std::cmp::Ordering;

    let ordering = match (actual, expected) {
        (VariableValue::String(a), VariableValue::String(b)) => match operator {
            VariableOperator::Like => return like_match(a, b, false),
            VariableOperator::LikeIgnoreCase => return like_match(a, b, true),
            VariableOperator::EqualsIgnoreCase => return a.eq_ignore_ascii_case(b),
            _ => a.cmp(b),
        },
        (VariableValue::Long(a), VariableValue::Long(b)) => a.cmp(b),
        (VariableValue::Double(a), VariableValue::Double(b)) => {
            match a.partial_cmp(b) {
                Some(ordering) => ordering,
                None => return false,
            }
        }
        (VariableValue::Boolean(a), VariableValue::Boolean(b)) => a.cmp(b),
        (VariableValue::Date(a), VariableValue::Date(b)) => a.cmp(b),
        (VariableValue::Null, VariableValue::Null) => Ordering::Equal,
        // Cross-type comparison never matches
        _ => return matches!(operator, VariableOperator::NotEquals),
    };

    match operator {
        VariableOperator::Equals => ordering == Ordering::Equal,
        VariableOperator::NotEquals => ordering != Ordering::Equal,
        VariableOperator::GreaterThan => ordering == Ordering::Greater,
        VariableOperator::GreaterThanOrEqual => ordering != Ordering::Less,
        VariableOperator::LessThan => ordering == Ordering::Less,
        VariableOperator::LessThanOrEqual => ordering != Ordering::Greater,
        // LIKE family handled above for strings; other types never match
        _ => false,
    }
}

/// SQL-style LIKE with `%` wildcards
fn like_match(value: &str, pattern: &str, ignore_case: bool) -> bool {
    let (value, pattern) = if ignore_case {
        (value.to_lowercase(), pattern.to_lowercase())
    } else {
        (value.to_string(), pattern.to_string())
    };

    let segments: Vec<&str> = pattern.split('%').collect();
    if segments.len() == 1 {
        return value == pattern;
    }

    let mut remainder = value.as_str();
    for (position, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if position == 0 {
            match remainder.strip_prefix(segment) {
                Some(rest) => remainder = rest,
                None => return false,
            }
        } else if position == segments.len() - 1 {
            return remainder.ends_with(segment);
        } else {
            match remainder.find(segment) {
                Some(found) => remainder = &remainder[found + segment.len()..],
                None => return false,
            }
        }
    }
    true
}
