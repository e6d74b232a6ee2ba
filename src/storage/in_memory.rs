//! In-memory graph store for testing and development
//!
//! Records live in named graphs. Single-valued attributes are kept on the
//! node; attributes the scope declares as relationships are kept as
//! separate edges, the way a triplestore holds them. Predicates are
//! evaluated with join semantics: each scoping node binds one edge value
//! that must satisfy all of its leaves.

use crate::core::error::{RecordFailure, RecordFailureKind, StoreError};
use crate::core::field::FieldValue;
use crate::core::iri::Iri;
use crate::core::query::Direction;
use crate::core::record::EntityRecord;
use crate::core::scope::Scope;
use crate::core::service::{QueryExecutor, RecordStore, WriteError};
use crate::search::compose::{CountQuery, DataQuery};
use crate::search::order::{OrderTerm, ValueExpr};
use crate::search::predicate::{Predicate, primary_subtag};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

const BACKEND: &str = "in-memory";

/// Store operations a failure can be injected into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Count,
    Read,
    Write,
}

#[derive(Debug, Clone)]
struct Node {
    rdf_type: Iri,
    attributes: IndexMap<String, Vec<FieldValue>>,
}

#[derive(Debug, Clone, PartialEq)]
struct Edge {
    graph: Iri,
    subject: Iri,
    relationship: String,
    object: FieldValue,
}

#[derive(Debug, Default)]
struct Graphs {
    /// (graph, id) → node
    nodes: BTreeMap<(Iri, Iri), Node>,
    edges: Vec<Edge>,
}

impl Graphs {
    /// Node attributes plus relationship edges of `id` in `graph`
    fn materialize(&self, graph: &Iri, id: &Iri) -> Option<EntityRecord> {
        let node = self.nodes.get(&(graph.clone(), id.clone()))?;
        let mut record = EntityRecord {
            id: Some(id.clone()),
            attributes: node.attributes.clone(),
        };
        for edge in self
            .edges
            .iter()
            .filter(|e| &e.graph == graph && &e.subject == id)
        {
            record.push(&edge.relationship, edge.object.clone());
        }
        Some(record)
    }

    /// Every record of a scope
    fn records<'a>(&'a self, scope: &'a Scope) -> impl Iterator<Item = EntityRecord> + 'a {
        self.nodes
            .iter()
            .filter(move |((graph, _), node)| {
                graph == scope.graph() && &node.rdf_type == scope.rdf_type()
            })
            .filter_map(move |((graph, id), _)| self.materialize(graph, id))
    }

    /// Values of `attribute` on the entity `id`, whatever graph holds it
    fn linked_values(&self, id: &Iri, attribute: &str) -> Vec<FieldValue> {
        let mut values = Vec::new();
        for (graph, node_id) in self.nodes.keys().filter(|(_, node_id)| node_id == id) {
            if let Some(record) = self.materialize(graph, node_id) {
                values.extend(record.values(attribute).iter().cloned());
            }
        }
        values
    }

    fn write(&mut self, scope: &Scope, record: &EntityRecord, id: &Iri) {
        let mut attributes = IndexMap::new();
        for (attribute, values) in &record.attributes {
            if scope.is_relationship(attribute) {
                for value in values {
                    self.edges.push(Edge {
                        graph: scope.graph().clone(),
                        subject: id.clone(),
                        relationship: attribute.clone(),
                        object: value.clone(),
                    });
                }
            } else {
                attributes.insert(attribute.clone(), values.clone());
            }
        }
        self.nodes.insert(
            (scope.graph().clone(), id.clone()),
            Node {
                rdf_type: scope.rdf_type().clone(),
                attributes,
            },
        );
    }

    fn drop_edges_of(&mut self, graph: &Iri, id: &Iri) {
        self.edges
            .retain(|e| !(&e.graph == graph && &e.subject == id));
    }
}

/// In-memory graph store
///
/// Clones share the same data, counters and injected failures.
#[derive(Clone, Default)]
pub struct InMemoryGraphStore {
    graphs: Arc<RwLock<Graphs>>,
    failures: Arc<RwLock<IndexMap<Operation, StoreError>>>,
    selects: Arc<AtomicUsize>,
    counts: Arc<AtomicUsize>,
}

impl InMemoryGraphStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `operation` fail with `error`
    pub fn fail_on(&self, operation: Operation, error: StoreError) {
        if let Ok(mut failures) = self.failures.write() {
            failures.insert(operation, error);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut failures) = self.failures.write() {
            failures.clear();
        }
    }

    /// Number of data queries served
    pub fn select_calls(&self) -> usize {
        self.selects.load(AtomicOrdering::SeqCst)
    }

    /// Number of count queries served
    pub fn count_calls(&self) -> usize {
        self.counts.load(AtomicOrdering::SeqCst)
    }

    /// Number of relationship edges held for `id`, as subject or object
    pub fn edge_count(&self, id: &Iri) -> usize {
        let object = FieldValue::Iri(id.clone());
        self.graphs
            .read()
            .map(|g| {
                g.edges
                    .iter()
                    .filter(|e| &e.subject == id || e.object == object)
                    .count()
            })
            .unwrap_or(0)
    }

    fn injected(&self, operation: Operation) -> Result<(), StoreError> {
        let failures = self.failures.read().map_err(lock_error)?;
        match failures.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Graphs>, StoreError> {
        self.graphs.read().map_err(lock_error)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Graphs>, StoreError> {
        self.graphs.write().map_err(lock_error)
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Connection {
        backend: BACKEND.to_string(),
        message: format!("Failed to acquire lock: {}", e),
    }
}

fn missing_id() -> StoreError {
    StoreError::Integrity {
        message: "record written without an identifier".to_string(),
    }
}

/// Whether a materialized record satisfies the predicate
fn satisfies(predicate: &Predicate, record: &EntityRecord) -> bool {
    let root = predicate
        .leaves()
        .iter()
        .all(|leaf| leaf.matches_values(record.values(&leaf.attribute)));

    // One binding per scoping node
    root && predicate.scopes().all(|node| {
        record
            .values(&node.relationship)
            .iter()
            .any(|value| node.leaves.iter().all(|leaf| leaf.matches(value)))
    })
}

fn same_language(value: &FieldValue, language: &str) -> bool {
    value
        .lang()
        .is_some_and(|lang| primary_subtag(lang) == primary_subtag(language))
}

/// Smallest value, case-folded when asked
fn smallest(values: impl Iterator<Item = FieldValue>, fold: bool) -> Option<FieldValue> {
    values
        .map(|v| if fold { v.case_folded() } else { v })
        .min_by(|a, b| a.sort_cmp(b))
}

fn sort_value(
    graphs: &Graphs,
    record: &EntityRecord,
    expr: &ValueExpr,
    predicate: &Predicate,
    language: Option<&str>,
    fold: bool,
) -> Option<FieldValue> {
    let linked = |via: &str, label: &str| -> Vec<FieldValue> {
        record
            .values(via)
            .iter()
            .filter_map(FieldValue::as_iri)
            .flat_map(|id| graphs.linked_values(id, label))
            .collect()
    };
    match expr {
        ValueExpr::Identifier => record.id.clone().map(FieldValue::Iri),
        // A scoped attribute only offers the values its scoping node binds
        ValueExpr::Attribute(attribute) => match predicate.scope_node(attribute) {
            Some(node) => smallest(
                record
                    .values(attribute)
                    .iter()
                    .filter(|v| node.leaves.iter().all(|leaf| leaf.matches(v)))
                    .cloned(),
                fold,
            ),
            None => smallest(record.values(attribute).iter().cloned(), fold),
        },
        ValueExpr::LocalizedLabel { via, label } => {
            let language = language?;
            smallest(
                linked(via, label)
                    .into_iter()
                    .filter(|v| same_language(v, language)),
                fold,
            )
        }
        ValueExpr::DefaultLabel { via, label } => smallest(
            linked(via, label)
                .into_iter()
                .filter(|v| v.as_text().is_some() && v.lang().is_none()),
            fold,
        ),
    }
}

/// First expression of the chain that yields a value
fn key_value(
    graphs: &Graphs,
    record: &EntityRecord,
    term: &OrderTerm,
    predicate: &Predicate,
    language: Option<&str>,
) -> Option<FieldValue> {
    term.key.chain.iter().find_map(|expr| {
        sort_value(
            graphs,
            record,
            expr,
            predicate,
            language,
            term.key.case_insensitive,
        )
    })
}

/// Unbound values sort lowest
fn compare_keys(a: &[Option<FieldValue>], b: &[Option<FieldValue>], order: &[OrderTerm]) -> Ordering {
    for ((a, b), term) in a.iter().zip(b).zip(order) {
        let ordering = match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.sort_cmp(b),
        };
        let ordering = match term.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl QueryExecutor for InMemoryGraphStore {
    async fn select(&self, query: &DataQuery) -> Result<Vec<EntityRecord>, StoreError> {
        self.selects.fetch_add(1, AtomicOrdering::SeqCst);
        self.injected(Operation::Select)?;
        let graphs = self.read()?;

        let mut keyed: Vec<(Vec<Option<FieldValue>>, EntityRecord)> = graphs
            .records(query.scope())
            .filter(|record| satisfies(query.predicate(), record))
            .map(|record| {
                let keys = query
                    .order()
                    .iter()
                    .map(|term| {
                        key_value(&graphs, &record, term, query.predicate(), query.language())
                    })
                    .collect();
                (keys, record)
            })
            .collect();
        keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, query.order()));

        let window = query.window();
        let rows = keyed
            .into_iter()
            .map(|(_, record)| record)
            .skip(window.offset() as usize);
        let rows: Vec<_> = match window.limit() {
            Some(limit) => rows.take(limit as usize).collect(),
            None => rows.collect(),
        };

        debug!(
            collection = query.scope().collection(),
            rows = rows.len(),
            "in-memory select"
        );
        Ok(rows)
    }

    async fn count(&self, query: &CountQuery) -> Result<u64, StoreError> {
        self.counts.fetch_add(1, AtomicOrdering::SeqCst);
        self.injected(Operation::Count)?;
        let graphs = self.read()?;
        let total = graphs
            .records(query.scope())
            .filter(|record| satisfies(query.predicate(), record))
            .count();
        Ok(total as u64)
    }
}

#[async_trait]
impl RecordStore for InMemoryGraphStore {
    async fn insert(&self, scope: &Scope, records: &[EntityRecord]) -> Result<(), WriteError> {
        self.injected(Operation::Write)?;
        let mut graphs = self.write()?;

        let mut seen = HashSet::new();
        let mut failures = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let id = record.id.as_ref().ok_or_else(missing_id)?;
            let taken = graphs
                .nodes
                .contains_key(&(scope.graph().clone(), id.clone()));
            if taken || !seen.insert(id.clone()) {
                failures.push(RecordFailure {
                    index,
                    id: Some(id.to_string()),
                    kind: RecordFailureKind::Conflict,
                });
            }
        }
        if !failures.is_empty() {
            warn!(
                collection = scope.collection(),
                rejected = failures.len(),
                "insert rejected"
            );
            return Err(WriteError::Rejected(failures));
        }

        for record in records {
            let id = record.id.as_ref().ok_or_else(missing_id)?;
            graphs.write(scope, record, id);
        }
        Ok(())
    }

    async fn replace(&self, scope: &Scope, records: &[EntityRecord]) -> Result<(), WriteError> {
        self.injected(Operation::Write)?;
        let mut graphs = self.write()?;

        let mut failures = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let id = record.id.as_ref().ok_or_else(missing_id)?;
            if !graphs
                .nodes
                .contains_key(&(scope.graph().clone(), id.clone()))
            {
                failures.push(RecordFailure {
                    index,
                    id: Some(id.to_string()),
                    kind: RecordFailureKind::NotFound,
                });
            }
        }
        if !failures.is_empty() {
            return Err(WriteError::Rejected(failures));
        }

        for record in records {
            let id = record.id.as_ref().ok_or_else(missing_id)?;
            graphs.drop_edges_of(scope.graph(), id);
            graphs.write(scope, record, id);
        }
        Ok(())
    }

    async fn remove(&self, scope: &Scope, id: &Iri) -> Result<bool, StoreError> {
        self.injected(Operation::Write)?;
        let mut graphs = self.write()?;

        if graphs
            .nodes
            .remove(&(scope.graph().clone(), id.clone()))
            .is_none()
        {
            return Ok(false);
        }

        graphs.drop_edges_of(scope.graph(), id);
        let object = FieldValue::Iri(id.clone());
        let before = graphs.edges.len();
        graphs.edges.retain(|e| e.object != object);
        debug!(
            collection = scope.collection(),
            id = %id,
            detached = before - graphs.edges.len(),
            "removed record"
        );
        Ok(true)
    }

    async fn fetch(&self, scope: &Scope, id: &Iri) -> Result<Option<EntityRecord>, StoreError> {
        self.injected(Operation::Read)?;
        let graphs = self.read()?;
        Ok(graphs.materialize(scope.graph(), id))
    }
}
