//! Collaborator traits for the store side
//!
//! The engine never talks to a concrete store. It resolves collection names
//! through a [`ScopeProvider`], runs composed queries through a
//! [`QueryExecutor`], writes through a [`RecordStore`] and mints identifiers
//! with an [`IdGenerator`].

use crate::core::error::{RecordFailure, StoreError, ValidationError};
use crate::core::iri::Iri;
use crate::core::record::EntityRecord;
use crate::core::scope::Scope;
use crate::search::compose::{CountQuery, DataQuery};
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Resolves a collection name to its queryable scope
pub trait ScopeProvider: Send + Sync {
    fn resolve(&self, collection: &str) -> Result<Scope, ValidationError>;
}

/// Executes composed queries
///
/// Implementations must return the data query's rows in the order the
/// query asks for, with at most `window().limit()` rows.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Rows of the data query
    async fn select(&self, query: &DataQuery) -> Result<Vec<EntityRecord>, StoreError>;

    /// Number of distinct records matching the count query
    async fn count(&self, query: &CountQuery) -> Result<u64, StoreError>;
}

/// Why a write was refused
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WriteError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The store refused some records; nothing was written
    #[error("{} record(s) rejected", .0.len())]
    Rejected(Vec<RecordFailure>),
}

/// Record-level persistence
///
/// Batch writes are all-or-nothing: when any record is refused the store
/// writes none of them and reports every refused record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert new records; an id already present is a conflict
    async fn insert(&self, scope: &Scope, records: &[EntityRecord]) -> Result<(), WriteError>;

    /// Replace the full attribute set of existing records; an unknown id is
    /// not found
    async fn replace(&self, scope: &Scope, records: &[EntityRecord]) -> Result<(), WriteError>;

    /// Remove a record and its relationship entries; `false` when absent
    async fn remove(&self, scope: &Scope, id: &Iri) -> Result<bool, StoreError>;

    async fn fetch(&self, scope: &Scope, id: &Iri) -> Result<Option<EntityRecord>, StoreError>;

    async fn contains(&self, scope: &Scope, id: &Iri) -> Result<bool, StoreError> {
        Ok(self.fetch(scope, id).await?.is_some())
    }
}

/// Assigns identifiers to records created without one
pub trait IdGenerator: Send + Sync {
    fn generate(&self, scope: &Scope) -> Iri;
}

/// `{graph}/id/{uuid v4}`
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self, scope: &Scope) -> Iri {
        scope.graph().join("id").join(&Uuid::new_v4().to_string())
    }
}
