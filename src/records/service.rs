//! Create, update, delete and get-by-id for typed records
//!
//! Identifiers and identifier-valued attributes are normalized to their
//! canonical form before anything reaches the store. Batch operations
//! validate every record first and report all failures together.

use crate::core::error::{
    BatchError, ConflictError, EngineError, EngineResult, FieldValidationError, NotFoundError,
    RecordFailure, RecordFailureKind, StoreError, ValidationError,
};
use crate::core::field::FieldValue;
use crate::core::iri::Iri;
use crate::core::record::{EntityRecord, FromRecord, IntoRecord};
use crate::core::scope::Scope;
use crate::core::service::{IdGenerator, RecordStore, ScopeProvider, WriteError};
use crate::search::schema::Collection;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Lifecycle operations over a [`RecordStore`]
#[derive(Clone)]
pub struct RecordService {
    scopes: Arc<dyn ScopeProvider>,
    store: Arc<dyn RecordStore>,
    ids: Arc<dyn IdGenerator>,
}

impl RecordService {
    pub fn new(
        scopes: Arc<dyn ScopeProvider>,
        store: Arc<dyn RecordStore>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self { scopes, store, ids }
    }

    /// Create one record, assigning an identifier when it has none
    ///
    /// Fails with a conflict when the supplied identifier is taken.
    pub async fn create<C: Collection>(&self, record: C::Record) -> EngineResult<C::Record> {
        let scope = self.scopes.resolve(C::NAME)?;
        let record = self
            .prepare::<C>(&scope, record.into_record(), true)
            .map_err(ValidationError::FieldErrors)?;

        self.store
            .insert(&scope, std::slice::from_ref(&record))
            .await
            .map_err(|e| single_write_error(&scope, e))?;

        info!(collection = C::NAME, id = ?record.id_string(), "record created");
        Ok(C::Record::from_record(record)?)
    }

    /// Create several records at once; nothing is written unless all are valid
    /// and free
    pub async fn create_batch<C: Collection>(
        &self,
        records: Vec<C::Record>,
    ) -> EngineResult<Vec<C::Record>> {
        let scope = self.scopes.resolve(C::NAME)?;
        let prepared = self.prepare_batch::<C>(&scope, records, true)?;

        self.store
            .insert(&scope, &prepared)
            .await
            .map_err(|e| batch_write_error(&scope, prepared.len(), e))?;

        info!(collection = C::NAME, count = prepared.len(), "records created");
        typed::<C>(prepared)
    }

    /// Replace the full attribute set of an existing record
    pub async fn update<C: Collection>(&self, record: C::Record) -> EngineResult<C::Record> {
        let scope = self.scopes.resolve(C::NAME)?;
        let record = self
            .prepare::<C>(&scope, record.into_record(), false)
            .map_err(ValidationError::FieldErrors)?;

        self.store
            .replace(&scope, std::slice::from_ref(&record))
            .await
            .map_err(|e| single_write_error(&scope, e))?;

        info!(collection = C::NAME, id = ?record.id_string(), "record updated");
        Ok(C::Record::from_record(record)?)
    }

    pub async fn update_batch<C: Collection>(
        &self,
        records: Vec<C::Record>,
    ) -> EngineResult<Vec<C::Record>> {
        let scope = self.scopes.resolve(C::NAME)?;
        let prepared = self.prepare_batch::<C>(&scope, records, false)?;

        self.store
            .replace(&scope, &prepared)
            .await
            .map_err(|e| batch_write_error(&scope, prepared.len(), e))?;

        info!(collection = C::NAME, count = prepared.len(), "records updated");
        typed::<C>(prepared)
    }

    /// Delete a record and its relationship entries
    ///
    /// Deleting an unknown identifier is a no-op; returns whether a record
    /// was removed.
    pub async fn delete<C: Collection>(&self, id: &str) -> EngineResult<bool> {
        let scope = self.scopes.resolve(C::NAME)?;
        let id = scope.prefixes().expand(id)?;

        let removed = self
            .store
            .remove(&scope, &id)
            .await
            .inspect_err(|e| log_store_error(&scope, e))?;
        if removed {
            info!(collection = C::NAME, id = %id, "record deleted");
        } else {
            debug!(collection = C::NAME, id = %id, "nothing to delete");
        }
        Ok(removed)
    }

    /// Delete a record that must exist
    pub async fn delete_existing<C: Collection>(&self, id: &str) -> EngineResult<()> {
        if self.delete::<C>(id).await? {
            Ok(())
        } else {
            Err(NotFoundError::Record {
                collection: C::NAME.to_string(),
                id: id.to_string(),
            }
            .into())
        }
    }

    pub async fn get<C: Collection>(&self, id: &str) -> EngineResult<C::Record> {
        let scope = self.scopes.resolve(C::NAME)?;
        let iri = scope.prefixes().expand(id)?;

        let record = self
            .store
            .fetch(&scope, &iri)
            .await
            .inspect_err(|e| log_store_error(&scope, e))?
            .ok_or_else(|| NotFoundError::Record {
                collection: C::NAME.to_string(),
                id: iri.to_string(),
            })?;
        Ok(C::Record::from_record(record)?)
    }

    pub async fn exists<C: Collection>(&self, id: &str) -> EngineResult<bool> {
        let scope = self.scopes.resolve(C::NAME)?;
        let iri = scope.prefixes().expand(id)?;
        Ok(self
            .store
            .contains(&scope, &iri)
            .await
            .inspect_err(|e| log_store_error(&scope, e))?)
    }

    fn prepare_batch<C: Collection>(
        &self,
        scope: &Scope,
        records: Vec<C::Record>,
        create: bool,
    ) -> Result<Vec<EntityRecord>, BatchError> {
        let submitted = records.len();
        let mut prepared = Vec::with_capacity(submitted);
        let mut failures = Vec::new();

        for (index, record) in records.into_iter().enumerate() {
            let record = record.into_record();
            let id = record.id_string();
            match self.prepare::<C>(scope, record, create) {
                Ok(record) => prepared.push(record),
                Err(errors) => failures.push(RecordFailure {
                    index,
                    id,
                    kind: RecordFailureKind::Validation { errors },
                }),
            }
        }

        if failures.is_empty() {
            Ok(prepared)
        } else {
            Err(BatchError {
                submitted,
                failures,
            })
        }
    }

    /// Normalize identifiers, assign a new id on create, and validate
    fn prepare<C: Collection>(
        &self,
        scope: &Scope,
        mut record: EntityRecord,
        create: bool,
    ) -> Result<EntityRecord, Vec<FieldValidationError>> {
        let mut errors = Vec::new();

        record.id = match record.id.take() {
            Some(id) => match scope.prefixes().expand(id.as_str()) {
                Ok(id) => Some(id),
                Err(e) => {
                    errors.push(FieldValidationError::new("id", e.to_string()));
                    None
                }
            },
            None if create => Some(self.ids.generate(scope)),
            None => {
                errors.push(FieldValidationError::new(
                    "id",
                    "an identifier is required to update a record",
                ));
                None
            }
        };

        for (attribute, values) in record.attributes.iter_mut() {
            for value in values.iter_mut() {
                if let FieldValue::Iri(iri) = value {
                    match scope.prefixes().expand(iri.as_str()) {
                        Ok(expanded) => *iri = expanded,
                        Err(e) => errors.push(FieldValidationError::new(attribute, e.to_string())),
                    }
                }
            }
        }

        errors.extend(C::validate(&record));
        if errors.is_empty() {
            Ok(record)
        } else {
            Err(errors)
        }
    }
}

impl std::fmt::Debug for RecordService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordService").finish_non_exhaustive()
    }
}

fn typed<C: Collection>(records: Vec<EntityRecord>) -> EngineResult<Vec<C::Record>> {
    records
        .into_iter()
        .map(|r| C::Record::from_record(r).map_err(EngineError::from))
        .collect()
}

fn log_store_error(scope: &Scope, err: &StoreError) {
    error!(collection = scope.collection(), error = %err, "store operation failed");
}

/// A refused single-record write, as the matching typed error
fn single_write_error(scope: &Scope, err: WriteError) -> EngineError {
    match err {
        WriteError::Store(e) => {
            log_store_error(scope, &e);
            e.into()
        }
        WriteError::Rejected(mut failures) if failures.len() == 1 => {
            let failure = failures.remove(0);
            let collection = scope.collection().to_string();
            let id = failure.id.unwrap_or_default();
            match failure.kind {
                RecordFailureKind::Conflict => ConflictError::AlreadyExists { collection, id }.into(),
                RecordFailureKind::NotFound => NotFoundError::Record { collection, id }.into(),
                RecordFailureKind::Validation { errors } => ValidationError::FieldErrors(errors).into(),
            }
        }
        WriteError::Rejected(failures) => BatchError {
            submitted: 1,
            failures,
        }
        .into(),
    }
}

fn batch_write_error(scope: &Scope, submitted: usize, err: WriteError) -> EngineError {
    match err {
        WriteError::Store(e) => {
            log_store_error(scope, &e);
            e.into()
        }
        WriteError::Rejected(failures) => BatchError {
            submitted,
            failures,
        }
        .into(),
    }
}

/// Identifier of a record as a canonical [`Iri`], for callers holding a
/// compact form
pub fn canonical_id(scope: &Scope, id: &str) -> Result<Iri, ValidationError> {
    scope.prefixes().expand(id)
}
