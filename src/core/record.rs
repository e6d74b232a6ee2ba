//! The generic resource handled by search and lifecycle operations

use crate::core::error::StoreError;
use crate::core::field::FieldValue;
use crate::core::iri::Iri;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A resource with an immutable identifier and typed, possibly multi-valued
/// attributes.
///
/// The identifier is `None` until the record is created; the store side
/// assigns one when the caller did not. Attribute insertion order is kept so
/// that rows read back from a store look like the records written to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: Option<Iri>,
    #[serde(default)]
    pub attributes: IndexMap<String, Vec<FieldValue>>,
}

impl EntityRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: Iri) -> Self {
        Self {
            id: Some(id),
            attributes: IndexMap::new(),
        }
    }

    /// Builder-style single value setter (replaces previous values)
    pub fn set(mut self, attribute: &str, value: impl Into<FieldValue>) -> Self {
        self.attributes
            .insert(attribute.to_string(), vec![value.into()]);
        self
    }

    /// Builder-style multi-value setter (replaces previous values)
    pub fn set_all(mut self, attribute: &str, values: Vec<FieldValue>) -> Self {
        self.attributes.insert(attribute.to_string(), values);
        self
    }

    /// Append one value to a multi-valued attribute
    pub fn push(&mut self, attribute: &str, value: impl Into<FieldValue>) {
        self.attributes
            .entry(attribute.to_string())
            .or_default()
            .push(value.into());
    }

    pub fn values(&self, attribute: &str) -> &[FieldValue] {
        self.attributes
            .get(attribute)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn first(&self, attribute: &str) -> Option<&FieldValue> {
        self.values(attribute).first()
    }

    pub fn has(&self, attribute: &str) -> bool {
        !self.values(attribute).is_empty()
    }

    /// The identifier as a string, for error reporting
    pub fn id_string(&self) -> Option<String> {
        self.id.as_ref().map(Iri::to_string)
    }
}

/// Conversion from a raw store row into a typed model
pub trait FromRecord: Sized + Send {
    fn from_record(record: EntityRecord) -> Result<Self, StoreError>;
}

impl FromRecord for EntityRecord {
    fn from_record(record: EntityRecord) -> Result<Self, StoreError> {
        Ok(record)
    }
}

/// Conversion from a typed model into a record for lifecycle operations
pub trait IntoRecord {
    fn into_record(self) -> EntityRecord;
}

impl IntoRecord for EntityRecord {
    fn into_record(self) -> EntityRecord {
        self
    }
}

/// Helper for [`FromRecord`] implementations: a required single value
pub(crate) fn required<'a>(
    record: &'a EntityRecord,
    attribute: &str,
) -> Result<&'a FieldValue, StoreError> {
    record.first(attribute).ok_or_else(|| StoreError::Mapping {
        id: record.id_string().unwrap_or_default(),
        message: format!("missing attribute '{}'", attribute),
    })
}
