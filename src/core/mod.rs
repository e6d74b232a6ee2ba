//! Core types shared by search and lifecycle operations

pub mod error;
pub mod field;
pub mod iri;
pub mod query;
pub mod record;
pub mod scope;
pub mod service;

pub use error::{EngineError, EngineResult};
pub use field::FieldValue;
pub use iri::{Iri, PrefixMap};
pub use query::{Criteria, Direction, OrderBy, Page, SearchRequest};
pub use record::{EntityRecord, FromRecord, IntoRecord};
pub use scope::Scope;
pub use service::{IdGenerator, QueryExecutor, RecordStore, ScopeProvider, UuidIdGenerator};
