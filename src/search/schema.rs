//! Compile-time registry of searchable collections
//!
//! Each collection declares its criteria as an enum. Request criterion names
//! are mapped onto that enum by an explicit `match`, so an attribute that is
//! not searchable can never reach the query builder.

use crate::core::error::FieldValidationError;
use crate::core::query::OrderBy;
use crate::core::record::{EntityRecord, FromRecord, IntoRecord};
use crate::search::order::SortRules;
use std::fmt::Debug;
use std::hash::Hash;

/// How a criterion value is matched against its attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Case-insensitive regular expression, matching anywhere in the value
    Contains,
    /// Exact equality after expanding the identifier to its canonical form
    Identifier,
    /// Inclusive lower date bound
    DateFrom,
    /// Inclusive upper date bound
    DateTo,
    /// `true` or `false`: the attribute has at least one value, or none
    Presence,
}

/// What a criterion filters on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriterionSpec {
    pub attribute: &'static str,
    pub kind: MatchKind,
}

impl CriterionSpec {
    pub const fn new(attribute: &'static str, kind: MatchKind) -> Self {
        Self { attribute, kind }
    }
}

/// A searchable criterion of one collection
pub trait Criterion: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Map a request criterion name to the criterion, if searchable
    fn parse(name: &str) -> Option<Self>;

    /// The request-facing name
    fn name(&self) -> &'static str;

    fn spec(&self) -> CriterionSpec;
}

/// A searchable collection
///
/// # Example
/// ```rust,ignore
/// pub struct NoteCollection;
///
/// impl Collection for NoteCollection {
///     const NAME: &'static str = "notes";
///     type Criterion = NoteCriterion;
///     type Record = EntityRecord;
///
///     fn default_order() -> Vec<OrderBy> {
///         vec![OrderBy::asc("title")]
///     }
/// }
/// ```
pub trait Collection: Send + Sync + 'static {
    /// Collection name resolved by the scope provider
    const NAME: &'static str;

    type Criterion: Criterion;

    /// Typed model returned by searches and lifecycle operations
    type Record: FromRecord + IntoRecord + Clone + Send + Sync;

    /// Ordering used when the request specifies none
    fn default_order() -> Vec<OrderBy>;

    /// Attributes whose sort value is computed from other expressions
    fn sort_rules() -> SortRules {
        SortRules::new()
    }

    /// Textual attributes sort case-insensitively unless listed here
    fn case_sensitive(_attribute: &str) -> bool {
        false
    }

    /// Multi-valued label attribute restricted to the request language
    /// (or untagged values) when a language is supplied
    fn language_attribute() -> Option<&'static str> {
        None
    }

    /// Check a record before it is written
    fn validate(_record: &EntityRecord) -> Vec<FieldValidationError> {
        Vec::new()
    }
}
