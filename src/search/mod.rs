//! Filtered-search query composition
//!
//! A search flows through four stages:
//!
//! 1. [`predicate`] turns criteria into a conjunctive predicate scoped to the
//!    collection
//! 2. [`order`] resolves the requested ordering into sort keys
//! 3. [`compose`] derives the data query and the count query from one
//!    predicate
//! 4. [`execute`] runs both against a [`QueryExecutor`](crate::core::service::QueryExecutor)
//!    and assembles the page
//!
//! [`SearchEngine`] ties the stages together for a [`Collection`].

pub mod compose;
pub mod engine;
pub mod execute;
pub mod order;
pub mod predicate;
pub mod render;
pub mod schema;

pub use compose::{CountQuery, DataQuery, PageWindow, QueryPair};
pub use engine::{SearchEngine, SearchSettings};
pub use execute::{ExecutionMode, execute};
pub use order::{OrderTerm, OrderingResolver, SortKey, SortRules, ValueExpr};
pub use predicate::{Leaf, Operator, Predicate, PredicateBuilder, ScopeNode, build_predicate};
pub use schema::{Collection, Criterion, CriterionSpec, MatchKind};
