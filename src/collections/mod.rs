//! Searchable collections
//!
//! Each module declares one collection: its typed model, its criteria and
//! its ordering rules.

pub mod annotation;
pub mod motivation;

pub use annotation::{Annotation, AnnotationCollection, AnnotationCriterion};
pub use motivation::{Label, Motivation, MotivationCollection, MotivationCriterion};
