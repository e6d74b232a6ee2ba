//! Queryable scope of a collection

use crate::core::iri::{Iri, PrefixMap};
use std::sync::Arc;

/// A named collection resolved to the graph that holds it
///
/// Scopes are immutable handles: building predicates or queries against a
/// scope never changes it, so one scope can serve concurrent searches.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    collection: String,
    graph: Iri,
    rdf_type: Iri,
    relationships: Arc<[String]>,
    default_page_size: usize,
    prefixes: Arc<PrefixMap>,
}

impl Scope {
    pub fn new(
        collection: impl Into<String>,
        graph: Iri,
        rdf_type: Iri,
        relationships: Vec<String>,
        default_page_size: usize,
        prefixes: Arc<PrefixMap>,
    ) -> Self {
        Self {
            collection: collection.into(),
            graph,
            rdf_type,
            relationships: relationships.into(),
            default_page_size,
            prefixes,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn graph(&self) -> &Iri {
        &self.graph
    }

    pub fn rdf_type(&self) -> &Iri {
        &self.rdf_type
    }

    /// Multi-valued attributes stored as separate relationship entries
    pub fn relationships(&self) -> &[String] {
        &self.relationships
    }

    pub fn is_relationship(&self, attribute: &str) -> bool {
        self.relationships.iter().any(|r| r == attribute)
    }

    pub fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    pub fn prefixes(&self) -> &PrefixMap {
        &self.prefixes
    }
}
