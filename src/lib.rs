//! # graph-search
//!
//! Filtered-search query composition over graph-structured stores.
//!
//! ## Features
//!
//! - **Shared scoping**: criteria on a multi-valued relationship bind to one
//!   scoping node, so joins never multiply or drop rows
//! - **Fallback ordering**: an order attribute can expand into a chain of
//!   computed values (localized label, else default label)
//! - **Consistent counts**: data and count queries are derived from one
//!   predicate value
//! - **Typed collections**: searchable criteria are enums checked at compile
//!   time
//! - **Configuration-Based**: collections, prefixes and page limits come from
//!   YAML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use graph_search::prelude::*;
//!
//! let config = EngineConfig::from_yaml_file("config/search.yaml")?;
//! let store = Arc::new(InMemoryGraphStore::new());
//! let engine = SearchEngine::new(Arc::new(config.clone()), store.clone(), config.search_settings());
//!
//! let request = SearchRequest::new()
//!     .criterion("target", "test:so1")
//!     .order_by(OrderBy::asc("motivation"))
//!     .page(0, 20)
//!     .language("fr");
//!
//! let page = engine.search::<AnnotationCollection>(&request).await?;
//! println!("{} of {}", page.items.len(), page.total_count);
//! ```

pub mod collections;
pub mod config;
pub mod core;
pub mod records;
pub mod search;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        error::{
            BatchError, ConfigError, ConflictError, EngineError, EngineResult, ErrorResponse,
            NotFoundError, StoreError, ValidationError,
        },
        field::FieldValue,
        iri::{Iri, PrefixMap},
        query::{Criteria, Direction, OrderBy, Page, SearchRequest},
        record::{EntityRecord, FromRecord, IntoRecord},
        scope::Scope,
        service::{IdGenerator, QueryExecutor, RecordStore, ScopeProvider, UuidIdGenerator},
    };

    // === Search ===
    pub use crate::search::{
        Collection, Criterion, CriterionSpec, ExecutionMode, MatchKind, SearchEngine,
        SearchSettings, SortRules,
    };

    // === Collections ===
    pub use crate::collections::{
        Annotation, AnnotationCollection, Motivation, MotivationCollection,
    };

    // === Lifecycle ===
    pub use crate::records::RecordService;

    // === Storage ===
    #[cfg(feature = "in-memory")]
    pub use crate::storage::InMemoryGraphStore;

    // === Config ===
    pub use crate::config::{CollectionConfig, EngineConfig, PaginationConfig};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use std::sync::Arc;
}
