//! Shared test harness for store collaborator testing
//!
//! Provides a [`Harness`] wiring a store into a `SearchEngine` and a
//! `RecordService`, fixtures for annotations and motivations, and the
//! `search_contract_tests!` macro.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//! ```

#![allow(dead_code)]

#[macro_use]
mod search_contract_tests;

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, Once};

use graph_search::collections::{Annotation, AnnotationCollection, Motivation, MotivationCollection};
use graph_search::config::EngineConfig;
use graph_search::core::iri::Iri;
use graph_search::core::service::{QueryExecutor, RecordStore, UuidIdGenerator};
use graph_search::records::RecordService;
use graph_search::search::{ExecutionMode, SearchEngine};

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

static TRACING: Once = Once::new();

/// Install a test subscriber once; `RUST_LOG` overrides the default filter
pub fn init_tracing() {
    TRACING.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("graph_search=debug"));
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_test_writer())
            .with(filter)
            .try_init();
    });
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A store wired into the engine and the lifecycle service
pub struct Harness<S> {
    pub config: EngineConfig,
    pub store: Arc<S>,
    pub engine: SearchEngine,
    pub records: RecordService,
}

/// Build a harness over `store` with the default test configuration
pub fn harness<S>(store: S, mode: ExecutionMode) -> Harness<S>
where
    S: QueryExecutor + RecordStore + 'static,
{
    init_tracing();

    let config = EngineConfig {
        execution: Some(mode),
        ..EngineConfig::default_config()
    };
    let store = Arc::new(store);
    let scopes = Arc::new(config.clone());

    let engine = SearchEngine::new(scopes.clone(), store.clone(), config.search_settings());
    let records = RecordService::new(scopes, store.clone(), Arc::new(UuidIdGenerator));

    Harness {
        config,
        store,
        engine,
        records,
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn iri(value: &str) -> Iri {
    Iri::parse(value).expect("valid test identifier")
}

/// Canonical form of a `test:` identifier
pub fn test_iri(local: &str) -> Iri {
    iri(&format!("http://opensilex.test/id/{}", local))
}

/// 2024-01-01T00:00:00Z plus `minutes`
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
}

/// An annotation with a fixed id, a describing motivation and a creation time
pub fn annotation(id: &str, description: &str, targets: &[&str], minutes: i64) -> Annotation {
    Annotation::new(
        description,
        iri("oa:describing"),
        targets.iter().map(|t| iri(t)).collect(),
    )
    .with_uri(iri(id))
    .with_created(at(minutes))
}

/// `n` annotations on `test:so1`, created one minute apart
pub fn sample_batch(n: usize) -> Vec<Annotation> {
    (0..n)
        .map(|i| {
            annotation(
                &format!("test:batch{:03}", i),
                &format!("note {}", i),
                &["test:so1"],
                i as i64,
            )
        })
        .collect()
}

pub fn motivation(id: &str, names: &[(&str, Option<&str>)]) -> Motivation {
    names
        .iter()
        .fold(Motivation::new(iri(id)), |m, (value, lang)| {
            m.with_name(*value, *lang)
        })
}

/// Store `annotations` through the lifecycle service
pub async fn seed_annotations<S>(harness: &Harness<S>, annotations: Vec<Annotation>) {
    harness
        .records
        .create_batch::<AnnotationCollection>(annotations)
        .await
        .expect("seed annotations");
}

pub async fn seed_motivations<S>(harness: &Harness<S>, motivations: Vec<Motivation>) {
    harness
        .records
        .create_batch::<MotivationCollection>(motivations)
        .await
        .expect("seed motivations");
}

// ---------------------------------------------------------------------------
// Assertions
// ---------------------------------------------------------------------------

/// Descriptions of a page of annotations, in page order
pub fn descriptions(items: &[Annotation]) -> Vec<&str> {
    items.iter().map(|a| a.description.as_str()).collect()
}

pub fn assert_count<T>(list: &[T], expected: usize) {
    assert_eq!(
        list.len(),
        expected,
        "Expected {} items, got {}",
        expected,
        list.len()
    );
}
