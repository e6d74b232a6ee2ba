//! Macro-generated test suite for store collaborator contract validation.
//!
//! The `search_contract_tests!` macro generates a test module that runs the
//! engine and the lifecycle service against any store implementing
//! `QueryExecutor + RecordStore`.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//! use graph_search::storage::InMemoryGraphStore;
//!
//! search_contract_tests!(in_memory, InMemoryGraphStore::new(), ExecutionMode::Concurrent);
//! ```
//!
//! # Generated Tests
//!
//! ## Filtering
//! - `test_empty_filter_matches_count`: blank criteria behave like no criteria
//! - `test_shared_relationship_scope`: criteria on one relationship never
//!   duplicate a record
//! - `test_creator_and_target`: a record with two targets appears once
//! - `test_date_range`: inclusive start and end bounds
//! - `test_motivation_name_in_language`: name search restricted to a language
//!
//! ## Ordering
//! - `test_case_insensitive_order`: "alpha", "Beta", "Zeta"
//! - `test_localized_label_fallback`: localized label, else default label
//! - `test_order_uses_names_kept_by_language`: ordering sees only the names
//!   the language filter keeps
//! - `test_default_order`: newest first
//!
//! ## Pagination
//! - `test_page_arithmetic`: page sizes against the total
//! - `test_page_out_of_range`: empty page, true total
//! - `test_page_size_zero_returns_all`: every row, reported as page 0
//!
//! ## Lifecycle
//! - `test_lifecycle_round_trip`: create, get, update, delete
//! - `test_count_by_target`
//! - `test_concurrent_searches`

/// Generate the search contract suite for a store.
///
/// `$factory` is re-evaluated for each test to ensure isolation.
#[macro_export]
macro_rules! search_contract_tests {
    ($name:ident, $factory:expr, $mode:expr) => {
        mod $name {
            use super::*;
            use graph_search::collections::{AnnotationCollection, MotivationCollection};
            use graph_search::core::error::EngineError;
            use graph_search::core::query::{Criteria, OrderBy, SearchRequest};

            fn setup() -> Harness<impl graph_search::core::service::QueryExecutor
                + graph_search::core::service::RecordStore
                + 'static> {
                harness($factory, $mode)
            }

            // ==================================================================
            // Filtering
            // ==================================================================

            #[tokio::test]
            async fn test_empty_filter_matches_count() {
                let h = setup();
                seed_annotations(&h, sample_batch(7)).await;

                let blank = SearchRequest::new()
                    .criterion("description", "  ")
                    .criterion_opt("target", None);
                let page = h
                    .engine
                    .search::<AnnotationCollection>(&blank)
                    .await
                    .unwrap();
                let total = h
                    .engine
                    .count::<AnnotationCollection>(&Criteria::new())
                    .await
                    .unwrap();

                assert_eq!(total, 7);
                assert_eq!(page.total_count, total);
                assert_count(&page.items, 7);
            }

            #[tokio::test]
            async fn test_shared_relationship_scope() {
                let h = setup();
                seed_annotations(
                    &h,
                    vec![
                        annotation("test:a1", "pest", &["test:so1", "test:so2", "test:so3"], 1),
                        annotation("test:a2", "pest", &["test:so2"], 2),
                    ],
                )
                .await;

                let by_target = SearchRequest::new().criterion("target", "test:so2");
                let alone = h
                    .engine
                    .search::<AnnotationCollection>(&by_target)
                    .await
                    .unwrap();
                assert_eq!(alone.total_count, 2);

                let combined = by_target.clone().criterion("description", "PEST");
                let page = h
                    .engine
                    .search::<AnnotationCollection>(&combined)
                    .await
                    .unwrap();
                assert_eq!(page.total_count, alone.total_count);
                assert_count(&page.items, 2);
            }

            #[tokio::test]
            async fn test_creator_and_target() {
                let h = setup();
                seed_annotations(
                    &h,
                    vec![
                        annotation("test:a1", "both", &["test:t1", "test:t2"], 1)
                            .with_creator(iri("test:u1")),
                        annotation("test:a2", "other creator", &["test:t1"], 2)
                            .with_creator(iri("test:u2")),
                    ],
                )
                .await;

                let request = SearchRequest::new()
                    .criterion("author", "test:u1")
                    .criterion("target", "test:t1");
                let page = h
                    .engine
                    .search::<AnnotationCollection>(&request)
                    .await
                    .unwrap();

                assert_eq!(page.total_count, 1);
                assert_eq!(descriptions(&page.items), vec!["both"]);
                assert_eq!(page.items[0].uri, Some(test_iri("a1")));
            }

            #[tokio::test]
            async fn test_date_range() {
                let h = setup();
                seed_annotations(&h, sample_batch(10)).await;

                let start = at(3).to_rfc3339();
                let end = at(5).to_rfc3339();
                let request = SearchRequest::new()
                    .criterion("created_after", start.as_str())
                    .criterion("created_before", end.as_str());
                let page = h
                    .engine
                    .search::<AnnotationCollection>(&request)
                    .await
                    .unwrap();
                assert_eq!(descriptions(&page.items), vec!["note 5", "note 4", "note 3"]);

                let whole_day = SearchRequest::new().criterion("created_before", "2024-01-01");
                let page = h
                    .engine
                    .search::<AnnotationCollection>(&whole_day)
                    .await
                    .unwrap();
                assert_eq!(page.total_count, 10);
            }

            #[tokio::test]
            async fn test_motivation_name_in_language() {
                let h = setup();
                seed_motivations(
                    &h,
                    vec![motivation(
                        "oa:describing",
                        &[("describing", None), ("décrire", Some("fr"))],
                    )],
                )
                .await;

                let french = SearchRequest::new().criterion("name", "décr").language("fr");
                let page = h
                    .engine
                    .search::<MotivationCollection>(&french)
                    .await
                    .unwrap();
                assert_eq!(page.total_count, 1);

                let english = SearchRequest::new().criterion("name", "décr").language("en");
                let page = h
                    .engine
                    .search::<MotivationCollection>(&english)
                    .await
                    .unwrap();
                assert_eq!(page.total_count, 0);

                let untagged = SearchRequest::new().criterion("name", "describ").language("en");
                let page = h
                    .engine
                    .search::<MotivationCollection>(&untagged)
                    .await
                    .unwrap();
                assert_eq!(page.total_count, 1);
            }

            // ==================================================================
            // Ordering
            // ==================================================================

            #[tokio::test]
            async fn test_case_insensitive_order() {
                let h = setup();
                seed_motivations(
                    &h,
                    vec![
                        motivation("test:m1", &[("Zeta", None)]),
                        motivation("test:m2", &[("alpha", None)]),
                        motivation("test:m3", &[("Beta", None)]),
                    ],
                )
                .await;

                let request = SearchRequest::new().order_by(OrderBy::asc("name"));
                let page = h
                    .engine
                    .search::<MotivationCollection>(&request)
                    .await
                    .unwrap();
                let names: Vec<_> = page.items.iter().filter_map(|m| m.name(None)).collect();
                assert_eq!(names, vec!["alpha", "Beta", "Zeta"]);
            }

            #[tokio::test]
            async fn test_localized_label_fallback() {
                let h = setup();
                seed_motivations(
                    &h,
                    vec![
                        motivation("test:m_a", &[("Beta", None)]),
                        motivation("test:m_b", &[("zulu", None), ("Alpha", Some("fr"))]),
                    ],
                )
                .await;
                let mut with_a = annotation("test:ann_a", "a", &["test:so1"], 1);
                with_a.motivation = iri("test:m_a");
                let mut with_b = annotation("test:ann_b", "b", &["test:so1"], 2);
                with_b.motivation = iri("test:m_b");
                seed_annotations(&h, vec![with_a, with_b]).await;

                let search = |direction: OrderBy, language: Option<&str>| {
                    let mut request = SearchRequest::new().order_by(direction);
                    request.language = language.map(str::to_string);
                    request
                };

                let asc = h
                    .engine
                    .search::<AnnotationCollection>(&search(OrderBy::asc("motivation"), Some("fr")))
                    .await
                    .unwrap();
                assert_eq!(descriptions(&asc.items), vec!["b", "a"]);

                let desc = h
                    .engine
                    .search::<AnnotationCollection>(&search(OrderBy::desc("motivation"), Some("fr")))
                    .await
                    .unwrap();
                assert_eq!(descriptions(&desc.items), vec!["a", "b"]);

                let default_only = h
                    .engine
                    .search::<AnnotationCollection>(&search(OrderBy::asc("motivation"), None))
                    .await
                    .unwrap();
                assert_eq!(descriptions(&default_only.items), vec!["a", "b"]);
            }

            #[tokio::test]
            async fn test_order_uses_names_kept_by_language() {
                let h = setup();
                seed_motivations(
                    &h,
                    vec![
                        motivation("test:m1", &[("zeta", Some("fr")), ("alpha", Some("en"))]),
                        motivation("test:m2", &[("beta", Some("fr"))]),
                    ],
                )
                .await;

                let french = SearchRequest::new()
                    .order_by(OrderBy::asc("name"))
                    .language("fr");
                let page = h
                    .engine
                    .search::<MotivationCollection>(&french)
                    .await
                    .unwrap();
                let names: Vec<_> = page.items.iter().filter_map(|m| m.name(Some("fr"))).collect();
                assert_eq!(names, vec!["beta", "zeta"]);

                let english = SearchRequest::new()
                    .order_by(OrderBy::asc("name"))
                    .language("en");
                let page = h
                    .engine
                    .search::<MotivationCollection>(&english)
                    .await
                    .unwrap();
                assert_eq!(page.total_count, 1);
                assert_eq!(page.items[0].uri, Some(test_iri("m1")));
            }

            #[tokio::test]
            async fn test_default_order() {
                let h = setup();
                seed_annotations(&h, sample_batch(3)).await;
                let page = h
                    .engine
                    .search::<AnnotationCollection>(&SearchRequest::new())
                    .await
                    .unwrap();
                assert_eq!(descriptions(&page.items), vec!["note 2", "note 1", "note 0"]);
            }

            // ==================================================================
            // Pagination
            // ==================================================================

            #[tokio::test]
            async fn test_page_arithmetic() {
                let h = setup();
                seed_annotations(&h, sample_batch(23)).await;

                for size in [1_i64, 5, 10, 23, 30] {
                    for page in 0..4_i64 {
                        let request = SearchRequest::new().page(page, size);
                        let result = h
                            .engine
                            .search::<AnnotationCollection>(&request)
                            .await
                            .unwrap();
                        let expected = (23 - page * size).clamp(0, size) as usize;
                        assert_eq!(result.total_count, 23);
                        assert_eq!(
                            result.items.len(),
                            expected,
                            "page {} of size {}",
                            page,
                            size
                        );
                    }
                }
            }

            #[tokio::test]
            async fn test_page_out_of_range() {
                let h = setup();
                seed_annotations(&h, sample_batch(15)).await;

                let request = SearchRequest::new().page(2, 10);
                let page = h
                    .engine
                    .search::<AnnotationCollection>(&request)
                    .await
                    .unwrap();
                assert!(page.items.is_empty());
                assert_eq!(page.total_count, 15);
                assert!(page.is_out_of_range());
            }

            #[tokio::test]
            async fn test_page_size_zero_returns_all() {
                let h = setup();
                seed_annotations(&h, sample_batch(45)).await;

                let page = h
                    .engine
                    .search::<AnnotationCollection>(&SearchRequest::new().page(0, 0))
                    .await
                    .unwrap();
                assert_count(&page.items, 45);
                assert_eq!(page.page_size, 0);
                assert_eq!(page.total_pages(), 1);

                let later_page = h
                    .engine
                    .search::<AnnotationCollection>(&SearchRequest::new().page(3, 0))
                    .await
                    .unwrap();
                assert_count(&later_page.items, 45);
                assert_eq!(later_page.page, 0);
                assert!(!later_page.has_prev());
                assert!(!later_page.has_next());

                let default = h
                    .engine
                    .search::<AnnotationCollection>(&SearchRequest::new())
                    .await
                    .unwrap();
                assert_count(&default.items, 20);
                assert!(default.has_next());
            }

            // ==================================================================
            // Lifecycle
            // ==================================================================

            #[tokio::test]
            async fn test_lifecycle_round_trip() {
                let h = setup();
                let created = h
                    .records
                    .create::<AnnotationCollection>(annotation("test:a1", "first", &["test:so1"], 1))
                    .await
                    .unwrap();
                assert_eq!(created.uri, Some(test_iri("a1")));

                let mut changed = created.clone();
                changed.description = "second".to_string();
                changed.targets = vec![iri("test:so9")];
                h.records
                    .update::<AnnotationCollection>(changed)
                    .await
                    .unwrap();

                let fetched = h.records.get::<AnnotationCollection>("test:a1").await.unwrap();
                assert_eq!(fetched.description, "second");
                assert_eq!(fetched.targets, vec![test_iri("so9")]);

                let old_target = SearchRequest::new().criterion("target", "test:so1");
                let page = h
                    .engine
                    .search::<AnnotationCollection>(&old_target)
                    .await
                    .unwrap();
                assert_eq!(page.total_count, 0);

                assert!(h.records.delete::<AnnotationCollection>("test:a1").await.unwrap());
                let err = h
                    .records
                    .get::<AnnotationCollection>("test:a1")
                    .await
                    .unwrap_err();
                assert!(matches!(err, EngineError::NotFound(_)));
                assert!(!h.records.delete::<AnnotationCollection>("test:a1").await.unwrap());
            }

            #[tokio::test]
            async fn test_count_by_target() {
                let h = setup();
                seed_annotations(
                    &h,
                    vec![
                        annotation("test:a1", "x", &["test:so1", "test:so2"], 1),
                        annotation("test:a2", "y", &["test:so2"], 2),
                        annotation("test:a3", "z", &["test:so3"], 3),
                    ],
                )
                .await;

                let mut criteria = Criteria::new();
                criteria.insert("target".to_string(), Some("test:so2".to_string()));
                let total = h
                    .engine
                    .count::<AnnotationCollection>(&criteria)
                    .await
                    .unwrap();
                assert_eq!(total, 2);
            }

            #[tokio::test]
            async fn test_concurrent_searches() {
                let h = setup();
                seed_annotations(&h, sample_batch(30)).await;

                let handles: Vec<_> = (0..8_i64)
                    .map(|page| {
                        let engine = h.engine.clone();
                        tokio::spawn(async move {
                            engine
                                .search::<AnnotationCollection>(&SearchRequest::new().page(page % 4, 10))
                                .await
                                .map(|p| (page % 4, p.items.len(), p.total_count))
                        })
                    })
                    .collect();

                for handle in handles {
                    let (page, len, total) = handle.await.unwrap().unwrap();
                    assert_eq!(total, 30);
                    assert_eq!(len, if page < 3 { 10 } else { 0 });
                }
            }
        }
    };
}
