//! Paginated execution and result assembly

use crate::core::error::StoreError;
use crate::core::query::Page;
use crate::core::record::FromRecord;
use crate::core::service::QueryExecutor;
use crate::search::compose::QueryPair;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// How the two queries of a search are dispatched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Count and data queries run concurrently
    #[default]
    Concurrent,
    /// Count first; the data query is skipped when the total is zero or the
    /// window starts past it
    CountFirst,
}

/// Run a composed pair and assemble the page
///
/// Store failures are logged with the rendered query and returned as-is;
/// they are never turned into an empty page. Rows are kept in store order.
pub async fn execute<T: FromRecord>(
    executor: &dyn QueryExecutor,
    pair: &QueryPair,
    mode: ExecutionMode,
) -> Result<Page<T>, StoreError> {
    let data = pair.data();
    let window = data.window();
    let collection = data.scope().collection();

    debug!(
        collection,
        ?mode,
        page = window.page(),
        page_size = window.page_size(),
        offset = window.offset(),
        "executing search"
    );

    let (rows, total) = match mode {
        ExecutionMode::Concurrent => {
            let (rows, total) = futures::join!(executor.select(data), executor.count(pair.count()));
            let total = total.inspect_err(|e| log_count_failure(pair, e))?;
            let rows = rows.inspect_err(|e| log_select_failure(pair, e))?;
            (rows, total)
        }
        ExecutionMode::CountFirst => {
            let total = executor
                .count(pair.count())
                .await
                .inspect_err(|e| log_count_failure(pair, e))?;
            if total == 0 || window.starts_after(total) {
                debug!(collection, total, "no rows in window, data query skipped");
                return Ok(Page::empty(total, window.page(), window.page_size()));
            }
            let rows = executor
                .select(data)
                .await
                .inspect_err(|e| log_select_failure(pair, e))?;
            (rows, total)
        }
    };

    let mut rows = rows;
    if let Some(limit) = window.limit()
        && rows.len() as u64 > limit
    {
        warn!(
            collection,
            returned = rows.len(),
            limit,
            "store returned more rows than the page size, truncating"
        );
        rows.truncate(limit as usize);
    }

    let items = rows
        .into_iter()
        .map(T::from_record)
        .collect::<Result<Vec<_>, _>>()
        .inspect_err(|e| error!(collection, error = %e, "failed to map search row"))?;

    debug!(collection, total, returned = items.len(), "search executed");
    Ok(Page::new(items, total, window.page(), window.page_size()))
}

fn log_select_failure(pair: &QueryPair, err: &StoreError) {
    error!(
        collection = pair.data().scope().collection(),
        query = %pair.data().to_sparql(),
        error = %err,
        "data query failed"
    );
}

fn log_count_failure(pair: &QueryPair, err: &StoreError) {
    error!(
        collection = pair.count().scope().collection(),
        query = %pair.count().to_sparql(),
        error = %err,
        "count query failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::field::FieldValue;
    use crate::core::iri::Iri;
    use crate::core::record::EntityRecord;
    use crate::core::scope::Scope;
    use crate::search::compose::{CountQuery, DataQuery, PageWindow};
    use crate::search::predicate::Predicate;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves fixed rows and a fixed total, counting data queries
    struct Canned {
        rows: Vec<EntityRecord>,
        total: Result<u64, StoreError>,
        selects: AtomicUsize,
    }

    impl Canned {
        fn new(rows: usize, total: u64) -> Self {
            let rows = (0..rows)
                .map(|i| {
                    EntityRecord::with_id(Iri::parse(&format!("test:r{}", i)).unwrap())
                        .set("label", FieldValue::text(format!("row {}", i)))
                })
                .collect();
            Self {
                rows,
                total: Ok(total),
                selects: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl QueryExecutor for Canned {
        async fn select(&self, _query: &DataQuery) -> Result<Vec<EntityRecord>, StoreError> {
            self.selects.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.clone())
        }

        async fn count(&self, _query: &CountQuery) -> Result<u64, StoreError> {
            self.total.clone()
        }
    }

    fn scope() -> Scope {
        EngineConfig::default_config().scope("annotations").unwrap()
    }

    fn pair(page: i64, size: i64) -> QueryPair {
        QueryPair::compose(
            &scope(),
            Predicate::default(),
            Vec::new(),
            PageWindow::new(page, Some(size), 20, 1000).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_concurrent_page() {
        let executor = Canned::new(3, 13);
        let page: Page<EntityRecord> = execute(&executor, &pair(1, 10), ExecutionMode::Concurrent)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total_count, 13);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 10);
        assert_eq!(page.items[0].id_string().unwrap(), "test:r0");
    }

    #[tokio::test]
    async fn test_count_first_skips_out_of_range_window() {
        let executor = Canned::new(0, 15);
        let page: Page<EntityRecord> = execute(&executor, &pair(2, 10), ExecutionMode::CountFirst)
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 15);
        assert!(page.is_out_of_range());
        assert_eq!(executor.selects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_count_first_skips_empty_total() {
        let executor = Canned::new(0, 0);
        let page: Page<EntityRecord> = execute(&executor, &pair(0, 10), ExecutionMode::CountFirst)
            .await
            .unwrap();
        assert_eq!(page.total_count, 0);
        assert!(!page.is_out_of_range());
        assert_eq!(executor.selects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_an_empty_page() {
        let mut executor = Canned::new(0, 0);
        executor.total = Err(StoreError::Timeout {
            backend: "test".to_string(),
            millis: 50,
        });
        for mode in [ExecutionMode::Concurrent, ExecutionMode::CountFirst] {
            let result: Result<Page<EntityRecord>, _> = execute(&executor, &pair(0, 10), mode).await;
            assert!(matches!(result, Err(StoreError::Timeout { .. })));
        }
    }

    #[tokio::test]
    async fn test_oversized_result_is_truncated_in_order() {
        let executor = Canned::new(12, 12);
        let page: Page<EntityRecord> = execute(&executor, &pair(0, 10), ExecutionMode::Concurrent)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.items[9].id_string().unwrap(), "test:r9");
    }
}
