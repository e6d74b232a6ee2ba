//! The search entry point
//!
//! `SearchEngine` holds no per-request state: every call builds a fresh
//! predicate, order and query pair, so one engine serves any number of
//! concurrent searches.

use crate::core::error::{EngineResult, ValidationError};
use crate::core::query::{Criteria, Page, SearchRequest};
use crate::core::scope::Scope;
use crate::core::service::{QueryExecutor, ScopeProvider};
use crate::search::compose::{CountQuery, PageWindow, QueryPair};
use crate::search::execute::{ExecutionMode, execute};
use crate::search::order::OrderingResolver;
use crate::search::predicate::build_predicate;
use crate::search::schema::Collection;
use std::sync::Arc;
use tracing::{debug, error};

/// Engine-wide search settings
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub max_page_size: usize,
    pub execution: ExecutionMode,
    /// Used when a request carries no language
    pub default_language: Option<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_page_size: 1000,
            execution: ExecutionMode::default(),
            default_language: None,
        }
    }
}

/// Composes and runs searches against a store collaborator
#[derive(Clone)]
pub struct SearchEngine {
    scopes: Arc<dyn ScopeProvider>,
    executor: Arc<dyn QueryExecutor>,
    settings: SearchSettings,
}

impl SearchEngine {
    pub fn new(
        scopes: Arc<dyn ScopeProvider>,
        executor: Arc<dyn QueryExecutor>,
        settings: SearchSettings,
    ) -> Self {
        Self {
            scopes,
            executor,
            settings,
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Resolve the scope of a collection
    pub fn scope<C: Collection>(&self) -> Result<Scope, ValidationError> {
        self.scopes.resolve(C::NAME)
    }

    /// Build the query pair of a request without running it
    ///
    /// Criteria, order and page errors are all reported together.
    pub fn compose<C: Collection>(
        &self,
        scope: &Scope,
        request: &SearchRequest,
    ) -> Result<QueryPair, ValidationError> {
        let language = self.language(request.language.as_deref());

        let predicate = build_predicate::<C>(scope, &request.criteria, language);
        let order = OrderingResolver::for_collection::<C>().resolve(&request.order_by);
        let window = PageWindow::new(
            request.page,
            request.page_size,
            scope.default_page_size(),
            self.settings.max_page_size,
        );

        match (predicate, order, window) {
            (Ok(predicate), Ok(order), Ok(window)) => {
                Ok(QueryPair::compose(scope, predicate, order, window).with_language(language))
            }
            (predicate, order, window) => {
                let errors = [predicate.err(), order.err(), window.err()]
                    .into_iter()
                    .flatten()
                    .collect();
                Err(ValidationError::combine(errors).unwrap_or(
                    ValidationError::InvalidPagination {
                        message: "invalid search request".to_string(),
                    },
                ))
            }
        }
    }

    /// Search a collection and return one page of typed records
    pub async fn search<C: Collection>(
        &self,
        request: &SearchRequest,
    ) -> EngineResult<Page<C::Record>> {
        let scope = self.scope::<C>()?;
        let pair = self.compose::<C>(&scope, request)?;

        debug!(
            collection = C::NAME,
            query = %pair.data().to_sparql(),
            "composed search"
        );

        let page = execute::<C::Record>(self.executor.as_ref(), &pair, self.settings.execution)
            .await?;
        Ok(page)
    }

    /// Count the records matching `criteria`, ignoring any page window
    pub async fn count<C: Collection>(&self, criteria: &Criteria) -> EngineResult<u64> {
        let scope = self.scope::<C>()?;
        let predicate = build_predicate::<C>(&scope, criteria, self.language(None))?;
        let query = CountQuery::new(scope, predicate);

        let total = self.executor.count(&query).await.inspect_err(|e| {
            error!(
                collection = C::NAME,
                query = %query.to_sparql(),
                error = %e,
                "count query failed"
            )
        })?;
        debug!(collection = C::NAME, total, "counted");
        Ok(total)
    }

    fn language<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        requested
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .or(self.settings.default_language.as_deref())
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
