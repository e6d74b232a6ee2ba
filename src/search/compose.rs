//! Query/count pair composer
//!
//! Both queries of a search are derived from one [`Predicate`] value. The
//! composer moves that value behind a single `Arc` shared by the data query
//! and the count query; neither query exposes a way to replace it, so the
//! two can never filter differently.

use crate::core::error::ValidationError;
use crate::core::scope::Scope;
use crate::search::order::OrderTerm;
use crate::search::predicate::Predicate;
use std::sync::Arc;

/// Validated page window
///
/// `size == None` means every matching row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    page: u64,
    size: Option<u64>,
    offset: u64,
}

impl PageWindow {
    /// Validate a caller's page and page size
    ///
    /// - absent or negative size: `default_size`
    /// - size `0`: every row, reported as page 0
    /// - size above `max_size`: rejected
    /// - negative page, or `page * size` overflowing: rejected
    pub fn new(
        page: i64,
        page_size: Option<i64>,
        default_size: usize,
        max_size: usize,
    ) -> Result<Self, ValidationError> {
        let invalid = |message: String| ValidationError::InvalidPagination { message };

        let page = u64::try_from(page)
            .map_err(|_| invalid(format!("page must be 0 or greater, got {}", page)))?;

        let size = match page_size {
            Some(0) => None,
            Some(size) if size > 0 => Some(size as u64),
            _ => Some(default_size as u64),
        };

        let Some(size) = size else {
            return Ok(Self {
                page: 0,
                size: None,
                offset: 0,
            });
        };

        if size > max_size as u64 {
            return Err(invalid(format!(
                "page size {} exceeds the maximum of {}",
                size, max_size
            )));
        }

        let offset = page
            .checked_mul(size)
            .filter(|offset| i64::try_from(*offset).is_ok())
            .ok_or_else(|| invalid(format!("page {} with size {} is out of range", page, size)))?;

        Ok(Self {
            page,
            size: Some(size),
            offset,
        })
    }

    /// Every row from the first one
    pub fn all() -> Self {
        Self {
            page: 0,
            size: None,
            offset: 0,
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    /// Reported page size; `0` when unbounded
    pub fn page_size(&self) -> u64 {
        self.size.unwrap_or(0)
    }

    pub fn limit(&self) -> Option<u64> {
        self.size
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether the window starts past `total` matching rows
    pub fn starts_after(&self, total: u64) -> bool {
        self.offset >= total
    }
}

/// Filtered, ordered and windowed projection of records
#[derive(Debug, Clone, PartialEq)]
pub struct DataQuery {
    scope: Scope,
    predicate: Arc<Predicate>,
    order: Vec<OrderTerm>,
    window: PageWindow,
    language: Option<String>,
}

impl DataQuery {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn order(&self) -> &[OrderTerm] {
        &self.order
    }

    pub fn window(&self) -> PageWindow {
        self.window
    }

    /// Language used to pick localized labels for ordering
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

/// Number of distinct records matching the predicate
///
/// Carries no ordering and no window.
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    scope: Scope,
    predicate: Arc<Predicate>,
}

impl CountQuery {
    /// A standalone count, for callers that only want the total
    pub fn new(scope: Scope, predicate: Predicate) -> Self {
        Self {
            scope,
            predicate: Arc::new(predicate),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

/// The data query and count query of one search
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPair {
    data: DataQuery,
    count: CountQuery,
}

impl QueryPair {
    /// Derive both queries from one predicate
    pub fn compose(
        scope: &Scope,
        predicate: Predicate,
        order: Vec<OrderTerm>,
        window: PageWindow,
    ) -> Self {
        let predicate = Arc::new(predicate);
        Self {
            data: DataQuery {
                scope: scope.clone(),
                predicate: Arc::clone(&predicate),
                order,
                window,
                language: None,
            },
            count: CountQuery {
                scope: scope.clone(),
                predicate,
            },
        }
    }

    /// Set the language used for localized sort labels
    pub fn with_language(mut self, language: Option<&str>) -> Self {
        self.data.language = language
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        self
    }

    pub fn data(&self) -> &DataQuery {
        &self.data
    }

    pub fn count(&self) -> &CountQuery {
        &self.count
    }

    /// Both queries hold the very same predicate
    pub fn shares_predicate(&self) -> bool {
        Arc::ptr_eq(&self.data.predicate, &self.count.predicate)
    }
}
