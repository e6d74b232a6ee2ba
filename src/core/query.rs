//! Search requests and paginated results

use crate::core::error::ValidationError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Criterion name → optional raw value, in the order the caller supplied them
pub type Criteria = IndexMap<String, Option<String>>;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "ASC"),
            Direction::Desc => write!(f, "DESC"),
        }
    }
}

/// One requested ordering: an attribute name and a direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub attribute: String,
    #[serde(default)]
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            direction: Direction::Desc,
        }
    }
}

/// Parses `field=asc`, `field=desc` or a bare `field` (ascending)
impl FromStr for OrderBy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| ValidationError::InvalidOrder {
            value: s.to_string(),
            message: message.to_string(),
        };

        let (attribute, direction) = match s.split_once('=') {
            Some((attribute, direction)) => {
                let direction = match direction.trim().to_lowercase().as_str() {
                    "asc" => Direction::Asc,
                    "desc" => Direction::Desc,
                    _ => return Err(invalid("direction must be 'asc' or 'desc'")),
                };
                (attribute.trim(), direction)
            }
            None => (s.trim(), Direction::Asc),
        };

        if attribute.is_empty() {
            return Err(invalid("missing attribute name"));
        }

        Ok(Self {
            attribute: attribute.to_string(),
            direction,
        })
    }
}

/// A caller's search: criteria, ordering, page window and language
///
/// Absent or blank criterion values mean "no filter".
///
/// # Example
/// ```rust,ignore
/// let request = SearchRequest::new()
///     .criterion("target", "test:annot-test-so")
///     .order_by(OrderBy::asc("motivation"))
///     .page(0, 20)
///     .language("fr");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    pub criteria: Criteria,

    /// Page number (starts at 0)
    pub page: i64,

    /// Page size; `None` or negative means the collection default, `0` means
    /// every matching row
    pub page_size: Option<i64>,

    pub order_by: Vec<OrderBy>,

    /// Locale tag used to pick localized labels
    pub language: Option<String>,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn criterion(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.criteria.insert(name.into(), Some(value.into()));
        self
    }

    pub fn criterion_opt(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        self.criteria.insert(name.into(), value);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Parse and append `field=asc|desc` order strings
    pub fn order_by_str(mut self, orders: &[&str]) -> Result<Self, ValidationError> {
        for order in orders {
            self.order_by.push(order.parse()?);
        }
        Ok(self)
    }

    pub fn page(mut self, page: i64, page_size: i64) -> Self {
        self.page = page;
        self.page_size = Some(page_size);
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Criteria whose value is present and not blank, values trimmed
    pub fn effective_criteria(&self) -> impl Iterator<Item = (&str, &str)> {
        effective(&self.criteria)
    }
}

/// Criteria whose value is present and not blank, values trimmed
pub fn effective(criteria: &Criteria) -> impl Iterator<Item = (&str, &str)> {
    criteria.iter().filter_map(|(name, value)| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| (name.as_str(), v))
    })
}

/// One page of results plus the total number of matches
///
/// `total_count` counts every row matching the filter regardless of the page
/// window, so an empty `items` with a non-zero total means the page is past
/// the last one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u64,
    /// `0` when every matching row was requested
    pub page_size: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64, page: u64, page_size: u64) -> Self {
        Self {
            items,
            total_count,
            page,
            page_size,
        }
    }

    pub fn empty(total_count: u64, page: u64, page_size: u64) -> Self {
        Self::new(Vec::new(), total_count, page, page_size)
    }

    /// Total number of pages (1 when every row was requested)
    pub fn total_pages(&self) -> u64 {
        if self.total_count == 0 {
            0
        } else if self.page_size == 0 {
            1
        } else {
            self.total_count.div_ceil(self.page_size)
        }
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 0
    }

    /// Matches exist but none fall in the requested page
    pub fn is_out_of_range(&self) -> bool {
        self.items.is_empty() && self.total_count > 0
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
        }
    }
}
