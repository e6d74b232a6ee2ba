//! Ordering resolver
//!
//! Turns the caller's `(attribute, direction)` list into sort keys. An
//! attribute with a registered sort rule expands into a fallback chain of
//! expressions evaluated in order until one yields a value; any other
//! attribute sorts on its own value. The identifier is always the last key,
//! so pages never shuffle between requests.

use crate::core::error::ValidationError;
use crate::core::query::{Direction, OrderBy};
use crate::search::schema::Collection;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;

/// Attribute names that designate the record identifier
pub const IDENTIFIER_ATTRIBUTES: [&str; 2] = ["uri", "id"];

/// A computed sort value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueExpr {
    /// The record identifier
    Identifier,
    /// The attribute's own value
    Attribute(String),
    /// Label of the entity referenced by `via`, in the request language
    LocalizedLabel { via: String, label: String },
    /// Untagged label of the entity referenced by `via`
    DefaultLabel { via: String, label: String },
}

impl ValueExpr {
    pub fn attribute(name: impl Into<String>) -> Self {
        ValueExpr::Attribute(name.into())
    }

    /// Variable name used when rendering this expression
    pub fn var_name(&self) -> String {
        match self {
            ValueExpr::Identifier => "uri".to_string(),
            ValueExpr::Attribute(name) => name.clone(),
            ValueExpr::LocalizedLabel { via, label } => format!("{}_{}", via, label),
            ValueExpr::DefaultLabel { via, label } => format!("{}_default_{}", via, label),
        }
    }
}

/// One sort key: a fallback chain of expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub chain: Vec<ValueExpr>,
    /// Compare textual values lower-cased
    pub case_insensitive: bool,
}

/// A sort key with its direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    pub key: SortKey,
    pub direction: Direction,
}

impl OrderTerm {
    pub fn identifier(direction: Direction) -> Self {
        Self {
            key: SortKey {
                chain: vec![ValueExpr::Identifier],
                case_insensitive: false,
            },
            direction,
        }
    }

    pub fn is_identifier(&self) -> bool {
        self.key.chain == [ValueExpr::Identifier]
    }
}

/// Attribute → fallback chain registry of one collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortRules(IndexMap<String, Vec<ValueExpr>>);

impl SortRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the chain an attribute expands to; order is significant
    pub fn rule(mut self, attribute: impl Into<String>, chain: Vec<ValueExpr>) -> Self {
        self.0.insert(attribute.into(), chain);
        self
    }

    /// The usual "localized label, else default label" chain for an
    /// attribute referencing another entity
    pub fn label_fallback(self, attribute: &str, label: &str) -> Self {
        let chain = vec![
            ValueExpr::LocalizedLabel {
                via: attribute.to_string(),
                label: label.to_string(),
            },
            ValueExpr::DefaultLabel {
                via: attribute.to_string(),
                label: label.to_string(),
            },
        ];
        self.rule(attribute, chain)
    }

    pub fn get(&self, attribute: &str) -> Option<&[ValueExpr]> {
        self.0.get(attribute).map(Vec::as_slice)
    }
}

/// Resolves order specifications for one collection
#[derive(Debug, Clone)]
pub struct OrderingResolver {
    defaults: Vec<OrderBy>,
    rules: SortRules,
    case_sensitive: fn(&str) -> bool,
}

impl OrderingResolver {
    pub fn new(defaults: Vec<OrderBy>, rules: SortRules, case_sensitive: fn(&str) -> bool) -> Self {
        Self {
            defaults,
            rules,
            case_sensitive,
        }
    }

    pub fn for_collection<C: Collection>() -> Self {
        Self::new(C::default_order(), C::sort_rules(), C::case_sensitive)
    }

    /// Resolve the requested order, or the defaults when none is given
    pub fn resolve(&self, order_by: &[OrderBy]) -> Result<Vec<OrderTerm>, ValidationError> {
        let requested = if order_by.is_empty() {
            self.defaults.as_slice()
        } else {
            order_by
        };

        let mut terms = Vec::with_capacity(requested.len() + 1);
        for order in requested {
            terms.push(self.term(order)?);
        }

        if !terms.iter().any(OrderTerm::is_identifier) {
            terms.push(OrderTerm::identifier(Direction::Asc));
        }
        Ok(terms)
    }

    fn term(&self, order: &OrderBy) -> Result<OrderTerm, ValidationError> {
        let attribute = order.attribute.trim();
        if IDENTIFIER_ATTRIBUTES.contains(&attribute) {
            return Ok(OrderTerm::identifier(order.direction));
        }
        check_attribute_name(attribute)?;

        let chain = match self.rules.get(attribute) {
            Some(chain) => chain.to_vec(),
            None => vec![ValueExpr::attribute(attribute)],
        };

        Ok(OrderTerm {
            key: SortKey {
                chain,
                case_insensitive: !(self.case_sensitive)(attribute),
            },
            direction: order.direction,
        })
    }
}

/// Attribute names end up as query variables; keep them to identifiers
fn check_attribute_name(attribute: &str) -> Result<(), ValidationError> {
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = NAME_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());
    if regex.is_match(attribute) {
        Ok(())
    } else {
        Err(ValidationError::InvalidOrder {
            value: attribute.to_string(),
            message: "attribute names may only contain letters, digits and '_'".to_string(),
        })
    }
}
