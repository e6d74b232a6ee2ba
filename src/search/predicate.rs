//! Filter predicate builder
//!
//! Search criteria become leaves of a conjunctive predicate. Leaves on a
//! multi-valued relationship are attached to a scoping node for that
//! relationship; every criterion on the same relationship reuses the same
//! node, so a store evaluating one join per node never multiplies or drops
//! rows.
//!
//! The builder is a value: each call consumes it and returns the updated
//! builder, threading the relationship → scoping node map along.

use crate::core::error::ValidationError;
use crate::core::field::FieldValue;
use crate::core::query::{Criteria, effective};
use crate::core::scope::Scope;
use crate::search::schema::{Collection, Criterion, CriterionSpec, MatchKind};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::OnceLock;

/// Comparison applied by a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    /// Case-insensitive regular expression search
    RegexContainsCi,
    Exists,
    NotExists,
    GreaterOrEqual,
    LessOrEqual,
    /// Label in the leaf's language, or untagged
    LangMatches,
}

/// An (attribute, operator, value) condition
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub attribute: String,
    pub operator: Operator,
    /// `None` for `Exists` / `NotExists`
    pub value: Option<FieldValue>,
}

impl Leaf {
    pub fn new(attribute: impl Into<String>, operator: Operator, value: FieldValue) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            value: Some(value),
        }
    }

    pub fn exists(attribute: impl Into<String>, present: bool) -> Self {
        Self {
            attribute: attribute.into(),
            operator: if present {
                Operator::Exists
            } else {
                Operator::NotExists
            },
            value: None,
        }
    }

    /// Whether a single value satisfies this leaf
    ///
    /// `Exists`/`NotExists` are decided on the whole attribute, not per
    /// value; see [`Leaf::matches_values`].
    pub fn matches(&self, candidate: &FieldValue) -> bool {
        let Some(expected) = &self.value else {
            return self.operator == Operator::Exists;
        };
        match self.operator {
            Operator::Equals => candidate == expected,
            Operator::RegexContainsCi => expected
                .as_text()
                .and_then(|pattern| contains_regex(pattern).ok())
                .is_some_and(|re| re.is_match(&candidate.lexical())),
            Operator::GreaterOrEqual => {
                same_kind(candidate, expected) && candidate.sort_cmp(expected).is_ge()
            }
            Operator::LessOrEqual => {
                same_kind(candidate, expected) && candidate.sort_cmp(expected).is_le()
            }
            Operator::LangMatches => match (candidate.lang(), expected.as_text()) {
                (None, _) => true,
                (Some(lang), Some(wanted)) => primary_subtag(lang) == primary_subtag(wanted),
                (Some(_), None) => false,
            },
            Operator::Exists | Operator::NotExists => true,
        }
    }

    /// Whether an attribute holding `values` satisfies this leaf (any value)
    pub fn matches_values(&self, values: &[FieldValue]) -> bool {
        match self.operator {
            Operator::Exists => !values.is_empty(),
            Operator::NotExists => values.is_empty(),
            _ => values.iter().any(|v| self.matches(v)),
        }
    }
}

fn same_kind(a: &FieldValue, b: &FieldValue) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

pub(crate) fn primary_subtag(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Compile a case-insensitive search pattern
pub fn contains_regex(pattern: &str) -> Result<Regex, regex::Error> {
    regex::RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(1 << 20)
        .build()
}

/// All leaves bound to one multi-valued relationship
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeNode {
    pub relationship: String,
    pub leaves: Vec<Leaf>,
}

/// A conjunctive predicate over one collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    leaves: Vec<Leaf>,
    scopes: IndexMap<String, ScopeNode>,
}

impl Predicate {
    /// Leaves on single-valued attributes of the record
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    /// Scoping nodes, one per relationship, in first-use order
    pub fn scopes(&self) -> impl Iterator<Item = &ScopeNode> {
        self.scopes.values()
    }

    pub fn scope_node(&self, relationship: &str) -> Option<&ScopeNode> {
        self.scopes.get(relationship)
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty() && self.scopes.is_empty()
    }

    /// Every attribute referenced by a leaf
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.leaves
            .iter()
            .map(|l| l.attribute.as_str())
            .chain(self.scopes.keys().map(String::as_str))
    }
}

/// Immutable-by-value builder for [`Predicate`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateBuilder {
    leaves: Vec<Leaf>,
    scopes: IndexMap<String, ScopeNode>,
}

impl PredicateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a leaf, to the shared scoping node when it constrains the bound
    /// value of a relationship of `scope`
    ///
    /// Presence leaves test the attribute as a whole and stay at the root.
    pub fn filter(mut self, scope: &Scope, leaf: Leaf) -> Self {
        let presence = matches!(leaf.operator, Operator::Exists | Operator::NotExists);
        if scope.is_relationship(&leaf.attribute) && !presence {
            self.scopes
                .entry(leaf.attribute.clone())
                .or_insert_with(|| ScopeNode {
                    relationship: leaf.attribute.clone(),
                    leaves: Vec::new(),
                })
                .leaves
                .push(leaf);
        } else {
            self.leaves.push(leaf);
        }
        self
    }

    /// Attach leaves for one criterion (none, one, or a date bound)
    pub fn criterion(
        self,
        scope: &Scope,
        name: &str,
        spec: CriterionSpec,
        value: &str,
    ) -> Result<Self, ValidationError> {
        let leaf = leaf_for(scope, name, spec, value)?;
        Ok(self.filter(scope, leaf))
    }

    /// Restrict `attribute` to labels in `language` or untagged
    pub fn language(
        self,
        scope: &Scope,
        attribute: &str,
        language: &str,
    ) -> Result<Self, ValidationError> {
        let tag = parse_language(language)?;
        Ok(self.filter(
            scope,
            Leaf::new(attribute, Operator::LangMatches, FieldValue::text(tag)),
        ))
    }

    pub fn build(self) -> Predicate {
        Predicate {
            leaves: self.leaves,
            scopes: self.scopes,
        }
    }
}

/// Build the predicate for a collection from the caller's criteria
///
/// Blank and absent values add nothing. Every malformed or unknown criterion
/// is reported, not just the first one.
pub fn build_predicate<C: Collection>(
    scope: &Scope,
    criteria: &Criteria,
    language: Option<&str>,
) -> Result<Predicate, ValidationError> {
    let mut builder = PredicateBuilder::new();
    let mut errors = Vec::new();

    for (name, value) in effective(criteria) {
        let Some(criterion) = C::Criterion::parse(name) else {
            errors.push(ValidationError::UnknownCriterion {
                collection: C::NAME.to_string(),
                criterion: name.to_string(),
            });
            continue;
        };
        match leaf_for(scope, criterion.name(), criterion.spec(), value) {
            Ok(leaf) => builder = builder.filter(scope, leaf),
            Err(e) => errors.push(e),
        }
    }

    if let (Some(language), Some(attribute)) = (
        language.map(str::trim).filter(|l| !l.is_empty()),
        C::language_attribute(),
    ) {
        match builder.clone().language(scope, attribute, language) {
            Ok(next) => builder = next,
            Err(e) => errors.push(e),
        }
    }

    match ValidationError::combine(errors) {
        Some(err) => Err(err),
        None => Ok(builder.build()),
    }
}

fn leaf_for(
    scope: &Scope,
    name: &str,
    spec: CriterionSpec,
    value: &str,
) -> Result<Leaf, ValidationError> {
    let invalid = |message: String| ValidationError::InvalidCriterion {
        criterion: name.to_string(),
        value: value.to_string(),
        message,
    };

    let leaf = match spec.kind {
        MatchKind::Contains => {
            contains_regex(value).map_err(|e| invalid(e.to_string()))?;
            Leaf::new(
                spec.attribute,
                Operator::RegexContainsCi,
                FieldValue::text(value),
            )
        }
        MatchKind::Identifier => {
            let iri = scope
                .prefixes()
                .expand(value)
                .map_err(|e| invalid(e.to_string()))?;
            Leaf::new(spec.attribute, Operator::Equals, FieldValue::Iri(iri))
        }
        MatchKind::DateFrom => Leaf::new(
            spec.attribute,
            Operator::GreaterOrEqual,
            FieldValue::DateTime(parse_date(value, false).map_err(invalid)?),
        ),
        MatchKind::DateTo => Leaf::new(
            spec.attribute,
            Operator::LessOrEqual,
            FieldValue::DateTime(parse_date(value, true).map_err(invalid)?),
        ),
        MatchKind::Presence => match value.to_lowercase().as_str() {
            "true" => Leaf::exists(spec.attribute, true),
            "false" => Leaf::exists(spec.attribute, false),
            _ => return Err(invalid("expected 'true' or 'false'".to_string())),
        },
    };
    Ok(leaf)
}

/// RFC 3339 timestamp, or a calendar date covering the whole day
fn parse_date(value: &str, end_of_day: bool) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| "expected an RFC 3339 timestamp or a YYYY-MM-DD date".to_string())?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| "invalid time of day".to_string())?;
    Ok(date.and_time(time).and_utc())
}

fn parse_language(tag: &str) -> Result<String, ValidationError> {
    static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex =
        TAG_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z]{1,8}([-_][A-Za-z0-9]{1,8})*$").unwrap());
    let tag = tag.trim();
    if regex.is_match(tag) {
        Ok(primary_subtag(tag))
    } else {
        Err(ValidationError::InvalidCriterion {
            criterion: "language".to_string(),
            value: tag.to_string(),
            message: "expected a BCP 47 language tag".to_string(),
        })
    }
}
