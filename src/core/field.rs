//! Attribute value types

use crate::core::iri::Iri;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A typed attribute value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    /// A label carrying an optional language tag
    LangText {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
    },
    Iri(Iri),
    DateTime(DateTime<Utc>),
    Integer(i64),
    Boolean(bool),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn label(value: impl Into<String>, lang: Option<&str>) -> Self {
        FieldValue::LangText {
            value: value.into(),
            lang: lang.map(str::to_string),
        }
    }

    /// Get the lexical form for textual values
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::LangText { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            FieldValue::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Language tag of a label; `None` for untagged labels and non-labels
    pub fn lang(&self) -> Option<&str> {
        match self {
            FieldValue::LangText { lang, .. } => lang.as_deref(),
            _ => None,
        }
    }

    /// String used by regex matching: text, labels and identifiers
    pub fn lexical(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::LangText { value, .. } => value.clone(),
            FieldValue::Iri(iri) => iri.to_string(),
            FieldValue::DateTime(dt) => dt.to_rfc3339(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Boolean(b) => b.to_string(),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            FieldValue::Boolean(_) => 0,
            FieldValue::Integer(_) => 1,
            FieldValue::DateTime(_) => 2,
            FieldValue::Iri(_) => 3,
            FieldValue::Text(_) | FieldValue::LangText { .. } => 4,
        }
    }

    /// Total order used for sorting
    ///
    /// Values of the same kind compare naturally; mixed kinds are grouped by
    /// kind. Labels compare by lexical form only.
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a.cmp(b),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.cmp(b),
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => a.cmp(b),
            (FieldValue::Iri(a), FieldValue::Iri(b)) => a.cmp(b),
            (a, b) => match (a.as_text(), b.as_text()) {
                (Some(a), Some(b)) => a.cmp(b),
                _ => a.type_rank().cmp(&b.type_rank()),
            },
        }
    }

    /// Lower-case textual values; other kinds are returned unchanged
    pub fn case_folded(&self) -> FieldValue {
        match self {
            FieldValue::Text(s) => FieldValue::Text(s.to_lowercase()),
            FieldValue::LangText { value, lang } => FieldValue::LangText {
                value: value.to_lowercase(),
                lang: lang.clone(),
            },
            other => other.clone(),
        }
    }
}

impl From<Iri> for FieldValue {
    fn from(iri: Iri) -> Self {
        FieldValue::Iri(iri)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(dt: DateTime<Utc>) -> Self {
        FieldValue::DateTime(dt)
    }
}
