//! Annotations: free-text notes with a motivation, attached to one or more
//! targets

use crate::core::error::{FieldValidationError, StoreError};
use crate::core::field::FieldValue;
use crate::core::iri::Iri;
use crate::core::query::OrderBy;
use crate::core::record::{EntityRecord, FromRecord, IntoRecord, required};
use crate::search::order::SortRules;
use crate::search::schema::{Collection, Criterion, CriterionSpec, MatchKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DESCRIPTION: &str = "description";
pub const MOTIVATION: &str = "motivation";
pub const TARGETS: &str = "targets";
pub const CREATOR: &str = "creator";
pub const CREATED: &str = "created";

/// An annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// `None` until created
    pub uri: Option<Iri>,
    pub description: String,
    pub motivation: Iri,
    pub targets: Vec<Iri>,
    pub creator: Option<Iri>,
    pub created: Option<DateTime<Utc>>,
}

impl Annotation {
    /// A new annotation, created now
    pub fn new(description: impl Into<String>, motivation: Iri, targets: Vec<Iri>) -> Self {
        Self {
            uri: None,
            description: description.into(),
            motivation,
            targets,
            creator: None,
            created: Some(Utc::now()),
        }
    }

    pub fn with_uri(mut self, uri: Iri) -> Self {
        self.uri = Some(uri);
        self
    }

    pub fn with_creator(mut self, creator: Iri) -> Self {
        self.creator = Some(creator);
        self
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }
}

impl FromRecord for Annotation {
    fn from_record(record: EntityRecord) -> Result<Self, StoreError> {
        let mapping = |message: String| StoreError::Mapping {
            id: record.id_string().unwrap_or_default(),
            message,
        };

        let description = required(&record, DESCRIPTION)?
            .as_text()
            .ok_or_else(|| mapping("description is not text".to_string()))?
            .to_string();
        let motivation = required(&record, MOTIVATION)?
            .as_iri()
            .cloned()
            .ok_or_else(|| mapping("motivation is not an identifier".to_string()))?;
        let targets = record
            .values(TARGETS)
            .iter()
            .map(|v| {
                v.as_iri()
                    .cloned()
                    .ok_or_else(|| mapping(format!("target '{}' is not an identifier", v.lexical())))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let creator = record.first(CREATOR).and_then(FieldValue::as_iri).cloned();
        let created = record.first(CREATED).and_then(FieldValue::as_datetime);

        Ok(Self {
            uri: record.id.clone(),
            description,
            motivation,
            targets,
            creator,
            created,
        })
    }
}

impl IntoRecord for Annotation {
    fn into_record(self) -> EntityRecord {
        let mut record = EntityRecord {
            id: self.uri,
            ..EntityRecord::new()
        }
        .set(DESCRIPTION, FieldValue::text(self.description))
        .set(MOTIVATION, self.motivation)
        .set_all(TARGETS, self.targets.into_iter().map(FieldValue::Iri).collect());
        if let Some(creator) = self.creator {
            record = record.set(CREATOR, creator);
        }
        if let Some(created) = self.created {
            record = record.set(CREATED, created);
        }
        record
    }
}

/// Searchable criteria of annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationCriterion {
    Description,
    Target,
    Motivation,
    Author,
    CreatedAfter,
    CreatedBefore,
}

impl Criterion for AnnotationCriterion {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "description" => Some(Self::Description),
            "target" => Some(Self::Target),
            "motivation" => Some(Self::Motivation),
            "author" => Some(Self::Author),
            "created_after" => Some(Self::CreatedAfter),
            "created_before" => Some(Self::CreatedBefore),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Target => "target",
            Self::Motivation => "motivation",
            Self::Author => "author",
            Self::CreatedAfter => "created_after",
            Self::CreatedBefore => "created_before",
        }
    }

    fn spec(&self) -> CriterionSpec {
        match self {
            Self::Description => CriterionSpec::new(DESCRIPTION, MatchKind::Contains),
            Self::Target => CriterionSpec::new(TARGETS, MatchKind::Identifier),
            Self::Motivation => CriterionSpec::new(MOTIVATION, MatchKind::Identifier),
            Self::Author => CriterionSpec::new(CREATOR, MatchKind::Identifier),
            Self::CreatedAfter => CriterionSpec::new(CREATED, MatchKind::DateFrom),
            Self::CreatedBefore => CriterionSpec::new(CREATED, MatchKind::DateTo),
        }
    }
}

/// The annotation collection
#[derive(Debug, Clone, Copy)]
pub struct AnnotationCollection;

impl Collection for AnnotationCollection {
    const NAME: &'static str = "annotations";
    type Criterion = AnnotationCriterion;
    type Record = Annotation;

    fn default_order() -> Vec<OrderBy> {
        vec![OrderBy::desc(CREATED)]
    }

    /// Ordering by motivation sorts on the motivation's name in the request
    /// language, else its untagged name
    fn sort_rules() -> SortRules {
        SortRules::new().label_fallback(MOTIVATION, "name")
    }

    fn case_sensitive(attribute: &str) -> bool {
        attribute == CREATED
    }

    fn validate(record: &EntityRecord) -> Vec<FieldValidationError> {
        let mut errors = Vec::new();
        match record.first(DESCRIPTION).and_then(FieldValue::as_text) {
            Some(text) if !text.trim().is_empty() => {}
            _ => errors.push(FieldValidationError::new(DESCRIPTION, "a description is required")),
        }
        if record.first(MOTIVATION).and_then(FieldValue::as_iri).is_none() {
            errors.push(FieldValidationError::new(
                MOTIVATION,
                "a motivation identifier is required",
            ));
        }
        let targets = record.values(TARGETS);
        if targets.is_empty() {
            errors.push(FieldValidationError::new(TARGETS, "at least one target is required"));
        } else if targets.iter().any(|t| t.as_iri().is_none()) {
            errors.push(FieldValidationError::new(TARGETS, "targets must be identifiers"));
        }
        errors
    }
}
