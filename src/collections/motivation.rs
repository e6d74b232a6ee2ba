//! Motivations: the reason an annotation was made, with multilingual names

use crate::core::error::{FieldValidationError, StoreError};
use crate::core::field::FieldValue;
use crate::core::iri::Iri;
use crate::core::query::OrderBy;
use crate::core::record::{EntityRecord, FromRecord, IntoRecord};
use crate::search::predicate::primary_subtag;
use crate::search::schema::{Collection, Criterion, CriterionSpec, MatchKind};
use serde::{Deserialize, Serialize};

pub const NAME_ATTRIBUTE: &str = "name";

/// A name and its language (`None` for the default name)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motivation {
    pub uri: Option<Iri>,
    pub names: Vec<Label>,
}

impl Motivation {
    pub fn new(uri: Iri) -> Self {
        Self {
            uri: Some(uri),
            names: Vec::new(),
        }
    }

    pub fn with_name(mut self, value: impl Into<String>, lang: Option<&str>) -> Self {
        self.names.push(Label {
            value: value.into(),
            lang: lang.map(str::to_string),
        });
        self
    }

    /// Name in `lang`, else the default name
    ///
    /// Tags are compared on their primary subtag, so `fr-FR` answers `fr`.
    pub fn name(&self, lang: Option<&str>) -> Option<&str> {
        let localized = lang.map(primary_subtag).and_then(|wanted| {
            self.names.iter().find(|n| {
                n.lang
                    .as_deref()
                    .is_some_and(|l| primary_subtag(l) == wanted)
            })
        });
        localized
            .or_else(|| self.names.iter().find(|n| n.lang.is_none()))
            .map(|n| n.value.as_str())
    }
}

impl FromRecord for Motivation {
    fn from_record(record: EntityRecord) -> Result<Self, StoreError> {
        let names = record
            .values(NAME_ATTRIBUTE)
            .iter()
            .map(|v| match v.as_text() {
                Some(value) => Ok(Label {
                    value: value.to_string(),
                    lang: v.lang().map(str::to_string),
                }),
                None => Err(StoreError::Mapping {
                    id: record.id_string().unwrap_or_default(),
                    message: "motivation name is not text".to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            uri: record.id,
            names,
        })
    }
}

impl IntoRecord for Motivation {
    fn into_record(self) -> EntityRecord {
        let names = self
            .names
            .into_iter()
            .map(|n| FieldValue::LangText {
                value: n.value,
                lang: n.lang,
            })
            .collect();
        EntityRecord {
            id: self.uri,
            ..EntityRecord::new()
        }
        .set_all(NAME_ATTRIBUTE, names)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotivationCriterion {
    Name,
}

impl Criterion for MotivationCriterion {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        "name"
    }

    fn spec(&self) -> CriterionSpec {
        CriterionSpec::new(NAME_ATTRIBUTE, MatchKind::Contains)
    }
}

/// The motivation collection
#[derive(Debug, Clone, Copy)]
pub struct MotivationCollection;

impl Collection for MotivationCollection {
    const NAME: &'static str = "motivations";
    type Criterion = MotivationCriterion;
    type Record = Motivation;

    fn default_order() -> Vec<OrderBy> {
        vec![OrderBy::asc(NAME_ATTRIBUTE)]
    }

    fn language_attribute() -> Option<&'static str> {
        Some(NAME_ATTRIBUTE)
    }

    fn validate(record: &EntityRecord) -> Vec<FieldValidationError> {
        if record.values(NAME_ATTRIBUTE).iter().any(|n| n.as_text().is_some()) {
            Vec::new()
        } else {
            vec![FieldValidationError::new(NAME_ATTRIBUTE, "at least one name is required")]
        }
    }
}
