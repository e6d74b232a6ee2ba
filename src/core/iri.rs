//! Identifiers and their canonical form
//!
//! Identifiers may be supplied in compact `prefix:local` form. Before any
//! comparison they are expanded against a [`PrefixMap`], so that
//! `oa:describing` and `http://www.w3.org/ns/oa#describing` are equal.

use crate::core::error::ValidationError;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// An absolute identifier in canonical (expanded) form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Iri(String);

impl Iri {
    /// Parse an already-expanded identifier
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        if is_absolute(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(ValidationError::InvalidIdentifier {
                value: value.to_string(),
                message: "expected an absolute identifier (scheme:path)".to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append a path segment, inserting a `/` unless the identifier already
    /// ends with a separator
    pub fn join(&self, segment: &str) -> Iri {
        if self.0.ends_with('/') || self.0.ends_with('#') {
            Iri(format!("{}{}", self.0, segment))
        } else {
            Iri(format!("{}/{}", self.0, segment))
        }
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Iri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_absolute(value: &str) -> bool {
    static IRI_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = IRI_REGEX.get_or_init(|| {
        Regex::new(r#"^[A-Za-z][A-Za-z0-9+.\-]*:[^\s<>"{}|\\^`]+$"#).expect("valid IRI regex")
    });
    regex.is_match(value)
}

/// Prefix → namespace table used to expand compact identifiers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefixMap(IndexMap<String, String>);

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespaces every deployment knows about
    pub fn standard() -> Self {
        let mut map = Self::new();
        map.insert("oa", "http://www.w3.org/ns/oa#");
        map.insert("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#");
        map.insert("rdfs", "http://www.w3.org/2000/01/rdf-schema#");
        map.insert("xsd", "http://www.w3.org/2001/XMLSchema#");
        map.insert("dc", "http://purl.org/dc/terms/");
        map
    }

    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.0.insert(prefix.into(), namespace.into());
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.0.get(prefix).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, ns)| (p.as_str(), ns.as_str()))
    }

    /// Later entries win on prefix clashes
    pub fn extend(&mut self, other: &PrefixMap) {
        for (prefix, namespace) in other.iter() {
            self.insert(prefix, namespace);
        }
    }

    /// Expand and validate an identifier
    ///
    /// A value whose scheme matches a registered prefix is expanded;
    /// anything else must already be absolute.
    pub fn expand(&self, value: &str) -> Result<Iri, ValidationError> {
        let value = value.trim();
        if let Some((prefix, local)) = value.split_once(':')
            && !local.starts_with("//")
            && let Some(namespace) = self.get(prefix)
        {
            return Iri::parse(&format!("{}{}", namespace, local));
        }
        Iri::parse(value)
    }

    /// Shorten an identifier to `prefix:local` when a namespace matches
    pub fn compact(&self, iri: &Iri) -> String {
        self.iter()
            .filter(|(_, namespace)| iri.as_str().starts_with(namespace))
            .max_by_key(|(_, namespace)| namespace.len())
            .map(|(prefix, namespace)| format!("{}:{}", prefix, &iri.as_str()[namespace.len()..]))
            .unwrap_or_else(|| iri.to_string())
    }
}
