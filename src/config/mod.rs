//! Configuration loading and management

use crate::core::error::{ConfigError, ValidationError};
use crate::core::iri::PrefixMap;
use crate::core::scope::Scope;
use crate::core::service::ScopeProvider;
use crate::search::engine::SearchSettings;
use crate::search::execute::ExecutionMode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Page size limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Used when a request gives no page size (or a negative one)
    pub default_page_size: usize,

    /// Largest page size a request may ask for; `0` ("all rows") is always
    /// allowed
    pub max_page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 1000,
        }
    }
}

/// A searchable collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Name used by the collection's type (e.g., "annotations")
    pub name: String,

    /// Named graph holding the collection; compact form allowed
    pub graph: String,

    /// Type of every record of the collection; compact form allowed
    pub rdf_type: String,

    /// Multi-valued attributes stored as relationship entries
    #[serde(default)]
    pub relationships: Vec<String>,

    /// Overrides the global default page size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_page_size: Option<usize>,
}

/// Complete configuration of the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Prefixes added to the standard ones (oa, rdf, rdfs, xsd, dc)
    #[serde(default)]
    pub prefixes: PrefixMap,

    /// Language used when a request carries none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionMode>,

    #[serde(default)]
    pub collections: Vec<CollectionConfig>,
}

impl EngineConfig {
    /// Load and validate configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            file: Some(path.display().to_string()),
            message: e.to_string(),
        })?;
        config.validate()?;
        debug!(file = %path.display(), collections = config.collections.len(), "loaded config");
        Ok(config)
    }

    /// Load and validate configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Merge several configuration fragments
    ///
    /// Later fragments replace earlier collections of the same name, extend
    /// the prefix map and override scalar settings they define.
    pub fn merge(configs: Vec<EngineConfig>) -> Self {
        let mut merged = EngineConfig::default();
        for config in configs {
            merged.prefixes.extend(&config.prefixes);
            merged.default_language = config.default_language.or(merged.default_language);
            merged.pagination = config.pagination.or(merged.pagination);
            merged.execution = config.execution.or(merged.execution);

            for collection in config.collections {
                match merged
                    .collections
                    .iter_mut()
                    .find(|c| c.name == collection.name)
                {
                    Some(existing) => *existing = collection,
                    None => merged.collections.push(collection),
                }
            }
        }
        merged
    }

    pub fn pagination(&self) -> PaginationConfig {
        self.pagination.unwrap_or_default()
    }

    pub fn execution(&self) -> ExecutionMode {
        self.execution.unwrap_or_default()
    }

    /// Standard prefixes extended with the configured ones
    pub fn prefix_map(&self) -> PrefixMap {
        let mut prefixes = PrefixMap::standard();
        prefixes.extend(&self.prefixes);
        prefixes
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            max_page_size: self.pagination().max_page_size,
            execution: self.execution(),
            default_language: self.default_language.clone(),
        }
    }

    pub fn find_collection(&self, name: &str) -> Option<&CollectionConfig> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Resolve a collection's scope, if it is configured and well-formed
    pub fn scope(&self, name: &str) -> Option<Scope> {
        self.resolve(name).ok()
    }

    /// Check the whole configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pagination = self.pagination();
        if pagination.default_page_size == 0 {
            return Err(invalid(
                "pagination.default_page_size",
                "0",
                "must be greater than 0",
            ));
        }
        if pagination.default_page_size > pagination.max_page_size {
            return Err(invalid(
                "pagination.default_page_size",
                &pagination.default_page_size.to_string(),
                &format!(
                    "must not exceed max_page_size ({})",
                    pagination.max_page_size
                ),
            ));
        }

        let prefixes = self.prefix_map();
        let mut names = HashSet::new();
        for collection in &self.collections {
            if !names.insert(collection.name.as_str()) {
                return Err(invalid(
                    "collections.name",
                    &collection.name,
                    "duplicate collection name",
                ));
            }
            let field = |name: &str| format!("collections.{}.{}", collection.name, name);

            prefixes
                .expand(&collection.graph)
                .map_err(|e| invalid(&field("graph"), &collection.graph, &e.to_string()))?;
            prefixes
                .expand(&collection.rdf_type)
                .map_err(|e| invalid(&field("rdf_type"), &collection.rdf_type, &e.to_string()))?;

            if let Some(size) = collection.default_page_size
                && (size == 0 || size > pagination.max_page_size)
            {
                return Err(invalid(
                    &field("default_page_size"),
                    &size.to_string(),
                    &format!("must be between 1 and {}", pagination.max_page_size),
                ));
            }
        }
        Ok(())
    }

    /// Configuration used by the test suites: annotations and motivations
    pub fn default_config() -> Self {
        let mut prefixes = PrefixMap::new();
        prefixes.insert("test", "http://opensilex.test/id/");
        prefixes.insert("set", "http://opensilex.test/set/");

        Self {
            prefixes,
            default_language: None,
            pagination: Some(PaginationConfig::default()),
            execution: Some(ExecutionMode::Concurrent),
            collections: vec![
                CollectionConfig {
                    name: "annotations".to_string(),
                    graph: "set:annotations".to_string(),
                    rdf_type: "oa:Annotation".to_string(),
                    relationships: vec!["targets".to_string()],
                    default_page_size: None,
                },
                CollectionConfig {
                    name: "motivations".to_string(),
                    graph: "set:motivations".to_string(),
                    rdf_type: "oa:Motivation".to_string(),
                    relationships: vec!["name".to_string()],
                    default_page_size: Some(50),
                },
            ],
        }
    }
}

impl ScopeProvider for EngineConfig {
    fn resolve(&self, collection: &str) -> Result<Scope, ValidationError> {
        let config =
            self.find_collection(collection)
                .ok_or_else(|| ValidationError::UnknownCollection {
                    collection: collection.to_string(),
                })?;
        let prefixes = self.prefix_map();
        let graph = prefixes.expand(&config.graph)?;
        let rdf_type = prefixes.expand(&config.rdf_type)?;

        Ok(Scope::new(
            config.name.clone(),
            graph,
            rdf_type,
            config.relationships.clone(),
            config
                .default_page_size
                .unwrap_or(self.pagination().default_page_size),
            Arc::new(prefixes),
        ))
    }
}

fn invalid(field: &str, value: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}
