//! Typed error handling for the search engine
//!
//! Every public operation returns [`EngineResult`], so callers can tell a
//! malformed request apart from a missing record, a uniqueness violation or
//! a store that could not be queried.
//!
//! # Error Categories
//!
//! - [`ValidationError`]: malformed or out-of-range caller input
//! - [`NotFoundError`]: the targeted identifier does not exist
//! - [`ConflictError`]: uniqueness violation on create
//! - [`StoreError`]: failure reported by the store collaborator
//! - [`BatchError`]: per-record failures of a batch write
//! - [`ConfigError`]: configuration parsing and validation
//!
//! # Example
//!
//! ```rust,ignore
//! match engine.search::<AnnotationCollection>(&request).await {
//!     Ok(page) if page.is_out_of_range() => println!("only {} results", page.total_count),
//!     Ok(page) => println!("{} items", page.items.len()),
//!     Err(EngineError::Validation(e)) => eprintln!("fix your request: {}", e),
//!     Err(e) => eprintln!("{}", e.to_response().message),
//! }
//! ```

use serde::Serialize;
use thiserror::Error;

/// The main error type of the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Caller input is malformed or out of range
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The targeted record does not exist
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// Uniqueness violation
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// Store collaborator failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// One or more records of a batch failed
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Error response structure handed to the outer facade
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl EngineError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::Conflict(_) => "CONFLICT",
            EngineError::Store(_) => "STORE_ERROR",
            EngineError::Batch(_) => "BATCH_ERROR",
            EngineError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Whether retrying the same call unchanged may succeed
    ///
    /// Only store failures are transient; everything else needs the caller
    /// to change its input.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Convert to an error response
    ///
    /// Store failures are reported with a generic message: the collaborator's
    /// message may quote the generated query.
    pub fn to_response(&self) -> ErrorResponse {
        let message = match self {
            EngineError::Store(_) => "The store could not be queried".to_string(),
            other => other.to_string(),
        };
        ErrorResponse {
            code: self.error_code().to_string(),
            message,
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            EngineError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            EngineError::Validation(ValidationError::InvalidCriterion { criterion, .. }) => {
                Some(serde_json::json!({ "criterion": criterion }))
            }
            EngineError::NotFound(NotFoundError::Record { collection, id }) => {
                Some(serde_json::json!({ "collection": collection, "id": id }))
            }
            EngineError::Conflict(ConflictError::AlreadyExists { collection, id }) => {
                Some(serde_json::json!({ "collection": collection, "id": id }))
            }
            EngineError::Batch(batch) => Some(serde_json::json!({ "records": batch.failures })),
            _ => None,
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to caller input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A criterion value failed to parse under its expected type
    #[error("Invalid value '{value}' for criterion '{criterion}': {message}")]
    InvalidCriterion {
        criterion: String,
        value: String,
        message: String,
    },

    /// The criterion name is not searchable on this collection
    #[error("Unknown criterion '{criterion}' for collection '{collection}'")]
    UnknownCriterion {
        collection: String,
        criterion: String,
    },

    /// Malformed order specification
    #[error("Invalid order '{value}': {message}")]
    InvalidOrder { value: String, message: String },

    /// Page or page size out of range
    #[error("Invalid pagination: {message}")]
    InvalidPagination { message: String },

    /// No scope is registered under this collection name
    #[error("Unknown collection: {collection}")]
    UnknownCollection { collection: String },

    /// Malformed identifier
    #[error("Invalid identifier '{value}': {message}")]
    InvalidIdentifier { value: String, message: String },

    /// Multiple field validation errors
    #[error("Validation errors: {}", join_field_errors(.0))]
    FieldErrors(Vec<FieldValidationError>),
}

/// A single field validation error
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl FieldValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

fn join_field_errors(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    /// Flatten into field errors, keyed by the offending input name
    pub fn into_field_errors(self) -> Vec<FieldValidationError> {
        match self {
            ValidationError::FieldErrors(errors) => errors,
            ValidationError::InvalidCriterion {
                criterion, message, ..
            } => vec![FieldValidationError::new(criterion, message)],
            ValidationError::UnknownCriterion { criterion, .. } => {
                vec![FieldValidationError::new(criterion, "unknown criterion")]
            }
            ValidationError::InvalidOrder { value, message } => {
                vec![FieldValidationError::new(
                    "order_by",
                    format!("{}: {}", value, message),
                )]
            }
            ValidationError::InvalidPagination { message } => {
                vec![FieldValidationError::new("page", message)]
            }
            ValidationError::UnknownCollection { collection } => {
                vec![FieldValidationError::new("collection", collection)]
            }
            ValidationError::InvalidIdentifier { value, message } => {
                vec![FieldValidationError::new(
                    "id",
                    format!("{}: {}", value, message),
                )]
            }
        }
    }

    /// Combine several errors; a single one is returned unchanged
    pub fn combine(mut errors: Vec<ValidationError>) -> Option<ValidationError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(ValidationError::FieldErrors(
                errors
                    .into_iter()
                    .flat_map(ValidationError::into_field_errors)
                    .collect(),
            )),
        }
    }
}

// =============================================================================
// Not Found / Conflict
// =============================================================================

/// The targeted record does not exist
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NotFoundError {
    #[error("{collection} record '{id}' not found")]
    Record { collection: String, id: String },
}

/// Uniqueness violation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConflictError {
    #[error("{collection} record '{id}' already exists")]
    AlreadyExists { collection: String, id: String },
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors reported by the store collaborator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Connection error
    #[error("Failed to connect to {backend}: {message}")]
    Connection { backend: String, message: String },

    /// Query execution error (malformed generated query, engine failure)
    #[error("{backend} query error: {message}")]
    Query { backend: String, message: String },

    /// The store did not answer in time
    #[error("{backend} timed out after {millis} ms")]
    Timeout { backend: String, millis: u64 },

    /// A row could not be mapped to its typed record
    #[error("Failed to map row '{id}': {message}")]
    Mapping { id: String, message: String },

    /// Data integrity error
    #[error("Data integrity error: {message}")]
    Integrity { message: String },
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Connection { .. } | StoreError::Timeout { .. }
        )
    }
}

// =============================================================================
// Batch Errors
// =============================================================================

/// Why one record of a batch failed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordFailureKind {
    Validation { errors: Vec<FieldValidationError> },
    Conflict,
    NotFound,
}

/// A failure attached to its position in the submitted batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub kind: RecordFailureKind,
}

/// All per-record failures of a batch; nothing from the batch was written
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} of {} records failed", .failures.len(), .submitted)]
pub struct BatchError {
    pub submitted: usize,
    pub failures: Vec<RecordFailure>,
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration
    #[error("Failed to parse config{}: {message}", .file.as_ref().map(|f| format!(" file '{}'", f)).unwrap_or_default())]
    Parse {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    #[error("Invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// IO error while reading configuration
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse {
            file: None,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
