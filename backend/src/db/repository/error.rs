//! Error types for repository operations.
//!
//! Every failure of the ingestion pipeline, the stores and the query service is
//! a [`RepositoryError`]. Each variant carries a message and an [`ErrorContext`]
//! with enough detail (field path, record index, identifier) for a caller to
//! diagnose the problem and retry with corrected input.

use std::fmt;

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Structured context for repository errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "import_scenario", "create_satellite")
    pub operation: Option<String>,
    /// The entity type involved ("scenario", "satellite", "document")
    pub entity: Option<String>,
    /// The entity ID if applicable
    pub entity_id: Option<String>,
    /// Offending field, as a document path or attribute name
    pub field: Option<String>,
    /// Index of the offending record within the input document
    pub record_index: Option<usize>,
    /// Additional details about the error
    pub details: Option<String>,
    /// Whether a new attempt may succeed without changing the input
    pub retryable: bool,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the entity type.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Set the entity ID.
    pub fn with_entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    /// Set the offending field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Set the index of the offending record.
    pub fn with_record_index(mut self, index: usize) -> Self {
        self.record_index = Some(index);
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Mark this error as retryable.
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref entity) = self.entity {
            parts.push(format!("entity={}", entity));
        }
        if let Some(ref id) = self.entity_id {
            parts.push(format!("id={}", id));
        }
        if let Some(ref field) = self.field {
            parts.push(format!("field={}", field));
        }
        if let Some(index) = self.record_index {
            parts.push(format!("index={}", index));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        if self.retryable {
            parts.push("retryable=true".to_string());
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
#[allow(clippy::result_large_err)]
pub enum RepositoryError {
    /// The input document is not JSON or lacks the `meta`/`satellites` sections.
    #[error("Document parse error: {message} {context}")]
    DocumentParseError {
        message: String,
        context: ErrorContext,
    },

    /// A field is missing, mistyped or outside its allowed range.
    #[error("Validation error: {message} {context}")]
    ValidationError {
        message: String,
        context: ErrorContext,
    },

    /// Duplicate `sat_id` within a scenario, or a reference to a missing scenario.
    #[error("Constraint violation: {message} {context}")]
    ConstraintViolation {
        message: String,
        context: ErrorContext,
    },

    /// The store is unreachable or aborted the transaction.
    #[error("Connectivity error: {message} {context}")]
    ConnectivityError {
        message: String,
        context: ErrorContext,
    },

    /// Requested entity was not found.
    #[error("Not found: {message} {context}")]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    /// SQL query execution errors not covered by a more specific variant.
    #[error("Query error: {message} {context}")]
    QueryError {
        message: String,
        context: ErrorContext,
    },

    /// Transaction error (commit/rollback failed).
    #[error("Transaction error: {message} {context}")]
    TransactionError {
        message: String,
        context: ErrorContext,
    },

    /// Configuration or initialization error.
    #[error("Configuration error: {message} {context}")]
    ConfigurationError {
        message: String,
        context: ErrorContext,
    },

    /// Internal/unexpected errors.
    #[error("Internal error: {message} {context}")]
    InternalError {
        message: String,
        context: ErrorContext,
    },
}

impl RepositoryError {
    /// Create a document parse error.
    pub fn document_parse(message: impl Into<String>) -> Self {
        Self::DocumentParseError {
            message: message.into(),
            context: ErrorContext::default().with_entity("document"),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a validation error with context.
    pub fn validation_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::ValidationError {
            message: message.into(),
            context,
        }
    }

    /// Create a constraint violation.
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a constraint violation with context.
    pub fn constraint_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::ConstraintViolation {
            message: message.into(),
            context,
        }
    }

    /// Create a connectivity error. Always retryable.
    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::ConnectivityError {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    /// Create a connectivity error with full context. Always retryable.
    pub fn connectivity_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::ConnectivityError {
            message: message.into(),
            context: context.retryable(),
        }
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a not found error with context.
    pub fn not_found_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::NotFound {
            message: message.into(),
            context,
        }
    }

    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::QueryError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::TransactionError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create an internal error with context.
    pub fn internal_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::InternalError {
            message: message.into(),
            context,
        }
    }

    /// NotFound for a scenario id.
    pub fn scenario_not_found(operation: &str, id: impl ToString) -> Self {
        let id = id.to_string();
        Self::not_found_with_context(
            format!("Scenario {} not found", id),
            ErrorContext::new(operation)
                .with_entity("scenario")
                .with_entity_id(id),
        )
    }

    /// NotFound for a satellite id.
    pub fn satellite_not_found(operation: &str, id: impl ToString) -> Self {
        let id = id.to_string();
        Self::not_found_with_context(
            format!("Satellite {} not found", id),
            ErrorContext::new(operation)
                .with_entity("satellite")
                .with_entity_id(id),
        )
    }

    /// ConstraintViolation for a reference to a scenario that does not exist.
    pub fn missing_owner(operation: &str, scenario_id: impl ToString) -> Self {
        let id = scenario_id.to_string();
        Self::constraint_with_context(
            format!("Owning scenario {} does not exist", id),
            ErrorContext::new(operation)
                .with_entity("scenario")
                .with_entity_id(id)
                .with_field("scenario_id"),
        )
    }

    /// ConstraintViolation for a `sat_id` already used within a scenario.
    pub fn duplicate_sat_id(operation: &str, scenario_id: impl ToString, sat_id: &str) -> Self {
        Self::constraint_with_context(
            format!(
                "sat_id '{}' already exists in scenario {}",
                sat_id,
                scenario_id.to_string()
            ),
            ErrorContext::new(operation)
                .with_entity("satellite")
                .with_field("sat_id"),
        )
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectivityError { context, .. } => context.retryable,
            Self::QueryError { context, .. } => context.retryable,
            Self::TransactionError { context, .. } => context.retryable,
            _ => false,
        }
    }

    /// Whether this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::DocumentParseError { context, .. } => context,
            Self::ValidationError { context, .. } => context,
            Self::ConstraintViolation { context, .. } => context,
            Self::ConnectivityError { context, .. } => context,
            Self::NotFound { context, .. } => context,
            Self::QueryError { context, .. } => context,
            Self::TransactionError { context, .. } => context,
            Self::ConfigurationError { context, .. } => context,
            Self::InternalError { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::DocumentParseError { context, .. }
            | Self::ValidationError { context, .. }
            | Self::ConstraintViolation { context, .. }
            | Self::ConnectivityError { context, .. }
            | Self::NotFound { context, .. }
            | Self::QueryError { context, .. }
            | Self::TransactionError { context, .. }
            | Self::ConfigurationError { context, .. }
            | Self::InternalError { context, .. } => context,
        }
    }

    /// Set the operation in the error context unless one is already recorded.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        let context = self.context_mut();
        if context.operation.is_none() {
            context.operation = Some(operation.into());
        }
        self
    }
}

#[cfg(feature = "postgres-repo")]
impl From<diesel::result::Error> for RepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::DatabaseErrorKind;

        match err {
            diesel::result::Error::NotFound => RepositoryError::not_found("Record not found"),
            diesel::result::Error::DatabaseError(kind, info) => {
                let message = info.message().to_string();
                let details = match info.constraint_name() {
                    Some(constraint) => {
                        format!("db_error_kind={:?}, constraint={}", kind, constraint)
                    }
                    None => format!("db_error_kind={:?}", kind),
                };
                let mut context = ErrorContext::default().with_details(details);
                if let Some(column) = info.column_name() {
                    context = context.with_field(column);
                }

                match kind {
                    DatabaseErrorKind::UniqueViolation
                    | DatabaseErrorKind::ForeignKeyViolation
                    | DatabaseErrorKind::CheckViolation
                    | DatabaseErrorKind::NotNullViolation => {
                        RepositoryError::ConstraintViolation { message, context }
                    }
                    // The store aborted the transaction; a new attempt may succeed.
                    DatabaseErrorKind::SerializationFailure
                    | DatabaseErrorKind::ClosedConnection => {
                        RepositoryError::connectivity_with_context(message, context)
                    }
                    _ => RepositoryError::QueryError { message, context },
                }
            }
            diesel::result::Error::BrokenTransactionManager
            | diesel::result::Error::RollbackTransaction
            | diesel::result::Error::AlreadyInTransaction
            | diesel::result::Error::NotInTransaction => {
                RepositoryError::transaction(err.to_string())
            }
            diesel::result::Error::RollbackErrorOnCommit {
                rollback_error,
                commit_error,
            } => RepositoryError::transaction(format!(
                "commit failed ({}) and rollback failed ({})",
                commit_error, rollback_error
            )),
            diesel::result::Error::QueryBuilderError(e) => {
                RepositoryError::query(format!("Query builder error: {}", e))
            }
            diesel::result::Error::DeserializationError(e) => {
                RepositoryError::internal(format!("Deserialization error: {}", e))
            }
            diesel::result::Error::SerializationError(e) => {
                RepositoryError::internal(format!("Serialization error: {}", e))
            }
            other => RepositoryError::query(other.to_string()),
        }
    }
}

#[cfg(feature = "postgres-repo")]
impl From<diesel::r2d2::PoolError> for RepositoryError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        RepositoryError::connectivity_with_context(
            err.to_string(),
            ErrorContext::default().with_details("pool_error"),
        )
    }
}
