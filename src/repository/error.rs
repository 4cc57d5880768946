//! Error vocabulary for repository operations, grounded on the teacher's
//! `db::repository::error::RepositoryError` / `ErrorContext` split.

use std::fmt;
use thiserror::Error;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub operation: Option<String>,
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    pub retryable: bool,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(op) = &self.operation {
            parts.push(format!("operation={op}"));
        }
        if let Some(entity) = &self.entity {
            parts.push(format!("entity={entity}"));
        }
        if let Some(id) = &self.entity_id {
            parts.push(format!("id={id}"));
        }
        if self.retryable {
            parts.push("retryable=true".to_string());
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("connection error: {message} {context}")]
    Connection { message: String, context: ErrorContext },

    #[error("not found: {message} {context}")]
    NotFound { message: String, context: ErrorContext },

    #[error("validation error: {message} {context}")]
    Validation { message: String, context: ErrorContext },

    /// Optimistic-concurrency conflict on `(userId, date)` — retryable.
    #[error("serialization error: {message} {context}")]
    Serialization { message: String, context: ErrorContext },

    #[error("transaction error: {message} {context}")]
    Transaction { message: String, context: ErrorContext },

    #[error("configuration error: {message} {context}")]
    Configuration { message: String, context: ErrorContext },

    #[error("internal error: {message} {context}")]
    Internal { message: String, context: ErrorContext },
}

impl RepositoryError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn not_found_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::NotFound {
            message: message.into(),
            context,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
            context: ErrorContext::default().retryable(),
        }
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { context, .. }
            | Self::Serialization { context, .. }
            | Self::Transaction { context, .. } => context.retryable,
            _ => false,
        }
    }
}

#[cfg(feature = "postgres-repo")]
impl From<diesel::result::Error> for RepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => RepositoryError::not_found("record not found"),
            diesel::result::Error::DatabaseError(kind, info) => {
                let retryable = matches!(
                    kind,
                    diesel::result::DatabaseErrorKind::SerializationFailure
                );
                let context = ErrorContext::default();
                let context = if retryable { context.retryable() } else { context };
                if retryable {
                    RepositoryError::Serialization {
                        message: info.message().to_string(),
                        context,
                    }
                } else {
                    RepositoryError::Internal {
                        message: info.message().to_string(),
                        context,
                    }
                }
            }
            other => RepositoryError::internal(other.to_string()),
        }
    }
}

#[cfg(feature = "postgres-repo")]
impl From<diesel::r2d2::PoolError> for RepositoryError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        RepositoryError::Connection {
            message: err.to_string(),
            context: ErrorContext::default().retryable(),
        }
    }
}
