use std::fmt;
use thiserror::Error;

/// Failures raised by a storage backend while executing a statement.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbError {
    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl<T> From<std::sync::PoisonError<T>> for DbError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

/// Reason a permission gate refused a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Denial {
    /// No actor is authenticated for the request.
    NoActor,
    /// The actor lacks the administrator role.
    NotAdministrator,
    /// The actor lacks the worker role.
    NotWorker,
    /// The actor did not create the record.
    NotCreator,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActor => write!(f, "no authenticated actor"),
            Self::NotAdministrator => write!(f, "actor is not an administrator"),
            Self::NotWorker => write!(f, "actor is not a worker"),
            Self::NotCreator => write!(f, "actor is not the creator of the record"),
        }
    }
}

/// Errors surfaced by object-layer operations.
///
/// Lookups that find nothing are not errors: they return `Ok(None)` or an
/// empty vector.
#[derive(Error, Debug)]
pub enum ObjectError {
    #[error("Unknown field '{field}' on {entity}")]
    UnknownField { entity: &'static str, field: String },

    #[error("Invalid value for {entity}.{field}: {reason}")]
    InvalidValue {
        entity: &'static str,
        field: String,
        reason: String,
    },

    #[error("Invalid schema for {entity}: {reason}")]
    InvalidSchema { entity: &'static str, reason: String },

    #[error("{entity} is keyed by a composite key and has no single id")]
    NoPrimaryKey { entity: &'static str },

    #[error("{entity} has not been created yet")]
    NotPersisted { entity: &'static str },

    #[error("{entity} has already been created")]
    AlreadyPersisted { entity: &'static str },

    #[error("{entity} row {key} no longer exists")]
    RowMissing { entity: &'static str, key: String },

    #[error("Permission denied on {entity}: {denial}")]
    PermissionDenied { entity: &'static str, denial: Denial },

    #[error("Dependency '{0}' is already injected")]
    DependencyAlreadyInjected(String),

    #[error("Dependency name must not be empty")]
    UnnamedDependency,

    #[error("Dependency '{name}' could not be resolved: {reason}")]
    DependencyUnresolved { name: String, reason: String },

    #[error("Missing configuration key '{0}'")]
    MissingConfig(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Demo data for {entity} is malformed: {reason}")]
    DemoData { entity: &'static str, reason: String },

    #[error("Backend failure: {0}")]
    Backend(#[from] DbError),
}

impl ObjectError {
    /// Caller misuse: unknown fields, bad declarations, misconfigured
    /// dependencies. Never produced by the backend.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::UnknownField { .. }
                | Self::InvalidValue { .. }
                | Self::InvalidSchema { .. }
                | Self::NoPrimaryKey { .. }
                | Self::NotPersisted { .. }
                | Self::AlreadyPersisted { .. }
                | Self::DependencyAlreadyInjected(_)
                | Self::UnnamedDependency
                | Self::MissingConfig(_)
                | Self::InvalidConfig(_)
                | Self::DemoData { .. }
        )
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    /// Returns the denial reason when this is a permission refusal.
    pub fn denial(&self) -> Option<Denial> {
        match self {
            Self::PermissionDenied { denial, .. } => Some(*denial),
            _ => None,
        }
    }
}

pub type ObjectResult<T> = std::result::Result<T, ObjectError>;
