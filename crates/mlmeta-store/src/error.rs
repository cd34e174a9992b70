use thiserror::Error;

/// The entity level an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Model,
    Hyperparameters,
    Checkpoint,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::Hyperparameters => write!(f, "hyperparameters"),
            Self::Checkpoint => write!(f, "checkpoint"),
        }
    }
}

/// Errors from repository storage operations.
///
/// Every failing operation returns exactly one of these; no partial
/// mutation survives a failure. Transport layers map on [`ErrorKind`]
/// rather than on variants, since the `Backend` payload is opaque.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The referenced entity, or a required ancestor, does not exist.
    #[error("{kind} {id:?} does not exist")]
    NotExist { kind: EntityKind, id: String },

    /// Creation conflict: the identity is already taken.
    #[error("{kind} {id:?} already exists")]
    Exists { kind: EntityKind, id: String },

    /// A caller-supplied id fails the identifier charset rules.
    #[error("invalid identifier {id:?}")]
    InvalidId { id: String },

    /// A child scope was queried without its required parent scope.
    #[error("hierarchy violation: {0}")]
    HierarchyViolation(String),

    /// A persisted document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O failure from the underlying object store, propagated unchanged.
    #[error("object store error: {0}")]
    Backend(#[from] object_store::Error),
}

/// The taxonomy of storage failures, detached from error payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotExist,
    Exists,
    InvalidId,
    HierarchyViolation,
    Serialization,
    Backend,
}

impl StorageError {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotExist { .. } => ErrorKind::NotExist,
            Self::Exists { .. } => ErrorKind::Exists,
            Self::InvalidId { .. } => ErrorKind::InvalidId,
            Self::HierarchyViolation(_) => ErrorKind::HierarchyViolation,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Backend(_) => ErrorKind::Backend,
        }
    }

    pub fn not_exist(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotExist {
            kind,
            id: id.into(),
        }
    }

    pub fn already_exists(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::Exists {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId { id: id.into() }
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
