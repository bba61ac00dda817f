//! Error kinds surfaced by every tender and bid operation
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// The kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Tender,
    Bid,
    Version,
    Organization,
    User,
}

/// Closed classification callers switch on when mapping failures outward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    NotAuthorized,
    NotAuthor,
    ValidationFailed,
    Conflict,
    StorageFailure,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },
    #[error("not authorized: {0}")]
    NotAuthorized(String),
    #[error("user {0} is not the author of this bid")]
    NotAuthor(String),
    #[error("invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: ValidationError,
    },
    #[error("version conflict: {0}")]
    Conflict(String),
    #[error("storage failure: {0}")]
    Storage(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("must not be empty")]
    Empty,
    #[error("length {actual} exceeds the limit of {max}")]
    ExceededLength { max: usize, actual: usize },
    #[error("status is not allowed for a new record")]
    InvalidInitialStatus,
    #[error("unknown value {0:?}")]
    UnknownValue(String),
    #[error("cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("entity is in the terminal status {0}")]
    TerminalState(String),
    #[error("no fields were supplied")]
    NothingToUpdate,
    #[error("limit must be between 1 and {max}")]
    InvalidPage { max: u32 },
    #[error("tender is closed")]
    TenderClosed,
    #[error("versions start at 1")]
    InvalidVersion,
    #[error("{0} is already taken")]
    AlreadyExists(String),
}

impl Error {
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid(field: &'static str, reason: ValidationError) -> Self {
        Error::Validation { field, reason }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::NotAuthorized(_) => ErrorKind::NotAuthorized,
            Error::NotAuthor(_) => ErrorKind::NotAuthor,
            Error::Validation { .. } => ErrorKind::ValidationFailed,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Storage(_) => ErrorKind::StorageFailure,
        }
    }

    /// Only conflicts and storage failures can succeed on a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Conflict | ErrorKind::StorageFailure
        )
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Entity::Tender => "tender",
            Entity::Bid => "bid",
            Entity::Version => "version",
            Entity::Organization => "organization",
            Entity::User => "user",
        };
        f.write_str(name)
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<sled::transaction::UnabortableTransactionError> for Error {
    fn from(err: sled::transaction::UnabortableTransactionError) -> Self {
        use sled::transaction::UnabortableTransactionError as Tx;
        match err {
            Tx::Conflict => Error::Conflict("concurrent transaction touched the same keys".into()),
            Tx::Storage(err) => err.into(),
        }
    }
}

impl From<minicbor::decode::Error> for Error {
    fn from(err: minicbor::decode::Error) -> Self {
        Error::Storage(format!("corrupt record: {err}"))
    }
}

impl<E: fmt::Display> From<minicbor::encode::Error<E>> for Error {
    fn from(err: minicbor::encode::Error<E>) -> Self {
        Error::Storage(format!("failed to encode record: {err}"))
    }
}
