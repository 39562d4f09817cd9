//! Error types shared by the stores, the credit lifecycle and the directory.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::entities::RefusedTransition;

/// Failures of the SQLite-backed stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database handle poisoned by a panicked request")]
    Poisoned,

    #[error("corrupt row in {table}: {detail}")]
    Corrupt { table: &'static str, detail: String },
}

/// How an error is classified for callers. Each kind maps to one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidStateTransition,
    DependencyUnavailable,
    Internal,
}

/// Everything the credit lifecycle can refuse or fail with.
#[derive(Error, Debug)]
pub enum CreditError {
    #[error(
        "requested amount {0} is invalid: it must be between 100000 and 50000000 with at most 2 decimal places"
    )]
    InvalidAmount(Decimal),

    #[error("term of {0} months is out of range: it must be between 6 and 60 months")]
    InvalidTerm(i64),

    #[error("a rejection reason is required")]
    MissingReason,

    #[error("customer {0} does not exist")]
    UnknownCustomer(i64),

    #[error("credit application {0} not found")]
    NotFound(i64),

    #[error("{0}")]
    InvalidStateTransition(RefusedTransition),

    #[error("client directory unavailable: {0}")]
    DependencyUnavailable(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CreditError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CreditError::InvalidAmount(_)
            | CreditError::InvalidTerm(_)
            | CreditError::MissingReason
            // the caller supplied a customer id that does not resolve
            | CreditError::UnknownCustomer(_) => ErrorKind::Validation,
            CreditError::NotFound(_) => ErrorKind::NotFound,
            CreditError::InvalidStateTransition(_) => ErrorKind::InvalidStateTransition,
            CreditError::DependencyUnavailable(_) => ErrorKind::DependencyUnavailable,
            CreditError::Store(_) => ErrorKind::Internal,
        }
    }
}

impl From<RefusedTransition> for CreditError {
    fn from(refused: RefusedTransition) -> Self {
        CreditError::InvalidStateTransition(refused)
    }
}

/// Failures of the client directory service.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("customer {0} not found")]
    NotFound(i64),

    #[error("a customer with identity number {0} already exists")]
    DuplicateIdentityNumber(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DirectoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DirectoryError::NotFound(_) => ErrorKind::NotFound,
            DirectoryError::DuplicateIdentityNumber(_) => ErrorKind::Validation,
            DirectoryError::Store(_) => ErrorKind::Internal,
        }
    }
}
