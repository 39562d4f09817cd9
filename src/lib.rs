// Credit Registry - Core Library
// Shared by the credit service, the client directory, the CLI and the tests

pub mod api;
pub mod config;
pub mod db;
pub mod directory;
pub mod entities;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod validation;
pub mod verification;

// Re-export commonly used types
pub use api::{credit_app, directory_app, ApiError, ApiResponse};
pub use config::{Environment, ServiceConfig};
pub use db::{CreditStore, CustomerStore, Database};
pub use directory::CustomerDirectory;
pub use entities::{
    CreditAction, CreditApplication, CreditStatus, Customer, CustomerSnapshot, CustomerUpdate,
    NewCustomer,
};
pub use error::{CreditError, DirectoryError, ErrorKind, StoreError};
pub use lifecycle::{CreatedCredit, CreditLifecycle, CreditRequest};
pub use verification::{
    ClientVerifier, HttpClientVerifier, VerificationOutcome, DEFAULT_VERIFY_TIMEOUT,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
