//! Core of the account directory.
//! This crate owns every account invariant: username and email uniqueness,
//! id allocation, and credential-free output.

pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::account::{
    Account, AccountId, AccountInput, AccountList, Credential, Message, PublicAccount,
    ValidationError, ACCOUNT_DELETED_MESSAGE,
};
pub use service::account_manager::{
    AccountManager, Conflict, ConflictReporting, ManagerError, ManagerOptions, ManagerResult,
};
pub use store::{
    AccountStore, ConflictField, ListWindow, MemoryAccountStore, SqliteAccountStore, StoreError,
    StoreResult, WindowError, DEFAULT_LIST_LIMIT,
};

/// Root greeting served by the transport shell.
pub fn hello() -> Message {
    Message::new("Hello World")
}
