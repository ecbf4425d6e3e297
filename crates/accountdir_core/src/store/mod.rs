//! Account store contract and its implementations.
//!
//! # Responsibility
//! - Hold the authoritative live account set and allocate ids.
//! - Own uniqueness enforcement as one indivisible check-and-mutate step.
//!
//! # Invariants
//! - No two live accounts share a `username` or an `email`.
//! - Ids start at 1, grow monotonically and are never reused.
//! - Conflicts are checked email first, then username.
//! - A failed create/update leaves the store unchanged.

use crate::db::DbError;
use crate::model::account::{Account, AccountId, AccountInput};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod sqlite;

pub use memory::MemoryAccountStore;
pub use sqlite::SqliteAccountStore;

/// Page size applied when a caller does not ask for one.
pub const DEFAULT_LIST_LIMIT: u32 = 10;

pub type StoreResult<T> = Result<T, StoreError>;

/// Account field whose uniqueness a write would violate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictField {
    Email,
    Username,
}

impl ConflictField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Username => "username",
        }
    }
}

impl Display for ConflictField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store-level failure.
///
/// `NotFound` and `Conflict` are expected domain outcomes; every other
/// variant is an infrastructure failure of a concrete backend.
#[derive(Debug)]
pub enum StoreError {
    NotFound(AccountId),
    Conflict(ConflictField),
    Db(DbError),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
    LockPoisoned,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "account not found: {id}"),
            Self::Conflict(field) => write!(f, "account {field} already exists"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "account database is not migrated: expected schema version {expected_version}, found {actual_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted account data: {message}"),
            Self::LockPoisoned => write!(f, "account store lock poisoned"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Validated offset/limit window for `AccountStore::list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListWindow {
    pub limit: u32,
    pub offset: u32,
}

impl Default for ListWindow {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl ListWindow {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    /// Builds a window from untrusted signed input, applying defaults.
    ///
    /// Negative values are rejected; values above `u32::MAX` saturate.
    pub fn from_signed(limit: Option<i64>, offset: Option<i64>) -> Result<Self, WindowError> {
        let limit = match limit {
            Some(value) if value < 0 => return Err(WindowError::NegativeLimit(value)),
            Some(value) => u32::try_from(value).unwrap_or(u32::MAX),
            None => DEFAULT_LIST_LIMIT,
        };
        let offset = match offset {
            Some(value) if value < 0 => return Err(WindowError::NegativeOffset(value)),
            Some(value) => u32::try_from(value).unwrap_or(u32::MAX),
            None => 0,
        };
        Ok(Self { limit, offset })
    }
}

/// Rejected list window input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowError {
    NegativeLimit(i64),
    NegativeOffset(i64),
}

impl Display for WindowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativeLimit(value) => write!(f, "limit must not be negative, got {value}"),
            Self::NegativeOffset(value) => write!(f, "offset must not be negative, got {value}"),
        }
    }
}

impl Error for WindowError {}

/// Authoritative account storage.
///
/// Implementations serialize writes against each other and against the
/// uniqueness checks they perform, and are shareable across threads.
pub trait AccountStore: Send + Sync {
    /// Inserts a new account under the next id, or reports the first conflict.
    fn create(&self, input: &AccountInput) -> StoreResult<Account>;
    /// Point lookup by id.
    fn get(&self, id: AccountId) -> StoreResult<Account>;
    /// Accounts in ascending id order within `window`.
    fn list(&self, window: ListWindow) -> StoreResult<Vec<Account>>;
    /// Replaces every field except `id` and `created_at`.
    fn update(&self, id: AccountId, input: &AccountInput) -> StoreResult<Account>;
    /// Removes the account permanently.
    fn delete(&self, id: AccountId) -> StoreResult<()>;
}

impl<S: AccountStore + ?Sized> AccountStore for Box<S> {
    fn create(&self, input: &AccountInput) -> StoreResult<Account> {
        (**self).create(input)
    }

    fn get(&self, id: AccountId) -> StoreResult<Account> {
        (**self).get(id)
    }

    fn list(&self, window: ListWindow) -> StoreResult<Vec<Account>> {
        (**self).list(window)
    }

    fn update(&self, id: AccountId, input: &AccountInput) -> StoreResult<Account> {
        (**self).update(id, input)
    }

    fn delete(&self, id: AccountId) -> StoreResult<()> {
        (**self).delete(id)
    }
}

/// Ids at or below zero are never allocated, so they can never be live.
fn ensure_live_range(id: AccountId) -> StoreResult<()> {
    if id <= 0 {
        return Err(StoreError::NotFound(id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ListWindow, WindowError, DEFAULT_LIST_LIMIT};

    #[test]
    fn window_defaults_to_first_page() {
        let window = ListWindow::from_signed(None, None).unwrap();
        assert_eq!(window, ListWindow::new(DEFAULT_LIST_LIMIT, 0));
        assert_eq!(window, ListWindow::default());
    }

    #[test]
    fn window_rejects_negative_values() {
        assert_eq!(
            ListWindow::from_signed(Some(-1), None),
            Err(WindowError::NegativeLimit(-1))
        );
        assert_eq!(
            ListWindow::from_signed(Some(5), Some(-3)),
            Err(WindowError::NegativeOffset(-3))
        );
    }

    #[test]
    fn window_saturates_oversized_values() {
        let window = ListWindow::from_signed(Some(i64::MAX), Some(2)).unwrap();
        assert_eq!(window.limit, u32::MAX);
        assert_eq!(window.offset, 2);
    }
}
