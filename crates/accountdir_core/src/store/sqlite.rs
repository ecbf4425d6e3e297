//! SQLite-backed account store.
//!
//! # Responsibility
//! - Persist accounts in the `accounts` table created by migration 0001.
//! - Keep SQL details inside the store boundary.
//!
//! # Invariants
//! - Every write runs in an `IMMEDIATE` transaction on the single guarded
//!   connection, so check-and-mutate is indivisible.
//! - `AUTOINCREMENT` keeps deleted ids retired for the life of the file.
//! - `UNIQUE` constraint failures surface as the same field-level conflict
//!   as the explicit check.

use super::{ensure_live_range, AccountStore, ConflictField, ListWindow, StoreError, StoreResult};
use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::account::{Account, AccountId, AccountInput, Credential};
use log::{debug, info};
use rusqlite::{params, Connection, ErrorCode, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const ACCOUNTS_TABLE: &str = "accounts";
const REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "username",
    "email",
    "credential",
    "created_at",
    "updated_at",
];

const ACCOUNT_SELECT_SQL: &str = "SELECT
    id,
    username,
    email,
    credential,
    created_at,
    updated_at
FROM accounts";

/// Durable `AccountStore` over one migrated SQLite connection.
pub struct SqliteAccountStore {
    conn: Mutex<Connection>,
}

impl SqliteAccountStore {
    /// Wraps a migrated connection after verifying the account schema.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens (or creates) a database file, migrates it and wraps it.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a fresh in-memory database; contents die with the store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

impl AccountStore for SqliteAccountStore {
    fn create(&self, input: &AccountInput) -> StoreResult<Account> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(field) = find_conflict(&tx, input, None)? {
            info!("event=account_create module=store backend=sqlite status=conflict field={field}");
            return Err(StoreError::Conflict(field));
        }

        tx.execute(
            "INSERT INTO accounts (username, email, credential) VALUES (?1, ?2, ?3);",
            params![
                input.username.as_str(),
                input.email.as_str(),
                input.credential.expose(),
            ],
        )
        .map_err(map_write_error)?;
        let id = tx.last_insert_rowid();
        let account = fetch_account(&tx, id)?.ok_or_else(|| {
            StoreError::InvalidData(format!("created account {id} not found in read-back"))
        })?;
        tx.commit()?;

        info!("event=account_create module=store backend=sqlite status=ok id={id}");
        Ok(account)
    }

    fn get(&self, id: AccountId) -> StoreResult<Account> {
        ensure_live_range(id)?;
        let conn = self.lock()?;
        fetch_account(&conn, id)?.ok_or(StoreError::NotFound(id))
    }

    fn list(&self, window: ListWindow) -> StoreResult<Vec<Account>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{ACCOUNT_SELECT_SQL} ORDER BY id ASC LIMIT ?1 OFFSET ?2;"
        ))?;
        let mut rows = stmt.query(params![i64::from(window.limit), i64::from(window.offset)])?;

        let mut accounts = Vec::new();
        while let Some(row) = rows.next()? {
            accounts.push(parse_account_row(row)?);
        }

        debug!(
            "event=account_list module=store backend=sqlite status=ok limit={} offset={} count={}",
            window.limit,
            window.offset,
            accounts.len()
        );
        Ok(accounts)
    }

    fn update(&self, id: AccountId, input: &AccountInput) -> StoreResult<Account> {
        ensure_live_range(id)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if fetch_account(&tx, id)?.is_none() {
            return Err(StoreError::NotFound(id));
        }
        if let Some(field) = find_conflict(&tx, input, Some(id))? {
            info!(
                "event=account_update module=store backend=sqlite status=conflict id={id} field={field}"
            );
            return Err(StoreError::Conflict(field));
        }

        tx.execute(
            "UPDATE accounts
             SET
                username = ?2,
                email = ?3,
                credential = ?4,
                updated_at = MAX(created_at, strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id,
                input.username.as_str(),
                input.email.as_str(),
                input.credential.expose(),
            ],
        )
        .map_err(map_write_error)?;
        let account = fetch_account(&tx, id)?.ok_or_else(|| {
            StoreError::InvalidData(format!("updated account {id} not found in read-back"))
        })?;
        tx.commit()?;

        info!("event=account_update module=store backend=sqlite status=ok id={id}");
        Ok(account)
    }

    fn delete(&self, id: AccountId) -> StoreResult<()> {
        ensure_live_range(id)?;
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM accounts WHERE id = ?1;", [id])?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }

        info!("event=account_delete module=store backend=sqlite status=ok id={id}");
        Ok(())
    }
}

fn ensure_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version > expected_version {
        return Err(StoreError::Db(DbError::UnsupportedSchemaVersion {
            db_version: actual_version,
            latest_supported: expected_version,
        }));
    }
    if actual_version < expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
        );",
        [ACCOUNTS_TABLE],
        |row| row.get(0),
    )?;
    if !table_exists {
        return Err(StoreError::MissingRequiredTable(ACCOUNTS_TABLE));
    }

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({ACCOUNTS_TABLE});"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|required| !columns.iter().any(|column| column == *required))
    {
        return Err(StoreError::MissingRequiredColumn {
            table: ACCOUNTS_TABLE,
            column: *missing,
        });
    }

    Ok(())
}

/// Email is checked before username; `exclude` skips the account being updated.
fn find_conflict(
    conn: &Connection,
    input: &AccountInput,
    exclude: Option<AccountId>,
) -> StoreResult<Option<ConflictField>> {
    // 0 is never allocated, so it excludes nothing.
    let exclude = exclude.unwrap_or(0);
    let checks = [
        (ConflictField::Email, "email", input.email.as_str()),
        (ConflictField::Username, "username", input.username.as_str()),
    ];

    for (field, column, value) in checks {
        let taken: bool = conn.query_row(
            &format!(
                "SELECT EXISTS(
                    SELECT 1 FROM accounts WHERE {column} = ?1 AND id != ?2
                );"
            ),
            params![value, exclude],
            |row| row.get(0),
        )?;
        if taken {
            return Ok(Some(field));
        }
    }

    Ok(None)
}

fn fetch_account(conn: &Connection, id: AccountId) -> StoreResult<Option<Account>> {
    let mut stmt = conn.prepare(&format!("{ACCOUNT_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_account_row(row)?)),
        None => Ok(None),
    }
}

fn parse_account_row(row: &Row<'_>) -> StoreResult<Account> {
    let id: AccountId = row.get("id")?;
    if id <= 0 {
        return Err(StoreError::InvalidData(format!(
            "non-positive id `{id}` in accounts.id"
        )));
    }

    Ok(Account {
        id,
        username: row.get("username")?,
        email: row.get("email")?,
        credential: Credential::new(row.get::<_, String>("credential")?),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn map_write_error(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            if message.contains("accounts.email") {
                return StoreError::Conflict(ConflictField::Email);
            }
            if message.contains("accounts.username") {
                return StoreError::Conflict(ConflictField::Username);
            }
        }
    }
    StoreError::from(err)
}
