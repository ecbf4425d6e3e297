use accountdir_core::db::migrations::latest_version;
use accountdir_core::db::open_db;
use accountdir_core::{AccountInput, AccountStore, ListWindow, SqliteAccountStore, StoreError};
use rusqlite::Connection;

#[test]
fn store_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteAccountStore::try_new(conn) {
        Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn store_rejects_connection_without_accounts_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteAccountStore::try_new(conn);
    assert!(matches!(
        result,
        Err(StoreError::MissingRequiredTable("accounts"))
    ));
}

#[test]
fn store_rejects_accounts_table_missing_credential_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteAccountStore::try_new(conn);
    assert!(matches!(
        result,
        Err(StoreError::MissingRequiredColumn {
            table: "accounts",
            column: "credential"
        })
    ));
}

#[test]
fn accounts_survive_reopen_and_ids_stay_retired() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("accounts.db");

    {
        let store = SqliteAccountStore::open(&path).unwrap();
        store
            .create(&AccountInput::new("john", "john@example.com", "secret"))
            .unwrap();
        store
            .create(&AccountInput::new("jane", "jane@example.com", "secret"))
            .unwrap();
        store.delete(2).unwrap();
    }

    let store = SqliteAccountStore::open(&path).unwrap();
    let accounts = store.list(ListWindow::default()).unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].username, "john");
    assert_eq!(accounts[0].credential.expose(), "secret");

    let next = store
        .create(&AccountInput::new("jane", "jane@example.com", "secret"))
        .unwrap();
    assert_eq!(next.id, 3);
}

#[test]
fn store_wraps_connection_from_open_db() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_db(dir.path().join("wrapped.db")).unwrap();

    let store = SqliteAccountStore::try_new(conn).unwrap();
    assert!(store.list(ListWindow::default()).unwrap().is_empty());
}
