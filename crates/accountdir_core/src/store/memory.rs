//! Process-local account store.
//!
//! # Invariants
//! - One `RwLock` guards the whole account set; every write holds it in
//!   write mode across check-and-mutate.
//! - Accounts live in a `BTreeMap` keyed by id, so iteration is id order.
//! - Contents are lost when the store is dropped.

use super::{ensure_live_range, AccountStore, ConflictField, ListWindow, StoreError, StoreResult};
use crate::model::account::{Account, AccountId, AccountInput};
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug)]
struct MemoryState {
    next_id: AccountId,
    accounts: BTreeMap<AccountId, Account>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            next_id: 1,
            accounts: BTreeMap::new(),
        }
    }
}

impl MemoryState {
    fn conflict_with(
        &self,
        input: &AccountInput,
        exclude: Option<AccountId>,
    ) -> Option<ConflictField> {
        let others = || {
            self.accounts
                .values()
                .filter(move |account| Some(account.id) != exclude)
        };

        if others().any(|account| account.email == input.email) {
            return Some(ConflictField::Email);
        }
        if others().any(|account| account.username == input.username) {
            return Some(ConflictField::Username);
        }
        None
    }

    fn allocate_id(&mut self) -> StoreResult<AccountId> {
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or_else(|| StoreError::InvalidData("account id space exhausted".to_string()))?;
        Ok(id)
    }
}

/// In-memory `AccountStore` scoped to the lifetime of the value.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    state: RwLock<MemoryState>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl AccountStore for MemoryAccountStore {
    fn create(&self, input: &AccountInput) -> StoreResult<Account> {
        let mut state = self.write()?;

        if let Some(field) = state.conflict_with(input, None) {
            info!("event=account_create module=store backend=memory status=conflict field={field}");
            return Err(StoreError::Conflict(field));
        }

        let id = state.allocate_id()?;
        let now = now_epoch_ms();
        let account = Account {
            id,
            username: input.username.clone(),
            email: input.email.clone(),
            credential: input.credential.clone(),
            created_at: now,
            updated_at: now,
        };
        state.accounts.insert(id, account.clone());

        info!("event=account_create module=store backend=memory status=ok id={id}");
        Ok(account)
    }

    fn get(&self, id: AccountId) -> StoreResult<Account> {
        ensure_live_range(id)?;
        self.read()?
            .accounts
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn list(&self, window: ListWindow) -> StoreResult<Vec<Account>> {
        let state = self.read()?;
        let accounts: Vec<Account> = state
            .accounts
            .values()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .cloned()
            .collect();

        debug!(
            "event=account_list module=store backend=memory status=ok limit={} offset={} count={}",
            window.limit,
            window.offset,
            accounts.len()
        );
        Ok(accounts)
    }

    fn update(&self, id: AccountId, input: &AccountInput) -> StoreResult<Account> {
        ensure_live_range(id)?;
        let mut state = self.write()?;

        if !state.accounts.contains_key(&id) {
            return Err(StoreError::NotFound(id));
        }
        if let Some(field) = state.conflict_with(input, Some(id)) {
            info!(
                "event=account_update module=store backend=memory status=conflict id={id} field={field}"
            );
            return Err(StoreError::Conflict(field));
        }

        let account = state
            .accounts
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        account.username = input.username.clone();
        account.email = input.email.clone();
        account.credential = input.credential.clone();
        account.updated_at = now_epoch_ms().max(account.created_at);

        info!("event=account_update module=store backend=memory status=ok id={id}");
        Ok(account.clone())
    }

    fn delete(&self, id: AccountId) -> StoreResult<()> {
        ensure_live_range(id)?;
        let mut state = self.write()?;

        if state.accounts.remove(&id).is_none() {
            return Err(StoreError::NotFound(id));
        }

        info!("event=account_delete module=store backend=memory status=ok id={id}");
        Ok(())
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::MemoryAccountStore;
    use crate::model::account::AccountInput;
    use crate::store::{AccountStore, ConflictField, ListWindow, StoreError};

    #[test]
    fn ids_are_not_reused_after_delete() {
        let store = MemoryAccountStore::new();
        let first = store
            .create(&AccountInput::new("a", "a@example.com", "x"))
            .unwrap();
        store.delete(first.id).unwrap();

        let second = store
            .create(&AccountInput::new("a", "a@example.com", "x"))
            .unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[test]
    fn update_against_self_is_not_a_conflict() {
        let store = MemoryAccountStore::new();
        let created = store
            .create(&AccountInput::new("john", "john@example.com", "x"))
            .unwrap();

        let updated = store
            .update(created.id, &AccountInput::new("john", "john@example.com", "y"))
            .unwrap();
        assert_eq!(updated.credential.expose(), "y");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn conflict_reports_email_before_username() {
        let store = MemoryAccountStore::new();
        store
            .create(&AccountInput::new("john", "john@example.com", "x"))
            .unwrap();

        let err = store
            .create(&AccountInput::new("john", "john@example.com", "x"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ConflictField::Email)));
        assert_eq!(store.list(ListWindow::default()).unwrap().len(), 1);
    }

    #[test]
    fn non_positive_ids_are_not_found() {
        let store = MemoryAccountStore::new();
        for id in [0, -1, i64::MIN] {
            assert!(matches!(store.get(id), Err(StoreError::NotFound(found)) if found == id));
        }
    }
}
