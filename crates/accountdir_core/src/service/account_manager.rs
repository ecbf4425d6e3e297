//! Account lifecycle manager.
//!
//! # Responsibility
//! - Map create/read/list/update/delete requests onto an `AccountStore`.
//! - Translate store conflicts into caller-facing conflict messages.
//! - Strip the credential from every account it returns.
//!
//! # Invariants
//! - The manager holds no account copies between calls.
//! - Every returned account is a `PublicAccount`.
//! - Zero, negative and unknown ids all surface as `NotFound`.

use crate::model::account::{
    AccountId, AccountInput, AccountList, Message, PublicAccount, ACCOUNT_DELETED_MESSAGE,
};
use crate::store::{AccountStore, ConflictField, ListWindow, StoreError};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// How a store conflict is worded back to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictReporting {
    /// Name the colliding field.
    Precise,
    /// Report "Username or Email already exists" whatever collided.
    #[default]
    Combined,
}

/// Manager behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerOptions {
    /// Wording for update conflicts. Create conflicts are always precise.
    pub update_conflicts: ConflictReporting,
}

/// Caller-facing uniqueness conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    Email,
    Username,
    UsernameOrEmail,
}

impl Conflict {
    pub fn message(self) -> &'static str {
        match self {
            Self::Email => "Email already exists",
            Self::Username => "Username already exists",
            Self::UsernameOrEmail => "Username or Email already exists",
        }
    }

    fn reported(field: ConflictField, reporting: ConflictReporting) -> Self {
        match (reporting, field) {
            (ConflictReporting::Combined, _) => Self::UsernameOrEmail,
            (ConflictReporting::Precise, ConflictField::Email) => Self::Email,
            (ConflictReporting::Precise, ConflictField::Username) => Self::Username,
        }
    }
}

/// Manager outcome other than success.
#[derive(Debug)]
pub enum ManagerError {
    /// No live account has this id.
    NotFound(AccountId),
    /// The write would break username or email uniqueness.
    Conflict(Conflict),
    /// Backend failure unrelated to the request itself.
    Store(StoreError),
}

impl ManagerError {
    /// Text the transport shell puts in its `detail` field.
    pub fn detail(&self) -> String {
        match self {
            Self::NotFound(_) => "Account not found".to_string(),
            Self::Conflict(conflict) => conflict.message().to_string(),
            Self::Store(_) => "Internal store error".to_string(),
        }
    }
}

impl Display for ManagerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "account not found: {id}"),
            Self::Conflict(conflict) => f.write_str(conflict.message()),
            Self::Store(err) => write!(f, "account store failure: {err}"),
        }
    }
}

impl Error for ManagerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;

/// Request-shaped facade over an `AccountStore`.
pub struct AccountManager<S: AccountStore> {
    store: S,
    options: ManagerOptions,
}

impl<S: AccountStore> AccountManager<S> {
    /// Creates a manager with default options.
    pub fn new(store: S) -> Self {
        Self::with_options(store, ManagerOptions::default())
    }

    pub fn with_options(store: S, options: ManagerOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> ManagerOptions {
        self.options
    }

    /// Borrow of the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates an account; conflicts always name the colliding field.
    pub fn create_account(&self, input: &AccountInput) -> ManagerResult<PublicAccount> {
        self.store
            .create(input)
            .map(PublicAccount::from)
            .map_err(|err| translate("account_create", err, ConflictReporting::Precise))
    }

    /// Lists accounts in store order within `window`.
    pub fn list_accounts(&self, window: ListWindow) -> ManagerResult<AccountList> {
        let accounts = self
            .store
            .list(window)
            .map_err(|err| translate("account_list", err, ConflictReporting::Precise))?;

        Ok(AccountList {
            accounts: accounts.into_iter().map(PublicAccount::from).collect(),
        })
    }

    pub fn get_account(&self, id: AccountId) -> ManagerResult<PublicAccount> {
        self.store
            .get(id)
            .map(PublicAccount::from)
            .map_err(|err| translate("account_get", err, ConflictReporting::Precise))
    }

    /// Replaces every field but the id; conflict wording follows
    /// `ManagerOptions::update_conflicts`.
    pub fn update_account(
        &self,
        id: AccountId,
        input: &AccountInput,
    ) -> ManagerResult<PublicAccount> {
        self.store
            .update(id, input)
            .map(PublicAccount::from)
            .map_err(|err| translate("account_update", err, self.options.update_conflicts))
    }

    pub fn delete_account(&self, id: AccountId) -> ManagerResult<Message> {
        self.store
            .delete(id)
            .map(|()| Message::new(ACCOUNT_DELETED_MESSAGE))
            .map_err(|err| translate("account_delete", err, ConflictReporting::Precise))
    }
}

fn translate(event: &str, err: StoreError, reporting: ConflictReporting) -> ManagerError {
    match err {
        StoreError::NotFound(id) => {
            info!("event={event} module=manager status=not_found id={id}");
            ManagerError::NotFound(id)
        }
        StoreError::Conflict(field) => {
            let conflict = Conflict::reported(field, reporting);
            info!(
                "event={event} module=manager status=conflict field={field} reporting={reporting:?}"
            );
            ManagerError::Conflict(conflict)
        }
        other => {
            error!("event={event} module=manager status=error error={other}");
            ManagerError::Store(other)
        }
    }
}
