//! Account records, input and output shapes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").expect("valid email regex"));

/// Store-assigned account identifier. Live ids are always positive.
pub type AccountId = i64;

/// Acknowledgement text returned by a successful delete.
pub const ACCOUNT_DELETED_MESSAGE: &str = "Account deleted successfully";

/// Write-only secret attached to an account.
///
/// Deliberately not `Serialize`; `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw credential text, for persistence only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Authoritative account record as held by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Assigned at create, never mutated, never reused.
    pub id: AccountId,
    /// Unique across all live accounts.
    pub username: String,
    /// Unique across all live accounts.
    pub email: String,
    pub credential: Credential,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds. Refreshed by every update.
    pub updated_at: i64,
}

/// Fields supplied by a create or full update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInput {
    pub username: String,
    pub email: String,
    pub credential: Credential,
}

impl AccountInput {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        credential: impl Into<Credential>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            credential: credential.into(),
        }
    }

    /// Checks syntactic well-formedness before the input reaches a manager.
    ///
    /// Stores never call this; uniqueness is their concern, syntax is the
    /// caller's.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty() {
            return Err(ValidationError::EmptyUsername);
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::EmptyEmail);
        }
        if !EMAIL_RE.is_match(&self.email) {
            return Err(ValidationError::InvalidEmail(self.email.clone()));
        }
        Ok(())
    }
}

/// Syntactic input error detected before any store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyUsername,
    EmptyEmail,
    InvalidEmail(String),
}

impl ValidationError {
    /// Name of the offending input field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyUsername => "username",
            Self::EmptyEmail | Self::InvalidEmail(_) => "email",
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUsername => write!(f, "username must not be empty"),
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::InvalidEmail(value) => write!(f, "`{value}` is not a valid email address"),
        }
    }
}

impl Error for ValidationError {}

/// Credential-free account view; the only account shape that is serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAccount {
    pub id: AccountId,
    pub username: String,
    pub email: String,
}

impl From<&Account> for PublicAccount {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
        }
    }
}

impl From<Account> for PublicAccount {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
        }
    }
}

/// List envelope, serialized as `{"accounts": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountList {
    pub accounts: Vec<PublicAccount>,
}

/// Plain acknowledgement envelope, serialized as `{"message": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
