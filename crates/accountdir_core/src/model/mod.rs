//! Account directory domain model.
//!
//! # Responsibility
//! - Define the stored account record and its credential-free public view.
//! - Provide shell-side syntactic validation of account input.
//!
//! # Invariants
//! - `PublicAccount` has no credential field; the credential cannot leak
//!   through serialization.
//! - `Account` does not implement `Serialize`.

pub mod account;
