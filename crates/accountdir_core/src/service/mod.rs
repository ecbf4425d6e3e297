//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into request-shaped account operations.
//! - Keep the transport shell decoupled from storage details.

pub mod account_manager;
