//! Command-line surface of the account directory.

use crate::request::{AccountFields, Request};
use accountdir_core::{default_log_level, AccountId};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `accountdir` arguments.
#[derive(Debug, Parser)]
#[command(
    name = "accountdir",
    about = "Create, read, list, update and delete directory accounts",
    version
)]
pub struct CliArgs {
    /// SQLite database file holding the accounts.
    #[arg(
        long,
        env = "ACCOUNTDIR_DB",
        value_name = "path",
        default_value = "accountdir.sqlite3"
    )]
    pub db: PathBuf,
    /// Keep accounts in process memory instead of `--db`.
    #[arg(long)]
    pub in_memory: bool,
    /// Log level: trace|debug|info|warn|error.
    #[arg(long, env = "ACCOUNTDIR_LOG_LEVEL", default_value_t = default_log_level().to_string())]
    pub log_level: String,
    /// Absolute directory for rolling log files. Logging is off when omitted.
    #[arg(long, env = "ACCOUNTDIR_LOG_DIR", value_name = "dir")]
    pub log_dir: Option<String>,
    /// Name the colliding field on update conflicts.
    #[arg(long)]
    pub precise_update_conflicts: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the root greeting.
    Hello,
    /// Create an account.
    Create(AccountFields),
    /// Show one account.
    Get {
        #[arg(allow_negative_numbers = true)]
        id: AccountId,
    },
    /// List accounts in id order.
    List {
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,
        #[arg(long, allow_negative_numbers = true)]
        offset: Option<i64>,
    },
    /// Replace every field of an account.
    Update {
        #[arg(allow_negative_numbers = true)]
        id: AccountId,
        #[command(flatten)]
        fields: AccountFields,
    },
    /// Delete an account.
    Delete {
        #[arg(allow_negative_numbers = true)]
        id: AccountId,
    },
    /// Answer one JSON request per stdin line.
    Batch,
}

impl Command {
    /// The single request this command stands for; `None` for `batch`.
    pub fn into_request(self) -> Option<Request> {
        match self {
            Self::Hello => Some(Request::Hello),
            Self::Create(fields) => Some(Request::Create(fields)),
            Self::Get { id } => Some(Request::Get { id }),
            Self::List { limit, offset } => Some(Request::List { limit, offset }),
            Self::Update { id, fields } => Some(Request::Update { id, fields }),
            Self::Delete { id } => Some(Request::Delete { id }),
            Self::Batch => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CliArgs, Command};
    use crate::request::Request;
    use clap::Parser;

    #[test]
    fn update_accepts_negative_id() {
        let args = CliArgs::try_parse_from([
            "accountdir",
            "--in-memory",
            "update",
            "-1",
            "--username",
            "John Doe",
            "--email",
            "john.doe@example.com",
            "--password",
            "new_secret",
        ])
        .unwrap();

        assert!(args.in_memory);
        match args.command.into_request() {
            Some(Request::Update { id, fields }) => {
                assert_eq!(id, -1);
                assert_eq!(fields.username, "John Doe");
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn list_window_flags_are_optional() {
        let args = CliArgs::try_parse_from(["accountdir", "list"]).unwrap();
        assert!(matches!(
            args.command,
            Command::List {
                limit: None,
                offset: None
            }
        ));
    }

    #[test]
    fn batch_has_no_single_request() {
        let args = CliArgs::try_parse_from(["accountdir", "batch"]).unwrap();
        assert!(args.command.into_request().is_none());
    }

    #[test]
    fn create_requires_all_fields() {
        let result = CliArgs::try_parse_from(["accountdir", "create", "--username", "John"]);
        assert!(result.is_err());
    }
}
