//! `accountdir` transport shell.
//!
//! # Responsibility
//! - Parse arguments, pick a store and run requests against one manager.
//! - Print every answer as one JSON line on stdout.
//!
//! # Invariants
//! - Exit status is non-zero only for infrastructure failures; not-found,
//!   conflict and validation answers are ordinary output.

mod args;
mod request;
mod response;

use accountdir_core::{
    init_logging, AccountManager, AccountStore, ConflictReporting, LoggingError,
    ManagerOptions, MemoryAccountStore, SqliteAccountStore, StoreError,
};
use args::CliArgs;
use clap::Parser;
use log::info;
use request::{dispatch, Request};
use response::{Response, StatusCode};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;

#[derive(Debug)]
enum CliError {
    Logging(LoggingError),
    Store(StoreError),
    Io(io::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logging(err) => write!(f, "logging setup failed: {err}"),
            Self::Store(err) => write!(f, "account store unavailable: {err}"),
            Self::Io(err) => write!(f, "i/o failure: {err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Logging(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<io::Error> for CliError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

fn main() -> ExitCode {
    match run(CliArgs::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("accountdir: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<ExitCode, CliError> {
    if let Some(log_dir) = args.log_dir.as_deref() {
        init_logging(&args.log_level, log_dir)?;
    }

    let store: Box<dyn AccountStore> = if args.in_memory {
        Box::new(MemoryAccountStore::new())
    } else {
        Box::new(SqliteAccountStore::open(&args.db)?)
    };
    let options = ManagerOptions {
        update_conflicts: if args.precise_update_conflicts {
            ConflictReporting::Precise
        } else {
            ConflictReporting::Combined
        },
    };
    let manager = AccountManager::with_options(store, options);
    info!(
        "event=cli_start module=cli status=ok backend={}",
        if args.in_memory { "memory" } else { "sqlite" }
    );

    let mut out = io::stdout().lock();
    let healthy = match args.command.into_request() {
        Some(request) => answer(&mut out, &dispatch(&manager, request))?,
        None => run_batch(&manager, io::stdin().lock(), &mut out)?,
    };

    Ok(if healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Answers each non-blank input line; `false` if any answer was a server error.
fn run_batch<S: AccountStore>(
    manager: &AccountManager<S>,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<bool, CliError> {
    let mut healthy = true;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => dispatch(manager, request),
            Err(err) => Response::detail(StatusCode::BadRequest, format!("invalid request: {err}")),
        };
        healthy &= answer(out, &response)?;
    }
    Ok(healthy)
}

fn answer(out: &mut impl Write, response: &Response) -> Result<bool, CliError> {
    let line = serde_json::to_string(response).map_err(io::Error::other)?;
    writeln!(out, "{line}")?;
    out.flush()?;
    Ok(!response.is_server_error())
}
