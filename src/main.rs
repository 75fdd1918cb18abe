// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use famledger::commands::{self, Session};
use famledger::errors::{LedgerError, is_not_found};
use famledger::{cli, db};

const LOG_ENV: &str = "FAMLEDGER_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// 3 for a missing id, 2 for rejected input, 1 for anything else.
fn exit_code(err: &anyhow::Error) -> u8 {
    if is_not_found(err) {
        3
    } else if matches!(err.downcast_ref::<LedgerError>(), Some(LedgerError::Validation(_))) {
        2
    } else {
        1
    }
}

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    let conn = db::open_or_init()?;
    let session = Session::resolve(&conn, &matches, chrono::Local::now().date_naive())?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("record", sub)) => commands::records::handle(&conn, &session, sub)?,
        Some(("trade", sub)) => commands::trades::handle(&conn, &session, sub)?,
        Some(("pnl", sub)) => commands::pnl::handle(&conn, &session, sub)?,
        Some(("loan", sub)) => commands::loans::handle(&conn, &session, sub)?,
        Some(("bill", sub)) => commands::bills::handle(&conn, &session, sub)?,
        Some(("calendar", sub)) => commands::calendar::handle(&conn, &session, sub)?,
        Some(("reminder", sub)) => commands::reminders::handle(&conn, &session, sub)?,
        Some(("config", sub)) => commands::config::handle(&conn, sub)?,
        Some(("import", sub)) => commands::importer::handle(&conn, &session, sub)?,
        Some(("export", sub)) => commands::exporter::handle(&conn, &session, sub)?,
        Some(("doctor", _)) => commands::doctor::handle(&conn)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_follows_error_kind() {
        let missing: anyhow::Error = LedgerError::not_found("bill", 4).into();
        assert_eq!(exit_code(&missing.context("Pay bill")), 3);
        let invalid: anyhow::Error = LedgerError::validation("Unknown format: xml").into();
        assert_eq!(exit_code(&invalid), 2);
        assert_eq!(exit_code(&anyhow::anyhow!("disk full")), 1);
    }
}
