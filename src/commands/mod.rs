// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod bills;
pub mod calendar;
pub mod config;
pub mod doctor;
pub mod exporter;
pub mod importer;
pub mod loans;
pub mod pnl;
pub mod records;
pub mod reminders;
pub mod trades;

use crate::config::Config;
use crate::sync::SyncReport;
use crate::utils::opt_arg;
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::Connection;

/// Who is acting and on which day, resolved once per invocation.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: String,
    pub today: NaiveDate,
    pub config: Config,
}

impl Session {
    /// `--user` may be given at any depth; fall back to `default-user`.
    pub fn resolve(conn: &Connection, m: &clap::ArgMatches, today: NaiveDate) -> Result<Session> {
        let config = Config::load(conn)?;
        let mut user = opt_arg(m, "user");
        let mut cur = m;
        while let Some((_, sub)) = cur.subcommand() {
            if let Some(u) = opt_arg(sub, "user") {
                user = Some(u);
            }
            cur = sub;
        }
        Ok(Session {
            user: user.unwrap_or_else(|| config.default_user.clone()),
            today,
            config,
        })
    }
}

/// One-line summary of a sync pass plus any failures.
pub fn print_sync(report: &SyncReport) {
    if report.created + report.updated + report.deleted > 0 {
        println!(
            "Linked entries: {} created, {} updated, {} deleted",
            report.created, report.updated, report.deleted
        );
    }
    if report.is_clean() {
        return;
    }
    for f in &report.failures {
        eprintln!(
            "warning: {} sync for {} {} failed: {}",
            f.target, f.key.reference_type, f.key.reference_id, f.message
        );
    }
    eprintln!(
        "warning: {} linked entries are out of date; re-save the record to retry",
        report.failures.len()
    );
}
