// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Session, print_sync};
use crate::bills::{self, ReconcileOutcome};
use crate::models::ExpenseTransaction;
use crate::sync::SyncReport;
use crate::utils::{parse_date, parse_decimal, req_arg};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

pub fn handle(conn: &Connection, s: &Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("expenses", sub)) => {
            let path = req_arg(sub, "path");
            let summary = import_expenses(conn, s, &path)?;
            println!(
                "Imported {} expenses from {}: {} matched, {} new bills",
                summary.rows, path, summary.matched, summary.created
            );
            print_sync(&summary.sync);
            Ok(())
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub rows: usize,
    pub matched: usize,
    pub created: usize,
    pub sync: SyncReport,
}

/// Read `date,merchant,amount,mode,description` rows (with a header line).
/// Every row is validated before any is reconciled.
pub fn read_expenses(path: &str) -> Result<Vec<ExpenseTransaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;

    let mut out = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let line = i + 2;
        let rec = result.with_context(|| format!("Read line {}", line))?;
        let field = |idx: usize| {
            rec.get(idx)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let date_raw = field(0).with_context(|| format!("line {}: date missing", line))?;
        let merchant = field(1).with_context(|| format!("line {}: merchant missing", line))?;
        let amount_raw = field(2).with_context(|| format!("line {}: amount missing", line))?;
        out.push(ExpenseTransaction {
            date: parse_date(&date_raw).with_context(|| format!("line {}", line))?,
            amount: parse_decimal(&amount_raw)
                .with_context(|| format!("line {}: amount for {}", line, merchant))?,
            merchant,
            mode_of_transaction: field(3),
            description: field(4),
        });
    }
    Ok(out)
}

pub fn import_expenses(conn: &Connection, s: &Session, path: &str) -> Result<ImportSummary> {
    let expenses = read_expenses(path)?;
    let mut summary = ImportSummary::default();
    for tx in &expenses {
        let r = bills::reconcile_expense(conn, &s.user, tx, &s.config, s.today)
            .with_context(|| format!("Reconcile {} {} on {}", tx.merchant, tx.amount, tx.date))?;
        match r.outcome {
            ReconcileOutcome::Matched => summary.matched += 1,
            ReconcileOutcome::Created => summary.created += 1,
        }
        summary.sync.merge(r.sync);
        summary.rows += 1;
    }
    info!(path, rows = summary.rows, "expenses imported");
    Ok(summary)
}
