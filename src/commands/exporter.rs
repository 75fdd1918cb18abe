// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::Session;
use crate::errors::LedgerError;
use crate::records;
use crate::utils::req_arg;
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, s: &Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("records", sub)) => export_records(conn, s, sub),
        _ => Ok(()),
    }
}

fn opt_string<T: ToString>(v: &Option<T>) -> String {
    v.as_ref().map(|x| x.to_string()).unwrap_or_default()
}

fn export_records(conn: &Connection, s: &Session, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = req_arg(sub, "format").to_lowercase();
    let out = req_arg(sub, "out");
    let rows = records::list_records(conn, &s.user, None)?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(&out)?;
            wtr.write_record([
                "id",
                "category",
                "type",
                "name",
                "provider",
                "quantity",
                "purchase_price",
                "current_value",
                "amount",
                "start_date",
                "maturity_date",
                "payable_date",
                "frequency",
                "returns",
                "returns_percentage",
                "status",
                "details",
            ])?;
            for r in &rows {
                wtr.write_record([
                    r.id.to_string(),
                    r.category.to_string(),
                    opt_string(&r.r#type),
                    r.name.clone(),
                    opt_string(&r.provider),
                    opt_string(&r.quantity),
                    opt_string(&r.purchase_price),
                    opt_string(&r.current_value),
                    opt_string(&r.amount),
                    opt_string(&r.start_date),
                    opt_string(&r.maturity_date),
                    opt_string(&r.payable_date),
                    opt_string(&r.frequency),
                    opt_string(&r.returns),
                    opt_string(&r.returns_percentage),
                    r.status.to_string(),
                    serde_json::to_string(&r.details)?,
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            std::fs::write(&out, serde_json::to_string_pretty(&rows)?)?;
        }
        _ => {
            return Err(
                LedgerError::validation(format!("Unknown format: {} (use csv|json)", fmt)).into(),
            );
        }
    }
    println!("Exported {} records to {}", rows.len(), out);
    Ok(())
}
