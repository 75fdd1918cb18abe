// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::Session;
use crate::models::ProfitLoss;
use crate::pnl;
use crate::utils::{fmt_money, fmt_opt_money, maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

fn pct(p: &Option<rust_decimal::Decimal>) -> String {
    p.map(|v| format!("{}%", v.round_dp(2))).unwrap_or_default()
}

fn table(rows: &[ProfitLoss]) -> comfy_table::Table {
    let data = rows
        .iter()
        .map(|p| {
            vec![
                p.name_of_script.clone(),
                p.name_of_investor.clone(),
                p.quantity.to_string(),
                p.date_of_purchase.to_string(),
                p.date_of_sales.to_string(),
                fmt_money(&p.actual_purchase_valuation),
                fmt_money(&p.actual_sales_valuation),
                fmt_opt_money(&p.profit_loss_value),
                pct(&p.profit_loss_percentage),
                p.holding_days.map(|d| d.to_string()).unwrap_or_default(),
                pct(&p.annualised_profit_loss_percentage),
            ]
        })
        .collect();
    pretty_table(
        &["Script", "Investor", "Qty", "Bought", "Sold", "Cost", "Proceeds", "P&L", "P&L %", "Days", "Annualised"],
        data,
    )
}

pub fn handle(conn: &Connection, s: &Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("generate", sub)) => {
            let run = pnl::generate_for_user(conn, &s.user)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &run)? {
                return Ok(());
            }
            println!(
                "Purchases {}, sales {}, matched {}, unmatched sales {} ({} created, {} updated, {} removed)",
                run.stats.total_purchases,
                run.stats.total_sales,
                run.stats.matched,
                run.stats.unmatched_sales,
                run.created,
                run.updated,
                run.removed
            );
            if !run.records.is_empty() {
                println!("{}", table(&run.records));
            }
        }
        Some(("list", sub)) => {
            let rows = pnl::list_pnl(conn, &s.user)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
                return Ok(());
            }
            println!("{}", table(&rows));
        }
        _ => {}
    }
    Ok(())
}
