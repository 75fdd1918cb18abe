// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Session, print_sync};
use crate::bills::{self, ReconcileOutcome};
use crate::models::{Bill, BillStatus, ExpenseTransaction};
use crate::utils::{
    fmt_money, fmt_opt_date, maybe_print_json, opt_arg, parse_date, parse_decimal, parse_id,
    pretty_table, req_arg,
};
use anyhow::Result;
use rusqlite::Connection;

fn bill_rows(rows: &[Bill]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|b| {
            vec![
                b.id.to_string(),
                b.name.clone(),
                b.category.to_string(),
                fmt_money(&b.amount),
                fmt_opt_date(&b.due_date),
                b.status.to_string(),
                fmt_money(&b.total_paid),
                if b.auto_created { "auto".into() } else { String::new() },
            ]
        })
        .collect()
}

const BILL_HEADERS: [&str; 8] = ["ID", "Name", "Category", "Amount", "Due", "Status", "Paid", "Source"];

pub fn handle(conn: &Connection, s: &Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("expense", sub)) => {
            let tx = ExpenseTransaction {
                merchant: req_arg(sub, "merchant"),
                amount: parse_decimal(&req_arg(sub, "amount"))?,
                date: parse_date(&req_arg(sub, "date"))?,
                mode_of_transaction: opt_arg(sub, "mode"),
                description: opt_arg(sub, "description"),
            };
            let r = bills::reconcile_expense(conn, &s.user, &tx, &s.config, s.today)?;
            match r.outcome {
                ReconcileOutcome::Matched => println!(
                    "Matched bill {} '{}': {} of {} paid ({})",
                    r.bill.id,
                    r.bill.name,
                    fmt_money(&r.bill.total_paid),
                    fmt_money(&r.bill.amount),
                    r.bill.status
                ),
                ReconcileOutcome::Created => println!(
                    "Created {} bill {} '{}' for {}",
                    r.bill.category,
                    r.bill.id,
                    r.bill.name,
                    fmt_money(&r.bill.amount)
                ),
            }
            print_sync(&r.sync);
        }
        Some(("list", sub)) => {
            let status = opt_arg(sub, "status")
                .map(|v| v.parse::<BillStatus>())
                .transpose()?;
            let rows = bills::list_bills(conn, &s.user, status)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
                return Ok(());
            }
            println!("{}", pretty_table(&BILL_HEADERS, bill_rows(&rows)));
        }
        Some(("show", sub)) => {
            let id = parse_id(&req_arg(sub, "id"))?;
            let bill = bills::get_bill(conn, &s.user, id)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &bill)? {
                return Ok(());
            }
            println!("{}", pretty_table(&BILL_HEADERS, bill_rows(std::slice::from_ref(&bill))));
            if !bill.payments.is_empty() {
                let data = bill
                    .payments
                    .iter()
                    .map(|p| {
                        vec![
                            p.date.to_string(),
                            fmt_money(&p.amount),
                            p.mode.clone().unwrap_or_default(),
                            p.merchant.clone(),
                            p.description.clone().unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Date", "Amount", "Mode", "Merchant", "Description"], data)
                );
            }
        }
        _ => {}
    }
    Ok(())
}
