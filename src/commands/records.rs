// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Session, print_sync};
use crate::models::{Category, FinancialRecord, RecordDetails};
use crate::records;
use crate::utils::{
    fmt_opt_date, fmt_opt_money, maybe_print_json, opt_arg, opt_date_arg, opt_decimal_arg,
    parse_id, pretty_table, req_arg,
};
use anyhow::Result;
use rusqlite::Connection;
use serde_json::json;

pub fn handle(conn: &Connection, s: &Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let record = record_from_args(&s.user, sub)?;
            let (record, report) = records::create_record(conn, record, s.today)?;
            if !maybe_print_json(
                sub.get_flag("json"),
                sub.get_flag("jsonl"),
                &json!({ "record": record, "sync": report }),
            )? {
                println!(
                    "Added {} record {} '{}'",
                    record.category, record.id, record.name
                );
                print_sync(&report);
            }
        }
        Some(("update", sub)) => {
            let id = parse_id(&req_arg(sub, "id"))?;
            let mut record = records::get_record(conn, &s.user, id)?;
            if let Some(name) = opt_arg(sub, "name") {
                record.name = name;
            }
            apply_fields(&mut record, sub)?;
            let (record, report) = records::update_record(conn, record, s.today)?;
            if !maybe_print_json(
                sub.get_flag("json"),
                sub.get_flag("jsonl"),
                &json!({ "record": record, "sync": report }),
            )? {
                println!("Updated record {} '{}'", record.id, record.name);
                print_sync(&report);
            }
        }
        Some(("list", sub)) => {
            let category = opt_arg(sub, "category")
                .map(|c| c.parse::<Category>())
                .transpose()?;
            let rows = records::list_records(conn, &s.user, category)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
                return Ok(());
            }
            let data = rows
                .iter()
                .map(|r| {
                    vec![
                        r.id.to_string(),
                        r.category.to_string(),
                        r.name.clone(),
                        fmt_opt_money(&r.amount),
                        fmt_opt_money(&r.current_value),
                        fmt_opt_money(&r.returns),
                        r.returns_percentage
                            .map(|p| format!("{}%", p.round_dp(2)))
                            .unwrap_or_default(),
                        fmt_opt_date(&r.target_date()),
                        r.status.to_string(),
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(
                    &["ID", "Category", "Name", "Amount", "Current", "Returns", "Returns %", "Due", "Status"],
                    data
                )
            );
        }
        Some(("show", sub)) => {
            let id = parse_id(&req_arg(sub, "id"))?;
            let r = records::get_record(conn, &s.user, id)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &r)? {
                return Ok(());
            }
            let data = vec![
                vec!["Category".into(), r.category.to_string()],
                vec!["Name".into(), r.name.clone()],
                vec!["Type".into(), r.r#type.clone().unwrap_or_default()],
                vec!["Provider".into(), r.provider.clone().unwrap_or_default()],
                vec!["Quantity".into(), r.quantity.map(|q| q.to_string()).unwrap_or_default()],
                vec!["Purchase price".into(), fmt_opt_money(&r.purchase_price)],
                vec!["Amount".into(), fmt_opt_money(&r.amount)],
                vec!["Current value".into(), fmt_opt_money(&r.current_value)],
                vec!["Returns".into(), fmt_opt_money(&r.returns)],
                vec!["Start".into(), fmt_opt_date(&r.start_date)],
                vec!["Maturity".into(), fmt_opt_date(&r.maturity_date)],
                vec!["Payable".into(), fmt_opt_date(&r.payable_date)],
                vec![
                    "Frequency".into(),
                    r.frequency.map(|f| f.to_string()).unwrap_or_default(),
                ],
                vec!["Status".into(), r.status.to_string()],
                vec!["Details".into(), serde_json::to_string(&r.details)?],
            ];
            println!("{}", pretty_table(&["Field", "Value"], data));
        }
        Some(("rm", sub)) => {
            let id = parse_id(&req_arg(sub, "id"))?;
            let report = records::delete_record(conn, &s.user, id)?;
            println!("Removed record {}", id);
            print_sync(&report);
        }
        _ => {}
    }
    Ok(())
}

/// A new record for `user` from `record add` arguments.
pub fn record_from_args(user: &str, sub: &clap::ArgMatches) -> Result<FinancialRecord> {
    let category: Category = req_arg(sub, "category").parse()?;
    let mut record = FinancialRecord::new(user, category, &req_arg(sub, "name"));
    apply_fields(&mut record, sub)?;
    Ok(record)
}

/// Overwrite every field given on the command line.
pub fn apply_fields(r: &mut FinancialRecord, sub: &clap::ArgMatches) -> Result<()> {
    if let Some(v) = opt_arg(sub, "type") {
        r.r#type = Some(v);
    }
    if let Some(v) = opt_arg(sub, "provider") {
        r.provider = Some(v);
    }
    if let Some(v) = opt_decimal_arg(sub, "quantity")? {
        r.quantity = Some(v);
    }
    if let Some(v) = opt_decimal_arg(sub, "purchase-price")? {
        r.purchase_price = Some(v);
    }
    if let Some(v) = opt_decimal_arg(sub, "current-value")? {
        r.current_value = Some(v);
    }
    if let Some(v) = opt_decimal_arg(sub, "amount")? {
        r.amount = Some(v);
    }
    if let Some(v) = opt_date_arg(sub, "start-date")? {
        r.start_date = Some(v);
    }
    if let Some(v) = opt_date_arg(sub, "maturity-date")? {
        r.maturity_date = Some(v);
    }
    if let Some(v) = opt_date_arg(sub, "payable-date")? {
        r.payable_date = Some(v);
    }
    if let Some(v) = opt_arg(sub, "frequency") {
        r.frequency = Some(v.parse()?);
    }
    if let Some(v) = opt_arg(sub, "storage-type") {
        r.storage_type = Some(v);
    }
    if let Some(v) = opt_arg(sub, "status") {
        r.status = v.parse()?;
    }
    if let Some(v) = opt_arg(sub, "details") {
        r.details = RecordDetails::parse(&v)?;
    }
    Ok(())
}
