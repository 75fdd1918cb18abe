// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{Session, print_sync};
use crate::loans::{self, InstallmentPayment, PaymentOutcome};
use crate::models::PaymentEntry;
use crate::records;
use crate::utils::{
    fmt_money, fmt_opt_date, fmt_opt_money, maybe_print_json, opt_date_arg, opt_decimal_arg,
    parse_decimal, parse_id, pretty_table, req_arg,
};
use anyhow::{Context, Result};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn schedule_table(rows: &[PaymentEntry]) -> comfy_table::Table {
    let data = rows
        .iter()
        .map(|e| {
            vec![
                e.payment_number.to_string(),
                e.due_date.to_string(),
                fmt_money(&e.beginning_balance),
                fmt_money(&e.interest),
                fmt_money(&e.principal),
                fmt_money(&e.payment),
                fmt_money(&e.extra_payment),
                fmt_money(&e.ending_balance),
                if e.is_paid { "yes".into() } else { String::new() },
                fmt_opt_date(&e.paid_date),
                fmt_opt_money(&e.paid_amount),
            ]
        })
        .collect();
    pretty_table(
        &["#", "Due", "Opening", "Interest", "Principal", "EMI", "Extra", "Closing", "Paid", "Paid on", "Paid amount"],
        data,
    )
}

fn print_outcome(o: &PaymentOutcome) {
    match o.record.payable_date {
        Some(next) if o.record.status == crate::models::RecordStatus::Active => {
            println!("Next installment due {}", next)
        }
        _ => println!("Loan '{}' is fully repaid", o.record.name),
    }
    print_sync(&o.sync);
}

pub fn handle(conn: &Connection, s: &Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("schedule", sub)) => {
            let id = parse_id(&req_arg(sub, "id"))?;
            records::get_record(conn, &s.user, id)?;
            let rows = loans::load_schedule(conn, id)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
                return Ok(());
            }
            println!("{}", schedule_table(&rows));
        }
        Some(("pay", sub)) => {
            let id = parse_id(&req_arg(sub, "id"))?;
            let payment_number: u32 = req_arg(sub, "payment-number")
                .parse()
                .context("Invalid payment number")?;
            let payment = InstallmentPayment {
                payment_number,
                amount: opt_decimal_arg(sub, "amount")?,
                paid_date: opt_date_arg(sub, "date")?.unwrap_or(s.today),
                extra: opt_decimal_arg(sub, "extra")?.unwrap_or(Decimal::ZERO),
            };
            let outcome = loans::pay_installment(conn, &s.user, id, &payment, s.today)?;
            println!("Installment {} of loan {} marked paid", payment_number, id);
            print_outcome(&outcome);
        }
        Some(("record-payment", sub)) => {
            let id = parse_id(&req_arg(sub, "id"))?;
            let amount = parse_decimal(&req_arg(sub, "amount"))?;
            let date = opt_date_arg(sub, "date")?.unwrap_or(s.today);
            let outcome = loans::record_payment(conn, &s.user, id, amount, date, s.today)?;
            println!("Recorded {} against loan {}", fmt_money(&amount), id);
            print_outcome(&outcome);
        }
        _ => {}
    }
    Ok(())
}
