// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::Session;
use crate::models::{Charges, TradingDetails};
use crate::trading;
use crate::utils::{
    fmt_money, fmt_opt_money, maybe_print_json, opt_decimal_arg, parse_date, parse_decimal,
    parse_id, pretty_table, req_arg,
};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, s: &Session, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let leg = trade_from_args(&s.user, sub)?;
            let (leg, run) = trading::add_trade(conn, leg)?;
            println!(
                "Added {} {} x {} @ {} (actual {})",
                leg.type_of_transaction,
                leg.name_of_script,
                leg.quantity,
                fmt_money(&leg.price),
                fmt_opt_money(&leg.actual_price)
            );
            match run {
                Some(run) => println!(
                    "Profit/loss: {} created, {} updated, {} removed, {} unmatched sales",
                    run.created, run.updated, run.removed, run.stats.unmatched_sales
                ),
                None => eprintln!("warning: profit/loss was not regenerated, run `pnl generate`"),
            }
        }
        Some(("list", sub)) => {
            let rows = trading::list_trades(conn, &s.user)?;
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
                return Ok(());
            }
            let data = rows
                .iter()
                .map(|t| {
                    vec![
                        t.id.to_string(),
                        t.date.to_string(),
                        t.type_of_transaction.to_string(),
                        t.name_of_script.clone(),
                        t.name_of_investor.clone(),
                        t.trading_id.clone(),
                        t.quantity.to_string(),
                        fmt_money(&t.price),
                        fmt_money(&t.charges.total()),
                        fmt_opt_money(&t.actual_price),
                        fmt_opt_money(&t.actual_valuation),
                    ]
                })
                .collect();
            println!(
                "{}",
                pretty_table(
                    &["ID", "Date", "Kind", "Script", "Investor", "Trading ID", "Qty", "Price", "Charges", "Actual price", "Actual value"],
                    data
                )
            );
        }
        Some(("rm", sub)) => {
            let id = parse_id(&req_arg(sub, "id"))?;
            let pairs = trading::delete_trade(conn, &s.user, id)?;
            println!("Removed trade {} and {} profit/loss pair(s)", id, pairs);
        }
        _ => {}
    }
    Ok(())
}

pub fn trade_from_args(user: &str, sub: &clap::ArgMatches) -> Result<TradingDetails> {
    Ok(TradingDetails {
        id: 0,
        user_id: user.to_string(),
        type_of_transaction: req_arg(sub, "kind").parse()?,
        name_of_script: req_arg(sub, "script"),
        name_of_investor: req_arg(sub, "investor"),
        trading_id: req_arg(sub, "trading-id"),
        date: parse_date(&req_arg(sub, "date"))?,
        quantity: parse_decimal(&req_arg(sub, "quantity"))?,
        price: parse_decimal(&req_arg(sub, "price"))?,
        charges: Charges {
            brokerage: opt_decimal_arg(sub, "brokerage")?,
            exchange_charges: opt_decimal_arg(sub, "exchange-charges")?,
            gst: opt_decimal_arg(sub, "gst")?,
            stt: opt_decimal_arg(sub, "stt")?,
            stamp_duty: opt_decimal_arg(sub, "stamp-duty")?,
        },
        valuation: None,
        actual_price: None,
        actual_valuation: None,
    })
}
