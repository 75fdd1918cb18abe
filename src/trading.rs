// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::calc::Derive;
use crate::db::{get_decimal, get_opt_decimal, opt_text, text};
use crate::errors::LedgerError;
use crate::models::{Charges, TradingDetails};
use crate::pnl::{self, PnlRun};
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use tracing::{info, warn};

const TRADE_COLUMNS: &str = "id, user_id, type_of_transaction, name_of_script, name_of_investor, trading_id, date, quantity, price, brokerage, exchange_charges, gst, stt, stamp_duty, valuation, actual_price, actual_valuation";

fn trade_from_row(r: &Row<'_>) -> rusqlite::Result<TradingDetails> {
    Ok(TradingDetails {
        id: r.get(0)?,
        user_id: r.get(1)?,
        type_of_transaction: r.get(2)?,
        name_of_script: r.get(3)?,
        name_of_investor: r.get(4)?,
        trading_id: r.get(5)?,
        date: r.get(6)?,
        quantity: get_decimal(r, 7)?,
        price: get_decimal(r, 8)?,
        charges: Charges {
            brokerage: get_opt_decimal(r, 9)?,
            exchange_charges: get_opt_decimal(r, 10)?,
            gst: get_opt_decimal(r, 11)?,
            stt: get_opt_decimal(r, 12)?,
            stamp_duty: get_opt_decimal(r, 13)?,
        },
        valuation: get_opt_decimal(r, 14)?,
        actual_price: get_opt_decimal(r, 15)?,
        actual_valuation: get_opt_decimal(r, 16)?,
    })
}

pub fn validate(t: &TradingDetails) -> Result<(), LedgerError> {
    for (label, v) in [
        ("Script", &t.name_of_script),
        ("Investor", &t.name_of_investor),
        ("Trading id", &t.trading_id),
    ] {
        if v.trim().is_empty() {
            return Err(LedgerError::validation(format!("{} is required", label)));
        }
    }
    if t.quantity <= Decimal::ZERO {
        return Err(LedgerError::validation("Quantity must be positive"));
    }
    if t.price < Decimal::ZERO {
        return Err(LedgerError::validation("Price cannot be negative"));
    }
    let c = &t.charges;
    if [c.brokerage, c.exchange_charges, c.gst, c.stt, c.stamp_duty]
        .iter()
        .flatten()
        .any(|v| *v < Decimal::ZERO)
    {
        return Err(LedgerError::validation("Charges cannot be negative"));
    }
    Ok(())
}

/// Derive and store a leg.
pub fn insert_trade(conn: &Connection, mut t: TradingDetails) -> Result<TradingDetails> {
    validate(&t)?;
    t.derive();
    conn.execute(
        "INSERT INTO trading_details(user_id, type_of_transaction, name_of_script, name_of_investor, trading_id, date, quantity, price, brokerage, exchange_charges, gst, stt, stamp_duty, valuation, actual_price, actual_valuation)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)",
        params![
            t.user_id,
            t.type_of_transaction,
            t.name_of_script.trim(),
            t.name_of_investor.trim(),
            t.trading_id.trim(),
            t.date,
            text(t.quantity),
            text(t.price),
            opt_text(t.charges.brokerage),
            opt_text(t.charges.exchange_charges),
            opt_text(t.charges.gst),
            opt_text(t.charges.stt),
            opt_text(t.charges.stamp_duty),
            opt_text(t.valuation),
            opt_text(t.actual_price),
            opt_text(t.actual_valuation),
        ],
    )
    .context("Insert trade")?;
    t.id = conn.last_insert_rowid();
    info!(id = t.id, kind = %t.type_of_transaction, "trade recorded");
    Ok(t)
}

/// Store a leg, then regenerate the user's profit and loss. A failed
/// regeneration is logged and leaves the leg in place.
pub fn add_trade(conn: &Connection, t: TradingDetails) -> Result<(TradingDetails, Option<PnlRun>)> {
    let t = insert_trade(conn, t)?;
    let run = match pnl::generate_for_user(conn, &t.user_id) {
        Ok(run) => Some(run),
        Err(e) => {
            warn!(user = %t.user_id, "profit/loss generation failed: {:#}", e);
            None
        }
    };
    Ok((t, run))
}

pub fn get_trade(conn: &Connection, user_id: &str, id: i64) -> Result<TradingDetails> {
    let sql = format!(
        "SELECT {} FROM trading_details WHERE id=?1 AND user_id=?2",
        TRADE_COLUMNS
    );
    conn.query_row(&sql, params![id, user_id], trade_from_row)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("trade", id).into())
}

pub fn list_trades(conn: &Connection, user_id: &str) -> Result<Vec<TradingDetails>> {
    let sql = format!(
        "SELECT {} FROM trading_details WHERE user_id=?1 ORDER BY date, id",
        TRADE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id], trade_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Delete a leg and every profit/loss pair built on it. Returns how many
/// pairs went with it.
pub fn delete_trade(conn: &Connection, user_id: &str, id: i64) -> Result<usize> {
    get_trade(conn, user_id, id)?;
    let pairs: i64 = conn.query_row(
        "SELECT COUNT(*) FROM profit_loss WHERE purchase_id=?1 OR sale_id=?1",
        params![id],
        |r| r.get(0),
    )?;
    conn.execute(
        "DELETE FROM trading_details WHERE id=?1 AND user_id=?2",
        params![id, user_id],
    )?;
    info!(id, pairs, "trade deleted");
    Ok(pairs as usize)
}
