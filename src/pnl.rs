// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Realized profit and loss from paired purchase and sale legs.
//!
//! Legs pair when script, investor and trading id agree (trimmed,
//! case-insensitive) and the purchase is not dated after the sale. Each
//! sale takes the earliest purchase not yet used in this run. When every
//! candidate is used the first candidate is reused, so a purchase can back
//! more than one sale. Re-running updates existing pairs in place.

use crate::calc::Derive;
use crate::db::{get_decimal, get_opt_decimal, opt_text, text};
use crate::models::{ProfitLoss, TradingDetails, TransactionType};
use crate::trading;
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    pub total_purchases: usize,
    pub total_sales: usize,
    pub matched: usize,
    pub unmatched_sales: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PnlRun {
    pub created: usize,
    pub updated: usize,
    /// Pairs from earlier runs that no longer match, e.g. after a
    /// backdated purchase moved a sale to another leg.
    pub removed: usize,
    pub stats: MatchStats,
    pub records: Vec<ProfitLoss>,
}

fn norm(s: &str) -> String {
    s.trim().to_lowercase()
}

fn same_holding(a: &TradingDetails, b: &TradingDetails) -> bool {
    norm(&a.name_of_script) == norm(&b.name_of_script)
        && norm(&a.name_of_investor) == norm(&b.name_of_investor)
        && norm(&a.trading_id) == norm(&b.trading_id)
}

fn cost_price(t: &TradingDetails) -> rust_decimal::Decimal {
    t.actual_price.unwrap_or(t.price)
}

fn cost_valuation(t: &TradingDetails) -> rust_decimal::Decimal {
    t.actual_valuation
        .or(t.valuation)
        .unwrap_or(t.quantity * t.price)
}

fn pair(purchase: &TradingDetails, sale: &TradingDetails) -> ProfitLoss {
    let mut pl = ProfitLoss {
        id: 0,
        user_id: sale.user_id.clone(),
        purchase_id: purchase.id,
        sale_id: sale.id,
        name_of_script: sale.name_of_script.trim().to_string(),
        name_of_investor: sale.name_of_investor.trim().to_string(),
        trading_id: sale.trading_id.trim().to_string(),
        quantity: sale.quantity,
        date_of_purchase: purchase.date,
        date_of_sales: sale.date,
        actual_price_of_purchase: cost_price(purchase),
        actual_purchase_valuation: cost_valuation(purchase),
        actual_price_of_sales: cost_price(sale),
        actual_sales_valuation: cost_valuation(sale),
        profit_loss_value: None,
        profit_loss_percentage: None,
        holding_days: None,
        annualised_profit_loss_percentage: None,
    };
    pl.derive();
    pl
}

/// Pair sales with purchases. Pure: ids on the input legs become the
/// `purchase_id` / `sale_id` of the output.
pub fn match_trades(trades: &[TradingDetails]) -> (Vec<ProfitLoss>, MatchStats) {
    let mut purchases: Vec<&TradingDetails> = trades
        .iter()
        .filter(|t| t.type_of_transaction == TransactionType::Purchase)
        .collect();
    let mut sales: Vec<&TradingDetails> = trades
        .iter()
        .filter(|t| t.type_of_transaction == TransactionType::Sell)
        .collect();
    purchases.sort_by_key(|t| (t.date, t.id));
    sales.sort_by_key(|t| (t.date, t.id));

    let mut stats = MatchStats {
        total_purchases: purchases.len(),
        total_sales: sales.len(),
        ..MatchStats::default()
    };
    let mut consumed: HashSet<i64> = HashSet::new();
    let mut out = Vec::new();

    for sale in sales {
        let candidates: Vec<&TradingDetails> = purchases
            .iter()
            .copied()
            .filter(|p| same_holding(p, sale) && p.date <= sale.date)
            .collect();
        let Some(first) = candidates.first().copied() else {
            debug!(sale = sale.id, "no purchase for sale");
            stats.unmatched_sales += 1;
            continue;
        };
        let purchase = candidates
            .iter()
            .copied()
            .find(|p| !consumed.contains(&p.id))
            .unwrap_or(first);
        consumed.insert(purchase.id);
        stats.matched += 1;
        out.push(pair(purchase, sale));
    }
    (out, stats)
}

const PNL_COLUMNS: &str = "id, user_id, purchase_id, sale_id, name_of_script, name_of_investor, trading_id, quantity, date_of_purchase, date_of_sales, actual_price_of_purchase, actual_purchase_valuation, actual_price_of_sales, actual_sales_valuation, profit_loss_value, profit_loss_percentage, holding_days, annualised_profit_loss_percentage";

fn pnl_from_row(r: &Row<'_>) -> rusqlite::Result<ProfitLoss> {
    Ok(ProfitLoss {
        id: r.get(0)?,
        user_id: r.get(1)?,
        purchase_id: r.get(2)?,
        sale_id: r.get(3)?,
        name_of_script: r.get(4)?,
        name_of_investor: r.get(5)?,
        trading_id: r.get(6)?,
        quantity: get_decimal(r, 7)?,
        date_of_purchase: r.get(8)?,
        date_of_sales: r.get(9)?,
        actual_price_of_purchase: get_decimal(r, 10)?,
        actual_purchase_valuation: get_decimal(r, 11)?,
        actual_price_of_sales: get_decimal(r, 12)?,
        actual_sales_valuation: get_decimal(r, 13)?,
        profit_loss_value: get_opt_decimal(r, 14)?,
        profit_loss_percentage: get_opt_decimal(r, 15)?,
        holding_days: r.get(16)?,
        annualised_profit_loss_percentage: get_opt_decimal(r, 17)?,
    })
}

/// Insert or refresh one pair; `true` when it was new.
fn upsert(conn: &Connection, pl: &mut ProfitLoss) -> Result<bool> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM profit_loss WHERE purchase_id=?1 AND sale_id=?2",
            params![pl.purchase_id, pl.sale_id],
            |r| r.get(0),
        )
        .optional()?;
    conn.execute(
        "INSERT INTO profit_loss(user_id, purchase_id, sale_id, name_of_script, name_of_investor, trading_id, quantity, date_of_purchase, date_of_sales, actual_price_of_purchase, actual_purchase_valuation, actual_price_of_sales, actual_sales_valuation, profit_loss_value, profit_loss_percentage, holding_days, annualised_profit_loss_percentage)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)
         ON CONFLICT(purchase_id, sale_id) DO UPDATE SET
            name_of_script=excluded.name_of_script,
            name_of_investor=excluded.name_of_investor,
            trading_id=excluded.trading_id,
            quantity=excluded.quantity,
            date_of_purchase=excluded.date_of_purchase,
            date_of_sales=excluded.date_of_sales,
            actual_price_of_purchase=excluded.actual_price_of_purchase,
            actual_purchase_valuation=excluded.actual_purchase_valuation,
            actual_price_of_sales=excluded.actual_price_of_sales,
            actual_sales_valuation=excluded.actual_sales_valuation,
            profit_loss_value=excluded.profit_loss_value,
            profit_loss_percentage=excluded.profit_loss_percentage,
            holding_days=excluded.holding_days,
            annualised_profit_loss_percentage=excluded.annualised_profit_loss_percentage,
            updated_at=datetime('now')",
        params![
            pl.user_id,
            pl.purchase_id,
            pl.sale_id,
            pl.name_of_script,
            pl.name_of_investor,
            pl.trading_id,
            text(pl.quantity),
            pl.date_of_purchase,
            pl.date_of_sales,
            text(pl.actual_price_of_purchase),
            text(pl.actual_purchase_valuation),
            text(pl.actual_price_of_sales),
            text(pl.actual_sales_valuation),
            opt_text(pl.profit_loss_value),
            opt_text(pl.profit_loss_percentage),
            pl.holding_days,
            opt_text(pl.annualised_profit_loss_percentage),
        ],
    )?;
    pl.id = match existing {
        Some(id) => id,
        None => conn.last_insert_rowid(),
    };
    Ok(existing.is_none())
}

/// Drop stored pairs of `user_id` that `current` does not contain, so each
/// sale is realized at most once.
fn prune_stale(conn: &Connection, user_id: &str, current: &[ProfitLoss]) -> Result<usize> {
    let keep: HashSet<i64> = current.iter().map(|pl| pl.id).collect();
    let mut stmt = conn.prepare("SELECT id FROM profit_loss WHERE user_id=?1")?;
    let stored = stmt
        .query_map(params![user_id], |r| r.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let mut removed = 0;
    for id in stored.into_iter().filter(|id| !keep.contains(id)) {
        removed += conn.execute("DELETE FROM profit_loss WHERE id=?1", params![id])?;
        debug!(id, "stale profit/loss pair removed");
    }
    Ok(removed)
}

/// Match every leg of `user_id` and persist the pairs.
pub fn generate_for_user(conn: &Connection, user_id: &str) -> Result<PnlRun> {
    let trades = trading::list_trades(conn, user_id)?;
    let (mut pairs, stats) = match_trades(&trades);

    let tx = conn.unchecked_transaction()?;
    let mut run = PnlRun {
        stats,
        ..PnlRun::default()
    };
    for pl in pairs.iter_mut() {
        if upsert(&tx, pl).context("Save profit/loss")? {
            run.created += 1;
        } else {
            run.updated += 1;
        }
    }
    run.removed = prune_stale(&tx, user_id, &pairs)?;
    tx.commit()?;
    run.records = pairs;
    info!(
        user = user_id,
        created = run.created,
        updated = run.updated,
        removed = run.removed,
        unmatched = run.stats.unmatched_sales,
        "profit/loss generated"
    );
    Ok(run)
}

pub fn list_pnl(conn: &Connection, user_id: &str) -> Result<Vec<ProfitLoss>> {
    let sql = format!(
        "SELECT {} FROM profit_loss WHERE user_id=?1 ORDER BY date_of_sales, id",
        PNL_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id], pnl_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Charges;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn leg(id: i64, kind: TransactionType, date: (i32, u32, u32), price: &str, charge: &str) -> TradingDetails {
        let mut t = TradingDetails {
            id,
            user_id: "u1".into(),
            type_of_transaction: kind,
            name_of_script: "INFY".into(),
            name_of_investor: "Asha".into(),
            trading_id: "ZR01".into(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            quantity: d("100"),
            price: d(price),
            charges: Charges {
                brokerage: Some(d(charge)),
                ..Charges::default()
            },
            valuation: None,
            actual_price: None,
            actual_valuation: None,
        };
        t.derive();
        t
    }

    #[test]
    fn two_month_round_trip() {
        let buy = leg(1, TransactionType::Purchase, (2025, 1, 1), "50", "50");
        let sell = leg(2, TransactionType::Sell, (2025, 3, 3), "60", "100");
        let (pairs, stats) = match_trades(&[buy, sell]);
        assert_eq!(stats.matched, 1);
        let pl = &pairs[0];
        assert_eq!(pl.actual_price_of_purchase, d("50.5"));
        assert_eq!(pl.actual_purchase_valuation, d("5050"));
        assert_eq!(pl.actual_price_of_sales, d("59"));
        assert_eq!(pl.actual_sales_valuation, d("5900"));
        assert_eq!(pl.profit_loss_value, Some(d("850")));
        assert_eq!(pl.profit_loss_percentage, Some(d("16.8317")));
        assert_eq!(pl.holding_days, Some(61));
        assert_eq!(pl.annualised_profit_loss_percentage, Some(d("100.7142")));
    }

    #[test]
    fn keys_are_normalized_and_dates_respected() {
        let buy = leg(1, TransactionType::Purchase, (2025, 5, 1), "50", "0");
        let mut sell = leg(2, TransactionType::Sell, (2025, 6, 1), "55", "0");
        sell.name_of_script = " infy ".into();
        sell.trading_id = "zr01".into();
        let early_sell = leg(3, TransactionType::Sell, (2025, 4, 1), "55", "0");
        let (pairs, stats) = match_trades(&[buy, sell, early_sell]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].sale_id, 2);
        assert_eq!(stats.unmatched_sales, 1);
        assert_eq!(stats.total_sales, 2);
    }

    #[test]
    fn earliest_unused_purchase_first_then_reuse() {
        let b1 = leg(1, TransactionType::Purchase, (2025, 1, 10), "50", "0");
        let b2 = leg(2, TransactionType::Purchase, (2025, 1, 5), "48", "0");
        let s1 = leg(3, TransactionType::Sell, (2025, 2, 1), "60", "0");
        let s2 = leg(4, TransactionType::Sell, (2025, 2, 2), "60", "0");
        let s3 = leg(5, TransactionType::Sell, (2025, 2, 3), "60", "0");
        let (pairs, stats) = match_trades(&[b1, b2, s1, s2, s3]);
        let used: Vec<i64> = pairs.iter().map(|p| p.purchase_id).collect();
        assert_eq!(used, vec![2, 1, 2]);
        assert_eq!(stats.matched, 3);
    }
}
