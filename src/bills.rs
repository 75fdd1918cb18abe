// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Bills and bank-statement reconciliation.
//!
//! An expense either settles an existing bill (same payee, amount within
//! tolerance, same month) or becomes a new auto-created bill that is already
//! paid. Bill rows carry a `version`; every update is conditional on it and
//! the read-match-write cycle is retried when another writer got there first.

use crate::config::Config;
use crate::db::{get_decimal, text};
use crate::errors::LedgerError;
use crate::models::{
    Bill, BillCategory, BillDetails, BillPayment, BillStatus, ExpenseTransaction, FinancialRecord,
    RecordDetails, RecordStatus, ReferenceType,
};
use crate::records;
use crate::sync::{ReferenceKey, SyncReport, Upsert};
use crate::utils::{month_key, same_month};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

const MAX_ATTEMPTS: u32 = 3;

/// First match wins, so broader words sit further down.
static CATEGORY_RULES: Lazy<Vec<(Regex, BillCategory)>> = Lazy::new(|| {
    [
        (r"(?i)electric|\bpower\b|bescom|tneb|discom|\benergy\b", BillCategory::Electricity),
        (r"(?i)\bwater\b|\bjal\b", BillCategory::Water),
        (r"(?i)\bgas\b|\blpg\b|indane|bharat ?gas", BillCategory::Gas),
        (r"(?i)broadband|internet|fib(er|re)|wi-?fi", BillCategory::Internet),
        (r"(?i)mobile|airtel|\bjio\b|vodafone|postpaid|prepaid|recharge", BillCategory::Mobile),
        (r"(?i)\brent\b|landlord", BillCategory::Rent),
        (r"(?i)insurance|\blic\b|premium", BillCategory::Insurance),
        (r"(?i)school|tuition|college|\bfees?\b", BillCategory::School),
        (r"(?i)maintenance|society|apartment", BillCategory::Maintenance),
    ]
    .into_iter()
    .filter_map(|(pattern, category)| match Regex::new(pattern) {
        Ok(re) => Some((re, category)),
        Err(e) => {
            warn!(pattern, "bad bill category pattern: {}", e);
            None
        }
    })
    .collect()
});

/// Keyword-based category for an auto-created bill.
pub fn categorize(hay: &str) -> BillCategory {
    CATEGORY_RULES
        .iter()
        .find(|(re, _)| re.is_match(hay))
        .map(|(_, c)| *c)
        .unwrap_or(BillCategory::Other)
}

/// Merchant narration with the account holder's own name removed,
/// case-insensitively, and whitespace collapsed.
pub fn strip_owner(merchant: &str, owner_identifier: &str) -> String {
    let owner = owner_identifier.trim();
    let cleaned = if owner.is_empty() {
        merchant.to_string()
    } else {
        match Regex::new(&format!("(?i){}", regex::escape(owner))) {
            Ok(re) => re.replace_all(merchant, " ").into_owned(),
            Err(_) => merchant.to_string(),
        }
    };
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Either name contains the other, ignoring case.
pub fn names_overlap(bill_name: &str, merchant: &str) -> bool {
    let a = bill_name.trim().to_lowercase();
    let b = merchant.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

/// `|bill - paid| / bill <= tolerance`.
pub fn amount_within(bill_amount: Decimal, paid: Decimal, tolerance: Decimal) -> bool {
    if bill_amount.is_zero() {
        return paid.is_zero();
    }
    ((bill_amount - paid).abs() / bill_amount.abs()) <= tolerance
}

pub fn matches(bill: &Bill, tx: &ExpenseTransaction, cfg: &Config) -> bool {
    let merchant = strip_owner(&tx.merchant, &cfg.owner_identifier);
    if !names_overlap(&bill.name, &merchant) {
        return false;
    }
    if !amount_within(bill.amount, tx.amount.abs(), cfg.amount_tolerance) {
        return false;
    }
    bill.due_date.is_none_or(|due| same_month(due, tx.date))
}

/// Add a payment and move the status forward.
pub fn apply_payment(bill: &mut Bill, tx: &ExpenseTransaction) {
    let paid = tx.amount.abs();
    bill.total_paid += paid;
    bill.status = if bill.total_paid >= bill.amount {
        BillStatus::Paid
    } else {
        BillStatus::Partial
    };
    bill.payments.push(BillPayment {
        date: tx.date,
        amount: paid,
        mode: tx.mode_of_transaction.clone(),
        merchant: tx.merchant.clone(),
        description: tx.description.clone(),
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcileOutcome {
    Matched,
    Created,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub outcome: ReconcileOutcome,
    pub bill: Bill,
    /// Dependent writes triggered by a linked record becoming paid.
    pub sync: SyncReport,
}

const BILL_COLUMNS: &str = "id, user_id, name, category, amount, due_date, status, total_paid, auto_created, source_record_id, version";

fn bill_from_row(r: &Row<'_>) -> rusqlite::Result<Bill> {
    Ok(Bill {
        id: r.get(0)?,
        user_id: r.get(1)?,
        name: r.get(2)?,
        category: r.get(3)?,
        amount: get_decimal(r, 4)?,
        due_date: r.get(5)?,
        status: r.get(6)?,
        total_paid: get_decimal(r, 7)?,
        auto_created: r.get::<_, i64>(8)? != 0,
        source_record_id: r.get(9)?,
        version: r.get(10)?,
        payments: Vec::new(),
    })
}

fn load_payments(conn: &Connection, bill_id: i64) -> Result<Vec<BillPayment>> {
    let mut stmt = conn.prepare(
        "SELECT date, amount, mode, merchant, description FROM bill_payments WHERE bill_id=?1 ORDER BY date, id",
    )?;
    let rows = stmt.query_map(params![bill_id], |r| {
        Ok(BillPayment {
            date: r.get(0)?,
            amount: get_decimal(r, 1)?,
            mode: r.get(2)?,
            merchant: r.get(3)?,
            description: r.get(4)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn query_bills(conn: &Connection, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Bill>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(args, bill_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        let mut bill = row?;
        bill.payments = load_payments(conn, bill.id)?;
        out.push(bill);
    }
    Ok(out)
}

pub fn get_bill(conn: &Connection, user_id: &str, id: i64) -> Result<Bill> {
    let sql = format!("SELECT {} FROM bills WHERE id=?1 AND user_id=?2", BILL_COLUMNS);
    let bill = conn
        .query_row(&sql, params![id, user_id], bill_from_row)
        .optional()?;
    let Some(mut bill) = bill else {
        return Err(LedgerError::not_found("bill", id).into());
    };
    bill.payments = load_payments(conn, bill.id)?;
    Ok(bill)
}

pub fn list_bills(conn: &Connection, user_id: &str, status: Option<BillStatus>) -> Result<Vec<Bill>> {
    let sql = format!(
        "SELECT {} FROM bills WHERE user_id=?1 AND (?2 IS NULL OR status=?2) ORDER BY due_date DESC, id DESC",
        BILL_COLUMNS
    );
    query_bills(conn, &sql, &[&user_id, &status])
}

/// Unpaid bills first, then oldest first, so the earliest open bill wins.
fn candidates(conn: &Connection, user_id: &str) -> Result<Vec<Bill>> {
    let sql = format!(
        "SELECT {} FROM bills WHERE user_id=?1 ORDER BY CASE status WHEN 'paid' THEN 1 ELSE 0 END, id",
        BILL_COLUMNS
    );
    query_bills(conn, &sql, &[&user_id])
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

fn insert_payment(conn: &Connection, bill_id: i64, p: &BillPayment) -> Result<()> {
    conn.execute(
        "INSERT INTO bill_payments(bill_id, date, amount, mode, merchant, description) VALUES (?1,?2,?3,?4,?5,?6)",
        params![bill_id, p.date, text(p.amount), p.mode, p.merchant, p.description],
    )?;
    Ok(())
}

/// Store the latest payment of `bill`. `false` when the row moved on since
/// `bill.version` was read.
fn save_payment(conn: &Connection, bill: &Bill) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;
    let n = tx.execute(
        "UPDATE bills SET total_paid=?1, status=?2, version=version+1 WHERE id=?3 AND version=?4",
        params![text(bill.total_paid), bill.status, bill.id, bill.version],
    )?;
    if n == 0 {
        return Ok(false);
    }
    if let Some(p) = bill.payments.last() {
        insert_payment(&tx, bill.id, p)?;
    }
    tx.commit()?;
    Ok(true)
}

fn insert_bill(conn: &Connection, bill: &Bill) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO bills(user_id, name, category, amount, due_date, due_month, status, total_paid, auto_created, source_record_id)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
        params![
            bill.user_id,
            bill.name,
            bill.category,
            text(bill.amount),
            bill.due_date,
            bill.due_date.map(month_key).unwrap_or_default(),
            bill.status,
            text(bill.total_paid),
            bill.auto_created as i64,
            bill.source_record_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn auto_bill_name(tx: &ExpenseTransaction, cfg: &Config) -> String {
    let stripped = strip_owner(&tx.merchant, &cfg.owner_identifier);
    if stripped.is_empty() {
        tx.merchant.trim().to_string()
    } else {
        stripped
    }
}

/// The auto-created bill holding the natural key `(user, name, month)`.
fn find_auto_bill(conn: &Connection, user_id: &str, name: &str, on: NaiveDate) -> Result<Option<Bill>> {
    let sql = format!(
        "SELECT {} FROM bills WHERE user_id=?1 AND lower(name)=lower(?2) AND due_month=?3 AND auto_created=1",
        BILL_COLUMNS
    );
    let bill = conn
        .query_row(&sql, params![user_id, name, month_key(on)], bill_from_row)
        .optional()?;
    match bill {
        Some(mut b) => {
            b.payments = load_payments(conn, b.id)?;
            Ok(Some(b))
        }
        None => Ok(None),
    }
}

enum AutoInsert {
    Created(Bill),
    /// Another bill already holds this natural key.
    Taken,
}

/// Insert a paid bill for an unmatched expense.
fn insert_auto_bill(conn: &Connection, user_id: &str, tx: &ExpenseTransaction, cfg: &Config) -> Result<AutoInsert> {
    let name = auto_bill_name(tx, cfg);
    let hay = match &tx.description {
        Some(d) => format!("{} {}", name, d),
        None => name.clone(),
    };
    let mut bill = Bill {
        id: 0,
        user_id: user_id.to_string(),
        category: categorize(&hay),
        name,
        amount: tx.amount.abs(),
        due_date: Some(tx.date),
        status: BillStatus::Pending,
        total_paid: Decimal::ZERO,
        auto_created: true,
        source_record_id: None,
        version: 0,
        payments: Vec::new(),
    };
    apply_payment(&mut bill, tx);

    let db_tx = conn.unchecked_transaction()?;
    bill.id = match insert_bill(&db_tx, &bill) {
        Ok(id) => id,
        Err(e) if is_constraint_violation(&e) => {
            debug!(name = %bill.name, "auto bill already exists for this month");
            return Ok(AutoInsert::Taken);
        }
        Err(e) => return Err(e).context("Insert auto-created bill"),
    };
    if let Some(p) = bill.payments.last() {
        insert_payment(&db_tx, bill.id, p)?;
    }
    db_tx.commit()?;
    Ok(AutoInsert::Created(bill))
}

/// Mark the linked source record paid once its bill is settled.
fn reverse_sync(conn: &Connection, bill: &Bill, today: NaiveDate) -> SyncReport {
    let mut report = SyncReport::default();
    let Some(record_id) = bill.source_record_id else {
        return report;
    };
    match records::set_status(conn, &bill.user_id, record_id, RecordStatus::Paid, today) {
        Ok((_, sync)) => report.merge(sync),
        Err(e) => report.fail(
            ReferenceType::Record,
            ReferenceKey::new(bill.id, ReferenceType::Bill),
            e,
        ),
    }
    report
}

/// Settle `tx` against the user's bills, creating one when nothing matches.
pub fn reconcile_expense(
    conn: &Connection,
    user_id: &str,
    tx: &ExpenseTransaction,
    cfg: &Config,
    today: NaiveDate,
) -> Result<Reconciliation> {
    if tx.merchant.trim().is_empty() {
        return Err(LedgerError::validation("Merchant is required").into());
    }
    if tx.amount.is_zero() {
        return Err(LedgerError::validation("Amount must be non-zero").into());
    }

    for attempt in 1..=MAX_ATTEMPTS {
        let found = candidates(conn, user_id)?
            .into_iter()
            .find(|b| matches(b, tx, cfg));

        let mut bill = match found {
            Some(bill) => bill,
            None => match insert_auto_bill(conn, user_id, tx, cfg)? {
                AutoInsert::Created(bill) => {
                    info!(bill = bill.id, category = %bill.category, "auto-created bill");
                    return Ok(Reconciliation {
                        outcome: ReconcileOutcome::Created,
                        bill,
                        sync: SyncReport::default(),
                    });
                }
                // Same payee and month as an existing auto bill: pay that one.
                AutoInsert::Taken => match find_auto_bill(conn, user_id, &auto_bill_name(tx, cfg), tx.date)? {
                    Some(bill) => bill,
                    None => continue,
                },
            },
        };

        let was_paid = bill.status == BillStatus::Paid;
        apply_payment(&mut bill, tx);
        if !save_payment(conn, &bill)? {
            debug!(bill = bill.id, attempt, "bill changed underneath, retrying");
            continue;
        }
        bill.version += 1;
        info!(bill = bill.id, status = %bill.status, "expense matched bill");
        let sync = if !was_paid && bill.status == BillStatus::Paid {
            reverse_sync(conn, &bill, today)
        } else {
            SyncReport::default()
        };
        return Ok(Reconciliation {
            outcome: ReconcileOutcome::Matched,
            bill,
            sync,
        });
    }
    Err(LedgerError::Conflict { entity: "bill", id: 0 }).context(format!(
        "Gave up reconciling '{}' after {} attempts",
        tx.merchant, MAX_ATTEMPTS
    ))
}

/// Keep the bill behind a daily-bill-checklist record in step with it.
///
/// One open bill per record: it is updated while unpaid, left alone once
/// paid for the same month, and a fresh one is opened when the record moves
/// on to a new month. Records without an amount or that are no longer
/// active produce nothing.
pub fn upsert_from_record(conn: &Connection, record: &FinancialRecord, due: NaiveDate) -> Result<Option<Upsert>> {
    if record.status != RecordStatus::Active {
        return Ok(None);
    }
    let Some(amount) = record.amount else {
        return Ok(None);
    };
    let biller = match &record.details {
        RecordDetails::Bill(BillDetails { biller, .. }) => Some(biller.as_str()),
        _ => None,
    };
    let category = categorize(&format!("{} {}", record.name, biller.unwrap_or_default()));

    let sql = format!(
        "SELECT {} FROM bills WHERE user_id=?1 AND source_record_id=?2 ORDER BY id DESC LIMIT 1",
        BILL_COLUMNS
    );
    let existing = conn
        .query_row(&sql, params![record.user_id, record.id], bill_from_row)
        .optional()?;

    match existing {
        Some(bill) if bill.status != BillStatus::Paid => {
            let status = if bill.total_paid >= amount {
                BillStatus::Paid
            } else if bill.total_paid.is_zero() {
                BillStatus::Pending
            } else {
                BillStatus::Partial
            };
            let n = conn.execute(
                "UPDATE bills SET name=?1, category=?2, amount=?3, due_date=?4, due_month=?5, status=?6, version=version+1
                 WHERE id=?7 AND version=?8",
                params![
                    record.name,
                    category,
                    text(amount),
                    due,
                    month_key(due),
                    status,
                    bill.id,
                    bill.version
                ],
            )?;
            if n == 0 {
                return Err(LedgerError::Conflict {
                    entity: "bill",
                    id: bill.id,
                }
                .into());
            }
            Ok(Some(Upsert::Updated(bill.id)))
        }
        Some(bill) if bill.due_date.is_some_and(|d| same_month(d, due)) => Ok(None),
        _ => {
            let bill = Bill {
                id: 0,
                user_id: record.user_id.clone(),
                name: record.name.clone(),
                category,
                amount,
                due_date: Some(due),
                status: BillStatus::Pending,
                total_paid: Decimal::ZERO,
                auto_created: false,
                source_record_id: Some(record.id),
                version: 0,
                payments: Vec::new(),
            };
            let id = insert_bill(conn, &bill).context("Insert bill for record")?;
            Ok(Some(Upsert::Created(id)))
        }
    }
}
