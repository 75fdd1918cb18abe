// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Financial records (investments, cash, loans and family records).
//!
//! Every write derives computed fields first and fans out through
//! [`crate::sync`] afterwards; the returned [`SyncReport`] lists any
//! dependent writes that failed.

use crate::amortization;
use crate::calc::Derive;
use crate::db::{get_opt_decimal, opt_text};
use crate::errors::LedgerError;
use crate::loans;
use crate::models::{Category, FinancialRecord, RecordDetails, RecordStatus, ReferenceType};
use crate::sync::{self, ReferenceKey, SyncReport};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use tracing::{debug, info};

const RECORD_COLUMNS: &str = "id, user_id, category, type, name, provider, quantity, purchase_price, current_value, amount, start_date, maturity_date, payable_date, frequency, storage_type, returns, returns_percentage, status, details, version";

fn record_from_row(r: &Row<'_>) -> rusqlite::Result<FinancialRecord> {
    let details_raw: String = r.get(18)?;
    let details: RecordDetails = serde_json::from_str(&details_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(18, Type::Text, Box::new(e)))?;
    Ok(FinancialRecord {
        id: r.get(0)?,
        user_id: r.get(1)?,
        category: r.get(2)?,
        r#type: r.get(3)?,
        name: r.get(4)?,
        provider: r.get(5)?,
        quantity: get_opt_decimal(r, 6)?,
        purchase_price: get_opt_decimal(r, 7)?,
        current_value: get_opt_decimal(r, 8)?,
        amount: get_opt_decimal(r, 9)?,
        start_date: r.get(10)?,
        maturity_date: r.get(11)?,
        payable_date: r.get(12)?,
        frequency: r.get(13)?,
        storage_type: r.get(14)?,
        returns: get_opt_decimal(r, 15)?,
        returns_percentage: get_opt_decimal(r, 16)?,
        status: r.get(17)?,
        details,
        version: r.get(19)?,
    })
}

pub fn validate(record: &FinancialRecord) -> Result<(), LedgerError> {
    if record.name.trim().is_empty() {
        return Err(LedgerError::validation("Name is required"));
    }
    if record.user_id.trim().is_empty() {
        return Err(LedgerError::validation("User is required"));
    }
    for (label, v) in [
        ("quantity", record.quantity),
        ("purchase price", record.purchase_price),
        ("amount", record.amount),
    ] {
        if v.is_some_and(|d| d < Decimal::ZERO) {
            return Err(LedgerError::validation(format!("{} cannot be negative", label)));
        }
    }
    if let (Some(start), Some(maturity)) = (record.start_date, record.maturity_date) {
        if maturity < start {
            return Err(LedgerError::validation(format!(
                "Maturity date {} is before start date {}",
                maturity, start
            )));
        }
    }
    record.details.validate_for(record.category)?;
    if let RecordDetails::Loan(l) = &record.details {
        amortization::emi(l.principal, amortization::monthly_rate(l.annual_rate), l.tenure_months)?;
    }
    Ok(())
}

pub fn get_record(conn: &Connection, user_id: &str, id: i64) -> Result<FinancialRecord> {
    let sql = format!(
        "SELECT {} FROM records WHERE id=?1 AND user_id=?2",
        RECORD_COLUMNS
    );
    conn.query_row(&sql, params![id, user_id], record_from_row)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("record", id).into())
}

pub fn list_records(
    conn: &Connection,
    user_id: &str,
    category: Option<Category>,
) -> Result<Vec<FinancialRecord>> {
    let sql = format!(
        "SELECT {} FROM records WHERE user_id=?1 AND (?2 IS NULL OR category=?2) ORDER BY category, name, id",
        RECORD_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id, category], record_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn details_json(details: &RecordDetails) -> Result<String> {
    serde_json::to_string(details).context("Serialize record details")
}

fn insert_row(conn: &Connection, r: &FinancialRecord) -> Result<i64> {
    conn.execute(
        "INSERT INTO records(user_id, category, type, name, provider, quantity, purchase_price, current_value, amount, start_date, maturity_date, payable_date, frequency, storage_type, returns, returns_percentage, status, details)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18)",
        params![
            r.user_id,
            r.category,
            r.r#type,
            r.name,
            r.provider,
            opt_text(r.quantity),
            opt_text(r.purchase_price),
            opt_text(r.current_value),
            opt_text(r.amount),
            r.start_date,
            r.maturity_date,
            r.payable_date,
            r.frequency,
            r.storage_type,
            opt_text(r.returns),
            opt_text(r.returns_percentage),
            r.status,
            details_json(&r.details)?,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Write `r` if nobody else bumped its version since it was read.
fn update_row(conn: &Connection, r: &FinancialRecord) -> Result<()> {
    let n = conn.execute(
        "UPDATE records SET category=?1, type=?2, name=?3, provider=?4, quantity=?5, purchase_price=?6, current_value=?7, amount=?8, start_date=?9, maturity_date=?10, payable_date=?11, frequency=?12, storage_type=?13, returns=?14, returns_percentage=?15, status=?16, details=?17, version=version+1, updated_at=datetime('now')
         WHERE id=?18 AND user_id=?19 AND version=?20",
        params![
            r.category,
            r.r#type,
            r.name,
            r.provider,
            opt_text(r.quantity),
            opt_text(r.purchase_price),
            opt_text(r.current_value),
            opt_text(r.amount),
            r.start_date,
            r.maturity_date,
            r.payable_date,
            r.frequency,
            r.storage_type,
            opt_text(r.returns),
            opt_text(r.returns_percentage),
            r.status,
            details_json(&r.details)?,
            r.id,
            r.user_id,
            r.version,
        ],
    )?;
    if n == 0 {
        // Distinguish a missing row from a lost race.
        get_record(conn, &r.user_id, r.id)?;
        return Err(LedgerError::Conflict {
            entity: "record",
            id: r.id,
        }
        .into());
    }
    Ok(())
}

/// Loans borrow their cost basis from the principal when none is given.
fn apply_loan_defaults(record: &mut FinancialRecord) {
    if let RecordDetails::Loan(l) = &record.details {
        if record.amount.is_none() && record.quantity.is_none() {
            record.amount = Some(l.principal);
        }
    }
}

pub fn create_record(
    conn: &Connection,
    mut record: FinancialRecord,
    today: NaiveDate,
) -> Result<(FinancialRecord, SyncReport)> {
    validate(&record)?;
    apply_loan_defaults(&mut record);
    record.derive();
    record.id = insert_row(conn, &record).context("Insert record")?;
    record.version = 0;
    info!(id = record.id, category = %record.category, "record created");

    if let RecordDetails::Loan(terms) = &record.details {
        let first_due = loans::first_due_date(record.start_date.unwrap_or(today));
        let schedule = loans::create_schedule(conn, record.id, terms, first_due)?;
        if record.payable_date.is_none() {
            record.payable_date = schedule.first().map(|e| e.due_date);
            update_row(conn, &record)?;
            record.version += 1;
        }
    }

    let report = sync::sync_record(conn, &record, today);
    Ok((record, report))
}

/// Persist edits to a record previously read with [`get_record`].
pub fn update_record(
    conn: &Connection,
    mut record: FinancialRecord,
    today: NaiveDate,
) -> Result<(FinancialRecord, SyncReport)> {
    validate(&record)?;
    let before = get_record(conn, &record.user_id, record.id)?;
    apply_loan_defaults(&mut record);
    record.derive();
    update_row(conn, &record)?;
    record.version += 1;
    debug!(id = record.id, version = record.version, "record updated");

    if let RecordDetails::Loan(terms) = &record.details {
        let terms_changed = before.details != record.details || before.start_date != record.start_date;
        if terms_changed && !loans::has_payments(conn, record.id)? {
            let first_due = loans::first_due_date(record.start_date.unwrap_or(today));
            let schedule = loans::create_schedule(conn, record.id, terms, first_due)?;
            record.payable_date = schedule.first().map(|e| e.due_date);
            update_row(conn, &record)?;
            record.version += 1;
        }
    }

    let report = sync::sync_record(conn, &record, today);
    Ok((record, report))
}

/// Re-read, change status, and re-run the sync for a record.
pub fn set_status(
    conn: &Connection,
    user_id: &str,
    id: i64,
    status: RecordStatus,
    today: NaiveDate,
) -> Result<(FinancialRecord, SyncReport)> {
    let mut record = get_record(conn, user_id, id)?;
    if record.status == status {
        let report = sync::sync_record(conn, &record, today);
        return Ok((record, report));
    }
    record.status = status;
    update_row(conn, &record)?;
    record.version += 1;
    let report = sync::sync_record(conn, &record, today);
    Ok((record, report))
}

/// Store a new payable date computed elsewhere (e.g. the next unpaid loan
/// installment) and re-sync.
pub fn set_payable_date(
    conn: &Connection,
    user_id: &str,
    id: i64,
    payable_date: Option<NaiveDate>,
    status: RecordStatus,
    today: NaiveDate,
) -> Result<(FinancialRecord, SyncReport)> {
    let mut record = get_record(conn, user_id, id)?;
    record.payable_date = payable_date;
    record.status = status;
    update_row(conn, &record)?;
    record.version += 1;
    let report = sync::sync_record(conn, &record, today);
    Ok((record, report))
}

/// Delete a record; its schedule goes with it and its calendar events and
/// reminders are removed best effort.
pub fn delete_record(conn: &Connection, user_id: &str, id: i64) -> Result<SyncReport> {
    get_record(conn, user_id, id)?;
    conn.execute(
        "DELETE FROM records WHERE id=?1 AND user_id=?2",
        params![id, user_id],
    )?;
    info!(id, "record deleted");
    Ok(sync::cascade_delete(
        conn,
        user_id,
        ReferenceKey::new(id, ReferenceType::Record),
    ))
}
