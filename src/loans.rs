// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Loan schedules on disk and payments against them.

use crate::amortization::{generate_schedule, monthly_rate, next_unpaid, recalculate};
use crate::db::{get_decimal, get_opt_decimal, opt_text, text};
use crate::errors::LedgerError;
use crate::models::{FinancialRecord, LoanDetails, PaymentEntry, RecordDetails, RecordStatus};
use crate::records;
use crate::sync::SyncReport;
use crate::utils::add_months;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

/// EMIs start one month after disbursal.
pub fn first_due_date(start: NaiveDate) -> NaiveDate {
    add_months(start, 1).unwrap_or(start)
}

pub fn load_schedule(conn: &Connection, record_id: i64) -> Result<Vec<PaymentEntry>> {
    let mut stmt = conn.prepare(
        "SELECT payment_number, due_date, beginning_balance, interest, principal, payment, extra_payment, ending_balance, is_paid, paid_date, paid_amount
         FROM loan_schedule WHERE record_id=?1 ORDER BY payment_number",
    )?;
    let rows = stmt.query_map(params![record_id], |r| {
        Ok(PaymentEntry {
            payment_number: r.get(0)?,
            due_date: r.get(1)?,
            beginning_balance: get_decimal(r, 2)?,
            interest: get_decimal(r, 3)?,
            principal: get_decimal(r, 4)?,
            payment: get_decimal(r, 5)?,
            extra_payment: get_decimal(r, 6)?,
            ending_balance: get_decimal(r, 7)?,
            is_paid: r.get::<_, i64>(8)? != 0,
            paid_date: r.get(9)?,
            paid_amount: get_opt_decimal(r, 10)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn has_payments(conn: &Connection, record_id: i64) -> Result<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM loan_schedule WHERE record_id=?1 AND (is_paid=1 OR paid_amount IS NOT NULL)",
        params![record_id],
        |r| r.get(0),
    )?;
    Ok(n > 0)
}

/// Replace the schedule of `record_id` with a freshly generated one.
pub fn create_schedule(
    conn: &Connection,
    record_id: i64,
    terms: &LoanDetails,
    first_due: NaiveDate,
) -> Result<Vec<PaymentEntry>> {
    let schedule =
        generate_schedule(terms.principal, terms.annual_rate, terms.tenure_months, first_due)?;
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM loan_schedule WHERE record_id=?1", params![record_id])?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO loan_schedule(record_id, payment_number, due_date, beginning_balance, interest, principal, payment, extra_payment, ending_balance)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
        )?;
        for e in &schedule {
            stmt.execute(params![
                record_id,
                e.payment_number,
                e.due_date,
                text(e.beginning_balance),
                text(e.interest),
                text(e.principal),
                text(e.payment),
                text(e.extra_payment),
                text(e.ending_balance),
            ])?;
        }
    }
    tx.commit()?;
    info!(record = record_id, installments = schedule.len(), "loan schedule generated");
    Ok(schedule)
}

fn save_entries(conn: &Connection, record_id: i64, entries: &[PaymentEntry]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "UPDATE loan_schedule SET beginning_balance=?1, interest=?2, principal=?3, payment=?4, extra_payment=?5, ending_balance=?6, is_paid=?7, paid_date=?8, paid_amount=?9
             WHERE record_id=?10 AND payment_number=?11",
        )?;
        for e in entries {
            stmt.execute(params![
                text(e.beginning_balance),
                text(e.interest),
                text(e.principal),
                text(e.payment),
                text(e.extra_payment),
                text(e.ending_balance),
                e.is_paid as i64,
                e.paid_date,
                opt_text(e.paid_amount),
                record_id,
                e.payment_number,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcome {
    pub record: FinancialRecord,
    pub schedule: Vec<PaymentEntry>,
    pub sync: SyncReport,
}

fn loan_terms(record: &FinancialRecord) -> Result<&LoanDetails> {
    match &record.details {
        RecordDetails::Loan(terms) => Ok(terms),
        _ => Err(LedgerError::validation(format!("Record {} is not a loan", record.id)).into()),
    }
}

/// Point the record at the next installment still owed and re-sync it.
fn advance_record(
    conn: &Connection,
    record: &FinancialRecord,
    schedule: Vec<PaymentEntry>,
    today: NaiveDate,
) -> Result<PaymentOutcome> {
    let (payable, status) = match next_unpaid(&schedule) {
        Some(i) => (Some(schedule[i].due_date), RecordStatus::Active),
        None => (
            schedule.last().map(|e| e.due_date).or(record.payable_date),
            RecordStatus::Paid,
        ),
    };
    let (record, sync) =
        records::set_payable_date(conn, &record.user_id, record.id, payable, status, today)?;
    Ok(PaymentOutcome {
        record,
        schedule,
        sync,
    })
}

/// One installment settled by hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstallmentPayment {
    pub payment_number: u32,
    /// Defaults to the scheduled payment plus `extra`.
    pub amount: Option<Decimal>,
    pub paid_date: NaiveDate,
    /// Prepaid principal on top of the installment.
    pub extra: Decimal,
}

/// Mark one installment paid. A positive `extra` prepays principal and
/// reshapes the rest of the schedule.
pub fn pay_installment(
    conn: &Connection,
    user_id: &str,
    record_id: i64,
    payment: &InstallmentPayment,
    today: NaiveDate,
) -> Result<PaymentOutcome> {
    let InstallmentPayment {
        payment_number,
        amount,
        paid_date,
        extra,
    } = *payment;
    let record = records::get_record(conn, user_id, record_id)?;
    let rate = monthly_rate(loan_terms(&record)?.annual_rate);
    if extra < Decimal::ZERO {
        return Err(LedgerError::validation("Extra payment cannot be negative").into());
    }
    let mut schedule = load_schedule(conn, record_id)?;
    let idx = schedule
        .iter()
        .position(|e| e.payment_number == payment_number)
        .ok_or_else(|| LedgerError::not_found("installment", payment_number as i64))?;
    if schedule[idx].is_paid {
        return Err(LedgerError::validation(format!(
            "Installment {} is already paid",
            payment_number
        ))
        .into());
    }

    if extra > schedule[idx].ending_balance {
        return Err(LedgerError::validation(format!(
            "Extra payment exceeds the {} still outstanding",
            schedule[idx].ending_balance
        ))
        .into());
    }

    let entry = &mut schedule[idx];
    entry.is_paid = true;
    entry.paid_date = Some(paid_date);
    entry.extra_payment = extra;
    entry.paid_amount = Some(amount.unwrap_or(entry.payment + extra));
    if !extra.is_zero() {
        recalculate(&mut schedule, idx, rate);
    }
    save_entries(conn, record_id, &schedule[idx..]).context("Save loan schedule")?;
    info!(record = record_id, payment_number, "installment paid");
    advance_record(conn, &record, schedule, today)
}

/// Apply a bank-sourced payment to the first installment still owed.
/// Partial amounts accumulate; anything beyond the installment becomes a
/// prepayment.
pub fn record_payment(
    conn: &Connection,
    user_id: &str,
    record_id: i64,
    amount: Decimal,
    paid_date: NaiveDate,
    today: NaiveDate,
) -> Result<PaymentOutcome> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::validation("Payment amount must be positive").into());
    }
    let record = records::get_record(conn, user_id, record_id)?;
    let rate = monthly_rate(loan_terms(&record)?.annual_rate);
    let mut schedule = load_schedule(conn, record_id)?;
    let idx = next_unpaid(&schedule).ok_or_else(|| {
        LedgerError::validation(format!("Loan {} is already repaid", record_id))
    })?;

    let entry = &mut schedule[idx];
    let outstanding = entry.beginning_balance + entry.interest;
    let total = entry
        .paid_amount
        .unwrap_or(Decimal::ZERO)
        .checked_add(amount)
        .filter(|t| *t <= outstanding)
        .ok_or_else(|| {
            LedgerError::validation(format!("Payment exceeds the {} still outstanding", outstanding))
        })?;
    entry.paid_amount = Some(total);
    entry.paid_date = Some(paid_date);
    if total >= entry.payment {
        entry.is_paid = true;
        let overflow = total - entry.payment;
        if overflow > Decimal::ZERO {
            entry.extra_payment += overflow;
            recalculate(&mut schedule, idx, rate);
        }
    }
    save_entries(conn, record_id, &schedule[idx..]).context("Save loan schedule")?;
    info!(record = record_id, payment_number = schedule[idx].payment_number, "loan payment recorded");
    advance_record(conn, &record, schedule, today)
}
