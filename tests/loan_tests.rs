// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use famledger::db::open_in_memory;
use famledger::errors::{LedgerError, is_not_found};
use famledger::loans::{self, InstallmentPayment};
use famledger::models::{
    Category, DependentStatus, FinancialRecord, LoanDetails, RecordDetails, RecordStatus,
    ReferenceType,
};
use famledger::sync::ReferenceKey;
use famledger::{records, schedule};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::str::FromStr;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn today() -> NaiveDate {
    date(2026, 10, 17)
}

fn loan(conn: &Connection, principal: &str, rate: &str, months: u32) -> FinancialRecord {
    let mut r = FinancialRecord::new("u1", Category::Loan, "Home loan");
    r.start_date = Some(date(2026, 1, 15));
    r.details = RecordDetails::Loan(LoanDetails {
        principal: d(principal),
        annual_rate: d(rate),
        tenure_months: months,
        lender: Some("SBI".into()),
    });
    records::create_record(conn, r, today()).unwrap().0
}

fn pay(number: u32, extra: &str) -> InstallmentPayment {
    InstallmentPayment {
        payment_number: number,
        amount: None,
        paid_date: date(2026, 2, 15),
        extra: d(extra),
    }
}

#[test]
fn creating_a_loan_builds_its_schedule() {
    let conn = open_in_memory().unwrap();
    let r = loan(&conn, "100000", "12", 12);
    assert_eq!(r.amount, Some(d("100000")));
    assert_eq!(r.payable_date, Some(date(2026, 2, 15)));

    let s = loans::load_schedule(&conn, r.id).unwrap();
    assert_eq!(s.len(), 12);
    assert_eq!(s[0].payment, d("8884.88"));
    assert_eq!(s[11].due_date, date(2027, 1, 15));
    assert_eq!(s[11].ending_balance, Decimal::ZERO);

    let ev = schedule::find_calendar_by_reference(
        &conn,
        "u1",
        ReferenceKey::new(r.id, ReferenceType::Record),
    )
    .unwrap()
    .unwrap();
    assert_eq!(ev.date, date(2026, 2, 15));
}

#[test]
fn invalid_terms_are_rejected() {
    let conn = open_in_memory().unwrap();
    let mut r = FinancialRecord::new("u1", Category::Loan, "Bad loan");
    r.details = RecordDetails::Loan(LoanDetails {
        principal: d("1000"),
        annual_rate: d("12"),
        tenure_months: 0,
        lender: None,
    });
    assert!(records::create_record(&conn, r, today()).is_err());
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM records", [], |r| r.get(0))
        .unwrap();
    assert_eq!(n, 0);
}

#[test]
fn loans_at_the_rate_and_tenure_limits_schedule_without_overflow() {
    let conn = open_in_memory().unwrap();
    let r = loan(&conn, "10000000000", "100", 600);
    let s = loans::load_schedule(&conn, r.id).unwrap();
    assert_eq!(s.len(), 600);
    assert_eq!(s[0].interest, d("833333333.33"));
    assert!(s[0].payment >= s[0].interest);
    assert_eq!(s[599].ending_balance, Decimal::ZERO);
    let repaid: Decimal = s.iter().map(|e| e.principal).sum();
    assert_eq!(repaid, d("10000000000"));

    let mut huge = FinancialRecord::new("u1", Category::Loan, "Too big");
    huge.details = RecordDetails::Loan(LoanDetails {
        principal: Decimal::MAX,
        annual_rate: d("100"),
        tenure_months: 1,
        lender: None,
    });
    let err = records::create_record(&conn, huge, today()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::Validation(_))
    ));
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM records", [], |r| r.get(0))
        .unwrap();
    assert_eq!(n, 1);
}

#[test]
fn payments_beyond_the_outstanding_balance_are_rejected() {
    let conn = open_in_memory().unwrap();
    let r = loan(&conn, "100000", "12", 12);
    let err = loans::pay_installment(&conn, "u1", r.id, &pay(1, "92115.13"), today()).unwrap_err();
    assert!(err.to_string().contains("outstanding"));
    let err = loans::record_payment(&conn, "u1", r.id, Decimal::MAX, today(), today()).unwrap_err();
    assert!(err.to_string().contains("outstanding"));
    assert!(!loans::has_payments(&conn, r.id).unwrap());

    // Clearing the whole balance in one go is allowed.
    let out = loans::record_payment(&conn, "u1", r.id, d("101000"), today(), today()).unwrap();
    assert_eq!(out.record.status, RecordStatus::Paid);
}

#[test]
fn extra_payment_reshapes_the_rest_of_the_schedule() {
    let conn = open_in_memory().unwrap();
    let r = loan(&conn, "100000", "12", 12);
    let out = loans::pay_installment(&conn, "u1", r.id, &pay(1, "10000"), today()).unwrap();
    assert!(out.sync.is_clean());
    assert_eq!(out.record.payable_date, Some(date(2026, 3, 15)));
    assert_eq!(out.record.status, RecordStatus::Active);

    let s = loans::load_schedule(&conn, r.id).unwrap();
    assert!(s[0].is_paid);
    assert_eq!(s[0].paid_amount, Some(d("18884.88")));
    assert_eq!(s[0].principal, d("17884.88"));
    assert_eq!(s[1].beginning_balance, d("82115.12"));
    assert_eq!(s[1].interest, d("821.15"));
    assert_eq!(s, out.schedule);

    // a loan with payments keeps its schedule on edit
    assert!(loans::has_payments(&conn, r.id).unwrap());
}

#[test]
fn paying_twice_or_out_of_range_fails() {
    let conn = open_in_memory().unwrap();
    let r = loan(&conn, "100000", "12", 12);
    loans::pay_installment(&conn, "u1", r.id, &pay(1, "0"), today()).unwrap();
    assert!(loans::pay_installment(&conn, "u1", r.id, &pay(1, "0"), today()).is_err());
    let err = loans::pay_installment(&conn, "u1", r.id, &pay(13, "0"), today()).unwrap_err();
    assert!(is_not_found(&err));
    assert!(loans::pay_installment(&conn, "u1", r.id, &pay(2, "-5"), today()).is_err());
}

#[test]
fn bank_payments_accumulate_then_prepay() {
    let conn = open_in_memory().unwrap();
    let r = loan(&conn, "100000", "12", 12);

    let out = loans::record_payment(&conn, "u1", r.id, d("5000"), date(2026, 2, 10), today()).unwrap();
    assert!(!out.schedule[0].is_paid);
    assert_eq!(out.schedule[0].paid_amount, Some(d("5000")));
    assert_eq!(out.record.payable_date, Some(date(2026, 2, 15)));

    let out = loans::record_payment(&conn, "u1", r.id, d("5000"), date(2026, 2, 14), today()).unwrap();
    let s = &out.schedule;
    assert!(s[0].is_paid);
    assert_eq!(s[0].extra_payment, d("1115.12"));
    assert_eq!(s[0].ending_balance, d("91000"));
    assert_eq!(s[1].beginning_balance, d("91000"));
    assert_eq!(out.record.payable_date, Some(date(2026, 3, 15)));
    assert_eq!(loans::load_schedule(&conn, r.id).unwrap(), out.schedule);
}

#[test]
fn last_installment_settles_the_loan() {
    let conn = open_in_memory().unwrap();
    let r = loan(&conn, "1000", "0", 2);
    loans::pay_installment(&conn, "u1", r.id, &pay(1, "0"), today()).unwrap();
    let out = loans::pay_installment(&conn, "u1", r.id, &pay(2, "0"), today()).unwrap();
    assert_eq!(out.record.status, RecordStatus::Paid);
    assert_eq!(out.record.payable_date, Some(date(2026, 3, 15)));

    let rem = schedule::find_reminder_by_reference(
        &conn,
        "u1",
        ReferenceKey::new(r.id, ReferenceType::Record),
    )
    .unwrap()
    .unwrap();
    assert_eq!(rem.status, DependentStatus::Paused);

    assert!(loans::record_payment(&conn, "u1", r.id, d("1"), today(), today()).is_err());
}

#[test]
fn payments_need_a_loan_record() {
    let conn = open_in_memory().unwrap();
    let mut r = FinancialRecord::new("u1", Category::Insurance, "Term plan");
    r.payable_date = Some(date(2027, 1, 10));
    let (r, _) = records::create_record(&conn, r, today()).unwrap();
    assert!(loans::record_payment(&conn, "u1", r.id, d("100"), today(), today()).is_err());
    let err = loans::record_payment(&conn, "u1", 999, d("100"), today(), today()).unwrap_err();
    assert!(is_not_found(&err));
}
