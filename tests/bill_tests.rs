// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use famledger::bills::{self, ReconcileOutcome};
use famledger::config::Config;
use famledger::db::open_in_memory;
use famledger::models::{
    BillCategory, BillStatus, Category, DependentStatus, ExpenseTransaction, FinancialRecord,
    Frequency, RecordStatus, ReferenceType,
};
use famledger::sync::{ReferenceKey, SyncReport};
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

fn cfg() -> Config {
    Config {
        owner_identifier: "Asha Rao".into(),
        ..Config::default()
    }
}

fn expense(merchant: &str, amount: &str, on: NaiveDate) -> ExpenseTransaction {
    ExpenseTransaction {
        merchant: merchant.into(),
        amount: d(amount),
        date: on,
        mode_of_transaction: Some("upi".into()),
        description: None,
    }
}

fn bill_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM bills", [], |r| r.get(0))
        .unwrap()
}

fn checklist(conn: &Connection, name: &str, amount: &str) -> FinancialRecord {
    let mut r = FinancialRecord::new("u1", Category::DailyBillChecklist, name);
    r.frequency = Some(Frequency::Monthly);
    r.maturity_date = Some(date(2026, 8, 5));
    r.amount = Some(d(amount));
    records::create_record(conn, r, today()).unwrap().0
}

#[test]
fn paying_a_linked_bill_marks_the_record_paid() {
    let conn = open_in_memory().unwrap();
    let record = checklist(&conn, "City Power", "1200");
    let open = bills::list_bills(&conn, "u1", Some(BillStatus::Pending)).unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].due_date, Some(date(2026, 11, 5)));
    assert_eq!(open[0].category, BillCategory::Electricity);

    let tx = expense("UPI-ASHA RAO-City Power", "-1200", date(2026, 11, 2));
    let rec = bills::reconcile_expense(&conn, "u1", &tx, &cfg(), today()).unwrap();
    assert_eq!(rec.outcome, ReconcileOutcome::Matched);
    assert_eq!(rec.bill.id, open[0].id);
    assert_eq!(rec.bill.status, BillStatus::Paid);
    assert_eq!(rec.bill.total_paid, d("1200"));
    assert!(rec.sync.is_clean());
    assert_eq!(rec.sync.updated, 2);

    let record = records::get_record(&conn, "u1", record.id).unwrap();
    assert_eq!(record.status, RecordStatus::Paid);
    let key = ReferenceKey::new(record.id, ReferenceType::Record);
    let ev = schedule::find_calendar_by_reference(&conn, "u1", key)
        .unwrap()
        .unwrap();
    assert_eq!(ev.status, DependentStatus::Completed);

    let stored = bills::get_bill(&conn, "u1", rec.bill.id).unwrap();
    assert_eq!(stored.payments.len(), 1);
    assert_eq!(stored.payments[0].amount, d("1200"));
    assert_eq!(stored.version, 1);
    assert_eq!(bill_count(&conn), 1);
}

#[test]
fn short_payment_leaves_bill_partial_and_record_active() {
    let conn = open_in_memory().unwrap();
    let record = checklist(&conn, "Greenwood Society Maintenance", "5000");
    let tx = expense("Greenwood Society Maintenance", "4600", date(2026, 11, 1));
    let rec = bills::reconcile_expense(&conn, "u1", &tx, &cfg(), today()).unwrap();
    assert_eq!(rec.outcome, ReconcileOutcome::Matched);
    assert_eq!(rec.bill.status, BillStatus::Partial);
    assert_eq!(rec.sync, SyncReport::default());
    let record = records::get_record(&conn, "u1", record.id).unwrap();
    assert_eq!(record.status, RecordStatus::Active);

    // the open bill still wins over creating a new one
    let rec = bills::reconcile_expense(&conn, "u1", &tx, &cfg(), today()).unwrap();
    assert_eq!(rec.bill.status, BillStatus::Paid);
    assert_eq!(rec.bill.total_paid, d("9200"));
    assert_eq!(bill_count(&conn), 1);
}

#[test]
fn unmatched_expense_creates_a_paid_bill() {
    let conn = open_in_memory().unwrap();
    let tx = expense("Asha Rao Airtel Postpaid", "799", date(2026, 10, 10));
    let rec = bills::reconcile_expense(&conn, "u1", &tx, &cfg(), today()).unwrap();
    assert_eq!(rec.outcome, ReconcileOutcome::Created);
    assert_eq!(rec.bill.name, "Airtel Postpaid");
    assert_eq!(rec.bill.category, BillCategory::Mobile);
    assert_eq!(rec.bill.status, BillStatus::Paid);
    assert!(rec.bill.auto_created);
    assert_eq!(rec.bill.due_date, Some(date(2026, 10, 10)));

    let stored = bills::get_bill(&conn, "u1", rec.bill.id).unwrap();
    assert_eq!(stored, rec.bill);
}

#[test]
fn repeated_expense_lands_on_the_same_bill() {
    let conn = open_in_memory().unwrap();
    let tx = expense("Airtel Postpaid", "799", date(2026, 10, 10));
    let first = bills::reconcile_expense(&conn, "u1", &tx, &cfg(), today()).unwrap();
    let second = bills::reconcile_expense(&conn, "u1", &tx, &cfg(), today()).unwrap();
    assert_eq!(second.outcome, ReconcileOutcome::Matched);
    assert_eq!(second.bill.id, first.bill.id);
    assert_eq!(second.bill.total_paid, d("1598"));
    assert_eq!(bill_count(&conn), 1);
}

#[test]
fn second_payee_amount_in_month_reuses_auto_bill() {
    let conn = open_in_memory().unwrap();
    let a = expense("Airtel Postpaid", "799", date(2026, 10, 10));
    let b = expense("AIRTEL POSTPAID", "1500", date(2026, 10, 24));
    let first = bills::reconcile_expense(&conn, "u1", &a, &cfg(), today()).unwrap();
    let second = bills::reconcile_expense(&conn, "u1", &b, &cfg(), today()).unwrap();
    assert_eq!(second.outcome, ReconcileOutcome::Matched);
    assert_eq!(second.bill.id, first.bill.id);
    assert_eq!(second.bill.total_paid, d("2299"));
    assert_eq!(second.bill.payments.len(), 2);
    assert_eq!(bill_count(&conn), 1);

    // next month is a new bill
    let c = expense("Airtel Postpaid", "799", date(2026, 11, 10));
    let third = bills::reconcile_expense(&conn, "u1", &c, &cfg(), today()).unwrap();
    assert_eq!(third.outcome, ReconcileOutcome::Created);
    assert_eq!(bill_count(&conn), 2);
}

#[test]
fn bills_do_not_cross_users() {
    let conn = open_in_memory().unwrap();
    checklist(&conn, "City Power", "1200");
    let tx = expense("City Power", "1200", date(2026, 11, 2));
    let rec = bills::reconcile_expense(&conn, "u2", &tx, &cfg(), today()).unwrap();
    assert_eq!(rec.outcome, ReconcileOutcome::Created);
    assert_eq!(bills::list_bills(&conn, "u1", None).unwrap().len(), 1);
    assert_eq!(bills::list_bills(&conn, "u2", None).unwrap().len(), 1);
}

#[test]
fn rejects_blank_merchant_and_zero_amount() {
    let conn = open_in_memory().unwrap();
    assert!(bills::reconcile_expense(&conn, "u1", &expense("  ", "10", today()), &cfg(), today()).is_err());
    assert!(bills::reconcile_expense(&conn, "u1", &expense("Shop", "0", today()), &cfg(), today()).is_err());
    assert_eq!(bill_count(&conn), 0);
}

#[test]
fn next_month_opens_a_new_bill_for_the_record() {
    let conn = open_in_memory().unwrap();
    let record = checklist(&conn, "City Power", "1200");
    let tx = expense("City Power", "1200", date(2026, 11, 2));
    bills::reconcile_expense(&conn, "u1", &tx, &cfg(), today()).unwrap();

    // Reactivating moves the record to its next due date in a later month.
    let (_, report) =
        records::set_status(&conn, "u1", record.id, RecordStatus::Active, date(2026, 11, 20)).unwrap();
    assert!(report.is_clean());
    let all = bills::list_bills(&conn, "u1", None).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].due_date, Some(date(2026, 12, 5)));
    assert_eq!(all[0].status, BillStatus::Pending);
}
