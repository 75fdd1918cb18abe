// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use famledger::db::open_in_memory;
use famledger::models::{
    Category, DependentStatus, FinancialRecord, Frequency, RecordStatus, ReferenceType,
};
use famledger::sync::{self, ReferenceKey};
use famledger::{records, schedule};
use rusqlite::Connection;
use rust_decimal::Decimal;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2026, 10, 17)
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
        .unwrap()
}

fn power_bill() -> FinancialRecord {
    let mut r = FinancialRecord::new("u1", Category::DailyBillChecklist, "City Power");
    r.frequency = Some(Frequency::Monthly);
    r.maturity_date = Some(date(2026, 8, 5));
    r.amount = Some(Decimal::new(1200, 0));
    r
}

fn key(id: i64) -> ReferenceKey {
    ReferenceKey::new(id, ReferenceType::Record)
}

#[test]
fn overdue_monthly_bill_reminder_moves_to_next_due_day() {
    let conn = open_in_memory().unwrap();
    let (r, report) = records::create_record(&conn, power_bill(), today()).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.created, 3);

    let rem = schedule::find_reminder_by_reference(&conn, "u1", key(r.id))
        .unwrap()
        .unwrap();
    assert_eq!(rem.date_time.date(), date(2026, 11, 5));
    assert_eq!(rem.status, DependentStatus::Active);
    assert!(rem.repeat);
    assert_eq!(rem.origin_chain.to_string(), "record");

    let ev = schedule::find_calendar_by_reference(&conn, "u1", key(r.id))
        .unwrap()
        .unwrap();
    assert_eq!(ev.date, date(2026, 11, 5));
    assert_eq!(ev.title, "City Power (daily-bill-checklist)");
}

#[test]
fn syncing_twice_does_not_duplicate() {
    let conn = open_in_memory().unwrap();
    let (r, _) = records::create_record(&conn, power_bill(), today()).unwrap();
    for _ in 0..2 {
        let report = sync::sync_record(&conn, &r, today());
        assert_eq!(report.created, 0);
        assert!(report.is_clean());
    }
    assert_eq!(count(&conn, "calendar_events"), 1);
    assert_eq!(count(&conn, "reminders"), 1);
    assert_eq!(count(&conn, "bills"), 1);
}

#[test]
fn record_without_any_date_is_skipped() {
    let conn = open_in_memory().unwrap();
    let r = FinancialRecord::new("u1", Category::Gold, "Coins");
    let (_, report) = records::create_record(&conn, r, today()).unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(count(&conn, "calendar_events"), 0);
}

#[test]
fn paid_record_completes_event_and_pauses_reminder() {
    let conn = open_in_memory().unwrap();
    let (r, _) = records::create_record(&conn, power_bill(), today()).unwrap();
    let (r, report) = records::set_status(&conn, "u1", r.id, RecordStatus::Paid, today()).unwrap();
    assert!(report.is_clean());
    let ev = schedule::find_calendar_by_reference(&conn, "u1", key(r.id))
        .unwrap()
        .unwrap();
    let rem = schedule::find_reminder_by_reference(&conn, "u1", key(r.id))
        .unwrap()
        .unwrap();
    assert_eq!(ev.status, DependentStatus::Completed);
    assert_eq!(rem.status, DependentStatus::Paused);
    // settled against the stored date, not projected
    assert_eq!(ev.date, date(2026, 8, 5));
}

#[test]
fn deleting_a_record_removes_its_dependents_only() {
    let conn = open_in_memory().unwrap();
    let (a, _) = records::create_record(&conn, power_bill(), today()).unwrap();
    let mut other = FinancialRecord::new("u1", Category::Insurance, "Term plan");
    other.payable_date = Some(date(2027, 1, 10));
    let (b, _) = records::create_record(&conn, other, today()).unwrap();

    let report = records::delete_record(&conn, "u1", a.id).unwrap();
    assert_eq!(report.deleted, 2);
    assert!(report.is_clean());
    assert_eq!(count(&conn, "calendar_events"), 1);
    assert_eq!(count(&conn, "reminders"), 1);
    assert!(schedule::find_reminder_by_reference(&conn, "u1", key(b.id))
        .unwrap()
        .is_some());
    // the bill outlives its checklist entry
    let linked: Option<i64> = conn
        .query_row("SELECT source_record_id FROM bills", [], |r| r.get(0))
        .unwrap();
    assert_eq!(linked, None);
}

#[test]
fn other_users_records_are_invisible() {
    let conn = open_in_memory().unwrap();
    let (r, _) = records::create_record(&conn, power_bill(), today()).unwrap();
    let err = records::delete_record(&conn, "u2", r.id).unwrap_err();
    assert!(famledger::errors::is_not_found(&err));
    assert_eq!(count(&conn, "records"), 1);
}

#[test]
fn reminder_mirrors_into_calendar_without_bouncing_back() {
    let conn = open_in_memory().unwrap();
    let mut rem = schedule::new_reminder("u1", "Renew passport", date(2026, 12, 1).and_hms_opt(18, 30, 0).unwrap());
    rem.message = Some("Carry old passport".into());
    let (rem, report) = schedule::create_reminder(&conn, rem, today()).unwrap();
    assert_eq!(report.created, 1);

    let key = ReferenceKey::new(rem.id, ReferenceType::Reminder);
    let mut ev = schedule::find_calendar_by_reference(&conn, "u1", key)
        .unwrap()
        .unwrap();
    assert_eq!(ev.date, date(2026, 12, 1));
    assert_eq!(ev.origin_chain.to_string(), "reminder");

    // Editing the mirrored event must not write back into the reminder.
    ev.title = "Renew passports".into();
    let (_, report) = schedule::update_calendar_event(&conn, ev, today()).unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(count(&conn, "reminders"), 1);
    let rem = schedule::get_reminder(&conn, "u1", rem.id).unwrap();
    assert_eq!(rem.title, "Renew passport");
}

#[test]
fn deleting_a_calendar_event_removes_its_reminder() {
    let conn = open_in_memory().unwrap();
    let ev = schedule::new_calendar_event("u1", "School PTM", date(2026, 11, 2));
    let (ev, _) = schedule::create_calendar_event(&conn, ev, today()).unwrap();
    assert_eq!(count(&conn, "reminders"), 1);

    let report = schedule::delete_calendar_event(&conn, "u1", ev.id).unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(count(&conn, "reminders"), 0);
}

#[test]
fn failed_fan_out_does_not_undo_the_record() {
    let conn = open_in_memory().unwrap();
    conn.execute_batch("DROP TABLE reminders").unwrap();
    let mut r = FinancialRecord::new("u1", Category::Insurance, "Health cover");
    r.payable_date = Some(date(2027, 3, 1));
    let (r, report) = records::create_record(&conn, r, today()).unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].target, ReferenceType::Reminder);
    assert_eq!(report.failures[0].key, key(r.id));
    assert!(records::get_record(&conn, "u1", r.id).is_ok());
}

#[test]
fn edits_along_a_record_calendar_reminder_chain_stop_at_the_loop() {
    let conn = open_in_memory().unwrap();
    let mut r = FinancialRecord::new("u1", Category::Insurance, "Health cover");
    r.payable_date = Some(date(2027, 3, 1));
    let (r, _) = records::create_record(&conn, r, today()).unwrap();

    // record > calendar: editing the record's event rewrites its sibling reminder.
    let mut ev = schedule::find_calendar_by_reference(&conn, "u1", key(r.id))
        .unwrap()
        .unwrap();
    ev.title = "Renew health cover".into();
    let (ev, report) = schedule::update_calendar_event(&conn, ev, today()).unwrap();
    assert_eq!(report.updated, 1);
    let rem = schedule::find_reminder_by_reference(&conn, "u1", key(r.id))
        .unwrap()
        .unwrap();
    assert_eq!(rem.title, "Renew health cover");
    assert_eq!(rem.origin_chain.to_string(), "record>calendar");

    // record > calendar > reminder: a further edit is not written back.
    let mut rem = rem;
    rem.title = "Pay health premium".into();
    let (_, report) = schedule::update_reminder_entry(&conn, rem, today()).unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.created + report.updated, 0);
    let stored = schedule::get_calendar(&conn, "u1", ev.id).unwrap();
    assert_eq!(stored.title, "Renew health cover");
    assert_eq!(stored.origin_chain.to_string(), "record");
    assert_eq!(count(&conn, "calendar_events"), 1);
    assert_eq!(count(&conn, "reminders"), 1);

    // Re-saving the record resets both dependents to a one-hop chain.
    let fresh = records::get_record(&conn, "u1", r.id).unwrap();
    let (_, report) = records::update_record(&conn, fresh, today()).unwrap();
    assert_eq!(report.updated, 2);
    let rem = schedule::find_reminder_by_reference(&conn, "u1", key(r.id))
        .unwrap()
        .unwrap();
    assert_eq!(rem.origin_chain.to_string(), "record");
}
