// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use famledger::cli;
use famledger::commands::records::{apply_fields, record_from_args};
use famledger::db::open_in_memory;
use famledger::errors::LedgerError;
use famledger::loans::{self, InstallmentPayment};
use famledger::models::{Category, RecordDetails};
use famledger::records;
use rust_decimal::Decimal;
use std::str::FromStr;

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
}

fn parse_record(args: &[&str]) -> clap::ArgMatches {
    let mut argv = vec!["famledger", "record"];
    argv.extend_from_slice(args);
    let m = cli::build_cli().get_matches_from(argv);
    let (_, record) = m.subcommand().unwrap();
    let (_, leaf) = record.subcommand().unwrap();
    leaf.clone()
}

const CAR_LOAN: &str =
    r#"{"kind":"loan","principal":"500000","annual_rate":"9","tenure_months":60}"#;

#[test]
fn holding_from_args_derives_returns() {
    let conn = open_in_memory().unwrap();
    let m = parse_record(&[
        "add", "--category", "mutual-funds", "--name", "Index fund", "--quantity", "120.5",
        "--purchase-price", "80", "--current-value", "92",
    ]);
    let r = record_from_args("u1", &m).unwrap();
    let (r, report) = records::create_record(&conn, r, today()).unwrap();
    assert_eq!(r.category, Category::MutualFunds);
    assert_eq!(r.amount, Some(d("9640")));
    assert_eq!(r.returns, Some(d("1446")));
    assert_eq!(r.returns_percentage, Some(d("15")));
    assert_eq!(report.skipped, 1);

    let stored = records::get_record(&conn, "u1", r.id).unwrap();
    assert_eq!(stored, r);
}

#[test]
fn details_must_fit_the_category() {
    let m = parse_record(&["add", "--category", "gold", "--name", "Coins", "--details", CAR_LOAN]);
    let r = record_from_args("u1", &m).unwrap();
    let err = records::validate(&r).unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    let m = parse_record(&["add", "--category", "loan", "--name", "Car", "--details", "{\"kind\":\"yacht\"}"]);
    assert!(record_from_args("u1", &m).is_err());
}

#[test]
fn editing_loan_terms_rebuilds_an_untouched_schedule() {
    let conn = open_in_memory().unwrap();
    let m = parse_record(&[
        "add", "--category", "loan", "--name", "Car", "--start-date", "2026-03-10", "--details", CAR_LOAN,
    ]);
    let (r, _) = records::create_record(&conn, record_from_args("u1", &m).unwrap(), today()).unwrap();
    assert_eq!(loans::load_schedule(&conn, r.id).unwrap().len(), 60);

    let mut edit = records::get_record(&conn, "u1", r.id).unwrap();
    let m = parse_record(&[
        "update", "--id", &r.id.to_string(), "--details",
        r#"{"kind":"loan","principal":"500000","annual_rate":"9","tenure_months":36}"#,
    ]);
    apply_fields(&mut edit, &m).unwrap();
    let (edit, _) = records::update_record(&conn, edit, today()).unwrap();
    assert_eq!(loans::load_schedule(&conn, r.id).unwrap().len(), 36);
    assert_eq!(edit.payable_date, NaiveDate::from_ymd_opt(2026, 4, 10));

    loans::pay_installment(
        &conn,
        "u1",
        r.id,
        &InstallmentPayment {
            payment_number: 1,
            amount: None,
            paid_date: NaiveDate::from_ymd_opt(2026, 4, 10).unwrap(),
            extra: Decimal::ZERO,
        },
        today(),
    )
    .unwrap();

    // With a payment on file the schedule is left as it is.
    let mut edit = records::get_record(&conn, "u1", r.id).unwrap();
    if let RecordDetails::Loan(terms) = &mut edit.details {
        terms.tenure_months = 24;
    }
    records::update_record(&conn, edit, today()).unwrap();
    assert_eq!(loans::load_schedule(&conn, r.id).unwrap().len(), 36);
}

#[test]
fn stale_version_is_a_conflict() {
    let conn = open_in_memory().unwrap();
    let m = parse_record(&["add", "--category", "cash", "--name", "Wallet", "--amount", "500"]);
    let (r, _) = records::create_record(&conn, record_from_args("u1", &m).unwrap(), today()).unwrap();

    let mut first = records::get_record(&conn, "u1", r.id).unwrap();
    let mut second = first.clone();
    first.amount = Some(d("450"));
    records::update_record(&conn, first, today()).unwrap();

    second.amount = Some(d("600"));
    let err = records::update_record(&conn, second, today()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::Conflict { entity: "record", .. })
    ));
    let stored = records::get_record(&conn, "u1", r.id).unwrap();
    assert_eq!(stored.amount, Some(d("450")));
}
