// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command};

fn opt(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help)
}

fn req(name: &'static str, help: &'static str) -> Arg {
    opt(name, help).required(true)
}

fn id_arg() -> Arg {
    req("id", "Row id")
}

fn json_flags() -> [Arg; 2] {
    [
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    ]
}

/// Optional record fields shared by `record add` and `record update`.
fn record_fields() -> Vec<Arg> {
    vec![
        opt("type", "Free-form sub-type, e.g. equity or term"),
        opt("provider", "Broker, bank or issuer"),
        opt("quantity", "Units held"),
        opt("purchase-price", "Cost per unit"),
        opt("current-value", "Current value per unit (or total when no quantity)"),
        opt("amount", "Total cost; derived from quantity and price when both are given"),
        opt("start-date", "YYYY-MM-DD"),
        opt("maturity-date", "YYYY-MM-DD"),
        opt("payable-date", "YYYY-MM-DD, next payment due"),
        opt("frequency", "monthly | quarterly | yearly | one-time"),
        opt("storage-type", "Where a physical asset is kept"),
        opt("status", "active | paid | cancelled"),
        opt("details", "Category details as JSON, e.g. {\"kind\":\"loan\",...}"),
    ]
}

fn trade_cmd() -> Command {
    Command::new("trade")
        .about("Purchase and sale legs")
        .subcommand(
            Command::new("add")
                .about("Record a leg and regenerate profit/loss")
                .arg(req("kind", "purchase | sell"))
                .arg(req("script", "Instrument name"))
                .arg(req("investor", "Investor name"))
                .arg(req("trading-id", "Demat / trading account id"))
                .arg(req("date", "YYYY-MM-DD"))
                .arg(req("quantity", "Units"))
                .arg(req("price", "Price per unit"))
                .arg(opt("brokerage", "Brokerage charge"))
                .arg(opt("exchange-charges", "Exchange transaction charges"))
                .arg(opt("gst", "GST on charges"))
                .arg(opt("stt", "Securities transaction tax"))
                .arg(opt("stamp-duty", "Stamp duty")),
        )
        .subcommand(Command::new("list").about("List legs").args(json_flags()))
        .subcommand(
            Command::new("rm")
                .about("Delete a leg and its profit/loss pairs")
                .arg(id_arg()),
        )
}

fn calendar_cmd() -> Command {
    Command::new("calendar")
        .about("Calendar events")
        .subcommand(
            Command::new("add")
                .arg(req("title", "Event title"))
                .arg(req("date", "YYYY-MM-DD"))
                .arg(opt("description", "Details"))
                .arg(opt("category", "Free-form label"))
                .arg(opt("frequency", "monthly | quarterly | yearly | one-time")),
        )
        .subcommand(
            Command::new("list")
                .arg(opt("from", "YYYY-MM-DD"))
                .arg(opt("to", "YYYY-MM-DD"))
                .args(json_flags()),
        )
        .subcommand(
            Command::new("update")
                .arg(id_arg())
                .arg(opt("title", "Event title"))
                .arg(opt("date", "YYYY-MM-DD"))
                .arg(opt("description", "Details"))
                .arg(opt("category", "Free-form label"))
                .arg(opt("status", "active | completed | cancelled"))
                .arg(opt("frequency", "monthly | quarterly | yearly | one-time")),
        )
        .subcommand(Command::new("rm").arg(id_arg()))
}

fn reminder_cmd() -> Command {
    Command::new("reminder")
        .about("Reminders")
        .subcommand(
            Command::new("add")
                .arg(req("title", "Reminder title"))
                .arg(req("at", "YYYY-MM-DD [HH:MM], 09:00 when no time is given"))
                .arg(opt("message", "Body text"))
                .arg(opt("frequency", "monthly | quarterly | yearly | one-time")),
        )
        .subcommand(
            Command::new("list")
                .arg(
                    Arg::new("active")
                        .long("active")
                        .action(ArgAction::SetTrue)
                        .help("Only active reminders"),
                )
                .args(json_flags()),
        )
        .subcommand(
            Command::new("update")
                .arg(id_arg())
                .arg(opt("title", "Reminder title"))
                .arg(opt("at", "YYYY-MM-DD [HH:MM]"))
                .arg(opt("message", "Body text"))
                .arg(opt("status", "active | paused | completed | cancelled"))
                .arg(opt("frequency", "monthly | quarterly | yearly | one-time")),
        )
        .subcommand(Command::new("rm").arg(id_arg()))
}

pub fn build_cli() -> Command {
    Command::new("famledger")
        .about("Family finance records with linked calendar, reminders and bills")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("user")
                .long("user")
                .global(true)
                .help("User id; defaults to the default-user setting"),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(
            Command::new("record")
                .about("Investments, cash, loans and family records")
                .subcommand(
                    Command::new("add")
                        .arg(req("category", "e.g. stocks, loan, daily-bill-checklist"))
                        .arg(req("name", "Display name"))
                        .args(record_fields())
                        .args(json_flags()),
                )
                .subcommand(
                    Command::new("update")
                        .arg(id_arg())
                        .arg(opt("name", "Display name"))
                        .args(record_fields())
                        .args(json_flags()),
                )
                .subcommand(
                    Command::new("list")
                        .arg(opt("category", "Only this category"))
                        .args(json_flags()),
                )
                .subcommand(Command::new("show").arg(id_arg()).args(json_flags()))
                .subcommand(Command::new("rm").arg(id_arg())),
        )
        .subcommand(trade_cmd())
        .subcommand(
            Command::new("pnl")
                .about("Realized profit and loss")
                .subcommand(
                    Command::new("generate")
                        .about("Pair sales with purchases")
                        .args(json_flags()),
                )
                .subcommand(Command::new("list").args(json_flags())),
        )
        .subcommand(
            Command::new("loan")
                .about("Loan schedules and payments")
                .subcommand(Command::new("schedule").arg(id_arg()).args(json_flags()))
                .subcommand(
                    Command::new("pay")
                        .about("Mark one installment paid")
                        .arg(id_arg())
                        .arg(req("payment-number", "Installment number, from 1"))
                        .arg(opt("amount", "Amount paid; defaults to the installment"))
                        .arg(opt("date", "YYYY-MM-DD; defaults to today"))
                        .arg(opt("extra", "Principal prepaid on top")),
                )
                .subcommand(
                    Command::new("record-payment")
                        .about("Apply a bank payment to the next installment")
                        .arg(id_arg())
                        .arg(req("amount", "Amount paid"))
                        .arg(opt("date", "YYYY-MM-DD; defaults to today")),
                ),
        )
        .subcommand(
            Command::new("bill")
                .about("Bills and expense reconciliation")
                .subcommand(
                    Command::new("expense")
                        .about("Settle a bank expense against bills")
                        .arg(req("merchant", "Merchant as printed on the statement"))
                        .arg(req("amount", "Amount paid"))
                        .arg(req("date", "YYYY-MM-DD"))
                        .arg(opt("mode", "upi, card, netbanking ..."))
                        .arg(opt("description", "Narration")),
                )
                .subcommand(
                    Command::new("list")
                        .arg(opt("status", "pending | partial | paid"))
                        .args(json_flags()),
                )
                .subcommand(Command::new("show").arg(id_arg()).args(json_flags())),
        )
        .subcommand(calendar_cmd())
        .subcommand(reminder_cmd())
        .subcommand(
            Command::new("config")
                .about("Settings")
                .subcommand(Command::new("get").arg(req("key", "Setting name")))
                .subcommand(
                    Command::new("set")
                        .arg(req("key", "Setting name"))
                        .arg(req("value", "New value")),
                )
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("import").subcommand(
                Command::new("expenses")
                    .about("Reconcile a CSV of date,merchant,amount,mode,description")
                    .arg(req("path", "CSV file")),
            ),
        )
        .subcommand(
            Command::new("export").subcommand(
                Command::new("records")
                    .arg(req("format", "csv | json"))
                    .arg(req("out", "Output file")),
            ),
        )
        .subcommand(Command::new("doctor").about("Check for orphans, duplicates and drift"))
}
