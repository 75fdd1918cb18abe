// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Famledger", "famledger"));

pub const DB_ENV: &str = "FAMLEDGER_DB";

pub fn db_path() -> Result<PathBuf> {
    if let Ok(p) = std::env::var(DB_ENV) {
        let p = p.trim();
        if !p.is_empty() {
            return Ok(PathBuf::from(p));
        }
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("famledger.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    let timeout = crate::config::Config::load(&conn)?.sync_timeout;
    apply_timeout(&conn, timeout)?;
    Ok(conn)
}

/// Bound how long any write waits on a locked database.
pub fn apply_timeout(conn: &Connection, timeout: Duration) -> Result<()> {
    conn.busy_timeout(timeout)
        .with_context(|| format!("Set busy timeout to {:?}", timeout))?;
    Ok(())
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS records(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        category TEXT NOT NULL,
        type TEXT,
        name TEXT NOT NULL,
        provider TEXT,
        quantity TEXT,
        purchase_price TEXT,
        current_value TEXT,
        amount TEXT,
        start_date TEXT,
        maturity_date TEXT,
        payable_date TEXT,
        frequency TEXT,
        storage_type TEXT,
        returns TEXT,
        returns_percentage TEXT,
        status TEXT NOT NULL DEFAULT 'active',
        details TEXT NOT NULL DEFAULT '{"kind":"none"}',
        version INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_records_user_category ON records(user_id, category);

    CREATE TABLE IF NOT EXISTS loan_schedule(
        record_id INTEGER NOT NULL,
        payment_number INTEGER NOT NULL,
        due_date TEXT NOT NULL,
        beginning_balance TEXT NOT NULL,
        interest TEXT NOT NULL,
        principal TEXT NOT NULL,
        payment TEXT NOT NULL,
        extra_payment TEXT NOT NULL DEFAULT '0',
        ending_balance TEXT NOT NULL,
        is_paid INTEGER NOT NULL DEFAULT 0,
        paid_date TEXT,
        paid_amount TEXT,
        PRIMARY KEY(record_id, payment_number),
        FOREIGN KEY(record_id) REFERENCES records(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS trading_details(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        type_of_transaction TEXT NOT NULL CHECK(type_of_transaction IN ('purchase','sell')),
        name_of_script TEXT NOT NULL,
        name_of_investor TEXT NOT NULL,
        trading_id TEXT NOT NULL,
        date TEXT NOT NULL,
        quantity TEXT NOT NULL,
        price TEXT NOT NULL,
        brokerage TEXT,
        exchange_charges TEXT,
        gst TEXT,
        stt TEXT,
        stamp_duty TEXT,
        valuation TEXT,
        actual_price TEXT,
        actual_valuation TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_trading_user_date ON trading_details(user_id, date);

    CREATE TABLE IF NOT EXISTS profit_loss(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        purchase_id INTEGER NOT NULL,
        sale_id INTEGER NOT NULL,
        name_of_script TEXT NOT NULL,
        name_of_investor TEXT NOT NULL,
        trading_id TEXT NOT NULL,
        quantity TEXT NOT NULL,
        date_of_purchase TEXT NOT NULL,
        date_of_sales TEXT NOT NULL,
        actual_price_of_purchase TEXT NOT NULL,
        actual_purchase_valuation TEXT NOT NULL,
        actual_price_of_sales TEXT NOT NULL,
        actual_sales_valuation TEXT NOT NULL,
        profit_loss_value TEXT,
        profit_loss_percentage TEXT,
        holding_days INTEGER,
        annualised_profit_loss_percentage TEXT,
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(purchase_id, sale_id),
        FOREIGN KEY(purchase_id) REFERENCES trading_details(id) ON DELETE CASCADE,
        FOREIGN KEY(sale_id) REFERENCES trading_details(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS calendar_events(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        date TEXT NOT NULL,
        category TEXT,
        status TEXT NOT NULL DEFAULT 'active',
        repeat INTEGER NOT NULL DEFAULT 0,
        frequency TEXT,
        reference_id INTEGER,
        reference_type TEXT,
        origin_chain TEXT NOT NULL DEFAULT '',
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_calendar_reference
        ON calendar_events(user_id, reference_id, reference_type)
        WHERE reference_id IS NOT NULL;

    CREATE TABLE IF NOT EXISTS reminders(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        title TEXT NOT NULL,
        message TEXT,
        date_time TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'active',
        repeat INTEGER NOT NULL DEFAULT 0,
        frequency TEXT,
        reference_id INTEGER,
        reference_type TEXT,
        origin_chain TEXT NOT NULL DEFAULT '',
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_reminder_reference
        ON reminders(user_id, reference_id, reference_type)
        WHERE reference_id IS NOT NULL;

    CREATE TABLE IF NOT EXISTS bills(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        category TEXT NOT NULL,
        amount TEXT NOT NULL,
        due_date TEXT,
        due_month TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'pending',
        total_paid TEXT NOT NULL DEFAULT '0',
        auto_created INTEGER NOT NULL DEFAULT 0,
        source_record_id INTEGER,
        version INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(source_record_id) REFERENCES records(id) ON DELETE SET NULL
    );
    -- Natural key for auto-created bills so racing inserts collapse into one.
    CREATE UNIQUE INDEX IF NOT EXISTS idx_bills_natural
        ON bills(user_id, lower(name), due_month)
        WHERE auto_created = 1;

    CREATE TABLE IF NOT EXISTS bill_payments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        bill_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        amount TEXT NOT NULL,
        mode TEXT,
        merchant TEXT NOT NULL,
        description TEXT,
        FOREIGN KEY(bill_id) REFERENCES bills(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_bill_payments_bill ON bill_payments(bill_id);
    "#,
    )?;
    Ok(())
}

/// In-memory database with the full schema, for tests and dry runs.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    init_schema(&mut conn)?;
    Ok(conn)
}

fn decimal_error(idx: usize, e: rust_decimal::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

/// Read a TEXT decimal column.
pub fn get_decimal(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let s: String = row.get(idx)?;
    Decimal::from_str_exact(s.trim()).map_err(|e| decimal_error(idx, e))
}

/// Read a nullable TEXT decimal column; empty strings read as `None`.
pub fn get_opt_decimal(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let s: Option<String> = row.get(idx)?;
    match s.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => Decimal::from_str_exact(v)
            .map(Some)
            .map_err(|e| decimal_error(idx, e)),
    }
}

pub fn opt_text(d: Option<Decimal>) -> Option<String> {
    d.map(|v| v.normalize().to_string())
}

pub fn text(d: Decimal) -> String {
    d.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&mut conn).unwrap();
        init_schema(&mut conn).unwrap();
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('records','reminders','bills')",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn decimal_columns_round_trip() {
        let conn = open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO settings(key, value) VALUES ('a', ?1)",
            [text(Decimal::new(50500, 2))],
        )
        .unwrap();
        let d = conn
            .query_row("SELECT value FROM settings WHERE key='a'", [], |r| {
                get_decimal(r, 0)
            })
            .unwrap();
        assert_eq!(d, Decimal::new(505, 0));
        let none = conn
            .query_row("SELECT NULL", [], |r| get_opt_decimal(r, 0))
            .unwrap();
        assert_eq!(none, None);
    }
}
