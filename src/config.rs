// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Runtime settings kept in the `settings` table.

use crate::errors::LedgerError;
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use std::time::Duration;

pub const OWNER_IDENTIFIER: &str = "owner-identifier";
pub const SYNC_TIMEOUT_MS: &str = "sync-timeout-ms";
pub const DEFAULT_USER: &str = "default-user";
pub const AMOUNT_TOLERANCE: &str = "amount-tolerance";

pub const KEYS: &[&str] = &[OWNER_IDENTIFIER, SYNC_TIMEOUT_MS, DEFAULT_USER, AMOUNT_TOLERANCE];

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Substring stripped from merchant names before bill matching,
    /// e.g. the account holder's name printed on every UPI narration.
    pub owner_identifier: String,
    pub sync_timeout: Duration,
    pub default_user: String,
    /// Relative amount difference still treated as the same bill.
    pub amount_tolerance: Decimal,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            owner_identifier: String::new(),
            sync_timeout: Duration::from_millis(5000),
            default_user: "default".to_string(),
            amount_tolerance: Decimal::new(10, 2),
        }
    }
}

impl Config {
    pub fn load(conn: &Connection) -> Result<Config> {
        let mut cfg = Config::default();
        if let Some(v) = get_setting(conn, OWNER_IDENTIFIER)? {
            cfg.owner_identifier = v;
        }
        if let Some(v) = get_setting(conn, SYNC_TIMEOUT_MS)? {
            let ms: u64 = v
                .trim()
                .parse()
                .with_context(|| format!("Invalid {} '{}'", SYNC_TIMEOUT_MS, v))?;
            cfg.sync_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = get_setting(conn, DEFAULT_USER)? {
            cfg.default_user = v;
        }
        if let Some(v) = get_setting(conn, AMOUNT_TOLERANCE)? {
            cfg.amount_tolerance = Decimal::from_str_exact(v.trim())
                .with_context(|| format!("Invalid {} '{}'", AMOUNT_TOLERANCE, v))?;
        }
        Ok(cfg)
    }
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key=?1",
            params![key],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v)
}

/// Validate and store one setting.
pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    let value = value.trim();
    match key {
        OWNER_IDENTIFIER => {}
        DEFAULT_USER => {
            if value.is_empty() {
                return Err(LedgerError::validation("default-user cannot be empty").into());
            }
        }
        SYNC_TIMEOUT_MS => {
            let ms: u64 = value.parse().map_err(|_| {
                LedgerError::validation(format!("{} must be a whole number", SYNC_TIMEOUT_MS))
            })?;
            if ms == 0 {
                return Err(LedgerError::validation(format!("{} must be positive", SYNC_TIMEOUT_MS)).into());
            }
        }
        AMOUNT_TOLERANCE => {
            let t = Decimal::from_str_exact(value).map_err(|_| {
                LedgerError::validation(format!("{} must be a decimal", AMOUNT_TOLERANCE))
            })?;
            if t < Decimal::ZERO || t > Decimal::ONE {
                return Err(LedgerError::validation(format!(
                    "{} must be between 0 and 1",
                    AMOUNT_TOLERANCE
                ))
                .into());
            }
        }
        other => {
            return Err(LedgerError::validation(format!(
                "Unknown setting '{}' (expected one of: {})",
                other,
                KEYS.join(", ")
            ))
            .into());
        }
    }
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}
