// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime};
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rust_decimal::Decimal;

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// Accepts `YYYY-MM-DD HH:MM`, `YYYY-MM-DDTHH:MM[:SS]` or a bare date (09:00).
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    let t = s.trim();
    for fmt in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
            return Ok(dt);
        }
    }
    let d = parse_date(t)
        .with_context(|| format!("Invalid date-time '{}', expected YYYY-MM-DD HH:MM", s))?;
    Ok(d.and_time(default_reminder_time()))
}

pub fn default_reminder_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

pub fn parse_id(s: &str) -> Result<i64> {
    s.trim()
        .parse::<i64>()
        .with_context(|| format!("Invalid id '{}'", s))
}

pub fn fmt_money(d: &Decimal) -> String {
    format!("{:.2}", d.round_dp(2))
}

pub fn fmt_opt_money(d: &Option<Decimal>) -> String {
    d.as_ref().map(fmt_money).unwrap_or_default()
}

pub fn fmt_opt_date(d: &Option<NaiveDate>) -> String {
    d.map(|v| v.to_string()).unwrap_or_default()
}

/// `date` shifted by `months`, clamping to the last day of short months.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

pub fn month_key(d: NaiveDate) -> String {
    format!("{:04}-{:02}", d.year(), d.month())
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

/// Trimmed, non-empty optional string argument.
pub fn opt_arg(m: &clap::ArgMatches, name: &str) -> Option<String> {
    m.get_one::<String>(name)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

pub fn opt_decimal_arg(m: &clap::ArgMatches, name: &str) -> Result<Option<Decimal>> {
    opt_arg(m, name).map(|s| parse_decimal(&s)).transpose()
}

pub fn opt_date_arg(m: &clap::ArgMatches, name: &str) -> Result<Option<NaiveDate>> {
    opt_arg(m, name).map(|s| parse_date(&s)).transpose()
}

/// A required argument; clap enforces presence so only parsing can fail.
pub fn req_arg(m: &clap::ArgMatches, name: &str) -> String {
    m.get_one::<String>(name)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_months_clamps_month_end() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(
            add_months(d, 1),
            NaiveDate::from_ymd_opt(2025, 2, 28)
        );
        assert_eq!(
            add_months(d, 12),
            NaiveDate::from_ymd_opt(2026, 1, 31)
        );
    }

    #[test]
    fn parse_datetime_accepts_bare_date() {
        let dt = parse_datetime(" 2025-04-05 ").unwrap();
        assert_eq!(dt.to_string(), "2025-04-05 09:00:00");
        let dt = parse_datetime("2025-04-05T18:30").unwrap();
        assert_eq!(dt.to_string(), "2025-04-05 18:30:00");
        assert!(parse_datetime("tomorrow").is_err());
    }

    #[test]
    fn month_helpers() {
        let a = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        assert!(same_month(a, b));
        assert_eq!(month_key(a), "2025-03");
    }
}
